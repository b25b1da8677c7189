//! Probe results and run outcomes.

use serde::Serialize;
use wslup_payload::GuestStep;

/// What a probe found out about one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ProbeResult {
    Satisfied,
    Unsatisfied,
    /// The target could not be asked. Treated as unsatisfied unless strict.
    Unknown(String),
}

impl ProbeResult {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadySatisfied,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Skipped {
        reason: SkipReason,
    },
    Applied {
        /// Set when remediation ran because the probe could not decide.
        #[serde(skip_serializing_if = "Option::is_none")]
        unknown_probe: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        guest: Vec<GuestStep>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    /// Plan mode only: remediation would run.
    Planned {
        #[serde(skip_serializing_if = "Option::is_none")]
        unknown_probe: Option<String>,
    },
    Failed {
        message: String,
    },
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Flat log of one run. There is no rollback; failed runs keep what was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub records: Vec<StepRecord>,
}

impl RunReport {
    pub fn push(&mut self, step: &str, outcome: Outcome) {
        self.records.push(StepRecord {
            step: step.to_string(),
            outcome,
        });
    }

    pub fn get(&self, step: &str) -> Option<&Outcome> {
        self.records
            .iter()
            .find(|r| r.step == step)
            .map(|r| &r.outcome)
    }

    pub fn applied(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .filter(|r| r.outcome.changed())
            .map(|r| r.step.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        self.records.iter().fold((0, 0, 0), |(s, a, f), r| match r.outcome {
            Outcome::Skipped { .. } => (s + 1, a, f),
            Outcome::Applied { .. } | Outcome::Planned { .. } => (s, a + 1, f),
            Outcome::Failed { .. } => (s, a, f + 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wslup_payload::GuestOutcome;

    fn report() -> RunReport {
        let mut report = RunReport::default();
        report.push(
            "account",
            Outcome::Skipped {
                reason: SkipReason::AlreadySatisfied,
            },
        );
        report.push(
            "bootstrap",
            Outcome::Applied {
                unknown_probe: None,
                guest: vec![GuestStep {
                    name: "cuda".into(),
                    outcome: GuestOutcome::Skipped,
                }],
                warnings: vec![],
            },
        );
        report.push("profile:.bashrc", Outcome::Failed { message: "no home".into() });
        report
    }

    #[test]
    fn counts_and_queries() {
        let report = report();
        assert_eq!(report.counts(), (1, 1, 1));
        assert_eq!(report.applied().collect::<Vec<_>>(), vec!["bootstrap"]);
        assert_eq!(report.failed().count(), 1);
        assert!(report.get("missing").is_none());
    }

    #[test]
    fn serializes_flat_records() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "records": [
                    { "step": "account", "outcome": "skipped", "reason": "already_satisfied" },
                    {
                        "step": "bootstrap",
                        "outcome": "applied",
                        "guest": [{ "name": "cuda", "outcome": "skipped" }]
                    },
                    { "step": "profile:.bashrc", "outcome": "failed", "message": "no home" }
                ]
            })
        );
    }
}
