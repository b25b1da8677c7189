//! StepRunner - executes the desired-state list in order
//!
//! Loop per step:
//! 1. probe (only for enabled probe-first steps)
//! 2. decide (pure)
//! 3. apply, report, and stop on a failed required step

use crate::reconcile::{decide, needs_probe, Decision};
use crate::reporter::{Level, Reporter};
use crate::state::{Outcome, RunReport};
use crate::step::ConvergenceStep;
use crate::RunError;
use thiserror::Error;
use tracing::Instrument;
use wslup_boundary::Boundary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Apply,
    /// Probe only; report what `Apply` would change.
    Plan,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Abort on an unknown probe of a required step instead of remediating.
    pub strict_probe: bool,
}

/// A run that stopped early, together with everything recorded until then.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: RunError,
    pub report: RunReport,
}

pub struct StepRunner<'a, R: Reporter> {
    boundary: &'a dyn Boundary,
    reporter: &'a mut R,
    options: RunOptions,
}

impl<'a, R: Reporter> StepRunner<'a, R> {
    pub fn new(boundary: &'a dyn Boundary, reporter: &'a mut R, options: RunOptions) -> Self {
        Self {
            boundary,
            reporter,
            options,
        }
    }

    pub async fn run(
        mut self,
        steps: &[Box<dyn ConvergenceStep>],
    ) -> Result<RunReport, RunFailure> {
        let mut report = RunReport::default();
        let total = steps.len();

        for (index, step) in steps.iter().enumerate() {
            let name = step.name().to_string();
            self.reporter.on_step_start(index, total, &name);

            let span = tracing::info_span!("step", name = %name, index);
            let result = self.run_step(step.as_ref()).instrument(span).await;

            let (outcome, abort) = match result {
                StepResult::Done(outcome) => {
                    let abort = match &outcome {
                        Outcome::Failed { message } if step.required() => {
                            Some(RunError::StepFailed {
                                step: name.clone(),
                                message: message.clone(),
                            })
                        }
                        _ => None,
                    };
                    (outcome, abort)
                }
                StepResult::Unreachable(message) => (
                    Outcome::Failed {
                        message: format!("could not probe: {message}"),
                    },
                    Some(RunError::ProbeUnreachable {
                        step: name.clone(),
                        message,
                    }),
                ),
            };

            self.reporter.on_step_outcome(&name, &outcome);
            if let Outcome::Applied { warnings, .. } = &outcome {
                for warning in warnings {
                    self.reporter.report(Level::Warn, &format!("{name}: {warning}"));
                }
            }
            if outcome.is_failed() && abort.is_none() {
                self.reporter.report(
                    Level::Warn,
                    &format!("{name} is optional, continuing"),
                );
            }
            report.push(&name, outcome);

            if let Some(error) = abort {
                tracing::warn!(step = %name, "run aborted");
                self.reporter.on_summary(&report);
                return Err(RunFailure { error, report });
            }
        }

        self.reporter.on_summary(&report);
        Ok(report)
    }

    async fn run_step(&self, step: &dyn ConvergenceStep) -> StepResult {
        let enabled = step.enabled();
        let policy = step.policy();

        let probe = if needs_probe(enabled, policy) {
            let probe = step.probe(self.boundary).await;
            tracing::debug!(?probe, "probed");
            Some(probe)
        } else {
            None
        };

        let decision = decide(
            enabled,
            policy,
            step.required(),
            self.options.strict_probe,
            probe.as_ref(),
        );

        match decision {
            Decision::Skip(reason) => StepResult::Done(Outcome::Skipped { reason }),
            Decision::Abort(message) => StepResult::Unreachable(message),
            Decision::Apply { unknown_probe } if self.options.mode == RunMode::Plan => {
                StepResult::Done(Outcome::Planned { unknown_probe })
            }
            Decision::Apply { unknown_probe } => match step.apply(self.boundary).await {
                Ok(applied) => StepResult::Done(Outcome::Applied {
                    unknown_probe,
                    guest: applied.guest,
                    warnings: applied.warnings,
                }),
                Err(e) => {
                    tracing::debug!(error = %e, "remediation failed");
                    StepResult::Done(Outcome::Failed {
                        message: e.to_string(),
                    })
                }
            },
        }
    }
}

enum StepResult {
    Done(Outcome),
    Unreachable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ProbeResult, SkipReason};
    use crate::step::{ApplyPolicy, Applied, StepError};
    use crate::test_utils::{MockBoundary, MockReporter};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Step with a canned probe and a configurable remediation result.
    struct Fake {
        name: &'static str,
        policy: ApplyPolicy,
        enabled: bool,
        required: bool,
        probe: ProbeResult,
        fail: bool,
        warnings: Vec<String>,
        probes: Arc<AtomicUsize>,
        applies: Arc<AtomicUsize>,
    }

    impl Fake {
        fn new(name: &'static str, probe: ProbeResult) -> Self {
            Self {
                name,
                policy: ApplyPolicy::ProbeFirst,
                enabled: true,
                required: true,
                probe,
                fail: false,
                warnings: vec![],
                probes: Arc::new(AtomicUsize::new(0)),
                applies: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ConvergenceStep for Fake {
        fn name(&self) -> &str {
            self.name
        }
        fn policy(&self) -> ApplyPolicy {
            self.policy
        }
        fn enabled(&self) -> bool {
            self.enabled
        }
        fn required(&self) -> bool {
            self.required
        }
        async fn probe(&self, _boundary: &dyn Boundary) -> ProbeResult {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.probe.clone()
        }
        async fn apply(&self, _boundary: &dyn Boundary) -> Result<Applied, StepError> {
            self.applies.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StepError::Failed("boom".into()));
            }
            Ok(Applied {
                warnings: self.warnings.clone(),
                ..Applied::default()
            })
        }
    }

    async fn run(
        steps: Vec<Box<dyn ConvergenceStep>>,
        options: RunOptions,
    ) -> (Result<RunReport, RunFailure>, MockReporter) {
        let boundary = MockBoundary::new();
        let mut reporter = MockReporter::new();
        let result = StepRunner::new(&boundary, &mut reporter, options)
            .run(&steps)
            .await;
        (result, reporter)
    }

    #[tokio::test]
    async fn satisfied_steps_are_skipped() {
        let step = Fake::new("a", ProbeResult::Satisfied);
        let applies = step.applies.clone();

        let (result, _) = run(vec![Box::new(step)], RunOptions::default()).await;
        let report = result.unwrap();

        assert_eq!(
            report.get("a"),
            Some(&Outcome::Skipped {
                reason: SkipReason::AlreadySatisfied
            })
        );
        assert_eq!(applies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disabled_steps_are_not_probed() {
        let mut step = Fake::new("cuda", ProbeResult::Unsatisfied);
        step.enabled = false;
        let probes = step.probes.clone();
        let applies = step.applies.clone();

        let (result, _) = run(vec![Box::new(step)], RunOptions::default()).await;

        assert_eq!(
            result.unwrap().get("cuda"),
            Some(&Outcome::Skipped {
                reason: SkipReason::Disabled
            })
        );
        assert_eq!(probes.load(Ordering::SeqCst), 0);
        assert_eq!(applies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn always_steps_are_applied_without_probe() {
        let mut step = Fake::new("grant", ProbeResult::Satisfied);
        step.policy = ApplyPolicy::Always;
        let probes = step.probes.clone();

        let (result, _) = run(vec![Box::new(step)], RunOptions::default()).await;

        assert!(result.unwrap().get("grant").unwrap().changed());
        assert_eq!(probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_required_step_stops_the_run() {
        let mut first = Fake::new("install", ProbeResult::Unsatisfied);
        first.fail = true;
        let second = Fake::new("account", ProbeResult::Unsatisfied);
        let second_probes = second.probes.clone();
        let second_applies = second.applies.clone();

        let (result, reporter) =
            run(vec![Box::new(first), Box::new(second)], RunOptions::default()).await;
        let failure = result.unwrap_err();

        assert!(matches!(
            failure.error,
            RunError::StepFailed { ref step, .. } if step == "install"
        ));
        assert_eq!(failure.report.records.len(), 1);
        assert_eq!(second_probes.load(Ordering::SeqCst), 0);
        assert_eq!(second_applies.load(Ordering::SeqCst), 0);
        assert!(!reporter.events.iter().any(|e| e.contains("account")));
    }

    #[tokio::test]
    async fn failed_optional_step_continues() {
        let mut first = Fake::new("profile", ProbeResult::Unsatisfied);
        first.fail = true;
        first.required = false;
        let second = Fake::new("next", ProbeResult::Unsatisfied);

        let (result, reporter) =
            run(vec![Box::new(first), Box::new(second)], RunOptions::default()).await;
        let report = result.unwrap();

        assert!(report.get("profile").unwrap().is_failed());
        assert!(report.get("next").unwrap().changed());
        assert!(reporter
            .events
            .contains(&"warn:profile is optional, continuing".to_string()));
    }

    #[tokio::test]
    async fn remediation_warnings_reach_the_reporter() {
        let mut step = Fake::new("bootstrap", ProbeResult::Unsatisfied);
        step.warnings = vec!["script left behind".into()];

        let (result, reporter) = run(vec![Box::new(step)], RunOptions::default()).await;

        assert!(result.unwrap().get("bootstrap").unwrap().changed());
        assert!(reporter
            .events
            .contains(&"warn:bootstrap: script left behind".to_string()));
    }

    #[tokio::test]
    async fn unknown_probe_is_remediated_and_flagged() {
        let step = Fake::new("distro", ProbeResult::Unknown("unreachable".into()));
        let (result, _) = run(vec![Box::new(step)], RunOptions::default()).await;

        assert_eq!(
            result.unwrap().get("distro"),
            Some(&Outcome::Applied {
                unknown_probe: Some("unreachable".into()),
                guest: vec![],
                warnings: vec![],
            })
        );
    }

    #[tokio::test]
    async fn strict_mode_aborts_on_unknown_probe() {
        let step = Fake::new("distro", ProbeResult::Unknown("unreachable".into()));
        let applies = step.applies.clone();
        let options = RunOptions {
            strict_probe: true,
            ..RunOptions::default()
        };

        let (result, _) = run(vec![Box::new(step)], options).await;
        let failure = result.unwrap_err();

        assert!(matches!(failure.error, RunError::ProbeUnreachable { .. }));
        assert_eq!(applies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn plan_mode_never_applies() {
        let a = Fake::new("a", ProbeResult::Unsatisfied);
        let mut b = Fake::new("b", ProbeResult::Satisfied);
        b.policy = ApplyPolicy::Always;
        let a_applies = a.applies.clone();
        let b_applies = b.applies.clone();
        let options = RunOptions {
            mode: RunMode::Plan,
            ..RunOptions::default()
        };

        let (result, _) = run(vec![Box::new(a), Box::new(b)], options).await;
        let report = result.unwrap();

        assert_eq!(report.get("a"), Some(&Outcome::Planned { unknown_probe: None }));
        assert_eq!(report.get("b"), Some(&Outcome::Planned { unknown_probe: None }));
        assert_eq!(a_applies.load(Ordering::SeqCst), 0);
        assert_eq!(b_applies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reporter_sees_every_step_in_order() {
        let (result, reporter) = run(
            vec![
                Box::new(Fake::new("one", ProbeResult::Satisfied)),
                Box::new(Fake::new("two", ProbeResult::Unsatisfied)),
            ],
            RunOptions::default(),
        )
        .await;
        assert!(result.is_ok());

        let starts: Vec<_> = reporter
            .events
            .iter()
            .filter(|e| e.starts_with("start:"))
            .cloned()
            .collect();
        assert_eq!(starts, vec!["start:1/2:one", "start:2/2:two"]);
        assert_eq!(reporter.events.last().unwrap(), "summary:1:1:0");
    }
}
