//! The guest bootstrap script and its positional-argument contract.
//!
//! The script is a second convergence engine that runs inside the guest as
//! the provisioned account. It receives every toggle as a positional
//! argument and reports each of its steps on stdout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bumped whenever the positional-argument contract changes.
pub const BOOTSTRAP_VERSION: u32 = 1;

pub const BOOTSTRAP_SCRIPT: &str = include_str!("../templates/bootstrap.sh");

const REPORT_PREFIX: &str = "::wslup-step ";

/// Parameters for one bootstrap run, rendered as `$1`..`$8`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapArgs {
    pub docker: bool,
    pub python: bool,
    pub python_version: String,
    pub cuda: bool,
    pub zsh: bool,
    pub git_name: String,
    pub git_email: String,
    pub dry_run: bool,
}

impl BootstrapArgs {
    pub fn to_positional(&self) -> Vec<String> {
        fn flag(b: bool) -> String {
            if b { "1" } else { "0" }.to_string()
        }

        vec![
            flag(self.docker),
            flag(self.python),
            self.python_version.clone(),
            flag(self.cuda),
            flag(self.zsh),
            self.git_name.clone(),
            self.git_email.clone(),
            flag(self.dry_run),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestOutcome {
    Satisfied,
    Applied,
    Planned,
    Skipped,
    Failed,
}

impl FromStr for GuestOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "satisfied" => Ok(Self::Satisfied),
            "applied" => Ok(Self::Applied),
            "planned" => Ok(Self::Planned),
            "skipped" => Ok(Self::Skipped),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown guest outcome '{other}'")),
        }
    }
}

impl fmt::Display for GuestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Satisfied => "satisfied",
            Self::Applied => "applied",
            Self::Planned => "planned",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestStep {
    pub name: String,
    pub outcome: GuestOutcome,
}

/// Extracts the step report lines from bootstrap output. Other lines are
/// ordinary command output and are ignored.
pub fn parse_guest_report(output: &str) -> Vec<GuestStep> {
    output
        .lines()
        .filter_map(|line| line.trim_end().strip_prefix(REPORT_PREFIX))
        .filter_map(|rest| {
            let (name, outcome) = rest.split_once(' ')?;
            let outcome = outcome.trim().parse().ok()?;
            Some(GuestStep {
                name: name.to_string(),
                outcome,
            })
        })
        .collect()
}
