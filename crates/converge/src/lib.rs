//! wslup_converge - idempotent convergence of a WSL distro
//!
//! A run is a fixed, ordered list of steps. Each step is either probed first
//! and remediated only when unsatisfied, or re-applied unconditionally
//! because its remediation is a pure overwrite. The runner executes them
//! strictly in order and stops at the first failed step that later steps
//! depend on.

pub mod desired;
pub mod preflight;
pub mod reconcile;
pub mod reporter;
pub mod runner;
pub mod state;
pub mod step;
pub mod steps;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use desired::{desired_steps, Components, Provision};
pub use preflight::ensure_elevated;
pub use reconcile::{decide, Decision};
pub use reporter::{ConsoleReporter, Level, Reporter};
pub use runner::{RunFailure, RunMode, RunOptions, StepRunner};
pub use state::{Outcome, ProbeResult, RunReport, SkipReason, StepRecord};
pub use step::{ApplyPolicy, Applied, ConvergenceStep, StepError};

use thiserror::Error;

/// Reasons a provisioning run stops.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Administrator privileges are required: {0}")]
    NotElevated(String),

    #[error("Aborted by user")]
    Declined,

    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("Step '{step}' could not be probed: {message}")]
    ProbeUnreachable { step: String, message: String },
}
