//! The step abstraction shared by every piece of desired state.

use crate::state::ProbeResult;
use async_trait::async_trait;
use thiserror::Error;
use wslup_boundary::{Boundary, BoundaryError, ExecuteOptions};
use wslup_payload::{GuestStep, PayloadError};
use wslup_secret::SecretError;

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("{0}")]
    Failed(String),
}

/// How the runner decides whether to remediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPolicy {
    /// Probe, remediate only when not satisfied.
    ProbeFirst,
    /// Never probed. The remediation is an overwrite and safe to repeat.
    Always,
}

/// Details of a successful remediation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    pub guest: Vec<GuestStep>,
    /// Problems that did not undo the remediation.
    pub warnings: Vec<String>,
}

/// One named unit of desired state.
#[async_trait]
pub trait ConvergenceStep: Send + Sync {
    fn name(&self) -> &str;

    fn policy(&self) -> ApplyPolicy {
        ApplyPolicy::ProbeFirst
    }

    /// Disabled steps are skipped without probing.
    fn enabled(&self) -> bool {
        true
    }

    /// Whether later steps depend on this one. A failed required step ends the run.
    fn required(&self) -> bool {
        true
    }

    /// Side-effect free check. Only called for [`ApplyPolicy::ProbeFirst`].
    async fn probe(&self, _boundary: &dyn Boundary) -> ProbeResult {
        ProbeResult::Unsatisfied
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError>;
}

/// Probe by exit code: 0 is satisfied, any other code unsatisfied, and a
/// command that could not run at all is unknown.
pub async fn probe_exit(boundary: &dyn Boundary, options: ExecuteOptions) -> ProbeResult {
    match boundary.run(options).await {
        Ok(out) if out.success() => ProbeResult::Satisfied,
        Ok(_) => ProbeResult::Unsatisfied,
        Err(e) => ProbeResult::Unknown(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockBoundary;
    use wslup_boundary::{ExecOutput, Target};

    #[tokio::test]
    async fn probe_exit_maps_results() {
        let boundary = MockBoundary::new()
            .on("id -u alice", ExecOutput::ok("1000\n"))
            .on("id -u bob", ExecOutput::exit(1, "no such user"))
            .unreachable("id -u carol");

        let probe = |user: &str| {
            ExecuteOptions::new(Target::root("Ubuntu"), "id", ["-u", user])
        };

        assert_eq!(probe_exit(&boundary, probe("alice")).await, ProbeResult::Satisfied);
        assert_eq!(probe_exit(&boundary, probe("bob")).await, ProbeResult::Unsatisfied);
        assert!(matches!(
            probe_exit(&boundary, probe("carol")).await,
            ProbeResult::Unknown(_)
        ));
    }
}
