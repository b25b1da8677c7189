//! Injects the guest bootstrap script and runs it as the provisioned account.

use crate::step::{ApplyPolicy, Applied, ConvergenceStep, StepError};
use async_trait::async_trait;
use wslup_boundary::{Boundary, ExecuteOptions, Target};
use wslup_payload::{
    inject, parse_guest_report, BootstrapArgs, FileMode, GuestOutcome, Payload, BOOTSTRAP_SCRIPT,
};

pub struct BootstrapStep {
    distro: String,
    username: String,
    /// Guest path the script is written to.
    path: String,
    keep: bool,
    args: BootstrapArgs,
}

impl BootstrapStep {
    pub fn new(distro: &str, username: &str, path: &str, args: BootstrapArgs) -> Self {
        Self {
            distro: distro.to_string(),
            username: username.to_string(),
            path: path.to_string(),
            keep: false,
            args,
        }
    }

    /// Leave the script in the guest after the run.
    pub fn keep_script(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    async fn run_script(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        let mut argv = vec![self.path.clone()];
        argv.extend(self.args.to_positional());

        let out = boundary
            .run(ExecuteOptions::new(
                Target::user(&self.distro, &self.username),
                "bash",
                argv,
            ))
            .await?;
        let guest = parse_guest_report(&out.stdout);

        if let Some(failed) = guest.iter().find(|s| s.outcome == GuestOutcome::Failed) {
            return Err(StepError::Failed(format!(
                "guest step '{}' failed: {}",
                failed.name,
                last_lines(&out.combined(), 5)
            )));
        }
        if !out.success() {
            return Err(StepError::Failed(format!(
                "bootstrap exited with {:?}: {}",
                out.code,
                last_lines(&out.combined(), 5)
            )));
        }

        Ok(Applied {
            guest,
            ..Applied::default()
        })
    }

    /// `None` once the script is gone, otherwise what to tell the operator.
    async fn remove_script(&self, boundary: &dyn Boundary) -> Option<String> {
        let problem = match boundary
            .run(ExecuteOptions::new(
                Target::root(&self.distro),
                "rm",
                ["-f", self.path.as_str()],
            ))
            .await
        {
            Ok(out) if out.success() => return None,
            Ok(out) => out.combined().trim().to_string(),
            Err(e) => e.to_string(),
        };
        tracing::warn!(error = %problem, path = %self.path, "could not remove bootstrap script");
        Some(format!("bootstrap script left at {}: {problem}", self.path))
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

#[async_trait]
impl ConvergenceStep for BootstrapStep {
    fn name(&self) -> &str {
        "bootstrap"
    }

    /// The guest script converges its own steps.
    fn policy(&self) -> ApplyPolicy {
        ApplyPolicy::Always
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        let root = Target::root(&self.distro);
        inject(
            boundary,
            &root,
            &Payload::overwrite(&self.path, BOOTSTRAP_SCRIPT.as_bytes())
                .with_mode(FileMode::EXECUTABLE)
                .with_owner(&self.username),
        )
        .await?;

        let result = self.run_script(boundary).await;
        let leftover = if self.keep {
            None
        } else {
            self.remove_script(boundary).await
        };

        match (result, leftover) {
            (Ok(mut applied), Some(warning)) => {
                applied.warnings.push(warning);
                Ok(applied)
            }
            (Err(e), Some(warning)) => Err(StepError::Failed(format!("{e}; {warning}"))),
            (result, None) => result,
        }
    }
}
