//! Appends the pyenv / `~/.local/bin` block to a shell rc file once.

use crate::state::ProbeResult;
use crate::step::{probe_exit, Applied, ConvergenceStep, StepError};
use async_trait::async_trait;
use wslup_boundary::{shell_quote, Boundary, ExecuteOptions, Target};
use wslup_payload::{inject, Payload, PROFILE_FRAGMENT, PROFILE_MARKER};

pub struct ProfileStep {
    name: String,
    distro: String,
    username: String,
    /// File name relative to the account's home, e.g. `.bashrc`.
    rc_file: String,
    enabled: bool,
}

impl ProfileStep {
    pub fn new(distro: &str, username: &str, rc_file: &str, enabled: bool) -> Self {
        Self {
            name: format!("profile:{rc_file}"),
            distro: distro.to_string(),
            username: username.to_string(),
            rc_file: rc_file.to_string(),
            enabled,
        }
    }

    fn user(&self) -> Target {
        Target::user(&self.distro, &self.username)
    }
}

#[async_trait]
impl ConvergenceStep for ProfileStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn required(&self) -> bool {
        false
    }

    async fn probe(&self, boundary: &dyn Boundary) -> ProbeResult {
        let script = format!(
            "grep -qxF {} \"$HOME\"/{}",
            shell_quote(PROFILE_MARKER),
            shell_quote(&self.rc_file)
        );
        probe_exit(boundary, ExecuteOptions::shell(self.user(), script)).await
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        let home = boundary
            .run_checked(ExecuteOptions::shell(self.user(), "printf '%s' \"$HOME\""))
            .await?
            .stdout;
        if !home.starts_with('/') {
            return Err(StepError::Failed(format!(
                "unexpected home directory '{home}' for {}",
                self.username
            )));
        }

        let path = format!("{}/{}", home.trim_end_matches('/'), self.rc_file);
        // the rc file may not end with a newline
        let content = format!("\n{PROFILE_FRAGMENT}");
        inject(
            boundary,
            &self.user(),
            &Payload::append(&path, content.as_bytes()),
        )
        .await?;
        Ok(Applied::default())
    }
}
