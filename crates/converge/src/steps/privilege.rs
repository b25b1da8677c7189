//! Passwordless sudo for the provisioned account through a sudoers drop-in.

use crate::step::{ApplyPolicy, Applied, ConvergenceStep, StepError};
use async_trait::async_trait;
use wslup_boundary::{Boundary, ExecuteOptions, Target};
use wslup_payload::{inject, FileMode, Payload};

pub fn sudoers_path(username: &str) -> String {
    format!("/etc/sudoers.d/{username}")
}

pub fn sudoers_line(username: &str) -> String {
    format!("{username} ALL=(ALL) NOPASSWD:ALL\n")
}

/// Rewrites the drop-in on every run. Content and mode are the same whether
/// the file existed before or not.
pub struct PrivilegeGrantStep {
    distro: String,
    username: String,
}

impl PrivilegeGrantStep {
    pub fn new(distro: &str, username: &str) -> Self {
        Self {
            distro: distro.to_string(),
            username: username.to_string(),
        }
    }
}

#[async_trait]
impl ConvergenceStep for PrivilegeGrantStep {
    fn name(&self) -> &str {
        "privilege-grant"
    }

    fn policy(&self) -> ApplyPolicy {
        ApplyPolicy::Always
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        let root = Target::root(&self.distro);
        let path = sudoers_path(&self.username);
        let content = sudoers_line(&self.username);

        inject(
            boundary,
            &root,
            &Payload::overwrite(&path, content.as_bytes())
                .with_mode(FileMode::OWNER_RW)
                .with_owner("root"),
        )
        .await?;

        let check = boundary
            .run(ExecuteOptions::new(root.clone(), "visudo", ["-cf", path.as_str()]))
            .await?;
        if !check.success() {
            // a broken drop-in locks sudo for every account
            boundary
                .run(ExecuteOptions::new(root, "rm", ["-f", path.as_str()]))
                .await?;
            return Err(StepError::Failed(format!(
                "visudo rejected {path}: {}",
                check.combined().trim()
            )));
        }

        Ok(Applied::default())
    }
}
