use crate::step::{ApplyPolicy, Applied, ConvergenceStep, StepError};
use async_trait::async_trait;
use wslup_boundary::{Boundary, Target};
use wslup_payload::{inject, FileMode, Payload};

pub const WSL_CONF_PATH: &str = "/etc/wsl.conf";

/// Content of `/etc/wsl.conf`.
pub const WSL_CONF: &str = "[boot]\nsystemd=true\n";

/// Enables systemd at distro boot. Takes effect after [`super::RestartStep`].
pub struct BootConfigStep {
    distro: String,
}

impl BootConfigStep {
    pub fn new(distro: &str) -> Self {
        Self {
            distro: distro.to_string(),
        }
    }
}

#[async_trait]
impl ConvergenceStep for BootConfigStep {
    fn name(&self) -> &str {
        "boot-config"
    }

    fn policy(&self) -> ApplyPolicy {
        ApplyPolicy::Always
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        inject(
            boundary,
            &Target::root(&self.distro),
            &Payload::overwrite(WSL_CONF_PATH, WSL_CONF.as_bytes())
                .with_mode(FileMode(0o644))
                .with_owner("root"),
        )
        .await?;
        Ok(Applied::default())
    }
}
