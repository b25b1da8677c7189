//! LocalBoundary - runs every command on the current machine
//!
//! Guest targets are executed locally as the current user; the requested
//! identity is only logged. Useful when the provisioner itself runs inside a
//! Linux environment and for exercising guest-side command strings against a
//! real shell.

use crate::executor::{Boundary, BoundaryError, ExecOutput, ExecuteOptions};
use crate::{process, Target};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

#[derive(Debug, Clone, Default)]
pub struct LocalBoundary {
    workdir: Option<PathBuf>,
}

impl LocalBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every command with `dir` as working directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(dir.into()),
        }
    }
}

#[async_trait]
impl Boundary for LocalBoundary {
    async fn run(&self, options: ExecuteOptions) -> Result<ExecOutput, BoundaryError> {
        if let Target::Guest { identity, .. } = &options.target {
            tracing::debug!(%identity, "local boundary ignores guest identity");
        }
        tracing::debug!(command = %options.display_command(), "exec local");

        let mut cmd = Command::new(&options.program);
        cmd.args(&options.args);
        if let Some(ref dir) = self.workdir {
            cmd.current_dir(dir);
        }

        process::execute(cmd, &options.program, &options.stdin).await
    }

    async fn attach(&self, _target: &Target) -> Result<Option<i32>, BoundaryError> {
        let mut cmd = Command::new("sh");
        if let Some(ref dir) = self.workdir {
            cmd.current_dir(dir);
        }
        let status = cmd.status().await.map_err(|source| BoundaryError::Spawn {
            program: "sh".to_string(),
            source,
        })?;
        Ok(status.code())
    }
}
