//! WslBoundary - executes host commands directly and guest commands through `wsl.exe`

use crate::executor::{Boundary, BoundaryError, ExecOutput, ExecuteOptions};
use crate::{process, Target};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Host program name that is resolved to the configured `wsl.exe` binary.
pub const WSL_EXE: &str = "wsl.exe";

/// Production boundary for a Windows host.
#[derive(Debug, Clone)]
pub struct WslBoundary {
    wsl_bin: PathBuf,
}

impl Default for WslBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl WslBoundary {
    pub fn new() -> Self {
        Self {
            wsl_bin: PathBuf::from(WSL_EXE),
        }
    }

    pub fn with_binary(wsl_bin: impl Into<PathBuf>) -> Self {
        Self {
            wsl_bin: wsl_bin.into(),
        }
    }

    /// Argument vector handed to `wsl.exe` for a guest command.
    ///
    /// `--exec` bypasses the guest's login shell so every argument arrives as
    /// one word.
    pub fn guest_args(distro: &str, user: &str, program: &str, args: &[String]) -> Vec<String> {
        let mut out = vec![
            "--distribution".to_string(),
            distro.to_string(),
            "--user".to_string(),
            user.to_string(),
            "--exec".to_string(),
            program.to_string(),
        ];
        out.extend(args.iter().cloned());
        out
    }

    fn command(&self, options: &ExecuteOptions) -> Command {
        let mut cmd = match &options.target {
            Target::Host if options.program == WSL_EXE => {
                let mut cmd = Command::new(&self.wsl_bin);
                cmd.args(&options.args);
                cmd
            }
            Target::Host => {
                let mut cmd = Command::new(&options.program);
                cmd.args(&options.args);
                cmd
            }
            Target::Guest { distro, identity } => {
                let mut cmd = Command::new(&self.wsl_bin);
                cmd.args(Self::guest_args(
                    distro,
                    identity.name(),
                    &options.program,
                    &options.args,
                ));
                cmd
            }
        };
        cmd.env("WSL_UTF8", "1");
        cmd
    }
}

#[async_trait]
impl Boundary for WslBoundary {
    async fn run(&self, options: ExecuteOptions) -> Result<ExecOutput, BoundaryError> {
        tracing::debug!(target = %options.target, command = %options.display_command(), "exec");

        let cmd = self.command(&options);
        let program = match options.target {
            Target::Host if options.program != WSL_EXE => options.program.clone(),
            _ => self.wsl_bin.to_string_lossy().into_owned(),
        };
        let output = process::execute(cmd, &program, &options.stdin).await?;

        tracing::debug!(code = ?output.code, "exec finished");
        Ok(output)
    }

    async fn attach(&self, target: &Target) -> Result<Option<i32>, BoundaryError> {
        let Target::Guest { distro, identity } = target else {
            return Err(BoundaryError::Unsupported(
                "interactive sessions need a guest target".into(),
            ));
        };

        let status = Command::new(&self.wsl_bin)
            .args(["--distribution", distro.as_str(), "--user", identity.name(), "--cd", "~"])
            .status()
            .await
            .map_err(|source| BoundaryError::Spawn {
                program: self.wsl_bin.to_string_lossy().into_owned(),
                source,
            })?;

        Ok(status.code())
    }
}
