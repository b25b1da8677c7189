//! The `DefaultUid` value WSL keeps per distro in the host registry.

use super::guest_uid;
use crate::state::ProbeResult;
use crate::step::{Applied, ConvergenceStep, StepError};
use async_trait::async_trait;
use wslup_boundary::{Boundary, ExecuteOptions};

pub const POWERSHELL: &str = "powershell.exe";

const LXSS_KEY: &str = r"HKCU:\Software\Microsoft\Windows\CurrentVersion\Lxss";

/// Single-quoted PowerShell string literal.
fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn lookup_key(distro: &str) -> String {
    format!(
        "$k = Get-ChildItem {} | Where-Object {{ $_.GetValue('DistributionName') -eq {} }} | Select-Object -First 1",
        ps_quote(LXSS_KEY),
        ps_quote(distro)
    )
}

/// Prints the current `DefaultUid`, or nothing when the distro has no key.
pub(crate) fn read_script(distro: &str) -> String {
    format!("{}; if ($k) {{ $k.GetValue('DefaultUid') }}", lookup_key(distro))
}

pub(crate) fn write_script(distro: &str, uid: u32) -> String {
    format!(
        "{}; if (-not $k) {{ exit 3 }}; Set-ItemProperty -Path $k.PSPath -Name DefaultUid -Value {uid} -Type DWord",
        lookup_key(distro)
    )
}

fn powershell(script: String) -> ExecuteOptions {
    ExecuteOptions::host(
        POWERSHELL,
        ["-NoProfile", "-NonInteractive", "-Command"]
            .into_iter()
            .map(String::from)
            .chain(std::iter::once(script)),
    )
}

/// Sessions started without `--user` log in as the provisioned account.
pub struct DefaultUserStep {
    distro: String,
    username: String,
}

impl DefaultUserStep {
    pub fn new(distro: &str, username: &str) -> Self {
        Self {
            distro: distro.to_string(),
            username: username.to_string(),
        }
    }

    async fn uid(&self, boundary: &dyn Boundary) -> Result<u32, StepError> {
        guest_uid(boundary, &self.distro, &self.username)
            .await?
            .ok_or_else(|| StepError::Failed(format!("account '{}' does not exist", self.username)))
    }
}

#[async_trait]
impl ConvergenceStep for DefaultUserStep {
    fn name(&self) -> &str {
        "default-user"
    }

    async fn probe(&self, boundary: &dyn Boundary) -> ProbeResult {
        let uid = match guest_uid(boundary, &self.distro, &self.username).await {
            Ok(Some(uid)) => uid,
            Ok(None) => return ProbeResult::Unsatisfied,
            Err(StepError::Boundary(e)) => return ProbeResult::Unknown(e.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "guest uid unreadable");
                return ProbeResult::Unsatisfied;
            }
        };
        match boundary.run(powershell(read_script(&self.distro))).await {
            Ok(out) if out.success() && out.stdout.trim() == uid.to_string() => {
                ProbeResult::Satisfied
            }
            Ok(out) if out.success() => {
                tracing::debug!(current = out.stdout.trim(), uid, "default uid differs");
                ProbeResult::Unsatisfied
            }
            Ok(out) => {
                tracing::debug!(output = out.combined().trim(), "registry lookup failed");
                ProbeResult::Unsatisfied
            }
            Err(e) => ProbeResult::Unknown(e.to_string()),
        }
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        let uid = self.uid(boundary).await?;
        boundary
            .run_checked(powershell(write_script(&self.distro, uid)))
            .await?;
        Ok(Applied::default())
    }
}
