//! Host-side steps driving `wsl.exe`.

use crate::state::ProbeResult;
use crate::step::{ApplyPolicy, Applied, ConvergenceStep, StepError};
use async_trait::async_trait;
use wslup_boundary::{Boundary, ExecuteOptions, WSL_EXE};

/// WSL generation every distro is expected to run under.
const WSL_VERSION: &str = "2";

/// Names from `wsl --list --quiet`.
pub fn parse_distro_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// `(name, version)` pairs from `wsl --list --verbose`.
///
/// ```text
///   NAME      STATE           VERSION
/// * Ubuntu    Running         2
/// ```
pub fn parse_verbose_list(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let line = line.trim().trim_start_matches('*');
            let mut tokens = line.split_whitespace();
            let name = tokens.next()?;
            let version = tokens.last()?;
            Some((name.to_string(), version.to_string()))
        })
        .collect()
}

/// Store launcher of a distro, e.g. `Ubuntu-22.04` → `ubuntu2204.exe`.
pub fn launcher_name(distro: &str) -> String {
    let stem: String = distro
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    format!("{stem}.exe")
}

async fn is_registered(boundary: &dyn Boundary, distro: &str) -> ProbeResult {
    match boundary
        .run(ExecuteOptions::host(WSL_EXE, ["--list", "--quiet"]))
        .await
    {
        // wsl exits non-zero when nothing is installed yet
        Ok(out) if !out.success() => ProbeResult::Unsatisfied,
        Ok(out) => {
            if parse_distro_list(&out.stdout)
                .iter()
                .any(|d| d.eq_ignore_ascii_case(distro))
            {
                ProbeResult::Satisfied
            } else {
                ProbeResult::Unsatisfied
            }
        }
        Err(e) => ProbeResult::Unknown(e.to_string()),
    }
}

/// `wsl --set-default-version 2`, so freshly installed distros start as WSL2.
pub struct DefaultVersionStep;

#[async_trait]
impl ConvergenceStep for DefaultVersionStep {
    fn name(&self) -> &str {
        "wsl-default-version"
    }

    fn policy(&self) -> ApplyPolicy {
        ApplyPolicy::Always
    }

    fn required(&self) -> bool {
        false
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        boundary
            .run_checked(ExecuteOptions::host(
                WSL_EXE,
                ["--set-default-version", WSL_VERSION],
            ))
            .await?;
        Ok(Applied::default())
    }
}

/// The distro is registered with WSL.
pub struct DistroStep {
    distro: String,
}

impl DistroStep {
    pub fn new(distro: &str) -> Self {
        Self {
            distro: distro.to_string(),
        }
    }
}

#[async_trait]
impl ConvergenceStep for DistroStep {
    fn name(&self) -> &str {
        "distro"
    }

    async fn probe(&self, boundary: &dyn Boundary) -> ProbeResult {
        is_registered(boundary, &self.distro).await
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        boundary
            .run_checked(ExecuteOptions::host(
                WSL_EXE,
                ["--install", "--distribution", self.distro.as_str(), "--no-launch"],
            ))
            .await?;

        // Store-packaged distros only register on first launch. `install --root`
        // registers without the interactive first-user prompt.
        if !is_registered(boundary, &self.distro).await.is_satisfied() {
            let launcher = launcher_name(&self.distro);
            tracing::debug!(%launcher, "registering distro through its launcher");
            boundary
                .run_checked(ExecuteOptions::host(&launcher, ["install", "--root"]))
                .await?;
        }
        Ok(Applied::default())
    }
}

/// The distro runs under WSL2.
pub struct DistroVersionStep {
    distro: String,
}

impl DistroVersionStep {
    pub fn new(distro: &str) -> Self {
        Self {
            distro: distro.to_string(),
        }
    }
}

#[async_trait]
impl ConvergenceStep for DistroVersionStep {
    fn name(&self) -> &str {
        "distro-version"
    }

    async fn probe(&self, boundary: &dyn Boundary) -> ProbeResult {
        let out = match boundary
            .run(ExecuteOptions::host(WSL_EXE, ["--list", "--verbose"]))
            .await
        {
            Ok(out) if out.success() => out,
            Ok(out) => {
                tracing::debug!(output = out.combined().trim(), "no distro listing");
                return ProbeResult::Unsatisfied;
            }
            Err(e) => return ProbeResult::Unknown(e.to_string()),
        };

        match parse_verbose_list(&out.stdout)
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&self.distro))
        {
            Some((_, version)) if version == WSL_VERSION => ProbeResult::Satisfied,
            Some((_, version)) => {
                tracing::debug!(%version, "distro runs under an older WSL version");
                ProbeResult::Unsatisfied
            }
            None => ProbeResult::Unsatisfied,
        }
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        boundary
            .run_checked(ExecuteOptions::host(
                WSL_EXE,
                ["--set-version", self.distro.as_str(), WSL_VERSION],
            ))
            .await?;
        Ok(Applied::default())
    }
}

/// `wsl --terminate`, so boot configuration is read on the next start.
pub struct RestartStep {
    distro: String,
}

impl RestartStep {
    pub fn new(distro: &str) -> Self {
        Self {
            distro: distro.to_string(),
        }
    }
}

#[async_trait]
impl ConvergenceStep for RestartStep {
    fn name(&self) -> &str {
        "restart"
    }

    fn policy(&self) -> ApplyPolicy {
        ApplyPolicy::Always
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        boundary
            .run_checked(ExecuteOptions::host(WSL_EXE, ["--terminate", self.distro.as_str()]))
            .await?;
        Ok(Applied::default())
    }
}
