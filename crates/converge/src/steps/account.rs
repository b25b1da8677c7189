//! The provisioned account: created once, never touched again.
//!
//! An existing account is skipped entirely. Re-running with a different
//! password does not change the stored one.

use crate::state::ProbeResult;
use crate::step::{probe_exit, Applied, ConvergenceStep, StepError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use wslup_boundary::{Boundary, ExecuteOptions, StdinSource, Target};
use wslup_secret::{with_credential_file, with_credential_file_in, Credential};

const PRIVILEGED_GROUP: &str = "sudo";

pub struct AccountStep {
    distro: String,
    username: String,
    /// Taken by the first `apply`; wiped when that call returns.
    credential: Mutex<Option<Credential>>,
    handoff_dir: Option<PathBuf>,
}

impl AccountStep {
    pub fn new(distro: &str, username: &str, credential: Option<Credential>) -> Self {
        Self {
            distro: distro.to_string(),
            username: username.to_string(),
            credential: Mutex::new(credential),
            handoff_dir: None,
        }
    }

    /// Directory for the transient password file instead of the system temp dir.
    pub fn with_handoff_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.handoff_dir = Some(dir.into());
        self
    }

    fn root(&self) -> Target {
        Target::root(&self.distro)
    }

    async fn set_password(
        &self,
        boundary: &dyn Boundary,
        credential: &Credential,
    ) -> Result<(), StepError> {
        let consume = |path: PathBuf| async move {
            boundary
                .run_checked(
                    ExecuteOptions::new(self.root(), "chpasswd", Vec::<String>::new())
                        .with_stdin(StdinSource::File(path)),
                )
                .await
                .map(|_| ())
                .map_err(StepError::from)
        };

        match &self.handoff_dir {
            Some(dir) => with_credential_file_in(dir, credential, consume).await,
            None => with_credential_file(credential, consume).await,
        }
    }
}

#[async_trait]
impl ConvergenceStep for AccountStep {
    fn name(&self) -> &str {
        "account"
    }

    async fn probe(&self, boundary: &dyn Boundary) -> ProbeResult {
        probe_exit(
            boundary,
            ExecuteOptions::new(self.root(), "id", ["-u", self.username.as_str()]),
        )
        .await
    }

    async fn apply(&self, boundary: &dyn Boundary) -> Result<Applied, StepError> {
        let credential = self
            .credential
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .ok_or_else(|| {
                StepError::Failed(format!("no password captured for '{}'", self.username))
            })?;
        if credential.username() != self.username {
            return Err(StepError::Failed(format!(
                "password was captured for '{}', not '{}'",
                credential.username(),
                self.username
            )));
        }

        boundary
            .run_checked(ExecuteOptions::new(
                self.root(),
                "useradd",
                ["--create-home", "--shell", "/bin/bash", self.username.as_str()],
            ))
            .await?;

        self.set_password(boundary, &credential).await?;
        drop(credential);

        boundary
            .run_checked(ExecuteOptions::new(
                self.root(),
                "usermod",
                ["-aG", PRIVILEGED_GROUP, self.username.as_str()],
            ))
            .await?;

        Ok(Applied::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockBoundary;
    use wslup_boundary::ExecOutput;

    fn step(dir: &std::path::Path) -> AccountStep {
        let credential = Credential::new("alice", "s3cr3t 'with' $pecial".into()).unwrap();
        AccountStep::new("Ubuntu", "alice", Some(credential)).with_handoff_dir(dir)
    }

    #[tokio::test]
    async fn creates_account_and_streams_password() {
        let dir = tempfile::tempdir().unwrap();
        let boundary = MockBoundary::new();

        step(dir.path()).apply(&boundary).await.unwrap();

        let calls = boundary.calls();
        let commands: Vec<_> = calls.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(
            commands,
            vec![
                "useradd --create-home --shell /bin/bash alice",
                "chpasswd",
                "usermod -aG sudo alice",
            ]
        );
        assert_eq!(
            calls[1].stdin.as_deref(),
            Some(&b"alice:s3cr3t 'with' $pecial\n"[..])
        );
        // the password is never part of a command line
        assert!(calls.iter().all(|c| !c.command.contains("s3cr3t")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn handoff_file_is_removed_when_chpasswd_fails() {
        let dir = tempfile::tempdir().unwrap();
        let boundary = MockBoundary::new().on("chpasswd", ExecOutput::exit(1, "bad line"));

        let err = step(dir.path()).apply(&boundary).await.unwrap_err();

        assert!(err.to_string().contains("bad line"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(!boundary.ran("usermod"));
    }

    #[tokio::test]
    async fn credential_is_consumed_once() {
        let dir = tempfile::tempdir().unwrap();
        let step = step(dir.path());
        let boundary = MockBoundary::new();

        step.apply(&boundary).await.unwrap();
        let err = step.apply(&boundary).await.unwrap_err();
        assert!(err.to_string().contains("no password captured"));
    }

    #[tokio::test]
    async fn probe_checks_the_account_id() {
        let boundary = MockBoundary::new().on("id -u alice", ExecOutput::exit(1, "no such user"));
        let step = AccountStep::new("Ubuntu", "alice", None);
        assert_eq!(step.probe(&boundary).await, ProbeResult::Unsatisfied);
        assert_eq!(boundary.calls()[0].target, Target::root("Ubuntu"));
    }
}
