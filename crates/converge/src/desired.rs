//! The desired state: a fixed, ordered step list built fresh for every run.

use crate::step::ConvergenceStep;
use crate::steps::{
    AccountStep, BootConfigStep, BootstrapStep, DefaultUserStep, DefaultVersionStep, DistroStep,
    DistroVersionStep, PrivilegeGrantStep, ProfileStep, RestartStep,
};
use serde::Serialize;
use std::path::PathBuf;
use wslup_payload::BootstrapArgs;
use wslup_secret::Credential;

/// Optional guest components, chosen before the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Components {
    pub docker: bool,
    pub python: bool,
    pub cuda: bool,
    pub zsh: bool,
}

/// Everything a run needs to know besides the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provision {
    pub distro: String,
    pub username: String,
    pub components: Components,
    pub python_version: String,
    pub git_name: String,
    pub git_email: String,
    pub bootstrap_path: String,
    pub keep_bootstrap: bool,
    /// Bootstrap prints guest remediation commands instead of running them.
    pub guest_dry_run: bool,
    /// Where the password handoff file is created. System temp dir if unset.
    #[serde(skip)]
    pub handoff_dir: Option<PathBuf>,
}

impl Provision {
    pub fn bootstrap_args(&self) -> BootstrapArgs {
        BootstrapArgs {
            docker: self.components.docker,
            python: self.components.python,
            python_version: self.python_version.clone(),
            cuda: self.components.cuda,
            zsh: self.components.zsh,
            git_name: self.git_name.clone(),
            git_email: self.git_email.clone(),
            dry_run: self.guest_dry_run,
        }
    }
}

/// Builds the ordered step list.
///
/// `credential` may be `None` when the run will not create the account
/// (plan mode). The account step fails if it has to apply without one.
pub fn desired_steps(
    provision: &Provision,
    credential: Option<Credential>,
) -> Vec<Box<dyn ConvergenceStep>> {
    let distro = provision.distro.as_str();
    let user = provision.username.as_str();
    let components = provision.components;

    let mut account = AccountStep::new(distro, user, credential);
    if let Some(ref dir) = provision.handoff_dir {
        account = account.with_handoff_dir(dir);
    }

    vec![
        Box::new(DefaultVersionStep),
        Box::new(DistroStep::new(distro)),
        Box::new(DistroVersionStep::new(distro)),
        Box::new(account),
        Box::new(PrivilegeGrantStep::new(distro, user)),
        Box::new(BootConfigStep::new(distro)),
        Box::new(DefaultUserStep::new(distro, user)),
        Box::new(RestartStep::new(distro)),
        Box::new(
            BootstrapStep::new(
                distro,
                user,
                &provision.bootstrap_path,
                provision.bootstrap_args(),
            )
            .keep_script(provision.keep_bootstrap),
        ),
        Box::new(ProfileStep::new(distro, user, ".bashrc", components.python)),
        Box::new(ProfileStep::new(
            distro,
            user,
            ".zshrc",
            components.python && components.zsh,
        )),
    ]
}
