//! Turns config, flags and answers into a [`Provision`].

use crate::prompt::Prompt;
use anyhow::{bail, Context};
use clap::ValueEnum;
use wslup_config::{validate_distro_name, Config};
use wslup_converge::{Components, Provision};
use wslup_secret::{validate_username, Credential};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Component {
    Docker,
    Python,
    Cuda,
    Zsh,
}

impl Component {
    const ALL: [Component; 4] = [
        Component::Docker,
        Component::Python,
        Component::Cuda,
        Component::Zsh,
    ];

    fn question(self) -> &'static str {
        match self {
            Component::Docker => "Install Docker Engine?",
            Component::Python => "Install Python through pyenv (with pipx and poetry)?",
            Component::Cuda => "Install the CUDA toolkit for WSL?",
            Component::Zsh => "Install Zsh with Oh My Zsh?",
        }
    }

    fn slot(self, components: &mut Components) -> &mut bool {
        match self {
            Component::Docker => &mut components.docker,
            Component::Python => &mut components.python,
            Component::Cuda => &mut components.cuda,
            Component::Zsh => &mut components.zsh,
        }
    }
}

/// The flag-provided part of the setup.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub distro: Option<String>,
    pub user: Option<String>,
    pub git_name: Option<String>,
    pub git_email: Option<String>,
    pub with: Vec<Component>,
    pub without: Vec<Component>,
    pub keep_bootstrap: bool,
    pub guest_dry_run: bool,
    /// Accept defaults instead of asking.
    pub assume_yes: bool,
}

pub struct Setup {
    pub provision: Provision,
    pub credential: Option<Credential>,
}

/// Asks, in order, for the account name, its password, the component
/// toggles and the git identity. Anything given by a flag is not asked.
pub fn resolve(
    config: &Config,
    overrides: &Overrides,
    prompt: &mut dyn Prompt,
    needs_password: bool,
) -> anyhow::Result<Setup> {
    let distro = overrides
        .distro
        .clone()
        .unwrap_or_else(|| config.distro.clone());
    validate_distro_name(&distro)?;

    let username = match (&overrides.user, overrides.assume_yes) {
        (Some(user), _) => user.clone(),
        (None, true) => bail!("--user is required together with --yes"),
        (None, false) => prompt.input("Account name", "")?,
    };
    validate_username(&username)?;

    let credential = if needs_password {
        Some(
            prompt
                .password(&username)
                .context("Failed to read the account password")?,
        )
    } else {
        None
    };

    let components = components(config, overrides, prompt)?;

    let mut identity = |value: &Option<String>, question: &str| -> anyhow::Result<String> {
        Ok(match value {
            Some(v) => v.clone(),
            None if overrides.assume_yes => String::new(),
            None => prompt.input(question, "")?,
        })
    };
    let git_name = identity(&overrides.git_name, "Git user.name (empty to skip)")?;
    let git_email = identity(&overrides.git_email, "Git user.email (empty to skip)")?;

    Ok(Setup {
        provision: Provision {
            distro,
            username,
            components,
            python_version: config.python.version.clone(),
            git_name,
            git_email,
            bootstrap_path: config.bootstrap.path.clone(),
            keep_bootstrap: config.bootstrap.keep || overrides.keep_bootstrap,
            guest_dry_run: overrides.guest_dry_run,
            handoff_dir: None,
        },
        credential,
    })
}

fn components(
    config: &Config,
    overrides: &Overrides,
    prompt: &mut dyn Prompt,
) -> anyhow::Result<Components> {
    if let Some(c) = overrides.with.iter().find(|c| overrides.without.contains(c)) {
        bail!("{c:?} is given with both --with and --without");
    }

    let mut components = Components {
        docker: config.components.docker,
        python: config.components.python,
        cuda: config.components.cuda,
        zsh: config.components.zsh,
    };

    for component in Component::ALL {
        let slot = component.slot(&mut components);
        if overrides.with.contains(&component) {
            *slot = true;
        } else if overrides.without.contains(&component) {
            *slot = false;
        } else if !overrides.assume_yes {
            *slot = prompt.confirm(component.question(), *slot)?;
        }
    }
    Ok(components)
}
