//! wslup_boundary - the only channel into the guest
//!
//! Every command the provisioner issues, whether against the Windows host
//! (`wsl.exe`, `reg`, PowerShell) or inside the guest distro, goes through the
//! [`Boundary`] trait. The convergence engine never spawns processes itself,
//! which keeps it testable with a scripted fake.

pub mod executor;
pub mod local;
pub mod output;
mod process;
pub mod quote;
pub mod wsl;

pub use executor::{Boundary, BoundaryError, ExecOutput, ExecuteOptions, StdinSource};
pub use local::LocalBoundary;
pub use output::decode_output;
pub use quote::shell_quote;
pub use wsl::{WslBoundary, WSL_EXE};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity a guest command runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    Root,
    User(String),
}

impl Identity {
    pub fn name(&self) -> &str {
        match self {
            Identity::Root => "root",
            Identity::User(name) => name,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a command executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// The Windows-side controller machine.
    Host,
    /// A registered distro, as the given identity.
    Guest { distro: String, identity: Identity },
}

impl Target {
    pub fn root(distro: &str) -> Self {
        Target::Guest {
            distro: distro.to_string(),
            identity: Identity::Root,
        }
    }

    pub fn user(distro: &str, user: &str) -> Self {
        Target::Guest {
            distro: distro.to_string(),
            identity: Identity::User(user.to_string()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Host => f.write_str("host"),
            Target::Guest { distro, identity } => write!(f, "{identity}@{distro}"),
        }
    }
}
