//! Concrete convergence steps, in the order [`crate::desired_steps`] runs them.

mod account;
mod bootstrap;
mod boot;
mod default_user;
mod distro;
mod privilege;
mod profile;

pub use account::AccountStep;
pub use boot::{BootConfigStep, WSL_CONF, WSL_CONF_PATH};
pub use bootstrap::BootstrapStep;
pub use default_user::{DefaultUserStep, POWERSHELL};
pub use distro::{
    launcher_name, parse_distro_list, parse_verbose_list, DefaultVersionStep, DistroStep,
    DistroVersionStep, RestartStep,
};
pub use privilege::{sudoers_line, sudoers_path, PrivilegeGrantStep};
pub use profile::ProfileStep;

use crate::step::StepError;
use wslup_boundary::{Boundary, ExecuteOptions, Target};

/// Guest `id -u <user>`; `Ok(None)` when the account does not exist.
pub(crate) async fn guest_uid(
    boundary: &dyn Boundary,
    distro: &str,
    username: &str,
) -> Result<Option<u32>, StepError> {
    let out = boundary
        .run(ExecuteOptions::new(Target::root(distro), "id", ["-u", username]))
        .await?;
    if !out.success() {
        return Ok(None);
    }
    out.stdout
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| StepError::Failed(format!("unexpected uid '{}'", out.stdout.trim())))
}
