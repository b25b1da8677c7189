//! Host privilege check, run before anything else.

use crate::RunError;
use wslup_boundary::{Boundary, ExecuteOptions};

/// `net session` only succeeds in an elevated Windows shell.
pub async fn ensure_elevated(boundary: &dyn Boundary) -> Result<(), RunError> {
    match boundary
        .run(ExecuteOptions::host("net", ["session"]))
        .await
    {
        Ok(out) if out.success() => Ok(()),
        Ok(_) => Err(RunError::NotElevated(
            "re-run wslup from an elevated terminal".into(),
        )),
        Err(e) => Err(RunError::NotElevated(e.to_string())),
    }
}
