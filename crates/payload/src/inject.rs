//! Encode → transfer → decode.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;
use wslup_boundary::{shell_quote, Boundary, BoundaryError, ExecuteOptions, Target};

/// Upper bound for the encoded text carried by one invocation. Windows caps a
/// command line at 32767 UTF-16 units; this leaves room for the wrapper.
pub const MAX_CHUNK: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: BoundaryError,
    },

    #[error("Invalid guest path '{0}'")]
    InvalidPath(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file. Readers never observe a partially written file.
    Overwrite,
    Append,
}

/// Octal permission bits, applied before the file becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl FileMode {
    pub const OWNER_RW: FileMode = FileMode(0o600);
    pub const EXECUTABLE: FileMode = FileMode(0o755);
}

/// A block of bytes destined for one guest file.
#[derive(Debug, Clone)]
pub struct Payload<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
    pub write: WriteMode,
    pub mode: Option<FileMode>,
    /// `chown` target, e.g. `alice`. Only meaningful when written as root.
    pub owner: Option<&'a str>,
}

impl<'a> Payload<'a> {
    pub fn overwrite(path: &'a str, content: &'a [u8]) -> Self {
        Self {
            path,
            content,
            write: WriteMode::Overwrite,
            mode: None,
            owner: None,
        }
    }

    pub fn append(path: &'a str, content: &'a [u8]) -> Self {
        Self {
            write: WriteMode::Append,
            ..Self::overwrite(path, content)
        }
    }

    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_owner(mut self, owner: &'a str) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Builds the `sh -c` scripts that reproduce `payload` in the guest, in order.
///
/// Short payloads need one invocation. Longer ones stage the encoded text in
/// `<path>.wslup-b64` chunk by chunk and decode it in the last invocation.
pub fn injection_scripts(payload: &Payload<'_>) -> Result<Vec<String>, PayloadError> {
    if payload.path.is_empty() || payload.path.ends_with('/') {
        return Err(PayloadError::InvalidPath(payload.path.to_string()));
    }

    let encoded = BASE64.encode(payload.content);
    let path = shell_quote(payload.path);

    if encoded.len() <= MAX_CHUNK {
        let source = format!("printf '%s' {} | base64 -d", shell_quote(&encoded));
        return Ok(vec![finish_script(payload, &path, &source, None)]);
    }

    let stage = shell_quote(&format!("{}.wslup-b64", payload.path));
    let mut scripts = Vec::new();
    for (i, chunk) in encoded.as_bytes().chunks(MAX_CHUNK).enumerate() {
        // base64 output is ASCII, chunk boundaries are always valid UTF-8
        let chunk = String::from_utf8_lossy(chunk);
        let redirect = if i == 0 { ">" } else { ">>" };
        scripts.push(format!(
            "umask 077; printf '%s' {} {redirect} {stage}",
            shell_quote(&chunk)
        ));
    }
    let source = format!("base64 -d {stage}");
    scripts.push(finish_script(payload, &path, &source, Some(&stage)));
    Ok(scripts)
}

fn finish_script(payload: &Payload<'_>, path: &str, source: &str, stage: Option<&str>) -> String {
    let mut lines = vec!["set -e".to_string()];

    match payload.write {
        WriteMode::Overwrite => {
            let tmp = shell_quote(&format!("{}.wslup-tmp", payload.path));
            let mut cleanup = format!("rm -f {tmp}");
            if let Some(stage) = stage {
                cleanup.push_str(&format!(" {stage}"));
            }
            lines.push(format!("trap '{}' EXIT", cleanup.replace('\'', r"'\''")));
            lines.push("umask 077".to_string());
            lines.push(format!("{source} > {tmp}"));
            if let Some(mode) = payload.mode {
                lines.push(format!("chmod {:o} {tmp}", mode.0));
            }
            if let Some(owner) = payload.owner {
                lines.push(format!("chown {}: {tmp}", shell_quote(owner)));
            }
            lines.push(format!("mv -f {tmp} {path}"));
        }
        WriteMode::Append => {
            if let Some(stage) = stage {
                lines.push(format!("trap 'rm -f {}' EXIT", stage.replace('\'', r"'\''")));
            }
            lines.push(format!("{source} >> {path}"));
            if let Some(mode) = payload.mode {
                lines.push(format!("chmod {:o} {path}", mode.0));
            }
            if let Some(owner) = payload.owner {
                lines.push(format!("chown {}: {path}", shell_quote(owner)));
            }
        }
    }

    lines.join("\n")
}

/// Writes `payload` into the guest through `boundary`.
pub async fn inject(
    boundary: &dyn Boundary,
    target: &Target,
    payload: &Payload<'_>,
) -> Result<(), PayloadError> {
    let scripts = injection_scripts(payload)?;
    tracing::debug!(
        path = payload.path,
        bytes = payload.content.len(),
        invocations = scripts.len(),
        "inject payload"
    );

    for script in scripts {
        boundary
            .run_checked(ExecuteOptions::shell(target.clone(), script))
            .await
            .map_err(|source| PayloadError::Write {
                path: payload.path.to_string(),
                source,
            })?;
    }
    Ok(())
}
