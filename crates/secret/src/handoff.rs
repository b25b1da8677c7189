use crate::credential::wipe;
use crate::{Credential, SecretError};
use std::future::Future;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Temp file holding `user:password`. Overwritten and removed on drop.
struct CredentialFile {
    file: NamedTempFile,
    len: usize,
}

impl CredentialFile {
    fn create_in(dir: &Path, credential: &Credential) -> Result<Self, SecretError> {
        let mut file = tempfile::Builder::new()
            .prefix("wslup-cred-")
            .tempfile_in(dir)?;

        let mut line = credential.chpasswd_line();
        let result = file.write_all(&line).and_then(|_| file.flush());
        let len = line.len();
        wipe(&mut line);
        result?;

        Ok(Self { file, len })
    }

    fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for CredentialFile {
    fn drop(&mut self) {
        let f = self.file.as_file_mut();
        if f.seek(SeekFrom::Start(0)).is_ok() {
            let _ = f.write_all(&vec![0u8; self.len]);
            let _ = f.sync_all();
        }
        tracing::debug!("credential handoff file removed");
        // NamedTempFile deletes the file when dropped
    }
}

/// Materialises `credential` in a temp file for the duration of `consume`.
///
/// `consume` receives the path (for example to stream it into `chpasswd`).
/// The file is gone when this returns, on success and on error alike.
pub async fn with_credential_file<F, Fut, T, E>(credential: &Credential, consume: F) -> Result<T, E>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<SecretError>,
{
    with_credential_file_in(&std::env::temp_dir(), credential, consume).await
}

pub async fn with_credential_file_in<F, Fut, T, E>(
    dir: &Path,
    credential: &Credential,
    consume: F,
) -> Result<T, E>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<SecretError>,
{
    let guard = CredentialFile::create_in(dir, credential).map_err(E::from)?;
    let result = consume(guard.path().to_path_buf()).await;
    drop(guard);
    result
}
