//! Shared child-process plumbing for the real boundaries.

use crate::executor::{BoundaryError, ExecOutput, StdinSource};
use crate::output::decode_output;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub(crate) async fn execute(
    mut cmd: Command,
    program: &str,
    stdin: &StdinSource,
) -> Result<ExecOutput, BoundaryError> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    match stdin {
        StdinSource::Null => {
            cmd.stdin(Stdio::null());
        }
        StdinSource::Bytes(_) => {
            cmd.stdin(Stdio::piped());
        }
        StdinSource::File(path) => {
            let file = std::fs::File::open(path)?;
            cmd.stdin(Stdio::from(file));
        }
    }

    let mut child = cmd.spawn().map_err(|source| BoundaryError::Spawn {
        program: program.to_string(),
        source,
    })?;

    // stdin is fed while stdout and stderr drain, so neither pipe can fill up
    let child_stdin = child.stdin.take();
    let feed = async {
        if let (StdinSource::Bytes(data), Some(mut pipe)) = (stdin, child_stdin) {
            match pipe.write_all(data).await {
                Ok(()) => pipe.shutdown().await?,
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!(program, "child closed stdin early");
                }
                Err(e) => return Err(e),
            }
        }
        Ok::<(), std::io::Error>(())
    };
    let ((), output) = tokio::try_join!(feed, child.wait_with_output())?;

    Ok(ExecOutput {
        stdout: decode_output(&output.stdout),
        stderr: decode_output(&output.stderr),
        code: output.status.code(),
    })
}
