//! Boundary trait and the request/response types around it.

use crate::Target;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// What the child process reads on stdin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StdinSource {
    #[default]
    Null,
    Bytes(Vec<u8>),
    /// Stream a file as stdin. The file is opened by the boundary, its contents
    /// never pass through the caller.
    File(PathBuf),
}

/// A single command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub target: Target,
    pub program: String,
    pub args: Vec<String>,
    pub stdin: StdinSource,
}

impl ExecuteOptions {
    pub fn new<I, S>(target: Target, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target,
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: StdinSource::Null,
        }
    }

    pub fn host<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Target::Host, program, args)
    }

    /// `sh -c <script>` on the given target.
    pub fn shell(target: Target, script: impl Into<String>) -> Self {
        Self {
            target,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.into()],
            stdin: StdinSource::Null,
        }
    }

    pub fn with_stdin(mut self, stdin: StdinSource) -> Self {
        self.stdin = stdin;
        self
    }

    /// Program and arguments joined for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        for arg in &self.args {
            if arg.chars().count() > 80 {
                parts.push(format!("{}…", arg.chars().take(80).collect::<String>()));
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExecOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    pub fn exit(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            code: Some(code),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("'{command}' exited with {}: {output}", display_code(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Unsupported on this boundary: {0}")]
    Unsupported(String),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

/// Trait for every side-effecting command the provisioner issues.
///
/// Calls block the calling flow until the child exits. There is no timeout.
#[async_trait]
pub trait Boundary: Send + Sync {
    /// Runs a command and returns its output regardless of the exit code.
    /// An `Err` means the command could not be executed at all.
    async fn run(&self, options: ExecuteOptions) -> Result<ExecOutput, BoundaryError>;

    /// Opens an interactive session on the target with inherited stdio.
    async fn attach(&self, target: &Target) -> Result<Option<i32>, BoundaryError>;

    /// Like [`Boundary::run`], but turns a non-zero exit into an error.
    async fn run_checked(&self, options: ExecuteOptions) -> Result<ExecOutput, BoundaryError> {
        let command = options.display_command();
        let output = self.run(options).await?;
        if !output.success() {
            return Err(BoundaryError::NonZeroExit {
                command,
                code: output.code,
                output: output.combined().trim().to_string(),
            });
        }
        Ok(output)
    }
}
