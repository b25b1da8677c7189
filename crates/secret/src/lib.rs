//! wslup_secret - capture a password and hand it to exactly one consumer
//!
//! The password lives in process memory inside [`Credential`] and, for the
//! duration of one handoff, in a temp file readable only by the current user.
//! The file is removed when the handoff scope ends, whether the consumer
//! succeeded, failed or panicked.

mod credential;
mod handoff;
mod input;

pub use credential::{validate_username, Credential};
pub use handoff::{with_credential_file, with_credential_file_in};
pub use input::{capture, read_password_line, SecretReader, TerminalSecretReader};

use thiserror::Error;

/// Maximum number of attempts to type a matching password twice.
pub const CAPTURE_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid user name '{name}': {reason}")]
    InvalidUsername { name: String, reason: &'static str },

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Passwords did not match after {0} attempts")]
    Mismatch(usize),

    #[error("Password input cancelled")]
    Cancelled,
}
