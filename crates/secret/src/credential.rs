use crate::SecretError;
use std::fmt;
use std::sync::atomic::{compiler_fence, Ordering};

/// Account name and password for the account being provisioned.
pub struct Credential {
    username: String,
    password: Vec<u8>,
}

impl Credential {
    pub fn new(username: &str, mut password: String) -> Result<Self, SecretError> {
        if let Err(e) = validate_username(username) {
            wipe_string(&mut password);
            return Err(e);
        }
        if password.is_empty() {
            return Err(SecretError::EmptyPassword);
        }
        Ok(Self {
            username: username.to_string(),
            password: password.into_bytes(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `user:password\n`, the line format `chpasswd` reads.
    pub(crate) fn chpasswd_line(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.username.len() + self.password.len() + 2);
        line.extend_from_slice(self.username.as_bytes());
        line.push(b':');
        line.extend_from_slice(&self.password);
        line.push(b'\n');
        line
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        wipe_vec(&mut self.password);
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub(crate) fn wipe(bytes: &mut [u8]) {
    bytes.fill(0);
    compiler_fence(Ordering::SeqCst);
}

/// Also zeroes the spare capacity, where `pop` and `truncate` leave bytes behind.
pub(crate) fn wipe_vec(bytes: &mut Vec<u8>) {
    for b in bytes.spare_capacity_mut() {
        b.write(0);
    }
    wipe(bytes);
}

/// Zeroes `s` in place. The allocation is kept, its contents become NULs.
pub(crate) fn wipe_string(s: &mut String) {
    let mut bytes = std::mem::take(s).into_bytes();
    wipe_vec(&mut bytes);
    *s = String::from_utf8(bytes).unwrap_or_default();
}

/// Checks `name` against the rules `useradd` enforces by default on Ubuntu.
pub fn validate_username(name: &str) -> Result<(), SecretError> {
    let invalid = |reason| SecretError::InvalidUsername {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > 32 {
        return Err(invalid("must be at most 32 characters"));
    }
    if name == "root" {
        return Err(invalid("root is reserved"));
    }
    let mut chars = name.chars();
    if !chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
    {
        return Err(invalid("must start with a lowercase letter or underscore"));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
        return Err(invalid("may only contain a-z, 0-9, '_' and '-'"));
    }
    Ok(())
}
