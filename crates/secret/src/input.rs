use crate::credential::wipe_string;
use crate::{Credential, SecretError, CAPTURE_ATTEMPTS};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, Write};

/// Source of masked input.
pub trait SecretReader {
    fn read_secret(&mut self, prompt: &str) -> io::Result<String>;
    fn notice(&mut self, message: &str);
}

/// Reads from the terminal in raw mode, echoing `*` per character.
#[derive(Debug, Default)]
pub struct TerminalSecretReader;

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Collects keys into `value` until Enter.
fn read_masked(stderr: &mut io::Stderr, value: &mut String) -> io::Result<()> {
    let _raw = RawModeGuard::enable()?;
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(()),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
            }
            KeyCode::Backspace => {
                if value.pop().is_some() {
                    write!(stderr, "\x08 \x08")?;
                }
            }
            KeyCode::Char(c) => {
                push_secret(value, c);
                write!(stderr, "*")?;
            }
            _ => {}
        }
        stderr.flush()?;
    }
}

impl SecretReader for TerminalSecretReader {
    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{prompt}")?;
        stderr.flush()?;

        let mut value = String::with_capacity(64);
        if let Err(e) = read_masked(&mut stderr, &mut value).and_then(|()| writeln!(stderr)) {
            wipe_string(&mut value);
            return Err(e);
        }
        Ok(value)
    }

    fn notice(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// `String::push` that wipes the old buffer when it has to grow.
fn push_secret(value: &mut String, c: char) {
    if value.len() + c.len_utf8() > value.capacity() {
        let mut grown = String::with_capacity(value.capacity() * 2 + c.len_utf8());
        grown.push_str(value);
        wipe_string(value);
        *value = grown;
    }
    value.push(c);
}

/// Asks for the password twice until both entries match and are non-empty.
pub fn capture<R: SecretReader>(reader: &mut R, username: &str) -> Result<Credential, SecretError> {
    crate::validate_username(username)?;

    for _ in 0..CAPTURE_ATTEMPTS {
        let mut first = read(reader, &format!("Password for {username}: "))?;
        if first.is_empty() {
            reader.notice("Password must not be empty.");
            continue;
        }
        let mut second = match read(reader, "Repeat password: ") {
            Ok(second) => second,
            Err(e) => {
                wipe_string(&mut first);
                return Err(e);
            }
        };
        let matched = first == second;
        wipe_string(&mut second);
        if !matched {
            wipe_string(&mut first);
            reader.notice("Passwords do not match.");
            continue;
        }
        return Credential::new(username, first);
    }
    Err(SecretError::Mismatch(CAPTURE_ATTEMPTS))
}

fn read<R: SecretReader>(reader: &mut R, prompt: &str) -> Result<String, SecretError> {
    reader.read_secret(prompt).map_err(|e| match e.kind() {
        io::ErrorKind::Interrupted => SecretError::Cancelled,
        _ => SecretError::Io(e),
    })
}

/// Reads a password from the first line of `input` (for `--password-stdin`).
pub fn read_password_line<B: BufRead>(input: B, username: &str) -> Result<Credential, SecretError> {
    let mut line = String::new();
    let mut input = input;
    let read = input.read_line(&mut line);
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    wipe_string(&mut line);
    if let Err(e) = read {
        let mut password = password;
        wipe_string(&mut password);
        return Err(e.into());
    }
    Credential::new(username, password)
}
