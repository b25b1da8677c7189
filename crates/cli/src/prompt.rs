//! Line-based interactive questions.

use std::io::{self, BufRead, Write};
use wslup_secret::{capture, read_password_line, Credential, SecretError, TerminalSecretReader};

pub trait Prompt {
    /// Free text. An empty answer yields `default`.
    fn input(&mut self, question: &str, default: &str) -> io::Result<String>;

    fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool>;

    fn password(&mut self, username: &str) -> Result<Credential, SecretError>;
}

/// Questions on `output`, answers from `input`.
///
/// Passwords are read masked from the terminal, or as the next input line
/// when `password_from_input` is set.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
    password_from_input: bool,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W, password_from_input: bool) -> Self {
        Self {
            input,
            output,
            password_from_input,
        }
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn input(&mut self, question: &str, default: &str) -> io::Result<String> {
        if default.is_empty() {
            write!(self.output, "{question}: ")?;
        } else {
            write!(self.output, "{question} [{default}]: ")?;
        }
        self.output.flush()?;

        let answer = self.read_line()?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            write!(self.output, "{question} [{hint}]: ")?;
            self.output.flush()?;
            match self.read_line()?.to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    fn password(&mut self, username: &str) -> Result<Credential, SecretError> {
        if self.password_from_input {
            read_password_line(&mut self.input, username)
        } else {
            capture(&mut TerminalSecretReader, username)
        }
    }
}
