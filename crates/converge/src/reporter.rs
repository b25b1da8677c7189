//! Reporter - user-facing progress output
//!
//! The engine never prints directly. Console output, test recording or JSON
//! collection all go through this trait.

use crate::state::{Outcome, RunReport, SkipReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
}

pub trait Reporter {
    fn report(&mut self, level: Level, message: &str);

    /// Called before a step is probed or applied.
    fn on_step_start(&mut self, index: usize, total: usize, name: &str) {
        self.report(Level::Info, &format!("[{}/{}] {}", index + 1, total, name));
    }

    fn on_step_outcome(&mut self, name: &str, outcome: &Outcome) {
        let (level, message) = describe(name, outcome);
        self.report(level, &message);
    }

    fn on_summary(&mut self, report: &RunReport) {
        let (skipped, applied, failed) = report.counts();
        let level = if failed > 0 { Level::Warn } else { Level::Success };
        self.report(
            level,
            &format!("{applied} changed, {skipped} unchanged, {failed} failed"),
        );
    }
}

fn describe(name: &str, outcome: &Outcome) -> (Level, String) {
    match outcome {
        Outcome::Skipped {
            reason: SkipReason::AlreadySatisfied,
        } => (Level::Info, format!("{name}: already satisfied")),
        Outcome::Skipped {
            reason: SkipReason::Disabled,
        } => (Level::Info, format!("{name}: disabled")),
        Outcome::Applied {
            unknown_probe: Some(why),
            ..
        } => (
            Level::Warn,
            format!("{name}: applied (state could not be probed: {why})"),
        ),
        Outcome::Applied { guest, .. } if !guest.is_empty() => {
            let steps: Vec<String> = guest
                .iter()
                .map(|g| format!("{} {}", g.name, g.outcome))
                .collect();
            (Level::Success, format!("{name}: applied ({})", steps.join(", ")))
        }
        Outcome::Applied { .. } => (Level::Success, format!("{name}: applied")),
        Outcome::Planned {
            unknown_probe: Some(why),
        } => (Level::Warn, format!("{name}: would apply (probe failed: {why})")),
        Outcome::Planned { .. } => (Level::Info, format!("{name}: would apply")),
        Outcome::Failed { message } => (Level::Error, format!("{name} failed: {message}")),
    }
}

/// Coloured console output on stdout/stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only warnings and errors are printed.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, level: Level, message: &str) {
        match level {
            Level::Info if !self.quiet => println!("· {message}"),
            Level::Info => {}
            Level::Success if !self.quiet => println!("\x1b[1;32m✓ {message}\x1b[0m"),
            Level::Success => {}
            Level::Warn => eprintln!("\x1b[1;33m! {message}\x1b[0m"),
            Level::Error => eprintln!("\x1b[1;31m✗ {message}\x1b[0m"),
        }
    }

    fn on_step_start(&mut self, index: usize, total: usize, name: &str) {
        if !self.quiet {
            println!("\x1b[1;34m▶ [{}/{}] {}\x1b[0m", index + 1, total, name);
        }
    }
}
