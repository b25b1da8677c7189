//! Test doubles for the boundary and the reporter.
//!
//! Enabled for unit tests and, through the `test-utils` feature, for the
//! integration tests of this and downstream crates.

use crate::reporter::{Level, Reporter};
use crate::state::{Outcome, RunReport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use wslup_boundary::{
    Boundary, BoundaryError, ExecOutput, ExecuteOptions, StdinSource, Target,
};

#[derive(Debug, Clone)]
enum Response {
    Output(ExecOutput),
    Unreachable,
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    /// Consumed front to back; the last entry repeats forever.
    responses: VecDeque<Response>,
}

impl Rule {
    fn next(&mut self) -> Response {
        if self.responses.len() > 1 {
            self.responses.pop_front().unwrap_or(Response::Unreachable)
        } else {
            self.responses
                .front()
                .cloned()
                .unwrap_or(Response::Unreachable)
        }
    }
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub target: Target,
    /// Program and arguments joined by single spaces, untruncated.
    pub command: String,
    /// Stdin contents at call time. Files are read when the call happens.
    pub stdin: Option<Vec<u8>>,
}

/// Scripted boundary.
///
/// Responses are matched by substring against the full command line. Rules
/// added later win over earlier ones; unmatched commands succeed with empty
/// output.
#[derive(Default)]
pub struct MockBoundary {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Call>>,
    attaches: Mutex<Vec<Target>>,
}

impl MockBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, output: ExecOutput) -> Self {
        self.push_rule(pattern, vec![Response::Output(output)])
    }

    /// Successive matches get successive outputs, the last one repeats.
    pub fn on_seq(self, pattern: &str, outputs: Vec<ExecOutput>) -> Self {
        self.push_rule(pattern, outputs.into_iter().map(Response::Output).collect())
    }

    /// Matching commands fail to spawn.
    pub fn unreachable(self, pattern: &str) -> Self {
        self.push_rule(pattern, vec![Response::Unreachable])
    }

    fn push_rule(self, pattern: &str, responses: Vec<Response>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            responses: responses.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    /// Number of recorded commands containing `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.count(pattern) > 0
    }

    pub fn attaches(&self) -> Vec<Target> {
        self.attaches.lock().unwrap().clone()
    }
}

pub fn command_line(options: &ExecuteOptions) -> String {
    let mut parts = vec![options.program.clone()];
    parts.extend(options.args.iter().cloned());
    parts.join(" ")
}

#[async_trait]
impl Boundary for MockBoundary {
    async fn run(&self, options: ExecuteOptions) -> Result<ExecOutput, BoundaryError> {
        let command = command_line(&options);
        let stdin = match &options.stdin {
            StdinSource::Null => None,
            StdinSource::Bytes(bytes) => Some(bytes.clone()),
            StdinSource::File(path) => Some(std::fs::read(path)?),
        };
        self.calls.lock().unwrap().push(Call {
            target: options.target.clone(),
            command: command.clone(),
            stdin,
        });

        let response = {
            let mut rules = self.rules.lock().unwrap();
            rules
                .iter_mut()
                .rev()
                .find(|r| command.contains(&r.pattern))
                .map(Rule::next)
        };

        match response {
            Some(Response::Output(out)) => Ok(out),
            Some(Response::Unreachable) => Err(BoundaryError::Spawn {
                program: options.program,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "unreachable"),
            }),
            None => Ok(ExecOutput::ok("")),
        }
    }

    async fn attach(&self, target: &Target) -> Result<Option<i32>, BoundaryError> {
        self.attaches.lock().unwrap().push(target.clone());
        Ok(Some(0))
    }
}

/// Reporter that records every callback as a flat string.
///
/// `start:<n>/<total>:<name>`, `outcome:<name>:<kind>`,
/// `summary:<changed>:<unchanged>:<failed>` and `<level>:<message>`.
#[derive(Debug, Default)]
pub struct MockReporter {
    pub events: Vec<String>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for MockReporter {
    fn report(&mut self, level: Level, message: &str) {
        let level = match level {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
        };
        self.events.push(format!("{level}:{message}"));
    }

    fn on_step_start(&mut self, index: usize, total: usize, name: &str) {
        self.events
            .push(format!("start:{}/{}:{}", index + 1, total, name));
    }

    fn on_step_outcome(&mut self, name: &str, outcome: &Outcome) {
        let kind = match outcome {
            Outcome::Skipped { .. } => "skipped",
            Outcome::Applied { .. } => "applied",
            Outcome::Planned { .. } => "planned",
            Outcome::Failed { .. } => "failed",
        };
        self.events.push(format!("outcome:{name}:{kind}"));
    }

    fn on_summary(&mut self, report: &RunReport) {
        let (skipped, applied, failed) = report.counts();
        self.events
            .push(format!("summary:{applied}:{skipped}:{failed}"));
    }
}
