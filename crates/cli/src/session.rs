//! Confirmation gate, the run itself and the launch offer afterwards.

use crate::prompt::Prompt;
use wslup_boundary::{Boundary, Target};
use wslup_converge::{
    ConvergenceStep, Provision, Reporter, RunError, RunMode, RunOptions, RunReport, StepRunner,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Session {
    pub run: RunOptions,
    /// `--yes`: no confirmation and no launch offer.
    pub assume_yes: bool,
    pub offer_launch: bool,
    /// Print the report as JSON on stdout, also for a failed run.
    pub json: bool,
}

pub async fn converge<R: Reporter>(
    boundary: &dyn Boundary,
    prompt: &mut dyn Prompt,
    reporter: &mut R,
    provision: &Provision,
    steps: &[Box<dyn ConvergenceStep>],
    session: Session,
) -> anyhow::Result<RunReport> {
    let apply = session.run.mode == RunMode::Apply;
    if apply && !session.assume_yes && !prompt.confirm("Proceed?", false)? {
        return Err(RunError::Declined.into());
    }

    let report = match StepRunner::new(boundary, reporter, session.run)
        .run(steps)
        .await
    {
        Ok(report) => report,
        Err(failure) => {
            if session.json {
                println!("{}", serde_json::to_string_pretty(&failure.report)?);
            }
            return Err(failure.error.into());
        }
    };
    if session.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if apply && session.offer_launch && !session.assume_yes {
        let question = format!(
            "Open a shell as {} in {} now?",
            provision.username, provision.distro
        );
        if prompt.confirm(&question, true)? {
            let target = Target::user(&provision.distro, &provision.username);
            tracing::debug!(?target, "attaching");
            boundary.attach(&target).await?;
        }
    }

    Ok(report)
}
