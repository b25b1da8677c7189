//! Pure decision function: what to do with one step.
//!
//! No side effects and deterministic, so every combination is testable
//! without a boundary.

use crate::state::{ProbeResult, SkipReason};
use crate::step::ApplyPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    Apply {
        unknown_probe: Option<String>,
    },
    /// Strict mode refused to act on an unknown probe of a required step.
    Abort(String),
}

/// Whether a step must be probed at all before [`decide`] can be called.
pub fn needs_probe(enabled: bool, policy: ApplyPolicy) -> bool {
    enabled && policy == ApplyPolicy::ProbeFirst
}

/// Decides the action for one step.
///
/// `probe` must be `Some` exactly when [`needs_probe`] returned true.
pub fn decide(
    enabled: bool,
    policy: ApplyPolicy,
    required: bool,
    strict: bool,
    probe: Option<&ProbeResult>,
) -> Decision {
    if !enabled {
        return Decision::Skip(SkipReason::Disabled);
    }
    if policy == ApplyPolicy::Always {
        return Decision::Apply {
            unknown_probe: None,
        };
    }

    match probe {
        Some(ProbeResult::Satisfied) => Decision::Skip(SkipReason::AlreadySatisfied),
        Some(ProbeResult::Unknown(msg)) if strict && required => Decision::Abort(msg.clone()),
        Some(ProbeResult::Unknown(msg)) => Decision::Apply {
            unknown_probe: Some(msg.clone()),
        },
        Some(ProbeResult::Unsatisfied) | None => Decision::Apply {
            unknown_probe: None,
        },
    }
}
