//! Fixed SDLC phase transition table.
//!
//! Events are plain strings supplied by callers (gate outcomes, pipeline
//! results). `Completed` and `Aborted` have no outgoing edges. `Paused` is
//! deliberately absent: suspension is handled by checkpoint save/load, not
//! by the table.

use crate::types::Phase;

/// Look up the target phase for `(phase, event)`. Returns `None` when the
/// event is not valid for the phase.
pub fn next_phase(phase: Phase, event: &str) -> Option<Phase> {
    let next = match (phase, event) {
        (Phase::Idle, "start") => Phase::AnalyzingBrd,
        (Phase::AnalyzingBrd, "brd_parsed") => Phase::Requirements,
        (Phase::Requirements, "prd_approved") => Phase::Design,
        (Phase::Requirements, "prd_revision") => Phase::Requirements,
        (Phase::Design, "architecture_approved") => Phase::Implementation,
        (Phase::Design, "design_revision") => Phase::Design,
        (Phase::Implementation, "code_review_passed") => Phase::Testing,
        (Phase::Implementation, "code_revision") => Phase::Implementation,
        (Phase::Testing, "tests_passed") => Phase::Deployment,
        (Phase::Testing, "test_failures") => Phase::Implementation,
        (Phase::Deployment, "deployed") => Phase::Monitoring,
        (Phase::Deployment, "deployment_failed") => Phase::Deployment,
        (Phase::Monitoring, "client_accepted") => Phase::Completed,
        _ => return None,
    };
    Some(next)
}

/// Events accepted from `phase`, for error messages and CLI help.
pub fn valid_events(phase: Phase) -> &'static [&'static str] {
    match phase {
        Phase::Idle => &["start"],
        Phase::AnalyzingBrd => &["brd_parsed"],
        Phase::Requirements => &["prd_approved", "prd_revision"],
        Phase::Design => &["architecture_approved", "design_revision"],
        Phase::Implementation => &["code_review_passed", "code_revision"],
        Phase::Testing => &["tests_passed", "test_failures"],
        Phase::Deployment => &["deployed", "deployment_failed"],
        Phase::Monitoring => &["client_accepted"],
        Phase::Completed | Phase::Paused | Phase::Aborted => &[],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
