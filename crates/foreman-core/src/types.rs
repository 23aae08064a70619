use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// SDLC lifecycle phase. `Completed` and `Aborted` are terminal; `Paused` is
/// an orthogonal suspend state reached through gate decisions rather than
/// the transition table (see `machine`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AnalyzingBrd,
    Requirements,
    Design,
    Implementation,
    Testing,
    Deployment,
    Monitoring,
    Completed,
    Paused,
    Aborted,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Idle,
            Phase::AnalyzingBrd,
            Phase::Requirements,
            Phase::Design,
            Phase::Implementation,
            Phase::Testing,
            Phase::Deployment,
            Phase::Monitoring,
            Phase::Completed,
            Phase::Paused,
            Phase::Aborted,
        ]
    }

    /// The six working phases seeded into `pending_phases` on project init.
    pub fn working() -> &'static [Phase] {
        &[
            Phase::Requirements,
            Phase::Design,
            Phase::Implementation,
            Phase::Testing,
            Phase::Deployment,
            Phase::Monitoring,
        ]
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::AnalyzingBrd => "analyzing_brd",
            Phase::Requirements => "requirements",
            Phase::Design => "design",
            Phase::Implementation => "implementation",
            Phase::Testing => "testing",
            Phase::Deployment => "deployment",
            Phase::Monitoring => "monitoring",
            Phase::Completed => "completed",
            Phase::Paused => "paused",
            Phase::Aborted => "aborted",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::error::ForemanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Phase::Idle),
            "analyzing_brd" => Ok(Phase::AnalyzingBrd),
            "requirements" => Ok(Phase::Requirements),
            "design" => Ok(Phase::Design),
            "implementation" => Ok(Phase::Implementation),
            "testing" => Ok(Phase::Testing),
            "deployment" => Ok(Phase::Deployment),
            "monitoring" => Ok(Phase::Monitoring),
            "completed" => Ok(Phase::Completed),
            "paused" => Ok(Phase::Paused),
            "aborted" => Ok(Phase::Aborted),
            _ => Err(crate::error::ForemanError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// GateDecision
// ---------------------------------------------------------------------------

/// Human decision at a gate. Parsed case-insensitively from whatever string
/// the decision source returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Approve,
    Revise,
    Pause,
    Abort,
}

impl GateDecision {
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(GateDecision::Approve),
            "revise" => Ok(GateDecision::Revise),
            "pause" => Ok(GateDecision::Pause),
            "abort" => Ok(GateDecision::Abort),
            _ => Err(crate::error::ForemanError::UnknownDecision(s.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateDecision::Approve => "approve",
            GateDecision::Revise => "revise",
            GateDecision::Pause => "pause",
            GateDecision::Abort => "abort",
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// GateState
// ---------------------------------------------------------------------------

/// Per-gate processing status. One-way until the gate is re-triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Pending,
    Approved,
    RevisionRequested,
    Paused,
    Aborted,
}

impl GateState {
    pub fn as_str(self) -> &'static str {
        match self {
            GateState::Pending => "pending",
            GateState::Approved => "approved",
            GateState::RevisionRequested => "revision_requested",
            GateState::Paused => "paused",
            GateState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GateDecision> for GateState {
    fn from(d: GateDecision) -> Self {
        match d {
            GateDecision::Approve => GateState::Approved,
            GateDecision::Revise => GateState::RevisionRequested,
            GateDecision::Pause => GateState::Paused,
            GateDecision::Abort => GateState::Aborted,
        }
    }
}

// ---------------------------------------------------------------------------
// TargetCli
// ---------------------------------------------------------------------------

/// Front-ends a checkpoint can be exported for. Export variants differ only
/// in descriptive metadata; the core behaves identically for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCli {
    Claude,
    Gemini,
    Copilot,
    Qwen,
    Universal,
}

impl TargetCli {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetCli::Claude => "claude",
            TargetCli::Gemini => "gemini",
            TargetCli::Copilot => "copilot",
            TargetCli::Qwen => "qwen",
            TargetCli::Universal => "universal",
        }
    }
}

impl fmt::Display for TargetCli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetCli {
    type Err = crate::error::ForemanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claude" => Ok(TargetCli::Claude),
            "gemini" => Ok(TargetCli::Gemini),
            "copilot" => Ok(TargetCli::Copilot),
            "qwen" => Ok(TargetCli::Qwen),
            "universal" => Ok(TargetCli::Universal),
            _ => Err(crate::error::ForemanError::UnknownTargetCli(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn phase_roundtrip() {
        for phase in Phase::all() {
            let parsed = Phase::from_str(phase.as_str()).unwrap();
            assert_eq!(*phase, parsed);
        }
    }

    #[test]
    fn phase_serde_snake_case() {
        let json = serde_json::to_string(&Phase::AnalyzingBrd).unwrap();
        assert_eq!(json, "\"analyzing_brd\"");
        let parsed: Phase = serde_json::from_str("\"analyzing_brd\"").unwrap();
        assert_eq!(parsed, Phase::AnalyzingBrd);
    }

    #[test]
    fn terminal_phases() {
        assert!(Phase::Completed.is_terminal());
        assert!(Phase::Aborted.is_terminal());
        assert!(!Phase::Paused.is_terminal());
        assert!(!Phase::Monitoring.is_terminal());
    }

    #[test]
    fn decision_parse_case_insensitive() {
        assert_eq!(GateDecision::parse("APPROVE").unwrap(), GateDecision::Approve);
        assert_eq!(GateDecision::parse("Revise").unwrap(), GateDecision::Revise);
        assert_eq!(GateDecision::parse(" pause ").unwrap(), GateDecision::Pause);
        assert!(GateDecision::parse("ship-it").is_err());
    }

    #[test]
    fn decision_maps_to_state() {
        assert_eq!(GateState::from(GateDecision::Approve), GateState::Approved);
        assert_eq!(
            GateState::from(GateDecision::Revise),
            GateState::RevisionRequested
        );
        assert_eq!(GateState::from(GateDecision::Pause), GateState::Paused);
        assert_eq!(GateState::from(GateDecision::Abort), GateState::Aborted);
    }

    #[test]
    fn target_cli_parse() {
        assert_eq!(TargetCli::from_str("gemini").unwrap(), TargetCli::Gemini);
        assert_eq!(TargetCli::from_str("Claude").unwrap(), TargetCli::Claude);
        assert!(TargetCli::from_str("vim").is_err());
    }
}
