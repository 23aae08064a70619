use crate::types::{GateState, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// ProjectState
// ---------------------------------------------------------------------------

/// Complete project state for checkpoint/resume.
///
/// `completed_phases` is append-only: a phase is pushed exactly when the
/// state machine transitions away from it. Mutation happens only through
/// `ProjectOrchestrator::transition` and the explicit setters below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    pub project_id: String,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
    pub current_phase: Phase,
    pub current_subphase: Option<String>,
    pub completed_phases: Vec<Phase>,
    pub pending_phases: Vec<Phase>,
    pub current_task: String,
    pub next_recommended_action: String,
    pub token_usage: u64,
    #[serde(default)]
    pub human_gates_status: BTreeMap<String, GateState>,
    #[serde(default)]
    pub critical_decisions: Vec<String>,
    #[serde(default)]
    pub workflow_config: BTreeMap<String, serde_json::Value>,
}

impl ProjectState {
    pub fn new(project_id: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            created_at: Utc::now(),
            current_phase: Phase::Idle,
            current_subphase: None,
            completed_phases: Vec::new(),
            pending_phases: Phase::working().to_vec(),
            current_task: "Project initialization".to_string(),
            next_recommended_action: "foreman transition start".to_string(),
            token_usage: 0,
            human_gates_status: BTreeMap::new(),
            critical_decisions: Vec::new(),
            workflow_config: BTreeMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn set_task(&mut self, task: &str, next_action: &str) {
        self.current_task = task.to_string();
        self.next_recommended_action = next_action.to_string();
    }

    pub fn set_subphase(&mut self, subphase: Option<&str>) {
        self.current_subphase = subphase.map(str::to_string);
    }

    pub fn set_token_usage(&mut self, tokens: u64) {
        self.token_usage = tokens;
    }

    pub fn record_decision(&mut self, decision: &str) {
        self.critical_decisions.push(decision.to_string());
    }

    pub fn record_gate(&mut self, gate_id: &str, state: GateState) {
        self.human_gates_status.insert(gate_id.to_string(), state);
    }

    /// Advance to `next`, marking the current phase completed and removing
    /// the target from the pending list. Called only by the state machine.
    pub(crate) fn advance(&mut self, next: Phase) {
        self.completed_phases.push(self.current_phase);
        self.pending_phases.retain(|p| *p != next);
        self.current_phase = next;
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    pub fn progress_percent(&self) -> f64 {
        let total = self.completed_phases.len() + self.pending_phases.len();
        if total == 0 {
            return 0.0;
        }
        self.completed_phases.len() as f64 / total as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_idle() {
        let state = ProjectState::new("billing", "Billing Portal");
        assert_eq!(state.current_phase, Phase::Idle);
        assert!(state.completed_phases.is_empty());
        assert_eq!(state.pending_phases.len(), 6);
        assert_eq!(state.token_usage, 0);
    }

    #[test]
    fn advance_appends_and_retains() {
        let mut state = ProjectState::new("p", "P");
        state.advance(Phase::AnalyzingBrd);
        assert_eq!(state.current_phase, Phase::AnalyzingBrd);
        assert_eq!(state.completed_phases, vec![Phase::Idle]);

        state.advance(Phase::Requirements);
        assert_eq!(state.completed_phases, vec![Phase::Idle, Phase::AnalyzingBrd]);
        assert!(!state.pending_phases.contains(&Phase::Requirements));
    }

    #[test]
    fn json_roundtrip_equality() {
        let mut state = ProjectState::new("billing", "Billing Portal");
        state.advance(Phase::AnalyzingBrd);
        state.record_decision("use postgres");
        state.record_gate("prd-approval", GateState::Approved);
        state.set_token_usage(42_000);

        let json = serde_json::to_string(&state).unwrap();
        let loaded: ProjectState = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.current_phase, Phase::AnalyzingBrd);
    }

    #[test]
    fn progress_tracks_completed_share() {
        let mut state = ProjectState::new("p", "P");
        assert_eq!(state.progress_percent(), 0.0);
        state.advance(Phase::AnalyzingBrd);
        state.advance(Phase::Requirements);
        // 2 completed, 5 pending remain
        let pct = state.progress_percent();
        assert!((pct - 2.0 / 7.0 * 100.0).abs() < 1e-9);
    }
}
