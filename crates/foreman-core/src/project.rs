//! Project lifecycle orchestration: owns the active `ProjectState`, drives
//! transitions through the fixed phase table, and checkpoints on every
//! state change.

use crate::checkpoint::CheckpointStore;
use crate::context::{ContextAction, ContextManager};
use crate::error::{ForemanError, Result};
use crate::machine;
use crate::paths;
use crate::state::ProjectState;
use crate::types::Phase;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

// ---------------------------------------------------------------------------
// PhaseStatus
// ---------------------------------------------------------------------------

/// Snapshot of the current phase for reporting (CLI `state` command, gate
/// artifact context).
#[derive(Debug, Clone, Serialize)]
pub struct PhaseStatus {
    pub project_id: String,
    pub project_name: String,
    pub current_phase: Phase,
    pub current_subphase: Option<String>,
    pub current_task: String,
    pub completed_phases: Vec<Phase>,
    pub pending_phases: Vec<Phase>,
    pub progress_percent: f64,
    pub token_usage: u64,
    pub context_status: ContextAction,
}

// ---------------------------------------------------------------------------
// ProjectOrchestrator
// ---------------------------------------------------------------------------

/// Single-writer owner of `ProjectState`. Not designed for concurrent
/// callers: one orchestrator per project.
pub struct ProjectOrchestrator {
    root: PathBuf,
    state: Option<ProjectState>,
    checkpoints: CheckpointStore,
    context: ContextManager,
}

impl ProjectOrchestrator {
    pub fn new(root: impl Into<PathBuf>, max_tokens: u64) -> Self {
        let root = root.into();
        let checkpoints = CheckpointStore::new(&root);
        Self {
            root,
            state: None,
            checkpoints,
            context: ContextManager::new(max_tokens),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> Option<&ProjectState> {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> Option<&mut ProjectState> {
        self.state.as_mut()
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Initialize a new project, seeding state at `Idle` and saving the
    /// first checkpoint.
    pub fn initialize_project(
        &mut self,
        project_id: &str,
        project_name: &str,
        workflow_config: BTreeMap<String, serde_json::Value>,
    ) -> Result<&ProjectState> {
        paths::validate_project_id(project_id)?;

        let mut state = ProjectState::new(project_id, project_name);
        state.workflow_config = workflow_config;

        self.checkpoints.save(&state, "project_initialization")?;
        info!(project_id, project_name, "project initialized");

        self.state = Some(state);
        Ok(self.state.as_ref().unwrap())
    }

    /// Resume from the latest (or given) checkpoint. Returns `false` if no
    /// usable checkpoint was found.
    pub fn resume(&mut self, checkpoint: Option<&Path>) -> Result<bool> {
        match self.checkpoints.load(checkpoint)? {
            Some(state) => {
                self.context.update_usage(state.token_usage);
                self.state = Some(state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fire a transition event.
    ///
    /// Returns `Ok(false)` — with an error log, the state untouched — when
    /// there is no active project or the event is not valid for the current
    /// phase. On a valid transition the old phase is appended to
    /// `completed_phases` and a checkpoint is saved unconditionally; a
    /// checkpoint write failure is the only `Err` path.
    pub fn transition(&mut self, event: &str) -> Result<bool> {
        let Some(state) = self.state.as_mut() else {
            error!(event, "no active project state");
            return Ok(false);
        };

        let current = state.current_phase;
        let Some(next) = machine::next_phase(current, event) else {
            error!(
                event,
                phase = %current,
                valid = ?machine::valid_events(current),
                "invalid event for phase"
            );
            return Ok(false);
        };

        info!(from = %current, to = %next, event, "phase transition");
        state.advance(next);
        self.checkpoints.save(state, &format!("transition_{event}"))?;
        Ok(true)
    }

    /// Suspend the project without a table transition: checkpoint with a
    /// `paused` reason and leave `current_phase` where it is. Resuming is
    /// `resume()` + continuing from the recorded phase.
    pub fn pause(&mut self, reason: &str) -> Result<PathBuf> {
        let state = self.state.as_ref().ok_or(ForemanError::NoProject)?;
        info!(reason, phase = %state.current_phase, "project paused");
        self.checkpoints.save(state, &format!("paused_{reason}"))
    }

    // -----------------------------------------------------------------------
    // Token accounting
    // -----------------------------------------------------------------------

    /// Record cumulative token usage and return the recommended action. A
    /// `ForceCheckpointAndExit` recommendation saves an emergency
    /// checkpoint immediately.
    pub fn record_token_usage(&mut self, tokens: u64) -> Result<ContextAction> {
        self.context.update_usage(tokens);
        if let Some(state) = self.state.as_mut() {
            state.set_token_usage(tokens);
        }
        let action = self.context.check();
        if action == ContextAction::ForceCheckpointAndExit {
            if let Some(state) = self.state.as_ref() {
                self.checkpoints.save(state, "token_budget_emergency")?;
            }
        }
        Ok(action)
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    pub fn status(&self) -> Result<PhaseStatus> {
        let state = self.state.as_ref().ok_or(ForemanError::NoProject)?;
        Ok(PhaseStatus {
            project_id: state.project_id.clone(),
            project_name: state.project_name.clone(),
            current_phase: state.current_phase,
            current_subphase: state.current_subphase.clone(),
            current_task: state.current_task.clone(),
            completed_phases: state.completed_phases.clone(),
            pending_phases: state.pending_phases.clone(),
            progress_percent: state.progress_percent(),
            token_usage: state.token_usage,
            context_status: self.context.check(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn orchestrator(dir: &TempDir) -> ProjectOrchestrator {
        let mut orch = ProjectOrchestrator::new(dir.path(), 200_000);
        orch.initialize_project("billing", "Billing Portal", BTreeMap::new())
            .unwrap();
        orch
    }

    fn timestamped_checkpoints(dir: &TempDir) -> usize {
        let ckpt_dir = crate::paths::checkpoints_dir(dir.path());
        std::fs::read_dir(ckpt_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.starts_with("checkpoint_") && name != crate::paths::LATEST_CHECKPOINT
            })
            .count()
    }

    #[test]
    fn start_to_requirements_scenario() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        let baseline = timestamped_checkpoints(&dir); // init checkpoint

        assert!(orch.transition("start").unwrap());
        assert_eq!(orch.state().unwrap().current_phase, Phase::AnalyzingBrd);

        assert!(orch.transition("brd_parsed").unwrap());
        assert_eq!(orch.state().unwrap().current_phase, Phase::Requirements);

        assert_eq!(
            orch.state().unwrap().completed_phases,
            vec![Phase::Idle, Phase::AnalyzingBrd]
        );
        // One checkpoint per transition.
        assert_eq!(timestamped_checkpoints(&dir), baseline + 2);
    }

    #[test]
    fn invalid_event_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        let before = orch.state().unwrap().clone();

        assert!(!orch.transition("nonexistent_event").unwrap());
        assert_eq!(orch.state().unwrap(), &before);

        // Valid event from the wrong phase is equally rejected.
        assert!(!orch.transition("prd_approved").unwrap());
        assert_eq!(orch.state().unwrap(), &before);
    }

    #[test]
    fn transition_without_project_returns_false() {
        let dir = TempDir::new().unwrap();
        let mut orch = ProjectOrchestrator::new(dir.path(), 200_000);
        assert!(!orch.transition("start").unwrap());
    }

    #[test]
    fn revision_self_loop_appends_completed() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        orch.transition("start").unwrap();
        orch.transition("brd_parsed").unwrap();

        assert!(orch.transition("prd_revision").unwrap());
        assert_eq!(orch.state().unwrap().current_phase, Phase::Requirements);
        assert_eq!(
            orch.state().unwrap().completed_phases,
            vec![Phase::Idle, Phase::AnalyzingBrd, Phase::Requirements]
        );
    }

    #[test]
    fn pause_checkpoints_without_transition() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        orch.transition("start").unwrap();

        let path = orch.pause("gate_decision").unwrap();
        assert!(path.exists());
        assert_eq!(orch.state().unwrap().current_phase, Phase::AnalyzingBrd);
    }

    #[test]
    fn resume_restores_phase() {
        let dir = TempDir::new().unwrap();
        {
            let mut orch = orchestrator(&dir);
            orch.transition("start").unwrap();
            orch.record_token_usage(10_000).unwrap();
        }
        let mut fresh = ProjectOrchestrator::new(dir.path(), 200_000);
        assert!(fresh.resume(None).unwrap());
        assert_eq!(fresh.state().unwrap().current_phase, Phase::AnalyzingBrd);
        assert_eq!(fresh.context().current_usage(), 10_000);
    }

    #[test]
    fn emergency_usage_saves_checkpoint() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        let baseline = timestamped_checkpoints(&dir);

        let action = orch.record_token_usage(190_000).unwrap();
        assert_eq!(action, ContextAction::ForceCheckpointAndExit);
        assert_eq!(timestamped_checkpoints(&dir), baseline + 1);
    }

    #[test]
    fn status_reports_progress() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        orch.transition("start").unwrap();

        let status = orch.status().unwrap();
        assert_eq!(status.current_phase, Phase::AnalyzingBrd);
        assert_eq!(status.completed_phases, vec![Phase::Idle]);
        assert_eq!(status.context_status, ContextAction::ContinueNormal);
    }
}
