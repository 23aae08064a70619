//! Versioned checkpoint persistence and CLI export.
//!
//! Every save writes a timestamped file plus an always-overwritten
//! `checkpoint_latest.json` pointer, so any front-end can resume from the
//! latest state without listing the directory. The envelope embeds
//! plain-language resume instructions so a front-end other than the one
//! that wrote the checkpoint can pick the project up.

use crate::error::Result;
use crate::io::atomic_write;
use crate::paths;
use crate::state::ProjectState;
use crate::types::TargetCli;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const CHECKPOINT_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub checkpoint_reason: String,
    pub checkpoint_time: DateTime<Utc>,
    pub cli_source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: String,
    pub cli_agnostic: bool,
    pub metadata: CheckpointMetadata,
    pub state: ProjectState,
    pub instructions: ResumeInstructions,
}

/// Plain-language resume guidance embedded in every checkpoint and export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeInstructions {
    pub context: String,
    pub what_was_completed: Vec<String>,
    pub what_needs_doing_next: Vec<String>,
    pub important_context: Vec<String>,
    pub resume_command_suggestions: BTreeMap<String, String>,
    pub critical_decisions: Vec<String>,
}

pub fn resume_instructions(state: &ProjectState) -> ResumeInstructions {
    let mut suggestions = BTreeMap::new();
    suggestions.insert(
        "claude".to_string(),
        "foreman resume --cli claude".to_string(),
    );
    suggestions.insert(
        "gemini".to_string(),
        "gemini resume --state checkpoint_latest.json --project .".to_string(),
    );
    suggestions.insert(
        "copilot".to_string(),
        "gh copilot resume --checkpoint checkpoint_latest.json".to_string(),
    );
    suggestions.insert(
        "qwen".to_string(),
        "qwen-cli resume --checkpoint checkpoint_latest.json".to_string(),
    );

    ResumeInstructions {
        context: format!(
            "This is the {} project, currently in the {} phase.",
            state.project_name, state.current_phase
        ),
        what_was_completed: state
            .completed_phases
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
        what_needs_doing_next: vec![
            state.current_task.clone(),
            state.next_recommended_action.clone(),
        ],
        important_context: vec![
            format!("current phase: {}", state.current_phase),
            format!("progress: {:.0}%", state.progress_percent()),
            format!("token usage: {}", state.token_usage),
        ],
        resume_command_suggestions: suggestions,
        critical_decisions: state.critical_decisions.clone(),
    }
}

// ---------------------------------------------------------------------------
// CheckpointStore
// ---------------------------------------------------------------------------

/// Writes and reads checkpoints under `<root>/.foreman/checkpoints`.
#[derive(Debug)]
pub struct CheckpointStore {
    root: PathBuf,
    cli_source: String,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cli_source: "foreman".to_string(),
        }
    }

    pub fn with_cli_source(mut self, source: impl Into<String>) -> Self {
        self.cli_source = source.into();
        self
    }

    fn dir(&self) -> PathBuf {
        paths::checkpoints_dir(&self.root)
    }

    pub fn latest_path(&self) -> PathBuf {
        paths::latest_checkpoint(&self.root)
    }

    /// Save a checkpoint. Write failures propagate: a checkpoint store that
    /// cannot be written is an operational emergency, not a recoverable
    /// condition.
    pub fn save(&self, state: &ProjectState, reason: &str) -> Result<PathBuf> {
        let now = Utc::now();
        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION.to_string(),
            cli_agnostic: true,
            metadata: CheckpointMetadata {
                checkpoint_reason: reason.to_string(),
                checkpoint_time: now,
                cli_source: self.cli_source.clone(),
            },
            state: state.clone(),
            instructions: resume_instructions(state),
        };

        // Microsecond stamp plus an existence probe: saves from separate
        // processes in the same wall-clock instant must never overwrite an
        // earlier timestamped checkpoint.
        let stamp = format!(
            "{}_{:06}",
            now.format("%Y%m%d_%H%M%S"),
            now.timestamp_subsec_micros()
        );
        let dir = self.dir();
        let mut file = dir.join(format!("checkpoint_{stamp}.json"));
        let mut bump = 1u32;
        while file.exists() {
            file = dir.join(format!("checkpoint_{stamp}_{bump}.json"));
            bump += 1;
        }
        let data = serde_json::to_vec_pretty(&checkpoint)?;
        atomic_write(&file, &data)?;
        atomic_write(&self.latest_path(), &data)?;

        info!(path = %file.display(), reason, "checkpoint saved");
        Ok(file)
    }

    /// Load a checkpoint, defaulting to the latest pointer. A missing file
    /// or parse failure is logged and yields `Ok(None)`; a version mismatch
    /// is advisory only.
    pub fn load(&self, path: Option<&Path>) -> Result<Option<ProjectState>> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| self.latest_path());
        if !path.exists() {
            error!(path = %path.display(), "checkpoint not found");
            return Ok(None);
        }

        let data = std::fs::read_to_string(&path)?;
        let checkpoint: Checkpoint = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                error!(path = %path.display(), %e, "failed to parse checkpoint");
                return Ok(None);
            }
        };

        if checkpoint.version != CHECKPOINT_VERSION {
            warn!(
                found = %checkpoint.version,
                expected = CHECKPOINT_VERSION,
                "checkpoint version mismatch, attempting to load anyway"
            );
        }

        info!(path = %path.display(), phase = %checkpoint.state.current_phase, "checkpoint loaded");
        Ok(Some(checkpoint.state))
    }

    /// Export the latest (or given) checkpoint in a CLI-specific format.
    /// The export adds descriptive metadata only; the state is unchanged.
    pub fn export_for_cli(&self, target: TargetCli, path: Option<&Path>) -> Result<PathBuf> {
        let state = self
            .load(path)?
            .ok_or_else(|| crate::error::ForemanError::NoCheckpoint(
                self.latest_path().display().to_string(),
            ))?;

        let now = Utc::now();
        let mut export = serde_json::json!({
            "version": CHECKPOINT_VERSION,
            "cli_agnostic": true,
            "target_cli": target.as_str(),
            "exported_at": now,
            "state": state,
            "instructions": resume_instructions(&state),
        });

        let extra = match target {
            TargetCli::Gemini => Some((
                "gemini_config",
                serde_json::json!({
                    "model": "gemini-2.0-flash-exp",
                    "tools": ["shell", "file_search", "web_fetch"],
                    "temperature": 0.7,
                }),
            )),
            TargetCli::Copilot => Some((
                "copilot_config",
                serde_json::json!({
                    "agent_mode": "sdlc_orchestrator",
                    "workspace_context": true,
                }),
            )),
            TargetCli::Qwen => Some((
                "qwen_config",
                serde_json::json!({
                    "model": "qwen-turbo",
                    "enable_tools": true,
                }),
            )),
            TargetCli::Claude => Some((
                "claude_config",
                serde_json::json!({
                    "model": "claude-sonnet-4-5",
                    "permission_mode": "default",
                }),
            )),
            TargetCli::Universal => None,
        };
        if let Some((key, value)) = extra {
            export[key] = value;
        }

        let file = paths::exports_dir(&self.root).join(format!(
            "export_{}_{}.json",
            target,
            now.format("%Y%m%d_%H%M%S")
        ));
        atomic_write(&file, &serde_json::to_vec_pretty(&export)?)?;
        info!(path = %file.display(), target = %target, "checkpoint exported");
        Ok(file)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Phase;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());

        let mut state = ProjectState::new("billing", "Billing Portal");
        state.record_decision("use postgres");
        state.set_token_usage(12_345);

        store.save(&state, "manual").unwrap();
        let loaded = store.load(None).unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.current_phase, state.current_phase);
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(store.load(None).unwrap().is_none());
    }

    #[test]
    fn load_corrupt_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        atomic_write(&store.latest_path(), b"{not json").unwrap();
        assert!(store.load(None).unwrap().is_none());
    }

    #[test]
    fn version_mismatch_is_advisory() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        let state = ProjectState::new("p", "P");
        store.save(&state, "manual").unwrap();

        let data = std::fs::read_to_string(store.latest_path()).unwrap();
        let patched = data.replace("\"version\": \"2.0\"", "\"version\": \"1.0\"");
        atomic_write(&store.latest_path(), patched.as_bytes()).unwrap();

        // Loads with a warning, does not fail.
        assert!(store.load(None).unwrap().is_some());
    }

    #[test]
    fn save_writes_timestamped_and_latest() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        let state = ProjectState::new("p", "P");

        let first = store.save(&state, "one").unwrap();
        let second = store.save(&state, "two").unwrap();
        assert_ne!(first, second);
        assert!(store.latest_path().exists());

        let latest: Checkpoint =
            serde_json::from_str(&std::fs::read_to_string(store.latest_path()).unwrap()).unwrap();
        assert_eq!(latest.metadata.checkpoint_reason, "two");
        assert!(latest.cli_agnostic);
    }

    #[test]
    fn saves_from_separate_stores_never_collide() {
        // Each CLI invocation constructs its own store; saves landing in
        // the same wall-clock second must still accumulate.
        let dir = TempDir::new().unwrap();
        let state = ProjectState::new("p", "P");

        let first = CheckpointStore::new(dir.path()).save(&state, "one").unwrap();
        let second = CheckpointStore::new(dir.path()).save(&state, "two").unwrap();
        let third = CheckpointStore::new(dir.path()).save(&state, "three").unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(first.exists() && second.exists() && third.exists());

        let timestamped = std::fs::read_dir(paths::checkpoints_dir(dir.path()))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != paths::LATEST_CHECKPOINT)
            .count();
        assert_eq!(timestamped, 3);
    }

    #[test]
    fn export_adds_target_block() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        let mut state = ProjectState::new("p", "P");
        state.advance(Phase::AnalyzingBrd);
        store.save(&state, "manual").unwrap();

        let path = store.export_for_cli(TargetCli::Gemini, None).unwrap();
        let export: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(export["target_cli"], "gemini");
        assert_eq!(export["gemini_config"]["model"], "gemini-2.0-flash-exp");
        assert_eq!(export["state"]["current_phase"], "analyzing_brd");
        assert!(export["instructions"]["context"]
            .as_str()
            .unwrap()
            .contains("analyzing_brd"));
    }

    #[test]
    fn export_without_checkpoint_errors() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(store.export_for_cli(TargetCli::Universal, None).is_err());
    }

    #[test]
    fn instructions_reflect_state() {
        let mut state = ProjectState::new("billing", "Billing Portal");
        state.advance(Phase::AnalyzingBrd);
        state.set_task("Draft PRD", "foreman transition brd_parsed");
        let instr = resume_instructions(&state);
        assert_eq!(instr.what_was_completed, vec!["idle"]);
        assert!(instr.what_needs_doing_next.contains(&"Draft PRD".to_string()));
        assert!(instr.context.contains("Billing Portal"));
    }
}
