use crate::error::{ForemanError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const FOREMAN_DIR: &str = ".foreman";
pub const CHECKPOINTS_DIR: &str = ".foreman/checkpoints";
pub const GATES_DIR: &str = ".foreman/gates";
pub const EXPORTS_DIR: &str = ".foreman/exports";

pub const CONFIG_FILE: &str = ".foreman/config.yaml";
pub const LATEST_CHECKPOINT: &str = "checkpoint_latest.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn foreman_dir(root: &Path) -> PathBuf {
    root.join(FOREMAN_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn checkpoints_dir(root: &Path) -> PathBuf {
    root.join(CHECKPOINTS_DIR)
}

pub fn latest_checkpoint(root: &Path) -> PathBuf {
    checkpoints_dir(root).join(LATEST_CHECKPOINT)
}

pub fn gates_dir(root: &Path) -> PathBuf {
    root.join(GATES_DIR)
}

pub fn gate_dir(root: &Path, gate_id: &str) -> PathBuf {
    gates_dir(root).join(gate_id)
}

pub fn exports_dir(root: &Path) -> PathBuf {
    root.join(EXPORTS_DIR)
}

// ---------------------------------------------------------------------------
// Project id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_project_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !id_re().is_match(id) {
        return Err(ForemanError::InvalidProjectId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
