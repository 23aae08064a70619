pub mod agent;
pub mod export;
pub mod gate;
pub mod init;
pub mod lifecycle;
pub mod state;
pub mod transition;

use anyhow::Context;
use foreman_core::config::WorkflowConfig;
use foreman_core::project::ProjectOrchestrator;
use std::path::Path;

/// Load config and resume the orchestrator from the latest checkpoint.
/// Shared by every command that operates on an existing project.
pub(crate) fn open_project(root: &Path) -> anyhow::Result<(WorkflowConfig, ProjectOrchestrator)> {
    let config = WorkflowConfig::load(root).context("not a foreman project (run `foreman init`)")?;
    let mut orch = ProjectOrchestrator::new(root, config.max_tokens);
    if !orch.resume(None).context("failed to load checkpoint")? {
        anyhow::bail!("no checkpoint found; run `foreman init` first");
    }
    Ok((config, orch))
}
