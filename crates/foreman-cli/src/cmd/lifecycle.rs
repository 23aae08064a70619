//! Pause / resume / manual checkpoint commands.

use crate::output::print_json;
use anyhow::Context;
use foreman_core::checkpoint::resume_instructions;
use foreman_core::config::WorkflowConfig;
use foreman_core::project::ProjectOrchestrator;
use std::path::Path;

pub fn pause(root: &Path, reason: &str) -> anyhow::Result<()> {
    let (_, mut orch) = super::open_project(root)?;
    let path = orch.pause(reason)?;
    println!("Paused. Checkpoint: {}", path.display());
    Ok(())
}

pub fn resume(root: &Path, checkpoint: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config =
        WorkflowConfig::load(root).context("not a foreman project (run `foreman init`)")?;
    let mut orch = ProjectOrchestrator::new(root, config.max_tokens);
    if !orch.resume(checkpoint).context("failed to load checkpoint")? {
        anyhow::bail!("no usable checkpoint found");
    }

    let Some(state) = orch.state() else {
        anyhow::bail!("no usable checkpoint found");
    };
    let instructions = resume_instructions(state);
    if json {
        return print_json(&instructions);
    }

    println!("{}", instructions.context);
    if !instructions.what_was_completed.is_empty() {
        println!("Completed: {}", instructions.what_was_completed.join(", "));
    }
    for item in instructions
        .what_needs_doing_next
        .iter()
        .filter(|s| !s.is_empty())
    {
        println!("Next: {}", item);
    }
    for line in &instructions.important_context {
        println!("  {}", line);
    }
    Ok(())
}

pub fn checkpoint(root: &Path, reason: &str) -> anyhow::Result<()> {
    let (_, orch) = super::open_project(root)?;
    let Some(state) = orch.state() else {
        anyhow::bail!("no active project state");
    };
    let path = orch.checkpoints().save(state, reason)?;
    println!("Checkpoint: {}", path.display());
    Ok(())
}
