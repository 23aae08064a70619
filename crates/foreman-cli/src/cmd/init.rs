use anyhow::Context;
use foreman_core::config::WorkflowConfig;
use foreman_core::project::ProjectOrchestrator;
use foreman_core::{io, paths};
use std::collections::BTreeMap;
use std::path::Path;

pub fn run(root: &Path, project_id: &str, name: Option<&str>) -> anyhow::Result<()> {
    let project_name = name.unwrap_or(project_id);
    paths::validate_project_id(project_id)?;

    println!("Initializing foreman in: {}", root.display());

    let dirs = [
        paths::FOREMAN_DIR,
        paths::CHECKPOINTS_DIR,
        paths::GATES_DIR,
        paths::EXPORTS_DIR,
    ];
    for dir in dirs {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        println!("  exists:  .foreman/config.yaml");
        WorkflowConfig::load(root).context("failed to read config.yaml")?
    } else {
        let config = WorkflowConfig::new(project_name);
        config.save(root).context("failed to write config.yaml")?;
        println!("  created: .foreman/config.yaml");
        config
    };

    if paths::latest_checkpoint(root).exists() {
        println!("  exists:  checkpoint (state preserved)");
    } else {
        let mut workflow = BTreeMap::new();
        workflow.insert(
            "max_tokens".to_string(),
            serde_json::Value::from(config.max_tokens),
        );

        let mut orch = ProjectOrchestrator::new(root, config.max_tokens);
        orch.initialize_project(project_id, project_name, workflow)
            .context("failed to initialize project")?;
        println!("  created: initial checkpoint");
    }
    println!("Project '{project_id}' ready. Fire `foreman transition start` to begin.");
    Ok(())
}
