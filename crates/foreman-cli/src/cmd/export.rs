use foreman_core::types::TargetCli;
use std::path::Path;
use std::str::FromStr;

pub fn run(root: &Path, target: &str, checkpoint: Option<&Path>) -> anyhow::Result<()> {
    let target = TargetCli::from_str(target)?;
    let (_, orch) = super::open_project(root)?;
    let path = orch.checkpoints().export_for_cli(target, checkpoint)?;
    println!("Exported for {}: {}", target, path.display());
    Ok(())
}
