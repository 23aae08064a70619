use crate::output::print_json;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, orch) = super::open_project(root)?;
    let status = orch.status()?;

    if json {
        return print_json(&status);
    }

    println!("Project:   {} ({})", status.project_name, status.project_id);
    println!("Phase:     {}", status.current_phase);
    if let Some(subphase) = &status.current_subphase {
        println!("Subphase:  {}", subphase);
    }
    if !status.current_task.is_empty() {
        println!("Task:      {}", status.current_task);
    }
    println!("Progress:  {:.0}%", status.progress_percent);
    println!(
        "Tokens:    {} ({})",
        status.token_usage,
        status.context_status.as_str()
    );

    let completed: Vec<String> = status
        .completed_phases
        .iter()
        .map(|p| p.to_string())
        .collect();
    let pending: Vec<String> = status.pending_phases.iter().map(|p| p.to_string()).collect();
    println!("Completed: {}", completed.join(", "));
    println!("Pending:   {}", pending.join(", "));
    Ok(())
}
