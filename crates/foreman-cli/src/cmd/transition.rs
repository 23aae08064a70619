use crate::output::print_json;
use foreman_core::machine;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct TransitionOutput {
    accepted: bool,
    phase: String,
}

pub fn run(root: &Path, event: &str, json: bool) -> anyhow::Result<()> {
    let (_, mut orch) = super::open_project(root)?;
    let before = orch.status()?.current_phase;

    let accepted = orch.transition(event)?;
    if !accepted {
        let valid = machine::valid_events(before);
        anyhow::bail!(
            "event '{event}' is not valid in phase '{before}' (valid: {})",
            valid.join(", ")
        );
    }

    let after = orch.status()?.current_phase;
    if json {
        return print_json(&TransitionOutput {
            accepted,
            phase: after.to_string(),
        });
    }
    println!("{before} -> {after}");
    Ok(())
}
