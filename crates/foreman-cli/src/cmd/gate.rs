use crate::output::{print_json, print_table};
use clap::Subcommand;
use foreman_core::gate::{standard_gates, GateConfig, GateManager};
use foreman_core::types::GateState;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Subcommand)]
pub enum GateSubcommand {
    /// List the standard approval gates
    List,

    /// Show one gate's review criteria and artifacts
    Show { gate_id: String },

    /// Show recorded decisions for this project's gates
    Status,

    /// Record a human decision for a gate
    Decide {
        gate_id: String,

        /// approve, revise, pause, or abort (case-insensitive)
        decision: String,
    },
}

pub fn run(root: &Path, subcommand: GateSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        GateSubcommand::List => list(json),
        GateSubcommand::Show { gate_id } => show(&gate_id, json),
        GateSubcommand::Status => status(root, json),
        GateSubcommand::Decide { gate_id, decision } => decide(root, &gate_id, &decision),
    }
}

/// Trigger the gate with the supplied decision: persist artifacts, summary,
/// and the feedback log under `.foreman/gates/<id>/`, then mirror the result
/// into project state and checkpoint.
fn decide(root: &Path, gate_id: &str, decision: &str) -> anyhow::Result<()> {
    let gates = standard_gates();
    if !gates.iter().any(|g| g.gate_id == gate_id) {
        anyhow::bail!(
            "unknown gate '{gate_id}' (known: {})",
            gates
                .iter()
                .map(|g| g.gate_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let (config, mut orch) = super::open_project(root)?;
    let status = orch.status()?;
    let mut artifacts = BTreeMap::new();
    artifacts.insert(
        "Project State".to_string(),
        serde_json::to_value(&status)?,
    );

    let mut manager = GateManager::new(root, config.missing_decision_policy);
    for gate in gates {
        manager.register(gate);
    }

    let supplied = decision.to_string();
    let source =
        move |_: &GateConfig, _: &BTreeMap<String, serde_json::Value>| supplied.clone();
    let parsed = manager.trigger(gate_id, &artifacts, Some(&source))?;

    let Some(state) = orch.state_mut() else {
        anyhow::bail!("no active project state");
    };
    state.record_gate(gate_id, parsed.into());
    let state = state.clone();
    orch.checkpoints()
        .save(&state, &format!("gate_{gate_id}_{parsed}"))?;
    println!("{gate_id}: {}", GateState::from(parsed));
    Ok(())
}

fn list(json: bool) -> anyhow::Result<()> {
    let gates = standard_gates();
    if json {
        return print_json(&gates);
    }
    let rows: Vec<Vec<String>> = gates
        .iter()
        .map(|g| {
            vec![
                g.gate_id.clone(),
                g.phase.to_string(),
                g.gate_name.clone(),
            ]
        })
        .collect();
    print_table(&["GATE", "PHASE", "NAME"], rows);
    Ok(())
}

fn show(gate_id: &str, json: bool) -> anyhow::Result<()> {
    let gates = standard_gates();
    let Some(gate) = gates.iter().find(|g| g.gate_id == gate_id) else {
        anyhow::bail!(
            "unknown gate '{gate_id}' (known: {})",
            gates
                .iter()
                .map(|g| g.gate_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    if json {
        return print_json(gate);
    }
    println!("{} ({})", gate.gate_name, gate.gate_id);
    println!("Phase: {}", gate.phase);
    println!("{}", gate.description);
    if !gate.artifacts_to_review.is_empty() {
        println!("\nArtifacts to review:");
        for a in &gate.artifacts_to_review {
            println!("  - {a}");
        }
    }
    if !gate.approval_criteria.is_empty() {
        println!("\nApproval criteria:");
        for c in &gate.approval_criteria {
            println!("  - {c}");
        }
    }
    if !gate.blocking_dependencies.is_empty() {
        println!("\nBlocks:");
        for d in &gate.blocking_dependencies {
            println!("  - {d}");
        }
    }
    if !gate.non_blocking_work.is_empty() {
        println!("\nCan proceed meanwhile:");
        for w in &gate.non_blocking_work {
            println!("  - {w}");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct GateStatusRow {
    gate_id: String,
    status: String,
}

fn status(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, orch) = super::open_project(root)?;
    let Some(state) = orch.state() else {
        anyhow::bail!("no active project state");
    };

    // Standard gates default to pending until a decision is recorded.
    let rows: Vec<GateStatusRow> = standard_gates()
        .iter()
        .map(|g| GateStatusRow {
            gate_id: g.gate_id.clone(),
            status: state
                .human_gates_status
                .get(&g.gate_id)
                .copied()
                .unwrap_or(GateState::Pending)
                .to_string(),
        })
        .collect();

    if json {
        return print_json(&rows);
    }
    print_table(
        &["GATE", "STATUS"],
        rows.into_iter()
            .map(|r| vec![r.gate_id, r.status])
            .collect(),
    );
    Ok(())
}
