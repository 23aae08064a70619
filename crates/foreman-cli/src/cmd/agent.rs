use crate::output::{print_json, print_table};
use clap::Subcommand;
use foreman_agents::{AgentDescriptor, AgentRegistry, Capability, Provider};
use foreman_core::config::{AgentEntry, WorkflowConfig};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

#[derive(Subcommand)]
pub enum AgentSubcommand {
    /// List the configured agent roster
    List,

    /// Show the registry health snapshot for the roster
    Health,
}

pub fn run(root: &Path, subcommand: AgentSubcommand, json: bool) -> anyhow::Result<()> {
    let config = WorkflowConfig::load(root)?;
    match subcommand {
        AgentSubcommand::List => list(&config, json),
        AgentSubcommand::Health => health(&config, json),
    }
}

/// Parse a roster entry into a typed descriptor. Entries with an unknown
/// provider are rejected; unknown capability strings are skipped with a
/// warning so one typo does not sink the whole roster.
pub(crate) fn descriptor_from_entry(entry: &AgentEntry) -> anyhow::Result<AgentDescriptor> {
    let provider = Provider::from_str(&entry.provider)?;
    let capabilities: Vec<Capability> = entry
        .capabilities
        .iter()
        .filter_map(|c| match Capability::from_str(c) {
            Ok(cap) => Some(cap),
            Err(_) => {
                warn!(agent = %entry.name, capability = %c, "skipping unknown capability");
                None
            }
        })
        .collect();

    let mut descriptor = AgentDescriptor::new(&entry.name, provider)
        .with_capabilities(capabilities)
        .with_priority(entry.priority)
        .with_max_tokens(entry.max_tokens);
    if let Some(model) = &entry.model {
        descriptor = descriptor.with_model(model);
    }
    if !entry.enabled {
        descriptor = descriptor.disabled();
    }
    Ok(descriptor)
}

fn list(config: &WorkflowConfig, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&config.agents);
    }
    let rows: Vec<Vec<String>> = config
        .agents
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.provider.clone(),
                a.model.clone().unwrap_or_default(),
                a.priority.to_string(),
                if a.enabled { "yes".into() } else { "no".into() },
                a.capabilities.join(","),
            ]
        })
        .collect();
    print_table(
        &["NAME", "PROVIDER", "MODEL", "PRIORITY", "ENABLED", "CAPABILITIES"],
        rows,
    );
    Ok(())
}

fn health(config: &WorkflowConfig, json: bool) -> anyhow::Result<()> {
    let registry = AgentRegistry::new();
    for entry in &config.agents {
        match descriptor_from_entry(entry) {
            Ok(descriptor) => registry.register(descriptor),
            Err(e) => warn!(agent = %entry.name, error = %e, "skipping roster entry"),
        }
    }

    let report = registry.health_report();
    if json {
        return print_json(&report);
    }
    println!(
        "{}/{} agents healthy",
        report.healthy_agents, report.total_agents
    );
    let rows: Vec<Vec<String>> = report
        .agents
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.provider.clone(),
                if a.healthy { "healthy".into() } else { "unhealthy".into() },
                format!("{}/{}", a.success_count, a.success_count + a.failure_count),
                format!("{:.0}%", a.error_rate * 100.0),
            ]
        })
        .collect();
    print_table(&["NAME", "PROVIDER", "HEALTH", "OK/TOTAL", "ERROR"], rows);
    Ok(())
}
