mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{agent::AgentSubcommand, gate::GateSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "foreman",
    about = "Multi-agent SDLC orchestrator — phases, gates, checkpoints, and agent routing",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .foreman/ or .git/)
    #[arg(long, global = true, env = "FOREMAN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a foreman project in the current directory
    Init {
        /// Project identifier (lowercase alphanumeric and hyphens)
        project_id: String,

        /// Human-readable project name (defaults to the project id)
        #[arg(long)]
        name: Option<String>,
    },

    /// Show project state and phase progress
    State,

    /// Fire a workflow event (e.g. start, brd_parsed, prd_approved)
    Transition { event: String },

    /// Suspend the project with a checkpoint, keeping the current phase
    Pause {
        /// Why the project is being paused
        #[arg(long, default_value = "manual")]
        reason: String,
    },

    /// Resume from the latest (or a specific) checkpoint
    Resume {
        /// Path to a specific checkpoint file
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Save a checkpoint of the current state
    Checkpoint {
        #[arg(long, default_value = "manual")]
        reason: String,
    },

    /// Export the latest checkpoint for another CLI tool
    Export {
        /// Target CLI: claude, gemini, copilot, qwen, universal
        #[arg(long)]
        cli: String,

        /// Export a specific checkpoint instead of the latest
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Inspect human approval gates
    Gate {
        #[command(subcommand)]
        subcommand: GateSubcommand,
    },

    /// Inspect the agent roster
    Agent {
        #[command(subcommand)]
        subcommand: AgentSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { project_id, name } => cmd::init::run(&root, &project_id, name.as_deref()),
        Commands::State => cmd::state::run(&root, cli.json),
        Commands::Transition { event } => cmd::transition::run(&root, &event, cli.json),
        Commands::Pause { reason } => cmd::lifecycle::pause(&root, &reason),
        Commands::Resume { checkpoint } => {
            cmd::lifecycle::resume(&root, checkpoint.as_deref(), cli.json)
        }
        Commands::Checkpoint { reason } => cmd::lifecycle::checkpoint(&root, &reason),
        Commands::Export { cli: target, checkpoint } => {
            cmd::export::run(&root, &target, checkpoint.as_deref())
        }
        Commands::Gate { subcommand } => cmd::gate::run(&root, subcommand, cli.json),
        Commands::Agent { subcommand } => cmd::agent::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
