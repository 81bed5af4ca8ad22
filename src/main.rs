//! Formgraph CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "formgraph")]
#[command(about = "Validate, evaluate and mutate hierarchical form-node graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Engine configuration file (defaults are used when it does not exist)
    #[arg(short, long, default_value = formgraph_core::CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a node-set file and report node counts
    Validate {
        /// Node-set JSON file
        nodes: PathBuf,
    },
    /// Print every node with its computed activation
    Unload {
        /// Node-set JSON file
        nodes: PathBuf,

        /// Only print active nodes
        #[arg(short, long)]
        active: bool,
    },
    /// Add new nodes and print them
    Add {
        /// Node-set JSON file
        nodes: PathBuf,
        /// JSON file with the nodes to add
        new_nodes: PathBuf,
    },
    /// Apply partial field updates and print the changed nodes
    Change {
        /// Node-set JSON file
        nodes: PathBuf,
        /// JSON file mapping node ids to field updates
        changes: PathBuf,
    },
    /// Replace node contents and print the resulting node set
    Content {
        /// Node-set JSON file
        nodes: PathBuf,
        /// JSON file mapping node ids to new content
        contents: PathBuf,
    },
    /// Remove nodes and print the removed ids and changed survivors
    Remove {
        /// Node-set JSON file
        nodes: PathBuf,

        /// Node ids to remove
        #[arg(required = true)]
        ids: Vec<String>,

        /// Remove whole subtrees instead of re-parenting children
        #[arg(short, long)]
        branches: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "formgraph={log_level},formgraph_core={log_level}"
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Formgraph v{}", env!("CARGO_PKG_VERSION"));

    let graph = commands::open(&cli.config)?;

    match cli.command {
        Commands::Validate { nodes } => commands::validate(graph, &nodes),
        Commands::Unload { nodes, active } => commands::unload(graph, &nodes, active),
        Commands::Add { nodes, new_nodes } => commands::add(graph, &nodes, &new_nodes),
        Commands::Change { nodes, changes } => commands::change(graph, &nodes, &changes),
        Commands::Content { nodes, contents } => commands::content(graph, &nodes, &contents),
        Commands::Remove { nodes, ids, branches } => commands::remove(graph, &nodes, &ids, branches),
    }
}
