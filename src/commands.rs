//! CLI command implementations

use anyhow::Context;
use formgraph_core::{EngineConfig, Errors, Graph};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;
use std::process::ExitCode;

/// Exit status for rejected graph operations.
const REJECTED: u8 = 2;

/// Build an empty graph configured from `config_path`.
pub fn open(config_path: &Path) -> anyhow::Result<Graph> {
    let config = EngineConfig::load(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    Ok(Graph::with_config(&config))
}

pub fn validate(mut graph: Graph, nodes: &Path) -> anyhow::Result<ExitCode> {
    if let Err(errors) = load(&mut graph, nodes)? {
        return report(errors);
    }
    let active = graph.unload_active().len();
    tracing::info!("{} nodes valid, {} active", graph.len(), active);
    print(&json!({ "nodes": graph.len(), "active": active }))
}

pub fn unload(mut graph: Graph, nodes: &Path, active_only: bool) -> anyhow::Result<ExitCode> {
    if let Err(errors) = load(&mut graph, nodes)? {
        return report(errors);
    }
    if active_only {
        print(&graph.unload_active())
    } else {
        print(&graph.unload())
    }
}

pub fn add(mut graph: Graph, nodes: &Path, new_nodes: &Path) -> anyhow::Result<ExitCode> {
    if let Err(errors) = load(&mut graph, nodes)? {
        return report(errors);
    }
    match graph.add_nodes(&read_json(new_nodes)?) {
        Ok(added) => print(&added),
        Err(errors) => report(errors),
    }
}

pub fn change(mut graph: Graph, nodes: &Path, changes: &Path) -> anyhow::Result<ExitCode> {
    if let Err(errors) = load(&mut graph, nodes)? {
        return report(errors);
    }
    match graph.change_nodes(&read_json(changes)?) {
        Ok(changed) => print(&changed),
        Err(errors) => report(errors),
    }
}

pub fn content(mut graph: Graph, nodes: &Path, contents: &Path) -> anyhow::Result<ExitCode> {
    if let Err(errors) = load(&mut graph, nodes)? {
        return report(errors);
    }
    match graph.change_nodes_content(&read_json(contents)?) {
        Ok(()) => print(&graph.unload()),
        Err(errors) => report(errors),
    }
}

pub fn remove(mut graph: Graph, nodes: &Path, ids: &[String], branches: bool) -> anyhow::Result<ExitCode> {
    if let Err(errors) = load(&mut graph, nodes)? {
        return report(errors);
    }
    match graph.remove_nodes(ids, branches) {
        Ok(removal) => print(&removal),
        Err(errors) => report(errors),
    }
}

/// Load the node-set file into `graph`. I/O and JSON syntax problems are
/// hard failures; validation problems come back as `Err(errors)`.
fn load(graph: &mut Graph, path: &Path) -> anyhow::Result<Result<(), Errors>> {
    let input = read_json(path)?;
    Ok(graph.reload(&input))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print(value: &impl Serialize) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(ExitCode::SUCCESS)
}

fn report(errors: Errors) -> anyhow::Result<ExitCode> {
    tracing::error!("{}", errors);
    println!("{}", serde_json::to_string_pretty(&errors)?);
    Ok(ExitCode::from(REJECTED))
}
