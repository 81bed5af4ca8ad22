//! Graph facade: construction, snapshots and the four mutations
//!
//! Every mutation runs on a working copy of the index: validate the delta,
//! apply it, rebuild adjacency, recompute activation over the whole graph.
//! The copy replaces the committed index only when all steps succeed.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::activation::{self, ConditionEvaluator, MatchEvaluator};
use crate::config::EngineConfig;
use crate::error::{Error, Errors, Outcome};
use crate::graph::GraphIndex;
use crate::model::{self, Node, NodeId, NodeSet, is_structural};
use crate::schema::Schema;
use crate::validator::Validator;

/// Result of [`Graph::remove_nodes`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Removal {
    /// Every removed id, including descendants in branch mode.
    pub removed: Vec<NodeId>,
    /// Surviving nodes whose fields changed as a side effect.
    pub changed: NodeSet,
}

impl Removal {
    pub fn into_parts(self) -> (Vec<NodeId>, NodeSet) {
        (self.removed, self.changed)
    }
}

/// The node graph of one project.
pub struct Graph {
    index: GraphIndex,
    schema: Schema,
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.index.len())
            .finish()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// An empty graph with the default schema and evaluator.
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Graph {
            index: GraphIndex::new(),
            schema: Schema::from_config(config),
            evaluator: Arc::new(MatchEvaluator),
        }
    }

    /// Replace the condition evaluator.
    pub fn with_evaluator(mut self, evaluator: impl ConditionEvaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    /// Construct from a flat node-set with default settings.
    pub fn from_value(input: &Value) -> Outcome<Self> {
        let mut graph = Graph::new();
        graph.reload(input)?;
        Ok(graph)
    }

    /// Replace the whole node set. On failure the previous set is kept.
    pub fn reload(&mut self, input: &Value) -> Outcome<()> {
        let validator = Validator::new(&self.schema);
        let entries = validator.node_map(input).inspect_err(|_| rejected("reload"))?;
        let nodes = validator
            .validate(entries, |_| false)
            .inspect_err(|_| rejected("reload"))?;
        let mut index = GraphIndex::from_nodes(nodes).inspect_err(|_| rejected("reload"))?;
        self.recompute(&mut index).inspect_err(|_| rejected("reload"))?;

        tracing::debug!("Loaded {} nodes", index.len());
        self.index = index;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains(id)
    }

    /// Get a node by ID.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.node(id)
    }

    /// Read-only view of the index (adjacency, ordering).
    pub fn index(&self) -> &GraphIndex {
        &self.index
    }

    /// Deep, independent copy of all nodes.
    pub fn snapshot(&self) -> BTreeMap<NodeId, Node> {
        self.index.nodes().map(|n| (n.id, n.clone())).collect()
    }

    /// Every node with its computed `active` flag.
    pub fn unload(&self) -> NodeSet {
        self.index.nodes().map(|n| (n.id, n.to_fields())).collect()
    }

    /// Only the nodes whose computed `active` is true.
    pub fn unload_active(&self) -> NodeSet {
        self.index
            .nodes()
            .filter(|n| n.active)
            .map(|n| (n.id, n.to_fields()))
            .collect()
    }

    /// Add nodes that are not in the graph yet. New nodes may parent off
    /// existing nodes or off each other. Returns the added nodes.
    pub fn add_nodes(&mut self, new_nodes: &Value) -> Outcome<NodeSet> {
        let validator = Validator::new(&self.schema);
        let entries = validator.node_map(new_nodes).inspect_err(|_| rejected("add_nodes"))?;

        let mut errors = Errors::new();
        for key in entries.keys() {
            if let Ok(id) = self.schema.parse_id(key) {
                if self.index.contains(&id) {
                    errors.push(Error::param(format!("Node id already exists: {id}")).at(key.clone()));
                }
            }
        }
        if !errors.is_empty() {
            rejected("add_nodes");
            return Err(errors);
        }

        let nodes = validator
            .validate(entries, |id| self.index.contains(id))
            .inspect_err(|_| rejected("add_nodes"))?;
        let added: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();

        let mut working = self.index.clone();
        for node in nodes {
            working.insert(node);
        }
        self.commit(working, "add_nodes")?;

        tracing::debug!("Added {} nodes", added.len());
        Ok(self.fields_of(&added))
    }

    /// Apply partial field updates to existing nodes. A `null` dynamic value
    /// deletes the attribute; `active` is ignored. Returns the targeted nodes.
    pub fn change_nodes(&mut self, changes: &Value) -> Outcome<NodeSet> {
        let validator = Validator::new(&self.schema);
        let entries = validator.node_map(changes).inspect_err(|_| rejected("change_nodes"))?;

        let mut errors = Errors::new();
        let mut merged = Map::new();
        for (key, patch) in entries {
            let id = match self.existing_id(key) {
                Ok(id) => id,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };
            let Some(patch) = patch.as_object() else {
                errors.push(Error::param("Node fields must be a dictionary").at(key.clone()));
                continue;
            };
            let Some(node) = self.index.node(&id) else { continue };

            let mut fields = node.raw_fields();
            for (field, value) in patch {
                if field == model::ACTIVE {
                    continue;
                }
                if value.is_null() && !is_structural(field) {
                    fields.remove(field);
                } else {
                    fields.insert(field.clone(), value.clone());
                }
            }
            merged.insert(id.to_string(), Value::Object(fields));
        }
        if !errors.is_empty() {
            rejected("change_nodes");
            return Err(errors);
        }

        let nodes = validator
            .validate(&merged, |id| self.index.contains(id))
            .inspect_err(|_| rejected("change_nodes"))?;
        let targeted: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();

        let mut working = self.index.clone();
        for node in nodes {
            working.insert(node);
        }
        self.commit(working, "change_nodes")?;

        tracing::debug!("Changed {} nodes", targeted.len());
        Ok(self.fields_of(&targeted))
    }

    /// Replace the `content` of existing nodes and recompute activation.
    /// A `null` value clears the content. Values are checked against the
    /// configured `content` rule, if any.
    pub fn change_nodes_content(&mut self, contents: &Value) -> Outcome<()> {
        let validator = Validator::new(&self.schema);
        let entries = validator
            .node_map(contents)
            .inspect_err(|_| rejected("change_nodes_content"))?;

        let mut errors = Errors::new();
        let mut working = self.index.clone();
        let content_rule = self.schema.attribute_rule(model::CONTENT);
        for (key, content) in entries {
            let id = match self.existing_id(key) {
                Ok(id) => id,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };
            if let Some(rule) = content_rule {
                let location = format!("{key}.{}", model::CONTENT);
                if let Err(error) = rule.check(Some(content), &location, self.schema.require_uuid_v4()) {
                    errors.push(error);
                    continue;
                }
            }
            if let Some(node) = working.node_mut(&id) {
                node.set_attribute(model::CONTENT, content.clone());
            }
        }
        if !errors.is_empty() {
            rejected("change_nodes_content");
            return Err(errors);
        }

        self.commit(working, "change_nodes_content")?;
        tracing::debug!("Updated content of {} nodes", entries.len());
        Ok(())
    }

    /// Remove nodes.
    ///
    /// Plain mode removes exactly the listed ids and re-parents their
    /// children onto the nearest surviving ancestor. Branch mode removes each
    /// listed node with its whole subtree. In both modes, trigger references
    /// to removed nodes are pruned from survivors, and every survivor whose
    /// fields changed (parent, trigger, `active`) is reported.
    pub fn remove_nodes<S: AsRef<str>>(
        &mut self,
        delete_list: &[S],
        remove_branches: bool,
    ) -> Outcome<Removal> {
        let mut errors = Errors::new();
        let mut targets = Vec::with_capacity(delete_list.len());
        for key in delete_list {
            match self.existing_id(key.as_ref()) {
                Ok(id) => targets.push(id),
                Err(error) => errors.push(error),
            }
        }
        if !errors.is_empty() {
            rejected("remove_nodes");
            return Err(errors);
        }

        let mut removed = Vec::new();
        let mut doomed = HashSet::new();
        for target in &targets {
            let scope = if remove_branches {
                self.index.branch(target)
            } else {
                vec![*target]
            };
            for id in scope {
                if doomed.insert(id) {
                    removed.push(id);
                }
            }
        }

        let mut working = self.index.clone();
        let survivors: Vec<NodeId> = self
            .index
            .nodes()
            .map(|n| n.id)
            .filter(|id| !doomed.contains(id))
            .collect();

        for id in &survivors {
            let new_parent = self.nearest_surviving_parent(id, &doomed);
            let Some(node) = working.node_mut(id) else { continue };
            node.parent_id = new_parent;
            prune_trigger(node, &doomed);
        }
        for id in &removed {
            working.remove(id);
        }
        let before = self.commit(working, "remove_nodes")?;

        let changed: Vec<NodeId> = survivors
            .into_iter()
            .filter(|id| self.index.node(id) != before.node(id))
            .collect();
        tracing::debug!("Removed {} nodes, {} survivors changed", removed.len(), changed.len());

        Ok(Removal {
            changed: self.fields_of(&changed),
            removed,
        })
    }

    fn existing_id(&self, key: &str) -> Result<NodeId, Error> {
        let id = NodeId::parse(key, false).map_err(|e| Error::param(e.to_string()).at(key))?;
        if self.index.contains(&id) {
            Ok(id)
        } else {
            Err(Error::param(format!("Node does not exist: {key}")).at(key))
        }
    }

    /// Walk up from the node's parent until a parent outside `doomed` is found.
    fn nearest_surviving_parent(&self, id: &NodeId, doomed: &HashSet<NodeId>) -> Option<NodeId> {
        self.index
            .ancestors(id)
            .into_iter()
            .find(|ancestor| !doomed.contains(ancestor))
    }

    fn recompute(&self, index: &mut GraphIndex) -> Outcome<()> {
        activation::refresh(index, self.evaluator.as_ref())
    }

    /// Rebuild and re-evaluate the working copy, then swap it in.
    /// Returns the index it replaced.
    fn commit(&mut self, mut working: GraphIndex, operation: &str) -> Outcome<GraphIndex> {
        working
            .rebuild()
            .and_then(|()| self.recompute(&mut working))
            .inspect_err(|_| rejected(operation))?;
        Ok(std::mem::replace(&mut self.index, working))
    }

    fn fields_of(&self, ids: &[NodeId]) -> NodeSet {
        ids.iter()
            .filter_map(|id| self.index.node(id))
            .map(|n| (n.id, n.to_fields()))
            .collect()
    }
}

fn prune_trigger(node: &mut Node, doomed: &HashSet<NodeId>) {
    let keep = |reference: &Value| {
        reference
            .as_str()
            .and_then(|text| NodeId::parse(text, false).ok())
            .is_none_or(|id| !doomed.contains(&id))
    };
    let pruned = match node.attributes.get(model::TRIGGER) {
        Some(single @ Value::String(_)) if !keep(single) => Value::Null,
        Some(Value::Array(items)) if !items.iter().all(keep) => {
            let kept: Vec<Value> = items.iter().filter(|r| keep(r)).cloned().collect();
            if kept.is_empty() { Value::Null } else { Value::Array(kept) }
        }
        _ => return,
    };
    node.set_attribute(model::TRIGGER, pruned);
}

fn rejected(operation: &str) {
    tracing::warn!("{} rejected", operation);
}
