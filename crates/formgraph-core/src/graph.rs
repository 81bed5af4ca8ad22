//! Graph index: node arena keyed by NodeId plus a petgraph parent → child view

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::error::{Error, Errors};
use crate::model::{Node, NodeId};

/// Owns the current node set. Parent/child links are key lookups, never
/// embedded references, so cloning the index gives an independent copy.
#[derive(Clone, Default)]
pub struct GraphIndex {
    nodes: HashMap<NodeId, Node>,
    tree: DiGraphMap<NodeId, ()>,
    /// Ancestor-before-descendant order, refreshed by `rebuild`.
    order: Vec<NodeId>,
}

impl std::fmt::Debug for GraphIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphIndex")
            .field("node_count", &self.nodes.len())
            .field("edge_count", &self.tree.edge_count())
            .finish()
    }
}

impl GraphIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from validated nodes.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self, Errors> {
        let mut index = GraphIndex::new();
        for node in nodes {
            index.nodes.insert(node.id, node);
        }
        index.rebuild()?;
        Ok(index)
    }

    /// Get a node by ID.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes (unordered).
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Insert or replace a node. Call `rebuild` once the batch is applied.
    pub fn insert(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id, node)
    }

    /// Remove a node. Call `rebuild` once the batch is applied.
    pub fn remove(&mut self, id: &NodeId) -> Option<Node> {
        self.nodes.remove(id)
    }

    /// Node ids in ancestor-before-descendant order.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.nodes.get(id).is_some_and(Node::is_root))
            .collect()
    }

    /// Direct children, ordered by layout (`y`, then `x`, then id).
    pub fn children(&self, id: &NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let id = *id;
        self.tree
            .contains_node(id)
            .then(|| self.tree.neighbors_directed(id, Direction::Outgoing))
            .into_iter()
            .flatten()
    }

    /// The node and its full subtree, pre-order.
    pub fn branch(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![*id];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(&current) {
                continue;
            }
            out.push(current);
            // Reverse the pushed children for left-to-right traversal
            let start = stack.len();
            stack.extend(self.children(&current));
            stack[start..].reverse();
        }
        out
    }

    /// Parent chain from the direct parent up to the root.
    pub fn ancestors(&self, id: &NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent_id);
        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent);
            current = self.nodes.get(&parent).and_then(|n| n.parent_id);
        }
        chain
    }

    /// Recompute adjacency and evaluation order from `parent_id`.
    ///
    /// Fails with a `system_error` on a dangling parent or a parent cycle.
    pub fn rebuild(&mut self) -> Result<(), Errors> {
        let mut errors = Errors::new();
        let mut tree = DiGraphMap::with_capacity(self.nodes.len(), self.nodes.len());

        let mut ids: Vec<&Node> = self.nodes.values().collect();
        ids.sort_by_key(|n| n.id);
        for node in &ids {
            tree.add_node(node.id);
        }

        let mut linked: Vec<&Node> = ids.iter().copied().filter(|n| n.parent_id.is_some()).collect();
        linked.sort_by_key(|n| layout_key(n));
        for node in linked {
            let Some(parent) = node.parent_id else { continue };
            if !self.nodes.contains_key(&parent) {
                errors.push(
                    Error::system(format!("Parent node {parent} is not in the graph"))
                        .at(node.id.to_string()),
                );
                continue;
            }
            tree.add_edge(parent, node.id, ());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        match toposort(&tree, None) {
            Ok(order) => {
                tracing::trace!("Rebuilt index: {} nodes, {} links", tree.node_count(), tree.edge_count());
                self.tree = tree;
                self.order = order;
                Ok(())
            }
            Err(cycle) => {
                let at = cycle.node_id();
                tracing::warn!("Parent cycle detected at {}", at);
                Err(Error::system("Parent relation contains a cycle")
                    .at(at.to_string())
                    .into())
            }
        }
    }
}

fn layout_key(node: &Node) -> (bool, i64, bool, i64, NodeId) {
    (
        node.y.is_none(),
        node.y.unwrap_or_default(),
        node.x.is_none(),
        node.x.unwrap_or_default(),
        node.id,
    )
}
