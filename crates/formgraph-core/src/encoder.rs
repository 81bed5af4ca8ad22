//! Translation between stored node rows and the graph's node-set shape
//!
//! Storage keeps the structural fields as columns and every dynamic
//! attribute inside one `json` blob. Empty dynamic values are dropped on
//! the way back to storage; booleans are always kept.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{self, Fields, Node, NodeId, NodeSet, is_empty_value, is_structural};

/// A stored node row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRow {
    pub id: NodeId,
    pub project_id: i64,
    pub parent_id: Option<NodeId>,
    pub name: String,
    pub description: Option<String>,
    pub data_type: String,
    pub node_type: String,
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub active: bool,
    #[serde(default)]
    pub json: Fields,
}

impl NodeRow {
    pub fn from_node(node: &Node, project_id: i64) -> Self {
        NodeRow {
            id: node.id,
            project_id,
            parent_id: node.parent_id,
            name: node.name.clone(),
            description: node.description.clone(),
            data_type: node.data_type.clone(),
            node_type: node.node_type.clone(),
            x: node.x,
            y: node.y,
            active: node.active,
            json: node
                .attributes
                .iter()
                .filter(|(_, v)| !is_empty_value(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Flatten into graph input fields. Structural columns win over blob keys.
    pub fn to_fields(&self) -> Fields {
        let mut fields: Fields = self
            .json
            .iter()
            .filter(|(k, _)| !is_structural(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        fields.insert(model::ID.into(), Value::String(self.id.to_string()));
        fields.insert(
            model::PARENT_ID.into(),
            self.parent_id
                .map_or(Value::Null, |p| Value::String(p.to_string())),
        );
        fields.insert(model::NAME.into(), Value::String(self.name.clone()));
        fields.insert(
            model::DESCRIPTION.into(),
            self.description.clone().map_or(Value::Null, Value::String),
        );
        fields.insert(model::DATA_TYPE.into(), Value::String(self.data_type.clone()));
        fields.insert(model::NODE_TYPE.into(), Value::String(self.node_type.clone()));
        fields.insert(model::X.into(), self.x.map_or(Value::Null, Value::from));
        fields.insert(model::Y.into(), self.y.map_or(Value::Null, Value::from));
        fields.insert(model::ACTIVE.into(), Value::Bool(self.active));
        fields
    }
}

/// Build the graph input node-set from stored rows.
pub fn rows_to_node_set<'a>(rows: impl IntoIterator<Item = &'a NodeRow>) -> Value {
    let set: serde_json::Map<String, Value> = rows
        .into_iter()
        .map(|row| (row.id.to_string(), Value::Object(row.to_fields())))
        .collect();
    Value::Object(set)
}

/// Rows ready for insertion.
pub fn nodes_to_rows<'a>(nodes: impl IntoIterator<Item = &'a Node>, project_id: i64) -> Vec<NodeRow> {
    nodes
        .into_iter()
        .map(|node| NodeRow::from_node(node, project_id))
        .collect()
}

/// Split one output field set into structural columns and the dynamic blob.
pub fn split_fields(fields: &Fields) -> (Fields, Fields) {
    let mut structural = Fields::new();
    let mut dynamic = Fields::new();
    for (key, value) in fields {
        if is_structural(key) {
            structural.insert(key.clone(), value.clone());
        } else if !is_empty_value(value) {
            dynamic.insert(key.clone(), value.clone());
        }
    }
    (structural, dynamic)
}

/// Column updates for already stored rows: structural fields plus
/// `json` and `project_id`, keyed by node id.
pub fn node_set_to_updates(set: &NodeSet, project_id: i64) -> BTreeMap<NodeId, Fields> {
    set.iter()
        .map(|(id, fields)| {
            let (mut update, dynamic) = split_fields(fields);
            update.insert("json".into(), Value::Object(dynamic));
            update.insert("project_id".into(), Value::from(project_id));
            (*id, update)
        })
        .collect()
}
