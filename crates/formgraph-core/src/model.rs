//! Core data structures for the node graph

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Flat field mapping of one node, as exchanged with callers.
pub type Fields = Map<String, Value>;

/// Dynamic (non-structural) attributes of a node.
pub type Attributes = BTreeMap<String, Value>;

/// Node-id keyed snapshot returned by unload and mutation results.
pub type NodeSet = BTreeMap<NodeId, Fields>;

// ── Structural field names ──────────────────────────────
pub const ID: &str = "id";
pub const PARENT_ID: &str = "parent_id";
pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const DATA_TYPE: &str = "data_type";
pub const NODE_TYPE: &str = "node_type";
pub const X: &str = "x";
pub const Y: &str = "y";
pub const ACTIVE: &str = "active";

// ── Dynamic attributes the engine interprets ────────────
pub const CONTENT: &str = "content";
pub const CONDITION: &str = "condition";
pub const TRIGGER: &str = "trigger";

pub const STRUCTURAL_FIELDS: [&str; 9] = [
    ID,
    PARENT_ID,
    NAME,
    DESCRIPTION,
    DATA_TYPE,
    NODE_TYPE,
    X,
    Y,
    ACTIVE,
];

pub fn is_structural(field: &str) -> bool {
    STRUCTURAL_FIELDS.contains(&field)
}

/// Empty or false-equivalent dynamic values are left out of output.
/// Booleans are always kept.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(_) => false,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("Incorrect uuid format")]
    Malformed,
    #[error("Expected a version 4 uuid, found version {0}")]
    WrongVersion(usize),
    #[error("Uuid must be written in lowercase hyphenated form: {0}")]
    NotCanonical(String),
}

/// Unique, stable identifier for a node (a UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new_v4() -> Self {
        NodeId(Uuid::new_v4())
    }

    /// Parse identifier text, optionally insisting on a version 4 UUID.
    ///
    /// Only the lowercase hyphenated form is accepted, so every id prints
    /// back exactly as it was given.
    pub fn parse(text: &str, require_v4: bool) -> Result<Self, IdError> {
        let uuid = Uuid::try_parse(text).map_err(|_| IdError::Malformed)?;
        let id = NodeId(uuid);
        if id.to_string() != text {
            return Err(IdError::NotCanonical(text.to_string()));
        }
        let version = uuid.get_version_num();
        if require_v4 && version != 4 {
            return Err(IdError::WrongVersion(version));
        }
        Ok(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeId::parse(s, true)
    }
}

/// A single validated node.
///
/// `active` is derived by the activation pass and never taken from callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub name: String,
    pub description: Option<String>,
    pub data_type: String,
    pub node_type: String,
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub active: bool,
    pub attributes: Attributes,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn content(&self) -> Option<&Value> {
        self.attributes.get(CONTENT)
    }

    pub fn condition(&self) -> Option<&Value> {
        self.attributes.get(CONDITION)
    }

    /// Raw trigger references: a single string or a list of strings.
    pub fn trigger_refs(&self) -> Vec<&str> {
        match self.attributes.get(TRIGGER) {
            Some(Value::String(reference)) => vec![reference.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Set or clear a dynamic attribute. `null` clears.
    pub fn set_attribute(&mut self, key: &str, value: Value) {
        if value.is_null() {
            self.attributes.remove(key);
        } else {
            self.attributes.insert(key.to_string(), value);
        }
    }

    fn structural_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(ID.into(), Value::String(self.id.to_string()));
        fields.insert(
            PARENT_ID.into(),
            self.parent_id
                .map_or(Value::Null, |p| Value::String(p.to_string())),
        );
        fields.insert(NAME.into(), Value::String(self.name.clone()));
        fields.insert(
            DESCRIPTION.into(),
            self.description.clone().map_or(Value::Null, Value::String),
        );
        fields.insert(DATA_TYPE.into(), Value::String(self.data_type.clone()));
        fields.insert(NODE_TYPE.into(), Value::String(self.node_type.clone()));
        fields.insert(X.into(), self.x.map_or(Value::Null, Value::from));
        fields.insert(Y.into(), self.y.map_or(Value::Null, Value::from));
        fields.insert(ACTIVE.into(), Value::Bool(self.active));
        fields
    }

    /// Output shape: every structural field plus the non-empty dynamic attributes.
    pub fn to_fields(&self) -> Fields {
        let mut fields = self.structural_fields();
        for (key, value) in &self.attributes {
            if !is_empty_value(value) {
                fields.insert(key.clone(), value.clone());
            }
        }
        fields
    }

    /// Like [`Node::to_fields`] but keeps empty attributes; used as the base for patches.
    pub fn raw_fields(&self) -> Fields {
        let mut fields = self.structural_fields();
        for (key, value) in &self.attributes {
            fields.insert(key.clone(), value.clone());
        }
        fields
    }
}
