//! Node validator: turns a proposed node-set into typed nodes or errors

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{Error, Errors};
use crate::model::{self, Attributes, Fields, Node, NodeId, is_structural};
use crate::schema::Schema;

/// Checks structural well-formedness of proposed nodes.
///
/// Per node, checks stop at the first failure; other nodes are still
/// checked so one call can report several independent problems.
pub struct Validator<'a> {
    schema: &'a Schema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Validator { schema }
    }

    /// Container-shape check: the input must be an id → fields mapping.
    pub fn node_map<'v>(&self, input: &'v Value) -> Result<&'v Map<String, Value>, Errors> {
        input
            .as_object()
            .ok_or_else(|| Error::param("Dictionary expected").into())
    }

    /// Validate every entry, then check that each parent exists either in
    /// the proposed set or among the nodes `known` reports.
    pub fn validate(
        &self,
        entries: &Map<String, Value>,
        known: impl Fn(&NodeId) -> bool,
    ) -> Result<Vec<Node>, Errors> {
        let mut errors = Errors::new();
        let mut nodes = Vec::with_capacity(entries.len());
        let mut declared = HashSet::new();

        for (key, value) in entries {
            match self.build_node(key, value) {
                Ok(node) => {
                    declared.insert(node.id);
                    nodes.push(node);
                }
                Err(error) => {
                    if let Ok(id) = self.schema.parse_id(key) {
                        declared.insert(id);
                    }
                    errors.push(error);
                }
            }
        }

        for node in &nodes {
            if let Some(parent) = node.parent_id {
                if !declared.contains(&parent) && !known(&parent) {
                    errors.push(
                        Error::param(format!("Parent node {parent} does not exist"))
                            .at(format!("{}.{}", node.id, model::PARENT_ID)),
                    );
                }
            }
        }

        errors.into_result(nodes)
    }

    /// Validate a single entry and build the typed node.
    pub fn build_node(&self, key: &str, value: &Value) -> Result<Node, Error> {
        let id = self
            .schema
            .parse_id(key)
            .map_err(|e| Error::param(e.to_string()).at(key))?;

        let fields = value
            .as_object()
            .ok_or_else(|| Error::param("Node fields must be a dictionary").at(key))?;

        let require_v4 = self.schema.require_uuid_v4();
        for rule in self.schema.structural_rules() {
            rule.check(fields.get(&rule.name), &format!("{key}.{}", rule.name), require_v4)?;
        }
        for rule in self.schema.attribute_rules() {
            rule.check(fields.get(&rule.name), &format!("{key}.{}", rule.name), require_v4)?;
        }

        if let Some(own_id) = fields.get(model::ID).and_then(Value::as_str) {
            if self.schema.parse_id(own_id).ok() != Some(id) {
                return Err(Error::param("Field id does not match the node key")
                    .at(format!("{key}.{}", model::ID)));
            }
        }

        let parent_id = match fields.get(model::PARENT_ID).and_then(Value::as_str) {
            Some(text) => Some(self.schema.parse_id(text).map_err(|e| {
                Error::param(e.to_string()).at(format!("{key}.{}", model::PARENT_ID))
            })?),
            None => None,
        };

        let attributes: Attributes = fields
            .iter()
            .filter(|(k, v)| !is_structural(k) && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Node {
            id,
            parent_id,
            name: required_text(fields, model::NAME, key)?,
            description: optional_text(fields, model::DESCRIPTION),
            data_type: required_text(fields, model::DATA_TYPE, key)?,
            node_type: required_text(fields, model::NODE_TYPE, key)?,
            x: fields.get(model::X).and_then(Value::as_i64),
            y: fields.get(model::Y).and_then(Value::as_i64),
            active: false,
            attributes,
        })
    }
}

fn required_text(fields: &Fields, field: &str, key: &str) -> Result<String, Error> {
    optional_text(fields, field)
        .ok_or_else(|| Error::system("Required field passed rules but is missing").at(format!("{key}.{field}")))
}

fn optional_text(fields: &Fields, field: &str) -> Option<String> {
    fields.get(field).and_then(Value::as_str).map(str::to_string)
}
