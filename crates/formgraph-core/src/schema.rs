//! Declarative field rules checked by the node validator

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::model::{self, NodeId};

/// Declared type of a field. Values must match exactly; nothing is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    Boolean,
    List,
    Object,
    /// A node id, or a list of node ids.
    Reference,
    Any,
}

impl FieldKind {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Integer => value.is_i64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::List => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Reference => value.is_string() || value.is_array(),
            FieldKind::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::List => "list",
            FieldKind::Object => "object",
            FieldKind::Reference => "reference",
            FieldKind::Any => "any",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule for one field. Also the shape of `[[attributes]]` entries in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    /// Element kind; mandatory for `list` fields.
    #[serde(default)]
    pub items: Option<FieldKind>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Every string in the value must be a node id.
    #[serde(default)]
    pub uuid: bool,
}

impl FieldRule {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        FieldRule {
            name: name.to_string(),
            kind,
            items: None,
            required: false,
            min_length: None,
            max_length: None,
            uuid: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn uuid(mut self) -> Self {
        self.uuid = true;
        self
    }

    /// Run the checks in order, stopping at the first failure:
    /// presence, type, max length, min length, list items, uuid format.
    pub fn check(&self, value: Option<&Value>, location: &str, require_v4: bool) -> Result<(), Error> {
        let Some(value) = value else {
            if self.required {
                return Err(Error::param("Field is required").at(location));
            }
            return Ok(());
        };

        if value.is_null() {
            if self.required {
                return Err(self.wrong_type(location));
            }
            return Ok(());
        }

        if !self.kind.accepts(value) {
            return Err(self.wrong_type(location));
        }

        if let Some(max) = self.max_length {
            if value_length(value) > max {
                return Err(Error::param(format!("Max field length {max} symbols")).at(location));
            }
        }

        if let Some(min) = self.min_length {
            if value_length(value) < min {
                return Err(Error::param(format!("Min field length {min} symbols")).at(location));
            }
        }

        self.check_items(value, location)?;

        if self.uuid {
            for text in strings_of(value) {
                NodeId::parse(text, require_v4)
                    .map_err(|e| Error::param(e.to_string()).at(location))?;
            }
        }

        Ok(())
    }

    fn check_items(&self, value: &Value, location: &str) -> Result<(), Error> {
        let Value::Array(items) = value else {
            return Ok(());
        };
        let item_kind = match self.kind {
            FieldKind::Reference => FieldKind::Text,
            FieldKind::List => self.items.ok_or_else(|| {
                Error::system("\"items\" is a required parameter for list fields").at(location)
            })?,
            _ => return Ok(()),
        };
        if items.iter().all(|item| item_kind.accepts(item)) {
            Ok(())
        } else {
            Err(Error::param(format!("Wrong item type, expected: {item_kind}")).at(location))
        }
    }

    fn wrong_type(&self, location: &str) -> Error {
        Error::param(format!("Wrong type, expected: {}", self.kind)).at(location)
    }
}

fn value_length(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => other.to_string().len(),
    }
}

fn strings_of(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Full rule set: fixed structural rules plus dynamic-attribute rules.
#[derive(Debug, Clone)]
pub struct Schema {
    structural: Vec<FieldRule>,
    attributes: BTreeMap<String, FieldRule>,
    require_uuid_v4: bool,
}

impl Schema {
    pub fn from_config(config: &EngineConfig) -> Self {
        let structural = vec![
            FieldRule::new(model::ID, FieldKind::Text).uuid(),
            FieldRule::new(model::PARENT_ID, FieldKind::Text).uuid(),
            FieldRule::new(model::NAME, FieldKind::Text)
                .required()
                .min_length(1)
                .max_length(config.max_name_length),
            FieldRule::new(model::DESCRIPTION, FieldKind::Text)
                .max_length(config.max_description_length),
            FieldRule::new(model::DATA_TYPE, FieldKind::Text).required(),
            FieldRule::new(model::NODE_TYPE, FieldKind::Text).required(),
            FieldRule::new(model::X, FieldKind::Integer),
            FieldRule::new(model::Y, FieldKind::Integer),
        ];

        let mut attributes = BTreeMap::new();
        attributes.insert(
            model::TRIGGER.to_string(),
            FieldRule::new(model::TRIGGER, FieldKind::Reference).uuid(),
        );
        for rule in &config.attributes {
            attributes.insert(rule.name.clone(), rule.clone());
        }

        Schema {
            structural,
            attributes,
            require_uuid_v4: config.require_uuid_v4,
        }
    }

    pub fn require_uuid_v4(&self) -> bool {
        self.require_uuid_v4
    }

    pub fn structural_rules(&self) -> &[FieldRule] {
        &self.structural
    }

    pub fn attribute_rule(&self, name: &str) -> Option<&FieldRule> {
        self.attributes.get(name)
    }

    pub fn attribute_rules(&self) -> impl Iterator<Item = &FieldRule> {
        self.attributes.values()
    }

    /// Parse an id with this schema's version policy.
    pub fn parse_id(&self, text: &str) -> Result<NodeId, model::IdError> {
        NodeId::parse(text, self.require_uuid_v4)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
