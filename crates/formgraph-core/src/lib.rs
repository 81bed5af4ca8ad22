//! Formgraph Core: node graph validation, activation and mutation engine

pub mod model;
pub mod error;
pub mod schema;
pub mod config;
pub mod validator;
pub mod graph;
pub mod activation;
pub mod engine;
pub mod encoder;


#[cfg(test)]
pub mod test_utils;

pub use model::{NodeId, Node, Fields, Attributes, NodeSet, STRUCTURAL_FIELDS};
pub use error::{Error, ErrorType, Errors, Outcome};
pub use schema::{FieldKind, FieldRule, Schema};
pub use config::{CONFIG_FILE, ConfigError, EngineConfig};
pub use validator::Validator;
pub use graph::GraphIndex;
pub use activation::{ConditionEvaluator, EvalError, MatchEvaluator, Triggers};
pub use engine::{Graph, Removal};
pub use encoder::{NodeRow, node_set_to_updates, nodes_to_rows, rows_to_node_set, split_fields};
