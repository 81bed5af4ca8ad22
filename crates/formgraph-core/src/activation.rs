//! Activation evaluator: derives each node's `active` flag
//!
//! `active(n) = active(parent(n)) && satisfies(n.condition, content(n.trigger))`,
//! evaluated in ancestor-before-descendant order. The expression language
//! behind `condition` lives behind [`ConditionEvaluator`].

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Errors};
use crate::graph::GraphIndex;
use crate::model::{self, NodeId};

static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("unknown condition operator `{0}`")]
    UnknownOperator(String),

    #[error("operator `{operator}` expects {expected}")]
    InvalidOperand {
        operator: String,
        expected: &'static str,
    },

    #[error("condition object must hold exactly one operator, found {0}")]
    MalformedCondition(usize),
}

/// Resolved trigger references of the node being evaluated.
pub struct Triggers<'a> {
    references: Vec<NodeId>,
    index: &'a GraphIndex,
}

impl<'a> Triggers<'a> {
    pub fn references(&self) -> &[NodeId] {
        &self.references
    }

    /// Content of a referenced node; `None` when it has none.
    pub fn content(&self, id: &NodeId) -> Option<&'a Value> {
        self.index.node(id).and_then(|n| n.content())
    }

    /// Content of every reference in order, `null` standing in for absent
    /// content. A node without triggers sees a single `null`.
    pub fn contents(&self) -> Vec<&'a Value> {
        if self.references.is_empty() {
            return vec![&NULL];
        }
        self.references
            .iter()
            .map(|id| self.content(id).unwrap_or(&NULL))
            .collect()
    }
}

/// Decides whether a condition holds for the given trigger contents.
pub trait ConditionEvaluator: Send + Sync {
    fn satisfies(&self, condition: &Value, triggers: &Triggers<'_>) -> Result<bool, EvalError>;
}

/// Built-in evaluator.
///
/// - `null` holds, booleans are taken as-is
/// - scalars hold when a trigger's content equals them (or a list content contains them)
/// - lists hold when any element does
/// - objects carry one operator: `equals`, `not_equals`, `in`, `filled`, `gt`, `lt`
///
/// With several triggers the condition holds when any trigger satisfies it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchEvaluator;

impl ConditionEvaluator for MatchEvaluator {
    fn satisfies(&self, condition: &Value, triggers: &Triggers<'_>) -> Result<bool, EvalError> {
        match condition {
            Value::Null => return Ok(true),
            Value::Bool(flag) => return Ok(*flag),
            _ => {}
        }
        for content in triggers.contents() {
            if matches_condition(condition, content)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn matches_condition(condition: &Value, content: &Value) -> Result<bool, EvalError> {
    match condition {
        Value::Array(options) => Ok(options.iter().any(|o| equals_or_contains(content, o))),
        Value::Object(operators) => {
            let mut entries = operators.iter();
            let (Some((operator, operand)), None) = (entries.next(), entries.next()) else {
                return Err(EvalError::MalformedCondition(operators.len()));
            };
            apply_operator(operator, operand, content)
        }
        expected => Ok(equals_or_contains(content, expected)),
    }
}

fn apply_operator(operator: &str, operand: &Value, content: &Value) -> Result<bool, EvalError> {
    let invalid = |expected| EvalError::InvalidOperand {
        operator: operator.to_string(),
        expected,
    };
    match operator {
        "equals" => Ok(equals_or_contains(content, operand)),
        "not_equals" => Ok(!equals_or_contains(content, operand)),
        "in" => operand
            .as_array()
            .map(|options| options.iter().any(|o| equals_or_contains(content, o)))
            .ok_or_else(|| invalid("a list")),
        "filled" => operand
            .as_bool()
            .map(|want| !model::is_empty_value(content) == want)
            .ok_or_else(|| invalid("a boolean")),
        "gt" | "lt" => {
            let bound = operand.as_f64().ok_or_else(|| invalid("a number"))?;
            Ok(content
                .as_f64()
                .is_some_and(|v| if operator == "gt" { v > bound } else { v < bound }))
        }
        other => Err(EvalError::UnknownOperator(other.to_string())),
    }
}

fn equals_or_contains(content: &Value, expected: &Value) -> bool {
    content == expected || matches!(content, Value::Array(items) if items.contains(expected))
}

/// Compute the activation flag of every node.
///
/// Dangling trigger references are `param_error`s; conditions the evaluator
/// rejects are `business_error`s. All nodes are visited so every problem is
/// reported in one pass.
pub fn evaluate(
    index: &GraphIndex,
    evaluator: &dyn ConditionEvaluator,
) -> Result<HashMap<NodeId, bool>, Errors> {
    let mut errors = Errors::new();
    let mut flags: HashMap<NodeId, bool> = HashMap::with_capacity(index.len());

    for id in index.topological_order() {
        let Some(node) = index.node(id) else { continue };

        let mut references = Vec::new();
        for reference in node.trigger_refs() {
            match NodeId::parse(reference, false) {
                Ok(target) if index.contains(&target) => references.push(target),
                _ => errors.push(
                    Error::param(format!("Trigger references unknown node {reference}"))
                        .at(format!("{id}.{}", model::TRIGGER)),
                ),
            }
        }

        let triggers = Triggers { references, index };
        let own = match node.condition() {
            None => true,
            Some(condition) => match evaluator.satisfies(condition, &triggers) {
                Ok(own) => own,
                Err(e) => {
                    errors.push(
                        Error::business(format!("Condition cannot be evaluated: {e}"))
                            .at(format!("{id}.{}", model::CONDITION)),
                    );
                    false
                }
            },
        };

        let parent_active = match node.parent_id {
            Some(parent) => flags.get(&parent).copied().unwrap_or(false),
            None => true,
        };
        tracing::trace!("{} parent_active={} own={}", id, parent_active, own);
        flags.insert(*id, parent_active && own);
    }

    errors.into_result(flags)
}

/// Evaluate and write the flags back into the index.
pub fn refresh(index: &mut GraphIndex, evaluator: &dyn ConditionEvaluator) -> Result<(), Errors> {
    let flags = evaluate(index, evaluator)?;
    for (id, active) in flags {
        if let Some(node) = index.node_mut(&id) {
            node.active = active;
        }
    }
    Ok(())
}
