//! Test fixtures for formgraph-core

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::model::NodeId;

pub const ROOT: &str = "a1b2c3d4-0000-4000-8000-000000000001";
pub const QUESTION: &str = "a1b2c3d4-0000-4000-8000-000000000002";
pub const FOLLOW_UP: &str = "a1b2c3d4-0000-4000-8000-000000000003";
pub const DETAIL: &str = "a1b2c3d4-0000-4000-8000-000000000004";
pub const ALTERNATE: &str = "a1b2c3d4-0000-4000-8000-000000000005";
pub const ALTERNATE_DETAIL: &str = "a1b2c3d4-0000-4000-8000-000000000006";
pub const SUMMARY: &str = "a1b2c3d4-0000-4000-8000-000000000007";

pub const ALL: [&str; 7] = [ROOT, QUESTION, FOLLOW_UP, DETAIL, ALTERNATE, ALTERNATE_DETAIL, SUMMARY];

pub fn id(text: &str) -> NodeId {
    text.parse().unwrap()
}

/// A small questionnaire:
///
/// ```text
/// ROOT
/// ├── QUESTION          content "yes"
/// ├── FOLLOW_UP         shown when QUESTION == "yes"
/// │   └── DETAIL
/// └── ALTERNATE         shown when QUESTION == "no"
///     └── ALTERNATE_DETAIL
/// SUMMARY               shown when QUESTION is filled
/// ```
pub fn base_graph() -> Value {
    json!({
        ROOT: {
            "id": ROOT,
            "parent_id": null,
            "name": "Survey",
            "description": "Root page",
            "data_type": "none",
            "node_type": "branch",
            "x": 0,
            "y": 0,
            "active": false,
            "view_type": "page",
        },
        QUESTION: {
            "id": QUESTION,
            "parent_id": ROOT,
            "name": "Do you agree?",
            "data_type": "text",
            "node_type": "leaf",
            "x": 0,
            "y": 0,
            "content": "yes",
            "view_type": "radio",
        },
        FOLLOW_UP: {
            "id": FOLLOW_UP,
            "parent_id": ROOT,
            "name": "Why?",
            "data_type": "none",
            "node_type": "branch",
            "x": 0,
            "y": 1,
            "condition": "yes",
            "trigger": QUESTION,
        },
        DETAIL: {
            "id": DETAIL,
            "parent_id": FOLLOW_UP,
            "name": "Details",
            "description": "Free text",
            "data_type": "text",
            "node_type": "leaf",
            "content": "",
            "view_type": "textarea",
        },
        ALTERNATE: {
            "id": ALTERNATE,
            "parent_id": ROOT,
            "name": "Why not?",
            "data_type": "none",
            "node_type": "branch",
            "x": 0,
            "y": 2,
            "condition": "no",
            "trigger": QUESTION,
            "active": true,
        },
        ALTERNATE_DETAIL: {
            "id": ALTERNATE_DETAIL,
            "parent_id": ALTERNATE,
            "name": "Objection",
            "data_type": "text",
            "node_type": "leaf",
        },
        SUMMARY: {
            "id": SUMMARY,
            "name": "Summary",
            "data_type": "none",
            "node_type": "leaf",
            "x": 5,
            "condition": {"filled": true},
            "trigger": [QUESTION],
        },
    })
}

/// Activation of every base node after construction.
pub fn base_activity() -> BTreeMap<NodeId, bool> {
    [
        (ROOT, true),
        (QUESTION, true),
        (FOLLOW_UP, true),
        (DETAIL, true),
        (ALTERNATE, false),
        (ALTERNATE_DETAIL, false),
        (SUMMARY, true),
    ]
    .into_iter()
    .map(|(node, active)| (id(node), active))
    .collect()
}

/// Apply `edit` to the fields of every base node.
pub fn edit_each(mut edit: impl FnMut(&str, &mut serde_json::Map<String, Value>)) -> Value {
    let mut graph = base_graph();
    if let Some(nodes) = graph.as_object_mut() {
        for (key, fields) in nodes.iter_mut() {
            if let Some(fields) = fields.as_object_mut() {
                edit(key, fields);
            }
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_graph_shape() {
        let graph = base_graph();
        let nodes = graph.as_object().unwrap();
        assert_eq!(nodes.len(), ALL.len());
        for key in ALL {
            assert_eq!(nodes[key]["id"], json!(key));
        }
        assert_eq!(base_activity().len(), ALL.len());
    }
}
