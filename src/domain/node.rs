use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

pub const SIMPLE_NODE: &str = "SimpleNode";
pub const BUTTON_NODE: &str = "ButtonNode";

/// Type-specific part of a node, selected by the stored discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Simple,
    Button {
        button_text: String,
        button_action: String,
    },
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Simple => SIMPLE_NODE,
            NodeKind::Button { .. } => BUTTON_NODE,
        }
    }

    pub fn type_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        if let NodeKind::Button {
            button_text,
            button_action,
        } = self
        {
            data.insert("button_text".to_string(), Value::from(button_text.as_str()));
            data.insert(
                "button_action".to_string(),
                Value::from(button_action.as_str()),
            );
        }
        data
    }

    /// Decodes a discriminator plus payload. Unknown discriminators are a
    /// configuration error; absent button fields default to empty strings.
    pub fn from_parts(discriminator: &str, data: &Value) -> StoreResult<Self> {
        match discriminator {
            SIMPLE_NODE | "simple" => Ok(NodeKind::Simple),
            BUTTON_NODE | "button" => Ok(NodeKind::Button {
                button_text: payload_str(data, "button_text")?,
                button_action: payload_str(data, "button_action")?,
            }),
            other => Err(StoreError::unknown_node_type(other)),
        }
    }
}

fn payload_str(data: &Value, field: &str) -> StoreResult<String> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(StoreError::invalid_argument(format!(
            "type_data field '{field}' must be a string, got {other}"
        ))),
    }
}

/// Renders one node per concrete variant.
pub trait NodeVisitor {
    fn visit_simple(&mut self, node: &TreeNode) -> String;
    fn visit_button(&mut self, node: &TreeNode, button_text: &str, button_action: &str)
        -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    id: Option<i64>,
    tree_id: i64,
    parent_id: Option<i64>,
    name: String,
    sort_order: i64,
    kind: NodeKind,
}

impl TreeNode {
    pub fn new(
        tree_id: i64,
        parent_id: Option<i64>,
        name: impl Into<String>,
        sort_order: i64,
        kind: NodeKind,
    ) -> Self {
        Self {
            id: None,
            tree_id,
            parent_id,
            name: name.into(),
            sort_order,
            kind,
        }
    }

    pub fn from_parts(
        id: Option<i64>,
        tree_id: i64,
        parent_id: Option<i64>,
        name: String,
        sort_order: i64,
        kind: NodeKind,
    ) -> Self {
        Self {
            id,
            tree_id,
            parent_id,
            name,
            sort_order,
            kind,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn tree_id(&self) -> i64 {
        self.tree_id
    }

    pub fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sort_order(&self) -> i64 {
        self.sort_order
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn type_data(&self) -> Map<String, Value> {
        self.kind.type_data()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn with_parent(&self, parent_id: Option<i64>) -> Self {
        Self {
            parent_id,
            ..self.clone()
        }
    }

    pub fn with_sort_order(&self, sort_order: i64) -> Self {
        Self {
            sort_order,
            ..self.clone()
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn accept(&self, visitor: &mut dyn NodeVisitor) -> String {
        match &self.kind {
            NodeKind::Simple => visitor.visit_simple(self),
            NodeKind::Button {
                button_text,
                button_action,
            } => visitor.visit_button(self, button_text, button_action),
        }
    }
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TreeNode", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("tree_id", &self.tree_id)?;
        state.serialize_field("parent_id", &self.parent_id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("sort_order", &self.sort_order)?;
        state.serialize_field("type", self.type_name())?;
        state.serialize_field("type_data", &self.type_data())?;
        state.end()
    }
}

/// A node together with its assembled children. Built on read, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeBranch {
    #[serde(flatten)]
    pub node: TreeNode,
    children: Vec<NodeBranch>,
}

impl NodeBranch {
    pub fn new(node: TreeNode) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: NodeBranch) {
        self.children.push(child);
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn children(&self) -> &[NodeBranch] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeBranch> {
        &mut self.children
    }
}

// Unlinks descendants level by level so a long parent chain drops without
// one stack frame per level.
impl Drop for NodeBranch {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut branch) = pending.pop() {
            pending.append(&mut branch.children);
        }
    }
}
