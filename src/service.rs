use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::Duration;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::clock::Clock;
use crate::connection::Connection;
use crate::domain::{EntityRef, NodeBranch, NodeKind, Tree, TreeNode};
use crate::error::{StoreError, StoreResult};
use crate::repository::{
    CachedTreeRepository, SqlTreeNodeRepository, SqlTreeRepository, TreeCacheEntry,
    TreeNodeRepository, TreeRepository,
};
use crate::unit_of_work::UnitOfWork;

/// Untyped description of a node to create, as supplied by callers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Overrides the tree the node is created in.
    #[serde(default)]
    pub tree_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub type_data: Value,
}

impl NodeSpec {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            node_type: "SimpleNode".to_string(),
            name: name.into(),
            parent_id: None,
            tree_id: None,
            sort_order: 0,
            type_data: Value::Null,
        }
    }

    pub fn button(
        name: impl Into<String>,
        button_text: impl Into<String>,
        button_action: impl Into<String>,
    ) -> Self {
        Self {
            node_type: "ButtonNode".to_string(),
            type_data: serde_json::json!({
                "button_text": button_text.into(),
                "button_action": button_action.into(),
            }),
            ..Self::simple(name)
        }
    }

    pub fn under(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn sorted(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// Compound tree operations, each bounded by one unit of work.
pub struct TreeService {
    uow: UnitOfWork,
    trees: Box<dyn TreeRepository>,
    nodes: Box<dyn TreeNodeRepository>,
    clock: Arc<dyn Clock>,
}

impl TreeService {
    pub fn new(
        uow: UnitOfWork,
        trees: Box<dyn TreeRepository>,
        nodes: Box<dyn TreeNodeRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            uow,
            trees,
            nodes,
            clock,
        }
    }

    /// SQL repositories over one connection, with tree reads cached.
    pub fn with_connection(
        conn: Rc<dyn Connection>,
        cache: Arc<dyn Cache<TreeCacheEntry>>,
        cache_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let trees = CachedTreeRepository::with_ttl(
            SqlTreeRepository::new(conn.clone(), clock.clone()),
            cache,
            cache_ttl,
        );
        let nodes = SqlTreeNodeRepository::new(conn.clone());
        Self::new(
            UnitOfWork::new(conn),
            Box::new(trees),
            Box::new(nodes),
            clock,
        )
    }

    pub fn trees(&self) -> &dyn TreeRepository {
        self.trees.as_ref()
    }

    pub fn nodes(&self) -> &dyn TreeNodeRepository {
        self.nodes.as_ref()
    }

    pub fn create_tree_with_nodes(
        &mut self,
        name: &str,
        description: Option<&str>,
        specs: &[NodeSpec],
    ) -> StoreResult<Tree> {
        self.transactional("create_tree_with_nodes", |svc| {
            let mut tree = Tree::new(name, description.map(str::to_string), svc.clock.as_ref());
            svc.trees.save(&mut tree)?;
            svc.uow.register_new(EntityRef::from(&tree));

            for spec in specs {
                let mut node = build_node(spec, tree.id())?;
                if let Some(parent_id) = node.parent_id() {
                    svc.ensure_valid_parent(&node, parent_id)?;
                }
                svc.nodes.save(&mut node)?;
                svc.uow.register_new(EntityRef::from(&node));
            }
            info!(id = ?tree.id(), nodes = specs.len(), "tree created");
            Ok(tree)
        })
    }

    /// Re-parents a node; `None` makes it a root.
    pub fn move_node(&mut self, node_id: i64, new_parent_id: Option<i64>) -> StoreResult<TreeNode> {
        self.transactional("move_node", |svc| {
            let node = svc.nodes.find_by_id(node_id)?.ok_or_else(|| {
                StoreError::invalid_argument(format!("Node with ID {node_id} not found"))
            })?;
            if let Some(parent_id) = new_parent_id {
                svc.ensure_valid_parent(&node, parent_id)?;
            }

            let mut moved = node.with_parent(new_parent_id);
            svc.nodes.save(&mut moved)?;
            svc.uow.register_dirty(EntityRef::from(&moved));
            info!(node_id, parent_id = ?new_parent_id, "node moved");
            Ok(moved)
        })
    }

    /// Removes a tree and all of its nodes. Returns whether the tree existed.
    pub fn delete_tree_with_nodes(&mut self, tree_id: i64) -> StoreResult<bool> {
        self.transactional("delete_tree_with_nodes", |svc| {
            let removed_nodes = svc.nodes.delete_by_tree_id(tree_id)?;
            let removed = svc.trees.delete(tree_id)?;
            info!(tree_id, removed_nodes, removed, "tree deleted");
            Ok(removed)
        })
    }

    pub fn get_tree_structure(&mut self, tree_id: i64) -> StoreResult<Vec<NodeBranch>> {
        self.transactional("get_tree_structure", |svc| {
            svc.require_tree(tree_id)?;
            svc.nodes.find_tree_structure(tree_id)
        })
    }

    /// Adds one node to an existing tree.
    pub fn add_node(&mut self, tree_id: i64, spec: &NodeSpec) -> StoreResult<TreeNode> {
        self.transactional("add_node", |svc| {
            svc.require_tree(tree_id)?;
            let mut node = build_node(spec, Some(tree_id))?;
            if node.tree_id() != tree_id {
                return Err(StoreError::invalid_argument(format!(
                    "node targets tree {} but was added to tree {tree_id}",
                    node.tree_id()
                )));
            }
            if let Some(parent_id) = node.parent_id() {
                svc.ensure_valid_parent(&node, parent_id)?;
            }
            svc.nodes.save(&mut node)?;
            svc.uow.register_new(EntityRef::from(&node));
            Ok(node)
        })
    }

    pub fn soft_delete_tree(&mut self, tree_id: i64) -> StoreResult<()> {
        self.transactional("soft_delete_tree", |svc| {
            if !svc.trees.soft_delete(tree_id)? {
                return Err(StoreError::NotFound {
                    entity: "Tree",
                    id: tree_id,
                });
            }
            Ok(())
        })
    }

    pub fn restore_tree(&mut self, tree_id: i64) -> StoreResult<()> {
        self.transactional("restore_tree", |svc| {
            if !svc.trees.restore(tree_id)? {
                return Err(StoreError::NotFound {
                    entity: "Tree",
                    id: tree_id,
                });
            }
            Ok(())
        })
    }

    fn transactional<T, F>(&mut self, operation: &'static str, work: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Self) -> StoreResult<T>,
    {
        self.uow.begin_transaction()?;
        match work(self) {
            Ok(value) => {
                self.uow.commit()?;
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "operation failed; rolling back");
                if let Err(rollback_err) = self.uow.rollback() {
                    warn!(operation, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    fn require_tree(&self, tree_id: i64) -> StoreResult<Tree> {
        self.trees.find_by_id(tree_id)?.ok_or_else(|| {
            StoreError::invalid_argument(format!("Tree with ID {tree_id} not found"))
        })
    }

    /// The parent must live in the node's tree and must not sit below it.
    fn ensure_valid_parent(&self, node: &TreeNode, parent_id: i64) -> StoreResult<()> {
        if node.id() == Some(parent_id) {
            return Err(StoreError::invalid_argument(format!(
                "Node with ID {parent_id} cannot be its own parent"
            )));
        }
        let parent = self
            .nodes
            .find_by_id(parent_id)?
            .filter(|parent| parent.tree_id() == node.tree_id())
            .ok_or_else(|| {
                StoreError::invalid_argument(format!(
                    "Parent node with ID {parent_id} not found in tree {}",
                    node.tree_id()
                ))
            })?;

        let Some(node_id) = node.id() else {
            return Ok(());
        };
        let mut seen = HashSet::new();
        let mut ancestor = parent.parent_id();
        while let Some(current) = ancestor {
            if current == node_id {
                return Err(StoreError::invalid_argument(format!(
                    "cannot move node {node_id} below its own descendant {parent_id}"
                )));
            }
            if !seen.insert(current) {
                break;
            }
            ancestor = self
                .nodes
                .find_by_id(current)?
                .and_then(|next| next.parent_id());
        }
        Ok(())
    }
}

fn build_node(spec: &NodeSpec, default_tree_id: Option<i64>) -> StoreResult<TreeNode> {
    let tree_id = spec.tree_id.or(default_tree_id).ok_or_else(|| {
        StoreError::invalid_argument(format!("no tree ID available for node '{}'", spec.name))
    })?;
    let kind = NodeKind::from_parts(&spec.node_type, &spec.type_data).map_err(|err| match err {
        StoreError::Configuration(message) => StoreError::InvalidArgument(message),
        other => other,
    })?;
    Ok(TreeNode::new(
        tree_id,
        spec.parent_id,
        spec.name.clone(),
        spec.sort_order,
        kind,
    ))
}
