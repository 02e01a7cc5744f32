use std::rc::Rc;

use tracing::debug;

use crate::connection::{Connection, SqlValue};
use crate::domain::{EntityRef, NodeBranch, TreeNode};
use crate::error::{StoreError, StoreResult};
use crate::mapper::{DataMapper, TreeNodeMapper};
use crate::structure;

use super::{insert_row, update_row, TreeNodeRepository, TREE_NODES_TABLE};

const SELECT_NODE: &str =
    "SELECT id, tree_id, parent_id, name, sort_order, type_class, type_data FROM tree_nodes";

pub struct SqlTreeNodeRepository {
    conn: Rc<dyn Connection>,
    mapper: TreeNodeMapper,
}

impl SqlTreeNodeRepository {
    pub fn new(conn: Rc<dyn Connection>) -> Self {
        Self {
            conn,
            mapper: TreeNodeMapper,
        }
    }

    fn find_many(&self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<TreeNode>> {
        let rows = self.conn.query(sql, params)?;
        self.mapper.map_to_entities(&rows)
    }
}

impl TreeNodeRepository for SqlTreeNodeRepository {
    fn find_by_id(&self, id: i64) -> StoreResult<Option<TreeNode>> {
        self.conn
            .query(
                &format!("{SELECT_NODE} WHERE id = ?1"),
                &[SqlValue::Integer(id)],
            )?
            .first()
            .map(|row| self.mapper.map_to_entity(row))
            .transpose()
    }

    fn find_by_tree_id(&self, tree_id: i64) -> StoreResult<Vec<TreeNode>> {
        self.find_many(
            &format!("{SELECT_NODE} WHERE tree_id = ?1 ORDER BY sort_order ASC, id ASC"),
            &[SqlValue::Integer(tree_id)],
        )
    }

    fn find_children(&self, parent_id: i64) -> StoreResult<Vec<TreeNode>> {
        self.find_many(
            &format!("{SELECT_NODE} WHERE parent_id = ?1 ORDER BY sort_order ASC, id ASC"),
            &[SqlValue::Integer(parent_id)],
        )
    }

    fn find_root_nodes(&self, tree_id: i64) -> StoreResult<Vec<TreeNode>> {
        self.find_many(
            &format!(
                "{SELECT_NODE} WHERE tree_id = ?1 AND parent_id IS NULL \
                 ORDER BY sort_order ASC, id ASC"
            ),
            &[SqlValue::Integer(tree_id)],
        )
    }

    fn find_tree_structure(&self, tree_id: i64) -> StoreResult<Vec<NodeBranch>> {
        let nodes = self.find_by_tree_id(tree_id)?;
        Ok(structure::build(nodes))
    }

    fn save(&self, node: &mut TreeNode) -> StoreResult<()> {
        let row = self.mapper.map_to_array(EntityRef::from(&*node))?;
        match node.id() {
            None => {
                let id = insert_row(self.conn.as_ref(), TREE_NODES_TABLE, &row)?;
                node.assign_id(id);
                debug!(id, tree_id = node.tree_id(), "node inserted");
            }
            Some(id) => {
                if update_row(self.conn.as_ref(), TREE_NODES_TABLE, id, &row)? == 0 {
                    return Err(StoreError::NotFound {
                        entity: "Node",
                        id,
                    });
                }
                debug!(id, parent_id = ?node.parent_id(), "node updated");
            }
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM tree_nodes WHERE id = ?1",
            &[SqlValue::Integer(id)],
        )?;
        Ok(changed > 0)
    }

    fn delete_by_tree_id(&self, tree_id: i64) -> StoreResult<usize> {
        self.conn.execute(
            "DELETE FROM tree_nodes WHERE tree_id = ?1",
            &[SqlValue::Integer(tree_id)],
        )
    }
}
