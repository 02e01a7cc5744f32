use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use crate::clock::{format_timestamp, Clock};
use crate::connection::{Connection, SqlValue};
use crate::domain::{EntityRef, Tree};
use crate::error::{StoreError, StoreResult};
use crate::mapper::{DataMapper, TreeMapper};

use super::{insert_row, update_row, TreeRepository, TREES_TABLE};

const SELECT_TREE: &str =
    "SELECT id, name, description, created_at, updated_at, is_active FROM trees";

pub struct SqlTreeRepository {
    conn: Rc<dyn Connection>,
    clock: Arc<dyn Clock>,
    mapper: TreeMapper,
}

impl SqlTreeRepository {
    pub fn new(conn: Rc<dyn Connection>, clock: Arc<dyn Clock>) -> Self {
        Self {
            conn,
            clock,
            mapper: TreeMapper,
        }
    }

    fn find_one(&self, sql: &str, params: &[SqlValue]) -> StoreResult<Option<Tree>> {
        self.conn
            .query(sql, params)?
            .first()
            .map(|row| self.mapper.map_to_entity(row))
            .transpose()
    }

    fn find_many(&self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<Tree>> {
        let rows = self.conn.query(sql, params)?;
        self.mapper.map_to_entities(&rows)
    }

    fn set_active(&self, id: i64, active: bool) -> StoreResult<bool> {
        let Some(mut tree) = self.find_by_id(id)? else {
            return Ok(false);
        };
        if active {
            tree.restore(self.clock.as_ref());
        } else {
            tree.soft_delete(self.clock.as_ref());
        }
        let changed = self.conn.execute(
            "UPDATE trees SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            &[
                SqlValue::Integer(i64::from(active)),
                SqlValue::Text(format_timestamp(tree.updated_at())),
                SqlValue::Integer(id),
            ],
        )?;
        debug!(id, active, "tree active flag set");
        Ok(changed > 0)
    }
}

impl TreeRepository for SqlTreeRepository {
    fn find_by_id(&self, id: i64) -> StoreResult<Option<Tree>> {
        self.find_one(
            &format!("{SELECT_TREE} WHERE id = ?1"),
            &[SqlValue::Integer(id)],
        )
    }

    fn find_by_name(&self, name: &str) -> StoreResult<Option<Tree>> {
        self.find_one(
            &format!("{SELECT_TREE} WHERE name = ?1 ORDER BY id ASC LIMIT 1"),
            &[SqlValue::Text(name.to_string())],
        )
    }

    fn find_all(&self) -> StoreResult<Vec<Tree>> {
        self.find_many(&format!("{SELECT_TREE} ORDER BY name ASC, id ASC"), &[])
    }

    fn find_active(&self) -> StoreResult<Vec<Tree>> {
        self.find_many(
            &format!("{SELECT_TREE} WHERE is_active = 1 ORDER BY name ASC, id ASC"),
            &[],
        )
    }

    fn find_deleted(&self) -> StoreResult<Vec<Tree>> {
        self.find_many(
            &format!("{SELECT_TREE} WHERE is_active = 0 ORDER BY name ASC, id ASC"),
            &[],
        )
    }

    fn save(&self, tree: &mut Tree) -> StoreResult<()> {
        let row = self.mapper.map_to_array(EntityRef::from(&*tree))?;
        match tree.id() {
            None => {
                let id = insert_row(self.conn.as_ref(), TREES_TABLE, &row)?;
                tree.assign_id(id);
                debug!(id, name = tree.name(), "tree inserted");
            }
            Some(id) => {
                if update_row(self.conn.as_ref(), TREES_TABLE, id, &row)? == 0 {
                    return Err(StoreError::NotFound { entity: "Tree", id });
                }
                debug!(id, "tree updated");
            }
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM trees WHERE id = ?1", &[SqlValue::Integer(id)])?;
        Ok(changed > 0)
    }

    fn soft_delete(&self, id: i64) -> StoreResult<bool> {
        self.set_active(id, false)
    }

    fn restore(&self, id: i64) -> StoreResult<bool> {
        self.set_active(id, true)
    }

    fn delete_by_tree_id(&self, tree_id: i64) -> StoreResult<usize> {
        self.conn.execute(
            "DELETE FROM tree_nodes WHERE tree_id = ?1",
            &[SqlValue::Integer(tree_id)],
        )
    }

    fn find_tree_structure(&self, id: i64) -> StoreResult<Option<Tree>> {
        self.find_by_id(id)
    }
}
