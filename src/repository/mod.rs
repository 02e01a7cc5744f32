//! SQL-backed repositories and the caching decorator.
//!
//! Every value reaches SQLite as a bound parameter. Statement text only ever
//! contains the fixed table and column names below.

mod cached;
mod node;
mod tree;

pub use cached::{CachedTreeRepository, TreeCacheEntry, DEFAULT_CACHE_TTL};
pub use node::SqlTreeNodeRepository;
pub use tree::SqlTreeRepository;

use crate::connection::{Connection, Row, SqlValue};
use crate::domain::{NodeBranch, Tree, TreeNode};
use crate::error::StoreResult;

pub(crate) const TREES_TABLE: &str = "trees";
pub(crate) const TREE_NODES_TABLE: &str = "tree_nodes";

pub trait TreeRepository {
    fn find_by_id(&self, id: i64) -> StoreResult<Option<Tree>>;
    /// First tree (lowest id) carrying `name`.
    fn find_by_name(&self, name: &str) -> StoreResult<Option<Tree>>;
    fn find_all(&self) -> StoreResult<Vec<Tree>>;
    fn find_active(&self) -> StoreResult<Vec<Tree>>;
    fn find_deleted(&self) -> StoreResult<Vec<Tree>>;
    /// Inserts when `tree.id()` is `None` and assigns the new id, otherwise
    /// updates the row with that id.
    fn save(&self, tree: &mut Tree) -> StoreResult<()>;
    fn delete(&self, id: i64) -> StoreResult<bool>;
    fn soft_delete(&self, id: i64) -> StoreResult<bool>;
    fn restore(&self, id: i64) -> StoreResult<bool>;
    fn delete_by_tree_id(&self, tree_id: i64) -> StoreResult<usize>;
    /// Tree metadata only. The node hierarchy comes from
    /// [`TreeNodeRepository::find_tree_structure`].
    fn find_tree_structure(&self, id: i64) -> StoreResult<Option<Tree>>;
}

pub trait TreeNodeRepository {
    fn find_by_id(&self, id: i64) -> StoreResult<Option<TreeNode>>;
    /// All nodes of a tree ordered by `sort_order`, then id.
    fn find_by_tree_id(&self, tree_id: i64) -> StoreResult<Vec<TreeNode>>;
    fn find_children(&self, parent_id: i64) -> StoreResult<Vec<TreeNode>>;
    fn find_root_nodes(&self, tree_id: i64) -> StoreResult<Vec<TreeNode>>;
    /// Root branches of a tree with children populated; orphans are dropped.
    fn find_tree_structure(&self, tree_id: i64) -> StoreResult<Vec<NodeBranch>>;
    fn save(&self, node: &mut TreeNode) -> StoreResult<()>;
    fn delete(&self, id: i64) -> StoreResult<bool>;
    fn delete_by_tree_id(&self, tree_id: i64) -> StoreResult<usize>;
}

/// Inserts every column of `row` except `id` and returns the new row id.
pub(crate) fn insert_row(conn: &dyn Connection, table: &str, row: &Row) -> StoreResult<i64> {
    let (columns, values): (Vec<&str>, Vec<SqlValue>) = row
        .iter()
        .filter(|(column, _)| column.as_str() != "id")
        .map(|(column, value)| (column.as_str(), value.clone()))
        .unzip();
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    );
    conn.execute(&sql, &values)?;
    Ok(conn.last_insert_id())
}

/// Updates every column of `row` except `id` on the row with `id`.
pub(crate) fn update_row(
    conn: &dyn Connection,
    table: &str,
    id: i64,
    row: &Row,
) -> StoreResult<usize> {
    let mut assignments = Vec::new();
    let mut values = Vec::new();
    for (column, value) in row.iter().filter(|(column, _)| column.as_str() != "id") {
        values.push(value.clone());
        assignments.push(format!("{column} = ?{}", values.len()));
    }
    values.push(SqlValue::Integer(id));
    let sql = format!(
        "UPDATE {table} SET {} WHERE id = ?{}",
        assignments.join(", "),
        values.len()
    );
    conn.execute(&sql, &values)
}
