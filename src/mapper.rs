//! Row <-> entity translation.

use serde_json::Value;

use crate::clock::{format_timestamp, parse_timestamp};
use crate::connection::{Row, SqlValue};
use crate::domain::{EntityRef, NodeKind, Tree, TreeNode};
use crate::error::{StoreError, StoreResult};

pub trait DataMapper {
    type Entity;

    fn map_to_entity(&self, row: &Row) -> StoreResult<Self::Entity>;

    fn map_to_entities(&self, rows: &[Row]) -> StoreResult<Vec<Self::Entity>> {
        rows.iter().map(|row| self.map_to_entity(row)).collect()
    }

    /// Fails with `TypeMismatch` when handed another entity family.
    fn map_to_array(&self, entity: EntityRef<'_>) -> StoreResult<Row>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeMapper;

impl DataMapper for TreeMapper {
    type Entity = Tree;

    fn map_to_entity(&self, row: &Row) -> StoreResult<Tree> {
        Ok(Tree::from_parts(
            optional_int(row, "id")?,
            required_text(row, "name")?,
            optional_text(row, "description")?,
            parse_timestamp(&required_text(row, "created_at")?)?,
            parse_timestamp(&required_text(row, "updated_at")?)?,
            flag(row, "is_active")?,
        ))
    }

    fn map_to_array(&self, entity: EntityRef<'_>) -> StoreResult<Row> {
        let EntityRef::Tree(tree) = entity else {
            return Err(StoreError::TypeMismatch {
                expected: "Tree",
                actual: entity.family(),
            });
        };
        let mut row = Row::new();
        row.insert("id".to_string(), tree.id().into());
        row.insert("name".to_string(), tree.name().to_string().into());
        row.insert(
            "description".to_string(),
            tree.description().map(str::to_string).into(),
        );
        row.insert(
            "created_at".to_string(),
            format_timestamp(tree.created_at()).into(),
        );
        row.insert(
            "updated_at".to_string(),
            format_timestamp(tree.updated_at()).into(),
        );
        row.insert(
            "is_active".to_string(),
            SqlValue::Integer(i64::from(tree.is_active())),
        );
        Ok(row)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeNodeMapper;

impl DataMapper for TreeNodeMapper {
    type Entity = TreeNode;

    fn map_to_entity(&self, row: &Row) -> StoreResult<TreeNode> {
        let discriminator = required_text(row, "type_class")?;
        let payload: Value = serde_json::from_str(&required_text(row, "type_data")?)?;
        let kind = NodeKind::from_parts(&discriminator, &payload)?;
        Ok(TreeNode::from_parts(
            optional_int(row, "id")?,
            required_int(row, "tree_id")?,
            optional_int(row, "parent_id")?,
            required_text(row, "name")?,
            required_int(row, "sort_order")?,
            kind,
        ))
    }

    fn map_to_array(&self, entity: EntityRef<'_>) -> StoreResult<Row> {
        let EntityRef::Node(node) = entity else {
            return Err(StoreError::TypeMismatch {
                expected: "TreeNode",
                actual: entity.family(),
            });
        };
        let mut row = Row::new();
        row.insert("id".to_string(), node.id().into());
        row.insert("tree_id".to_string(), node.tree_id().into());
        row.insert("parent_id".to_string(), node.parent_id().into());
        row.insert("name".to_string(), node.name().to_string().into());
        row.insert("sort_order".to_string(), node.sort_order().into());
        row.insert("type_class".to_string(), node.type_name().to_string().into());
        row.insert(
            "type_data".to_string(),
            serde_json::to_string(&Value::Object(node.type_data()))?.into(),
        );
        Ok(row)
    }
}

fn column<'r>(row: &'r Row, name: &str) -> &'r SqlValue {
    row.get(name).unwrap_or(&SqlValue::Null)
}

fn wrong_type(name: &str, expected: &str, value: &SqlValue) -> StoreError {
    StoreError::invalid_argument(format!(
        "column '{name}' expected {expected}, got {:?}",
        value.data_type()
    ))
}

fn optional_int(row: &Row, name: &str) -> StoreResult<Option<i64>> {
    match column(row, name) {
        SqlValue::Null => Ok(None),
        SqlValue::Integer(value) => Ok(Some(*value)),
        other => Err(wrong_type(name, "integer", other)),
    }
}

fn required_int(row: &Row, name: &str) -> StoreResult<i64> {
    optional_int(row, name)?
        .ok_or_else(|| StoreError::invalid_argument(format!("column '{name}' is required")))
}

fn optional_text(row: &Row, name: &str) -> StoreResult<Option<String>> {
    match column(row, name) {
        SqlValue::Null => Ok(None),
        SqlValue::Text(value) => Ok(Some(value.clone())),
        other => Err(wrong_type(name, "text", other)),
    }
}

fn required_text(row: &Row, name: &str) -> StoreResult<String> {
    optional_text(row, name)?
        .ok_or_else(|| StoreError::invalid_argument(format!("column '{name}' is required")))
}

fn flag(row: &Row, name: &str) -> StoreResult<bool> {
    match column(row, name) {
        SqlValue::Integer(0) => Ok(false),
        SqlValue::Integer(1) => Ok(true),
        other => Err(wrong_type(name, "0 or 1", other)),
    }
}
