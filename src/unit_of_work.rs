use std::rc::Rc;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::domain::EntityRef;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    InTransaction,
}

/// An entity recorded through one of the `register_*` hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredEntity {
    pub family: &'static str,
    pub id: Option<i64>,
}

impl From<EntityRef<'_>> for RegisteredEntity {
    fn from(value: EntityRef<'_>) -> Self {
        let id = match value {
            EntityRef::Tree(tree) => tree.id(),
            EntityRef::Node(node) => node.id(),
        };
        Self {
            family: value.family(),
            id,
        }
    }
}

/// Bounds a group of repository writes in one transaction.
///
/// Writes go straight through the repositories; the registration lists are
/// bookkeeping only and are cleared whenever the transaction ends.
pub struct UnitOfWork {
    conn: Rc<dyn Connection>,
    state: TransactionState,
    new_entities: Vec<RegisteredEntity>,
    dirty_entities: Vec<RegisteredEntity>,
    deleted_entities: Vec<RegisteredEntity>,
}

impl UnitOfWork {
    pub fn new(conn: Rc<dyn Connection>) -> Self {
        Self {
            conn,
            state: TransactionState::Idle,
            new_entities: Vec::new(),
            dirty_entities: Vec::new(),
            deleted_entities: Vec::new(),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn in_transaction(&self) -> bool {
        self.state == TransactionState::InTransaction
    }

    pub fn begin_transaction(&mut self) -> StoreResult<()> {
        if self.in_transaction() {
            return Err(StoreError::Transaction(
                "unit of work is already in a transaction",
            ));
        }
        self.conn.begin_transaction()?;
        self.state = TransactionState::InTransaction;
        debug!("transaction started");
        Ok(())
    }

    /// Commits, or rolls back and returns the commit error unchanged.
    pub fn commit(&mut self) -> StoreResult<()> {
        if !self.in_transaction() {
            return Err(StoreError::Transaction("no active transaction to commit"));
        }
        match self.conn.commit() {
            Ok(()) => {
                self.finish();
                debug!("transaction committed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "commit failed; rolling back");
                if let Err(rollback_err) = self.rollback() {
                    warn!(error = %rollback_err, "rollback after failed commit also failed");
                }
                Err(err)
            }
        }
    }

    pub fn rollback(&mut self) -> StoreResult<()> {
        if !self.in_transaction() {
            return Err(StoreError::Transaction("no active transaction to roll back"));
        }
        let result = self.conn.rollback();
        self.finish();
        debug!("transaction rolled back");
        result
    }

    pub fn register_new(&mut self, entity: EntityRef<'_>) {
        self.new_entities.push(entity.into());
    }

    pub fn register_dirty(&mut self, entity: EntityRef<'_>) {
        self.dirty_entities.push(entity.into());
    }

    pub fn register_deleted(&mut self, entity: EntityRef<'_>) {
        self.deleted_entities.push(entity.into());
    }

    pub fn registered_new(&self) -> &[RegisteredEntity] {
        &self.new_entities
    }

    pub fn registered_dirty(&self) -> &[RegisteredEntity] {
        &self.dirty_entities
    }

    pub fn registered_deleted(&self) -> &[RegisteredEntity] {
        &self.deleted_entities
    }

    fn finish(&mut self) {
        self.state = TransactionState::Idle;
        self.new_entities.clear();
        self.dirty_entities.clear();
        self.deleted_entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NodeKind, TreeNode};
    use crate::test_support::RecordingConnection;

    fn unit() -> (Rc<RecordingConnection>, UnitOfWork) {
        let conn = Rc::new(RecordingConnection::default());
        let uow = UnitOfWork::new(conn.clone());
        (conn, uow)
    }

    #[test]
    fn begin_commit_returns_to_idle() {
        let (conn, mut uow) = unit();
        uow.begin_transaction().expect("begin should succeed");
        assert_eq!(uow.state(), TransactionState::InTransaction);
        uow.commit().expect("commit should succeed");
        assert_eq!(uow.state(), TransactionState::Idle);
        assert_eq!(conn.commits(), 1);
        assert_eq!(conn.rollbacks(), 0);
    }

    #[test]
    fn second_begin_fails() {
        let (conn, mut uow) = unit();
        uow.begin_transaction().expect("begin should succeed");
        let err = uow.begin_transaction().expect_err("nested begin should fail");
        assert!(matches!(err, StoreError::Transaction(_)));
        assert_eq!(conn.begins(), 1);
    }

    #[test]
    fn failed_commit_rolls_back_and_reraises() {
        let (conn, mut uow) = unit();
        conn.fail_commit();
        uow.begin_transaction().expect("begin should succeed");
        let err = uow.commit().expect_err("commit should fail");
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(conn.rollbacks(), 1);
        assert!(!uow.in_transaction());
    }

    #[test]
    fn rollback_returns_to_idle() {
        let (conn, mut uow) = unit();
        uow.begin_transaction().expect("begin should succeed");
        uow.rollback().expect("rollback should succeed");
        assert!(!uow.in_transaction());
        assert_eq!(conn.rollbacks(), 1);
        assert_eq!(conn.commits(), 0);
    }

    #[test]
    fn commit_or_rollback_without_begin_is_rejected() {
        let (conn, mut uow) = unit();
        assert!(matches!(uow.commit(), Err(StoreError::Transaction(_))));
        assert!(matches!(uow.rollback(), Err(StoreError::Transaction(_))));
        assert_eq!(conn.commits() + conn.rollbacks(), 0);
    }

    #[test]
    fn registrations_clear_when_transaction_ends() {
        let (_conn, mut uow) = unit();
        let node = TreeNode::new(1, None, "n", 0, NodeKind::Simple);
        uow.begin_transaction().expect("begin should succeed");
        uow.register_new(EntityRef::from(&node));
        uow.register_dirty(EntityRef::from(&node));
        uow.register_deleted(EntityRef::from(&node));
        assert_eq!(
            uow.registered_new(),
            &[RegisteredEntity {
                family: "TreeNode",
                id: None
            }]
        );
        uow.commit().expect("commit should succeed");
        assert!(uow.registered_new().is_empty());
        assert!(uow.registered_dirty().is_empty());
        assert!(uow.registered_deleted().is_empty());
    }
}
