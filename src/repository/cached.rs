use std::sync::Arc;

use sha2::{Digest, Sha256};
use time::Duration;
use tracing::debug;

use crate::cache::Cache;
use crate::domain::Tree;
use crate::error::StoreResult;

use super::TreeRepository;

pub const DEFAULT_CACHE_TTL: Duration = Duration::HOUR;

const ACTIVE_KEY: &str = "trees:active";
const DELETED_KEY: &str = "trees:deleted";
const ALL_KEY: &str = "trees:all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeCacheEntry {
    Tree(Tree),
    Trees(Vec<Tree>),
}

fn tree_key(id: i64) -> String {
    format!("tree:{id}")
}

fn structure_key(id: i64) -> String {
    format!("tree_structure:{id}")
}

fn name_key(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    format!("tree_name:{:x}", hasher.finalize())
}

/// Cache-aside wrapper around any [`TreeRepository`].
///
/// Reads populate the cache on a miss and never cache an absent tree. Every
/// write deletes the list keys plus whatever per-tree keys it can name, even
/// when the wrapped write fails.
pub struct CachedTreeRepository<R> {
    inner: R,
    cache: Arc<dyn Cache<TreeCacheEntry>>,
    ttl: Duration,
}

impl<R: TreeRepository> CachedTreeRepository<R> {
    pub fn new(inner: R, cache: Arc<dyn Cache<TreeCacheEntry>>) -> Self {
        Self::with_ttl(inner, cache, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(inner: R, cache: Arc<dyn Cache<TreeCacheEntry>>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn cached_tree<F>(&self, key: &str, load: F) -> StoreResult<Option<Tree>>
    where
        F: FnOnce(&R) -> StoreResult<Option<Tree>>,
    {
        if let Some(TreeCacheEntry::Tree(tree)) = self.cache.get(key) {
            debug!(key, "cache hit");
            return Ok(Some(tree));
        }
        debug!(key, "cache miss");
        let loaded = load(&self.inner)?;
        if let Some(tree) = &loaded {
            self.cache
                .set(key, TreeCacheEntry::Tree(tree.clone()), self.ttl);
        }
        Ok(loaded)
    }

    fn cached_list<F>(&self, key: &str, load: F) -> StoreResult<Vec<Tree>>
    where
        F: FnOnce(&R) -> StoreResult<Vec<Tree>>,
    {
        if let Some(TreeCacheEntry::Trees(trees)) = self.cache.get(key) {
            debug!(key, "cache hit");
            return Ok(trees);
        }
        debug!(key, "cache miss");
        let loaded = load(&self.inner)?;
        self.cache
            .set(key, TreeCacheEntry::Trees(loaded.clone()), self.ttl);
        Ok(loaded)
    }

    /// Name of a tree as last seen, preferring the cached copy.
    fn known_name(&self, id: i64) -> StoreResult<Option<String>> {
        if let Some(TreeCacheEntry::Tree(tree)) = self.cache.get(&tree_key(id)) {
            return Ok(Some(tree.name().to_string()));
        }
        Ok(self
            .inner
            .find_by_id(id)?
            .map(|tree| tree.name().to_string()))
    }

    fn invalidate_for(&self, id: Option<i64>, names: &[&str]) {
        let mut keys = vec![
            ACTIVE_KEY.to_string(),
            DELETED_KEY.to_string(),
            ALL_KEY.to_string(),
        ];
        if let Some(id) = id {
            keys.push(tree_key(id));
            keys.push(structure_key(id));
        }
        keys.extend(names.iter().map(|name| name_key(name)));
        for key in &keys {
            self.cache.delete(key);
        }
        debug!(?keys, "cache invalidated");
    }

    fn write_by_id<T, F>(&self, id: i64, write: F) -> StoreResult<T>
    where
        F: FnOnce(&R) -> StoreResult<T>,
    {
        let name = self.known_name(id)?;
        let result = write(&self.inner);
        let names: Vec<&str> = name.as_deref().into_iter().collect();
        self.invalidate_for(Some(id), &names);
        result
    }
}

impl<R: TreeRepository> TreeRepository for CachedTreeRepository<R> {
    fn find_by_id(&self, id: i64) -> StoreResult<Option<Tree>> {
        self.cached_tree(&tree_key(id), |inner| inner.find_by_id(id))
    }

    fn find_by_name(&self, name: &str) -> StoreResult<Option<Tree>> {
        self.cached_tree(&name_key(name), |inner| inner.find_by_name(name))
    }

    fn find_all(&self) -> StoreResult<Vec<Tree>> {
        self.cached_list(ALL_KEY, |inner| inner.find_all())
    }

    fn find_active(&self) -> StoreResult<Vec<Tree>> {
        self.cached_list(ACTIVE_KEY, |inner| inner.find_active())
    }

    fn find_deleted(&self) -> StoreResult<Vec<Tree>> {
        self.cached_list(DELETED_KEY, |inner| inner.find_deleted())
    }

    fn save(&self, tree: &mut Tree) -> StoreResult<()> {
        let previous_name = match tree.id() {
            Some(id) => self.known_name(id)?,
            None => None,
        };
        let result = self.inner.save(tree);

        let mut names = vec![tree.name()];
        if let Some(previous) = previous_name.as_deref() {
            if previous != tree.name() {
                names.push(previous);
            }
        }
        self.invalidate_for(tree.id(), &names);
        result
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        self.write_by_id(id, |inner| inner.delete(id))
    }

    fn soft_delete(&self, id: i64) -> StoreResult<bool> {
        self.write_by_id(id, |inner| inner.soft_delete(id))
    }

    fn restore(&self, id: i64) -> StoreResult<bool> {
        self.write_by_id(id, |inner| inner.restore(id))
    }

    fn delete_by_tree_id(&self, tree_id: i64) -> StoreResult<usize> {
        let result = self.inner.delete_by_tree_id(tree_id);
        self.invalidate_for(Some(tree_id), &[]);
        result
    }

    fn find_tree_structure(&self, id: i64) -> StoreResult<Option<Tree>> {
        self.cached_tree(&structure_key(id), |inner| inner.find_tree_structure(id))
    }
}
