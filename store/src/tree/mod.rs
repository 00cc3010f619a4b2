//! Structural-sharing tree backend.
//!
//! Committed versions are immutable trees interned through a node cache,
//! so sibling versions share every subtree they agree on. The store owns
//! the version registry and the monotonic version counter; working-copy
//! state lives in [`map::TreeMap`].

pub(crate) mod cursor;
pub(crate) mod immutable;
pub(crate) mod map;
pub(crate) mod node;

use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hash;
use std::sync::Arc;

use forkmap_primitives::hash::KeyHasher;
use forkmap_primitives::{StoreError, StoreResult, Version};
use parking_lot::Mutex;

use self::cursor::TreeDiffCursor;
use self::immutable::{ImmutableNode, NodeCache};

/// Shared store state for the tree backend.
///
/// The registry and version counter are guarded by one mutex; the node
/// cache carries its own (possibly group-shared) lock. Registered roots
/// are immutable and readable without locking once handed out.
pub(crate) struct TreeStore<K, V, H> {
    hasher: Arc<H>,
    default_value: V,
    publish_on_commit: bool,
    cache: Option<Arc<NodeCache<K, V>>>,
    registry: Mutex<TreeRegistry<K, V>>,
}

struct TreeRegistry<K, V> {
    /// Version → committed root (`None` for an empty snapshot).
    states: BTreeMap<Version, Option<Arc<ImmutableNode<K, V>>>>,
    next_version: Version,
}

impl<K, V, H> TreeStore<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
    H: KeyHasher<K>,
{
    pub(crate) fn new(
        hasher: Arc<H>,
        default_value: V,
        publish_on_commit: bool,
        cache: Option<Arc<NodeCache<K, V>>>,
    ) -> Self {
        Self {
            hasher,
            default_value,
            publish_on_commit,
            cache,
            registry: Mutex::new(TreeRegistry {
                states: BTreeMap::new(),
                next_version: 0,
            }),
        }
    }

    pub(crate) fn hasher(&self) -> &H {
        &self.hasher
    }

    pub(crate) fn default_value(&self) -> &V {
        &self.default_value
    }

    pub(crate) fn publish_on_commit(&self) -> bool {
        self.publish_on_commit
    }

    pub(crate) fn cache(&self) -> Option<&NodeCache<K, V>> {
        self.cache.as_deref()
    }

    /// Register `root` under the next version number.
    pub(crate) fn register(&self, root: Option<Arc<ImmutableNode<K, V>>>) -> StoreResult<Version> {
        let mut registry = self.registry.lock();
        if registry.next_version == Version::MAX {
            return Err(StoreError::VersionsExhausted);
        }
        let version = registry.next_version;
        registry.next_version += 1;
        registry.states.insert(version, root);
        log::debug!("tree store registered version {version}");
        Ok(version)
    }

    /// The root registered at `version`.
    pub(crate) fn revert(&self, version: Version) -> StoreResult<Option<Arc<ImmutableNode<K, V>>>> {
        let registry = self.registry.lock();
        match registry.states.get(&version) {
            Some(root) => Ok(root.clone()),
            None => Err(StoreError::unknown_version(
                version,
                registry.states.keys().copied(),
            )),
        }
    }

    pub(crate) fn states(&self) -> BTreeSet<Version> {
        self.registry.lock().states.keys().copied().collect()
    }

    pub(crate) fn diff_cursor(
        &self,
        from: Version,
        to: Version,
    ) -> StoreResult<TreeDiffCursor<K, V, H>> {
        let from_root = self.revert(from)?;
        let to_root = self.revert(to)?;
        Ok(TreeDiffCursor::new(
            Arc::clone(&self.hasher),
            self.default_value.clone(),
            from_root,
            to_root,
        ))
    }
}
