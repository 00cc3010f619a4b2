//! Caller-facing store handle.
//!
//! A [`VersionedMapStore`] owns one version history. The handle is
//! cheaply cloneable (clones share the same registry, version counter,
//! and, for the tree backend, node cache), so independent threads can each hold
//! one and fork working copies from it concurrently.

use std::collections::BTreeSet;
use std::hash::Hash;
use std::sync::Arc;

use forkmap_primitives::hash::KeyHasher;
use forkmap_primitives::{BackendKind, StdKeyHasher, StoreConfig, StoreResult, Version};

use crate::delta::map::DeltaMap;
use crate::delta::DeltaStore;
use crate::diff::{DiffCursor, DiffInner};
use crate::map::{MapInner, VersionedMap};
use crate::tree::immutable::NodeCache;
use crate::tree::map::TreeMap;
use crate::tree::TreeStore;

pub(crate) enum StoreInner<K, V, H> {
    Tree(Arc<TreeStore<K, V, H>>),
    Delta(Arc<DeltaStore<K, V, H>>),
}

/// Versioned key-value store: fork working copies, commit them as
/// monotonically numbered versions, restore or diff any two versions.
///
/// Keys and values are opaque to the store; absence is expressed through
/// the designated default value, never through tombstones.
pub struct VersionedMapStore<K, V, H = StdKeyHasher> {
    inner: StoreInner<K, V, H>,
}

impl<K, V, H> Clone for VersionedMapStore<K, V, H> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            StoreInner::Tree(store) => StoreInner::Tree(Arc::clone(store)),
            StoreInner::Delta(store) => StoreInner::Delta(Arc::clone(store)),
        };
        Self { inner }
    }
}

impl<K, V, H> std::fmt::Debug for VersionedMapStore<K, V, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.inner {
            StoreInner::Tree(_) => BackendKind::Tree,
            StoreInner::Delta(_) => BackendKind::Delta,
        };
        f.debug_struct("VersionedMapStore")
            .field("backend", &backend)
            .finish_non_exhaustive()
    }
}

impl<K, V, H> VersionedMapStore<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
    H: KeyHasher<K>,
{
    /// Store with the given default value and configuration, using the
    /// hasher's `Default` instance.
    pub fn new(default_value: V, config: StoreConfig) -> Self
    where
        H: Default,
    {
        Self::with_hasher(H::default(), default_value, config)
    }

    /// Store with an explicit key hasher.
    pub fn with_hasher(hasher: H, default_value: V, config: StoreConfig) -> Self {
        let hasher = Arc::new(hasher);
        match config.backend {
            BackendKind::Tree => {
                let cache = config
                    .shared_node_cache_in_store
                    .then(|| Arc::new(NodeCache::new()));
                Self::tree(hasher, default_value, config.publish_on_commit, cache)
            }
            BackendKind::Delta => Self::delta(hasher, default_value),
        }
    }

    /// Batch of sibling stores over the same key/value domain.
    ///
    /// With the tree backend and `shared_node_cache_in_store` enabled,
    /// all stores in the group intern nodes through one cache (and its
    /// one lock), deduplicating structure across independently explored
    /// forks of the same base dataset.
    pub fn group(count: usize, hasher: H, default_value: V, config: StoreConfig) -> Vec<Self> {
        let hasher = Arc::new(hasher);
        match config.backend {
            BackendKind::Tree => {
                let cache = config
                    .shared_node_cache_in_store
                    .then(|| Arc::new(NodeCache::new()));
                (0..count)
                    .map(|_| {
                        Self::tree(
                            Arc::clone(&hasher),
                            default_value.clone(),
                            config.publish_on_commit,
                            cache.clone(),
                        )
                    })
                    .collect()
            }
            BackendKind::Delta => (0..count)
                .map(|_| Self::delta(Arc::clone(&hasher), default_value.clone()))
                .collect(),
        }
    }

    fn tree(
        hasher: Arc<H>,
        default_value: V,
        publish_on_commit: bool,
        cache: Option<Arc<NodeCache<K, V>>>,
    ) -> Self {
        Self {
            inner: StoreInner::Tree(Arc::new(TreeStore::new(
                hasher,
                default_value,
                publish_on_commit,
                cache,
            ))),
        }
    }

    fn delta(hasher: Arc<H>, default_value: V) -> Self {
        Self {
            inner: StoreInner::Delta(Arc::new(DeltaStore::new(hasher, default_value))),
        }
    }

    /// Which backend this store runs on.
    pub fn backend(&self) -> BackendKind {
        match &self.inner {
            StoreInner::Tree(_) => BackendKind::Tree,
            StoreInner::Delta(_) => BackendKind::Delta,
        }
    }

    /// The store's designated default value.
    pub fn default_value(&self) -> &V {
        match &self.inner {
            StoreInner::Tree(store) => store.default_value(),
            StoreInner::Delta(store) => store.default_value(),
        }
    }

    /// Fresh working copy with empty content.
    pub fn create_map(&self) -> VersionedMap<K, V, H> {
        let inner = match &self.inner {
            StoreInner::Tree(store) => MapInner::Tree(TreeMap::new(Arc::clone(store))),
            StoreInner::Delta(store) => MapInner::Delta(DeltaMap::new(Arc::clone(store))),
        };
        VersionedMap::from_inner(inner)
    }

    /// Working copy positioned at a registered version.
    pub fn create_map_at(&self, version: Version) -> StoreResult<VersionedMap<K, V, H>> {
        let inner = match &self.inner {
            StoreInner::Tree(store) => {
                MapInner::Tree(TreeMap::at_version(Arc::clone(store), version)?)
            }
            StoreInner::Delta(store) => {
                let mut map = DeltaMap::new(Arc::clone(store));
                map.restore(version)?;
                MapInner::Delta(map)
            }
        };
        Ok(VersionedMap::from_inner(inner))
    }

    /// All versions registered so far, ascending.
    ///
    /// A version appears here only after the `commit` that registered it
    /// has returned.
    pub fn states(&self) -> BTreeSet<Version> {
        match &self.inner {
            StoreInner::Tree(store) => store.states(),
            StoreInner::Delta(store) => store.states(),
        }
    }

    /// Ordered sequence of per-key differences between two registered
    /// versions.
    pub fn diff_cursor(&self, from: Version, to: Version) -> StoreResult<DiffCursor<K, V, H>> {
        let inner = match &self.inner {
            StoreInner::Tree(store) => DiffInner::Tree(store.diff_cursor(from, to)?),
            StoreInner::Delta(store) => DiffInner::Delta(store.diff_cursor(from, to)?),
        };
        Ok(DiffCursor { inner })
    }
}
