//! Caller-facing working copy.
//!
//! A [`VersionedMap`] is a single-writer handle bound to one store:
//! mutate it freely, `commit` to register the content as a new version,
//! `restore` to adopt any registered version. Discarding a working copy
//! that was never committed leaves no trace in the store.

use std::fmt;
use std::hash::Hash;

use forkmap_primitives::hash::KeyHasher;
use forkmap_primitives::{StdKeyHasher, StoreResult, Version};

use crate::delta::map::DeltaMap;
use crate::tree::map::TreeMap;

/// Callback invoked on each effective binding change: `true` when a
/// binding comes into existence (default → non-default), `false` when
/// one disappears. Replacing one non-default value with another fires
/// removal then insertion.
pub type ChangeListener<K> = Box<dyn FnMut(&K, bool) + Send>;

pub(crate) enum MapInner<K, V, H> {
    Tree(TreeMap<K, V, H>),
    Delta(DeltaMap<K, V, H>),
}

/// Mutable working copy of a versioned map.
///
/// Owned exclusively by one caller; no internal locking on the mutation
/// path. The shared store is only touched by `commit` and `restore`.
pub struct VersionedMap<K, V, H = StdKeyHasher> {
    inner: MapInner<K, V, H>,
    listener: Option<ChangeListener<K>>,
}

impl<K, V, H> VersionedMap<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
    H: KeyHasher<K>,
{
    pub(crate) fn from_inner(inner: MapInner<K, V, H>) -> Self {
        Self {
            inner,
            listener: None,
        }
    }

    /// The store's designated default value: the implicit content of
    /// every key never explicitly set.
    pub fn default_value(&self) -> &V {
        match &self.inner {
            MapInner::Tree(map) => map.default_value(),
            MapInner::Delta(map) => map.default_value(),
        }
    }

    /// Value bound to `key`, or the default value if none is.
    pub fn get(&self, key: &K) -> V {
        let found = match &self.inner {
            MapInner::Tree(map) => map.get(key),
            MapInner::Delta(map) => map.get(key),
        };
        found.cloned().unwrap_or_else(|| self.default_value().clone())
    }

    /// Bind `key` to `value`, returning the previous value. Writing the
    /// default value removes the binding.
    ///
    /// Registered listeners are notified of the effective transition
    /// before the change is committed to any version.
    pub fn put(&mut self, key: K, value: V) -> V {
        let default = self.default_value().clone();
        let new_is_default = value == default;
        let stored = (!new_is_default).then(|| value.clone());
        let listener_key = self.listener.is_some().then(|| key.clone());

        let old = match &mut self.inner {
            MapInner::Tree(map) => map.put(key, stored),
            MapInner::Delta(map) => map.put(key, stored),
        };

        let old_is_default = old.is_none();
        let old_value = old.unwrap_or(default);
        if let (Some(listener), Some(key)) = (self.listener.as_mut(), listener_key) {
            if old_value != value {
                if !old_is_default {
                    listener(&key, false);
                }
                if !new_is_default {
                    listener(&key, true);
                }
            }
        }
        old_value
    }

    /// Number of non-default bindings.
    pub fn len(&self) -> usize {
        match &self.inner {
            MapInner::Tree(map) => map.len(),
            MapInner::Delta(map) => map.len(),
        }
    }

    /// Whether every key reads as the default value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The version last committed or restored through this working copy,
    /// if any.
    pub fn version(&self) -> Option<Version> {
        match &self.inner {
            MapInner::Tree(map) => map.version(),
            MapInner::Delta(map) => map.version(),
        }
    }

    /// Register the current content as the next version of the store.
    pub fn commit(&mut self) -> StoreResult<Version> {
        match &mut self.inner {
            MapInner::Tree(map) => map.commit(),
            MapInner::Delta(map) => map.commit(),
        }
    }

    /// Discard the working state and adopt the snapshot at `version`.
    pub fn restore(&mut self, version: Version) -> StoreResult<()> {
        match &mut self.inner {
            MapInner::Tree(map) => map.restore(version),
            MapInner::Delta(map) => map.restore(version),
        }
    }

    /// Register a change listener. Listeners observe `put` transitions
    /// only; `restore` replaces state wholesale without notifications.
    pub fn set_listener(&mut self, listener: impl FnMut(&K, bool) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Remove the registered change listener, if any.
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }
}

impl<K, V, H> fmt::Debug for VersionedMap<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash + fmt::Debug,
    H: KeyHasher<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedMap")
            .field("len", &self.len())
            .field("version", &self.version())
            .field("default_value", self.default_value())
            .finish_non_exhaustive()
    }
}
