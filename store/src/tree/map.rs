//! Working copy for the tree backend.
//!
//! A [`TreeMap`] binds one caller to one store. Its root starts as a
//! read-only reference to committed structure (or nothing); the first
//! mutation splits it into a private mutable tree, copy-on-write along
//! each mutation path. Commit freezes the tree through the store's node
//! cache and registers it; with `publish_on_commit` the frozen root
//! immediately replaces the private one so later reads share structure.

use std::hash::Hash;
use std::sync::Arc;

use forkmap_primitives::hash::KeyHasher;
use forkmap_primitives::{StoreResult, Version};

use super::immutable::ImmutableNode;
use super::node::MutableNode;
use super::TreeStore;

enum WorkingRoot<K, V> {
    /// Shared committed structure (`None` = empty), read-only until the
    /// first mutation.
    Frozen(Option<Arc<ImmutableNode<K, V>>>),
    /// Private tree owned by this working copy.
    Mutable(Box<MutableNode<K, V>>),
}

pub(crate) struct TreeMap<K, V, H> {
    store: Arc<TreeStore<K, V, H>>,
    root: WorkingRoot<K, V>,
    len: usize,
    last_version: Option<Version>,
}

impl<K, V, H> TreeMap<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
    H: KeyHasher<K>,
{
    /// Fresh working copy with empty content.
    pub(crate) fn new(store: Arc<TreeStore<K, V, H>>) -> Self {
        Self {
            store,
            root: WorkingRoot::Frozen(None),
            len: 0,
            last_version: None,
        }
    }

    /// Working copy positioned at a registered version.
    pub(crate) fn at_version(
        store: Arc<TreeStore<K, V, H>>,
        version: Version,
    ) -> StoreResult<Self> {
        let root = store.revert(version)?;
        Ok(Self {
            len: root.as_ref().map_or(0, |node| node.size()),
            root: WorkingRoot::Frozen(root),
            last_version: Some(version),
            store,
        })
    }

    pub(crate) fn default_value(&self) -> &V {
        self.store.default_value()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn version(&self) -> Option<Version> {
        self.last_version
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        let hasher = self.store.hasher();
        match &self.root {
            WorkingRoot::Frozen(root) => root.as_ref().and_then(|node| node.get(hasher, key, 0)),
            WorkingRoot::Mutable(node) => node.get(hasher, key, 0),
        }
    }

    /// Bind `key` to `value` (`None` = the default value). Returns the
    /// displaced non-default value, if any.
    pub(crate) fn put(&mut self, key: K, value: Option<V>) -> Option<V> {
        let inserting = value.is_some();
        let old = match &mut self.root {
            WorkingRoot::Mutable(node) => node.put(self.store.hasher(), key, value, 0),
            WorkingRoot::Frozen(root) => {
                let existing = root
                    .as_ref()
                    .and_then(|node| node.get(self.store.hasher(), &key, 0));
                if existing == value.as_ref() {
                    // Nothing changes; keep sharing the committed root.
                    return value;
                }
                let mut node = match root.take() {
                    Some(frozen) => MutableNode::from_immutable(&frozen),
                    None => MutableNode::new(),
                };
                let old = node.put(self.store.hasher(), key, value, 0);
                self.root = WorkingRoot::Mutable(Box::new(node));
                old
            }
        };
        match (old.is_some(), inserting) {
            (false, true) => self.len += 1,
            (true, false) => self.len -= 1,
            _ => {}
        }
        old
    }

    /// Freeze and register the current content as the next version.
    pub(crate) fn commit(&mut self) -> StoreResult<Version> {
        let frozen = match &self.root {
            WorkingRoot::Frozen(root) => root.clone(),
            WorkingRoot::Mutable(node) => {
                (!node.is_empty()).then(|| node.freeze(self.store.cache()))
            }
        };
        let version = self.store.register(frozen.clone())?;
        if self.store.publish_on_commit() {
            self.root = WorkingRoot::Frozen(frozen);
        }
        self.last_version = Some(version);
        Ok(version)
    }

    /// Discard the working state and adopt the snapshot at `version`.
    pub(crate) fn restore(&mut self, version: Version) -> StoreResult<()> {
        let root = self.store.revert(version)?;
        self.len = root.as_ref().map_or(0, |node| node.size());
        self.root = WorkingRoot::Frozen(root);
        self.last_version = Some(version);
        Ok(())
    }
}
