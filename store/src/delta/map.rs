//! Working copy for the delta backend.
//!
//! A [`DeltaMap`] materializes its current bindings in a plain hash map
//! and records uncommitted changes in first-touch order, collapsed per
//! key (the old value captured on first touch, the newest value updated
//! in place). Commit turns the collapsed changes into one transaction;
//! restore undoes the uncommitted changes and then walks the minimal
//! path between the base transaction and the target.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use forkmap_primitives::hash::KeyHasher;
use forkmap_primitives::{MapDelta, StoreResult, Version};

use super::{DeltaStore, TxId};

/// Uncommitted changes, collapsed per key.
struct UncommittedDeltas<K, V> {
    order: Vec<K>,
    changes: HashMap<K, (V, V)>,
}

impl<K, V> UncommittedDeltas<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq,
{
    fn new() -> Self {
        Self {
            order: Vec::new(),
            changes: HashMap::new(),
        }
    }

    fn record(&mut self, key: &K, old: &V, new: &V) {
        match self.changes.entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert((old.clone(), new.clone()));
                self.order.push(key.clone());
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().1 = new.clone();
            }
        }
    }

    /// Collapsed deltas in first-touch order; changes that ended back at
    /// their starting value are dropped.
    fn deltas(&self) -> Vec<MapDelta<K, V>> {
        self.order
            .iter()
            .filter_map(|key| {
                let (old, new) = &self.changes[key];
                (old != new).then(|| MapDelta::new(key.clone(), old.clone(), new.clone()))
            })
            .collect()
    }

    /// Put every touched key back to its first-touch value.
    fn undo(&self, state: &mut HashMap<K, V>, default: &V) {
        for key in self.order.iter().rev() {
            let (old, _) = &self.changes[key];
            if old == default {
                state.remove(key);
            } else {
                state.insert(key.clone(), old.clone());
            }
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.changes.clear();
    }
}

pub(crate) struct DeltaMap<K, V, H> {
    store: Arc<DeltaStore<K, V, H>>,
    /// Current bindings; default-valued keys are never stored.
    state: HashMap<K, V>,
    uncommitted: UncommittedDeltas<K, V>,
    /// Transaction this working copy is based on.
    parent: Option<TxId>,
    last_version: Option<Version>,
}

impl<K, V, H> DeltaMap<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq,
    H: KeyHasher<K>,
{
    /// Fresh working copy with empty content.
    pub(crate) fn new(store: Arc<DeltaStore<K, V, H>>) -> Self {
        Self {
            store,
            state: HashMap::new(),
            uncommitted: UncommittedDeltas::new(),
            parent: None,
            last_version: None,
        }
    }

    pub(crate) fn default_value(&self) -> &V {
        self.store.default_value()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.len()
    }

    pub(crate) fn version(&self) -> Option<Version> {
        self.last_version
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.state.get(key)
    }

    /// Bind `key` to `value` (`None` = the default value). Returns the
    /// displaced non-default value, if any.
    pub(crate) fn put(&mut self, key: K, value: Option<V>) -> Option<V> {
        let old = self.state.get(&key).cloned();
        if old.as_ref() == value.as_ref() {
            return old;
        }
        let default = self.store.default_value();
        let old_value = old.clone().unwrap_or_else(|| default.clone());
        let new_value = value.clone().unwrap_or_else(|| default.clone());
        match value {
            Some(value) => {
                self.state.insert(key.clone(), value);
            }
            None => {
                self.state.remove(&key);
            }
        }
        self.uncommitted.record(&key, &old_value, &new_value);
        old
    }

    /// Register the collapsed uncommitted changes as the next version.
    pub(crate) fn commit(&mut self) -> StoreResult<Version> {
        let deltas = self.uncommitted.deltas();
        let (version, tx) = self.store.append_transaction(deltas, self.parent)?;
        self.uncommitted.clear();
        self.parent = tx;
        self.last_version = Some(version);
        Ok(version)
    }

    /// Discard uncommitted changes and move to the snapshot at `version`
    /// along the minimal path through the version tree.
    pub(crate) fn restore(&mut self, version: Version) -> StoreResult<()> {
        let target = self.store.resolve(version)?;
        let default = self.store.default_value().clone();

        self.uncommitted.undo(&mut self.state, &default);
        self.uncommitted.clear();

        // A fresh working copy replays the target's full chain; otherwise
        // only the minimal path between the two transactions is walked.
        let (backward, forward) = if self.parent.is_none() {
            (Vec::new(), self.store.path_to(target))
        } else {
            self.store.path_between(self.parent, target)
        };
        for deltas in &backward {
            for delta in deltas.iter().rev() {
                apply(&mut self.state, &default, &delta.key, &delta.old_value);
            }
        }
        for deltas in forward.iter().rev() {
            for delta in deltas.iter() {
                apply(&mut self.state, &default, &delta.key, &delta.new_value);
            }
        }

        self.parent = target;
        self.last_version = Some(version);
        Ok(())
    }
}

fn apply<K, V>(state: &mut HashMap<K, V>, default: &V, key: &K, value: &V)
where
    K: Clone + Eq + Hash,
    V: Clone + Eq,
{
    if value == default {
        state.remove(key);
    } else {
        state.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forkmap_primitives::StdKeyHasher;

    fn store() -> Arc<DeltaStore<String, i32, StdKeyHasher>> {
        Arc::new(DeltaStore::new(Arc::new(StdKeyHasher), 0))
    }

    fn map_at(
        store: &Arc<DeltaStore<String, i32, StdKeyHasher>>,
        version: Version,
    ) -> DeltaMap<String, i32, StdKeyHasher> {
        let mut map = DeltaMap::new(Arc::clone(store));
        map.restore(version).unwrap();
        map
    }

    #[test]
    fn test_put_get_roundtrip() {
        let mut map = DeltaMap::new(store());
        assert_eq!(map.put("a".to_string(), Some(1)), None);
        assert_eq!(map.get(&"a".to_string()), Some(&1));
        assert_eq!(map.put("a".to_string(), Some(2)), Some(1));
        assert_eq!(map.put("a".to_string(), None), Some(2));
        assert_eq!(map.get(&"a".to_string()), None);
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_commit_collapses_intermediate_values() {
        let store = store();
        let mut map = DeltaMap::new(Arc::clone(&store));
        map.put("a".to_string(), Some(1));
        map.put("a".to_string(), Some(2));
        map.put("a".to_string(), Some(3));
        let v0 = map.commit().unwrap();

        let tx = store.resolve(v0).unwrap();
        let path = store.path_to(tx);
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].len(), 1);
        assert_eq!(path[0][0], MapDelta::new("a".to_string(), 0, 3));
    }

    #[test]
    fn test_commit_drops_net_noop_changes() {
        let store = store();
        let mut map = DeltaMap::new(Arc::clone(&store));
        map.put("a".to_string(), Some(1));
        let v0 = map.commit().unwrap();

        map.put("a".to_string(), Some(5));
        map.put("a".to_string(), Some(1));
        let v1 = map.commit().unwrap();

        // Nothing net-changed, so v1 aliases v0's transaction.
        assert_eq!(store.resolve(v1).unwrap(), store.resolve(v0).unwrap());
    }

    #[test]
    fn test_reload_replays_full_path() {
        let store = store();
        let mut map = DeltaMap::new(Arc::clone(&store));
        map.put("a".to_string(), Some(1));
        map.commit().unwrap();
        map.put("b".to_string(), Some(2));
        let v1 = map.commit().unwrap();

        let reloaded = map_at(&store, v1);
        assert_eq!(reloaded.get(&"a".to_string()), Some(&1));
        assert_eq!(reloaded.get(&"b".to_string()), Some(&2));
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_restore_undoes_uncommitted_changes() {
        let store = store();
        let mut map = DeltaMap::new(Arc::clone(&store));
        map.put("a".to_string(), Some(1));
        let v0 = map.commit().unwrap();

        map.put("a".to_string(), Some(9));
        map.put("b".to_string(), Some(2));
        map.restore(v0).unwrap();
        assert_eq!(map.get(&"a".to_string()), Some(&1));
        assert_eq!(map.get(&"b".to_string()), None);
        assert_eq!(map.version(), Some(v0));
    }

    #[test]
    fn test_restore_crosses_branches() {
        let store = store();
        let mut map = DeltaMap::new(Arc::clone(&store));
        map.put("a".to_string(), Some(1));
        let v0 = map.commit().unwrap();

        let mut fork_a = map_at(&store, v0);
        fork_a.put("a".to_string(), Some(2));
        fork_a.put("x".to_string(), Some(10));
        let va = fork_a.commit().unwrap();

        let mut fork_b = map_at(&store, v0);
        fork_b.put("a".to_string(), Some(3));
        fork_b.put("y".to_string(), Some(20));
        let vb = fork_b.commit().unwrap();

        // Jump fork_a's working copy across to the sibling branch.
        fork_a.restore(vb).unwrap();
        assert_eq!(fork_a.get(&"a".to_string()), Some(&3));
        assert_eq!(fork_a.get(&"x".to_string()), None);
        assert_eq!(fork_a.get(&"y".to_string()), Some(&20));

        // And back again.
        fork_a.restore(va).unwrap();
        assert_eq!(fork_a.get(&"a".to_string()), Some(&2));
        assert_eq!(fork_a.get(&"x".to_string()), Some(&10));
        assert_eq!(fork_a.get(&"y".to_string()), None);
    }

    #[test]
    fn test_restore_to_empty_root_version() {
        let store = store();
        let mut map = DeltaMap::new(Arc::clone(&store));
        let v0 = map.commit().unwrap();
        map.put("a".to_string(), Some(1));
        let v1 = map.commit().unwrap();

        map.restore(v0).unwrap();
        assert_eq!(map.len(), 0);
        map.restore(v1).unwrap();
        assert_eq!(map.get(&"a".to_string()), Some(&1));
    }
}
