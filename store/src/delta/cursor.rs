//! Diff cursor for the delta backend.
//!
//! The backward and forward delta lists produced by `path_between` are
//! composed at construction: conceptually the `from` branch is undone
//! down to the common ancestor (each delta replayed new → old, newest
//! transaction first) and the `to` branch replayed up from it. Per key,
//! the first value seen is the value at `from` and the last value
//! written is the value at `to`; intermediate values collapse away. The
//! composition is bounded by the edit distance between the two versions,
//! never by the dataset size.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use forkmap_primitives::hash::{compare_keys, KeyHasher};
use forkmap_primitives::{DiffEntry, MapDelta};

/// Ordered sequence of per-key differences between two versions of a
/// delta store.
pub(crate) struct DeltaDiffCursor<K, V> {
    entries: std::vec::IntoIter<DiffEntry<K, V>>,
}

impl<K, V> DeltaDiffCursor<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq,
{
    pub(crate) fn new<H>(
        hasher: &H,
        backward: Vec<Arc<[MapDelta<K, V>]>>,
        forward: Vec<Arc<[MapDelta<K, V>]>>,
    ) -> Self
    where
        H: KeyHasher<K>,
    {
        let mut composed: HashMap<K, (V, V)> = HashMap::new();
        let mut step = |key: &K, before: &V, after: &V| match composed.entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert((before.clone(), after.clone()));
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().1 = after.clone();
            }
        };

        // Undo the `from` branch down to the common ancestor.
        for deltas in &backward {
            for delta in deltas.iter().rev() {
                step(&delta.key, &delta.new_value, &delta.old_value);
            }
        }
        // Replay the `to` branch up from the ancestor.
        for deltas in forward.iter().rev() {
            for delta in deltas.iter() {
                step(&delta.key, &delta.old_value, &delta.new_value);
            }
        }

        let mut entries: Vec<DiffEntry<K, V>> = composed
            .into_iter()
            .filter(|(_, (from, to))| from != to)
            .map(|(key, (from, to))| DiffEntry::new(key, from, to))
            .collect();
        entries.sort_by(|a, b| compare_keys(hasher, &a.key, &b.key));
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl<K, V> Iterator for DeltaDiffCursor<K, V> {
    type Item = DiffEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}
