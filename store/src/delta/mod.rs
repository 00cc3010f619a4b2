//! Delta/transaction-log backend.
//!
//! Each committed version is an ordered list of `(key, old, new)` changes
//! linked to a parent version, forming a version tree (backtracking forks
//! share ancestors). Transactions live in an arena indexed by integer
//! ids (parent links are indices, not owning references) and the
//! registry maps version numbers onto arena entries. A version committed
//! with zero changes aliases its parent's transaction.

pub(crate) mod cursor;
pub(crate) mod map;

use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hash;
use std::sync::Arc;

use forkmap_primitives::hash::KeyHasher;
use forkmap_primitives::{MapDelta, StoreError, StoreResult, Version};
use parking_lot::Mutex;

use self::cursor::DeltaDiffCursor;

/// Arena index of one transaction record.
pub(crate) type TxId = usize;

struct TransactionRecord<K, V> {
    version: Version,
    parent: Option<TxId>,
    deltas: Arc<[MapDelta<K, V>]>,
}

/// Shared store state for the delta backend.
pub(crate) struct DeltaStore<K, V, H> {
    hasher: Arc<H>,
    default_value: V,
    inner: Mutex<DeltaRegistry<K, V>>,
}

struct DeltaRegistry<K, V> {
    arena: Vec<TransactionRecord<K, V>>,
    /// Version → transaction (`None` = the empty root state).
    states: BTreeMap<Version, Option<TxId>>,
    next_version: Version,
}

impl<K, V, H> DeltaStore<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq,
    H: KeyHasher<K>,
{
    pub(crate) fn new(hasher: Arc<H>, default_value: V) -> Self {
        Self {
            hasher,
            default_value,
            inner: Mutex::new(DeltaRegistry {
                arena: Vec::new(),
                states: BTreeMap::new(),
                next_version: 0,
            }),
        }
    }

    pub(crate) fn default_value(&self) -> &V {
        &self.default_value
    }

    /// Allocate the next version number and register `deltas` linked to
    /// `parent`. An empty delta list registers the new version as an
    /// alias of `parent`'s transaction without allocating a record.
    pub(crate) fn append_transaction(
        &self,
        deltas: Vec<MapDelta<K, V>>,
        parent: Option<TxId>,
    ) -> StoreResult<(Version, Option<TxId>)> {
        let mut inner = self.inner.lock();
        if inner.next_version == Version::MAX {
            return Err(StoreError::VersionsExhausted);
        }
        let version = inner.next_version;
        inner.next_version += 1;
        let tx = if deltas.is_empty() {
            parent
        } else {
            let id = inner.arena.len();
            inner.arena.push(TransactionRecord {
                version,
                parent,
                deltas: deltas.into(),
            });
            Some(id)
        };
        inner.states.insert(version, tx);
        log::debug!("delta store registered version {version}");
        Ok((version, tx))
    }

    /// The transaction registered at `version`.
    pub(crate) fn resolve(&self, version: Version) -> StoreResult<Option<TxId>> {
        let inner = self.inner.lock();
        match inner.states.get(&version) {
            Some(tx) => Ok(*tx),
            None => Err(StoreError::unknown_version(
                version,
                inner.states.keys().copied(),
            )),
        }
    }

    /// Delta lists from `to`'s transaction back to the root, child first.
    pub(crate) fn path_to(&self, to: Option<TxId>) -> Vec<Arc<[MapDelta<K, V>]>> {
        let inner = self.inner.lock();
        let mut lists = Vec::new();
        let mut cursor = to;
        while let Some(id) = cursor {
            let record = &inner.arena[id];
            lists.push(Arc::clone(&record.deltas));
            cursor = record.parent;
        }
        lists
    }

    /// Minimal edit path between two transactions: delta lists from
    /// `from` down to the nearest common ancestor (`backward`, child
    /// first) and from `to` down to the same ancestor (`forward`, child
    /// first). Runs in time proportional to the edit distance.
    pub(crate) fn path_between(
        &self,
        from: Option<TxId>,
        to: Option<TxId>,
    ) -> (Vec<Arc<[MapDelta<K, V>]>>, Vec<Arc<[MapDelta<K, V>]>>) {
        let inner = self.inner.lock();
        let mut backward = Vec::new();
        let mut forward = Vec::new();
        let mut from_cursor = from;
        let mut to_cursor = to;
        while from_cursor != to_cursor {
            // Versions strictly decrease toward the root, so stepping the
            // pointer with the larger version can never pass the common
            // ancestor.
            let advance_to = match (from_cursor, to_cursor) {
                (None, Some(_)) => true,
                (Some(_), None) => false,
                (Some(f), Some(t)) => inner.arena[f].version < inner.arena[t].version,
                (None, None) => unreachable!("loop guard excludes equal cursors"),
            };
            if advance_to {
                let record = &inner.arena[to_cursor.expect("advancing existing pointer")];
                forward.push(Arc::clone(&record.deltas));
                to_cursor = record.parent;
            } else {
                let record = &inner.arena[from_cursor.expect("advancing existing pointer")];
                backward.push(Arc::clone(&record.deltas));
                from_cursor = record.parent;
            }
        }
        (backward, forward)
    }

    pub(crate) fn states(&self) -> BTreeSet<Version> {
        self.inner.lock().states.keys().copied().collect()
    }

    pub(crate) fn diff_cursor(
        &self,
        from: Version,
        to: Version,
    ) -> StoreResult<DeltaDiffCursor<K, V>> {
        let from_tx = self.resolve(from)?;
        let to_tx = self.resolve(to)?;
        let (backward, forward) = self.path_between(from_tx, to_tx);
        Ok(DeltaDiffCursor::new(self.hasher.as_ref(), backward, forward))
    }
}
