//! Public diff cursor.

use std::hash::Hash;

use forkmap_primitives::hash::KeyHasher;
use forkmap_primitives::{DiffEntry, StdKeyHasher};

use crate::delta::cursor::DeltaDiffCursor;
use crate::tree::cursor::TreeDiffCursor;

/// Lazy, finite, one-pass sequence of per-key differences between two
/// registered versions, in ascending key order (by the store's hasher).
///
/// Keys whose values are equal on both sides, including keys absent
/// (default-valued) on both, are omitted. Both backends produce
/// observationally identical sequences for equivalent version pairs.
pub struct DiffCursor<K, V, H = StdKeyHasher> {
    pub(crate) inner: DiffInner<K, V, H>,
}

pub(crate) enum DiffInner<K, V, H> {
    Tree(TreeDiffCursor<K, V, H>),
    Delta(DeltaDiffCursor<K, V>),
}

impl<K, V, H> std::fmt::Debug for DiffCursor<K, V, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flavor = match &self.inner {
            DiffInner::Tree(_) => "tree",
            DiffInner::Delta(_) => "delta",
        };
        f.debug_struct("DiffCursor")
            .field("flavor", &flavor)
            .finish_non_exhaustive()
    }
}

impl<K, V, H> Iterator for DiffCursor<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq,
    H: KeyHasher<K>,
{
    type Item = DiffEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            DiffInner::Tree(cursor) => cursor.next(),
            DiffInner::Delta(cursor) => cursor.next(),
        }
    }
}
