//! Frozen tree nodes and the hash-consing node cache.
//!
//! An [`ImmutableNode`] is the shareable form of a working node: a
//! bitmap-compressed node holding entries and child pointers packed by
//! ascending slot index, with a structural hash computed once at freeze
//! time. Nodes interned through a [`NodeCache`] are canonical (two
//! structurally equal nodes are the same allocation), which bounds the
//! incremental memory cost of a commit to the path of changed nodes.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use forkmap_primitives::hash::{branch_index, KeyHasher};
use parking_lot::Mutex;

/// Frozen, shareable tree node.
///
/// `data_map` marks slots holding entries, `node_map` slots holding
/// children; the two are disjoint. Entries and children are packed in
/// ascending slot order. Reachable from any number of registered
/// versions and parent nodes; never mutated after construction.
#[derive(Debug)]
pub(crate) struct ImmutableNode<K, V> {
    data_map: u32,
    node_map: u32,
    entries: Box<[(K, V)]>,
    children: Box<[Arc<ImmutableNode<K, V>>]>,
    structural_hash: u64,
    size: usize,
}

/// Borrowed view of one node slot.
pub(crate) enum SlotView<'a, K, V> {
    Entry(&'a K, &'a V),
    Child(&'a Arc<ImmutableNode<K, V>>),
}

#[inline]
fn rank(map: u32, bit: u32) -> usize {
    (map & (bit - 1)).count_ones() as usize
}

impl<K, V> ImmutableNode<K, V>
where
    K: Hash,
    V: Hash,
{
    /// Build a node from packed parts, computing its structural hash and
    /// subtree size. `entries` and `children` must be packed in ascending
    /// slot order of their bitmaps.
    pub(crate) fn new(
        data_map: u32,
        node_map: u32,
        entries: Vec<(K, V)>,
        children: Vec<Arc<ImmutableNode<K, V>>>,
    ) -> Self {
        debug_assert_eq!(data_map & node_map, 0);
        debug_assert_eq!(data_map.count_ones() as usize, entries.len());
        debug_assert_eq!(node_map.count_ones() as usize, children.len());

        let mut hasher = DefaultHasher::new();
        data_map.hash(&mut hasher);
        node_map.hash(&mut hasher);
        for (key, value) in &entries {
            key.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        for child in &children {
            child.structural_hash.hash(&mut hasher);
        }
        let structural_hash = hasher.finish();
        let size = entries.len() + children.iter().map(|c| c.size).sum::<usize>();

        Self {
            data_map,
            node_map,
            entries: entries.into_boxed_slice(),
            children: children.into_boxed_slice(),
            structural_hash,
            size,
        }
    }
}

impl<K, V> ImmutableNode<K, V> {
    /// Number of bindings in this subtree.
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Content of `slot`, if any.
    pub(crate) fn slot(&self, slot: u32) -> Option<SlotView<'_, K, V>> {
        let bit = 1u32 << slot;
        if self.data_map & bit != 0 {
            let (key, value) = &self.entries[rank(self.data_map, bit)];
            Some(SlotView::Entry(key, value))
        } else if self.node_map & bit != 0 {
            Some(SlotView::Child(&self.children[rank(self.node_map, bit)]))
        } else {
            None
        }
    }

    /// Look up `key` in the subtree rooted here, descending from `depth`.
    pub(crate) fn get<H>(&self, hasher: &H, key: &K, depth: u32) -> Option<&V>
    where
        K: Eq,
        H: KeyHasher<K>,
    {
        let slot = branch_index(hasher, key, depth) as u32;
        match self.slot(slot) {
            Some(SlotView::Entry(k, v)) => (k == key).then_some(v),
            Some(SlotView::Child(child)) => child.get(hasher, key, depth + 1),
            None => None,
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for ImmutableNode<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.structural_hash == other.structural_hash
            && self.data_map == other.data_map
            && self.node_map == other.node_map
            && self.entries == other.entries
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b) || a == b)
    }
}

impl<K: Eq, V: Eq> Eq for ImmutableNode<K, V> {}

impl<K, V> Hash for ImmutableNode<K, V> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        state.write_u64(self.structural_hash);
    }
}

/// Interning table mapping structural node content to its canonical
/// instance.
///
/// May be private to one store or shared by a group of sibling stores;
/// either way all insertions serialize through the one lock here, which
/// is what keeps the canonical-instance invariant. Grows monotonically;
/// eviction is an explicit non-goal.
#[derive(Debug)]
pub(crate) struct NodeCache<K, V> {
    nodes: Mutex<HashSet<Arc<ImmutableNode<K, V>>>>,
}

impl<K, V> NodeCache<K, V>
where
    K: Eq + Hash,
    V: Eq + Hash,
{
    pub(crate) fn new() -> Self {
        Self {
            nodes: Mutex::new(HashSet::new()),
        }
    }

    /// Insert-or-get the canonical instance for `candidate`.
    ///
    /// `candidate`'s children must already be canonical (bottom-up
    /// freezing guarantees this), so the structural comparison against a
    /// cached node is shallow in practice.
    pub(crate) fn intern(&self, candidate: ImmutableNode<K, V>) -> Arc<ImmutableNode<K, V>> {
        let mut nodes = self.nodes.lock();
        if let Some(existing) = nodes.get(&candidate) {
            log::trace!("node cache hit (size {})", candidate.size());
            return Arc::clone(existing);
        }
        let node = Arc::new(candidate);
        nodes.insert(Arc::clone(&node));
        node
    }

    /// Number of canonical nodes interned so far.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes.lock().len()
    }
}
