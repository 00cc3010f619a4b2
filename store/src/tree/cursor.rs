//! In-order traversal and merge-diffing of immutable trees.
//!
//! An [`InOrderCursor`] walks a frozen tree in fragment order, the key
//! order defined by `compare_keys`. A [`TreeDiffCursor`] merges two such
//! traversals into a lazy sequence of per-key differences, dropping into
//! neither subtree when both cursors stand inside the same shared node
//! (the payoff of hash-consing: unchanged regions are skipped wholesale).

use std::cmp::Ordering;
use std::hash::Hash;
use std::sync::Arc;

use forkmap_primitives::hash::{compare_keys, KeyHasher, BRANCH_FACTOR};
use forkmap_primitives::DiffEntry;

use super::immutable::{ImmutableNode, SlotView};

struct Frame<K, V> {
    node: Arc<ImmutableNode<K, V>>,
    /// Next slot index to examine.
    slot: u32,
}

/// Cursor positioned on one binding of a frozen tree.
pub(crate) struct InOrderCursor<K, V> {
    stack: Vec<Frame<K, V>>,
    current: Option<(K, V)>,
}

impl<K, V> InOrderCursor<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Cursor over the tree rooted at `root`, positioned on its first
    /// binding (terminated immediately for an empty tree).
    pub(crate) fn new(root: Option<Arc<ImmutableNode<K, V>>>) -> Self {
        let stack = root
            .map(|node| vec![Frame { node, slot: 0 }])
            .unwrap_or_default();
        let mut cursor = Self {
            stack,
            current: None,
        };
        cursor.advance();
        cursor
    }

    pub(crate) fn current(&self) -> Option<(&K, &V)> {
        self.current.as_ref().map(|(k, v)| (k, v))
    }

    pub(crate) fn take_current(&mut self) -> Option<(K, V)> {
        self.current.take()
    }

    /// Move to the next binding. Returns false when the traversal is done.
    pub(crate) fn advance(&mut self) -> bool {
        self.current = None;
        while let Some(frame) = self.stack.last_mut() {
            if frame.slot as usize >= BRANCH_FACTOR {
                self.stack.pop();
                continue;
            }
            let slot = frame.slot;
            frame.slot += 1;
            let mut descend = None;
            match frame.node.slot(slot) {
                Some(SlotView::Entry(key, value)) => {
                    self.current = Some((key.clone(), value.clone()));
                    return true;
                }
                Some(SlotView::Child(child)) => descend = Some(Arc::clone(child)),
                None => {}
            }
            if let Some(child) = descend {
                self.stack.push(Frame {
                    node: child,
                    slot: 0,
                });
            }
        }
        false
    }

    /// Node whose slots are being scanned, with the next slot index.
    fn top(&self) -> Option<(&Arc<ImmutableNode<K, V>>, u32)> {
        self.stack.last().map(|frame| (&frame.node, frame.slot))
    }

    /// Abandon the rest of the node currently being scanned.
    fn pop_top(&mut self) {
        self.stack.pop();
    }
}

enum Advance {
    FromOnly,
    ToOnly,
    BothEqual,
    BothDiffer,
}

/// Lazy ordered sequence of per-key differences between two frozen trees.
///
/// Merges the two in-order traversals: the cursor with the smaller
/// current key emits against the default value; equal keys emit only
/// when their values differ.
pub(crate) struct TreeDiffCursor<K, V, H> {
    hasher: Arc<H>,
    default_value: V,
    from: InOrderCursor<K, V>,
    to: InOrderCursor<K, V>,
}

impl<K, V, H> TreeDiffCursor<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq,
    H: KeyHasher<K>,
{
    pub(crate) fn new(
        hasher: Arc<H>,
        default_value: V,
        from_root: Option<Arc<ImmutableNode<K, V>>>,
        to_root: Option<Arc<ImmutableNode<K, V>>>,
    ) -> Self {
        // Identical roots cannot differ anywhere; skip the whole walk.
        let identical = matches!(
            (&from_root, &to_root),
            (Some(a), Some(b)) if Arc::ptr_eq(a, b)
        );
        let (from_root, to_root) = if identical {
            (None, None)
        } else {
            (from_root, to_root)
        };
        Self {
            hasher,
            default_value,
            from: InOrderCursor::new(from_root),
            to: InOrderCursor::new(to_root),
        }
    }

    /// Advance both cursors past an equal position. While both stand at
    /// the same next slot of the same shared node, the remainder of that
    /// node is identical on both sides and is dropped wholesale.
    fn advance_both(&mut self) {
        loop {
            match (self.from.top(), self.to.top()) {
                (Some((a, sa)), Some((b, sb))) if Arc::ptr_eq(a, b) && sa == sb => {
                    self.from.pop_top();
                    self.to.pop_top();
                }
                _ => break,
            }
        }
        self.from.advance();
        self.to.advance();
    }
}

impl<K, V, H> Iterator for TreeDiffCursor<K, V, H>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq,
    H: KeyHasher<K>,
{
    type Item = DiffEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let decision = match (self.from.current(), self.to.current()) {
                (None, None) => return None,
                (Some(_), None) => Advance::FromOnly,
                (None, Some(_)) => Advance::ToOnly,
                (Some((from_key, from_value)), Some((to_key, to_value))) => {
                    match compare_keys(self.hasher.as_ref(), from_key, to_key) {
                        Ordering::Less => Advance::FromOnly,
                        Ordering::Greater => Advance::ToOnly,
                        Ordering::Equal if from_value != to_value => Advance::BothDiffer,
                        Ordering::Equal => Advance::BothEqual,
                    }
                }
            };
            match decision {
                Advance::FromOnly => {
                    let (key, value) = self.from.take_current().expect("cursor positioned");
                    self.from.advance();
                    return Some(DiffEntry::new(key, value, self.default_value.clone()));
                }
                Advance::ToOnly => {
                    let (key, value) = self.to.take_current().expect("cursor positioned");
                    self.to.advance();
                    return Some(DiffEntry::new(key, self.default_value.clone(), value));
                }
                Advance::BothDiffer => {
                    let (key, from_value) = self.from.take_current().expect("cursor positioned");
                    let (_, to_value) = self.to.take_current().expect("cursor positioned");
                    self.advance_both();
                    return Some(DiffEntry::new(key, from_value, to_value));
                }
                Advance::BothEqual => self.advance_both(),
            }
        }
    }
}
