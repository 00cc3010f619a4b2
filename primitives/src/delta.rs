//! Change and difference records.
//!
//! A [`MapDelta`] records one key's value change inside a committed
//! transaction (delta backend). A [`DiffEntry`] is one element of a diff
//! cursor's output, for either backend. Both use the store's designated
//! default value to express absence; no tombstones.

/// One recorded change to a single key within a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDelta<K, V> {
    /// The key that changed.
    pub key: K,
    /// Value before the transaction (default value if the key was absent).
    pub old_value: V,
    /// Value after the transaction (default value if the key was removed).
    pub new_value: V,
}

impl<K, V> MapDelta<K, V> {
    /// Create a delta record.
    pub fn new(key: K, old_value: V, new_value: V) -> Self {
        Self {
            key,
            old_value,
            new_value,
        }
    }
}

/// One element of a diff-cursor sequence: a key whose value differs
/// between the two compared versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry<K, V> {
    /// The differing key.
    pub key: K,
    /// The key's value at the `from` version (default value if absent).
    pub from_value: V,
    /// The key's value at the `to` version (default value if absent).
    pub to_value: V,
}

impl<K, V> DiffEntry<K, V> {
    /// Create a diff entry.
    pub fn new(key: K, from_value: V, to_value: V) -> Self {
        Self {
            key,
            from_value,
            to_value,
        }
    }
}
