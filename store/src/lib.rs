//! `forkmap-store` — in-memory versioned key-value store.
//!
//! The state-management substrate of a backtracking exploration engine:
//! fork a working copy of a dataset, mutate it, commit it as a new
//! integer version, and cheaply restore to (or diff against) any
//! previously committed version.
//!
//! Two interchangeable backends implement the same contract:
//!
//! - **Tree** ([`BackendKind::Tree`]): committed versions are immutable
//!   structural-sharing trees whose nodes are interned through a cache
//!   (hash-consing), so a commit costs memory proportional to the number
//!   of changed bindings, not the dataset size.
//! - **Delta** ([`BackendKind::Delta`]): committed versions are ordered
//!   delta lists linked into a version tree; snapshots are reconstructed
//!   by replay, and moving between versions walks the minimal path
//!   through their nearest common ancestor.
//!
//! ```
//! use forkmap_store::{StoreConfig, VersionedMapStore};
//!
//! let store: VersionedMapStore<&str, i32> = VersionedMapStore::new(0, StoreConfig::default());
//! let mut map = store.create_map();
//! map.put("a", 1);
//! let v0 = map.commit().unwrap();
//! map.put("b", 2);
//! let v1 = map.commit().unwrap();
//!
//! let diff: Vec<_> = store.diff_cursor(v0, v1).unwrap().collect();
//! assert_eq!(diff.len(), 1);
//! assert_eq!((diff[0].key, diff[0].from_value, diff[0].to_value), ("b", 0, 2));
//!
//! assert_eq!(store.create_map_at(v0).unwrap().get(&"b"), 0);
//! ```

pub(crate) mod delta;
pub(crate) mod tree;

mod diff;
mod map;
mod store;

pub use diff::DiffCursor;
pub use map::{ChangeListener, VersionedMap};
pub use store::VersionedMapStore;

// Re-export the primitives surface so callers need only one crate.
pub use forkmap_primitives::{
    BackendKind, DiffEntry, KeyHasher, MapDelta, StdKeyHasher, StoreConfig, StoreError,
    StoreResult, Version,
};
