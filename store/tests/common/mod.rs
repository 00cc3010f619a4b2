//! Shared helpers for forkmap-store integration tests.

#![allow(dead_code)]

use forkmap_store::{BackendKind, StoreConfig, Version, VersionedMapStore};

pub type Store = VersionedMapStore<String, i32>;

/// Store over `String → i32` with default value `0`.
pub fn store(backend: BackendKind) -> Store {
    VersionedMapStore::new(0, StoreConfig::for_backend(backend))
}

/// One store per backend, for contract tests that must hold on both.
pub fn both_backends() -> Vec<Store> {
    vec![store(BackendKind::Tree), store(BackendKind::Delta)]
}

/// Diff cursor output flattened into comparable triples.
pub fn diff_triples(store: &Store, from: Version, to: Version) -> Vec<(String, i32, i32)> {
    store
        .diff_cursor(from, to)
        .unwrap()
        .map(|entry| (entry.key, entry.from_value, entry.to_value))
        .collect()
}

/// `key_{i}` test key.
pub fn key(i: usize) -> String {
    format!("key_{i}")
}
