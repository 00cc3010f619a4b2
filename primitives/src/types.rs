//! Canonical scalar types for the forkmap store.

/// Identifier of one committed snapshot.
///
/// Versions are assigned by the owning store from a monotonic counter
/// starting at `0` and are never reused. `u64::MAX` is never assigned;
/// a store whose counter reaches it refuses further commits with
/// [`StoreError::VersionsExhausted`](crate::error::StoreError).
pub type Version = u64;
