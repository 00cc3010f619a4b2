//! Error types for the forkmap store.
//!
//! Both backends surface the same two failure modes: a lookup of a version
//! that was never committed, and exhaustion of the version counter. Internal
//! invariant violations (e.g. a key hasher that cannot distinguish two
//! distinct keys) are programming errors and panic instead of returning a
//! variant here; silent recovery would corrupt every version sharing the
//! bad state.

use crate::types::Version;

/// Primary error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A version was requested that the store never registered.
    ///
    /// Carries the sorted set of known versions for diagnostics.
    #[error("store does not contain version {requested} (known versions: {known:?})")]
    UnknownVersion {
        /// The version the caller asked for.
        requested: Version,
        /// All versions the store has registered, ascending.
        known: Vec<Version>,
    },

    /// The monotonic version counter would overflow.
    ///
    /// Fatal: the store accepts no further commits.
    #[error("version counter exhausted")]
    VersionsExhausted,
}

impl StoreError {
    /// Build an [`StoreError::UnknownVersion`] from any iterator of known
    /// versions, sorting them for stable diagnostics.
    pub fn unknown_version(requested: Version, known: impl IntoIterator<Item = Version>) -> Self {
        let mut known: Vec<Version> = known.into_iter().collect();
        known.sort_unstable();
        Self::UnknownVersion { requested, known }
    }
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
