//! Store configuration.

/// Which storage strategy a store uses.
///
/// Both backends implement the same contract; they differ in how a
/// committed version is represented (full structural-sharing snapshot
/// vs. a delta list linked to its parent version).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Structural-sharing immutable trees with hash-consed nodes.
    #[default]
    Tree,
    /// Transaction log of per-version delta lists forming a version tree.
    Delta,
}

/// Configuration for a versioned map store.
///
/// The cache and publish options apply to the tree backend; the delta
/// backend keeps no node structures and ignores them.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Storage strategy.
    pub backend: BackendKind,

    /// Intern frozen nodes through a per-store cache so structurally
    /// equal subtrees are represented once (hash-consing).
    /// Default: true.
    pub shared_node_cache_in_store: bool,

    /// After a commit, replace the committing working copy's root with
    /// the frozen immutable node, so subsequent reads share structure.
    /// Default: true.
    pub publish_on_commit: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Tree,
            shared_node_cache_in_store: true,
            publish_on_commit: true,
        }
    }
}

impl StoreConfig {
    /// Config for the given backend, other options at their defaults.
    pub fn for_backend(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }
}
