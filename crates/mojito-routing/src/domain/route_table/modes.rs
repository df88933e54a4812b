//! Selection and purge modes.

/// Which contacts `select` may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectMode {
    /// Everything except shut-down contacts. Dead contacts are returned with
    /// a probability that falls with their failure count.
    #[default]
    All,
    /// Only ALIVE contacts.
    Alive,
    /// ALIVE contacts plus the local contact.
    AliveWithLocal,
}

/// Rebuild strategies for `purge`. Applied in declaration order whatever
/// order they are passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PurgeMode {
    /// Clear every replacement cache.
    DropCache,
    /// Drop dead and never-confirmed contacts, backfill from the caches.
    PurgeContacts,
    /// Rebuild the trie from one bucket and re-add every contact.
    MergeBuckets,
    /// Demote every contact to UNKNOWN.
    StateToUnknown,
}
