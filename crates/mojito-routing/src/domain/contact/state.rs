//! Liveness state and the last-seen timestamp sentinels.

use crate::domain::Timestamp;

/// Liveness of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactState {
    /// Confirmed through a completed round trip.
    Alive,
    /// Declared unreachable after repeated failures.
    Dead,
    /// Learned indirectly, or demoted by `mark_unknown()`.
    Unknown,
}

/// When a contact was last heard from.
///
/// The ordering doubles as the least-recently-seen ordering of a bucket:
/// `Never < At(_) < Priority < Local`, so sentinels sort as the most recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LastSeen {
    Never,
    At(Timestamp),
    /// Forced insertion: may bump any live contact except the local one.
    Priority,
    /// The immutable local identity.
    Local,
}

impl LastSeen {
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            LastSeen::At(ts) => Some(*ts),
            _ => None,
        }
    }
}
