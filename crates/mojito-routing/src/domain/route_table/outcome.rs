//! Results of table operations and the side effects they leave behind.

use crate::domain::{Contact, Kuid};

/// What `add` did with a contact. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Inserted as an active contact.
    Added,
    /// Placed in the replacement cache, possibly evicting an older entry.
    Cached { evicted: Option<Kuid> },
    /// Merged into the existing entry with the same id.
    Updated,
    /// Took the slot of the least-recently-seen active contact.
    Replaced { evicted: Kuid },
    /// A different address claims a known id; the known contact is being pinged.
    SpoofCheck,
    /// Existing entry kept as is.
    Unchanged,
    Rejected(RejectReason),
}

impl AddOutcome {
    /// Whether the contact ended up in the table (active or cached).
    pub fn is_stored(&self) -> bool {
        matches!(
            self,
            AddOutcome::Added
                | AddOutcome::Cached { .. }
                | AddOutcome::Updated
                | AddOutcome::Replaced { .. }
        )
    }
}

/// Why a contact was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The local contact itself.
    LocalNode,
    /// A remote contact claiming the local id.
    IdCollision,
    Firewalled,
    /// IPv4 contact in an IPv6 table or vice versa.
    AddressSpace,
    /// Its network class is already at the per-bucket limit.
    NetworkClass,
}

/// Why a ping was requested.
#[derive(Debug, Clone)]
pub enum PingReason {
    /// Liveness probe of a bucket's least-recently-seen active contact.
    LeastRecentlySeen,
    /// Only a timeout lets `candidate` take over the pinged contact's id.
    SpoofCheck { candidate: Contact },
}

/// A ping the table wants sent once its lock is released.
#[derive(Debug, Clone)]
pub struct PingRequest {
    pub contact: Contact,
    pub reason: PingReason,
}

/// Events and pings produced while the table was locked.
#[derive(Debug, Default)]
pub struct PendingEffects {
    pub events: Vec<crate::domain::RouteTableEvent>,
    pub pings: Vec<PingRequest>,
}

impl PendingEffects {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.pings.is_empty()
    }
}
