//! Notifications emitted by route table mutations.

use std::fmt;

use crate::domain::{BucketId, Contact};

/// Discriminant of a [`RouteTableEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    AddActiveContact,
    AddCachedContact,
    ReplaceContact,
    UpdateContact,
    RemoveContact,
    ContactCheck,
    SplitBucket,
    Clear,
}

/// A change to the route table.
///
/// Events are buffered while the table is locked and handed to listeners
/// after the lock is released.
#[derive(Debug, Clone)]
pub enum RouteTableEvent {
    AddActiveContact {
        bucket: BucketId,
        node: Contact,
    },
    /// `evicted` is the cache entry pushed out to make room, if any.
    AddCachedContact {
        bucket: BucketId,
        evicted: Option<Contact>,
        node: Contact,
    },
    ReplaceContact {
        bucket: BucketId,
        existing: Contact,
        node: Contact,
    },
    UpdateContact {
        bucket: BucketId,
        existing: Contact,
        node: Contact,
    },
    RemoveContact {
        bucket: BucketId,
        node: Contact,
    },
    /// `existing` is being pinged to decide whether `node` may take its id.
    ContactCheck {
        bucket: BucketId,
        existing: Contact,
        node: Contact,
    },
    SplitBucket {
        bucket: BucketId,
        left: BucketId,
        right: BucketId,
    },
    Clear,
}

impl RouteTableEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            RouteTableEvent::AddActiveContact { .. } => EventType::AddActiveContact,
            RouteTableEvent::AddCachedContact { .. } => EventType::AddCachedContact,
            RouteTableEvent::ReplaceContact { .. } => EventType::ReplaceContact,
            RouteTableEvent::UpdateContact { .. } => EventType::UpdateContact,
            RouteTableEvent::RemoveContact { .. } => EventType::RemoveContact,
            RouteTableEvent::ContactCheck { .. } => EventType::ContactCheck,
            RouteTableEvent::SplitBucket { .. } => EventType::SplitBucket,
            RouteTableEvent::Clear => EventType::Clear,
        }
    }

    /// The bucket the event happened in. For splits, the parent.
    pub fn bucket(&self) -> Option<BucketId> {
        match self {
            RouteTableEvent::AddActiveContact { bucket, .. }
            | RouteTableEvent::AddCachedContact { bucket, .. }
            | RouteTableEvent::ReplaceContact { bucket, .. }
            | RouteTableEvent::UpdateContact { bucket, .. }
            | RouteTableEvent::RemoveContact { bucket, .. }
            | RouteTableEvent::ContactCheck { bucket, .. }
            | RouteTableEvent::SplitBucket { bucket, .. } => Some(*bucket),
            RouteTableEvent::Clear => None,
        }
    }

    /// The contact the event is about, if any.
    pub fn node(&self) -> Option<&Contact> {
        match self {
            RouteTableEvent::AddActiveContact { node, .. }
            | RouteTableEvent::AddCachedContact { node, .. }
            | RouteTableEvent::ReplaceContact { node, .. }
            | RouteTableEvent::UpdateContact { node, .. }
            | RouteTableEvent::RemoveContact { node, .. }
            | RouteTableEvent::ContactCheck { node, .. } => Some(node),
            RouteTableEvent::SplitBucket { .. } | RouteTableEvent::Clear => None,
        }
    }
}

impl fmt::Display for RouteTableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTableEvent::SplitBucket { bucket, left, right } => {
                write!(f, "SplitBucket {bucket} -> {left}, {right}")
            }
            RouteTableEvent::Clear => f.write_str("Clear"),
            other => {
                let bucket = other.bucket().map(|b| b.to_string()).unwrap_or_default();
                let node = other.node().map(|c| c.node_id().to_string()).unwrap_or_default();
                write!(f, "{:?} {node} in {bucket}", other.event_type())
            }
        }
    }
}
