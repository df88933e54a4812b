//! Domain layer: identifiers, contacts, buckets and the route table.
//!
//! Everything in here is synchronous and free of I/O. Time is passed in as a
//! [`Timestamp`], and side effects (events, pings) are returned to the caller.

pub mod bucket;
pub mod config;
pub mod contact;
pub mod errors;
pub mod kuid;
pub mod route_table;
pub mod time;

pub use bucket::{Bucket, BucketId, ClassfulNetworkCounter};
pub use config::{ContactPolicy, RefresherConfig, RouteTableConfig, RoutingConfig};
pub use contact::{Contact, ContactFlags, ContactState, LastSeen, Vendor, Version};
pub use errors::{ConfigError, RoutingError};
pub use kuid::{Kuid, KUID_BITS, KUID_LENGTH};
pub use route_table::{
    AddOutcome, EventType, PendingEffects, PingReason, PingRequest, PurgeMode, RejectReason,
    RouteTable, RouteTableEvent, SelectMode,
};
pub use time::Timestamp;
