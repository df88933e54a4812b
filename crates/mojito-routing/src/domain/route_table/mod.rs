//! The route table: a binary trie of buckets kept as a flat sorted vector.
//!
//! Buckets are ordered by range start and always tile the identifier space,
//! so a split is a vector splice and locating a bucket is a binary search.

// Semantic submodules
mod events;
mod modes;
mod outcome;
mod table;

// Re-export public API
pub use events::{EventType, RouteTableEvent};
pub use modes::{PurgeMode, SelectMode};
pub use outcome::{AddOutcome, PendingEffects, PingReason, PingRequest, RejectReason};
pub use table::RouteTable;
