//! # Mojito Routing Core
//!
//! Kademlia route table for the Mojito DHT: contacts and their liveness
//! state machine, capacity-bounded buckets with replacement caches and a
//! Sybil-resistant network-class counter, the bucket trie, and the
//! background refresher that keeps it fresh.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Pure routing logic, no I/O, time passed in explicitly
//! - **Ports Layer:** Trait definitions for the host's pinger, lookup,
//!   bootstrapper, event listeners, clock and configuration
//! - **Service Layer:** The locked table plus post-unlock event dispatch and
//!   ping execution, and the tokio-driven `BucketRefresher`
//! - **Adapters Layer:** System clock, static/TOML configuration, channel
//!   listener
//!
//! ## Feature Flags
//!
//! - `serde` - Serialize/Deserialize for `Kuid`
//! - `toml-config` - `TomlConfigProvider` (default)
//! - `test-utils` - `ManualTimeSource`
//!
//! ## Example
//!
//! ```rust
//! use std::net::SocketAddr;
//! use mojito_routing::{
//!     AddOutcome, Contact, ContactPolicy, Kuid, RouteTable, RouteTableConfig, SelectMode,
//!     Timestamp,
//! };
//!
//! let local_addr: SocketAddr = "10.0.0.1:5000".parse().unwrap();
//! let mut table = RouteTable::new(
//!     Kuid::random(),
//!     local_addr,
//!     RouteTableConfig::default(),
//!     ContactPolicy::default(),
//! );
//!
//! let now = Timestamp::from_secs(1_000);
//! let peer = Contact::live(Kuid::random(), "10.0.1.7:5000".parse().unwrap(), None, now);
//! let peer_id = *peer.node_id();
//! assert_eq!(table.add(peer, now), AddOutcome::Added);
//!
//! let closest = table.select(&peer_id, 1, SelectMode::Alive);
//! assert_eq!(closest[0].node_id(), &peer_id);
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// ADAPTERS
// =============================================================================

pub mod adapters;

/// Test utilities (ManualTimeSource)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// CORE RE-EXPORTS
// =============================================================================

// Domain entities
pub use domain::{
    AddOutcome, Bucket, BucketId, ClassfulNetworkCounter, ConfigError, Contact, ContactFlags,
    ContactPolicy, ContactState, EventType, Kuid, LastSeen, PurgeMode, RefresherConfig,
    RejectReason, RouteTable, RouteTableConfig, RouteTableEvent, RoutingConfig, RoutingError,
    SelectMode, Timestamp, Vendor, Version,
};

// Port traits
pub use ports::{
    BootstrapError, Bootstrapper, ConfigProvider, ContactPinger, FindNodeResult, LookupError,
    NodeLookup, PingError, RouteTableApi, RouteTableListener, TimeSource,
};

// Service
pub use service::{BucketRefresher, RoutingService};

// Adapters
pub use adapters::{ChannelListener, StaticConfigProvider, SystemTimeSource};

#[cfg(feature = "toml-config")]
pub use adapters::TomlConfigProvider;

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::ManualTimeSource;
