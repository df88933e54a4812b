//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the routing core **requires** from the host: a clock, a way to
//! ping a contact, a node lookup, the bootstrap procedure and event sinks.

use std::net::SocketAddr;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Contact, Kuid, RouteTableEvent, RoutingConfig, Timestamp};

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Abstract interface for configuration loading.
pub trait ConfigProvider: Send + Sync {
    /// Route table, contact policy and refresher settings.
    fn routing_config(&self) -> RoutingConfig;
}

/// Sends a PING to a contact.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; pings run on spawned tokio tasks.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct UdpPinger { socket: tokio::net::UdpSocket }
///
/// #[async_trait]
/// impl ContactPinger for UdpPinger {
///     async fn ping(&self, contact: &Contact) -> Result<Contact, PingError> {
///         // Send PING, await PONG, build a live Contact from the response
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait ContactPinger: Send + Sync {
    /// Ping `contact` and return the responder as a live contact.
    ///
    /// The returned contact may carry a different address than the one that
    /// was pinged (NAT rebinding, forced addresses).
    async fn ping(&self, contact: &Contact) -> Result<Contact, PingError>;
}

/// Result of a FIND_NODE style lookup.
#[derive(Debug, Clone)]
pub struct FindNodeResult {
    /// The lookup target.
    pub target: Kuid,
    /// Closest live contacts found, nearest first.
    pub contacts: Vec<Contact>,
    /// Number of round trips the lookup took.
    pub hops: usize,
}

/// Iterative Kademlia node lookup.
#[async_trait]
pub trait NodeLookup: Send + Sync {
    async fn find_node(&self, target: Kuid) -> Result<FindNodeResult, LookupError>;
}

/// The bootstrap procedure that populates an empty table from a seed.
#[async_trait]
pub trait Bootstrapper: Send + Sync {
    /// Whether the table has been populated.
    fn is_bootstrapped(&self) -> bool;

    /// Whether a bootstrap is currently running.
    fn is_bootstrapping(&self) -> bool;

    /// Bootstrap from `seed`, a contact that just answered a ping.
    async fn bootstrap(&self, seed: Contact) -> Result<(), BootstrapError>;
}

/// Receives route table events after the table lock has been released.
///
/// Handlers may call back into the routing service.
pub trait RouteTableListener: Send + Sync {
    fn handle_route_table_event(&self, event: &RouteTableEvent);
}

/// Errors from a ping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PingError {
    /// No response within the contact's timeout.
    #[error("ping to {node_id} at {address} timed out")]
    Timeout { node_id: Kuid, address: SocketAddr },

    #[error("ping cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors from a node lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("lookup for {0} timed out")]
    Timeout(Kuid),

    #[error("lookup cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors from the bootstrap procedure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("bootstrap failed: {0}")]
    Failed(String),

    #[error("bootstrap lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_error_display() {
        let err = PingError::Timeout {
            node_id: Kuid::MIN,
            address: "1.2.3.4:5".parse().unwrap(),
        };
        assert_eq!(
            err.to_string(),
            format!("ping to {} at 1.2.3.4:5 timed out", Kuid::MIN)
        );
        assert_eq!(PingError::Cancelled.to_string(), "ping cancelled");
    }

    #[test]
    fn test_lookup_error_converts_into_bootstrap_error() {
        let err: BootstrapError = LookupError::Cancelled.into();
        assert_eq!(err.to_string(), "bootstrap lookup failed: lookup cancelled");
    }
}
