//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** the API the routing core exposes
//! - **Driven Ports (Outbound):** what the host supplies (clock, pings,
//!   lookups, bootstrap, event sinks, configuration)

pub mod inbound;
pub mod outbound;

pub use inbound::RouteTableApi;
pub use outbound::{
    BootstrapError, Bootstrapper, ConfigProvider, ContactPinger, FindNodeResult, LookupError,
    NodeLookup, PingError, RouteTableListener, TimeSource,
};
