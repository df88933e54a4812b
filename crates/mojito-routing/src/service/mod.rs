//! # Routing Service
//!
//! The concurrent shell around the domain layer: [`RoutingService`] owns the
//! route table behind a single lock and runs the pings it asks for, and
//! [`BucketRefresher`] keeps buckets fresh on a tokio timer.

// Semantic submodules
mod api;
mod core;
mod refresher;

// Re-export public API
pub use core::RoutingService;
pub use refresher::BucketRefresher;

#[cfg(test)]
mod tests;
