//! Contacts and their liveness state machine.
//!
//! A [`Contact`] is owned by the route table. Callers only ever see clones.

// Semantic submodules
mod entity;
mod identity;
mod state;

// Re-export public API
pub use entity::Contact;
pub use identity::{ContactFlags, Vendor, Version};
pub use state::{ContactState, LastSeen};
