//! # Driving Ports (Inbound API)
//!
//! The API transport and message-handling code use to feed the route table
//! and query it.

use std::net::SocketAddr;

use crate::domain::{AddOutcome, Bucket, Contact, ContactState, Kuid, PurgeMode, SelectMode};

/// Primary API of the routing core.
///
/// Every method takes the table lock for its duration only. Returned contacts
/// and buckets are snapshots; mutating them has no effect on the table.
///
/// # Example
///
/// ```rust,ignore
/// use mojito_routing::ports::RouteTableApi;
///
/// fn closest<T: RouteTableApi>(api: &T, target: Kuid) -> Vec<Contact> {
///     api.select(&target, 20, SelectMode::Alive)
/// }
/// ```
pub trait RouteTableApi {
    /// Offer a contact learned from the network.
    ///
    /// Rejections are normal routing-policy outcomes, not failures.
    fn add(&self, contact: Contact) -> AddOutcome;

    /// Record a failed request to `node_id` at `address`.
    ///
    /// Returns the contact's new state, or `None` if the report was ignored.
    fn handle_failure(&self, node_id: &Kuid, address: SocketAddr) -> Option<ContactState>;

    /// Active or cached contact with this id.
    fn get(&self, node_id: &Kuid) -> Option<Contact>;

    /// Up to `count` contacts sorted by XOR distance to `target`.
    fn select(&self, target: &Kuid, count: usize, mode: SelectMode) -> Vec<Contact>;

    fn buckets(&self) -> Vec<Bucket>;

    /// Active and cached contacts.
    fn contacts(&self) -> Vec<Contact>;

    fn purge(&self, modes: &[PurgeMode]);

    /// Active plus cached contacts, the local contact included.
    fn size(&self) -> usize;
}
