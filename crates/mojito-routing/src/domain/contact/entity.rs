//! The contact entity.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tracing::debug;

use super::identity::{ContactFlags, Vendor, Version};
use super::state::{ContactState, LastSeen};
use crate::domain::{ContactPolicy, Kuid, Timestamp};

/// A peer's routing-relevant identity, addressing and liveness.
///
/// Exactly one local contact exists per route table. It carries the
/// [`LastSeen::Local`] sentinel, never counts as alive and ignores every
/// liveness transition.
#[derive(Debug, Clone)]
pub struct Contact {
    node_id: Kuid,
    vendor: Vendor,
    version: Version,
    instance_id: u8,
    flags: ContactFlags,
    contact_address: SocketAddr,
    source_address: Option<SocketAddr>,
    rtt: Option<Duration>,
    last_seen: LastSeen,
    last_failed: Option<Timestamp>,
    failures: u32,
    state: ContactState,
}

impl Contact {
    fn base(node_id: Kuid, contact_address: SocketAddr, state: ContactState) -> Self {
        let mut flags = ContactFlags::default();
        flags.set(ContactFlags::FIREWALLED, contact_address.port() == 0);
        Self {
            node_id,
            vendor: Vendor::UNKNOWN,
            version: Version::ZERO,
            instance_id: 0,
            flags,
            contact_address,
            source_address: None,
            rtt: None,
            last_seen: LastSeen::Never,
            last_failed: None,
            failures: 0,
            state,
        }
    }

    /// The local node's own contact.
    pub fn local(node_id: Kuid, contact_address: SocketAddr) -> Self {
        let mut contact = Self::base(node_id, contact_address, ContactState::Unknown);
        contact.flags = ContactFlags::default();
        contact.last_seen = LastSeen::Local;
        contact
    }

    /// A contact learned indirectly, e.g. from a FIND_NODE response.
    pub fn unknown(node_id: Kuid, contact_address: SocketAddr) -> Self {
        Self::base(node_id, contact_address, ContactState::Unknown)
    }

    /// A contact that just completed a round trip with us.
    ///
    /// `source_address` is the address the message was observed from. It is
    /// reconciled with the advertised address when the table admits the
    /// contact, see [`Contact::fix_source_and_contact_address`].
    pub fn live(
        node_id: Kuid,
        contact_address: SocketAddr,
        source_address: Option<SocketAddr>,
        now: Timestamp,
    ) -> Self {
        let mut contact = Self::base(node_id, contact_address, ContactState::Alive);
        contact.source_address = source_address;
        contact.last_seen = LastSeen::At(now);
        contact
    }

    pub fn with_vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = vendor;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_instance_id(mut self, instance_id: u8) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn with_flags(mut self, flags: ContactFlags) -> Self {
        self.flags = flags;
        if self.contact_address.port() == 0 {
            self.flags.set(ContactFlags::FIREWALLED, true);
        }
        if flags.is_shutdown() {
            self.shutdown(true);
        }
        self
    }

    pub fn with_rtt(mut self, rtt: Duration) -> Self {
        self.rtt = Some(rtt);
        self
    }

    /// Mark the contact for forced insertion into a full bucket.
    pub fn with_priority(mut self) -> Self {
        if !self.is_local() {
            self.last_seen = LastSeen::Priority;
        }
        self
    }

    // ===== Accessors =====

    pub fn node_id(&self) -> &Kuid {
        &self.node_id
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn instance_id(&self) -> u8 {
        self.instance_id
    }

    pub fn flags(&self) -> ContactFlags {
        self.flags
    }

    pub fn contact_address(&self) -> SocketAddr {
        self.contact_address
    }

    pub fn source_address(&self) -> Option<SocketAddr> {
        self.source_address
    }

    pub fn rtt(&self) -> Option<Duration> {
        self.rtt
    }

    pub fn last_seen(&self) -> LastSeen {
        self.last_seen
    }

    pub fn last_failed(&self) -> Option<Timestamp> {
        self.last_failed
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn state(&self) -> ContactState {
        self.state
    }

    pub fn is_local(&self) -> bool {
        self.last_seen == LastSeen::Local
    }

    pub fn is_priority(&self) -> bool {
        self.last_seen == LastSeen::Priority
    }

    pub fn is_firewalled(&self) -> bool {
        self.flags.is_firewalled()
    }

    pub fn is_shutdown(&self) -> bool {
        self.flags.is_shutdown()
    }

    pub fn is_alive(&self) -> bool {
        !self.is_local() && self.state == ContactState::Alive
    }

    pub fn is_dead(&self) -> bool {
        !self.is_local() && self.state == ContactState::Dead
    }

    pub fn is_unknown(&self) -> bool {
        self.is_local() || self.state == ContactState::Unknown
    }

    /// Whether the contact was ever confirmed by a round trip.
    pub fn has_been_confirmed(&self) -> bool {
        matches!(self.last_seen, LastSeen::At(_))
    }

    /// Same node id and same contact address.
    pub fn is_same_contact(&self, other: &Contact) -> bool {
        self.node_id == other.node_id && self.contact_address == other.contact_address
    }

    /// Whether the contact was heard from within `min_reconnection_time`.
    pub fn has_been_recently_alive(&self, now: Timestamp, policy: &ContactPolicy) -> bool {
        match self.last_seen {
            LastSeen::Local => true,
            LastSeen::At(ts) => now.since(ts) < policy.min_reconnection_time,
            LastSeen::Never | LastSeen::Priority => false,
        }
    }

    /// Whether the last failure happened within `min_reconnection_time`.
    pub fn has_failed_recently(&self, now: Timestamp, policy: &ContactPolicy) -> bool {
        self.last_failed
            .is_some_and(|ts| now.since(ts) < policy.min_reconnection_time)
    }

    /// Request timeout derived from the RTT estimate.
    pub fn adaptive_timeout(&self, policy: &ContactPolicy) -> Duration {
        match self.rtt {
            Some(rtt) if self.is_alive() => {
                (rtt * policy.rtt_factor).max(policy.min_timeout)
            }
            _ => policy.default_timeout,
        }
    }

    // ===== State transitions =====

    /// A round trip completed: state ALIVE, failures cleared.
    pub fn alive(&mut self, now: Timestamp) {
        if self.is_local() {
            return;
        }
        self.state = ContactState::Alive;
        self.last_seen = LastSeen::At(now);
        self.failures = 0;
    }

    /// Record a failed request. May flip the contact to DEAD.
    pub fn handle_failure(&mut self, now: Timestamp, policy: &ContactPolicy) {
        if self.is_local() {
            return;
        }
        self.failures = self.failures.saturating_add(1);
        self.last_failed = Some(now);

        if self.is_shutdown() {
            return;
        }

        let threshold = if self.has_been_confirmed() {
            policy.max_alive_failures
        } else {
            policy.max_unknown_failures
        };
        if self.failures >= threshold {
            self.state = ContactState::Dead;
        }
    }

    /// Force the contact back to UNKNOWN, discarding its last-seen time and
    /// failure count so it is verified from scratch.
    pub fn mark_unknown(&mut self) {
        if self.is_local() {
            return;
        }
        self.state = ContactState::Unknown;
        self.last_seen = LastSeen::Never;
        self.failures = 0;
    }

    /// Set or clear the shutdown flag. A shut-down contact is DEAD.
    pub fn shutdown(&mut self, shutdown: bool) {
        if self.is_local() {
            return;
        }
        self.flags.set(ContactFlags::SHUTDOWN, shutdown);
        if shutdown {
            self.state = ContactState::Dead;
        }
    }

    pub fn set_rtt(&mut self, rtt: Duration) {
        self.rtt = Some(rtt);
    }

    /// Merge liveness data from the entry this contact is about to replace.
    ///
    /// An alive contact with fresher information keeps its own timestamp and
    /// failure record.
    pub fn update_with_existing(&mut self, existing: &Contact) {
        if self.rtt.is_none() {
            self.rtt = existing.rtt;
        }

        if !self.is_alive() || self.last_seen < existing.last_seen {
            if !self.is_priority() {
                self.last_seen = existing.last_seen;
            }
            self.last_failed = existing.last_failed;
            self.failures = existing.failures;
        }
    }

    /// Reconcile the advertised contact address with the observed source.
    ///
    /// Port 0 means the peer is firewalled and the source address becomes the
    /// contact address. Otherwise, unless `accept_forced_address` is set, a
    /// public source IP replaces the advertised IP and the advertised port is
    /// kept.
    pub fn fix_source_and_contact_address(&mut self, accept_forced_address: bool) {
        let Some(source) = self.source_address else {
            return;
        };

        let advertised = self.contact_address;
        if advertised.port() == 0 {
            self.contact_address = source;
            self.flags.set(ContactFlags::FIREWALLED, true);
        } else if !accept_forced_address && !is_private_address(&source.ip()) {
            self.contact_address = SocketAddr::new(source.ip(), advertised.port());
        }

        if self.contact_address != advertised {
            debug!(
                node_id = %self.node_id,
                source = %source,
                advertised = %advertised,
                contact = %self.contact_address,
                firewalled = self.is_firewalled(),
                "merged source and contact address"
            );
        }
    }

    /// Replace the contact address. Only meaningful for the local contact,
    /// whose external address is learned after construction.
    pub fn set_contact_address(&mut self, address: SocketAddr) {
        self.contact_address = address;
    }
}

/// Loopback, link-local and RFC 1918 / unique-local addresses.
pub(crate) fn is_private_address(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_address(&IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xFE00) == 0xFC00
                || (first & 0xFFC0) == 0xFE80
        }
    }
}
