//! Route table implementation.

use std::cmp::Reverse;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info, warn};

use super::events::RouteTableEvent;
use super::modes::{PurgeMode, SelectMode};
use super::outcome::{AddOutcome, PendingEffects, PingReason, PingRequest, RejectReason};
use crate::domain::{
    Bucket, BucketId, Contact, ContactPolicy, ContactState, Kuid, LastSeen, RouteTableConfig,
    RoutingError, Timestamp,
};

/// Kademlia route table.
///
/// # Invariants
///
/// - `buckets` is sorted by range start and the ranges tile the id space
/// - the local contact is always present, in the bucket covering its id
/// - every bucket respects its active and cache capacity
///
/// The table never performs I/O. Mutations queue [`RouteTableEvent`]s and
/// [`PingRequest`]s which the owner drains with [`RouteTable::take_effects`]
/// after releasing whatever lock guards the table.
#[derive(Debug)]
pub struct RouteTable {
    local: Contact,
    config: RouteTableConfig,
    policy: ContactPolicy,
    buckets: Vec<Bucket>,
    consecutive_failures: u32,
    pending: PendingEffects,
}

impl RouteTable {
    /// Create a table holding only the local contact.
    pub fn new(
        local_id: Kuid,
        local_address: SocketAddr,
        config: RouteTableConfig,
        policy: ContactPolicy,
    ) -> Self {
        let mut table = Self {
            local: Contact::local(local_id, local_address),
            config,
            policy,
            buckets: Vec::new(),
            consecutive_failures: 0,
            pending: PendingEffects::default(),
        };
        table.init();
        table
    }

    fn init(&mut self) {
        let mut root = self.new_bucket(BucketId::ROOT);
        root.add_active(self.local.clone(), Timestamp::ZERO);
        self.buckets = vec![root];
        self.consecutive_failures = 0;
    }

    fn new_bucket(&self, id: BucketId) -> Bucket {
        Bucket::new(
            id,
            self.config.k,
            self.config.max_cache_size,
            self.config.network_class_mask,
        )
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn local_node(&self) -> &Contact {
        &self.local
    }

    pub fn local_id(&self) -> &Kuid {
        self.local.node_id()
    }

    /// The local contact, compared by identity and address.
    pub fn is_local_node(&self, contact: &Contact) -> bool {
        contact.is_local() && contact.is_same_contact(&self.local)
    }

    pub fn config(&self) -> &RouteTableConfig {
        &self.config
    }

    pub fn policy(&self) -> &ContactPolicy {
        &self.policy
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The bucket whose range covers `node_id`.
    pub fn bucket_for(&self, node_id: &Kuid) -> &Bucket {
        &self.buckets[self.bucket_index(node_id)]
    }

    fn bucket_index(&self, node_id: &Kuid) -> usize {
        self.buckets
            .partition_point(|b| b.id().first() <= *node_id)
            .saturating_sub(1)
    }

    /// Active or cached contact with this id.
    pub fn get(&self, node_id: &Kuid) -> Option<&Contact> {
        self.bucket_for(node_id).get(node_id)
    }

    /// Active and cached contacts.
    pub fn contacts(&self) -> Vec<Contact> {
        let mut all = self.active_contacts();
        all.extend(self.cached_contacts());
        all
    }

    pub fn active_contacts(&self) -> Vec<Contact> {
        self.buckets
            .iter()
            .flat_map(|b| b.active_contacts().iter().cloned())
            .collect()
    }

    pub fn cached_contacts(&self) -> Vec<Contact> {
        self.buckets
            .iter()
            .flat_map(|b| b.cached_contacts().iter().cloned())
            .collect()
    }

    /// Number of active plus cached contacts, the local contact included.
    pub fn size(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| b.active_size() + b.cache_size())
            .sum()
    }

    /// Drain the events and pings queued by previous mutations.
    pub fn take_effects(&mut self) -> PendingEffects {
        std::mem::take(&mut self.pending)
    }

    // =========================================================================
    // ADD
    // =========================================================================

    /// Offer a contact to the table.
    pub fn add(&mut self, node: Contact, now: Timestamp) -> AddOutcome {
        let mut node = node;
        if !node.is_local() {
            node.fix_source_and_contact_address(self.config.accept_forced_address);
        }

        if let Some(reason) = self.admission_check(&node) {
            debug!(node_id = %node.node_id(), address = %node.contact_address(), ?reason, "contact rejected");
            return AddOutcome::Rejected(reason);
        }

        self.consecutive_failures = 0;

        // Each pass either settles the contact or splits a bucket one level
        // deeper, so this terminates at full depth at the latest.
        loop {
            let idx = self.bucket_index(node.node_id());
            let bucket = &self.buckets[idx];

            if let Some(existing) = bucket.get(node.node_id()).cloned() {
                return self.update_contact_in_bucket(idx, existing, node, now);
            }

            if !bucket.is_active_full() {
                if bucket.is_okay_to_add(&node, self.config.max_network_class_ratio) {
                    self.add_contact_to_bucket(idx, node, now);
                    return AddOutcome::Added;
                }
                if !self.can_split(idx) {
                    return self.add_contact_to_bucket_cache(idx, node);
                }
                debug!(node_id = %node.node_id(), bucket = %bucket.id(), "network class limit reached");
                return AddOutcome::Rejected(RejectReason::NetworkClass);
            }

            if self.split(idx) {
                continue;
            }

            return self.replace_contact_in_bucket(idx, node, now);
        }
    }

    fn admission_check(&self, node: &Contact) -> Option<RejectReason> {
        if node.is_local() && (self.is_local_node(node) || node.node_id() != self.local_id()) {
            return Some(RejectReason::LocalNode);
        }
        if node.is_firewalled() {
            return Some(RejectReason::Firewalled);
        }
        if !is_same_address_space(&self.local.contact_address(), &node.contact_address()) {
            return Some(RejectReason::AddressSpace);
        }
        None
    }

    fn update_contact_in_bucket(
        &mut self,
        idx: usize,
        existing: Contact,
        mut node: Contact,
        now: Timestamp,
    ) -> AddOutcome {
        let bucket_id = self.buckets[idx].id();

        if existing.is_local() {
            if !node.is_local() {
                warn!(
                    node_id = %node.node_id(),
                    address = %node.contact_address(),
                    "remote contact collides with the local node id"
                );
                return AddOutcome::Rejected(RejectReason::IdCollision);
            }
            // A new local contact, e.g. after the external address changed.
            self.buckets[idx].update_contact(node.clone());
            self.local = node.clone();
            info!(address = %node.contact_address(), "local contact updated");
            self.fire(RouteTableEvent::UpdateContact {
                bucket: bucket_id,
                existing,
                node,
            });
            return AddOutcome::Updated;
        }

        if existing.is_alive() && !node.is_alive() {
            return AddOutcome::Unchanged;
        }

        if !existing.is_alive() || existing.is_same_contact(&node) {
            if self.violates_network_class(idx, &existing, &node) {
                debug!(
                    node_id = %node.node_id(),
                    address = %node.contact_address(),
                    bucket = %bucket_id,
                    "new address exceeds the network class limit, keeping existing"
                );
                return AddOutcome::Rejected(RejectReason::NetworkClass);
            }
            node.update_with_existing(&existing);

            let bucket = &mut self.buckets[idx];
            let is_cached = bucket.contains_cached(node.node_id());
            let idle = bucket.idle_time(now);
            bucket.update_contact(node.clone());

            if is_cached && idle.map_or(true, |d| d > self.config.bucket_ping_limit) {
                self.ping_least_recently_seen(idx);
            }
            self.buckets[idx].touch(now);

            debug!(node_id = %node.node_id(), bucket = %bucket_id, "contact updated");
            self.fire(RouteTableEvent::UpdateContact {
                bucket: bucket_id,
                existing,
                node,
            });
            return AddOutcome::Updated;
        }

        if node.is_alive() && !existing.has_been_recently_alive(now, &self.policy) {
            debug!(
                node_id = %node.node_id(),
                existing = %existing.contact_address(),
                candidate = %node.contact_address(),
                "starting spoof check"
            );
            self.fire(RouteTableEvent::ContactCheck {
                bucket: bucket_id,
                existing: existing.clone(),
                node: node.clone(),
            });
            self.queue_ping(existing, PingReason::SpoofCheck { candidate: node });
            self.buckets[idx].touch(now);
            return AddOutcome::SpoofCheck;
        }

        AddOutcome::Unchanged
    }

    /// Conclude a spoof check whose ping of `existing` timed out.
    pub fn resolve_spoof_check(
        &mut self,
        existing: &Contact,
        mut candidate: Contact,
        now: Timestamp,
    ) -> AddOutcome {
        let idx = self.bucket_index(candidate.node_id());
        let current = self.buckets[idx].get(candidate.node_id()).cloned();

        match current {
            Some(current) if current.is_same_contact(existing) => {
                if self.violates_network_class(idx, &current, &candidate) {
                    debug!(
                        node_id = %candidate.node_id(),
                        address = %candidate.contact_address(),
                        "spoof check timed out, but the new address exceeds the network class limit"
                    );
                    return AddOutcome::Rejected(RejectReason::NetworkClass);
                }
                candidate.update_with_existing(&current);
                let bucket_id = self.buckets[idx].id();
                self.buckets[idx].update_contact(candidate.clone());

                info!(
                    node_id = %candidate.node_id(),
                    address = %candidate.contact_address(),
                    "spoof check timed out, contact replaced"
                );
                let cached = self.buckets[idx].contains_cached(candidate.node_id());
                self.fire(RouteTableEvent::UpdateContact {
                    bucket: bucket_id,
                    existing: current,
                    node: candidate,
                });
                if cached {
                    self.ping_least_recently_seen(idx);
                }
                AddOutcome::Updated
            }
            _ => self.add(candidate, now),
        }
    }

    /// Whether swapping the active entry `existing` for `node` would push
    /// `node`'s network class past its limit. Cached entries are not counted.
    fn violates_network_class(&self, idx: usize, existing: &Contact, node: &Contact) -> bool {
        let bucket = &self.buckets[idx];
        if !bucket.contains_active(existing.node_id()) {
            return false;
        }
        let counter = bucket.counter();
        if counter.network_class(existing) == counter.network_class(node) {
            return false;
        }
        !bucket.is_okay_to_add(node, self.config.max_network_class_ratio)
    }

    fn add_contact_to_bucket(&mut self, idx: usize, node: Contact, now: Timestamp) {
        let bucket = &mut self.buckets[idx];
        let bucket_id = bucket.id();
        bucket.add_active(node.clone(), now);
        debug!(node_id = %node.node_id(), bucket = %bucket_id, "active contact added");
        self.fire(RouteTableEvent::AddActiveContact {
            bucket: bucket_id,
            node,
        });
    }

    fn add_contact_to_bucket_cache(&mut self, idx: usize, node: Contact) -> AddOutcome {
        let bucket = &mut self.buckets[idx];
        let bucket_id = bucket.id();
        let evicted = bucket.add_cached(node.clone());
        let evicted_id = evicted.as_ref().map(|c| *c.node_id());
        debug!(node_id = %node.node_id(), bucket = %bucket_id, evicted = ?evicted_id, "contact cached");
        self.fire(RouteTableEvent::AddCachedContact {
            bucket: bucket_id,
            evicted,
            node,
        });
        AddOutcome::Cached {
            evicted: evicted_id,
        }
    }

    fn replace_contact_in_bucket(&mut self, idx: usize, node: Contact, now: Timestamp) -> AddOutcome {
        let ratio = self.config.max_network_class_ratio;
        let bucket = &self.buckets[idx];

        if (node.is_alive() || node.is_priority()) && bucket.is_okay_to_add(&node, ratio) {
            let lrs = bucket.least_recently_seen_active().cloned();
            if let Some(lrs) = lrs {
                if !lrs.is_local() && (lrs.is_unknown() || lrs.is_dead() || node.is_priority()) {
                    let bucket = &mut self.buckets[idx];
                    let bucket_id = bucket.id();
                    bucket.remove_active(lrs.node_id());
                    bucket.add_active(node.clone(), now);
                    bucket.touch(now);

                    debug!(
                        node_id = %node.node_id(),
                        evicted = %lrs.node_id(),
                        bucket = %bucket_id,
                        "least recently seen contact replaced"
                    );
                    let evicted = *lrs.node_id();
                    self.fire(RouteTableEvent::ReplaceContact {
                        bucket: bucket_id,
                        existing: lrs,
                        node,
                    });
                    return AddOutcome::Replaced { evicted };
                }
            }
        }

        let outcome = self.add_contact_to_bucket_cache(idx, node);
        self.ping_least_recently_seen(idx);
        outcome
    }

    // =========================================================================
    // SPLIT
    // =========================================================================

    /// A bucket may split if it holds the local id, is the sibling subtree of
    /// the local bucket, or is not yet too deep.
    fn can_split(&self, idx: usize) -> bool {
        let bucket = &self.buckets[idx];
        if bucket.id().split().is_none() {
            return false;
        }
        let local_id = self.local_id();
        let local_depth = self.bucket_for(local_id).depth();

        bucket.contains(local_id)
            || bucket.is_in_smallest_subtree(local_id, local_depth)
            || !bucket.is_too_deep(local_id, self.config.depth_limit)
    }

    fn split(&mut self, idx: usize) -> bool {
        if !self.can_split(idx) {
            return false;
        }
        let Some((left, right)) = self.buckets[idx].split() else {
            return false;
        };

        let parent = self.buckets[idx].id();
        let (left_id, right_id) = (left.id(), right.id());
        self.buckets[idx] = left;
        self.buckets.insert(idx + 1, right);

        info!(bucket = %parent, left = %left_id, right = %right_id, "bucket split");
        self.fire(RouteTableEvent::SplitBucket {
            bucket: parent,
            left: left_id,
            right: right_id,
        });
        self.ensure_partition();
        true
    }

    // =========================================================================
    // FAILURES
    // =========================================================================

    /// Record a failed request to `node_id` at `address`.
    ///
    /// Returns the contact's new state, or `None` when the failure was
    /// ignored. Dead contacts stay where they are until a purge or a
    /// replacement needs their slot.
    pub fn handle_failure(
        &mut self,
        node_id: &Kuid,
        address: SocketAddr,
        now: Timestamp,
    ) -> Option<ContactState> {
        if node_id == self.local_id() {
            warn!(address = %address, "failure reported for the local node");
            return None;
        }

        let idx = self.bucket_index(node_id);
        let contact = self.buckets[idx].get(node_id)?;

        if contact.contact_address() != address {
            debug!(
                node_id = %node_id,
                expected = %contact.contact_address(),
                reported = %address,
                "failure for a different address ignored"
            );
            return None;
        }

        if self.consecutive_failures >= self.config.max_consecutive_failures {
            debug!(
                node_id = %node_id,
                consecutive = self.consecutive_failures,
                "too many consecutive failures, ignoring"
            );
            return None;
        }
        self.consecutive_failures += 1;

        let contact = self.buckets[idx].get_mut(node_id)?;
        contact.handle_failure(now, &self.policy);
        let state = contact.state();
        let failures = contact.failures();

        if state == ContactState::Dead {
            debug!(node_id = %node_id, failures, "contact is dead");
        }
        Some(state)
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// The contact nearest to `target`.
    pub fn select_one(&self, target: &Kuid) -> Option<Contact> {
        self.select(target, 1, SelectMode::All).into_iter().next()
    }

    /// Up to `count` contacts in ascending XOR distance to `target`.
    ///
    /// Buckets are visited nearest first. Disjoint bucket ranges map to
    /// disjoint distance intervals, so stopping once `count` contacts are
    /// collected yields the global closest set.
    pub fn select(&self, target: &Kuid, count: usize, mode: SelectMode) -> Vec<Contact> {
        if count == 0 {
            return Vec::new();
        }

        let max_failures = self.policy.max_accept_failures;
        let mut rng = rand::thread_rng();
        let mut selected = Vec::with_capacity(count);

        'buckets: for idx in self.buckets_by_proximity(target) {
            for node in self.buckets[idx].select(target, usize::MAX) {
                if selected.len() >= count {
                    break 'buckets;
                }
                match mode {
                    SelectMode::Alive if !node.is_alive() => continue,
                    SelectMode::AliveWithLocal if !node.is_alive() && !node.is_local() => continue,
                    _ => {}
                }
                if node.is_shutdown() {
                    continue;
                }
                if node.is_dead() {
                    let keep = max_failures.saturating_sub(node.failures()) as f32
                        / max_failures.max(1) as f32;
                    if rng.gen::<f32>() >= keep {
                        continue;
                    }
                }
                selected.push(node.clone());
            }
        }
        selected
    }

    fn buckets_by_proximity(&self, target: &Kuid) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.buckets.len()).collect();
        order.sort_by_key(|&i| self.buckets[i].id().min_distance(target));
        order
    }

    /// Those of the `count` contacts nearest to the local id that have not
    /// been heard from within `window`, nearest first.
    pub fn nearest_stale_contacts(&self, now: Timestamp, window: Duration, count: usize) -> Vec<Contact> {
        let local_id = *self.local_id();
        let mut visited = 0;
        let mut stale = Vec::new();
        for idx in self.buckets_by_proximity(&local_id) {
            for node in self.buckets[idx].select(&local_id, usize::MAX) {
                if visited >= count {
                    return stale;
                }
                if node.is_local() || node.is_shutdown() {
                    continue;
                }
                visited += 1;
                let is_stale = match node.last_seen() {
                    LastSeen::At(ts) => now.since(ts) >= window,
                    LastSeen::Never => true,
                    LastSeen::Priority | LastSeen::Local => false,
                };
                if is_stale {
                    stale.push(node.clone());
                }
            }
        }
        stale
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    /// Random lookup targets for buckets due a refresh, nearest to the local
    /// id first. Every bucket handed out is touched.
    ///
    /// While bootstrapping every bucket except the local one is due; the
    /// bootstrap lookup of the local id covers that one.
    pub fn refresh_ids(&mut self, bootstrapping: bool, now: Timestamp) -> Vec<Kuid> {
        let local_id = *self.local_id();
        let period = self.config.bucket_refresh_period;
        let mut ids = Vec::new();

        for idx in self.buckets_by_proximity(&local_id) {
            let bucket = &mut self.buckets[idx];
            if bootstrapping && bucket.contains(&local_id) {
                continue;
            }
            if bootstrapping || bucket.is_refresh_required(now, period) {
                let id = bucket.id().random_id();
                debug!(bucket = %bucket.id(), target = %id, "bucket needs refresh");
                ids.push(id);
                bucket.touch(now);
            }
        }
        ids
    }

    // =========================================================================
    // PURGE / CLEAR
    // =========================================================================

    /// Apply the given rebuild strategies.
    pub fn purge(&mut self, modes: &[PurgeMode], now: Timestamp) {
        let mut modes = modes.to_vec();
        modes.sort();
        modes.dedup();

        for mode in modes {
            match mode {
                PurgeMode::DropCache => {
                    for bucket in &mut self.buckets {
                        bucket.clear_cache();
                    }
                }
                PurgeMode::PurgeContacts => {
                    let ratio = self.config.max_network_class_ratio;
                    let mut removed = Vec::new();
                    for bucket in &mut self.buckets {
                        let id = bucket.id();
                        removed.extend(bucket.purge(now, ratio).into_iter().map(|node| (id, node)));
                    }
                    debug!(dropped = removed.len(), "purged dead and unconfirmed contacts");
                    for (bucket, node) in removed {
                        self.fire(RouteTableEvent::RemoveContact { bucket, node });
                    }
                }
                PurgeMode::MergeBuckets => self.merge_buckets(now),
                PurgeMode::StateToUnknown => {
                    for bucket in &mut self.buckets {
                        for contact in bucket.contacts_mut() {
                            contact.mark_unknown();
                        }
                    }
                }
            }
        }
    }

    /// Drop every non-local contact not heard from within `elapsed`, then
    /// merge the buckets.
    pub fn purge_stale(&mut self, elapsed: Duration, now: Timestamp) {
        let expired: Vec<Kuid> = self
            .contacts()
            .into_iter()
            .filter(|c| !c.is_local())
            .filter(|c| match c.last_seen() {
                LastSeen::At(ts) => now.since(ts) >= elapsed,
                LastSeen::Never => true,
                LastSeen::Priority | LastSeen::Local => false,
            })
            .map(|c| *c.node_id())
            .collect();

        debug!(removed = expired.len(), "purging stale contacts");
        for node_id in &expired {
            let idx = self.bucket_index(node_id);
            let bucket = self.buckets[idx].id();
            if let Some(node) = self.buckets[idx].remove(node_id) {
                self.fire(RouteTableEvent::RemoveContact { bucket, node });
            }
        }
        self.merge_buckets(now);
    }

    /// Reset to a single bucket holding only the local contact.
    pub fn clear(&mut self) {
        self.init();
        self.fire(RouteTableEvent::Clear);
    }

    fn merge_buckets(&mut self, now: Timestamp) {
        let mut active: Vec<Contact> = self
            .active_contacts()
            .into_iter()
            .filter(|c| !c.is_local())
            .collect();
        active.sort_by_key(|c| (liveness_rank(c), Reverse(c.last_seen())));

        let mut cached = self.cached_contacts();
        cached.sort_by_key(|c| Reverse(c.last_seen()));

        let before = self.buckets.len();
        self.clear();
        for node in active.into_iter().chain(cached) {
            self.add(node, now);
        }

        info!(before, after = self.buckets.len(), "buckets merged");
        self.ensure_partition();
    }

    // =========================================================================
    // INVARIANTS
    // =========================================================================

    /// Verify that the bucket ranges tile the id space without overlap.
    pub fn check_partition(&self) -> Result<(), RoutingError> {
        let first = self.buckets.first().ok_or_else(|| RoutingError::PartitionViolation {
            reason: "no buckets".into(),
        })?;
        if first.id().first() != Kuid::MIN {
            return Err(RoutingError::PartitionViolation {
                reason: format!("first bucket {} does not start at zero", first.id()),
            });
        }

        for pair in self.buckets.windows(2) {
            let (a, b) = (pair[0].id(), pair[1].id());
            let last = a.last();
            if last == Kuid::MAX || next_id(&last) != b.first() {
                return Err(RoutingError::PartitionViolation {
                    reason: format!("{a} and {b} are not adjacent"),
                });
            }
        }

        match self.buckets.last() {
            Some(last) if last.id().last() != Kuid::MAX => Err(RoutingError::PartitionViolation {
                reason: format!("last bucket {} does not end at the top", last.id()),
            }),
            _ => Ok(()),
        }
    }

    /// Fail loudly in debug builds; rebuild from the surviving contacts otherwise.
    fn ensure_partition(&mut self) {
        if let Err(e) = self.check_partition() {
            error!(error = %e, "route table partition corrupted, rebuilding");
            debug_assert!(false, "{e}");

            let survivors: Vec<Contact> = self
                .contacts()
                .into_iter()
                .filter(|c| !c.is_local())
                .collect();
            self.clear();
            for node in survivors {
                self.add(node, Timestamp::ZERO);
            }
        }
    }

    // =========================================================================
    // EFFECTS
    // =========================================================================

    fn fire(&mut self, event: RouteTableEvent) {
        self.pending.events.push(event);
    }

    fn ping_least_recently_seen(&mut self, idx: usize) {
        if let Some(lrs) = self.buckets[idx].least_recently_seen_active().cloned() {
            if !lrs.is_local() {
                self.queue_ping(lrs, PingReason::LeastRecentlySeen);
            }
        }
    }

    fn queue_ping(&mut self, contact: Contact, reason: PingReason) {
        let duplicate = matches!(reason, PingReason::LeastRecentlySeen)
            && self.pending.pings.iter().any(|p| {
                matches!(p.reason, PingReason::LeastRecentlySeen)
                    && p.contact.node_id() == contact.node_id()
            });
        if !duplicate {
            self.pending.pings.push(PingRequest { contact, reason });
        }
    }
}

/// Alive first, then unknown, then dead.
fn liveness_rank(contact: &Contact) -> u8 {
    match contact.state() {
        ContactState::Alive => 0,
        ContactState::Unknown => 1,
        ContactState::Dead => 2,
    }
}

/// IPv4-mapped IPv6 addresses count as IPv4.
fn is_same_address_space(a: &SocketAddr, b: &SocketAddr) -> bool {
    fn is_v4(ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(_) => true,
            IpAddr::V6(v6) => v6.to_ipv4_mapped().is_some(),
        }
    }
    is_v4(a.ip()) == is_v4(b.ip())
}

/// `id + 1`. The caller guarantees `id != Kuid::MAX`.
fn next_id(id: &Kuid) -> Kuid {
    let mut bytes = *id.as_bytes();
    for byte in bytes.iter_mut().rev() {
        let (sum, carry) = byte.overflowing_add(1);
        *byte = sum;
        if !carry {
            break;
        }
    }
    Kuid::new(bytes)
}
