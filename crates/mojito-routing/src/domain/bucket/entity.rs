//! The bucket entity: active contacts, replacement cache and network counter.

use std::time::Duration;

use super::counter::ClassfulNetworkCounter;
use super::id::BucketId;
use crate::domain::{Contact, Kuid, Timestamp};

/// A leaf of the routing trie.
///
/// # Invariants
///
/// - `active.len() <= max_active` and `cache.len() <= max_cache`
/// - every contact's id lies in `id`'s range
/// - a node id is either active or cached, never both
/// - `counter` counts exactly the active contacts
///
/// The replacement cache is kept in least-recently-seen first order; the last
/// element is the most recently seen.
#[derive(Debug, Clone)]
pub struct Bucket {
    id: BucketId,
    max_active: usize,
    max_cache: usize,
    active: Vec<Contact>,
    cache: Vec<Contact>,
    counter: ClassfulNetworkCounter,
    touched: Option<Timestamp>,
}

impl Bucket {
    pub fn new(id: BucketId, max_active: usize, max_cache: usize, network_class_mask: u32) -> Self {
        Self {
            id,
            max_active,
            max_cache,
            active: Vec::with_capacity(max_active),
            cache: Vec::new(),
            counter: ClassfulNetworkCounter::new(network_class_mask),
            touched: None,
        }
    }

    // ===== Identity =====

    pub fn id(&self) -> BucketId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.id.depth()
    }

    pub fn contains(&self, node_id: &Kuid) -> bool {
        self.id.contains(node_id)
    }

    /// Too far below the point where the local id diverges from this bucket.
    pub fn is_too_deep(&self, local_id: &Kuid, depth_limit: usize) -> bool {
        let common = local_id.common_prefix_len(self.id.prefix()).min(self.depth());
        self.depth() - common >= depth_limit
    }

    /// Sibling of the local bucket (the subtree one level up from it).
    pub fn is_in_smallest_subtree(&self, local_id: &Kuid, local_bucket_depth: usize) -> bool {
        let common = local_id.common_prefix_len(self.id.prefix()).min(self.depth());
        local_bucket_depth.checked_sub(1) == Some(common)
    }

    // ===== Timestamps =====

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.touched
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.touched = Some(now);
    }

    /// Never touched, or untouched for at least `period`.
    pub fn is_refresh_required(&self, now: Timestamp, period: Duration) -> bool {
        match self.touched {
            None => true,
            Some(ts) => now.since(ts) >= period,
        }
    }

    /// Time since the last touch; `None` if never touched.
    pub fn idle_time(&self, now: Timestamp) -> Option<Duration> {
        self.touched.map(|ts| now.since(ts))
    }

    // ===== Lookup =====

    pub fn get(&self, node_id: &Kuid) -> Option<&Contact> {
        self.get_active(node_id).or_else(|| self.get_cached(node_id))
    }

    pub fn get_active(&self, node_id: &Kuid) -> Option<&Contact> {
        self.active.iter().find(|c| c.node_id() == node_id)
    }

    pub fn get_cached(&self, node_id: &Kuid) -> Option<&Contact> {
        self.cache.iter().find(|c| c.node_id() == node_id)
    }

    pub fn contains_active(&self, node_id: &Kuid) -> bool {
        self.get_active(node_id).is_some()
    }

    pub fn contains_cached(&self, node_id: &Kuid) -> bool {
        self.get_cached(node_id).is_some()
    }

    pub fn active_contacts(&self) -> &[Contact] {
        &self.active
    }

    /// Cached contacts, least recently seen first.
    pub fn cached_contacts(&self) -> &[Contact] {
        &self.cache
    }

    pub fn active_size(&self) -> usize {
        self.active.len()
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn max_active_size(&self) -> usize {
        self.max_active
    }

    pub fn max_cache_size(&self) -> usize {
        self.max_cache
    }

    pub fn is_active_full(&self) -> bool {
        self.active.len() >= self.max_active
    }

    pub fn is_cache_full(&self) -> bool {
        self.cache.len() >= self.max_cache
    }

    pub fn counter(&self) -> &ClassfulNetworkCounter {
        &self.counter
    }

    pub fn least_recently_seen_active(&self) -> Option<&Contact> {
        self.active.iter().min_by_key(|c| c.last_seen())
    }

    pub fn most_recently_seen_active(&self) -> Option<&Contact> {
        self.active.iter().max_by_key(|c| c.last_seen())
    }

    pub fn least_recently_seen_cached(&self) -> Option<&Contact> {
        self.cache.first()
    }

    pub fn most_recently_seen_cached(&self) -> Option<&Contact> {
        self.cache.last()
    }

    /// Active contacts ordered by XOR distance to `target`, at most `count`.
    pub fn select(&self, target: &Kuid, count: usize) -> Vec<&Contact> {
        let mut sorted: Vec<&Contact> = self.active.iter().collect();
        sorted.sort_by_key(|c| c.node_id().xor(target));
        sorted.truncate(count);
        sorted
    }

    /// Whether the network-class gate admits `contact` as active.
    pub fn is_okay_to_add(&self, contact: &Contact, ratio: f32) -> bool {
        self.counter.is_okay_to_add(contact, self.max_active, ratio)
    }

    // ===== Mutation =====

    /// Insert into the active list. The caller checks capacity and duplicates.
    pub fn add_active(&mut self, contact: Contact, now: Timestamp) {
        debug_assert!(self.contains(contact.node_id()));
        debug_assert!(!self.is_active_full());
        debug_assert!(!self.contains_active(contact.node_id()));

        if contact.is_alive() {
            self.touch(now);
        }
        self.counter.add(&contact);
        self.active.push(contact);
    }

    /// Insert into the replacement cache as most recently seen.
    ///
    /// A full cache evicts its least recently seen entry, which is returned.
    pub fn add_cached(&mut self, contact: Contact) -> Option<Contact> {
        debug_assert!(self.contains(contact.node_id()));

        if self.max_cache == 0 {
            return Some(contact);
        }

        if let Some(pos) = self.cache.iter().position(|c| c.node_id() == contact.node_id()) {
            self.cache.remove(pos);
        }

        let evicted = if self.is_cache_full() {
            Some(self.cache.remove(0))
        } else {
            None
        };
        self.cache.push(contact);
        evicted
    }

    /// Replace the entry with the same node id in place. A cached entry moves
    /// to the most recently seen position. Returns the replaced contact.
    pub fn update_contact(&mut self, contact: Contact) -> Option<Contact> {
        if let Some(pos) = self.active.iter().position(|c| c.node_id() == contact.node_id()) {
            self.counter.remove(&self.active[pos]);
            self.counter.add(&contact);
            return Some(std::mem::replace(&mut self.active[pos], contact));
        }

        let pos = self.cache.iter().position(|c| c.node_id() == contact.node_id())?;
        let old = self.cache.remove(pos);
        self.cache.push(contact);
        Some(old)
    }

    /// Mutable access to an active or cached contact.
    pub fn get_mut(&mut self, node_id: &Kuid) -> Option<&mut Contact> {
        if let Some(pos) = self.active.iter().position(|c| c.node_id() == node_id) {
            return self.active.get_mut(pos);
        }
        self.cache.iter_mut().find(|c| c.node_id() == node_id)
    }

    pub fn remove_active(&mut self, node_id: &Kuid) -> Option<Contact> {
        let pos = self.active.iter().position(|c| c.node_id() == node_id)?;
        let removed = self.active.remove(pos);
        self.counter.remove(&removed);
        Some(removed)
    }

    pub fn remove_cached(&mut self, node_id: &Kuid) -> Option<Contact> {
        let pos = self.cache.iter().position(|c| c.node_id() == node_id)?;
        Some(self.cache.remove(pos))
    }

    /// Remove from either list.
    pub fn remove(&mut self, node_id: &Kuid) -> Option<Contact> {
        self.remove_active(node_id)
            .or_else(|| self.remove_cached(node_id))
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Drop dead and never-confirmed contacts, then backfill the freed slots
    /// with alive cached contacts, most recently seen first.
    ///
    /// Backfill goes through the network-class gate at `ratio`; alive
    /// candidates it turns away stay cached. Other cached entries visited
    /// during backfill are consumed. Returns the contacts dropped from the
    /// active list.
    pub fn purge(&mut self, now: Timestamp, ratio: f32) -> Vec<Contact> {
        let (keep, dropped): (Vec<Contact>, Vec<Contact>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|c| c.is_local() || !(c.is_dead() || (c.is_unknown() && !c.has_been_confirmed())));

        self.counter.clear();
        for contact in keep {
            self.counter.add(&contact);
            self.active.push(contact);
        }

        let mut passed_over = Vec::new();
        while !self.is_active_full() {
            let Some(candidate) = self.cache.pop() else {
                break;
            };
            if !candidate.is_alive() {
                continue;
            }
            if self.counter.is_okay_to_add(&candidate, self.max_active, ratio) {
                self.add_active(candidate, now);
            } else {
                passed_over.push(candidate);
            }
        }
        // Popped newest first; they are still newer than what is left.
        passed_over.reverse();
        self.cache.extend(passed_over);

        dropped
    }

    /// Mutable iteration over active and cached contacts.
    ///
    /// Callers must not change a contact's address through this, the network
    /// counter would drift.
    pub fn contacts_mut(&mut self) -> impl Iterator<Item = &mut Contact> {
        self.active.iter_mut().chain(self.cache.iter_mut())
    }

    /// The two children along bit `depth`, with active and cached contacts
    /// redistributed. `None` if the bucket is already at full depth.
    pub fn split(&self) -> Option<(Bucket, Bucket)> {
        let (left_id, right_id) = self.id.split()?;
        let mask = self.counter.mask();

        let mut left = Bucket::new(left_id, self.max_active, self.max_cache, mask);
        let mut right = Bucket::new(right_id, self.max_active, self.max_cache, mask);
        left.touched = self.touched;
        right.touched = self.touched;

        for contact in &self.active {
            let child = if right.contains(contact.node_id()) { &mut right } else { &mut left };
            child.counter.add(contact);
            child.active.push(contact.clone());
        }
        for contact in &self.cache {
            let child = if right.contains(contact.node_id()) { &mut right } else { &mut left };
            child.cache.push(contact.clone());
        }

        Some((left, right))
    }
}
