//! Per-bucket accounting of contacts by network class.
//!
//! Sybil resistance: an attacker controlling one subnet should not be able to
//! fill a bucket. Only IPv4 (and IPv4-mapped IPv6) addresses are classified;
//! the local contact and other address families contribute nothing.

use std::collections::HashMap;
use std::net::IpAddr;

use crate::domain::Contact;

/// Counts active contacts per masked IPv4 prefix.
#[derive(Debug, Clone)]
pub struct ClassfulNetworkCounter {
    mask: u32,
    counts: HashMap<u32, usize>,
}

impl ClassfulNetworkCounter {
    pub fn new(mask: u32) -> Self {
        Self {
            mask,
            counts: HashMap::new(),
        }
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Masked IPv4 prefix of `contact`, if it is counted at all.
    pub fn network_class(&self, contact: &Contact) -> Option<u32> {
        if contact.is_local() {
            return None;
        }
        let v4 = match contact.contact_address().ip() {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(v6) => v6.to_ipv4_mapped()?,
        };
        Some(u32::from(v4) & self.mask)
    }

    /// Count `contact`. Returns the new count of its class.
    pub fn add(&mut self, contact: &Contact) -> usize {
        let Some(class) = self.network_class(contact) else {
            return 0;
        };
        let count = self.counts.entry(class).or_insert(0);
        *count += 1;
        *count
    }

    /// Uncount `contact`. Returns the remaining count of its class.
    pub fn remove(&mut self, contact: &Contact) -> usize {
        let Some(class) = self.network_class(contact) else {
            return 0;
        };
        match self.counts.get_mut(&class) {
            Some(count) if *count > 1 => {
                *count -= 1;
                *count
            }
            Some(_) => {
                self.counts.remove(&class);
                0
            }
            None => 0,
        }
    }

    /// Number of counted contacts sharing `contact`'s class.
    pub fn get(&self, contact: &Contact) -> usize {
        self.network_class(contact)
            .and_then(|class| self.counts.get(&class).copied())
            .unwrap_or(0)
    }

    /// Whether one more contact of `contact`'s class stays within
    /// `max(1, ceil(ratio * capacity))`.
    pub fn is_okay_to_add(&self, contact: &Contact, capacity: usize, ratio: f32) -> bool {
        if ratio >= 1.0 {
            return true;
        }
        let Some(class) = self.network_class(contact) else {
            return true;
        };
        let current = self.counts.get(&class).copied().unwrap_or(0);
        current < Self::limit(capacity, ratio)
    }

    /// Largest number of contacts one class may hold.
    pub fn limit(capacity: usize, ratio: f32) -> usize {
        // Round away float noise (0.1f32 * 20 must give 2, not 3) before ceil.
        let raw = f64::from(ratio) * capacity as f64;
        let raw = (raw * 1e6).round() / 1e6;
        (raw.ceil() as usize).max(1)
    }

    /// Number of distinct classes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum over all classes.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
