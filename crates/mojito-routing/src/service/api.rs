use std::net::SocketAddr;

use crate::domain::{AddOutcome, Bucket, Contact, ContactState, Kuid, PurgeMode, SelectMode};
use crate::ports::RouteTableApi;
use crate::service::RoutingService;

impl RouteTableApi for RoutingService {
    fn add(&self, contact: Contact) -> AddOutcome {
        self.mutate(|table, now| table.add(contact, now))
    }

    fn handle_failure(&self, node_id: &Kuid, address: SocketAddr) -> Option<ContactState> {
        self.mutate(|table, now| table.handle_failure(node_id, address, now))
    }

    fn get(&self, node_id: &Kuid) -> Option<Contact> {
        self.read(|table| table.get(node_id).cloned())
    }

    fn select(&self, target: &Kuid, count: usize, mode: SelectMode) -> Vec<Contact> {
        self.read(|table| table.select(target, count, mode))
    }

    fn buckets(&self) -> Vec<Bucket> {
        self.read(|table| table.buckets().to_vec())
    }

    fn contacts(&self) -> Vec<Contact> {
        self.read(|table| table.contacts())
    }

    fn purge(&self, modes: &[PurgeMode]) {
        self.mutate(|table, now| table.purge(modes, now));
    }

    fn size(&self) -> usize {
        self.read(|table| table.size())
    }
}
