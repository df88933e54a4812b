//! Tests for RoutingService

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::*;
use crate::domain::{
    AddOutcome, Contact, EventType, Kuid, PurgeMode, RouteTableEvent, RoutingConfig, SelectMode,
    Timestamp,
};
use crate::ports::{ContactPinger, PingError, RouteTableApi, RouteTableListener, TimeSource};
use crate::test_utils::ManualTimeSource;

fn make_node_id(val: u8) -> Kuid {
    let mut bytes = [0u8; 20];
    bytes[0] = val;
    Kuid::new(bytes)
}

fn addr_for(val: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, val, 1], 3000))
}

fn make_service(local: u8) -> (RoutingService, Arc<ManualTimeSource>) {
    let clock = Arc::new(ManualTimeSource::new(Timestamp::from_secs(1_000)));
    let service = RoutingService::new(
        make_node_id(local),
        SocketAddr::from(([10, 255, 255, 1], 3000)),
        &RoutingConfig::for_testing(),
        clock.clone(),
    );
    (service, clock)
}

fn live(val: u8, clock: &ManualTimeSource) -> Contact {
    Contact::live(make_node_id(val), addr_for(val), None, clock.now())
}

/// Let spawned ping tasks run to completion.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Answers for every node except those listed as silent.
struct ScriptedPinger {
    clock: Arc<ManualTimeSource>,
    silent: Mutex<HashSet<Kuid>>,
    calls: AtomicUsize,
}

impl ScriptedPinger {
    fn new(clock: Arc<ManualTimeSource>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            silent: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn silence(&self, node_id: Kuid) {
        self.silent.lock().insert(node_id);
    }
}

#[async_trait]
impl ContactPinger for ScriptedPinger {
    async fn ping(&self, contact: &Contact) -> Result<Contact, PingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.silent.lock().contains(contact.node_id()) {
            return Err(PingError::Timeout {
                node_id: *contact.node_id(),
                address: contact.contact_address(),
            });
        }
        Ok(Contact::live(
            *contact.node_id(),
            contact.contact_address(),
            None,
            self.clock.now(),
        ))
    }
}

/// Records event types and calls back into the service for every event.
struct ReentrantListener {
    service: RoutingService,
    seen: Mutex<Vec<(EventType, usize)>>,
}

impl RouteTableListener for ReentrantListener {
    fn handle_route_table_event(&self, event: &RouteTableEvent) {
        // Would deadlock if events were dispatched under the table lock.
        let size = self.service.size();
        self.seen.lock().push((event.event_type(), size));
    }
}

// =============================================================================
// Event dispatch
// =============================================================================

#[test]
fn test_listeners_run_after_lock_is_released() {
    let (service, clock) = make_service(0xFF);
    let listener = Arc::new(ReentrantListener {
        service: service.clone(),
        seen: Mutex::new(Vec::new()),
    });
    service.add_listener(listener.clone());

    assert_eq!(service.add(live(0x10, &clock)), AddOutcome::Added);
    service.clear();

    let seen = listener.seen.lock().clone();
    assert_eq!(
        seen,
        vec![(EventType::AddActiveContact, 2), (EventType::Clear, 1)]
    );
}

// =============================================================================
// Inbound API
// =============================================================================

#[test]
fn test_api_round_trip() {
    let (service, clock) = make_service(0xFF);
    for val in [0x10, 0x20, 0x30, 0x90] {
        service.add(live(val, &clock));
    }

    assert_eq!(service.size(), 5);
    assert_eq!(service.buckets().len(), 2);
    assert_eq!(service.contacts().len(), 5);
    assert!(service.get(&make_node_id(0x20)).is_some());
    assert!(service.check_partition().is_ok());

    let nearest = service.select(&make_node_id(0x11), 2, SelectMode::Alive);
    let ids: Vec<Kuid> = nearest.iter().map(|c| *c.node_id()).collect();
    assert_eq!(ids, vec![make_node_id(0x10), make_node_id(0x30)]);
    assert_eq!(
        service.select_one(&make_node_id(0xFE)).map(|c| *c.node_id()),
        Some(make_node_id(0xFF))
    );

    service.purge(&[PurgeMode::StateToUnknown]);
    assert!(service.select(&make_node_id(0x11), 10, SelectMode::Alive).is_empty());
}

#[test]
fn test_failures_go_through_the_service_clock() {
    let (service, clock) = make_service(0xFF);
    service.add(live(0x10, &clock));
    clock.advance(Duration::from_secs(7));

    service.handle_failure(&make_node_id(0x10), addr_for(0x10));
    let contact = service.get(&make_node_id(0x10));
    assert_eq!(contact.and_then(|c| c.last_failed()), Some(clock.now()));
}

#[test]
fn test_snapshots_do_not_alias_the_table() {
    let (service, clock) = make_service(0xFF);
    service.add(live(0x10, &clock));

    let mut copy = service.get(&make_node_id(0x10)).unwrap();
    copy.mark_unknown();
    assert!(service.get(&make_node_id(0x10)).is_some_and(|c| c.is_alive()));
}

// =============================================================================
// Pings
// =============================================================================

#[test]
fn test_pings_are_dropped_without_a_pinger() {
    let (service, clock) = make_service(0x42);
    service.add(live(0x10, &clock));
    clock.advance(Duration::from_secs(60));

    let moved = Contact::live(make_node_id(0x10), addr_for(0x99), None, clock.now());
    assert_eq!(service.add(moved), AddOutcome::SpoofCheck);
    assert_eq!(
        service.get(&make_node_id(0x10)).map(|c| c.contact_address()),
        Some(addr_for(0x10))
    );
}

#[tokio::test]
async fn test_ping_without_pinger_is_an_error() {
    let (service, clock) = make_service(0x42);
    let contact = live(0x10, &clock);
    let err = service.ping(&contact).await.unwrap_err();
    assert!(matches!(err, PingError::Transport(_)));
}

#[tokio::test]
async fn test_ping_success_refreshes_contact() {
    let (service, clock) = make_service(0x42);
    let pinger = ScriptedPinger::new(clock.clone());
    service.set_pinger(pinger.clone());
    service.add(live(0x10, &clock));

    clock.advance(Duration::from_secs(30));
    let contact = service.get(&make_node_id(0x10)).unwrap();
    let responder = service.ping(&contact).await.unwrap();

    assert_eq!(responder.node_id(), &make_node_id(0x10));
    assert_eq!(
        service.get(&make_node_id(0x10)).map(|c| c.last_seen()),
        Some(crate::domain::LastSeen::At(clock.now()))
    );
}

#[tokio::test]
async fn test_ping_timeout_counts_as_failure() {
    let (service, clock) = make_service(0x42);
    let pinger = ScriptedPinger::new(clock.clone());
    pinger.silence(make_node_id(0x10));
    service.set_pinger(pinger.clone());
    service.add(live(0x10, &clock));

    let contact = service.get(&make_node_id(0x10)).unwrap();
    assert!(service.ping(&contact).await.is_err());
    assert_eq!(service.get(&make_node_id(0x10)).map(|c| c.failures()), Some(1));
}

#[tokio::test]
async fn test_spoof_check_timeout_installs_candidate() {
    let (service, clock) = make_service(0x42);
    let pinger = ScriptedPinger::new(clock.clone());
    pinger.silence(make_node_id(0x10));
    service.set_pinger(pinger.clone());
    service.add(live(0x10, &clock));

    clock.advance(Duration::from_secs(60));
    let moved = Contact::live(make_node_id(0x10), addr_for(0x99), None, clock.now());
    assert_eq!(service.add(moved), AddOutcome::SpoofCheck);
    settle().await;

    assert_eq!(pinger.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        service.get(&make_node_id(0x10)).map(|c| c.contact_address()),
        Some(addr_for(0x99))
    );
}

#[tokio::test]
async fn test_spoof_check_answer_keeps_existing() {
    let (service, clock) = make_service(0x42);
    let pinger = ScriptedPinger::new(clock.clone());
    service.set_pinger(pinger.clone());
    service.add(live(0x10, &clock));

    clock.advance(Duration::from_secs(60));
    let moved = Contact::live(make_node_id(0x10), addr_for(0x99), None, clock.now());
    assert_eq!(service.add(moved), AddOutcome::SpoofCheck);
    settle().await;

    let stored = service.get(&make_node_id(0x10)).unwrap();
    assert_eq!(stored.contact_address(), addr_for(0x10));
    assert_eq!(stored.last_seen(), crate::domain::LastSeen::At(clock.now()));
}
