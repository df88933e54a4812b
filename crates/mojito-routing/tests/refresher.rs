//! Bucket refresher behaviour under paused tokio time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mojito_routing::test_utils::ManualTimeSource;
use mojito_routing::{
    BootstrapError, Bootstrapper, BucketRefresher, Contact, ContactPinger, FindNodeResult, Kuid,
    LastSeen, LookupError, NodeLookup, PingError, RefresherConfig, RouteTableApi, RoutingConfig,
    RoutingService, TimeSource, Timestamp,
};
use parking_lot::Mutex;

fn node(val: u8) -> Kuid {
    let mut bytes = [0u8; 20];
    bytes[0] = val;
    Kuid::new(bytes)
}

fn addr(val: u8) -> SocketAddr {
    SocketAddr::from(([172, 16, val, 3], 6000))
}

/// Records lookups and fails the test if two ever overlap.
#[derive(Default)]
struct SerialLookup {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl NodeLookup for SerialLookup {
    async fn find_node(&self, target: Kuid) -> Result<FindNodeResult, LookupError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(FindNodeResult {
            target,
            contacts: Vec::new(),
            hops: 1,
        })
    }
}

#[derive(Default)]
struct FakeBootstrapper {
    bootstrapped: AtomicBool,
    bootstrapping: AtomicBool,
    seeds: Mutex<Vec<Kuid>>,
}

#[async_trait]
impl Bootstrapper for FakeBootstrapper {
    fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::SeqCst)
    }

    fn is_bootstrapping(&self) -> bool {
        self.bootstrapping.load(Ordering::SeqCst)
    }

    async fn bootstrap(&self, seed: Contact) -> Result<(), BootstrapError> {
        self.seeds.lock().push(*seed.node_id());
        self.bootstrapped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Answers every ping except those to `silent`.
struct Pinger {
    clock: Arc<ManualTimeSource>,
    silent: Vec<Kuid>,
    calls: AtomicUsize,
}

#[async_trait]
impl ContactPinger for Pinger {
    async fn ping(&self, contact: &Contact) -> Result<Contact, PingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.silent.contains(contact.node_id()) {
            return Err(PingError::Timeout {
                node_id: *contact.node_id(),
                address: contact.contact_address(),
            });
        }
        Ok(Contact::live(*contact.node_id(), contact.contact_address(), None, self.clock.now()))
    }
}

struct Harness {
    service: RoutingService,
    clock: Arc<ManualTimeSource>,
    lookup: Arc<SerialLookup>,
    bootstrapper: Arc<FakeBootstrapper>,
    refresher: BucketRefresher,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mojito_routing=debug")
        .with_test_writer()
        .try_init();
}

/// Local id 0xFF with two depth-1 buckets, both stale.
fn harness(config: RefresherConfig) -> Harness {
    init_tracing();
    let clock = Arc::new(ManualTimeSource::new(Timestamp::from_secs(1_000)));
    let service = RoutingService::new(
        node(0xFF),
        SocketAddr::from(([172, 16, 255, 1], 6000)),
        &RoutingConfig::for_testing(),
        clock.clone(),
    );
    for val in [0x10, 0x20, 0x30, 0x90] {
        service.add(Contact::live(node(val), addr(val), None, clock.now()));
        clock.advance(Duration::from_secs(1));
    }
    assert_eq!(service.buckets().len(), 2);
    clock.advance(Duration::from_secs(120));

    let lookup = Arc::new(SerialLookup::default());
    let bootstrapper = Arc::new(FakeBootstrapper::default());
    let refresher = BucketRefresher::new(
        service.clone(),
        lookup.clone(),
        bootstrapper.clone(),
        config,
    );
    Harness {
        service,
        clock,
        lookup,
        bootstrapper,
        refresher,
    }
}

#[tokio::test(start_paused = true)]
async fn test_refresh_pass_runs_lookups_one_at_a_time() {
    let h = harness(RefresherConfig::for_testing());
    h.bootstrapper.bootstrapped.store(true, Ordering::SeqCst);

    h.refresher.run();
    assert!(!h.refresher.is_done());
    // A tick during a running pass must not start a second one.
    h.refresher.run();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.refresher.is_done());
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.lookup.max_in_flight.load(Ordering::SeqCst), 1);

    // Both buckets were just refreshed.
    h.refresher.run();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unbootstrapped_table_bootstraps_from_first_responder() {
    let h = harness(RefresherConfig::for_testing());
    let pinger = Arc::new(Pinger {
        clock: h.clock.clone(),
        silent: vec![node(0x90)],
        calls: AtomicUsize::new(0),
    });
    h.service.set_pinger(pinger.clone());

    h.refresher.run();
    tokio::time::sleep(Duration::from_secs(1)).await;

    // 0x90 was seen last and is tried first.
    assert_eq!(pinger.calls.load(Ordering::SeqCst), 2);
    assert_eq!(*h.bootstrapper.seeds.lock(), vec![node(0x30)]);
    assert_eq!(h.service.get(&node(0x90)).map(|c| c.failures()), Some(1));
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tick_is_skipped_while_bootstrapping() {
    let h = harness(RefresherConfig::for_testing());
    let pinger = Arc::new(Pinger {
        clock: h.clock.clone(),
        silent: Vec::new(),
        calls: AtomicUsize::new(0),
    });
    h.service.set_pinger(pinger.clone());
    h.bootstrapper.bootstrapping.store(true, Ordering::SeqCst);

    h.refresher.run();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(pinger.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 0);
    assert!(h.bootstrapper.seeds.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ping_nearest_pings_stale_contacts_before_the_pass() {
    let config = RefresherConfig {
        ping_nearest: Some(Duration::from_secs(30)),
        ..RefresherConfig::for_testing()
    };
    let h = harness(config);
    let pinger = Arc::new(Pinger {
        clock: h.clock.clone(),
        silent: vec![node(0x90)],
        calls: AtomicUsize::new(0),
    });
    h.service.set_pinger(pinger.clone());
    h.bootstrapper.bootstrapped.store(true, Ordering::SeqCst);

    h.refresher.run();
    tokio::time::sleep(Duration::from_secs(1)).await;

    // All four remote contacts went quiet; k is 4.
    assert_eq!(pinger.calls.load(Ordering::SeqCst), 4);
    let now = h.clock.now();
    for val in [0x10, 0x20, 0x30] {
        let seen = h.service.get(&node(val)).map(|c| c.last_seen());
        assert_eq!(seen, Some(LastSeen::At(now)));
    }
    assert_eq!(h.service.get(&node(0x90)).map(|c| c.failures()), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent_and_stop_cancels_everything() {
    let h = harness(RefresherConfig::for_testing());
    h.bootstrapper.bootstrapped.store(true, Ordering::SeqCst);

    h.refresher.start();
    h.refresher.start();
    assert!(h.refresher.is_started());

    // First tick fires after the initial delay of one second.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 2);

    h.refresher.stop();
    h.refresher.stop();
    assert!(!h.refresher.is_started());
    assert!(h.refresher.is_done());

    // Stale again, but nothing is left to notice.
    h.clock.advance(Duration::from_secs(120));
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_aborts_a_running_pass() {
    let h = harness(RefresherConfig::for_testing());
    h.bootstrapper.bootstrapped.store(true, Ordering::SeqCst);

    h.refresher.run();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 1);

    h.refresher.stop();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 1);
    assert!(h.refresher.is_done());
}

#[test]
fn test_run_outside_a_runtime_is_a_no_op() {
    let h = harness(RefresherConfig::for_testing());
    h.bootstrapper.bootstrapped.store(true, Ordering::SeqCst);

    h.refresher.run();

    assert!(h.refresher.is_done());
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 0);
    // Nothing was handed out, so both buckets are still due.
    assert_eq!(h.service.refresh_ids(false).len(), 2);
}
