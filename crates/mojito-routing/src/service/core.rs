use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::domain::{
    Contact, ContactPolicy, Kuid, PendingEffects, PingReason, PingRequest, RouteTable,
    RoutingConfig, RoutingError, Timestamp,
};
use crate::ports::{ContactPinger, PingError, RouteTableListener, TimeSource};

/// Thread-safe shell around a [`RouteTable`].
///
/// One coarse lock serializes every table operation. Events and ping requests
/// the table produces are collected while the lock is held and dispatched
/// after it is released, so listeners may call straight back into the service.
///
/// Cloning is cheap and yields a handle to the same table.
///
/// # Example
///
/// ```rust,ignore
/// use mojito_routing::service::RoutingService;
/// use mojito_routing::adapters::SystemTimeSource;
///
/// let service = RoutingService::new(local_id, local_addr, &RoutingConfig::default(),
///     Arc::new(SystemTimeSource::new()));
/// service.set_pinger(Arc::new(my_pinger));
/// service.add(contact);
/// ```
#[derive(Clone)]
pub struct RoutingService {
    inner: Arc<Inner>,
}

struct Inner {
    table: Mutex<RouteTable>,
    policy: ContactPolicy,
    listeners: RwLock<Vec<Arc<dyn RouteTableListener>>>,
    pinger: RwLock<Option<Arc<dyn ContactPinger>>>,
    time_source: Arc<dyn TimeSource>,
}

impl RoutingService {
    /// Create a service around an empty table.
    pub fn new(
        local_id: Kuid,
        local_address: SocketAddr,
        config: &RoutingConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let table = RouteTable::new(
            local_id,
            local_address,
            config.route_table.clone(),
            config.contact.clone(),
        );
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(table),
                policy: config.contact.clone(),
                listeners: RwLock::new(Vec::new()),
                pinger: RwLock::new(None),
                time_source,
            }),
        }
    }

    /// Install the collaborator used for liveness pings.
    ///
    /// Until one is set, ping requests from the table are dropped.
    pub fn set_pinger(&self, pinger: Arc<dyn ContactPinger>) {
        *self.inner.pinger.write() = Some(pinger);
    }

    pub fn add_listener(&self, listener: Arc<dyn RouteTableListener>) {
        self.inner.listeners.write().push(listener);
    }

    pub fn now(&self) -> Timestamp {
        self.inner.time_source.now()
    }

    pub fn local_contact(&self) -> Contact {
        self.read(|table| table.local_node().clone())
    }

    pub fn local_id(&self) -> Kuid {
        self.read(|table| *table.local_id())
    }

    /// Run `f` against the locked table, then dispatch what it produced.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut RouteTable, Timestamp) -> R) -> R {
        let now = self.now();
        let (result, effects) = {
            let mut table = self.inner.table.lock();
            let result = f(&mut *table, now);
            (result, table.take_effects())
        };
        self.dispatch(effects);
        result
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&RouteTable) -> R) -> R {
        f(&*self.inner.table.lock())
    }

    // =========================================================================
    // TABLE OPERATIONS BEYOND THE INBOUND PORT
    // =========================================================================

    pub fn select_one(&self, target: &Kuid) -> Option<Contact> {
        self.read(|table| table.select_one(target))
    }

    /// Lookup targets for buckets due a refresh. Marks them refreshed.
    pub fn refresh_ids(&self, bootstrapping: bool) -> Vec<Kuid> {
        self.mutate(|table, now| table.refresh_ids(bootstrapping, now))
    }

    pub fn nearest_stale_contacts(&self, window: Duration, count: usize) -> Vec<Contact> {
        let now = self.now();
        self.read(|table| table.nearest_stale_contacts(now, window, count))
    }

    pub fn purge_stale(&self, elapsed: Duration) {
        self.mutate(|table, now| table.purge_stale(elapsed, now));
    }

    pub fn clear(&self) {
        self.mutate(|table, _| table.clear());
    }

    pub fn check_partition(&self) -> Result<(), RoutingError> {
        self.read(|table| table.check_partition())
    }

    pub fn bucket_size(&self) -> usize {
        self.read(|table| table.config().k)
    }

    // =========================================================================
    // PINGS
    // =========================================================================

    /// Ping `contact` and record the outcome in the table.
    ///
    /// A response is added as a live contact, anything else counts as a
    /// failure of `contact`.
    pub async fn ping(&self, contact: &Contact) -> Result<Contact, PingError> {
        let result = self.send_ping(contact).await;
        match &result {
            Ok(responder) => {
                let responder = responder.clone();
                self.mutate(|table, now| table.add(responder, now));
            }
            Err(e) => {
                debug!(node_id = %contact.node_id(), error = %e, "ping failed");
                self.record_failure(contact);
            }
        }
        result
    }

    async fn send_ping(&self, contact: &Contact) -> Result<Contact, PingError> {
        let pinger = self
            .inner
            .pinger
            .read()
            .clone()
            .ok_or_else(|| PingError::Transport("no pinger configured".into()))?;

        let timeout = contact.adaptive_timeout(&self.inner.policy);
        match tokio::time::timeout(timeout, pinger.ping(contact)).await {
            Ok(result) => result,
            Err(_) => Err(PingError::Timeout {
                node_id: *contact.node_id(),
                address: contact.contact_address(),
            }),
        }
    }

    fn record_failure(&self, contact: &Contact) {
        let (node_id, address) = (*contact.node_id(), contact.contact_address());
        self.mutate(|table, now| table.handle_failure(&node_id, address, now));
    }

    async fn run_ping_request(&self, request: PingRequest) {
        let PingRequest { contact, reason } = request;
        let result = self.send_ping(&contact).await;

        match (result, reason) {
            (Ok(responder), _) => {
                self.mutate(|table, now| table.add(responder, now));
            }
            (Err(PingError::Timeout { .. }), PingReason::SpoofCheck { candidate }) => {
                debug!(
                    node_id = %contact.node_id(),
                    address = %contact.contact_address(),
                    candidate = %candidate.contact_address(),
                    "existing contact did not answer the spoof check"
                );
                self.mutate(|table, now| {
                    table.handle_failure(contact.node_id(), contact.contact_address(), now);
                    table.resolve_spoof_check(&contact, candidate, now)
                });
            }
            (Err(e), _) => {
                debug!(node_id = %contact.node_id(), error = %e, "ping failed");
                self.record_failure(&contact);
            }
        }
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    fn dispatch(&self, effects: PendingEffects) {
        if effects.is_empty() {
            return;
        }

        if !effects.events.is_empty() {
            let listeners = self.inner.listeners.read().clone();
            for event in &effects.events {
                for listener in &listeners {
                    listener.handle_route_table_event(event);
                }
            }
        }

        for request in effects.pings {
            self.spawn_ping(request);
        }
    }

    fn spawn_ping(&self, request: PingRequest) {
        if self.inner.pinger.read().is_none() {
            debug!(node_id = %request.contact.node_id(), "no pinger configured, ping dropped");
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(node_id = %request.contact.node_id(), "no tokio runtime, ping dropped");
            return;
        };

        let service = self.clone();
        runtime.spawn(async move { service.run_ping_request(request).await });
    }
}

impl std::fmt::Debug for RoutingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingService")
            .field("table", &*self.inner.table.lock())
            .field("listeners", &self.inner.listeners.read().len())
            .finish_non_exhaustive()
    }
}
