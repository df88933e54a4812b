use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{Contact, RefresherConfig};
use crate::ports::{Bootstrapper, LookupError, NodeLookup};
use crate::service::RoutingService;

/// Periodic bucket maintenance.
///
/// Every tick either bootstraps the table (when it is not bootstrapped yet)
/// or starts a refresh pass over the buckets that went stale. A pass runs
/// its lookups strictly one after another, and a new pass only starts once
/// the previous one is done.
///
/// ```rust,ignore
/// let refresher = BucketRefresher::new(service.clone(), lookup, bootstrapper, config.refresher);
/// refresher.start();
/// // ...
/// refresher.stop();
/// ```
#[derive(Clone)]
pub struct BucketRefresher {
    inner: Arc<Inner>,
}

struct Inner {
    service: RoutingService,
    lookup: Arc<dyn NodeLookup>,
    bootstrapper: Arc<dyn Bootstrapper>,
    config: RefresherConfig,
    tasks: Mutex<Tasks>,
}

#[derive(Default)]
struct Tasks {
    /// The recurring timer loop
    timer: Option<JoinHandle<()>>,
    /// The current refresh pass
    pass: Option<JoinHandle<()>>,
    /// The current ping-then-bootstrap attempt
    probe: Option<JoinHandle<()>>,
}

fn is_running(handle: &Option<JoinHandle<()>>) -> bool {
    handle.as_ref().is_some_and(|h| !h.is_finished())
}

impl BucketRefresher {
    pub fn new(
        service: RoutingService,
        lookup: Arc<dyn NodeLookup>,
        bootstrapper: Arc<dyn Bootstrapper>,
        config: RefresherConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                lookup,
                bootstrapper,
                config,
                tasks: Mutex::new(Tasks::default()),
            }),
        }
    }

    /// Start the timer. Does nothing if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut tasks = self.inner.tasks.lock();
        if tasks.timer.is_some() {
            return;
        }

        let delay = self.inner.config.delay;
        let initial = if self.inner.config.uniform_jitter {
            let jitter_ms = rand::thread_rng().gen_range(0..delay.as_millis().max(1) as u64);
            delay + Duration::from_millis(jitter_ms)
        } else {
            delay
        };
        info!(delay_ms = delay.as_millis() as u64, initial_ms = initial.as_millis() as u64, "bucket refresher started");

        let inner = Arc::clone(&self.inner);
        tasks.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(initial).await;
            loop {
                inner.tick();
                tokio::time::sleep(delay).await;
            }
        }));
    }

    /// Cancel the timer, the running pass and any bootstrap attempt.
    ///
    /// Idempotent. Remaining refresh ids of an aborted pass are dropped.
    pub fn stop(&self) {
        let mut tasks = self.inner.tasks.lock();
        let was_running = tasks.timer.is_some();
        for handle in [tasks.timer.take(), tasks.pass.take(), tasks.probe.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
        if was_running {
            info!("bucket refresher stopped");
        }
    }

    /// Run one tick now, independent of the timer.
    ///
    /// The tick's work runs on the current tokio runtime. Outside a runtime
    /// the tick is skipped.
    pub fn run(&self) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("no tokio runtime, refresh tick skipped");
            return;
        }
        self.inner.tick();
    }

    /// Whether no refresh pass is in progress.
    pub fn is_done(&self) -> bool {
        !is_running(&self.inner.tasks.lock().pass)
    }

    /// Whether the timer is running.
    pub fn is_started(&self) -> bool {
        self.inner.tasks.lock().timer.is_some()
    }
}

impl Inner {
    fn tick(self: &Arc<Self>) {
        if !self.bootstrapper.is_bootstrapped() {
            if self.bootstrapper.is_bootstrapping() {
                debug!("bootstrap in progress, skipping refresh");
                return;
            }

            let mut tasks = self.tasks.lock();
            if is_running(&tasks.probe) {
                return;
            }
            let inner = Arc::clone(self);
            tasks.probe = Some(tokio::spawn(async move { inner.probe_and_bootstrap().await }));
            return;
        }

        let mut tasks = self.tasks.lock();
        if is_running(&tasks.pass) {
            debug!("previous refresh pass still running");
            return;
        }

        if let Some(window) = self.config.ping_nearest {
            let stale = self
                .service
                .nearest_stale_contacts(window, self.service.bucket_size());
            for contact in stale {
                let service = self.service.clone();
                tokio::spawn(async move {
                    if let Err(e) = service.ping(&contact).await {
                        debug!(node_id = %contact.node_id(), error = %e, "nearest contact did not answer");
                    }
                });
            }
        }

        let inner = Arc::clone(self);
        tasks.pass = Some(tokio::spawn(async move { inner.refresh_pass().await }));
    }

    async fn refresh_pass(&self) {
        let ids = self.service.refresh_ids(false);
        if ids.is_empty() {
            return;
        }
        debug!(count = ids.len(), "refresh pass started");

        for target in ids {
            match self.lookup.find_node(target).await {
                Ok(result) => {
                    debug!(target = %target, found = result.contacts.len(), hops = result.hops, "refresh lookup finished");
                }
                Err(LookupError::Cancelled) => {
                    debug!(target = %target, "refresh lookup cancelled");
                }
                Err(e) => {
                    warn!(target = %target, error = %e, "refresh lookup failed");
                }
            }
        }
        debug!("refresh pass finished");
    }

    /// Ping known contacts until one answers, then bootstrap from it.
    async fn probe_and_bootstrap(&self) {
        let local_id = self.service.local_id();
        let mut candidates: Vec<Contact> = self
            .service
            .read(|table| table.contacts())
            .into_iter()
            .filter(|c| c.node_id() != &local_id && !c.is_shutdown())
            .collect();
        candidates.sort_by_key(|c| std::cmp::Reverse(c.last_seen()));

        for contact in candidates {
            match self.service.ping(&contact).await {
                Ok(seed) => {
                    info!(node_id = %seed.node_id(), address = %seed.contact_address(), "bootstrapping from seed");
                    if let Err(e) = self.bootstrapper.bootstrap(seed).await {
                        warn!(error = %e, "bootstrap failed");
                    }
                    return;
                }
                Err(e) => {
                    debug!(node_id = %contact.node_id(), error = %e, "bootstrap candidate did not answer");
                }
            }
        }
        debug!("no known contact answered, still not bootstrapped");
    }
}
