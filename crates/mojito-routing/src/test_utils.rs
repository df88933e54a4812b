//! Test utilities for the routing core.
//!
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use mojito_routing::test_utils::ManualTimeSource;
//! use mojito_routing::ports::TimeSource;
//! use mojito_routing::domain::Timestamp;
//!
//! let clock = ManualTimeSource::new(Timestamp::from_secs(100));
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now(), Timestamp::from_secs(105));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::domain::Timestamp;
use crate::ports::outbound::TimeSource;

/// A clock that only moves when told to.
///
/// Thread-safe, so one instance can be shared between a service and the test
/// driving it.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    millis: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis()),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.millis.store(now.as_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let now = self.now().add(by);
        self.set(now);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}
