//! Per-domain politeness gate
//!
//! Consecutive dispatch starts for the same domain are spaced at least the
//! minimum interval apart. Different domains never wait on each other.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Serializes dispatch starts per domain
///
/// Each domain owns an async mutex around the time of its last dispatch.
/// The mutex is held across the politeness sleep, so callers for one domain
/// run the check-sleep-record sequence one at a time, in FIFO order
/// (tokio's mutex is fair).
#[derive(Debug)]
pub struct ThrottleGate {
    min_interval: Duration,
    domains: DashMap<String, Arc<Mutex<Option<Instant>>>>,
}

impl ThrottleGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            domains: DashMap::new(),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until `domain` may be hit again and records the dispatch
    ///
    /// # Returns
    ///
    /// The instant recorded as this dispatch's start. Two values returned for
    /// the same domain are always at least `min_interval` apart.
    #[instrument(skip(self), level = "trace")]
    pub async fn acquire(&self, domain: &str) -> Instant {
        // Clone the entry out so no DashMap shard lock is held across an await.
        let slot = self
            .domains
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .value()
            .clone();

        let mut last = slot.lock().await;
        let ready_at = last.map(|previous| previous + self.min_interval);
        if let Some(ready_at) = ready_at {
            let now = Instant::now();
            if ready_at > now {
                debug!(
                    domain = %domain,
                    delay_ms = (ready_at - now).as_millis() as u64,
                    "applying politeness delay"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let started = ready_at.map_or_else(Instant::now, |at| Instant::now().max(at));
        *last = Some(started);
        started
    }

    /// Number of domains the gate has seen
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }
}
