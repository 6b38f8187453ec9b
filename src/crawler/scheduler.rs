//! Session scheduler
//!
//! A [`Session`] owns one agent's crawl state and drives the dispatch loop:
//! take the next item from the domain rotation (falling back to retries that
//! are due), wait for its domain's throttle slot and run it through the
//! pipeline, never exceeding the concurrency cap. The loop drains
//! continuously and returns once nothing is queued, running or waiting for a
//! retry, or once the session is cancelled and the running work has finished.

use crate::config::CrawlerConfig;
use crate::crawler::collaborators::Collaborators;
use crate::crawler::pipeline::{self, PipelineOutcome};
use crate::crawler::retry::{RetryLedger, RetryPolicy};
use crate::crawler::throttle::ThrottleGate;
use crate::frontier::{Admission, DomainQueues, PriorityFunction, UrlLedger, WorkItem};
use crate::output::{DispatchRecord, SessionReport, SessionStats};
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Tunables of a single session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Deepest link distance from a seed that is still admitted
    pub max_depth: u32,
    /// Maximum number of items in flight at once
    pub concurrency_cap: usize,
    /// Minimum spacing of dispatch starts per domain
    pub min_domain_interval: Duration,
    pub retry: RetryPolicy,
    pub fetch_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            concurrency_cap: config.max_concurrent_pages_open.max(1) as usize,
            min_domain_interval: config.min_domain_interval(),
            retry: RetryPolicy::from_config(config),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// Crawl state of one agent
pub struct Session {
    agent_id: String,
    settings: SessionSettings,
    ledger: UrlLedger,
    queues: DomainQueues,
    throttle: ThrottleGate,
    retries: RetryLedger,
    stats: SessionStats,
    priority: Arc<dyn PriorityFunction>,
    collaborators: Collaborators,
    cancel: CancellationToken,
    dispatches: Mutex<Vec<DispatchRecord>>,
}

impl Session {
    /// A concurrency cap of 0 is raised to 1 so the session can make progress.
    pub fn new(
        agent_id: impl Into<String>,
        mut settings: SessionSettings,
        collaborators: Collaborators,
        priority: Arc<dyn PriorityFunction>,
    ) -> Self {
        settings.concurrency_cap = settings.concurrency_cap.max(1);
        Self {
            agent_id: agent_id.into(),
            ledger: UrlLedger::new(),
            queues: DomainQueues::new(),
            throttle: ThrottleGate::new(settings.min_domain_interval),
            retries: RetryLedger::new(settings.retry),
            stats: SessionStats::new(),
            priority,
            collaborators,
            cancel: CancellationToken::new(),
            dispatches: Mutex::new(Vec::new()),
            settings,
        }
    }

    /// Ties the session to an external cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn retries(&self) -> &RetryLedger {
        &self.retries
    }

    pub fn queues(&self) -> &DomainQueues {
        &self.queues
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Admits `url` at `depth` and queues it on acceptance
    ///
    /// Returns `None` for a URL without a usable authority; such URLs never
    /// reach the ledger.
    pub fn admit(&self, url: &str, depth: u32) -> Option<Admission> {
        let item = match WorkItem::new(url, depth, self.priority.score(url)) {
            Ok(item) => item,
            Err(e) => {
                debug!(url = %url, error = %e, "dropping unusable URL");
                return None;
            }
        };

        let admission = self
            .ledger
            .try_admit(&item.url, depth, self.settings.max_depth);
        match admission {
            Admission::Accepted => {
                SessionStats::bump(&self.stats.admitted);
                self.queues.enqueue(item);
            }
            Admission::Duplicate => SessionStats::bump(&self.stats.duplicates),
            Admission::DepthExceeded => SessionStats::bump(&self.stats.depth_exceeded),
        }
        Some(admission)
    }

    /// Next runnable item: the domain rotation first, then due retries
    fn next_item(&self) -> Option<WorkItem> {
        self.queues
            .dequeue_next()
            .or_else(|| self.retries.pop_ready(Instant::now()))
    }

    fn record_dispatch(&self, record: DispatchRecord) {
        self.dispatches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Seeds the session and drains it
    ///
    /// Seeds are admitted at depth 0; a seed that is not a usable URL is
    /// skipped with a warning.
    pub async fn run(self: Arc<Self>, seeds: &[String]) -> SessionReport {
        let started_at = Utc::now();
        let clock = Instant::now();

        for seed in seeds {
            if self.admit(seed, 0).is_none() {
                warn!(seed = %seed, "skipping invalid seed");
            }
        }
        info!(
            agent = %self.agent_id,
            seeds = seeds.len(),
            queued = self.queues.len(),
            "session started"
        );

        let cancelled = self.drain().await;

        let mut counts = self.stats.snapshot();
        if cancelled {
            counts.abandoned += (self.queues.len() + self.retries.len()) as u64;
        }

        let mut dispatches =
            std::mem::take(&mut *self.dispatches.lock().unwrap_or_else(PoisonError::into_inner));
        dispatches.sort_by_key(|record| record.dispatched_at);

        info!(
            agent = %self.agent_id,
            fetched = counts.fetched,
            failed = counts.permanently_failed,
            cancelled,
            "session finished"
        );

        SessionReport {
            agent_id: self.agent_id.clone(),
            started_at,
            finished_at: Utc::now(),
            elapsed: clock.elapsed(),
            seeds: seeds.len(),
            counts,
            cancelled,
            dispatches,
        }
    }

    /// The dispatch loop
    ///
    /// Returns whether the loop ended because of cancellation.
    async fn drain(self: &Arc<Self>) -> bool {
        let permits = Arc::new(Semaphore::new(self.settings.concurrency_cap));
        let mut in_flight: JoinSet<Option<PipelineOutcome>> = JoinSet::new();
        let mut cancelled = false;
        let mut completed: u64 = 0;

        loop {
            if !cancelled && self.cancel.is_cancelled() {
                cancelled = true;
                info!(
                    agent = %self.agent_id,
                    in_flight = in_flight.len(),
                    "cancellation requested, finishing in-flight work"
                );
            }

            if !cancelled {
                while let Ok(permit) = Arc::clone(&permits).try_acquire_owned() {
                    let Some(item) = self.next_item() else {
                        break;
                    };
                    let session = Arc::clone(self);
                    in_flight.spawn(async move {
                        let _permit = permit;
                        session.dispatch(item).await
                    });
                }
            }

            if in_flight.is_empty() {
                if cancelled {
                    return true;
                }
                if !self.queues.is_empty() {
                    // An enqueue is still landing; look again.
                    tokio::task::yield_now().await;
                    continue;
                }
                match self.retries.next_ready_at() {
                    None => {
                        debug!(agent = %self.agent_id, "frontier quiescent");
                        return false;
                    }
                    Some(ready_at) => {
                        tokio::select! {
                            _ = tokio::time::sleep_until(ready_at) => {}
                            _ = self.cancel.cancelled() => {}
                        }
                        continue;
                    }
                }
            }

            // A due retry only matters if a permit is free to run it.
            let retry_wake = self
                .retries
                .next_ready_at()
                .filter(|_| !cancelled && permits.available_permits() > 0);

            tokio::select! {
                joined = in_flight.join_next() => match joined {
                    Some(Ok(_)) => {
                        completed += 1;
                        if completed % 50 == 0 {
                            let counts = self.stats.snapshot();
                            info!(
                                agent = %self.agent_id,
                                fetched = counts.fetched,
                                queued = self.queues.len(),
                                retrying = self.retries.len(),
                                "progress"
                            );
                        }
                    }
                    Some(Err(e)) => error!(agent = %self.agent_id, error = %e, "dispatch task failed"),
                    None => {}
                },
                _ = sleep_until_some(retry_wake), if retry_wake.is_some() => {}
                _ = self.cancel.cancelled(), if !cancelled => {}
            }
        }
    }

    /// Waits for the item's throttle slot, then runs the pipeline
    ///
    /// Cancellation while waiting drops the item, counts it as abandoned and
    /// returns `None`. A popped item never goes back into its queue.
    async fn dispatch(&self, item: WorkItem) -> Option<PipelineOutcome> {
        let dispatched_at = tokio::select! {
            at = self.throttle.acquire(&item.domain) => at,
            _ = self.cancel.cancelled() => {
                debug!(url = %item.url, "cancelled while throttled");
                SessionStats::bump(&self.stats.abandoned);
                return None;
            }
        };

        self.record_dispatch(DispatchRecord {
            url: item.url.clone(),
            domain: item.domain.clone(),
            depth: item.depth,
            attempt: item.attempt,
            dispatched_at,
        });

        Some(pipeline::execute(self, item).await)
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Runs one session to completion under a fresh agent id
///
/// Convenience wrapper around [`Session`] for callers that do not need to
/// cancel the session.
pub async fn run_session(
    seeds: &[String],
    settings: SessionSettings,
    collaborators: Collaborators,
    priority: Arc<dyn PriorityFunction>,
) -> SessionReport {
    let session = Arc::new(Session::new(
        short_agent_id(),
        settings,
        collaborators,
        priority,
    ));
    session.run(seeds).await
}

/// First eight characters of a random UUID
pub fn short_agent_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = CrawlerConfig {
            max_depth: 2,
            max_concurrent_pages_open: 7,
            min_domain_interval: 250,
            ..CrawlerConfig::default()
        };
        let settings = SessionSettings::from_config(&config);

        assert_eq!(settings.max_depth, 2);
        assert_eq!(settings.concurrency_cap, 7);
        assert_eq!(settings.min_domain_interval, Duration::from_millis(250));
        assert_eq!(settings.retry.max_retries, config.max_retries);
    }

    #[test]
    fn test_short_agent_id() {
        let first = short_agent_id();
        let second = short_agent_id();
        assert_eq!(first.len(), 8);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_sleep_until_none_never_fires() {
        let fired = tokio::time::timeout(Duration::from_millis(20), sleep_until_some(None)).await;
        assert!(fired.is_err());
    }
}
