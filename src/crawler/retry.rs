//! Retry ledger with exponential backoff
//!
//! Failed work items wait here until their backoff elapses. The scheduler
//! polls the ledger without blocking and sleeps until
//! [`RetryLedger::next_ready_at`] when nothing else is runnable.

use crate::config::CrawlerConfig;
use crate::frontier::WorkItem;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, warn};

/// Backoff parameters
///
/// The delay before attempt `n` (so the `n - 1`th retry) is
/// `unit * base^(n - 1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    pub backoff_base: f64,
    pub unit: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 2.0,
            unit: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            unit: config.backoff_unit(),
            max_delay: config.max_backoff(),
        }
    }

    /// Whether an item on its `attempt`th try may still be scheduled
    pub fn allows(&self, attempt: u32) -> bool {
        attempt.saturating_sub(1) <= self.max_retries
    }

    /// Backoff delay for an item about to make its `attempt`th try
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(1024) as i32;
        let secs = self.unit.as_secs_f64() * self.backoff_base.powi(exponent);

        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

/// Result of offering a failed item to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The item will become ready at `not_before`
    Scheduled { attempt: u32, not_before: Instant },
    /// The item used up its retries and was dropped
    Exhausted { attempts: u32 },
}

#[derive(Debug)]
struct Pending {
    not_before: Instant,
    seq: u64,
    item: WorkItem,
}

// Earliest not-before first; offer order breaks ties.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .not_before
            .cmp(&self.not_before)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Pending {}

/// Failed work items waiting out their backoff
#[derive(Debug)]
pub struct RetryLedger {
    policy: RetryPolicy,
    pending: Mutex<BinaryHeap<Pending>>,
    sequence: AtomicU64,
}

impl RetryLedger {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            pending: Mutex::new(BinaryHeap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Schedules `item` for another try, or drops it for good
    ///
    /// `item.attempt` is the attempt the item would make next. Items within
    /// the retry allowance get `not_before = now + delay_for(attempt)`;
    /// anything beyond it is logged as a terminal failure and discarded.
    pub fn offer(&self, item: WorkItem, reason: &str) -> RetryOutcome {
        let attempt = item.attempt;

        if !self.policy.allows(attempt) {
            let attempts = attempt.saturating_sub(1);
            error!(
                url = %item.url,
                attempts,
                reason,
                "giving up on URL after exhausting retries"
            );
            return RetryOutcome::Exhausted { attempts };
        }

        let delay = self.policy.delay_for(attempt);
        let not_before = Instant::now() + delay;
        warn!(
            url = %item.url,
            attempt,
            delay_ms = delay.as_millis() as u64,
            reason,
            "scheduling retry"
        );

        let seq = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        self.lock().push(Pending {
            not_before,
            seq,
            item,
        });

        RetryOutcome::Scheduled {
            attempt,
            not_before,
        }
    }

    /// Yields ready items, earliest not-before first, removing each as it goes
    ///
    /// Readiness is judged against the moment of the call. The iterator never
    /// blocks and takes the lock once per item, so it may be dropped midway
    /// without losing anything.
    pub fn drain_ready(&self) -> impl Iterator<Item = WorkItem> + '_ {
        let now = Instant::now();
        std::iter::from_fn(move || self.pop_ready(now))
    }

    /// Removes the earliest item if it is ready at `now`
    pub fn pop_ready(&self, now: Instant) -> Option<WorkItem> {
        let mut pending = self.lock();
        if pending.peek()?.not_before <= now {
            pending.pop().map(|p| p.item)
        } else {
            None
        }
    }

    /// Earliest not-before among waiting items
    pub fn next_ready_at(&self) -> Option<Instant> {
        self.lock().peek().map(|p| p.not_before)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BinaryHeap<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
