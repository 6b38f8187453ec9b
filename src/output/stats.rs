//! Session counters and reports
//!
//! Every session keeps a set of atomic counters that pipeline tasks bump as
//! they go. When the session ends the counters are frozen into a
//! [`SessionCounts`] inside its [`SessionReport`]; the reports of all agents
//! are then combined into a [`CrawlReport`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Live counters of a running session
#[derive(Debug, Default)]
pub struct SessionStats {
    pub admitted: AtomicU64,
    pub fetched: AtomicU64,
    pub retried: AtomicU64,
    pub permanently_failed: AtomicU64,
    pub policy_denied: AtomicU64,
    pub duplicates: AtomicU64,
    pub depth_exceeded: AtomicU64,
    pub report_failures: AtomicU64,
    pub captchas: AtomicU64,
    /// Items released by cancellation while waiting for their throttle slot
    pub abandoned: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionCounts {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        SessionCounts {
            admitted: load(&self.admitted),
            fetched: load(&self.fetched),
            retried: load(&self.retried),
            permanently_failed: load(&self.permanently_failed),
            policy_denied: load(&self.policy_denied),
            duplicates: load(&self.duplicates),
            depth_exceeded: load(&self.depth_exceeded),
            report_failures: load(&self.report_failures),
            captchas: load(&self.captchas),
            abandoned: load(&self.abandoned),
        }
    }
}

/// Frozen counters of a session, or the sum over several sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounts {
    /// URLs accepted by the ledger, seeds included
    pub admitted: u64,
    /// Pages fetched and fully processed
    pub fetched: u64,
    /// Retries scheduled
    pub retried: u64,
    /// URLs dropped after exhausting their retries
    pub permanently_failed: u64,
    /// Links refused by robots.txt
    pub policy_denied: u64,
    /// Links already admitted
    pub duplicates: u64,
    /// Links beyond the depth limit
    pub depth_exceeded: u64,
    /// Pages whose record could not be written
    pub report_failures: u64,
    /// Pages that looked like a CAPTCHA challenge
    pub captchas: u64,
    /// Work left queued, throttled or waiting for a retry when the session
    /// was cancelled
    pub abandoned: u64,
}

impl AddAssign for SessionCounts {
    fn add_assign(&mut self, other: Self) {
        self.admitted += other.admitted;
        self.fetched += other.fetched;
        self.retried += other.retried;
        self.permanently_failed += other.permanently_failed;
        self.policy_denied += other.policy_denied;
        self.duplicates += other.duplicates;
        self.depth_exceeded += other.depth_exceeded;
        self.report_failures += other.report_failures;
        self.captchas += other.captchas;
        self.abandoned += other.abandoned;
    }
}

/// One dispatch as seen by the throttle gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub url: String,
    pub domain: String,
    pub depth: u32,
    pub attempt: u32,
    /// Dispatch start recorded by the throttle gate
    pub dispatched_at: Instant,
}

/// Outcome of one agent's session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub agent_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Seeds handed to the session
    pub seeds: usize,
    pub counts: SessionCounts,
    /// The session stopped because it was cancelled, not at quiescence
    pub cancelled: bool,
    /// Every dispatch in the order the throttle gate released them
    pub dispatches: Vec<DispatchRecord>,
}

impl SessionReport {
    /// Dispatches grouped by domain, each group in dispatch order
    pub fn dispatches_by_domain(&self) -> BTreeMap<&str, Vec<&DispatchRecord>> {
        let mut grouped: BTreeMap<&str, Vec<&DispatchRecord>> = BTreeMap::new();
        for record in &self.dispatches {
            grouped.entry(record.domain.as_str()).or_default().push(record);
        }
        for records in grouped.values_mut() {
            records.sort_by_key(|r| r.dispatched_at);
        }
        grouped
    }

    /// Number of distinct domains dispatched to
    pub fn domains_visited(&self) -> usize {
        self.dispatches_by_domain().len()
    }
}

/// Combined outcome of every agent in a crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sessions: Vec<SessionReport>,
    pub totals: SessionCounts,
    /// Hash of the configuration file, when the crawl was started from one
    pub config_hash: Option<String>,
}

impl CrawlReport {
    pub fn from_sessions(
        started_at: DateTime<Utc>,
        sessions: Vec<SessionReport>,
        config_hash: Option<String>,
    ) -> Self {
        let mut totals = SessionCounts::default();
        for session in &sessions {
            totals += session.counts;
        }

        Self {
            started_at,
            finished_at: Utc::now(),
            sessions,
            totals,
            config_hash,
        }
    }

    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn cancelled(&self) -> bool {
        self.sessions.iter().any(|s| s.cancelled)
    }
}

/// Prints crawl totals to stdout
pub fn print_statistics(report: &CrawlReport) {
    let totals = &report.totals;

    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Agents: {}", report.sessions.len());
    println!("  Duration: {:.1}s", report.duration().as_secs_f64());
    if report.cancelled() {
        println!("  Stopped early: cancelled");
    }
    println!();

    println!("Pages:");
    println!("  Fetched: {}", totals.fetched);
    println!("  Retried: {}", totals.retried);
    println!("  Permanently failed: {}", totals.permanently_failed);
    println!();

    println!("Admission:");
    println!("  Admitted: {}", totals.admitted);
    println!("  Duplicates ignored: {}", totals.duplicates);
    println!("  Beyond max depth: {}", totals.depth_exceeded);
    println!("  Denied by robots.txt: {}", totals.policy_denied);
    if totals.abandoned > 0 {
        println!("  Abandoned on cancel: {}", totals.abandoned);
    }
    println!();

    for session in &report.sessions {
        println!(
            "  [{}] {} seeds, {} fetched, {} domains",
            session.agent_id,
            session.seeds,
            session.counts.fetched,
            session.domains_visited()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(domain: &str, offset_ms: u64, base: Instant) -> DispatchRecord {
        DispatchRecord {
            url: format!("{}/x", domain),
            domain: domain.to_string(),
            depth: 0,
            attempt: 1,
            dispatched_at: base + Duration::from_millis(offset_ms),
        }
    }

    fn report(agent: &str, counts: SessionCounts) -> SessionReport {
        SessionReport {
            agent_id: agent.to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            elapsed: Duration::ZERO,
            seeds: 1,
            counts,
            cancelled: false,
            dispatches: Vec::new(),
        }
    }

    #[test]
    fn test_snapshot_reads_counters() {
        let stats = SessionStats::new();
        SessionStats::bump(&stats.fetched);
        SessionStats::bump(&stats.fetched);
        SessionStats::bump(&stats.retried);

        let counts = stats.snapshot();
        assert_eq!(counts.fetched, 2);
        assert_eq!(counts.retried, 1);
        assert_eq!(counts.permanently_failed, 0);
    }

    #[test]
    fn test_totals_sum_sessions() {
        let a = SessionCounts {
            fetched: 3,
            retried: 1,
            ..SessionCounts::default()
        };
        let b = SessionCounts {
            fetched: 4,
            permanently_failed: 2,
            ..SessionCounts::default()
        };

        let crawl = CrawlReport::from_sessions(Utc::now(), vec![report("a", a), report("b", b)], None);
        assert_eq!(crawl.totals.fetched, 7);
        assert_eq!(crawl.totals.retried, 1);
        assert_eq!(crawl.totals.permanently_failed, 2);
        assert!(!crawl.cancelled());
    }

    #[test]
    fn test_dispatches_by_domain() {
        let base = Instant::now();
        let mut session = report("a", SessionCounts::default());
        session.dispatches = vec![
            record("https://a.test", 20, base),
            record("https://b.test", 5, base),
            record("https://a.test", 0, base),
        ];

        let grouped = session.dispatches_by_domain();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["https://a.test"][0].dispatched_at, base);
        assert_eq!(session.domains_visited(), 2);
    }
}
