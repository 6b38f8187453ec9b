//! Robots.txt cache entries with expiry

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// Cached robots.txt data for one origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,

    /// How long the entry stays fresh
    pub ttl: Duration,
}

impl CachedRobots {
    /// Freshness of a successfully fetched (or confirmed missing) robots.txt
    pub fn default_ttl() -> Duration {
        Duration::hours(24)
    }

    /// Freshness of the allow-all placeholder stored after a failed fetch
    pub fn failure_ttl() -> Duration {
        Duration::minutes(5)
    }

    /// Creates an entry stamped now, valid for [`CachedRobots::default_ttl`]
    pub fn new(content: ParsedRobots) -> Self {
        Self::with_ttl(content, Self::default_ttl())
    }

    pub fn with_ttl(content: ParsedRobots, ttl: Duration) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
            ttl,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age() > self.ttl
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.content.is_allowed(url, user_agent)
    }
}
