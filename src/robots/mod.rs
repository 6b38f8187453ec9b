//! Robots.txt handling module
//!
//! Fetches, caches and applies robots.txt per origin. Lookups fail open: a
//! robots.txt that cannot be fetched allows everything, and that verdict is
//! only cached briefly so the file is tried again soon.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use crate::crawler::RobotsPolicy;
use crate::url::domain_key_of;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

/// Policy that allows every URL
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl RobotsPolicy for AllowAll {
    async fn is_allowed(&self, _url: &str) -> bool {
        true
    }
}

/// Robots.txt policy backed by HTTP with a per-origin cache
///
/// Each origin has its own async slot, so concurrent lookups for one origin
/// trigger a single fetch while other origins proceed independently.
pub struct HttpRobotsPolicy {
    client: Client,
    user_agent: String,
    origins: DashMap<String, Arc<Mutex<Option<CachedRobots>>>>,
}

impl HttpRobotsPolicy {
    /// # Arguments
    ///
    /// * `client` - HTTP client used to fetch robots.txt files
    /// * `user_agent` - Product token matched against `User-agent` lines
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            origins: DashMap::new(),
        }
    }

    /// Number of origins with a cache slot
    pub fn cached_origins(&self) -> usize {
        self.origins.len()
    }

    async fn rules_for(&self, origin: &str) -> CachedRobots {
        let slot = self
            .origins
            .entry(origin.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .value()
            .clone();

        let mut cached = slot.lock().await;
        if let Some(entry) = cached.as_ref().filter(|entry| !entry.is_stale()) {
            return entry.clone();
        }

        let entry = self.fetch(origin).await;
        *cached = Some(entry.clone());
        entry
    }

    /// Fetches `origin/robots.txt`
    ///
    /// * 2xx: rules from the body
    /// * other 4xx: no robots.txt, allow all
    /// * 5xx or network failure: allow all, cached only briefly
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, origin: &str) -> CachedRobots {
        let robots_url = format!("{}/robots.txt", origin);

        let response = match self.client.get(&robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(origin = %origin, error = %e, "robots.txt unreachable, allowing all");
                return CachedRobots::with_ttl(ParsedRobots::allow_all(), CachedRobots::failure_ttl());
            }
        };

        let status = response.status();
        if status.is_success() {
            match response.text().await {
                Ok(body) => {
                    debug!(origin = %origin, bytes = body.len(), "loaded robots.txt");
                    CachedRobots::new(ParsedRobots::from_content(&body))
                }
                Err(e) => {
                    warn!(origin = %origin, error = %e, "failed to read robots.txt, allowing all");
                    CachedRobots::with_ttl(ParsedRobots::allow_all(), CachedRobots::failure_ttl())
                }
            }
        } else if status.is_client_error() {
            debug!(origin = %origin, status = status.as_u16(), "no robots.txt");
            CachedRobots::new(ParsedRobots::allow_all())
        } else {
            warn!(origin = %origin, status = status.as_u16(), "robots.txt unavailable, allowing all");
            CachedRobots::with_ttl(ParsedRobots::allow_all(), CachedRobots::failure_ttl())
        }
    }
}

#[async_trait]
impl RobotsPolicy for HttpRobotsPolicy {
    async fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return true;
        };
        let Ok(origin) = domain_key_of(&parsed) else {
            return true;
        };

        let allowed = self.rules_for(&origin).await.is_allowed(url, &self.user_agent);
        if !allowed {
            debug!(url = %url, "disallowed by robots.txt");
        }
        allowed
    }
}
