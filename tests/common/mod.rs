//! Fake collaborators shared by the integration tests
//!
//! `FakeWeb` is a scripted link graph: fetching a URL returns its own URL as
//! the body, and the extractor looks the links up in the graph.

#![allow(dead_code)]

use async_trait::async_trait;
use ripple_crawl::crawler::{
    CaptchaPolicy, Collaborators, FetchedPage, Fetcher, LinkExtractor, PassthroughExpander,
    RetryPolicy, RobotsPolicy, SessionSettings,
};
use ripple_crawl::output::{MemoryReporter, OutputError, OutputResult, PageRecord, Reporter};
use ripple_crawl::robots::AllowAll;
use ripple_crawl::FetchError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct FakeWeb {
    links: HashMap<String, Vec<String>>,
    failures: Mutex<HashMap<String, u32>>,
    panics: Mutex<HashSet<String>>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(mut self, from: &str, to: &[&str]) -> Self {
        self.links
            .entry(from.to_string())
            .or_default()
            .extend(to.iter().map(|s| s.to_string()));
        self
    }

    /// The next `times` fetches of `url` fail with a 503
    pub fn fail(self, url: &str, times: u32) -> Self {
        self.failures.lock().unwrap().insert(url.to_string(), times);
        self
    }

    /// The next fetch of `url` panics
    pub fn panic_once(self, url: &str) -> Self {
        self.panics.lock().unwrap().insert(url.to_string());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|u| *u == url).count()
    }

    /// Most fetches ever running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeWeb {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.panics.lock().unwrap().remove(url) {
            panic!("scripted panic for {}", url);
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(FetchError::Status(503));
                }
            }
        }

        Ok(FetchedPage {
            url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            html: url.to_string(),
            title: None,
            snippet: String::new(),
        })
    }
}

impl LinkExtractor for FakeWeb {
    fn extract_links(&self, _html: &str, base_url: &str) -> Vec<String> {
        self.links.get(base_url).cloned().unwrap_or_default()
    }
}

/// Denies every URL whose path contains `/private`
pub struct DenyPrivate;

#[async_trait]
impl RobotsPolicy for DenyPrivate {
    async fn is_allowed(&self, url: &str) -> bool {
        !url.contains("/private")
    }
}

/// Fails the first `failures` reports, then stores records in memory
pub struct FlakyReporter {
    failures: AtomicUsize,
    pub inner: MemoryReporter,
}

impl FlakyReporter {
    pub fn new(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            inner: MemoryReporter::new(),
        }
    }
}

impl Reporter for FlakyReporter {
    fn report(&self, record: &PageRecord) -> OutputResult<()> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(OutputError::Write("disk full".to_string()));
        }
        self.inner.report(record)
    }
}

pub fn collaborators(web: Arc<FakeWeb>, reporter: Arc<dyn Reporter>) -> Collaborators {
    Collaborators {
        fetcher: web.clone(),
        expander: Arc::new(PassthroughExpander),
        captcha: Arc::new(CaptchaPolicy::Skip),
        extractor: web,
        robots: Arc::new(AllowAll),
        reporter,
    }
}

/// Settings with short timings so sessions finish quickly
pub fn settings(max_depth: u32, concurrency_cap: usize, interval_ms: u64) -> SessionSettings {
    SessionSettings {
        max_depth,
        concurrency_cap,
        min_domain_interval: Duration::from_millis(interval_ms),
        retry: RetryPolicy {
            max_retries: 3,
            backoff_base: 2.0,
            unit: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        },
        fetch_timeout: Duration::from_secs(2),
    }
}

pub fn seeds(urls: &[&str]) -> Vec<String> {
    urls.iter().map(|s| s.to_string()).collect()
}
