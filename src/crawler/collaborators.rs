//! Narrow interfaces between the scheduler and the outside world
//!
//! The pipeline only ever talks to these traits. Production implementations
//! live in the fetcher, parser, content and robots modules; tests substitute
//! scripted fakes.

use crate::config::Config;
use crate::crawler::content::{CaptchaPolicy, PassthroughExpander};
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::parser::HtmlLinkExtractor;
use crate::output::{build_reporter, Reporter};
use crate::robots::{AllowAll, HttpRobotsPolicy};
use crate::{CrawlError, FetchError};
use async_trait::async_trait;
use std::sync::Arc;

/// A successfully fetched HTML page
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// URL as requested
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    pub status: u16,
    pub html: String,
    pub title: Option<String>,
    pub snippet: String,
}

/// Retrieves a page
///
/// Every error is transient from the scheduler's point of view; whether the
/// URL is tried again is up to the retry ledger.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Expands dynamically generated content
///
/// Must be idempotent and may not fail; an expander that cannot do its job
/// returns the HTML it was given.
#[async_trait]
pub trait ContentExpander: Send + Sync {
    async fn expand(&self, url: &str, html: String) -> String;
}

/// Looks for CAPTCHA challenges
///
/// Purely observational. The return value is recorded, never acted on.
pub trait CaptchaDetector: Send + Sync {
    fn detect(&self, html: &str, url: &str) -> bool;
}

/// Finds outgoing links
///
/// Returns absolute URLs with no duplicates within one call.
pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, html: &str, base_url: &str) -> Vec<String>;
}

/// Decides whether a URL may be crawled
///
/// Implementations fail open: if the policy cannot be determined the URL is
/// allowed.
#[async_trait]
pub trait RobotsPolicy: Send + Sync {
    async fn is_allowed(&self, url: &str) -> bool;
}

/// The full set of collaborators a session works with
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub expander: Arc<dyn ContentExpander>,
    pub captcha: Arc<dyn CaptchaDetector>,
    pub extractor: Arc<dyn LinkExtractor>,
    pub robots: Arc<dyn RobotsPolicy>,
    pub reporter: Arc<dyn Reporter>,
}

impl Collaborators {
    /// Builds the production collaborators described by `config`
    ///
    /// The reporter opens its output file here, so configuration problems
    /// surface before any request is made.
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config.user_agent, config.crawler.fetch_timeout())?;

        let robots: Arc<dyn RobotsPolicy> = if config.robots.enabled {
            Arc::new(HttpRobotsPolicy::new(
                fetcher.client().clone(),
                config.user_agent.crawler_name.clone(),
            ))
        } else {
            Arc::new(AllowAll)
        };

        Ok(Self {
            fetcher: Arc::new(fetcher),
            expander: Arc::new(PassthroughExpander),
            captcha: Arc::new(CaptchaPolicy::from_config(&config.captcha)),
            extractor: Arc::new(HtmlLinkExtractor::from_config(&config.links)?),
            robots,
            reporter: build_reporter(&config.output)?,
        })
    }
}
