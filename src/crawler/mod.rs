//! Crawler module: the scheduling core and its collaborators
//!
//! This module contains:
//! - The session scheduler draining the frontier under a concurrency cap
//! - Per-domain politeness throttling and the retry ledger
//! - The per-URL pipeline (fetch, expand, CAPTCHA check, link extraction)
//! - Production collaborators: HTTP fetcher, HTML link extractor, CAPTCHA
//!   handling
//! - Multi-agent crawls splitting the seeds across sessions

mod agents;
mod collaborators;
mod content;
mod fetcher;
mod parser;
pub mod pipeline;
mod retry;
mod scheduler;
mod throttle;

pub use agents::{run_agents, split_seeds};
pub use collaborators::{
    CaptchaDetector, Collaborators, ContentExpander, FetchedPage, Fetcher, LinkExtractor,
    RobotsPolicy,
};
pub use content::{looks_like_captcha, snapshot_file_name, CaptchaPolicy, PassthroughExpander};
pub use fetcher::{build_http_client, summarize_html, HttpFetcher, SNIPPET_LEN};
pub use parser::{parse_links, HtmlLinkExtractor, LinkFilter};
pub use pipeline::{PipelineError, PipelineOutcome};
pub use retry::{RetryLedger, RetryOutcome, RetryPolicy};
pub use scheduler::{run_session, short_agent_id, Session, SessionSettings};
pub use throttle::ThrottleGate;

use crate::config::Config;
use crate::frontier::KeywordPriority;
use crate::output::CrawlReport;
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl described by `config`
///
/// This is the main entry point. It will:
/// 1. Build the production collaborators (opening the output file)
/// 2. Split the seeds across `config.crawler.agents` sessions
/// 3. Drain every session until it is quiescent or `cancel` fires
/// 4. Finalize the output and combine the session reports
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `cancel` - Stops dispatching new work when cancelled
pub async fn crawl(config: &Config, cancel: CancellationToken) -> Result<CrawlReport> {
    let collaborators = Collaborators::from_config(config)?;
    let priority = Arc::new(KeywordPriority::new(&config.priority));

    run_agents(
        &config.seeds,
        config.crawler.agents as usize,
        SessionSettings::from_config(&config.crawler),
        collaborators,
        priority,
        cancel,
    )
    .await
}
