//! Multi-agent crawls
//!
//! Seeds are split into disjoint contiguous chunks, one per agent. Every
//! agent runs its own session (own ledger, queues, throttle and retries) on
//! the shared collaborators, so one reporter collects every page.

use crate::crawler::collaborators::Collaborators;
use crate::crawler::scheduler::{short_agent_id, Session, SessionSettings};
use crate::frontier::PriorityFunction;
use crate::output::CrawlReport;
use crate::{CrawlError, Result};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

/// Splits `seeds` into at most `agents` contiguous chunks of near-equal size
///
/// Chunks hold `ceil(len / agents)` seeds, the last one possibly fewer, so
/// no seed is dropped. Fewer chunks than agents come back when there are
/// fewer seeds than agents.
pub fn split_seeds(seeds: &[String], agents: usize) -> Vec<Vec<String>> {
    if seeds.is_empty() {
        return Vec::new();
    }
    let chunk_size = seeds.len().div_ceil(agents.max(1));
    seeds.chunks(chunk_size).map(<[String]>::to_vec).collect()
}

/// Runs one session per seed chunk concurrently and combines their reports
///
/// The reporter is finalized once every agent has finished.
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Every agent ran to quiescence or cancellation
/// * `Err(CrawlError)` - No seeds, an agent task died, or finalizing the
///   output failed
pub async fn run_agents(
    seeds: &[String],
    agents: usize,
    settings: SessionSettings,
    collaborators: Collaborators,
    priority: Arc<dyn PriorityFunction>,
    cancel: CancellationToken,
) -> Result<CrawlReport> {
    let chunks = split_seeds(seeds, agents);
    if chunks.is_empty() {
        return Err(CrawlError::NoSeeds);
    }

    let started_at = Utc::now();
    info!(agents = chunks.len(), seeds = seeds.len(), "starting crawl");

    let handles: Vec<_> = chunks
        .into_iter()
        .map(|chunk| {
            let agent_id = short_agent_id();
            let span = info_span!("agent", id = %agent_id);
            let session = Arc::new(
                Session::new(
                    agent_id,
                    settings.clone(),
                    collaborators.clone(),
                    Arc::clone(&priority),
                )
                .with_cancellation(cancel.child_token()),
            );
            tokio::spawn(async move { session.run(&chunk).await }.instrument(span))
        })
        .collect();

    let mut sessions = Vec::with_capacity(handles.len());
    for joined in join_all(handles).await {
        sessions.push(joined.map_err(|e| CrawlError::Agent(e.to_string()))?);
    }

    collaborators.reporter.finalize()?;

    let report = CrawlReport::from_sessions(started_at, sessions, None);
    info!(
        fetched = report.totals.fetched,
        failed = report.totals.permanently_failed,
        elapsed_secs = report.duration().as_secs_f64(),
        "crawl finished"
    );
    Ok(report)
}
