//! Per-URL pipeline
//!
//! fetch → expand → CAPTCHA check → extract links → robots check → admit and
//! enqueue children → report. Any failure along the way, including a panic
//! inside a collaborator, hands the item to the retry ledger with its attempt
//! count bumped. Nothing here can fail the session.

use crate::crawler::retry::RetryOutcome;
use crate::crawler::scheduler::Session;
use crate::frontier::{Admission, WorkItem};
use crate::output::{OutputError, PageRecord, SessionStats};
use crate::FetchError;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use tracing::{debug, warn};

/// Reasons a pipeline run did not complete
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("reporting failed: {0}")]
    Report(#[from] OutputError),

    #[error("pipeline panicked: {0}")]
    Panicked(String),
}

/// What happened to one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Page processed and reported
    Completed { children_admitted: usize },
    /// Failed; another attempt is scheduled
    RetryScheduled,
    /// Failed for the last time
    GaveUp,
}

/// Runs one work item through the pipeline
pub async fn execute(session: &Session, item: WorkItem) -> PipelineOutcome {
    let result = AssertUnwindSafe(process(session, &item))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(PipelineError::Panicked(panic_message(panic.as_ref()))));

    match result {
        Ok(children_admitted) => PipelineOutcome::Completed { children_admitted },
        Err(error) => {
            if matches!(error, PipelineError::Report(_)) {
                SessionStats::bump(&session.stats().report_failures);
            }
            warn!(url = %item.url, attempt = item.attempt, error = %error, "pipeline failed");

            match session.retries().offer(item.next_attempt(), &error.to_string()) {
                RetryOutcome::Scheduled { .. } => {
                    SessionStats::bump(&session.stats().retried);
                    PipelineOutcome::RetryScheduled
                }
                RetryOutcome::Exhausted { .. } => {
                    SessionStats::bump(&session.stats().permanently_failed);
                    PipelineOutcome::GaveUp
                }
            }
        }
    }
}

async fn process(session: &Session, item: &WorkItem) -> Result<usize, PipelineError> {
    let collaborators = session.collaborators();
    let timeout = session.settings().fetch_timeout;

    let page = tokio::time::timeout(timeout, collaborators.fetcher.fetch(&item.url))
        .await
        .map_err(|_| FetchError::Timeout(timeout))??;

    let html = collaborators.expander.expand(&item.url, page.html).await;

    let captcha_detected = collaborators.captcha.detect(&html, &item.url);
    if captcha_detected {
        SessionStats::bump(&session.stats().captchas);
    }

    let base = if page.final_url.is_empty() {
        item.url.as_str()
    } else {
        page.final_url.as_str()
    };
    let links = collaborators.extractor.extract_links(&html, base);

    let child_depth = item.depth + 1;
    let mut children_admitted = 0;
    for link in &links {
        if session.is_cancelled() {
            debug!(url = %item.url, "session cancelled, not admitting further links");
            break;
        }

        if !collaborators.robots.is_allowed(link).await {
            SessionStats::bump(&session.stats().policy_denied);
            continue;
        }

        if session.admit(link, child_depth) == Some(Admission::Accepted) {
            children_admitted += 1;
        }
    }

    let record = PageRecord {
        agent_id: session.agent_id().to_string(),
        url: item.url.clone(),
        final_url: page.final_url,
        depth: item.depth,
        attempt: item.attempt,
        status: page.status,
        title: page.title.unwrap_or_else(|| "Untitled".to_string()),
        snippet: page.snippet,
        links_found: links.len(),
        children_admitted,
        captcha_detected,
        fetched_at: Utc::now(),
    };
    collaborators.reporter.report(&record)?;

    SessionStats::bump(&session.stats().fetched);
    debug!(
        url = %item.url,
        depth = item.depth,
        links = links.len(),
        children = children_admitted,
        "page processed"
    );

    Ok(children_admitted)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let static_str: Box<dyn Any + Send> = Box::new("boom");
        let owned: Box<dyn Any + Send> = Box::new("bang".to_string());
        let other: Box<dyn Any + Send> = Box::new(42u8);

        assert_eq!(panic_message(static_str.as_ref()), "boom");
        assert_eq!(panic_message(owned.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn test_error_display() {
        let error = PipelineError::from(FetchError::Status(503));
        assert_eq!(error.to_string(), "fetch failed: unexpected HTTP status 503");
    }
}
