//! Crawl frontier
//!
//! The data structures that hold admitted-but-not-yet-dispatched work:
//! - The URL ledger enforcing at-most-once admission and the depth bound
//! - Per-domain priority queues served in a stable round-robin rotation
//! - The pluggable priority function that orders work within a domain

mod ledger;
mod priority;
mod queue;

pub use ledger::{Admission, UrlLedger};
pub use priority::{KeywordPriority, PriorityFunction, UniformPriority};
pub use queue::DomainQueues;

use crate::url::domain_key;
use crate::UrlResult;
use std::fmt;

/// Position of a work item within its domain queue
///
/// Lower values are dispatched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(pub u32);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of crawl work
///
/// Work items are never mutated; a failed item is resubmitted as a new item
/// built with [`WorkItem::next_attempt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// The URL to fetch, exactly as admitted
    pub url: String,

    /// Domain key of `url` (see [`crate::url::domain_key`])
    pub domain: String,

    /// Link distance from the seed (seeds are depth 0)
    pub depth: u32,

    /// 1 for the first try, incremented per retry
    pub attempt: u32,

    pub priority: Priority,
}

impl WorkItem {
    /// Creates a first-attempt work item
    ///
    /// # Returns
    ///
    /// * `Ok(WorkItem)` - The item, with its domain key computed
    /// * `Err(UrlError)` - The URL has no usable authority
    pub fn new(url: impl Into<String>, depth: u32, priority: Priority) -> UrlResult<Self> {
        let url = url.into();
        let domain = domain_key(&url)?;
        Ok(Self {
            url,
            domain,
            depth,
            attempt: 1,
            priority,
        })
    }

    /// The same URL at the same depth, one attempt later
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_is_first_attempt() {
        let item = WorkItem::new("https://a.test/x", 2, Priority(50)).unwrap();
        assert_eq!(item.domain, "https://a.test");
        assert_eq!(item.depth, 2);
        assert_eq!(item.attempt, 1);
        assert_eq!(item.priority, Priority(50));
    }

    #[test]
    fn test_next_attempt_keeps_everything_else() {
        let item = WorkItem::new("https://a.test/x", 1, Priority(7)).unwrap();
        let retry = item.next_attempt().next_attempt();

        assert_eq!(retry.attempt, 3);
        assert_eq!(retry.url, item.url);
        assert_eq!(retry.depth, item.depth);
        assert_eq!(retry.priority, item.priority);
        assert_eq!(item.attempt, 1);
    }

    #[test]
    fn test_new_item_rejects_relative_url() {
        assert!(WorkItem::new("/x", 0, Priority::default()).is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority(10) < Priority(20));
        assert_eq!(Priority::default(), Priority(0));
    }
}
