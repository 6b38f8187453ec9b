use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Outcome of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting within the depth bound; the URL is now recorded
    Accepted,
    /// The URL was admitted before
    Duplicate,
    /// The URL is deeper than the crawl allows; nothing was recorded
    DepthExceeded,
}

impl Admission {
    pub fn is_accepted(self) -> bool {
        self == Admission::Accepted
    }
}

/// Set of every URL ever admitted during a session
///
/// URLs are compared as exact strings. The set only grows; a new session
/// starts with a new ledger.
#[derive(Debug, Default)]
pub struct UrlLedger {
    seen: Mutex<HashSet<String>>,
}

impl UrlLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `url` at `depth` if it is new and within `max_depth`
    ///
    /// The duplicate check and the insert happen under one lock, so among
    /// concurrent callers offering the same URL exactly one wins.
    pub fn admit(&self, url: &str, depth: u32, max_depth: u32) -> bool {
        self.try_admit(url, depth, max_depth).is_accepted()
    }

    /// Like [`UrlLedger::admit`] but reports why a URL was refused
    ///
    /// The depth check comes first: an over-deep URL is never recorded, so
    /// it stays admissible if it is later found along a shorter path.
    pub fn try_admit(&self, url: &str, depth: u32, max_depth: u32) -> Admission {
        if depth > max_depth {
            return Admission::DepthExceeded;
        }

        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.contains(url) {
            Admission::Duplicate
        } else {
            seen.insert(url.to_string());
            Admission::Accepted
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    /// Number of URLs admitted so far
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_admit_new_url() {
        let ledger = UrlLedger::new();
        assert!(ledger.admit("https://a.test/", 0, 3));
        assert!(ledger.contains("https://a.test/"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let ledger = UrlLedger::new();
        assert!(ledger.admit("https://a.test/x", 1, 3));
        assert_eq!(
            ledger.try_admit("https://a.test/x", 1, 3),
            Admission::Duplicate
        );
        assert!(!ledger.admit("https://a.test/x", 2, 3));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_depth_exceeded_has_no_side_effect() {
        let ledger = UrlLedger::new();
        assert_eq!(
            ledger.try_admit("https://a.test/deep", 4, 3),
            Admission::DepthExceeded
        );
        assert!(ledger.is_empty());

        // Reachable later along a shorter path
        assert!(ledger.admit("https://a.test/deep", 2, 3));
    }

    #[test]
    fn test_depth_equal_to_max_is_allowed() {
        let ledger = UrlLedger::new();
        assert!(ledger.admit("https://a.test/", 3, 3));
    }

    #[test]
    fn test_exact_string_identity() {
        let ledger = UrlLedger::new();
        assert!(ledger.admit("https://a.test/x", 0, 1));
        assert!(ledger.admit("https://a.test/x/", 0, 1));
        assert!(ledger.admit("https://A.test/x", 0, 1));
    }

    #[test]
    fn test_concurrent_admission_single_winner() {
        let ledger = Arc::new(UrlLedger::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.admit("https://a.test/race", 1, 3))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|accepted| *accepted)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(ledger.len(), 1);
    }
}
