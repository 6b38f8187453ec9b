use crate::config::PriorityConfig;
use crate::frontier::Priority;
use url::Url;

/// Orders URLs within their domain queue
///
/// Implementations must be cheap and pure: the same URL always scores the
/// same. Lower scores are dispatched first.
pub trait PriorityFunction: Send + Sync {
    fn score(&self, url: &str) -> Priority;
}

/// Scores every URL the same, leaving admission order as the only ordering
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPriority;

impl PriorityFunction for UniformPriority {
    fn score(&self, _url: &str) -> Priority {
        Priority(KeywordPriority::BASELINE)
    }
}

/// Keyword-based priority
///
/// Starts at a baseline of 100. Every boost keyword found in the lowercase
/// path subtracts 20, every penalty keyword adds 20, and a URL longer than
/// the threshold adds 20 once. The score never drops below zero.
#[derive(Debug, Clone)]
pub struct KeywordPriority {
    boost: Vec<String>,
    penalty: Vec<String>,
    long_url_threshold: usize,
}

impl KeywordPriority {
    pub const BASELINE: u32 = 100;
    pub const STEP: u32 = 20;

    pub fn new(config: &PriorityConfig) -> Self {
        Self {
            boost: config.boost_keywords.iter().map(|k| k.to_lowercase()).collect(),
            penalty: config
                .penalty_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            long_url_threshold: config.long_url_threshold,
        }
    }
}

impl Default for KeywordPriority {
    fn default() -> Self {
        Self::new(&PriorityConfig::default())
    }
}

impl PriorityFunction for KeywordPriority {
    fn score(&self, url: &str) -> Priority {
        let path = Url::parse(url)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| url.to_lowercase());

        let boosts = self.boost.iter().filter(|k| path.contains(k.as_str())).count() as u32;
        let penalties = self
            .penalty
            .iter()
            .filter(|k| path.contains(k.as_str()))
            .count() as u32;
        let long = u32::from(url.len() > self.long_url_threshold);

        let score = Self::BASELINE + (penalties + long) * Self::STEP;
        Priority(score.saturating_sub(boosts * Self::STEP))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline() {
        let p = KeywordPriority::default();
        assert_eq!(p.score("https://example.com/about"), Priority(100));
    }

    #[test]
    fn test_boost_keyword() {
        let p = KeywordPriority::default();
        assert_eq!(p.score("https://example.com/docs/intro"), Priority(80));
        assert_eq!(p.score("https://example.com/API/guide"), Priority(60));
    }

    #[test]
    fn test_penalty_keyword() {
        let p = KeywordPriority::default();
        assert_eq!(p.score("https://example.com/privacy"), Priority(120));
        assert_eq!(p.score("https://example.com/legal/terms"), Priority(140));
    }

    #[test]
    fn test_keywords_only_match_path() {
        let p = KeywordPriority::default();
        assert_eq!(p.score("https://docs.example.com/"), Priority(100));
    }

    #[test]
    fn test_long_url_penalty() {
        let p = KeywordPriority::default();
        let url = format!("https://example.com/{}", "a".repeat(120));
        assert_eq!(p.score(&url), Priority(120));
    }

    #[test]
    fn test_floor_at_zero() {
        let config = PriorityConfig {
            boost_keywords: (0..10).map(|i| format!("k{}", i)).collect(),
            penalty_keywords: vec![],
            long_url_threshold: 1000,
        };
        let p = KeywordPriority::new(&config);
        assert_eq!(
            p.score("https://example.com/k0k1k2k3k4k5k6k7k8k9"),
            Priority(0)
        );
    }

    #[test]
    fn test_boosted_sorts_first() {
        let p = KeywordPriority::default();
        assert!(p.score("https://e.com/tutorial") < p.score("https://e.com/blog"));
        assert!(p.score("https://e.com/blog") < p.score("https://e.com/logout"));
    }

    #[test]
    fn test_uniform() {
        assert_eq!(
            UniformPriority.score("https://e.com/docs"),
            UniformPriority.score("https://e.com/terms")
        );
    }
}
