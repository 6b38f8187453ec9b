//! Robots.txt rule matching on top of the robotstxt crate

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
///
/// Rules are matched on demand by robotstxt's Google-compatible matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
    /// Set when there is no usable robots.txt
    allow_all: bool,
}

impl ParsedRobots {
    /// Wraps raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// A policy that allows everything
    ///
    /// Used for sites without a robots.txt and whenever the file cannot be
    /// fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    pub fn is_allow_all(&self) -> bool {
        self.allow_all
    }

    /// Checks if `url` (absolute) may be fetched by `user_agent`
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}
