/// Checks if a host matches a domain pattern
///
/// `example.com` matches only itself. `*.example.com` matches the bare
/// domain and any subdomain at any depth.
///
/// ```
/// use ripple_crawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "docs.example.com"));
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || (host.len() > base.len()
                    && host.ends_with(base)
                    && host.as_bytes()[host.len() - base.len() - 1] == b'.')
        }
        None => host == pattern,
    }
}

/// Returns true if the host matches any of the patterns
pub fn matches_any(patterns: &[String], host: &str) -> bool {
    patterns.iter().any(|p| matches_wildcard(p, host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        assert!(matches_wildcard("example.com", "example.com"));
        assert!(!matches_wildcard("example.com", "www.example.com"));
    }

    #[test]
    fn test_wildcard_nested_subdomain() {
        assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
    }

    #[test]
    fn test_wildcard_requires_label_boundary() {
        assert!(!matches_wildcard("*.example.com", "badexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.org"));
    }

    #[test]
    fn test_matches_any() {
        let patterns = vec!["a.test".to_string(), "*.b.test".to_string()];
        assert!(matches_any(&patterns, "a.test"));
        assert!(matches_any(&patterns, "x.b.test"));
        assert!(!matches_any(&patterns, "c.test"));
        assert!(!matches_any(&[], "a.test"));
    }
}
