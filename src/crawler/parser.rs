//! HTML link extraction
//!
//! This module handles pulling candidate links out of HTML:
//! - Links from `<a href>` tags and `<link rel="canonical">`
//! - Resolution against the page URL, with fragments stripped
//! - Filtering by domain, query keys, path fragments and regexes
//! - De-duplication in first-seen order

use crate::config::LinkConfig;
use crate::crawler::collaborators::LinkExtractor;
use crate::url::{extract_host, matches_any};
use crate::ConfigError;
use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::trace;
use url::Url;

/// Extracts every followable link from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links
/// - Anything that is not http(s) after resolution
///
/// `rel="nofollow"` links are followed. The result may contain duplicates.
pub fn parse_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(url);
            }
        }
    }

    links
}

/// Resolves an href against the page URL
///
/// Returns None for links that must never be followed. The fragment of the
/// resolved URL is removed.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut url = base_url.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Configurable filter applied to resolved links
#[derive(Debug, Clone)]
pub struct LinkFilter {
    same_domain_only: bool,
    allowed_domains: Vec<String>,
    exclude_query_keys: Vec<String>,
    include_paths: Vec<String>,
    exclude_paths: Vec<String>,
    include_patterns: Vec<Regex>,
    exclude_patterns: Vec<Regex>,
}

impl LinkFilter {
    /// Builds the filter, compiling patterns case-insensitively
    pub fn from_config(config: &LinkConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            same_domain_only: config.same_domain_only,
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
            exclude_query_keys: config.exclude_query_keys.clone(),
            include_paths: config.include_paths.clone(),
            exclude_paths: config.exclude_paths.clone(),
            include_patterns: compile_patterns(&config.include_patterns)?,
            exclude_patterns: compile_patterns(&config.exclude_patterns)?,
        })
    }

    /// Accepts every link
    pub fn permissive() -> Self {
        Self {
            same_domain_only: false,
            allowed_domains: Vec::new(),
            exclude_query_keys: Vec::new(),
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Whether `link`, found on `page`, should be followed
    pub fn accepts(&self, link: &Url, page: &Url) -> bool {
        let host = extract_host(link).unwrap_or_default();

        if self.same_domain_only && Some(host.as_str()) != extract_host(page).as_deref() {
            return false;
        }

        if !self.allowed_domains.is_empty() && !matches_any(&self.allowed_domains, &host) {
            return false;
        }

        if link.query_pairs().any(|(key, _)| {
            self.exclude_query_keys
                .iter()
                .any(|prefix| key.starts_with(prefix.as_str()))
        }) {
            return false;
        }

        let path = link.path();
        if !self.include_paths.is_empty() && !self.include_paths.iter().any(|p| path.contains(p.as_str())) {
            return false;
        }
        if self.exclude_paths.iter().any(|p| path.contains(p.as_str())) {
            return false;
        }

        let full = link.as_str();
        if !self.include_patterns.is_empty() && !self.include_patterns.iter().any(|r| r.is_match(full)) {
            return false;
        }
        !self.exclude_patterns.iter().any(|r| r.is_match(full))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::InvalidRegex {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}

/// [`LinkExtractor`] over scraper with a [`LinkFilter`]
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    filter: LinkFilter,
}

impl HtmlLinkExtractor {
    pub fn new(filter: LinkFilter) -> Self {
        Self { filter }
    }

    pub fn from_config(config: &LinkConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(LinkFilter::from_config(config)?))
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, html: &str, base_url: &str) -> Vec<String> {
        let Ok(base) = Url::parse(base_url) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let links: Vec<String> = parse_links(html, &base)
            .into_iter()
            .filter(|link| self.filter.accepts(link, &base))
            .map(String::from)
            .filter(|link| seen.insert(link.clone()))
            .collect();

        trace!(url = %base_url, count = links.len(), "extracted links");
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn links(html: &str) -> Vec<String> {
        parse_links(html, &base_url())
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn permissive() -> HtmlLinkExtractor {
        HtmlLinkExtractor::new(LinkFilter::permissive())
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<html><body><a href="https://other.com/page">Link</a></body></html>"#;
        assert_eq!(links(html), vec!["https://other.com/page"]);
    }

    #[test]
    fn test_extract_relative_links() {
        let html = r#"<a href="/other">A</a><a href="sibling">B</a>"#;
        assert_eq!(
            links(html),
            vec!["https://example.com/other", "https://example.com/sibling"]
        );
    }

    #[test]
    fn test_skip_special_schemes() {
        let html = r#"
            <a href="javascript:void(0)">js</a>
            <a href="JavaScript:alert(1)">js</a>
            <a href="mailto:test@example.com">mail</a>
            <a href="tel:+1234567890">tel</a>
            <a href="data:text/html,hi">data</a>
            <a href="ftp://example.com/file">ftp</a>
        "#;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_skip_download_and_fragment_only() {
        let html = r##"<a href="/file.bin" download>dl</a><a href="#section">jump</a>"##;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_fragment_is_stripped() {
        let html = r#"<a href="/guide#install">Guide</a>"#;
        assert_eq!(links(html), vec!["https://example.com/guide"]);
    }

    #[test]
    fn test_follow_nofollow_links() {
        let html = r#"<a href="/page" rel="nofollow">Link</a>"#;
        assert_eq!(links(html), vec!["https://example.com/page"]);
    }

    #[test]
    fn test_extract_canonical_link() {
        let html = r#"<html><head><link rel="canonical" href="https://example.com/canonical" /></head></html>"#;
        assert_eq!(links(html), vec!["https://example.com/canonical"]);
    }

    #[test]
    fn test_extractor_deduplicates_in_order() {
        let html = r##"<a href="/x">1</a><a href="/y">2</a><a href="/x">3</a><a href="/x#top">4</a>"##;
        let found = permissive().extract_links(html, "https://a.test/");
        assert_eq!(found, vec!["https://a.test/x", "https://a.test/y"]);
    }

    #[test]
    fn test_extractor_invalid_base() {
        assert!(permissive()
            .extract_links(r#"<a href="/x">x</a>"#, "not a url")
            .is_empty());
    }

    #[test]
    fn test_same_domain_only() {
        let extractor = HtmlLinkExtractor::from_config(&LinkConfig::default()).unwrap();
        let html = r#"<a href="/local">l</a><a href="https://elsewhere.com/">e</a><a href="https://sub.example.com/">s</a>"#;
        assert_eq!(
            extractor.extract_links(html, "https://example.com/"),
            vec!["https://example.com/local"]
        );
    }

    #[test]
    fn test_allowed_domains() {
        let config = LinkConfig {
            same_domain_only: false,
            allowed_domains: vec!["*.example.com".to_string()],
            ..LinkConfig::default()
        };
        let extractor = HtmlLinkExtractor::from_config(&config).unwrap();
        let html = r#"<a href="https://docs.example.com/">d</a><a href="https://other.org/">o</a>"#;
        assert_eq!(
            extractor.extract_links(html, "https://example.com/"),
            vec!["https://docs.example.com/"]
        );
    }

    #[test]
    fn test_excluded_query_keys() {
        let extractor = HtmlLinkExtractor::from_config(&LinkConfig::default()).unwrap();
        let html = r#"
            <a href="/a?utm_source=x">1</a>
            <a href="/b?session_id=9">2</a>
            <a href="/c?ref=home">3</a>
            <a href="/d?page=2">4</a>
        "#;
        assert_eq!(
            extractor.extract_links(html, "https://example.com/"),
            vec!["https://example.com/d?page=2"]
        );
    }

    #[test]
    fn test_default_excludes_archives() {
        let extractor = HtmlLinkExtractor::from_config(&LinkConfig::default()).unwrap();
        let html = r#"<a href="/paper.PDF">p</a><a href="/src.zip">z</a><a href="/ok">o</a>"#;
        assert_eq!(
            extractor.extract_links(html, "https://example.com/"),
            vec!["https://example.com/ok"]
        );
    }

    #[test]
    fn test_path_filters() {
        let config = LinkConfig {
            include_paths: vec!["/docs".to_string()],
            exclude_paths: vec!["/docs/old".to_string()],
            ..LinkConfig::default()
        };
        let extractor = HtmlLinkExtractor::from_config(&config).unwrap();
        let html = r#"<a href="/docs/new">n</a><a href="/docs/old/x">o</a><a href="/blog">b</a>"#;
        assert_eq!(
            extractor.extract_links(html, "https://example.com/"),
            vec!["https://example.com/docs/new"]
        );
    }

    #[test]
    fn test_include_patterns() {
        let config = LinkConfig {
            include_patterns: vec![r"/v\d+/".to_string()],
            ..LinkConfig::default()
        };
        let extractor = HtmlLinkExtractor::from_config(&config).unwrap();
        let html = r#"<a href="/v2/api">v</a><a href="/latest/api">l</a>"#;
        assert_eq!(
            extractor.extract_links(html, "https://example.com/"),
            vec!["https://example.com/v2/api"]
        );
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let config = LinkConfig {
            include_patterns: vec!["[".to_string()],
            ..LinkConfig::default()
        };
        assert!(HtmlLinkExtractor::from_config(&config).is_err());
    }
}
