//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for page content:
//! - Building the shared client with a descriptive user agent
//! - Classifying failures into [`FetchError`] variants
//! - Pulling the title and a text snippet out of fetched HTML

use crate::config::UserAgentConfig;
use crate::crawler::collaborators::{FetchedPage, Fetcher};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

/// Characters of visible text kept as the page snippet
pub const SNIPPET_LEN: usize = 300;

/// Builds an HTTP client with proper configuration
///
/// The user agent has the form `CrawlerName/Version (+ContactURL; ContactEmail)`.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout applied to every request
///
/// # Example
///
/// ```no_run
/// use ripple_crawl::config::UserAgentConfig;
/// use ripple_crawl::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "RippleCrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
            timeout,
        })
    }

    /// The underlying client, shared with the robots policy
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if error.is_connect() {
            FetchError::Network(format!("connection failed: {}", error))
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Body(e.to_string())
            }
        })?;

        debug!(url = %url, status = status.as_u16(), bytes = html.len(), "fetched page");

        let (title, snippet) = summarize_html(&html);
        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            html,
            title,
            snippet,
        })
    }
}

/// Extracts the page title and a whitespace-collapsed snippet of body text
pub fn summarize_html(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);
    (extract_title(&document), extract_snippet(&document))
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_snippet(document: &Html) -> String {
    let Ok(body) = Selector::parse("body") else {
        return String::new();
    };
    let skip = Selector::parse("script, style, noscript").ok();

    let mut words = Vec::new();
    if let Some(root) = document.select(&body).next() {
        // Text nodes inside script/style/noscript are not visible text.
        let hidden: Vec<_> = skip
            .as_ref()
            .map(|s| root.select(s).map(|e| e.id()).collect())
            .unwrap_or_default();

        for node in root.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            if node.ancestors().any(|a| hidden.contains(&a.id())) {
                continue;
            }
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ").chars().take(SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config(), Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            create_test_config().header_value(),
            "TestCrawler/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_summarize_title() {
        let (title, _) = summarize_html("<html><head><title>  Docs  </title></head></html>");
        assert_eq!(title.as_deref(), Some("Docs"));
    }

    #[test]
    fn test_summarize_missing_title() {
        let (title, _) = summarize_html("<html><head></head><body>hi</body></html>");
        assert!(title.is_none());
    }

    #[test]
    fn test_snippet_collapses_whitespace() {
        let (_, snippet) =
            summarize_html("<html><body><h1>Hello</h1>\n\n  <p>big   world</p></body></html>");
        assert_eq!(snippet, "Hello big world");
    }

    #[test]
    fn test_snippet_skips_scripts() {
        let html = "<html><body><script>var x = 1;</script><p>visible</p>\
                    <style>p { color: red }</style></body></html>";
        let (_, snippet) = summarize_html(html);
        assert_eq!(snippet, "visible");
    }

    #[test]
    fn test_snippet_is_truncated() {
        let html = format!("<html><body><p>{}</p></body></html>", "word ".repeat(200));
        let (_, snippet) = summarize_html(&html);
        assert_eq!(snippet.chars().count(), SNIPPET_LEN);
    }
}
