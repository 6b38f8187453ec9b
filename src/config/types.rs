use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Ripple-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seed URLs the crawl starts from (depth 0)
    #[serde(default)]
    pub seeds: Vec<String>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub priority: PriorityConfig,

    #[serde(default)]
    pub links: LinkConfig,

    #[serde(default)]
    pub robots: RobotsConfig,

    #[serde(default)]
    pub captcha: CaptchaConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Scheduling and politeness configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from seed URLs
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of concurrent page fetches per session
    #[serde(rename = "max-concurrent-pages-open")]
    pub max_concurrent_pages_open: u32,

    /// Minimum time between dispatches to the same domain (milliseconds)
    #[serde(rename = "min-domain-interval")]
    pub min_domain_interval: u64,

    /// Number of retries after the first failed attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Exponential backoff multiplier
    #[serde(rename = "backoff-base")]
    pub backoff_base: f64,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "backoff-unit")]
    pub backoff_unit: u64,

    /// Upper bound on any single retry delay (milliseconds)
    #[serde(rename = "max-backoff")]
    pub max_backoff: u64,

    /// Per-request fetch timeout (milliseconds)
    #[serde(rename = "fetch-timeout")]
    pub fetch_timeout: u64,

    /// Number of independent agents the seeds are split across
    pub agents: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_concurrent_pages_open: 5,
            min_domain_interval: 1000,
            max_retries: 3,
            backoff_base: 2.0,
            backoff_unit: 1000,
            max_backoff: 300_000,
            fetch_timeout: 10_000,
            agents: 1,
        }
    }
}

impl CrawlerConfig {
    pub fn min_domain_interval(&self) -> Duration {
        Duration::from_millis(self.min_domain_interval)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Full user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Keyword priority scoring
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Path keywords that move a URL ahead in its domain queue
    #[serde(rename = "boost-keywords")]
    pub boost_keywords: Vec<String>,

    /// Path keywords that push a URL back
    #[serde(rename = "penalty-keywords")]
    pub penalty_keywords: Vec<String>,

    /// URLs longer than this are penalized once
    #[serde(rename = "long-url-threshold")]
    pub long_url_threshold: usize,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            boost_keywords: ["docs", "api", "guide", "reference", "tutorial"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            penalty_keywords: ["privacy", "legal", "unsubscribe", "logout", "terms"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            long_url_threshold: 120,
        }
    }
}

/// Link extraction filters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Only follow links whose host equals the page's host
    #[serde(rename = "same-domain-only")]
    pub same_domain_only: bool,

    /// When non-empty, only follow links to hosts matching these patterns
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    /// Drop links carrying a query parameter whose key starts with any of these
    #[serde(rename = "exclude-query-keys")]
    pub exclude_query_keys: Vec<String>,

    /// When non-empty, the path must contain one of these fragments
    #[serde(rename = "include-paths")]
    pub include_paths: Vec<String>,

    /// Drop links whose path contains any of these fragments
    #[serde(rename = "exclude-paths")]
    pub exclude_paths: Vec<String>,

    /// When non-empty, the URL must match one of these regexes
    #[serde(rename = "include-patterns")]
    pub include_patterns: Vec<String>,

    /// Drop links matching any of these regexes
    #[serde(rename = "exclude-patterns")]
    pub exclude_patterns: Vec<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            same_domain_only: true,
            allowed_domains: Vec::new(),
            exclude_query_keys: vec!["utm_".to_string(), "ref".to_string(), "session".to_string()],
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: vec![r"\.pdf$".to_string(), r"\.zip$".to_string()],
        }
    }
}

/// Robots.txt policy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RobotsConfig {
    pub enabled: bool,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// What to do when a page looks like a CAPTCHA challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptchaMode {
    #[default]
    Skip,
    Snapshot,
    Solver,
}

/// CAPTCHA detection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    pub mode: CaptchaMode,

    /// Directory receiving HTML snapshots in `snapshot` mode
    #[serde(rename = "snapshot-dir")]
    pub snapshot_dir: PathBuf,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            mode: CaptchaMode::Skip,
            snapshot_dir: PathBuf::from("data/captcha"),
        }
    }
}

/// Page record output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Json,
    Csv,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Destination file for page records
    pub path: String,

    /// Optional markdown summary written when the crawl ends
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jsonl,
            path: "data/pages.jsonl".to_string(),
            summary_path: None,
        }
    }
}
