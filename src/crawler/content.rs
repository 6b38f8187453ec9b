//! Content hooks run between fetching and link extraction
//!
//! Dynamic content expansion is a pass-through extension point. CAPTCHA
//! handling only observes pages: a suspected challenge can be snapshotted to
//! disk for later review, but it never changes what the pipeline does next.

use crate::config::{CaptchaConfig, CaptchaMode};
use crate::crawler::collaborators::{CaptchaDetector, ContentExpander};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace, warn};

/// Returns the HTML it is given
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughExpander;

#[async_trait]
impl ContentExpander for PassthroughExpander {
    async fn expand(&self, url: &str, html: String) -> String {
        trace!(url = %url, "no dynamic content expansion configured");
        html
    }
}

/// Markers that identify common CAPTCHA and bot-challenge pages
const CAPTCHA_MARKERS: &[&str] = &[
    "g-recaptcha",
    "recaptcha/api.js",
    "h-captcha",
    "hcaptcha.com",
    "cf-challenge",
    "cf-turnstile",
    "captcha",
];

/// Whether the HTML looks like a CAPTCHA challenge
pub fn looks_like_captcha(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    CAPTCHA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// What happens when a CAPTCHA is detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaPolicy {
    /// Log at debug level and move on
    Skip,
    /// Save the page HTML under `dir` for later review
    Snapshot { dir: PathBuf },
    /// Reserved for an external solving service; none is integrated
    ExternalSolver,
}

impl CaptchaPolicy {
    pub fn from_config(config: &CaptchaConfig) -> Self {
        match config.mode {
            CaptchaMode::Skip => CaptchaPolicy::Skip,
            CaptchaMode::Snapshot => CaptchaPolicy::Snapshot {
                dir: config.snapshot_dir.clone(),
            },
            CaptchaMode::Solver => CaptchaPolicy::ExternalSolver,
        }
    }
}

impl CaptchaDetector for CaptchaPolicy {
    fn detect(&self, html: &str, url: &str) -> bool {
        if !looks_like_captcha(html) {
            return false;
        }

        match self {
            CaptchaPolicy::Skip => {
                debug!(url = %url, "CAPTCHA suspected, skipping handling");
            }
            CaptchaPolicy::Snapshot { dir } => match save_snapshot(dir, url, html) {
                Ok(path) => info!(url = %url, path = %path.display(), "saved CAPTCHA snapshot"),
                Err(e) => error!(url = %url, error = %e, "failed to save CAPTCHA snapshot"),
            },
            CaptchaPolicy::ExternalSolver => {
                warn!(url = %url, "CAPTCHA suspected but no solver is integrated");
            }
        }

        true
    }
}

/// File name for a snapshot: `<utc timestamp>_<url without scheme, '/' as '_'>.html`
pub fn snapshot_file_name(url: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let safe: String = stripped
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{}_{}.html", timestamp, safe)
}

fn save_snapshot(dir: &Path, url: &str, html: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(snapshot_file_name(url));
    std::fs::write(&path, html)?;
    Ok(path)
}
