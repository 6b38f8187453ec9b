//! Markdown summary generation
//!
//! Writes a human-readable summary of a finished crawl: run metadata,
//! totals, and one row per agent.

use crate::output::stats::CrawlReport;
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of `report` to `output_path`
///
/// Parent directories are created as needed.
pub fn generate_markdown_summary(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport) -> String {
    let totals = &report.totals;
    let mut md = String::new();

    md.push_str("# Ripple-Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        report.duration().as_secs_f64()
    ));
    md.push_str(&format!(
        "- **Status**: {}\n",
        if report.cancelled() { "cancelled" } else { "completed" }
    ));
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push_str(&format!("- **Agents**: {}\n\n", report.sessions.len()));

    md.push_str("## Totals\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Fetched | {} |\n", totals.fetched));
    md.push_str(&format!("| Retried | {} |\n", totals.retried));
    md.push_str(&format!(
        "| Permanently Failed | {} |\n",
        totals.permanently_failed
    ));
    md.push_str(&format!("| Admitted | {} |\n", totals.admitted));
    md.push_str(&format!("| Duplicates | {} |\n", totals.duplicates));
    md.push_str(&format!("| Depth Exceeded | {} |\n", totals.depth_exceeded));
    md.push_str(&format!("| Robots Denied | {} |\n", totals.policy_denied));
    md.push_str(&format!("| CAPTCHA Suspected | {} |\n", totals.captchas));
    md.push_str(&format!(
        "| Report Failures | {} |\n",
        totals.report_failures
    ));
    if totals.abandoned > 0 {
        md.push_str(&format!("| Abandoned | {} |\n", totals.abandoned));
    }
    md.push('\n');

    if !report.sessions.is_empty() {
        md.push_str("## Agents\n\n");
        md.push_str("| Agent | Seeds | Fetched | Retried | Failed | Domains | Elapsed |\n");
        md.push_str("|-------|-------|---------|---------|--------|---------|---------|\n");
        for session in &report.sessions {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {:.1}s |\n",
                session.agent_id,
                session.seeds,
                session.counts.fetched,
                session.counts.retried,
                session.counts.permanently_failed,
                session.domains_visited(),
                session.elapsed.as_secs_f64()
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::stats::{SessionCounts, SessionReport};
    use chrono::Utc;
    use std::time::Duration;

    fn create_test_report() -> CrawlReport {
        let session = SessionReport {
            agent_id: "a1b2c3d4".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            elapsed: Duration::from_millis(1500),
            seeds: 2,
            counts: SessionCounts {
                fetched: 10,
                retried: 2,
                permanently_failed: 1,
                ..SessionCounts::default()
            },
            cancelled: false,
            dispatches: Vec::new(),
        };
        CrawlReport::from_sessions(Utc::now(), vec![session], Some("abc123".to_string()))
    }

    #[test]
    fn test_format_markdown_summary() {
        let md = format_markdown_summary(&create_test_report());

        assert!(md.contains("# Ripple-Crawl Summary"));
        assert!(md.contains("- **Config Hash**: abc123"));
        assert!(md.contains("- **Status**: completed"));
        assert!(md.contains("| Fetched | 10 |"));
        assert!(md.contains("| Permanently Failed | 1 |"));
        assert!(md.contains("| a1b2c3d4 | 2 | 10 | 2 | 1 | 0 | 1.5s |"));
        assert!(!md.contains("Abandoned"));
    }

    #[test]
    fn test_generate_markdown_summary_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.md");

        generate_markdown_summary(&create_test_report(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Ripple-Crawl Summary"));
    }
}
