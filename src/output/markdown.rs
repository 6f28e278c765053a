//! Markdown report generation
//!
//! This module renders a finished crawl and its audit as a human-readable
//! markdown document: run information, statistics, broken links, orphaned
//! pages and empty pages.

use crate::crawler::CrawlResult;
use crate::output::report::AuditReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Maximum rows listed per section before truncating
const MAX_ROWS: usize = 100;

/// Writes the markdown report for a crawl to a file
///
/// # Arguments
///
/// * `result` - The finished crawl
/// * `report` - Audit built from `result`
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(std::io::Error)` - Failed to create or write the file
pub fn write_markdown_report(
    result: &CrawlResult,
    report: &AuditReport,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_report(result, report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl and its audit as markdown
pub fn format_markdown_report(result: &CrawlResult, report: &AuditReport) -> String {
    let mut md = String::new();
    let stats = &result.stats;

    md.push_str("# Link Audit Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    if let Some(seed) = &result.config.seed_url {
        md.push_str(&format!("- **Seed**: {}\n", seed));
    }
    if !result.config.manual_pages.is_empty() {
        md.push_str(&format!(
            "- **Manual Pages**: {}\n",
            result.config.manual_pages.len()
        ));
    }
    md.push_str(&format!("- **Started**: {}\n", result.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", result.finished_at.to_rfc3339()));
    let duration = result.duration_seconds();
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        duration,
        duration as f64 / 60.0
    ));
    md.push_str(&format!("- **Status**: {}\n", result.status));
    match &result.robots {
        Some(robots) => {
            md.push_str(&format!(
                "- **robots.txt**: {} allow / {} disallow rules",
                robots.allow.len(),
                robots.disallow.len()
            ));
            if let Some(delay) = robots.crawl_delay {
                md.push_str(&format!(", crawl-delay {}s", delay));
            }
            md.push('\n');
        }
        None => md.push_str("- **robots.txt**: not found\n"),
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Crawled**: {}\n", stats.crawled_pages));
    md.push_str(&format!("- **Pages Discovered**: {}\n", stats.total_pages));
    md.push_str(&format!("- **Errors**: {}\n", stats.error_count));
    md.push_str(&format!("- **Skipped Rediscoveries**: {}\n", result.skipped_count));
    md.push_str(&format!("- **Sitemap URLs**: {}\n", result.sitemap_urls.len()));
    md.push_str(&format!(
        "- **Average Response Time**: {:.0}ms\n\n",
        stats.avg_response_ms
    ));

    // Audit summary
    md.push_str("## Audit Summary\n\n");
    md.push_str("| Finding | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Broken links | {} |\n", report.broken.len()));
    md.push_str(&format!("| Orphaned pages | {} |\n", report.orphaned.len()));
    md.push_str(&format!("| Empty pages | {} |\n\n", report.empty.len()));

    if !report.broken.is_empty() {
        md.push_str("## Broken Links\n\n");
        md.push_str("| URL | Status | Error | Linked From |\n");
        md.push_str("|-----|--------|-------|-------------|\n");

        for broken in report.broken.iter().take(MAX_ROWS) {
            let status = if broken.status == 0 {
                "-".to_string()
            } else {
                broken.status.to_string()
            };
            let referrers = if broken.referrers.is_empty() {
                "(seed or sitemap)".to_string()
            } else {
                broken.referrers.join("<br>")
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                broken.url,
                status,
                escape_cell(broken.error.as_deref().unwrap_or("")),
                referrers
            ));
        }
        push_truncation(&mut md, report.broken.len());
    }

    push_url_list(&mut md, "Orphaned Pages", &report.orphaned);
    push_url_list(&mut md, "Empty Pages", &report.empty);

    if report.is_clean() {
        md.push_str("No broken, orphaned or empty pages found.\n");
    }

    md
}

fn push_url_list(md: &mut String, title: &str, urls: &[String]) {
    if urls.is_empty() {
        return;
    }
    md.push_str(&format!("## {}\n\n", title));
    for url in urls.iter().take(MAX_ROWS) {
        md.push_str(&format!("- {}\n", url));
    }
    push_truncation(md, urls.len());
}

fn push_truncation(md: &mut String, total: usize) {
    if total > MAX_ROWS {
        md.push_str(&format!("\n... and {} more\n\n", total - MAX_ROWS));
    } else {
        md.push('\n');
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
