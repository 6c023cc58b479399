//! CLI output formatting.
//!
//! Each report has a `format_*` function that returns lines (pure, testable)
//! and a `print_*` wrapper that writes them to stdout. Warnings go to stderr.
//!
//! # Output Format
//!
//! ## Assets (streamed while the build runs)
//!
//! ```text
//! css/style.css → css/style.1a2b3c4d.css (unchanged)
//! img/cover.jpg
//!     sm: 700x467 → img/cover.sm.0f0f0f0f.avif
//!     md: 1024x683 → img/cover.md.a1a1a1a1.avif
//! robots-extra.txt (copied)
//! ```
//!
//! ## Build summary
//!
//! ```text
//! Pages
//!     index.html
//!     page/2.html
//!     articles/hola-mundo.html
//!
//! Built 12 articles, 3 listing pages, 9 assets
//! CSP: 'sha256-…'
//! ```

use crate::assets::AssetEvent;
use crate::cache::CacheStatus;
use crate::site::{BuildReport, CheckReport, Warning};

fn status_label(status: CacheStatus) -> &'static str {
    match status {
        CacheStatus::New => "new",
        CacheStatus::Unchanged => "unchanged",
        CacheStatus::Changed => "changed",
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

// ============================================================================
// Assets
// ============================================================================

/// Format a single asset progress event as display lines.
pub fn format_asset_event(event: &AssetEvent) -> Vec<String> {
    match event {
        AssetEvent::Copied { rel } => vec![format!("{} (copied)", rel)],
        AssetEvent::Hashed {
            rel,
            output,
            status,
        } => vec![format!(
            "{} \u{2192} {} ({})",
            rel,
            output,
            status_label(*status)
        )],
        AssetEvent::Image { rel, variants } => {
            let mut lines = vec![rel.clone()];
            for v in variants {
                lines.push(format!(
                    "    {}: {}x{} \u{2192} {}",
                    v.label, v.width, v.height, v.path
                ));
            }
            lines
        }
    }
}

// ============================================================================
// Warnings
// ============================================================================

pub fn format_warning(warning: &Warning) -> String {
    format!("warning: {}", warning)
}

pub fn print_warnings(warnings: &[Warning]) {
    for w in warnings {
        eprintln!("{}", format_warning(w));
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Format the build summary: written pages, totals and the CSP hash.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.html_files.is_empty() {
        lines.push("Pages".to_string());
        for file in &report.html_files {
            lines.push(format!("    {}", file));
        }
        lines.push(String::new());
    }
    lines.push(format!(
        "Built {}, {}, {}",
        plural(report.articles, "article"),
        plural(report.pages, "listing page"),
        plural(report.assets, "asset")
    ));
    if let Some(csp) = &report.csp {
        lines.push(format!("CSP: {}", csp.snippet_hash));
    }
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
    print_warnings(&report.warnings);
}

pub fn format_check_report(report: &CheckReport) -> Vec<String> {
    vec![format!(
        "Found {}, {}, {}",
        plural(report.articles, "article"),
        plural(report.pages, "listing page"),
        plural(report.assets, "asset")
    )]
}

pub fn print_check_report(report: &CheckReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
    print_warnings(&report.warnings);
}
