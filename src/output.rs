//! Output formatting for tokcount.
//!
//! Renders a [`ScanResult`] as a human-readable summary or as JSON, with
//! per-directory statistics and a pricing estimate.

use std::fmt::Write as _;

use serde::Serialize;
use thiserror::Error;

use crate::aggregate::ROOT_KEY;
use crate::tree::{format_number, percentage};
use crate::walker::ScanResult;

/// Errors that can occur during output formatting.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// USD per million tokens for the pricing estimate.
pub const USD_PER_MILLION_TOKENS: f64 = 20_000.0;

/// Directories listed in the summary before collapsing the rest.
pub const DEFAULT_TOP_LIMIT: usize = 10;

const PRICING_DISCLAIMER: &str =
    "Directional estimate only. Ignore patterns are best-effort and repository-specific.";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable summary (default).
    #[default]
    Summary,
    /// JSON for programmatic access.
    Json,
}

/// Token rollup for one directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryStat {
    /// Directory path with a trailing slash.
    pub path: String,
    pub tokens: usize,
    /// Share of the repository total, in percent.
    pub percentage: f64,
}

/// Pricing estimate derived from the token total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingEstimate {
    pub tokens_millions: f64,
    pub estimate_usd: u64,
    pub disclaimer: String,
}

/// All non-root directories with tokens, largest first (ties by path).
pub fn all_directory_stats(result: &ScanResult) -> Vec<DirectoryStat> {
    if result.total_tokens == 0 {
        return Vec::new();
    }

    let mut stats: Vec<DirectoryStat> = result
        .directory_tokens
        .iter()
        .filter(|(path, tokens)| *path != ROOT_KEY && *tokens > 0)
        .map(|(path, tokens)| DirectoryStat {
            path: format!("{}/", path),
            tokens,
            percentage: percentage(tokens, result.total_tokens),
        })
        .collect();

    stats.sort_by(|a, b| b.tokens.cmp(&a.tokens).then_with(|| a.path.cmp(&b.path)));
    stats
}

/// The `limit` largest directories and how many were left out.
///
/// A limit of zero returns everything.
pub fn top_directory_stats(result: &ScanResult, limit: usize) -> (Vec<DirectoryStat>, usize) {
    let mut all = all_directory_stats(result);
    if limit == 0 || limit >= all.len() {
        return (all, 0);
    }
    let remaining = all.len() - limit;
    all.truncate(limit);
    (all, remaining)
}

/// Estimate cost at [`USD_PER_MILLION_TOKENS`], rounded to the nearest $100.
///
/// # Examples
///
/// ```
/// use tokcount::output::estimate_pricing;
///
/// let estimate = estimate_pricing(1_234_567);
/// assert_eq!(estimate.tokens_millions, 1.23);
/// assert_eq!(estimate.estimate_usd, 24_700);
/// ```
pub fn estimate_pricing(total_tokens: usize) -> PricingEstimate {
    let millions = total_tokens as f64 / 1_000_000.0;
    let raw = millions * USD_PER_MILLION_TOKENS;
    PricingEstimate {
        tokens_millions: round_to(millions, 2),
        estimate_usd: ((raw / 100.0).round() * 100.0) as u64,
        disclaimer: PRICING_DISCLAIMER.to_string(),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Render a scan in the requested format.
pub fn format_output(result: &ScanResult, format: OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Summary => Ok(render_summary(result)),
        OutputFormat::Json => render_json(result),
    }
}

/// Human-readable summary.
pub fn render_summary(result: &ScanResult) -> String {
    let pricing = estimate_pricing(result.total_tokens);
    let (top, remaining) = top_directory_stats(result, DEFAULT_TOP_LIMIT);

    // Writing to a String cannot fail.
    let mut out = String::with_capacity(1024);
    let _ = writeln!(out, "Repository: {}", result.repository.display());
    let _ = writeln!(out, "Tokenizer: {}", result.tokenizer_detail);
    let _ = writeln!(out, "Files scanned: {}", format_number(result.total_files));
    let _ = writeln!(out, "Files ignored: {}", format_number(result.ignored_files));
    out.push('\n');
    let _ = writeln!(
        out,
        "Total: {} tokens (~{} lines)",
        format_number(result.total_tokens),
        format_number(result.total_lines)
    );
    out.push('\n');

    out.push_str("Top token contributors (directories):\n");
    if top.is_empty() {
        out.push_str("  (no directories with counted files)\n");
    } else {
        for row in &top {
            let _ = writeln!(
                out,
                "  {:<22} {:>12} tokens ({:2.0}%)",
                row.path,
                format_number(row.tokens),
                row.percentage
            );
        }
        if remaining > 0 {
            let _ = writeln!(out, "  ... {} more directories", remaining);
        }
    }

    out.push('\n');
    out.push_str("---\n");
    out.push_str("Pricing estimate\n");
    let _ = writeln!(
        out,
        "  Tokens mapped: {} (~{:.2}M)",
        format_number(result.total_tokens),
        pricing.tokens_millions
    );
    let _ = writeln!(
        out,
        "  Estimated cost: ~${} (${} per 1M tokens)",
        format_number(pricing.estimate_usd as usize),
        format_number(USD_PER_MILLION_TOKENS as usize)
    );
    let _ = writeln!(out, "  Disclaimer: {}", pricing.disclaimer);
    out
}

#[derive(Serialize)]
struct JsonPayload<'a> {
    repository: String,
    tokenizer: &'a str,
    total_tokens: usize,
    total_files: usize,
    ignored_files: usize,
    total_lines: usize,
    directories: Vec<DirectoryStat>,
    pricing_estimate: PricingEstimate,
}

/// Pretty-printed JSON.
pub fn render_json(result: &ScanResult) -> Result<String, OutputError> {
    let directories = all_directory_stats(result)
        .into_iter()
        .map(|stat| DirectoryStat {
            percentage: round_to(stat.percentage, 1),
            ..stat
        })
        .collect();

    let payload = JsonPayload {
        repository: result.repository.display().to_string(),
        tokenizer: &result.tokenizer,
        total_tokens: result.total_tokens,
        total_files: result.total_files,
        ignored_files: result.ignored_files,
        total_lines: result.total_lines,
        directories,
        pricing_estimate: estimate_pricing(result.total_tokens),
    };

    Ok(serde_json::to_string_pretty(&payload)?)
}
