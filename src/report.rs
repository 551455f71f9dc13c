use std::fmt::Write;

use chrono::{DateTime, Local};
use serde::Serialize;
use unicode_truncate::UnicodeTruncateStr;

use crate::batch::BatchRun;
use crate::classify::CacheVerdict;
use crate::record::UrlRecord;
use crate::summary::{Summary, summarize};

/// What a run hands back to its caller: the summary, every record, and
/// the completion time attached by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub success: bool,
    pub cancelled: bool,
    pub batches_completed: usize,
    pub batches_planned: usize,
    pub summary: Summary,
    pub results: Vec<UrlRecord>,
    /// ISO 8601
    pub timestamp: String,
}

impl RunReport {
    pub fn new(run: BatchRun, completed_at: DateTime<Local>) -> Self {
        Self {
            success: true,
            cancelled: run.cancelled,
            batches_completed: run.batches_completed,
            batches_planned: run.batches_planned,
            summary: summarize(&run.records),
            results: run.records,
            timestamp: completed_at.to_rfc3339(),
        }
    }
}

pub fn to_fixed_width(input: &str, width: usize) -> String {
    let (truncated, _) = input.unicode_truncate(width);
    format!("{:<width$}", truncated, width = width)
}

fn status_icon(verdict: CacheVerdict) -> &'static str {
    if verdict.is_hit() {
        "✅"
    } else if verdict.is_miss() {
        "🐢"
    } else if verdict == CacheVerdict::Error {
        "❌"
    } else {
        "❔"
    }
}

/// One console line per probed URL.
pub fn console_line(record: &UrlRecord, url_width: usize) -> String {
    let url = to_fixed_width(&record.url, url_width);
    let verdict = to_fixed_width(record.verdict.as_str(), 14);
    match &record.error {
        Some(error) => format!(
            "{} {verdict} {url} Error: {}",
            status_icon(record.verdict),
            error.lines().next().unwrap_or_default()
        ),
        None => format!(
            "{} {verdict} {url} Status: {}, Elapsed: {:.2}ms, X-Cache: {}",
            status_icon(record.verdict),
            record
                .status_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            record.elapsed.as_secs_f64() * 1000.0,
            record.headers.x_cache.as_deref().unwrap_or("N/A"),
        ),
    }
}

pub fn summary_block(summary: &Summary) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Total URLs:        {}", summary.total_urls);
    let _ = writeln!(
        s,
        "Cache hits:        {} ({} confirmed, {} inferred)",
        summary.cache_hits, summary.confirmed_hits, summary.inferred_hits
    );
    let _ = writeln!(
        s,
        "Cache misses:      {} ({} confirmed, {} inferred)",
        summary.cache_misses, summary.confirmed_misses, summary.inferred_misses
    );
    let _ = writeln!(s, "Not cacheable:     {}", summary.not_cacheable);
    let _ = writeln!(s, "Unknown:           {}", summary.unknown);
    let _ = writeln!(s, "Errors:            {}", summary.errors);
    let _ = write!(s, "Cache hit ratio:   {:.2}%", summary.cache_hit_ratio);
    s
}
