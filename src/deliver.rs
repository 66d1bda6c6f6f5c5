//! Delivery selection: find today's day-files, route each to its channel,
//! hand the text to the transport.
//!
//! Each invocation is stateless: no retries across runs, no memory of what
//! was sent. One bad message degrades the run but never stops it.

use std::path::Path;

use anyhow::Result;
use chrono::{NaiveDate, Utc};

use crate::slack::Poster;
use crate::store::{format_file_date, scan};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped_empty: usize,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }
}

/// "Today" for delivery purposes. UTC, matching the cron environment the
/// bot runs in.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Deliver every day-file under `root` matching `date`.
pub async fn run(
    root: &Path,
    date: NaiveDate,
    poster: &dyn Poster,
    default_channel: Option<&str>,
) -> Result<DeliveryReport> {
    let mut report = DeliveryReport::default();

    let files = scan::scan_for_day(root, date);
    if files.is_empty() {
        tracing::info!("No messages found for today ({})", format_file_date(date));
        return Ok(report);
    }
    tracing::info!(
        "Found {} message file(s) for {}",
        files.len(),
        format_file_date(date)
    );

    for (i, path) in files.iter().enumerate() {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Error reading {}: {e}", path.display());
                report.failed += 1;
                continue;
            }
        };
        let content = content.trim();
        if content.is_empty() {
            tracing::warn!("Empty message file: {}", path.display());
            report.skipped_empty += 1;
            continue;
        }

        let Some(channel) = scan::resolve_channel(path, root, default_channel) else {
            tracing::error!(
                "No destination channel for {} (no folder override, no default)",
                path.display()
            );
            report.failed += 1;
            continue;
        };

        tracing::info!(
            "Posting message {} of {}: {}",
            i + 1,
            files.len(),
            preview(content)
        );
        match poster.post(content, &channel).await {
            Ok(true) => report.sent += 1,
            Ok(false) => {
                tracing::error!("Failed to post message from {}", path.display());
                report.failed += 1;
            }
            Err(e) => {
                tracing::error!("Transport error for {}: {e}", path.display());
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(100).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
