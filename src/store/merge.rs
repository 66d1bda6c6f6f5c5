//! Idempotent merging of rendered messages into a day-file.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use super::MessageStore;

/// What `write_day_file` did to the file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Created,
    Updated,
    /// Merged content equals the existing content: no write was issued.
    /// This is the observable fixed point of re-running the populator.
    Unchanged,
}

/// Merge new messages into existing day-file content.
///
/// A message is appended only when it is not already a substring of the
/// accumulated content, so reruns over the same source data add nothing.
/// Known weakness: a new message that happens to be a strict substring of an
/// existing block is dropped too. Accepted for now; a per-event identifier
/// prefix would make this precise.
pub fn merge_with_existing(existing: &str, new_messages: &[String]) -> String {
    let mut content = existing.trim().to_string();
    for msg in new_messages {
        let msg = msg.trim();
        if msg.is_empty() || content.contains(msg) {
            continue;
        }
        if content.is_empty() {
            content = msg.to_string();
        } else {
            content.push_str("\n\n");
            content.push_str(msg);
        }
    }
    content.push('\n');
    content
}

impl MessageStore {
    /// Write (or merge into) the day-file for `date`. Creates the store
    /// directory on first use. Never writes when the merged result equals
    /// what is already on disk.
    pub fn write_day_file(&self, date: NaiveDate, messages: &[String]) -> Result<MergeOutcome> {
        std::fs::create_dir_all(self.dir())
            .with_context(|| format!("Failed to create {}", self.dir().display()))?;
        let path = self.day_file_path(date);

        if path.exists() {
            let existing = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let merged = merge_with_existing(&existing, messages);
            if merged.trim() == existing.trim() {
                tracing::info!(
                    "No new reminders to add for {} (already up to date)",
                    path.display()
                );
                return Ok(MergeOutcome::Unchanged);
            }
            std::fs::write(&path, &merged)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Updated {} with additional reminders", path.display());
            Ok(MergeOutcome::Updated)
        } else {
            let content = merge_with_existing("", messages);
            std::fs::write(&path, &content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                "Created {} with {} reminder(s)",
                path.display(),
                messages.len()
            );
            Ok(MergeOutcome::Created)
        }
    }
}
