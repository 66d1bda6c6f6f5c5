//! Delivery-side scanning: find today's day-files anywhere under the
//! message root and resolve the destination channel for each.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::day_file_name;

/// Per-folder destination override file. The first non-empty line names the
/// channel for every day-file in that folder and its subfolders.
pub const CHANNEL_OVERRIDE_FILE: &str = "channel.txt";

/// All day-files for `date` under `root`, recursively, sorted by path.
pub fn scan_for_day(root: &Path, date: NaiveDate) -> Vec<PathBuf> {
    let wanted = day_file_name(date);
    let mut matches: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy() == wanted)
        .map(|e| e.into_path())
        .collect();
    matches.sort();
    matches
}

/// Destination channel for a day-file: the nearest `channel.txt` between the
/// file's directory and `root` wins; otherwise the global default, if any.
pub fn resolve_channel(
    day_file: &Path,
    root: &Path,
    default_channel: Option<&str>,
) -> Option<String> {
    let mut dir = day_file.parent();
    while let Some(d) = dir {
        if let Some(channel) = read_override(&d.join(CHANNEL_OVERRIDE_FILE)) {
            return Some(channel);
        }
        if d == root {
            break;
        }
        dir = d.parent();
    }
    default_channel.map(str::to_string)
}

fn read_override(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let content = std::fs::read_to_string(path).ok()?;
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
