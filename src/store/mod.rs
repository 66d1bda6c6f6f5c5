//! The message store: one markdown file per calendar day, organized in
//! category subfolders under a common root. Filenames use `DD.MM.YY`; the
//! delivery scan matches that name anywhere under the root.
//!
//! This is deliberately a filesystem, not a database: consistency is
//! whatever read-after-write on the local filesystem gives us, and the
//! design assumes one writer run at a time.

pub mod merge;
pub mod scan;

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// `DD.MM.YY`, the day-file naming convention.
pub fn format_file_date(d: NaiveDate) -> String {
    d.format("%d.%m.%y").to_string()
}

pub fn day_file_name(d: NaiveDate) -> String {
    format!("{}.md", format_file_date(d))
}

pub struct MessageStore {
    dir: PathBuf,
}

impl MessageStore {
    /// A store writing into a single category directory, e.g.
    /// `messages/diskusjon`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn day_file_path(&self, d: NaiveDate) -> PathBuf {
        self.dir.join(day_file_name(d))
    }
}
