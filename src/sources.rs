//! Event-source documents: discovery, loading, and consumption marking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

/// Raw source document: category/ticker → period key → ISO date or null.
/// Values stay as raw JSON so one wrong-shaped record fails alone instead of
/// failing the whole document; the collectors check shape per record.
/// BTreeMap keeps iteration (and thus logging and merge order) deterministic.
pub type SourceDoc = BTreeMap<String, serde_json::Value>;

const PARSED_MARKER: &str = "_parsed_";

/// All unparsed `.json` files directly under `dir`, sorted by name.
/// Falls back to `legacy_path` when the directory yields nothing — the old
/// single-file layout is still honored.
pub fn find_unparsed(dir: &Path, legacy_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if dir.is_dir() {
        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    let name = entry.file_name().to_string_lossy().to_lowercase();
                    if path.is_file() && name.ends_with(".json") && !name.contains(PARSED_MARKER) {
                        files.push(path);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to scan source dir '{}': {e}", dir.display());
            }
        }
    }

    if files.is_empty()
        && let Some(legacy) = legacy_path
        && legacy.is_file()
        && let Some(name) = legacy.file_name().map(|n| n.to_string_lossy().to_lowercase())
        && name.ends_with(".json")
        && !name.contains(PARSED_MARKER)
    {
        files.push(legacy.to_path_buf());
    }

    files.sort();
    files
}

/// Load a source document. A missing, unreadable, or non-object document is
/// fatal for the batch that depends on it.
pub fn load_doc(path: &Path) -> Result<SourceDoc> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read source document at {}", path.display()))?;
    let doc: SourceDoc = serde_json::from_str(&content).with_context(|| {
        format!(
            "{} must contain a top-level object of category -> period -> date mappings",
            path.display()
        )
    })?;
    Ok(doc)
}

/// Rename a consumed source file to `<stem>_parsed_<timestamp>.json` so the
/// next scan skips it. Failure is logged and swallowed: the batch was already
/// processed, and the day-file merge deduplicates any rerun.
pub fn mark_parsed(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    let backup = path.with_file_name(format!("{stem}{PARSED_MARKER}{timestamp}.json"));

    match std::fs::rename(path, &backup) {
        Ok(()) => {
            tracing::info!(
                "Renamed {} to {} after parsing",
                path.display(),
                backup.display()
            );
            backup
        }
        Err(e) => {
            tracing::error!("Failed to rename {} after parsing: {e}", path.display());
            path.to_path_buf()
        }
    }
}
