//! Ticker→group lookup from stocks.csv.

use std::collections::HashMap;
use std::path::Path;

/// Load the ticker→group mapping. Expected header: `Ticker,Group`
/// (case-insensitive). A missing file, unreadable content, or missing
/// columns degrades to an empty map — every ticker then gets the default
/// group label.
pub fn load_ticker_groups(csv_path: &Path) -> HashMap<String, String> {
    let mut mapping = HashMap::new();

    if !csv_path.exists() {
        tracing::warn!(
            "stocks.csv not found at {}; default group will be used",
            csv_path.display()
        );
        return mapping;
    }

    let mut reader = match csv::Reader::from_path(csv_path) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("Failed to read {}: {e}", csv_path.display());
            return mapping;
        }
    };

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            tracing::warn!("Failed to read {} headers: {e}", csv_path.display());
            return mapping;
        }
    };
    let find_col = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let (Some(ticker_col), Some(group_col)) = (find_col("ticker"), find_col("group")) else {
        tracing::warn!("stocks.csv missing required columns 'Ticker' and 'Group'");
        return mapping;
    };

    for record in reader.records() {
        let Ok(record) = record else {
            // Malformed rows are skipped; lookup stays best-effort.
            continue;
        };
        let ticker = record.get(ticker_col).unwrap_or("").trim();
        let group = record.get(group_col).unwrap_or("").trim();
        if ticker.is_empty() || group.is_empty() {
            continue;
        }
        mapping.insert(ticker.to_uppercase(), group.to_string());
    }

    mapping
}

/// Group label for a ticker, falling back to `default_label` when absent.
pub fn resolve_group(ticker: &str, mapping: &HashMap<String, String>, default_label: &str) -> String {
    mapping
        .get(&ticker.to_uppercase())
        .cloned()
        .unwrap_or_else(|| default_label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stocks.csv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_basic_mapping() {
        let (_dir, path) = write_csv("Ticker,Group\nAAPL,Gruppe 1\neqnr,Gruppe 2\n");
        let map = load_ticker_groups(&path);
        assert_eq!(map.get("AAPL").map(String::as_str), Some("Gruppe 1"));
        assert_eq!(map.get("EQNR").map(String::as_str), Some("Gruppe 2"));
    }

    #[test]
    fn test_header_matching_is_case_insensitive() {
        let (_dir, path) = write_csv(" ticker , GROUP \nMSFT,Gruppe 3\n");
        let map = load_ticker_groups(&path);
        assert_eq!(map.get("MSFT").map(String::as_str), Some("Gruppe 3"));
    }

    #[test]
    fn test_missing_file_gives_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let map = load_ticker_groups(&dir.path().join("nope.csv"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_missing_columns_give_empty_map() {
        let (_dir, path) = write_csv("Symbol,Team\nAAPL,Gruppe 1\n");
        assert!(load_ticker_groups(&path).is_empty());
    }

    #[test]
    fn test_blank_rows_skipped() {
        let (_dir, path) = write_csv("Ticker,Group\nAAPL,\n,Gruppe 1\nTEL,Gruppe 4\n");
        let map = load_ticker_groups(&path);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("TEL").map(String::as_str), Some("Gruppe 4"));
    }

    #[test]
    fn test_resolve_group_default() {
        let map = HashMap::new();
        assert_eq!(resolve_group("AAPL", &map, "Analysegruppen"), "Analysegruppen");
    }
}
