//! The scheduling engine: turns event-date records into per-day reminder
//! messages, grouped by reminder date, and writes them through the store.
//!
//! Each event family carries its own reminder offset and key style in an
//! explicit rule table passed to the collectors — no module-level state.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::{Days, NaiveDate};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::groups;
use crate::period::{self, KeyStyle};
use crate::render;
use crate::sources::{self, SourceDoc};
use crate::store::MessageStore;

#[derive(Debug, Clone, Copy)]
pub struct FamilyRule {
    pub tag: &'static str,
    /// Calendar days subtracted from the event date. Naive arithmetic, no
    /// business-day or timezone adjustment.
    pub offset_days: u64,
    pub key_style: KeyStyle,
}

pub const EARNINGS: FamilyRule = FamilyRule {
    tag: "EARNINGS",
    offset_days: 3,
    key_style: KeyStyle::Quarter,
};

pub const MACRO_FAMILIES: [FamilyRule; 3] = [
    FamilyRule {
        tag: "PPR",
        offset_days: 0,
        key_style: KeyStyle::QuarterLabel,
    },
    FamilyRule {
        tag: "FOMC",
        offset_days: 0,
        key_style: KeyStyle::MonthLabel,
    },
    FamilyRule {
        tag: "NFP",
        offset_days: 0,
        key_style: KeyStyle::MonthLabel,
    },
];

/// Why a single record was skipped. One bad record never aborts the batch;
/// the caller counts these and moves on.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("could not parse quarter from key '{0}'")]
    BadPeriodKey(String),
    #[error("invalid date '{0}'")]
    BadDate(String),
    #[error("unknown event type '{0}'")]
    UnknownFamily(String),
    #[error("expected object of period->date mappings for '{0}'")]
    WrongShape(String),
    #[error("could not render message: {0}")]
    Render(anyhow::Error),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BatchStats {
    pub scheduled: usize,
    pub skipped: usize,
}

/// Reminder messages keyed by the calendar day they should go out.
pub type ReminderMap = BTreeMap<NaiveDate, Vec<String>>;

pub fn reminder_date(event_date: NaiveDate, rule: &FamilyRule) -> NaiveDate {
    event_date - Days::new(rule.offset_days)
}

fn parse_event_date(iso: &str) -> Result<NaiveDate, RecordError> {
    NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d")
        .map_err(|_| RecordError::BadDate(iso.to_string()))
}

/// One earnings record → (reminder date, message).
fn earnings_reminder(
    ticker: &str,
    period_key: &str,
    iso_date: &str,
    rule: &FamilyRule,
    ticker_groups: &HashMap<String, String>,
    default_group: &str,
) -> Result<(NaiveDate, String), RecordError> {
    let quarter = period::parse_quarter(period_key)
        .ok_or_else(|| RecordError::BadPeriodKey(period_key.to_string()))?;
    let event_date = parse_event_date(iso_date)?;
    let group = groups::resolve_group(ticker, ticker_groups, default_group);
    let message = render::earnings_message(ticker, quarter, event_date, &group)
        .map_err(RecordError::Render)?;
    Ok((reminder_date(event_date, rule), message))
}

/// Collect earnings reminders from one source document. Top-level keys are
/// tickers; every record uses the single earnings rule.
pub fn collect_earnings(
    doc: &SourceDoc,
    rule: &FamilyRule,
    ticker_groups: &HashMap<String, String>,
    default_group: &str,
    out: &mut ReminderMap,
) -> BatchStats {
    let mut stats = BatchStats::default();
    for (ticker, value) in doc {
        let Some(periods) = value.as_object() else {
            let e = RecordError::WrongShape(ticker.clone());
            tracing::warn!("Skipping: {e}");
            stats.skipped += 1;
            continue;
        };
        for (period_key, raw_date) in periods {
            let iso_date = match raw_date {
                Value::Null => continue, // unscheduled, never produces a reminder
                Value::String(s) => s.as_str(),
                other => {
                    let e = RecordError::BadDate(other.to_string());
                    tracing::warn!("Skipping {ticker} {period_key}: {e}");
                    stats.skipped += 1;
                    continue;
                }
            };
            match earnings_reminder(ticker, period_key, iso_date, rule, ticker_groups, default_group)
            {
                Ok((date, message)) => {
                    out.entry(date).or_default().push(message);
                    stats.scheduled += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping {ticker} {period_key}: {e}");
                    stats.skipped += 1;
                }
            }
        }
    }
    stats
}

/// One macro record → (reminder date, message). The period label qualifies
/// the PPR message; for FOMC/NFP it is parsed for the log line only.
fn macro_reminder(
    rule: &FamilyRule,
    period_key: &str,
    iso_date: &str,
) -> Result<(NaiveDate, String), RecordError> {
    let event_date = parse_event_date(iso_date)?;
    let label = period::period_label(period_key, rule.key_style);
    let message = render::macro_message(rule.tag, event_date, label.as_deref())
        .map_err(RecordError::Render)?;
    let date = reminder_date(event_date, rule);
    tracing::debug!(
        "Scheduled {} reminder for {date} (period {})",
        rule.tag,
        label.as_deref().unwrap_or(period_key)
    );
    Ok((date, message))
}

/// Collect macro reminders. Top-level keys must name a known family from
/// `rules`; unknown types are skipped and counted.
pub fn collect_macro(doc: &SourceDoc, rules: &[FamilyRule], out: &mut ReminderMap) -> BatchStats {
    let mut stats = BatchStats::default();
    for (event_type, value) in doc {
        let Some(rule) = rules.iter().find(|r| r.tag == event_type) else {
            let e = RecordError::UnknownFamily(event_type.clone());
            tracing::warn!("Skipping: {e}");
            stats.skipped += 1;
            continue;
        };
        let Some(periods) = value.as_object() else {
            let e = RecordError::WrongShape(event_type.clone());
            tracing::warn!("Skipping: {e}");
            stats.skipped += 1;
            continue;
        };
        for (period_key, raw_date) in periods {
            let iso_date = match raw_date {
                Value::Null => continue,
                Value::String(s) => s.as_str(),
                other => {
                    let e = RecordError::BadDate(other.to_string());
                    tracing::warn!("Skipping {event_type} {period_key}: {e}");
                    stats.skipped += 1;
                    continue;
                }
            };
            match macro_reminder(rule, period_key, iso_date) {
                Ok((date, message)) => {
                    out.entry(date).or_default().push(message);
                    stats.scheduled += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping {event_type} {period_key}: {e}");
                    stats.skipped += 1;
                }
            }
        }
    }
    stats
}

/// Write all collected reminders through the store, one file per day.
fn write_reminders(store: &MessageStore, reminders: &ReminderMap) -> Result<usize> {
    let mut written = 0;
    for (date, messages) in reminders {
        store.write_day_file(*date, messages)?;
        written += 1;
    }
    Ok(written)
}

/// Earnings pipeline: scan for unparsed report files, schedule reminders
/// three days ahead of each release, mark each file consumed.
pub fn populate_reports(cfg: &Config) -> Result<()> {
    let ticker_groups = groups::load_ticker_groups(&cfg.store.stocks_csv());
    let default_group = &cfg.groups.default_label;

    let legacy = cfg.store.legacy_reports_path();
    let files = sources::find_unparsed(&cfg.store.reports_dir(), Some(legacy.as_path()));
    if files.is_empty() {
        tracing::info!("No unparsed report files found. Nothing to do.");
        return Ok(());
    }

    let mut reminders = ReminderMap::new();
    let mut stats = BatchStats::default();
    let mut failed_files = 0usize;

    for path in &files {
        tracing::info!("Processing report file: {}", path.display());
        let doc = match sources::load_doc(path) {
            Ok(doc) => doc,
            Err(e) => {
                // Left unrenamed so the broken file can be inspected; the
                // event counters stay about events, not files.
                tracing::error!("Failed to load {}: {e}", path.display());
                failed_files += 1;
                continue;
            }
        };
        let batch = collect_earnings(&doc, &EARNINGS, &ticker_groups, default_group, &mut reminders);
        stats.scheduled += batch.scheduled;
        stats.skipped += batch.skipped;
        sources::mark_parsed(path);
    }

    if failed_files > 0 {
        tracing::warn!("Skipped {failed_files} report file(s) that could not be loaded");
    }
    finish_populate(cfg, &reminders, stats, "report")
}

/// Macro pipeline: single source document, same-day reminders, consumed
/// only once the day-files are written. A failed write leaves the source
/// in place so the next run retries the batch.
pub fn populate_macro(cfg: &Config) -> Result<()> {
    let macro_path = cfg.store.macro_path();
    let doc = sources::load_doc(&macro_path)?;

    let mut reminders = ReminderMap::new();
    let stats = collect_macro(&doc, &MACRO_FAMILIES, &mut reminders);

    finish_populate(cfg, &reminders, stats, "macro")?;
    sources::mark_parsed(&macro_path);
    Ok(())
}

fn finish_populate(
    cfg: &Config,
    reminders: &ReminderMap,
    stats: BatchStats,
    kind: &str,
) -> Result<()> {
    if reminders.is_empty() {
        tracing::info!("No {kind} reminders to schedule (no upcoming event dates found)");
        return Ok(());
    }

    let store = MessageStore::new(cfg.store.messages_dir());
    let written = write_reminders(&store, reminders)?;

    tracing::info!(
        "Prepared {kind} reminder files for {written} day(s) in '{}'",
        store.dir().display()
    );
    tracing::info!("Successfully processed {} {kind} events", stats.scheduled);
    if stats.skipped > 0 {
        tracing::warn!("Skipped {} {kind} events due to errors", stats.skipped);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn doc(json: &str) -> SourceDoc {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_reminder_date_offsets() {
        assert_eq!(
            reminder_date(d(2025, 11, 5), &EARNINGS),
            d(2025, 11, 2),
            "earnings reminders go out three days ahead"
        );
        for rule in &MACRO_FAMILIES {
            assert_eq!(reminder_date(d(2025, 10, 3), rule), d(2025, 10, 3));
        }
    }

    #[test]
    fn test_reminder_date_crosses_month_boundary() {
        assert_eq!(reminder_date(d(2025, 3, 1), &EARNINGS), d(2025, 2, 26));
    }

    #[test]
    fn test_collect_earnings_example() {
        let doc = doc(r#"{"AAPL": {"Q3_2025": "2025-11-05"}}"#);
        let mut reminders = ReminderMap::new();
        let stats = collect_earnings(
            &doc,
            &EARNINGS,
            &HashMap::new(),
            "Analysegruppen",
            &mut reminders,
        );
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.skipped, 0);
        let msgs = &reminders[&d(2025, 11, 2)];
        assert_eq!(
            msgs[0],
            "Hei alle! AAPL slipper 3.kvartalsrapport 05.11.2025. \
             Analysegruppen har analyseansvar, men alle oppfordres til å følge med."
        );
    }

    #[test]
    fn test_collect_earnings_null_dates_silently_skipped() {
        let doc = doc(r#"{"AAPL": {"Q3_2025": null, "Q4_2025": null}}"#);
        let mut reminders = ReminderMap::new();
        let stats = collect_earnings(
            &doc,
            &EARNINGS,
            &HashMap::new(),
            "Analysegruppen",
            &mut reminders,
        );
        assert_eq!(stats.scheduled, 0);
        assert_eq!(stats.skipped, 0, "null dates are not errors");
        assert!(reminders.is_empty());
    }

    #[test]
    fn test_collect_earnings_counts_bad_records() {
        let doc = doc(
            r#"{"AAPL": {"Q3_2025": "not-a-date", "QX_2025": "2025-11-05", "Q1_2026": "2026-02-10"}}"#,
        );
        let mut reminders = ReminderMap::new();
        let stats = collect_earnings(
            &doc,
            &EARNINGS,
            &HashMap::new(),
            "Analysegruppen",
            &mut reminders,
        );
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_collect_earnings_uses_group_lookup() {
        let doc = doc(r#"{"EQNR": {"Q2_2025": "2025-07-24"}}"#);
        let mut groups = HashMap::new();
        groups.insert("EQNR".to_string(), "Gruppe 2".to_string());
        let mut reminders = ReminderMap::new();
        collect_earnings(&doc, &EARNINGS, &groups, "Analysegruppen", &mut reminders);
        let msgs = &reminders[&d(2025, 7, 21)];
        assert!(msgs[0].contains("Gruppe 2 har analyseansvar"));
    }

    #[test]
    fn test_collect_macro_example() {
        let doc = doc(r#"{"NFP": {"Sep_2025": "2025-10-03"}}"#);
        let mut reminders = ReminderMap::new();
        let stats = collect_macro(&doc, &MACRO_FAMILIES, &mut reminders);
        assert_eq!(stats.scheduled, 1);
        let msgs = &reminders[&d(2025, 10, 3)];
        assert!(msgs[0].contains("03.10.2025"));
        assert!(msgs[0].contains("Non-Farm Payrolls"));
    }

    #[test]
    fn test_collect_macro_unknown_family_counted() {
        let doc = doc(r#"{"CPI": {"Sep_2025": "2025-10-10"}}"#);
        let mut reminders = ReminderMap::new();
        let stats = collect_macro(&doc, &MACRO_FAMILIES, &mut reminders);
        assert_eq!(stats.scheduled, 0);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_collect_earnings_wrong_shaped_record_skipped() {
        let doc = doc(r#"{"AAPL": 42, "EQNR": {"Q2_2025": "2025-07-24"}}"#);
        let mut reminders = ReminderMap::new();
        let stats = collect_earnings(
            &doc,
            &EARNINGS,
            &HashMap::new(),
            "Analysegruppen",
            &mut reminders,
        );
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.scheduled, 1, "good records survive a bad sibling");
    }

    #[test]
    fn test_collect_earnings_non_string_date_skipped() {
        let doc = doc(r#"{"AAPL": {"Q3_2025": 20251105, "Q1_2026": "2026-02-10"}}"#);
        let mut reminders = ReminderMap::new();
        let stats = collect_earnings(
            &doc,
            &EARNINGS,
            &HashMap::new(),
            "Analysegruppen",
            &mut reminders,
        );
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.scheduled, 1);
    }

    #[test]
    fn test_collect_macro_wrong_shaped_record_skipped() {
        let doc = doc(r#"{"NFP": "not-an-object", "FOMC": {"Sep_2025": "2025-09-17"}}"#);
        let mut reminders = ReminderMap::new();
        let stats = collect_macro(&doc, &MACRO_FAMILIES, &mut reminders);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.scheduled, 1);
    }

    #[test]
    fn test_collect_macro_ppr_period_in_message() {
        let doc = doc(r#"{"PPR": {"Q3_2025": "2025-09-18"}}"#);
        let mut reminders = ReminderMap::new();
        collect_macro(&doc, &MACRO_FAMILIES, &mut reminders);
        let msgs = &reminders[&d(2025, 9, 18)];
        assert!(msgs[0].contains("pengepolitiske rapport for 3. kvartal 2025"));
    }

    fn test_config(base: &std::path::Path) -> Config {
        let mut cfg = Config::default();
        cfg.store.base_dir = base.to_path_buf();
        cfg
    }

    #[test]
    fn test_populate_reports_is_idempotent_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        std::fs::create_dir_all(cfg.store.reports_dir()).unwrap();
        let source = cfg.store.reports_dir().join("reports.json");
        let body = r#"{"AAPL": {"Q3_2025": "2025-11-05"}, "EQNR": {"Q3_2025": "2025-11-05"}}"#;
        std::fs::write(&source, body).unwrap();

        populate_reports(&cfg).unwrap();
        let day_file = cfg.store.messages_dir().join("02.11.25.md");
        let first = std::fs::read(&day_file).unwrap();
        assert!(!source.exists(), "source must be marked parsed");

        // Same data arrives again in a fresh batch.
        std::fs::write(&source, body).unwrap();
        populate_reports(&cfg).unwrap();
        let second = std::fs::read(&day_file).unwrap();
        assert_eq!(first, second, "rerun over unchanged data is a fixed point");
    }

    #[test]
    fn test_populate_macro_missing_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        assert!(populate_macro(&cfg).is_err());
    }

    #[test]
    fn test_populate_macro_wrong_shaped_record_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        std::fs::create_dir_all(cfg.store.macro_path().parent().unwrap()).unwrap();
        std::fs::write(
            cfg.store.macro_path(),
            r#"{"CPI": "not-an-object", "NFP": {"Sep_2025": "2025-10-03"}}"#,
        )
        .unwrap();

        populate_macro(&cfg).unwrap();
        let content =
            std::fs::read_to_string(cfg.store.messages_dir().join("03.10.25.md")).unwrap();
        assert!(content.contains("Non-Farm Payrolls"));
    }

    #[test]
    fn test_populate_macro_keeps_source_when_write_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        std::fs::create_dir_all(cfg.store.macro_path().parent().unwrap()).unwrap();
        std::fs::write(
            cfg.store.macro_path(),
            r#"{"NFP": {"Sep_2025": "2025-10-03"}}"#,
        )
        .unwrap();
        // A plain file where the messages tree should go makes the day-file
        // write fail.
        std::fs::write(cfg.store.messages_root(), "in the way").unwrap();

        assert!(populate_macro(&cfg).is_err());
        assert!(
            cfg.store.macro_path().exists(),
            "source must stay in place for the next run to retry"
        );
    }

    #[test]
    fn test_populate_reports_unreadable_file_skipped_not_marked() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        std::fs::create_dir_all(cfg.store.reports_dir()).unwrap();
        let bad = cfg.store.reports_dir().join("broken.json");
        std::fs::write(&bad, "{ this is not json").unwrap();
        std::fs::write(
            cfg.store.reports_dir().join("good.json"),
            r#"{"AAPL": {"Q3_2025": "2025-11-05"}}"#,
        )
        .unwrap();

        populate_reports(&cfg).unwrap();
        assert!(cfg.store.messages_dir().join("02.11.25.md").exists());
        assert!(bad.exists(), "unloadable file stays unrenamed for inspection");
    }

    #[test]
    fn test_populate_macro_writes_day_file_and_marks_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        std::fs::create_dir_all(cfg.store.macro_path().parent().unwrap()).unwrap();
        std::fs::write(
            cfg.store.macro_path(),
            r#"{"NFP": {"Sep_2025": "2025-10-03"}}"#,
        )
        .unwrap();

        populate_macro(&cfg).unwrap();
        let content =
            std::fs::read_to_string(cfg.store.messages_dir().join("03.10.25.md")).unwrap();
        assert!(content.contains("Non-Farm Payrolls"));
        assert!(content.ends_with(".\n"));
        assert!(!cfg.store.macro_path().exists());
    }
}
