//! Decoding of opaque period keys like `Q3_2025` or `Sep_2025`.
//!
//! Parsing is total: malformed input yields `None` or falls back to the
//! original key, per event family. Nothing here panics or returns an error.

/// How a family's period keys are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// `Q3_2025` → quarter number 3. Earnings reports.
    Quarter,
    /// `Q3_2025` → "3. kvartal 2025". Norges Bank monetary policy report.
    QuarterLabel,
    /// `Sep_2025` → "september 2025", unknown abbreviation falls back to
    /// the key verbatim. FOMC and NFP.
    MonthLabel,
}

const MONTHS: [(&str, &str); 12] = [
    ("JAN", "januar"),
    ("FEB", "februar"),
    ("MAR", "mars"),
    ("APR", "april"),
    ("MAY", "mai"),
    ("JUN", "juni"),
    ("JUL", "juli"),
    ("AUG", "august"),
    ("SEP", "september"),
    ("OCT", "oktober"),
    ("NOV", "november"),
    ("DEC", "desember"),
];

/// Extract the quarter number from a key like `Q3_2025`.
///
/// Takes the digits immediately after the leading `Q`; no `Q` or no digits
/// means the key is unparseable and the record should be skipped.
pub fn parse_quarter(key: &str) -> Option<u32> {
    let key = key.trim().to_uppercase();
    let rest = key.strip_prefix('Q')?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// `Q3_2025` → `3. kvartal 2025`. `None` when the key does not carry both a
/// digit quarter and a year; the caller then omits the period qualifier.
pub fn quarter_label(key: &str) -> Option<String> {
    let key = key.trim().to_uppercase();
    let rest = key.strip_prefix('Q')?;
    let (quarter, year) = rest.split_once('_')?;
    if quarter.is_empty() || !quarter.chars().all(|c| c.is_ascii_digit()) || year.is_empty() {
        return None;
    }
    Some(format!("{quarter}. kvartal {year}"))
}

/// `Sep_2025` → `september 2025` via the fixed month table. Unknown
/// abbreviations (or keys without an underscore) return the key verbatim.
pub fn month_label(key: &str) -> String {
    let upper = key.trim().to_uppercase();
    if let Some((month_part, year_part)) = upper.split_once('_')
        && let Some((_, name)) = MONTHS.iter().find(|(abbr, _)| *abbr == month_part)
    {
        return format!("{name} {year_part}");
    }
    key.to_string()
}

/// Decode a period key for a given style. `Quarter` keys return no label —
/// callers use [`parse_quarter`] for the number itself.
pub fn period_label(key: &str, style: KeyStyle) -> Option<String> {
    match style {
        KeyStyle::Quarter => None,
        KeyStyle::QuarterLabel => quarter_label(key),
        KeyStyle::MonthLabel => Some(month_label(key)),
    }
}
