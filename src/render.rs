//! Message templates for each event family.

use anyhow::{Result, bail};
use chrono::NaiveDate;

/// `DD.MM.YYYY`, used inside message bodies.
pub fn format_human_date(d: NaiveDate) -> String {
    d.format("%d.%m.%Y").to_string()
}

/// Reminder for a quarterly earnings release.
///
/// The ticker and group label must be non-empty; a blank field would leave a
/// hole in the rendered sentence, so it fails that single event.
pub fn earnings_message(
    ticker: &str,
    quarter: u32,
    event_date: NaiveDate,
    group: &str,
) -> Result<String> {
    if ticker.trim().is_empty() {
        bail!("empty ticker");
    }
    if group.trim().is_empty() {
        bail!("empty group label");
    }
    Ok(format!(
        "Hei alle! {ticker} slipper {quarter}.kvartalsrapport {dato}. \
         {group} har analyseansvar, men alle oppfordres til å følge med.",
        dato = format_human_date(event_date),
    ))
}

/// Reminder for a macro announcement. `period` is only rendered for PPR,
/// where it qualifies which report is being published; FOMC and NFP
/// messages carry the date alone.
pub fn macro_message(tag: &str, event_date: NaiveDate, period: Option<&str>) -> Result<String> {
    let dato = format_human_date(event_date);
    match tag {
        "PPR" => {
            let report = match period {
                Some(p) => format!("pengepolitiske rapport for {p}"),
                None => "pengepolitiske rapport".to_string(),
            };
            Ok(format!(
                "Hei alle! I dag, {dato}, publiserer Norges Bank sin {report}. \
                 Dette er viktig for renteutsikter og økonomisk politikk i Norge."
            ))
        }
        "FOMC" => Ok(format!(
            "Hei alle! I dag, {dato}, har Fed (Den amerikanske sentralbanken) rentemøte. \
             Dette er viktig for USD og globale renteforventninger."
        )),
        "NFP" => Ok(format!(
            "Hei alle! I dag, {dato}, publiseres Non-Farm Payrolls. \
             Dette er kritisk sysselsettingsdata som påvirker Fed-forventninger og USD."
        )),
        other => bail!("no template for event type '{other}'"),
    }
}
