//! CSV → [`TenderTable`] with defensive fallbacks for missing columns.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use tracing::{info, warn};

use tenderpilot_shared::{
    ColumnMap, ColumnRole, NO_DESCRIPTION, NOT_SPECIFIED, Result, Tender, TenderPilotError,
    TenderTable, UNCATEGORIZED, UNKNOWN_AUTHORITY, UNKNOWN_STATUS, UNTITLED,
};

use crate::columns;

/// Longest title derived from a description.
const DERIVED_TITLE_MAX_CHARS: usize = 120;

static LEADING_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})").expect("valid regex"));

/// Parse CSV text into a normalized table.
///
/// An empty body or a header-only body yields an empty table. Records the
/// CSV reader rejects are skipped with a warning.
pub fn parse_tenders(text: &str, source: &str, fetched_at: DateTime<Utc>) -> Result<TenderTable> {
    let text = text.trim_start_matches('\u{feff}');

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = if text.trim().is_empty() {
        Vec::new()
    } else {
        reader
            .headers()
            .map_err(|e| TenderPilotError::parse(format!("{source}: bad header row: {e}")))?
            .iter()
            .map(String::from)
            .collect()
    };

    let column_map = columns::detect(&columns);
    let mut tenders = Vec::new();
    let mut skipped = 0usize;

    if !columns.is_empty() {
        for record in reader.records() {
            match record {
                Ok(record) => {
                    let values: Vec<&str> = record.iter().collect();
                    tenders.push(normalize_row(tenders.len(), &columns, &values, &column_map));
                }
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, "skipping malformed CSV record");
                }
            }
        }
    }

    info!(
        source,
        rows = tenders.len(),
        columns = columns.len(),
        mapped = column_map.0.len(),
        skipped,
        "tender table parsed"
    );

    Ok(TenderTable {
        columns,
        tenders,
        column_map,
        source: source.to_string(),
        fetched_at,
    })
}

/// Build one [`Tender`] from a raw record.
pub fn normalize_row(row: usize, columns: &[String], values: &[&str], map: &ColumnMap) -> Tender {
    let get = |role: ColumnRole| -> Option<String> {
        map.get(role)
            .and_then(|i| values.get(i))
            .and_then(|v| present(v))
    };

    let description = get(ColumnRole::Description);
    let title = get(ColumnRole::Title)
        .or_else(|| description.as_deref().map(derive_title))
        .unwrap_or_else(|| UNTITLED.into());

    let closing_raw = get(ColumnRole::ClosingDate);
    let gsin = get(ColumnRole::GsinCode);
    let category = get(ColumnRole::Category)
        .or_else(|| gsin.clone())
        .unwrap_or_else(|| UNCATEGORIZED.into());

    let fields = columns
        .iter()
        .enumerate()
        .map(|(i, h)| (h.clone(), values.get(i).copied().unwrap_or_default().to_string()))
        .collect();

    Tender {
        row,
        reference: get(ColumnRole::Reference),
        title,
        description: description.unwrap_or_else(|| NO_DESCRIPTION.into()),
        closing_date: closing_raw.as_deref().and_then(parse_date),
        closing_date_raw: closing_raw.unwrap_or_else(|| NOT_SPECIFIED.into()),
        category,
        gsin,
        status: get(ColumnRole::Status).unwrap_or_else(|| UNKNOWN_STATUS.into()),
        authority: get(ColumnRole::Authority).unwrap_or_else(|| UNKNOWN_AUTHORITY.into()),
        publication_date: get(ColumnRole::PublicationDate)
            .as_deref()
            .and_then(parse_date),
        region: get(ColumnRole::Region),
        notice_url: get(ColumnRole::NoticeUrl),
        contact_email: get(ColumnRole::ContactEmail),
        fields,
    }
}

/// `None` for blank cells and the usual spreadsheet null spellings.
fn present(value: &str) -> Option<String> {
    let v = value.trim();
    let missing = v.is_empty()
        || ["nan", "null", "none", "n/a"]
            .iter()
            .any(|m| v.eq_ignore_ascii_case(m));
    (!missing).then(|| v.to_string())
}

/// First sentence (or line) of a description, capped in length.
fn derive_title(description: &str) -> String {
    let first = description
        .lines()
        .next()
        .unwrap_or(description)
        .split_inclusive(". ")
        .next()
        .unwrap_or(description)
        .trim()
        .trim_end_matches('.');

    match first.char_indices().nth(DERIVED_TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}…", first[..cut].trim_end()),
        None => first.to_string(),
    }
}

/// Parse the leading `YYYY-MM-DD` (or `YYYY/MM/DD`) of a date or timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let caps = LEADING_DATE.captures(value.trim())?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
