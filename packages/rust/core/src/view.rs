//! What the frontends show: the result page and tender cards.

use chrono::NaiveDate;

use tenderpilot_shared::{Tender, TenderTable};

use crate::filter::{TenderFilter, apply};

/// A filtered, truncated slice of the table plus its summary line.
#[derive(Debug)]
pub struct ResultPage<'a> {
    /// Rows to display.
    pub rows: Vec<&'a Tender>,
    /// Rows that passed the filter, before truncation.
    pub matched: usize,
    /// "Found N results." / "Displaying first N rows."
    pub summary: String,
}

/// Filter `table` and cut it down for display.
///
/// With an active filter every match is shown unless `limit` is given.
/// Without one, the first `limit` (or `page_size`) rows are shown.
pub fn result_page<'a>(
    table: &'a TenderTable,
    filter: &TenderFilter,
    today: NaiveDate,
    page_size: usize,
    limit: Option<usize>,
) -> ResultPage<'a> {
    if filter.is_active() {
        let mut rows = apply(&table.tenders, filter, today);
        let matched = rows.len();
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        ResultPage {
            rows,
            matched,
            summary: format!("Found {matched} results."),
        }
    } else {
        let n = limit.unwrap_or(page_size).min(table.len());
        ResultPage {
            rows: table.tenders.iter().take(n).collect(),
            matched: table.len(),
            summary: format!("Displaying first {n} rows."),
        }
    }
}

/// Labelled fields for a tender card, in display order.
pub fn card(tender: &Tender) -> Vec<(&'static str, String)> {
    let mut out = vec![("Title", tender.title.clone())];
    if let Some(reference) = &tender.reference {
        out.push(("Reference", reference.clone()));
    }
    out.push(("Authority", tender.authority.clone()));
    out.push((
        "Category",
        match &tender.gsin {
            Some(code) if *code != tender.category => format!("{} ({code})", tender.category),
            _ => tender.category.clone(),
        },
    ));
    out.push(("Status", tender.status.clone()));
    out.push(("Closes", tender.closing_date_raw.clone()));
    if let Some(region) = &tender.region {
        out.push(("Region", region.clone()));
    }
    if let Some(email) = &tender.contact_email {
        out.push(("Contact", email.clone()));
    }
    if let Some(url) = &tender.notice_url {
        out.push(("Notice", url.clone()));
    }
    out.push(("Description", tender.description.clone()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tenderpilot_dataset::parse_tenders;

    fn table() -> TenderTable {
        let text = std::fs::read_to_string("../../../fixtures/csv/tenders.fixture.csv")
            .expect("read tenders fixture");
        parse_tenders(&text, "fixture", Utc::now()).expect("parse fixture")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn unfiltered_shows_first_rows() {
        let table = table();
        let page = result_page(&table, &TenderFilter::default(), today(), 3, None);
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.summary, "Displaying first 3 rows.");

        let page = result_page(&table, &TenderFilter::default(), today(), 10, None);
        assert_eq!(page.summary, "Displaying first 5 rows.");
    }

    #[test]
    fn filtered_reports_all_matches() {
        let table = table();
        let filter = TenderFilter {
            search: Some("canada".into()),
            ..TenderFilter::default()
        };
        let page = result_page(&table, &filter, today(), 1, None);
        assert_eq!(page.summary, "Found 3 results.");
        assert_eq!(page.rows.len(), 3);

        let page = result_page(&table, &filter, today(), 1, Some(2));
        assert_eq!(page.matched, 3);
        assert_eq!(page.rows.len(), 2);
    }

    #[test]
    fn card_fields() {
        let table = table();
        let card = card(&table.tenders[0]);
        let labels: Vec<&str> = card.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels.first(), Some(&"Title"));
        assert_eq!(labels.last(), Some(&"Description"));
        assert!(card.contains(&("Category", "Snow Removal Services (S201A)".into())));

        // Category equal to the GSIN code is not repeated.
        let card = super::card(&table.tenders[4]);
        assert!(card.contains(&("Category", "N9130".into())));
    }
}
