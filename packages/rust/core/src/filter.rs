//! Row filtering, dropdown facets and tender lookup.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use tenderpilot_shared::{Result, Tender, TenderPilotError, TenderTable};

/// Free-text search plus dropdown-style selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenderFilter {
    /// Case-insensitive substring over every column.
    pub search: Option<String>,
    /// Exact (case-insensitive) category.
    pub category: Option<String>,
    /// Exact (case-insensitive) status.
    pub status: Option<String>,
    /// Exact (case-insensitive) contracting authority.
    pub authority: Option<String>,
    /// Keep tenders closing on or after this date.
    pub closing_after: Option<NaiveDate>,
    /// Drop tenders whose closing date has passed.
    pub open_only: bool,
}

impl TenderFilter {
    /// Whether any criterion would remove rows.
    pub fn is_active(&self) -> bool {
        non_blank(&self.search).is_some()
            || non_blank(&self.category).is_some()
            || non_blank(&self.status).is_some()
            || non_blank(&self.authority).is_some()
            || self.closing_after.is_some()
            || self.open_only
    }

    /// Whether `tender` passes every criterion on `today`.
    pub fn matches(&self, tender: &Tender, today: NaiveDate) -> bool {
        if let Some(needle) = non_blank(&self.search) {
            if !search_matches(tender, &needle.to_lowercase()) {
                return false;
            }
        }
        if !equals(&self.category, &tender.category)
            || !equals(&self.status, &tender.status)
            || !equals(&self.authority, &tender.authority)
        {
            return false;
        }
        if let Some(after) = self.closing_after {
            if tender.closing_date.is_none_or(|d| d < after) {
                return false;
            }
        }
        !self.open_only || tender.is_open_on(today)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn equals(wanted: &Option<String>, actual: &str) -> bool {
    non_blank(wanted).is_none_or(|w| same_text(w, actual))
}

/// Case-insensitive comparison that also folds accented letters ("É" / "é").
fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// `needle` must already be lowercase.
fn search_matches(tender: &Tender, needle: &str) -> bool {
    let normalized = [
        tender.title.as_str(),
        tender.description.as_str(),
        tender.category.as_str(),
        tender.status.as_str(),
        tender.authority.as_str(),
        tender.closing_date_raw.as_str(),
    ];
    normalized
        .into_iter()
        .chain(tender.reference.as_deref())
        .chain(tender.fields.iter().map(|(_, v)| v.as_str()))
        .any(|hay| hay.to_lowercase().contains(needle))
}

/// Tenders passing `filter`, in dataset order.
pub fn apply<'a>(tenders: &'a [Tender], filter: &TenderFilter, today: NaiveDate) -> Vec<&'a Tender> {
    tenders.iter().filter(|t| filter.matches(t, today)).collect()
}

/// One dropdown option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetValue {
    pub value: String,
    pub count: usize,
}

/// Dropdown option lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub categories: Vec<FacetValue>,
    pub statuses: Vec<FacetValue>,
    pub authorities: Vec<FacetValue>,
}

/// Count distinct categories, statuses and authorities.
pub fn facets(tenders: &[Tender]) -> Facets {
    Facets {
        categories: count_values(tenders.iter().map(|t| t.category.as_str())),
        statuses: count_values(tenders.iter().map(|t| t.status.as_str())),
        authorities: count_values(tenders.iter().map(|t| t.authority.as_str())),
    }
}

/// Sorted by count descending, then value.
fn count_values<'a>(values: impl Iterator<Item = &'a str>) -> Vec<FacetValue> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut out: Vec<FacetValue> = counts
        .into_iter()
        .map(|(value, count)| FacetValue {
            value: value.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    out
}

/// Find a tender by row number or reference number.
pub fn select<'a>(table: &'a TenderTable, key: &str) -> Result<&'a Tender> {
    let key = key.trim();
    if let Ok(row) = key.parse::<usize>() {
        if let Some(t) = table.tenders.get(row) {
            return Ok(t);
        }
    }
    table
        .tenders
        .iter()
        .find(|t| {
            t.reference
                .as_deref()
                .is_some_and(|r| same_text(r, key))
        })
        .ok_or_else(|| TenderPilotError::NotFound(format!("no tender with row or reference '{key}'")))
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

    fn rows(tenders: Vec<&Tender>) -> Vec<usize> {
        tenders.into_iter().map(|t| t.row).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let table = table();
        let f = TenderFilter::default();
        assert!(!f.is_active());
        assert_eq!(rows(apply(&table.tenders, &f, today())), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn blank_search_is_inactive() {
        let f = TenderFilter {
            search: Some("   ".into()),
            ..TenderFilter::default()
        };
        assert!(!f.is_active());
    }

    #[test]
    fn search_is_case_insensitive_across_columns() {
        let table = table();
        let f = TenderFilter {
            search: Some("SHARED services".into()),
            ..TenderFilter::default()
        };
        assert_eq!(rows(apply(&table.tenders, &f, today())), vec![1, 2]);

        // Raw-only column (French title) is searchable too.
        let f = TenderFilter {
            search: Some("déneigement".into()),
            ..TenderFilter::default()
        };
        assert_eq!(rows(apply(&table.tenders, &f, today())), vec![0]);
    }

    #[test]
    fn search_is_literal_not_regex() {
        let table = table();
        let f = TenderFilter {
            search: Some("S.+A".into()),
            ..TenderFilter::default()
        };
        assert!(apply(&table.tenders, &f, today()).is_empty());
    }

    #[test]
    fn dropdown_filters_combine() {
        let table = table();
        let f = TenderFilter {
            authority: Some("shared services canada".into()),
            status: Some("Open".into()),
            ..TenderFilter::default()
        };
        assert!(f.is_active());
        assert_eq!(rows(apply(&table.tenders, &f, today())), vec![2]);

        let f = TenderFilter {
            category: Some("Uncategorized".into()),
            ..TenderFilter::default()
        };
        assert_eq!(rows(apply(&table.tenders, &f, today())), vec![3]);
    }

    #[test]
    fn closing_after_drops_undated() {
        let table = table();
        let f = TenderFilter {
            closing_after: NaiveDate::from_ymd_opt(2026, 11, 20),
            ..TenderFilter::default()
        };
        assert_eq!(rows(apply(&table.tenders, &f, today())), vec![2, 4]);
    }

    #[test]
    fn open_only_keeps_undated() {
        let table = table();
        let f = TenderFilter {
            open_only: true,
            ..TenderFilter::default()
        };
        assert_eq!(rows(apply(&table.tenders, &f, today())), vec![0, 2, 3, 4]);
    }

    #[test]
    fn facet_counts() {
        let table = table();
        let facets = facets(&table.tenders);
        assert_eq!(
            facets.authorities[0],
            FacetValue {
                value: "Shared Services Canada".into(),
                count: 2
            }
        );
        assert_eq!(facets.statuses.len(), 4);
        assert_eq!(facets.statuses[0].value, "Open");
        assert_eq!(facets.categories.len(), 5);
    }

    #[test]
    fn select_by_row_or_reference() {
        let table = table();
        assert_eq!(select(&table, "2").unwrap().reference.as_deref(), Some("PW-24-00103"));
        assert_eq!(select(&table, "pw-24-00105").unwrap().row, 4);
        let err = select(&table, "99").unwrap_err();
        assert!(matches!(err, TenderPilotError::NotFound(_)));
    }

    #[test]
    fn dropdown_and_reference_fold_accents() {
        let mut tender = Tender::placeholder(0);
        tender.authority = "Défense nationale".into();
        tender.reference = Some("ÉQ-2026-001".into());
        let table = TenderTable {
            columns: Vec::new(),
            tenders: vec![tender],
            column_map: Default::default(),
            source: "inline".into(),
            fetched_at: Utc::now(),
        };

        let f = TenderFilter {
            authority: Some("DÉFENSE NATIONALE".into()),
            ..TenderFilter::default()
        };
        assert_eq!(rows(apply(&table.tenders, &f, today())), vec![0]);

        let f = TenderFilter {
            authority: Some("défense".into()),
            ..TenderFilter::default()
        };
        assert!(apply(&table.tenders, &f, today()).is_empty());

        assert_eq!(select(&table, "éq-2026-001").unwrap().row, 0);
    }
}
