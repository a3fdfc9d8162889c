//! Dashboard state shared by every tab.
//!
//! Kept free of terminal types so the filtering and selection logic can be
//! exercised without a backend.

use chrono::NaiveDate;

use tenderpilot_core::{AssistOutput, Facets, LoadOrigin, TenderFilter, facets, result_page};
use tenderpilot_shared::{Tender, TenderTable};

/// A dropdown on the Filters tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dropdown {
    Category,
    Status,
    Authority,
}

/// The last assistant answer and the tender it was for.
#[derive(Debug, Clone)]
pub(crate) struct AssistEntry {
    pub tender_title: String,
    pub output: AssistOutput,
}

pub(crate) struct Dashboard {
    pub table: Option<TenderTable>,
    pub origin: Option<LoadOrigin>,
    /// Criteria currently applied to the list.
    pub filter: TenderFilter,
    /// Search box contents; applied on Enter.
    pub search_input: String,
    /// Closing-after box contents; applied on Enter.
    pub closing_input: String,
    pub facets: Facets,
    /// Row numbers currently listed.
    pub visible: Vec<usize>,
    pub summary: String,
    pub selected: usize,
    pub page_size: usize,
    pub assist: Option<AssistEntry>,
}

impl Dashboard {
    pub(crate) fn new(page_size: usize) -> Self {
        Self {
            table: None,
            origin: None,
            filter: TenderFilter::default(),
            search_input: String::new(),
            closing_input: String::new(),
            facets: Facets::default(),
            visible: Vec::new(),
            summary: "No data loaded.".to_string(),
            selected: 0,
            page_size,
            assist: None,
        }
    }

    /// Replace the dataset and re-run the current filter over it.
    pub(crate) fn set_table(&mut self, table: TenderTable, origin: LoadOrigin, today: NaiveDate) {
        self.facets = facets(&table.tenders);
        self.table = Some(table);
        self.origin = Some(origin);
        self.selected = 0;
        self.refresh_view(today);
    }

    pub(crate) fn refresh_view(&mut self, today: NaiveDate) {
        let Some(table) = &self.table else {
            self.visible.clear();
            self.summary = "No data loaded.".to_string();
            return;
        };
        let page = result_page(table, &self.filter, today, self.page_size, None);
        self.visible = page.rows.iter().map(|t| t.row).collect();
        self.summary = page.summary;
        if self.selected >= self.visible.len() {
            self.selected = self.visible.len().saturating_sub(1);
        }
    }

    pub(crate) fn apply_search(&mut self, today: NaiveDate) {
        let query = self.search_input.trim();
        self.filter.search = (!query.is_empty()).then(|| query.to_string());
        self.selected = 0;
        self.refresh_view(today);
    }

    /// Parse and apply the closing-after box. Blank clears the criterion.
    pub(crate) fn apply_closing_input(&mut self, today: NaiveDate) -> Result<(), String> {
        let raw = self.closing_input.trim();
        self.filter.closing_after = if raw.is_empty() {
            None
        } else {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| format!("'{raw}' is not a date (expected YYYY-MM-DD)"))?;
            Some(date)
        };
        self.selected = 0;
        self.refresh_view(today);
        Ok(())
    }

    /// Options for `dropdown`; `None` means "All".
    pub(crate) fn options(&self, dropdown: Dropdown) -> Vec<Option<&str>> {
        let values = match dropdown {
            Dropdown::Category => &self.facets.categories,
            Dropdown::Status => &self.facets.statuses,
            Dropdown::Authority => &self.facets.authorities,
        };
        std::iter::once(None)
            .chain(values.iter().map(|v| Some(v.value.as_str())))
            .collect()
    }

    pub(crate) fn current(&self, dropdown: Dropdown) -> Option<&str> {
        match dropdown {
            Dropdown::Category => self.filter.category.as_deref(),
            Dropdown::Status => self.filter.status.as_deref(),
            Dropdown::Authority => self.filter.authority.as_deref(),
        }
    }

    /// Step `dropdown` to its next (or previous) option, wrapping around.
    pub(crate) fn cycle(&mut self, dropdown: Dropdown, forward: bool, today: NaiveDate) {
        let options = self.options(dropdown);
        let current = self.current(dropdown);
        let idx = options.iter().position(|o| *o == current).unwrap_or(0);
        let next = if forward {
            (idx + 1) % options.len()
        } else {
            (idx + options.len() - 1) % options.len()
        };
        let value = options[next].map(str::to_string);

        match dropdown {
            Dropdown::Category => self.filter.category = value,
            Dropdown::Status => self.filter.status = value,
            Dropdown::Authority => self.filter.authority = value,
        }
        self.selected = 0;
        self.refresh_view(today);
    }

    pub(crate) fn toggle_open_only(&mut self, today: NaiveDate) {
        self.filter.open_only = !self.filter.open_only;
        self.selected = 0;
        self.refresh_view(today);
    }

    pub(crate) fn clear_filters(&mut self, today: NaiveDate) {
        self.filter = TenderFilter::default();
        self.search_input.clear();
        self.closing_input.clear();
        self.selected = 0;
        self.refresh_view(today);
    }

    pub(crate) fn select_next(&mut self) {
        if self.selected + 1 < self.visible.len() {
            self.selected += 1;
        }
    }

    pub(crate) fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub(crate) fn visible_tenders(&self) -> impl Iterator<Item = &Tender> {
        let tenders = self.table.as_ref().map(|t| t.tenders.as_slice()).unwrap_or(&[]);
        self.visible.iter().filter_map(move |row| tenders.get(*row))
    }

    pub(crate) fn selected_tender(&self) -> Option<&Tender> {
        let row = self.visible.get(self.selected)?;
        self.table.as_ref()?.tenders.get(*row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tenderpilot_dataset::parse_tenders;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn loaded(page_size: usize) -> Dashboard {
        let text = std::fs::read_to_string("../../fixtures/csv/tenders.fixture.csv")
            .expect("read tenders fixture");
        let table = parse_tenders(&text, "fixture", Utc::now()).expect("parse fixture");
        let mut d = Dashboard::new(page_size);
        d.set_table(table, LoadOrigin::File, today());
        d
    }

    #[test]
    fn empty_dashboard() {
        let d = Dashboard::new(10);
        assert_eq!(d.summary, "No data loaded.");
        assert!(d.selected_tender().is_none());
        assert_eq!(d.visible_tenders().count(), 0);
    }

    #[test]
    fn unfiltered_view_is_first_page() {
        let d = loaded(3);
        assert_eq!(d.visible, vec![0, 1, 2]);
        assert_eq!(d.summary, "Displaying first 3 rows.");
        assert_eq!(d.selected_tender().map(|t| t.row), Some(0));
    }

    #[test]
    fn search_applies_on_demand() {
        let mut d = loaded(10);
        d.search_input = "canada".into();
        assert_eq!(d.visible.len(), 5);

        d.apply_search(today());
        assert_eq!(d.summary, "Found 3 results.");
        assert_eq!(d.visible, vec![0, 1, 2]);

        d.search_input = "  ".into();
        d.apply_search(today());
        assert!(d.filter.search.is_none());
        assert_eq!(d.summary, "Displaying first 5 rows.");
    }

    #[test]
    fn dropdown_cycles_through_facets() {
        let mut d = loaded(10);
        assert_eq!(d.current(Dropdown::Status), None);

        d.cycle(Dropdown::Status, true, today());
        assert_eq!(d.current(Dropdown::Status), Some("Open"));
        assert_eq!(d.visible, vec![0, 2]);

        // Backwards from the first value wraps to "All".
        d.cycle(Dropdown::Status, false, today());
        assert_eq!(d.current(Dropdown::Status), None);

        d.cycle(Dropdown::Status, false, today());
        let last = d.options(Dropdown::Status).last().copied().flatten().map(str::to_string);
        assert_eq!(d.current(Dropdown::Status).map(str::to_string), last);
    }

    #[test]
    fn closing_input_validation() {
        let mut d = loaded(10);
        d.closing_input = "next week".into();
        assert!(d.apply_closing_input(today()).is_err());
        assert!(d.filter.closing_after.is_none());

        d.closing_input = "2026-11-20".into();
        d.apply_closing_input(today()).unwrap();
        assert_eq!(d.visible, vec![2, 4]);

        d.closing_input.clear();
        d.apply_closing_input(today()).unwrap();
        assert!(d.filter.closing_after.is_none());
    }

    #[test]
    fn selection_is_clamped() {
        let mut d = loaded(10);
        for _ in 0..10 {
            d.select_next();
        }
        assert_eq!(d.selected, 4);

        d.toggle_open_only(today());
        assert_eq!(d.visible, vec![0, 2, 3, 4]);
        assert_eq!(d.selected, 0);

        d.select_prev();
        assert_eq!(d.selected, 0);

        d.clear_filters(today());
        assert!(!d.filter.is_active());
        assert_eq!(d.visible.len(), 5);
    }
}
