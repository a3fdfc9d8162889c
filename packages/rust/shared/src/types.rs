//! Core domain types for the tender table.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder title when neither a title nor a description is present.
pub const UNTITLED: &str = "Untitled tender";
/// Placeholder description.
pub const NO_DESCRIPTION: &str = "No description provided.";
/// Placeholder for a missing closing date.
pub const NOT_SPECIFIED: &str = "Not specified";
/// Placeholder category.
pub const UNCATEGORIZED: &str = "Uncategorized";
/// Placeholder status.
pub const UNKNOWN_STATUS: &str = "Unknown";
/// Placeholder contracting authority.
pub const UNKNOWN_AUTHORITY: &str = "Unknown authority";

// ---------------------------------------------------------------------------
// ColumnRole / ColumnMap
// ---------------------------------------------------------------------------

/// A normalized column a raw CSV header can be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Title,
    Description,
    ClosingDate,
    GsinCode,
    Category,
    Status,
    Authority,
    Reference,
    PublicationDate,
    Region,
    NoticeUrl,
    ContactEmail,
}

impl ColumnRole {
    /// All roles, in detection order.
    pub const ALL: [ColumnRole; 12] = [
        ColumnRole::Reference,
        ColumnRole::Title,
        ColumnRole::Description,
        ColumnRole::ClosingDate,
        ColumnRole::PublicationDate,
        ColumnRole::Category,
        ColumnRole::GsinCode,
        ColumnRole::Status,
        ColumnRole::Authority,
        ColumnRole::Region,
        ColumnRole::NoticeUrl,
        ColumnRole::ContactEmail,
    ];
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::ClosingDate => "closing date",
            Self::GsinCode => "GSIN",
            Self::Category => "category",
            Self::Status => "status",
            Self::Authority => "contracting authority",
            Self::Reference => "reference",
            Self::PublicationDate => "publication date",
            Self::Region => "region",
            Self::NoticeUrl => "notice URL",
            Self::ContactEmail => "contact email",
        };
        f.write_str(s)
    }
}

/// Which source header index fed each normalized role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMap(pub BTreeMap<ColumnRole, usize>);

impl ColumnMap {
    /// Header index for `role`, if one was detected.
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        self.0.get(&role).copied()
    }

    /// Whether `idx` is already claimed by some role.
    pub fn claims(&self, idx: usize) -> bool {
        self.0.values().any(|&i| i == idx)
    }
}

// ---------------------------------------------------------------------------
// Tender
// ---------------------------------------------------------------------------

/// A single normalized tender notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tender {
    /// Position in the source dataset (0-based, header excluded).
    pub row: usize,
    /// Reference / solicitation number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub title: String,
    pub description: String,
    /// Parsed closing date, when the raw value starts with `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_date: Option<NaiveDate>,
    /// Raw closing date text, or [`NOT_SPECIFIED`].
    pub closing_date_raw: String,
    /// Category label (GSIN description or code).
    pub category: String,
    /// GSIN / commodity code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsin: Option<String>,
    pub status: String,
    /// Contracting authority (buyer).
    pub authority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// Raw `(header, value)` pairs in file order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<(String, String)>,
}

impl Tender {
    /// A tender with every normalized column at its placeholder.
    pub fn placeholder(row: usize) -> Self {
        Self {
            row,
            reference: None,
            title: UNTITLED.into(),
            description: NO_DESCRIPTION.into(),
            closing_date: None,
            closing_date_raw: NOT_SPECIFIED.into(),
            category: UNCATEGORIZED.into(),
            gsin: None,
            status: UNKNOWN_STATUS.into(),
            authority: UNKNOWN_AUTHORITY.into(),
            publication_date: None,
            region: None,
            notice_url: None,
            contact_email: None,
            fields: Vec::new(),
        }
    }

    /// Whether the tender is still open on `today`. Undated tenders count as open.
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        self.closing_date.is_none_or(|d| d >= today)
    }
}

// ---------------------------------------------------------------------------
// TenderTable
// ---------------------------------------------------------------------------

/// The whole normalized dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderTable {
    /// Raw header names, in file order.
    pub columns: Vec<String>,
    /// Normalized rows.
    pub tenders: Vec<Tender>,
    /// Role → header index.
    pub column_map: ColumnMap,
    /// URL or file path the table was read from.
    pub source: String,
    /// When the underlying CSV was downloaded.
    pub fetched_at: DateTime<Utc>,
}

impl TenderTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.tenders.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.tenders.is_empty()
    }

    /// Header name that fed `role`, if any.
    pub fn header_for(&self, role: ColumnRole) -> Option<&str> {
        self.column_map
            .get(role)
            .and_then(|i| self.columns.get(i))
            .map(String::as_str)
    }
}
