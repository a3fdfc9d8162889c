//! Header → role detection.
//!
//! The tender CSV has been published under several header schemes
//! (bilingual `title-titre-eng` style, plain `Title`, snake_case exports).
//! Each role carries an ordered list of normalized header prefixes; the
//! first prefix that matches any unclaimed header wins.

use std::sync::LazyLock;

use regex::Regex;
use tenderpilot_shared::{ColumnMap, ColumnRole};
use tracing::debug;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Lowercase a header and strip everything that isn't `[a-z0-9]`.
pub fn normalize_header(header: &str) -> String {
    let lower = header.trim_start_matches('\u{feff}').to_lowercase();
    NON_ALNUM.replace_all(&lower, "").into_owned()
}

/// Candidate prefixes for a role, most specific first.
fn prefixes(role: ColumnRole) -> &'static [&'static str] {
    match role {
        ColumnRole::Reference => &["referencenumber", "reference", "solicitationnumber", "tenderid"],
        ColumnRole::Title => &["title", "tendertitle", "noticetitle", "name"],
        ColumnRole::Description => &[
            "tenderdescription",
            "description",
            "noticedescription",
            "summary",
        ],
        ColumnRole::ClosingDate => &[
            "tenderclosingdate",
            "closingdate",
            "closedate",
            "closing",
            "deadline",
        ],
        ColumnRole::PublicationDate => &["publicationdate", "publisheddate", "published"],
        ColumnRole::Category => &["gsindescription", "procurementcategory", "category"],
        ColumnRole::GsinCode => &["gsin", "unspsc", "commodity"],
        ColumnRole::Status => &["tenderstatus", "status", "noticestatus"],
        ColumnRole::Authority => &[
            "contractingentityname",
            "contractingentity",
            "contractingauthority",
            "authority",
            "buyer",
            "organization",
            "organisation",
            "department",
        ],
        ColumnRole::Region => &["regionsofdelivery", "regionofdelivery", "region"],
        ColumnRole::NoticeUrl => &["noticeurl", "url", "link"],
        ColumnRole::ContactEmail => &["contactinfoemail", "contactemail", "email"],
    }
}

/// English headers beat neutral ones, French headers lose.
fn language_rank(normalized: &str) -> u8 {
    if normalized.ends_with("eng") {
        0
    } else if normalized.ends_with("fra") {
        2
    } else {
        1
    }
}

/// Map each role onto at most one header. A header feeds at most one role.
pub fn detect(headers: &[String]) -> ColumnMap {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut map = ColumnMap::default();

    for role in ColumnRole::ALL {
        for prefix in prefixes(role) {
            let best = normalized
                .iter()
                .enumerate()
                .filter(|(i, h)| !map.claims(*i) && h.starts_with(prefix))
                .filter(|(_, h)| role != ColumnRole::GsinCode || !h.contains("description"))
                .min_by_key(|(i, h)| (language_rank(h), *i))
                .map(|(i, _)| i);

            if let Some(idx) = best {
                debug!(%role, header = %headers[idx], "column mapped");
                map.0.insert(role, idx);
                break;
            }
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalizes_headers() {
        assert_eq!(normalize_header("title-titre-eng"), "titletitreeng");
        assert_eq!(normalize_header("\u{feff}Closing Date"), "closingdate");
        assert_eq!(normalize_header("noticeURL-URLavis-eng"), "noticeurlurlaviseng");
    }

    #[test]
    fn prefers_english_variant() {
        let h = headers(&["title-titre-fra", "title-titre-eng"]);
        let map = detect(&h);
        assert_eq!(map.get(ColumnRole::Title), Some(1));
    }

    #[test]
    fn gsin_code_skips_description_column() {
        let h = headers(&["gsinDescription-nibsDescription-eng", "gsin-nibs"]);
        let map = detect(&h);
        assert_eq!(map.get(ColumnRole::Category), Some(0));
        assert_eq!(map.get(ColumnRole::GsinCode), Some(1));
    }

    #[test]
    fn plain_headers() {
        let h = headers(&["Title", "Description", "Closing Date", "Status", "Department"]);
        let map = detect(&h);
        assert_eq!(map.get(ColumnRole::Title), Some(0));
        assert_eq!(map.get(ColumnRole::Description), Some(1));
        assert_eq!(map.get(ColumnRole::ClosingDate), Some(2));
        assert_eq!(map.get(ColumnRole::Status), Some(3));
        assert_eq!(map.get(ColumnRole::Authority), Some(4));
        assert_eq!(map.get(ColumnRole::Category), None);
    }

    #[test]
    fn specific_prefix_beats_earlier_header() {
        let h = headers(&["closing_notes", "tenderClosingDate-appelOffresDateCloture"]);
        let map = detect(&h);
        assert_eq!(map.get(ColumnRole::ClosingDate), Some(1));
    }

    #[test]
    fn unknown_headers_map_nothing() {
        let h = headers(&["foo", "bar"]);
        assert!(detect(&h).0.is_empty());
    }
}
