//! Domain logic shared by the TenderPilot frontends.
//!
//! Ties the dataset, storage and LLM crates together: load the tender
//! table (with snapshot caching), filter and page it, and run the
//! per-tender assistant actions.

pub mod assist;
pub mod filter;
pub mod loader;
pub mod view;

pub use assist::{AssistOutput, assist};
pub use filter::{FacetValue, Facets, TenderFilter, apply, facets, select};
pub use loader::{LoadOptions, LoadOrigin, LoadOutcome, ProgressReporter, SilentProgress, load_tenders};
pub use view::{ResultPage, card, result_page};
