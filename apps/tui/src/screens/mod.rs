//! TUI screen definitions.
//!
//! Each screen corresponds to a tab in the TUI and keeps its own input
//! state; the data they show lives in the shared [`Dashboard`].

mod assistant;
mod filters;
mod tenders;

use std::fmt;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;

use crate::state::Dashboard;

/// Screen identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenId {
    Tenders,
    Filters,
    Assistant,
}

impl ScreenId {
    pub(crate) const ALL: [ScreenId; 3] = [Self::Tenders, Self::Filters, Self::Assistant];
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tenders => write!(f, "Tenders"),
            Self::Filters => write!(f, "Filters"),
            Self::Assistant => write!(f, "Assistant"),
        }
    }
}

/// Per-screen state and behaviour.
pub(crate) struct Screens {
    tenders: tenders::TendersScreen,
    filters: filters::FiltersScreen,
    assistant: assistant::AssistantScreen,
}

impl Screens {
    pub(crate) fn new() -> Self {
        Self {
            tenders: tenders::TendersScreen::new(),
            filters: filters::FiltersScreen::new(),
            assistant: assistant::AssistantScreen::new(),
        }
    }

    /// Whether the screen has an active text input field.
    pub(crate) fn is_editing(&self, id: ScreenId) -> bool {
        match id {
            ScreenId::Tenders => self.tenders.is_editing(),
            ScreenId::Filters => self.filters.is_editing(),
            ScreenId::Assistant => false,
        }
    }

    /// Scroll the assistant view back to the top.
    pub(crate) fn reset_assistant(&mut self) {
        self.assistant.reset();
    }

    pub(crate) fn draw(&self, id: ScreenId, f: &mut Frame, area: Rect, dash: &Dashboard) {
        match id {
            ScreenId::Tenders => self.tenders.draw(f, area, dash),
            ScreenId::Filters => self.filters.draw(f, area, dash),
            ScreenId::Assistant => self.assistant.draw(f, area, dash),
        }
    }

    /// Route a key to the screen. Returns a status message when one results.
    pub(crate) fn handle_key(
        &mut self,
        id: ScreenId,
        code: KeyCode,
        modifiers: KeyModifiers,
        dash: &mut Dashboard,
        today: NaiveDate,
    ) -> Option<String> {
        match id {
            ScreenId::Tenders => self.tenders.handle_key(code, modifiers, dash, today),
            ScreenId::Filters => self.filters.handle_key(code, modifiers, dash, today),
            ScreenId::Assistant => {
                self.assistant.handle_key(code, modifiers);
                None
            }
        }
    }
}
