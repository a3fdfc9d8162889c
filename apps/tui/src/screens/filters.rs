//! "Filters" screen — category/status/authority dropdowns, closing date and open-only toggle.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::state::{Dashboard, Dropdown};

/// Which control is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Category,
    Status,
    Authority,
    ClosingAfter,
    OpenOnly,
}

impl Field {
    const ALL: [Field; 5] = [
        Field::Category,
        Field::Status,
        Field::Authority,
        Field::ClosingAfter,
        Field::OpenOnly,
    ];

    fn dropdown(self) -> Option<Dropdown> {
        match self {
            Self::Category => Some(Dropdown::Category),
            Self::Status => Some(Dropdown::Status),
            Self::Authority => Some(Dropdown::Authority),
            _ => None,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Category => " Category ",
            Self::Status => " Status ",
            Self::Authority => " Contracting authority ",
            Self::ClosingAfter => " Closing on or after (YYYY-MM-DD) ",
            Self::OpenOnly => " Open tenders only ",
        }
    }
}

pub(crate) struct FiltersScreen {
    focused: usize,
    editing: bool,
}

impl FiltersScreen {
    pub(crate) fn new() -> Self {
        Self {
            focused: 0,
            editing: false,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    fn field(&self) -> Field {
        Field::ALL[self.focused]
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, dash: &Dashboard) {
        let mut constraints = vec![Constraint::Length(3); Field::ALL.len()];
        constraints.push(Constraint::Length(2)); // Hint
        constraints.push(Constraint::Min(1)); // Summary
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints(constraints)
            .split(area);

        for (i, field) in Field::ALL.iter().enumerate() {
            let focused = i == self.focused;
            let style = if focused && self.editing {
                Style::default().fg(Color::Yellow)
            } else if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };

            let text = match field.dropdown() {
                Some(dropdown) => {
                    let value = dash.current(dropdown).unwrap_or("All");
                    let count = dash.options(dropdown).len() - 1;
                    format!("< {value} >  ({count} values)")
                }
                None if *field == Field::ClosingAfter => dash.closing_input.clone(),
                None => (if dash.filter.open_only { "[x] yes" } else { "[ ] no" }).to_string(),
            };

            let p = Paragraph::new(text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(field.title())
                    .border_style(style),
            );
            f.render_widget(p, chunks[i]);
        }

        let hint = if self.editing {
            "Type a date · Enter to apply · Esc to stop editing"
        } else {
            "↑/↓ select · ←/→ change · Enter edit/toggle · c clear all"
        };
        let hint_p = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint_p, chunks[Field::ALL.len()]);

        let summary = Paragraph::new(dash.summary.as_str()).alignment(Alignment::Center);
        f.render_widget(summary, chunks[Field::ALL.len() + 1]);
    }

    /// Returns a status message when the key produced one.
    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        dash: &mut Dashboard,
        today: NaiveDate,
    ) -> Option<String> {
        if self.editing {
            match code {
                KeyCode::Esc => self.editing = false,
                KeyCode::Enter => {
                    self.editing = false;
                    return Some(match dash.apply_closing_input(today) {
                        Ok(()) => dash.summary.clone(),
                        Err(msg) => msg,
                    });
                }
                KeyCode::Backspace => {
                    dash.closing_input.pop();
                }
                KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => dash.closing_input.push(c),
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.focused = self.focused.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.focused + 1 < Field::ALL.len() {
                    self.focused += 1;
                }
            }
            KeyCode::Left | KeyCode::Right => {
                let dropdown = self.field().dropdown()?;
                dash.cycle(dropdown, code == KeyCode::Right, today);
                return Some(dash.summary.clone());
            }
            KeyCode::Enter | KeyCode::Char(' ') => match self.field() {
                Field::ClosingAfter => self.editing = true,
                Field::OpenOnly => {
                    dash.toggle_open_only(today);
                    return Some(dash.summary.clone());
                }
                field => {
                    if let Some(dropdown) = field.dropdown() {
                        dash.cycle(dropdown, true, today);
                        return Some(dash.summary.clone());
                    }
                }
            },
            KeyCode::Char('c') => {
                dash.clear_filters(today);
                return Some("Filters cleared.".to_string());
            }
            _ => {}
        }
        None
    }
}
