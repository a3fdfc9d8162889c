//! "Tenders" screen — search box, result list and the selected tender's card.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::state::Dashboard;
use crate::widgets::card_lines;

pub(crate) struct TendersScreen {
    editing: bool,
}

impl TendersScreen {
    pub(crate) fn new() -> Self {
        Self { editing: false }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, dash: &Dashboard) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Search
                Constraint::Min(1),   // List + card
            ])
            .split(area);

        let search_style = if self.editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let hint = if self.editing {
            " Search · Enter to apply · Esc to cancel "
        } else {
            " Search · / to edit "
        };
        let search = Paragraph::new(dash.search_input.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(hint)
                .border_style(search_style),
        );
        f.render_widget(search, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[1]);

        self.draw_list(f, body[0], dash);

        let card = match dash.selected_tender() {
            Some(tender) => Paragraph::new(card_lines(tender)).wrap(Wrap { trim: false }),
            None => Paragraph::new("No tender selected.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
        };
        f.render_widget(
            card.block(Block::default().borders(Borders::ALL).title(" Tender ")),
            body[1],
        );
    }

    fn draw_list(&self, f: &mut Frame, area: Rect, dash: &Dashboard) {
        let title = match dash.origin {
            Some(origin) => format!(" {} · {origin} ", dash.summary),
            None => format!(" {} ", dash.summary),
        };

        if dash.visible.is_empty() {
            let empty = Paragraph::new(if dash.table.is_some() {
                "No tenders match.\n\nEdit the search or clear filters with 'c' on the Filters tab."
            } else {
                "No data loaded.\n\nPress 'r' to download tender notices."
            })
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = dash
            .visible_tenders()
            .map(|t| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<11}", t.closing_date_raw.chars().take(10).collect::<String>()),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(t.title.clone()),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▸ ");

        let mut state = ListState::default().with_selected(Some(dash.selected));
        f.render_stateful_widget(list, area, &mut state);
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
                    dash.apply_search(today);
                    return Some(dash.summary.clone());
                }
                KeyCode::Backspace => {
                    dash.search_input.pop();
                }
                KeyCode::Char(c) => dash.search_input.push(c),
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Char('/') => self.editing = true,
            KeyCode::Enter => {
                dash.apply_search(today);
                return Some(dash.summary.clone());
            }
            KeyCode::Up | KeyCode::Char('k') => dash.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => dash.select_next(),
            _ => {}
        }
        None
    }
}
