//! "Assistant" screen — the last winning strategy or outreach email.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::state::Dashboard;

pub(crate) struct AssistantScreen {
    scroll: u16,
}

impl AssistantScreen {
    pub(crate) fn new() -> Self {
        Self { scroll: 0 }
    }

    /// Back to the top, for a new answer.
    pub(crate) fn reset(&mut self) {
        self.scroll = 0;
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, dash: &Dashboard) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Min(1),   // Output
                Constraint::Length(1), // Footer
            ])
            .split(area);

        let Some(entry) = &dash.assist else {
            let empty = Paragraph::new(
                "No assistant output yet.\n\nSelect a tender on the Tenders tab and press \
                 's' for a winning strategy or 'e' for an outreach email.",
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Assistant "));
            f.render_widget(empty, chunks[0]);
            return;
        };

        let output = Paragraph::new(entry.output.text.as_str())
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} · {} ", entry.output.task, entry.tender_title)),
            );
        f.render_widget(output, chunks[0]);

        let mut footer = format!("{} · ↑/↓ scroll", entry.output.model);
        if entry.output.cached {
            footer.push_str(" · cached");
        }
        let footer_p = Paragraph::new(footer)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(footer_p, chunks[1]);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Home => self.scroll = 0,
            _ => {}
        }
    }
}
