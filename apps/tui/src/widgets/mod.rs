//! Reusable TUI widgets.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use tenderpilot_core::card;
use tenderpilot_shared::Tender;

/// Bottom status bar.
pub(crate) fn status_bar(msg: &str) -> Paragraph<'_> {
    Paragraph::new(format!(" {msg}"))
        .style(
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White),
        )
}

/// Styled lines for a tender card: bold labels, description last.
pub(crate) fn card_lines(tender: &Tender) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let mut lines = Vec::new();
    for (label, value) in card(tender) {
        match label {
            "Title" => {
                lines.push(Line::from(value).style(Style::default().add_modifier(Modifier::BOLD)));
                lines.push(Line::from(""));
            }
            "Description" => {
                lines.push(Line::from(""));
                lines.extend(value.lines().map(|l| Line::from(l.to_string())));
            }
            _ => lines.push(Line::from(vec![
                Span::styled(format!("{label:<11}"), label_style),
                Span::raw(value),
            ])),
        }
    }
    lines
}
