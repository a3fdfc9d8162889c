//! Core TUI application state and event loop.
//!
//! Downloads and completions run on the tokio runtime via `block_on`, so the
//! interface is frozen while a request is in flight; the status bar says so
//! before each one starts.

use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use tokio::runtime::Runtime;
use tracing::{info, warn};

use tenderpilot_core::{LoadOptions, SilentProgress, assist, load_tenders};
use tenderpilot_llm::{AssistTask, client_from_config};
use tenderpilot_shared::{AppConfig, db_path};
use tenderpilot_storage::Storage;

use crate::screens::{ScreenId, Screens};
use crate::state::{AssistEntry, Dashboard};
use crate::widgets::status_bar;

/// Blocking work requested by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Load the dataset; `force` skips the snapshot cache.
    Refresh { force: bool },
    /// Run the assistant on the selected tender.
    Assist(AssistTask),
}

impl Action {
    fn pending_message(&self) -> String {
        match self {
            Self::Refresh { .. } => "Loading tender notices…".to_string(),
            Self::Assist(task) => format!("{task}: waiting for the model…"),
        }
    }
}

/// Application state.
pub(crate) struct App {
    /// Currently active screen tab.
    pub active_tab: usize,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Status message shown in bottom bar.
    pub status: String,
    /// Whether help overlay is visible.
    pub show_help: bool,
    /// Per-screen input state.
    pub screens: Screens,
    /// Data shown across all tabs.
    pub dashboard: Dashboard,
    config: AppConfig,
    storage: Option<Storage>,
    runtime: Runtime,
}

impl App {
    pub(crate) fn new(config: AppConfig, runtime: Runtime) -> Self {
        let storage = match db_path(&config) {
            Ok(path) => match runtime.block_on(Storage::open(&path)) {
                Ok(storage) => Some(storage),
                Err(e) => {
                    warn!(error = %e, "local cache unavailable");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "local cache unavailable");
                None
            }
        };

        Self {
            active_tab: 0,
            should_quit: false,
            status: "Ready — press ? for help".to_string(),
            show_help: false,
            screens: Screens::new(),
            dashboard: Dashboard::new(config.display.page_size),
            config,
            storage,
            runtime,
        }
    }

    fn current_screen(&self) -> ScreenId {
        ScreenId::ALL[self.active_tab]
    }

    fn is_editing(&self) -> bool {
        self.screens.is_editing(self.current_screen())
    }

    fn switch_to(&mut self, id: ScreenId) {
        if let Some(idx) = ScreenId::ALL.iter().position(|s| *s == id) {
            self.active_tab = idx;
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::Refresh { force } => self.refresh(force),
            Action::Assist(task) => self.run_assist(task),
        }
    }

    fn refresh(&mut self, force: bool) {
        let opts = match LoadOptions::from_config(&self.config, None, force) {
            Ok(opts) => opts,
            Err(e) => {
                self.status = format!("Load failed: {e}");
                return;
            }
        };

        match self
            .runtime
            .block_on(load_tenders(&opts, self.storage.as_ref(), &SilentProgress))
        {
            Ok(outcome) => {
                let rows = outcome.table.len();
                self.dashboard.set_table(outcome.table, outcome.origin, today());
                self.status = format!(
                    "{rows} tenders ({}) · {}",
                    outcome.origin, self.dashboard.summary
                );
            }
            Err(e) => {
                warn!(error = %e, "dataset load failed");
                self.status = format!("Load failed: {e}");
            }
        }
    }

    fn run_assist(&mut self, task: AssistTask) {
        let Some(tender) = self.dashboard.selected_tender().cloned() else {
            self.status = "No tender selected.".to_string();
            return;
        };

        let client = match client_from_config(&self.config.ai) {
            Ok(client) => client,
            Err(e) => {
                self.status = e.to_string();
                return;
            }
        };

        info!(task = task.as_str(), row = tender.row, "running assistant");
        let result = self.runtime.block_on(assist(
            task,
            &tender,
            &self.config.profile,
            client.as_ref(),
            self.storage.as_ref(),
            true,
        ));

        match result {
            Ok(output) => {
                self.status = format!(
                    "{} ready{}",
                    task.label(),
                    if output.cached { " (cached)" } else { "" }
                );
                self.dashboard.assist = Some(AssistEntry {
                    tender_title: tender.title,
                    output,
                });
                self.screens.reset_assistant();
                self.switch_to(ScreenId::Assistant);
            }
            Err(e) => {
                warn!(error = %e, "assistant request failed");
                self.status = format!("{} failed: {e}", task.label());
            }
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Entry point — sets up terminal, runs event loop, restores terminal.
pub(crate) fn run(config: AppConfig, runtime: Runtime) -> Result<()> {
    let mut app = App::new(config, runtime);

    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let mut pending = Some(Action::Refresh { force: false });

    loop {
        if let Some(action) = pending.take() {
            app.status = action.pending_message();
            terminal.draw(|f| draw(f, app))?;
            app.perform(action);
        }

        terminal.draw(|f| draw(f, app))?;

        // Poll for events with 100ms timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    pending = handle_key(app, key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    // Global keybindings (always active)
    match code {
        KeyCode::Char('q') | KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return None;
        }
        KeyCode::Char('q') if !app.is_editing() => {
            app.should_quit = true;
            return None;
        }
        KeyCode::Char('?') if !app.is_editing() => {
            app.show_help = !app.show_help;
            return None;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return None;
        }
        _ => {}
    }

    // If help is showing, consume any key to dismiss
    if app.show_help {
        app.show_help = false;
        return None;
    }

    if !app.is_editing() {
        match code {
            KeyCode::Char(c @ '1'..='3') => {
                app.active_tab = (c as usize) - ('1' as usize);
                app.status = app.current_screen().to_string();
                return None;
            }
            KeyCode::Tab => {
                app.active_tab = (app.active_tab + 1) % ScreenId::ALL.len();
                app.status = app.current_screen().to_string();
                return None;
            }
            KeyCode::BackTab => {
                app.active_tab = (app.active_tab + ScreenId::ALL.len() - 1) % ScreenId::ALL.len();
                app.status = app.current_screen().to_string();
                return None;
            }
            KeyCode::Char('r') => return Some(Action::Refresh { force: true }),
            KeyCode::Char('s') => return Some(Action::Assist(AssistTask::WinningStrategy)),
            KeyCode::Char('e') => return Some(Action::Assist(AssistTask::OutreachEmail)),
            _ => {}
        }
    }

    // Delegate to current screen
    let id = app.current_screen();
    if let Some(msg) = app
        .screens
        .handle_key(id, code, modifiers, &mut app.dashboard, today())
    {
        app.status = msg;
    }
    None
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Tab bar
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    // Tab bar
    let tab_titles: Vec<Line> = ScreenId::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| Line::from(format!("{} {s}", i + 1)))
        .collect();

    let tabs = Tabs::new(tab_titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" GovTender Autopilot "),
        )
        .select(app.active_tab)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" │ ");

    f.render_widget(tabs, chunks[0]);

    // Content area — delegate to screen
    app.screens
        .draw(app.current_screen(), f, chunks[1], &app.dashboard);

    // Status bar
    let bar = status_bar(&app.status);
    f.render_widget(bar, chunks[2]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  1-3          Switch to screen"),
        Line::from("  Tab/S-Tab    Next/previous screen"),
        Line::from("  r            Download tender notices again"),
        Line::from("  s            Winning strategy for selected tender"),
        Line::from("  e            Outreach email for selected tender"),
        Line::from("  ?            Toggle this help"),
        Line::from("  q / Ctrl-C   Quit"),
        Line::from(""),
        Line::from("Screen-specific:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  /            Edit search (Tenders)"),
        Line::from("  Enter        Apply search / edit or toggle filter"),
        Line::from("  Esc          Stop editing"),
        Line::from("  ↑/↓          Navigate lists / scroll"),
        Line::from("  ←/→          Change dropdown value (Filters)"),
        Line::from("  c            Clear all filters (Filters)"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help — press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
