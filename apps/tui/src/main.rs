//! TenderPilot TUI — interactive terminal dashboard for tender notices.
//!
//! Tabs for searching and filtering the tender list and for reading the
//! assistant's strategies and emails, built with `ratatui` + `crossterm`.

mod app;
mod screens;
mod state;
mod widgets;

use std::fs::OpenOptions;
use std::sync::Mutex;

use color_eyre::eyre::Result;
use tenderpilot_shared::{config_dir, load_config};

/// Log file under the config dir; the terminal belongs to the UI.
const LOG_FILE_NAME: &str = "tui.log";

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let config = load_config()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    app::run(config, runtime)
}

/// Send logs to `~/.tenderpilot/tui.log`. Logging is skipped if the file
/// cannot be opened.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let Ok(dir) = config_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))
    else {
        return;
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tenderpilot=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}
