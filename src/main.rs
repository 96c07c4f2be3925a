mod analytics;
mod app;
mod auth;
mod billing;
mod components;
mod config;
mod db;
mod error;
mod inventory;
mod models;
mod notifications;
mod reports;
mod scheduling;
mod service;
mod tui;
mod utils;

use anyhow::{Context, Result};
use app::App;
use config::{AppConfig, APP_NAME, APP_VERSION};
use ratatui::prelude::{CrosstermBackend, Terminal};
use service::Hospital;
use std::fs::OpenOptions;
use std::io;
use std::rc::Rc;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tui::Tui;

/// Logs go to a file; stdout belongs to the terminal UI.
fn init_logging(config: &AppConfig) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Cannot open log file {}", config.log_file.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let config = AppConfig::from_env();
    init_logging(&config)?;
    tracing::info!("{APP_NAME} starting v{APP_VERSION}");
    config.log_warnings();

    let hospital = Rc::new(Hospital::open(config).context("Failed to open the database")?);

    let _guard = CleanupGuard;

    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let mut tui = Tui::new(terminal);
    tui.init()?;

    let mut app = App::new(hospital);
    let res = app.run(&mut tui);

    tui.exit()?;

    if let Err(e) = res {
        tracing::error!("Application error: {e:#}");
        eprintln!("Application Error: {e}");
    }
    tracing::info!("{APP_NAME} stopped");
    Ok(())
}

struct CleanupGuard;

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // Ignore errors during cleanup
        let _ = tui::restore();
    }
}
