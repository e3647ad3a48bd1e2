mod commands;
mod state;
mod theme;
mod ui;

use acute_core::{FeedConfig, VanishedPolicy};
use acute_sync::config::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_MS};
use acute_sync::{spawn_poller, PollEvent, PollerHandle, SummaryClient, SyncConfig, DEFAULT_BASE_URL};
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_COMPACT_WIDTH: u16 = 100;
const POLL_QUEUE_CAPACITY: usize = 16;
const REDRAW_TICK_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "acute-dashboard")]
#[command(about = "Live dashboard for acute case summaries", long_about = None)]
struct Cli {
    /// Base URL of the summary service
    #[arg(long, env = "ACUTE_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, env = "ACUTE_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    interval_ms: u64,
    #[arg(long, env = "ACUTE_REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    timeout_ms: u64,
    /// Terminal width in columns below which opening a case hides the list
    #[arg(long, env = "ACUTE_COMPACT_WIDTH", default_value_t = DEFAULT_COMPACT_WIDTH)]
    breakpoint: u16,
    /// Consecutive failed polls before the error replaces the view
    #[arg(long, env = "ACUTE_ERROR_THRESHOLD", default_value_t = 1)]
    error_threshold: u32,
    /// What to do with an open case that disappears: retain or clear
    #[arg(long, env = "ACUTE_VANISHED_POLICY", default_value = "retain")]
    vanished: VanishedPolicy,
    #[command(subcommand)]
    command: Option<commands::Command>,
}

impl Cli {
    fn sync_config(&self) -> Result<SyncConfig> {
        let config = SyncConfig::new(&self.base_url)?
            .with_poll_interval(Duration::from_millis(self.interval_ms))
            .with_request_timeout(Duration::from_millis(self.timeout_ms));
        Ok(config)
    }

    fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            vanished_policy: self.vanished,
            error_threshold: self.error_threshold.max(1),
            breakpoint: self.breakpoint,
        }
    }
}

#[derive(Clone, Copy)]
enum LogTarget {
    Stderr,
    Dashboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let sync_config = cli.sync_config()?;
    let feed_config = cli.feed_config();

    match cli.command {
        Some(command) => {
            init_logging(LogTarget::Stderr);
            commands::run(command, &sync_config).await
        }
        None => {
            init_logging(LogTarget::Dashboard);
            run_dashboard(sync_config, feed_config).await
        }
    }
}

async fn run_dashboard(sync_config: SyncConfig, feed_config: FeedConfig) -> Result<()> {
    let client =
        Arc::new(SummaryClient::new(&sync_config).context("Failed to build summary client")?);
    let (poll_tx, mut poll_rx) = mpsc::channel(POLL_QUEUE_CAPACITY);
    let poller = spawn_poller(client, sync_config.poller(), poll_tx);
    info!(
        base_url = %sync_config.base_url,
        interval_ms = sync_config.poll_interval.as_millis() as u64,
        "dashboard_started"
    );

    let mut app = state::App::new(feed_config, sync_config.base_url.to_string());
    if let Ok((width, _)) = crossterm::terminal::size() {
        app.set_viewport_width(width);
    }

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, &poller, &mut poll_rx).await;

    app.feed.deactivate();
    poller.shutdown().await;
    restore_terminal(&mut terminal)?;
    info!("dashboard_stopped");

    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut state::App,
    poller: &PollerHandle,
    poll_rx: &mut mpsc::Receiver<PollEvent>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut redraw_ticker = tokio::time::interval(Duration::from_millis(REDRAW_TICK_MS));
    let mut dirty = true;

    loop {
        if dirty {
            terminal.draw(|frame| ui::render(frame, app))?;
            dirty = false;
        }

        tokio::select! {
            _ = redraw_ticker.tick() => {
                dirty = true;
            }
            Some(event) = poll_rx.recv() => {
                dirty = app.handle_poll_event(event);
            }
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => {
                    app.handle_event(event);
                    dirty = true;
                }
                Some(Err(err)) => warn!("terminal_event_error: {err}"),
                None => break,
            }
        }

        if app.take_refresh_request() && !poller.refresh_now() {
            app.status_note = Some("Poller stopped; restart the dashboard".to_string());
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

fn init_logging(target: LogTarget) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init();
        }
        LogTarget::Dashboard => match open_log_file() {
            Some(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
            }
            None => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(io::sink)
                    .try_init();
            }
        },
    }
}

/// The terminal belongs to the UI, so dashboard logs go to `ACUTE_LOG_FILE`
/// or nowhere.
fn open_log_file() -> Option<std::fs::File> {
    let path = std::env::var("ACUTE_LOG_FILE").ok()?;
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}
