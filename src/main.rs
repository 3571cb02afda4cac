use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use flowwatch::data::export::{build_document, write_document};
use flowwatch::ui::{self, Theme};
use flowwatch::{
    events, App, FileSource, FlowStore, Overrides, Settings, Telemetry, TelemetryClient,
    TelemetrySource,
};

#[derive(Parser, Debug)]
#[command(name = "flowwatch")]
#[command(about = "Terminal visualizer for agent and monitor telemetry flows and traces")]
struct Args {
    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Origin of the telemetry API
    #[arg(short, long, conflicts_with = "file")]
    base_url: Option<String>,

    /// Replay an exported JSON document instead of calling the API
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Auto-refresh interval (e.g., "10s", "1m")
    #[arg(short, long)]
    refresh: Option<String>,

    /// Start with auto-refresh turned off
    #[arg(long)]
    no_auto_refresh: bool,

    /// Number of traces requested per reload
    #[arg(long)]
    trace_limit: Option<usize>,

    /// HTTP request timeout (e.g., "10s")
    #[arg(long)]
    timeout: Option<String>,

    /// Directory the in-app export writes to
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Fetch once, write the export document to this path and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Write logs to this file (the TUI owns the terminal)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            refresh_interval: self.refresh.clone(),
            auto_refresh: self.no_auto_refresh.then_some(false),
            trace_limit: self.trace_limit,
            request_timeout: self.timeout.clone(),
            export_dir: self.export_dir.clone(),
            log_file: self.log_file.clone(),
            replay_file: self.file.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref(), &args.overrides())?;

    init_logging(settings.log_file.as_deref(), args.export.is_some())?;
    tracing::info!(
        base_url = %settings.base_url,
        refresh = ?settings.refresh_interval,
        auto_refresh = settings.auto_refresh,
        trace_limit = settings.trace_limit,
        "starting flowwatch"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let telemetry = Telemetry::new(build_source(&settings)?);

    // Handle export mode (non-interactive)
    if let Some(export_path) = args.export {
        return rt.block_on(export_once(&telemetry, &settings, &export_path));
    }

    // Spawned reloads and the refresh timer need the runtime context
    let _guard = rt.enter();
    run_tui(telemetry, &settings)
}

/// Logs go to the log file when one is configured. Without one, only the
/// non-interactive export mode logs, to stderr.
fn init_logging(log_file: Option<&Path>, export_mode: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowwatch=info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if export_mode => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

/// The replay file wins over the HTTP API when both are configured.
fn build_source(settings: &Settings) -> Result<Arc<dyn TelemetrySource>> {
    if let Some(path) = &settings.replay_file {
        return Ok(Arc::new(FileSource::new(path)));
    }
    let client = TelemetryClient::builder()
        .base_url(settings.base_url.clone())
        .timeout(settings.request_timeout)
        .build()?;
    Ok(Arc::new(client))
}

/// Fetch both flow pipelines and the trace list once, then write them out.
async fn export_once(telemetry: &Telemetry, settings: &Settings, path: &Path) -> Result<()> {
    let ((agent, monitor), traces) = tokio::join!(
        telemetry.all_flows(),
        telemetry.traces(settings.trace_limit, None)
    );

    let mut store = FlowStore::new();
    store.replace_flows(agent.flows, monitor.flows);
    store.replace_traces(traces.traces);

    let doc = build_document(&store, Utc::now());
    write_document(&doc, path)?;
    println!("Exported to {}", path.display());
    Ok(())
}

/// Run the TUI until the user quits.
fn run_tui(telemetry: Telemetry, settings: &Settings) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let mut app = App::new(telemetry, settings, Theme::auto_detect());
    app.start(settings.auto_refresh);

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    while app.running {
        terminal.draw(|frame| ui::draw(frame, app))?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse),
                // Terminal will redraw on next iteration
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        app.process_ticks();
        app.process_updates();
    }

    tracing::info!("shutting down");
    Ok(())
}
