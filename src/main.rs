use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;
use tracing::info;

use distwatch::data::limits::WINDOW_CAPACITY;
use distwatch::logging::{self, LogTarget};
#[cfg(feature = "supabase")]
use distwatch::source::SupabaseBackend;
use distwatch::source::{load_seed, ChannelBackend, MeasurementBackend, StreamBackend};
use distwatch::{events, ui, App, Settings, Theme};

#[derive(Parser, Debug)]
#[command(name = "distwatch")]
#[command(about = "Live dashboard for distance-sensor readings")]
struct Args {
    /// Settings file (TOML); see the `settings` module for the layout
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Connect to a TCP endpoint streaming newline-delimited JSON (host:port)
    #[arg(short, long)]
    connect: Option<String>,

    /// JSON file with the initial readings
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// Table to read and subscribe to
    #[arg(short, long)]
    table: Option<String>,

    /// Render the chart to an SVG file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Chart width in pixels for exports
    #[arg(short, long)]
    width: Option<f64>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let interactive = args.export.is_none();
    logging::init(&LogTarget::select(args.log_file.as_deref(), interactive))?;

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(ref table) = args.table {
        settings.table.name = table.clone();
    }
    if let Some(width) = args.width {
        settings.chart.width = width;
    }

    let rt = Runtime::new()?;
    let backend = rt.block_on(build_backend(&args, &settings))?;
    info!("Using {}", backend.description());

    let theme = if interactive {
        Theme::auto_detect()
    } else {
        Theme::dark()
    };
    let mut app = App::new(backend, settings.table.filter(), theme);
    app.set_chart_width(settings.chart.width);

    // Handle export mode (non-interactive)
    if let Some(ref export_path) = args.export {
        return export_to_file(&rt, &mut app, export_path);
    }

    run_tui(&rt, app)
}

/// Pick a backend: `--connect` first, then the configured Supabase project,
/// then a configured stream, then the seed file alone.
async fn build_backend(args: &Args, settings: &Settings) -> Result<Arc<dyn MeasurementBackend>> {
    let seed = args.seed.clone().or_else(|| settings.stream.seed.clone());
    let stream = |addr: &str| {
        let backend = StreamBackend::tcp(addr);
        match seed {
            Some(ref path) => backend.with_seed(path.clone()),
            None => backend,
        }
    };

    if let Some(ref addr) = args.connect {
        return Ok(Arc::new(stream(addr)));
    }

    #[cfg(feature = "supabase")]
    if let Some(ref config) = settings.supabase {
        let backend = SupabaseBackend::new(config.clone(), settings.table.filter())?;
        return Ok(Arc::new(backend));
    }

    if let Some(ref addr) = settings.stream.connect {
        return Ok(Arc::new(stream(addr)));
    }

    let Some(path) = seed else {
        bail!("No data source: pass --connect, --seed, or a --config with a [supabase] or [stream] section");
    };

    // Offline: replay the seed file with no live updates
    let (feed, backend) = ChannelBackend::create(&path.display().to_string());
    for measurement in load_seed(&path, WINDOW_CAPACITY).await? {
        feed.store(measurement);
    }
    Ok(Arc::new(backend))
}

/// Load the initial readings and write the chart as SVG
fn export_to_file(rt: &Runtime, app: &mut App, export_path: &Path) -> Result<()> {
    let loaded = rt.block_on(app.startup());
    rt.block_on(app.shutdown());
    loaded?;

    app.export_svg(export_path)?;
    println!("Exported chart to: {}", export_path.display());
    Ok(())
}

/// Run the TUI until the user quits
fn run_tui(rt: &Runtime, mut app: App) -> Result<()> {
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
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    // Load initial data; failures are shown in the status bar
    app.loading = true;
    terminal.draw(|frame| ui::draw(frame, &app))?;
    let _ = rt.block_on(app.startup());

    // Run the main loop
    let result = run_app(&mut terminal, rt, &mut app);

    rt.block_on(app.shutdown());

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

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    rt: &Runtime,
    app: &mut App,
) -> Result<()> {
    while app.running {
        app.pump();

        terminal.draw(|frame| ui::draw(frame, app))?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse),
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }

        if app.reconnect_requested {
            rt.block_on(app.reconnect());
        }
    }

    Ok(())
}
