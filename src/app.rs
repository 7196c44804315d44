//! Application state and lifecycle.
//!
//! The app owns the window and the chart scene and is driven from a single
//! loop: [`App::startup`] loads the initial batch and opens the live feed,
//! [`App::pump`] applies whatever arrived since the last call, and
//! [`App::shutdown`] closes the feed. Every applied reading re-renders the
//! chart exactly once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};

use crate::chart::{ChartRenderer, RenderOutcome, Scene, SvgSurface};
use crate::data::limits::{CHART_DEFAULT_WIDTH, WINDOW_CAPACITY};
use crate::data::{Measurement, MeasurementWindow, Status};
use crate::error::CloseOutcome;
use crate::source::{MeasurementBackend, StreamSubscription, TableFilter};
use crate::ui::Theme;

/// Shown when the initial load or the live feed cannot be set up.
pub const LOAD_ERROR_MESSAGE: &str =
    "Failed to load distance measurements. Please check your connection and configuration.";

/// Default file for interactive exports.
pub const DEFAULT_EXPORT_PATH: &str = "distwatch_chart.svg";

/// How long a status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    // Data
    backend: Arc<dyn MeasurementBackend>,
    subscription: StreamSubscription,
    pub window: MeasurementWindow,
    pub loading: bool,
    pub load_error: Option<String>,

    // Chart
    renderer: ChartRenderer,
    pub scene: Scene,
    pub render_count: u64,
    pub chart_width: f64,

    // Navigation state
    pub selected_index: usize,

    // UI
    pub theme: Theme,
    pub export_path: PathBuf,
    pub reconnect_requested: bool,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create an app reading `filter`'s table from `backend`.
    pub fn new(backend: Arc<dyn MeasurementBackend>, filter: TableFilter, theme: Theme) -> Self {
        Self {
            running: true,
            show_help: false,
            subscription: StreamSubscription::new(backend.clone(), filter),
            backend,
            window: MeasurementWindow::with_capacity(WINDOW_CAPACITY),
            loading: false,
            load_error: None,
            renderer: ChartRenderer::new(),
            scene: Scene::new(),
            render_count: 0,
            chart_width: CHART_DEFAULT_WIDTH,
            selected_index: 0,
            theme,
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
            reconnect_requested: false,
            status_message: None,
        }
    }

    /// Returns a description of the current backend.
    pub fn source_description(&self) -> &str {
        self.backend.description()
    }

    /// Status of the latest reading.
    pub fn status(&self) -> Status {
        self.window.status()
    }

    /// Load the newest readings, draw them and open the live feed.
    ///
    /// On failure the error state is set for display and the error is also
    /// returned. The loading flag is cleared either way.
    pub async fn startup(&mut self) -> Result<()> {
        self.loading = true;
        self.load_error = None;
        let result = self.load().await;
        self.loading = false;

        if let Err(ref e) = result {
            error!("Startup failed: {:#}", e);
            self.load_error = Some(LOAD_ERROR_MESSAGE.to_string());
        }
        result
    }

    async fn load(&mut self) -> Result<()> {
        let batch = self
            .backend
            .fetch_latest(WINDOW_CAPACITY)
            .await
            .context("fetching initial measurements")?;
        info!("Loaded {} measurements", batch.len());

        self.window.seed(batch);
        self.render();

        self.subscription
            .start()
            .await
            .context("opening live updates")?;
        Ok(())
    }

    /// Apply every reading that arrived since the last call.
    ///
    /// Returns the number of readings applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(measurement) = self.subscription.try_next() {
            self.apply(measurement);
            applied += 1;
        }
        applied
    }

    /// Wait for the next reading and apply it.
    ///
    /// Returns `false` once the live feed has ended or is not running.
    pub async fn wait_for_update(&mut self) -> bool {
        match self.subscription.next().await {
            Some(measurement) => {
                self.apply(measurement);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, measurement: Measurement) {
        self.window.push(measurement);
        self.clamp_selection();
        self.render();
    }

    /// Redraw the chart from the current window.
    pub fn render(&mut self) -> RenderOutcome {
        self.render_count += 1;
        self.renderer
            .render_width(&mut self.scene, self.window.all(), self.chart_width)
    }

    /// Change the chart width, redrawing if it changed.
    pub fn set_chart_width(&mut self, width: f64) {
        if width != self.chart_width {
            self.chart_width = width;
            self.render();
        }
    }

    /// Reopen the live feed.
    pub async fn reconnect(&mut self) {
        self.reconnect_requested = false;
        match self.subscription.start().await {
            Ok(()) => {
                self.load_error = None;
                self.set_status_message("Reconnected".to_string());
            }
            Err(e) => {
                warn!("Reconnect failed: {}", e);
                self.load_error = Some(LOAD_ERROR_MESSAGE.to_string());
            }
        }
    }

    /// Close the live feed.
    pub async fn shutdown(&mut self) -> CloseOutcome {
        self.subscription.stop().await
    }

    /// One-word summary of the live feed for the status bar.
    pub fn connection_label(&self) -> String {
        match self.subscription.fault() {
            Some(e) => format!("Disconnected ({})", e),
            None if self.subscription.is_active() => "Live".to_string(),
            None => "Stopped".to_string(),
        }
    }

    /// Write the current chart as an SVG document.
    pub fn export_svg(&self, path: &Path) -> Result<()> {
        let mut svg = SvgSurface::new();
        self.renderer
            .render_width(&mut svg, self.window.all(), self.chart_width);
        let Some(document) = svg.document() else {
            bail!("Need at least two readings to draw a chart");
        };
        std::fs::write(path, document)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Exported chart to {}", path.display());
        Ok(())
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.window.len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    /// Jump to the newest reading.
    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    /// Jump to the oldest reading.
    pub fn select_last(&mut self) {
        self.selected_index = self.window.len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        self.selected_index = self.selected_index.min(self.window.len().saturating_sub(1));
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Element;
    use crate::source::{ChannelBackend, ChannelFeed};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn reading(id: i64, distance: f64) -> Measurement {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(id);
        Measurement::new(id, t, "sensor-1", distance, distance > 25.0)
    }

    fn setup() -> (ChannelFeed, App) {
        let (feed, backend) = ChannelBackend::create("test");
        let app = App::new(Arc::new(backend), TableFilter::default(), Theme::dark());
        (feed, app)
    }

    fn marker_count(app: &App) -> usize {
        app.scene
            .elements()
            .iter()
            .filter(|e| matches!(e, Element::Marker { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_startup_seeds_and_renders_once() {
        let (feed, mut app) = setup();
        feed.store(reading(1, 10.0));
        feed.store(reading(2, 20.0));
        feed.store(reading(3, 30.0));

        app.startup().await.unwrap();

        assert!(!app.loading);
        assert!(app.load_error.is_none());
        assert_eq!(app.window.len(), 3);
        assert_eq!(app.window.latest().unwrap().id, 3);
        assert_eq!(app.status(), Status::Alert);
        assert_eq!(app.render_count, 1);
        assert_eq!(marker_count(&app), 3);
        assert_eq!(app.connection_label(), "Live");
    }

    #[tokio::test]
    async fn test_startup_fetch_failure_sets_error() {
        let (feed, mut app) = setup();
        feed.set_offline(true);

        assert!(app.startup().await.is_err());
        assert!(!app.loading);
        assert_eq!(app.load_error.as_deref(), Some(LOAD_ERROR_MESSAGE));
        assert!(app.window.is_empty());
        assert_eq!(app.render_count, 0);
    }

    #[tokio::test]
    async fn test_startup_subscribe_failure_sets_error() {
        let (feed, mut app) = setup();
        feed.store(reading(1, 10.0));
        feed.store(reading(2, 20.0));
        feed.refuse_subscriptions(true);

        assert!(app.startup().await.is_err());
        assert!(!app.loading);
        assert_eq!(app.load_error.as_deref(), Some(LOAD_ERROR_MESSAGE));
        assert_eq!(app.window.len(), 2);
        assert_eq!(app.window.latest().unwrap().id, 2);
        assert_eq!(app.render_count, 1);
        assert_eq!(app.connection_label(), "Stopped");
    }

    #[tokio::test]
    async fn test_each_push_renders_once() {
        let (feed, mut app) = setup();
        feed.store(reading(1, 10.0));
        app.startup().await.unwrap();
        assert_eq!(app.render_count, 1);
        assert_eq!(marker_count(&app), 0);

        feed.insert(reading(2, 12.0));
        feed.insert(reading(3, 14.0));
        assert!(app.wait_for_update().await);
        assert!(app.wait_for_update().await);

        assert_eq!(app.render_count, 3);
        assert_eq!(app.window.latest().unwrap().id, 3);
        assert_eq!(marker_count(&app), 3);
        assert_eq!(app.pump(), 0);
    }

    #[tokio::test]
    async fn test_window_stays_capped() {
        let (feed, mut app) = setup();
        for id in 0..WINDOW_CAPACITY as i64 {
            feed.store(reading(id, 10.0));
        }
        app.startup().await.unwrap();
        assert_eq!(app.window.len(), WINDOW_CAPACITY);

        feed.insert(reading(100, 40.0));
        assert!(app.wait_for_update().await);

        assert_eq!(app.window.len(), WINDOW_CAPACITY);
        assert_eq!(app.window.latest().unwrap().id, 100);
        assert_eq!(app.window.all().last().unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_delivery() {
        let (feed, mut app) = setup();
        app.startup().await.unwrap();

        assert_eq!(app.shutdown().await, CloseOutcome::Closed);
        feed.insert(reading(1, 10.0));

        assert_eq!(app.pump(), 0);
        assert!(!app.wait_for_update().await);
        assert_eq!(app.connection_label(), "Stopped");
    }

    #[tokio::test]
    async fn test_reconnect_after_feed_failure() {
        let (feed, mut app) = setup();
        app.startup().await.unwrap();

        feed.fail("broker restarted");
        assert!(!app.wait_for_update().await);
        assert!(app.connection_label().starts_with("Disconnected"));

        app.reconnect().await;
        assert_eq!(app.connection_label(), "Live");
        assert_eq!(feed.subscriber_count(), 1);

        feed.insert(reading(7, 10.0));
        assert!(app.wait_for_update().await);
        assert_eq!(app.window.latest().unwrap().id, 7);
    }

    #[tokio::test]
    async fn test_export_svg() {
        let (feed, mut app) = setup();
        feed.store(reading(1, 10.0));
        feed.store(reading(2, 40.0));
        app.startup().await.unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.svg");
        app.export_svg(&path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Alert Threshold (30cm)"));
        assert!(svg.contains(r##"fill="#ef4444""##));
    }

    #[tokio::test]
    async fn test_export_needs_two_readings() {
        let (feed, mut app) = setup();
        feed.store(reading(1, 10.0));
        app.startup().await.unwrap();

        let dir = TempDir::new().unwrap();
        assert!(app.export_svg(&dir.path().join("chart.svg")).is_err());
    }

    #[test]
    fn test_selection_is_clamped() {
        let (_feed, mut app) = setup();
        app.select_next();
        assert_eq!(app.selected_index, 0);

        app.window.seed((0..5).map(|id| reading(id, 10.0)));
        app.select_next_n(10);
        assert_eq!(app.selected_index, 4);
        app.select_prev_n(2);
        assert_eq!(app.selected_index, 2);
        app.select_first();
        assert_eq!(app.selected_index, 0);
        app.select_last();
        assert_eq!(app.selected_index, 4);
    }
}
