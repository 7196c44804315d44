//! # distwatch
//!
//! A live terminal dashboard and SVG chart for distance-sensor readings.
//!
//! Readings arrive from a backend as an initial batch followed by a stream
//! of inserts. The newest fifty are kept in a window, the latest one is
//! classified into a status level, and the whole window is drawn as a time
//! series with colored markers and fixed threshold lines.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌──────────┐  │
//! │  │  app    │───▶│   data   │───▶│  chart  │───▶│ ui / svg │  │
//! │  │ (state) │    │ (window) │    │ (scene) │    │          │  │
//! │  └────┬────┘    └──────────┘    └─────────┘    └──────────┘  │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  ┌─────────┐                                                 │
//! │  │ source  │◀── ChannelBackend | StreamBackend | Supabase    │
//! │  │ (input) │                                                 │
//! │  └─────────┘                                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: startup, live updates, selection and export
//! - **[`source`]**: the [`MeasurementBackend`] trait, its adapters, and
//!   [`StreamSubscription`] which turns change events into measurements
//! - **[`data`]**: measurements, the bounded window, status classification
//! - **[`chart`]**: scales, the monotone curve, and [`ChartRenderer`] which
//!   draws onto any [`Surface`]
//! - **[`ui`]**: terminal rendering with ratatui
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Supabase project from a settings file
//! distwatch --config distwatch.toml
//!
//! # Newline-delimited JSON over TCP, with an initial batch from a file
//! distwatch --connect localhost:9090 --seed rows.json
//!
//! # Write the chart to SVG and exit
//! distwatch --seed rows.json --export chart.svg --width 1000
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use distwatch::{App, ChannelBackend, Measurement, Status, TableFilter, Theme};
//!
//! # tokio_test::block_on(async {
//! let (feed, backend) = ChannelBackend::create("memory");
//! feed.store(Measurement::new(1, Utc::now(), "sensor-1", 31.0, true));
//!
//! let mut app = App::new(Arc::new(backend), TableFilter::default(), Theme::dark());
//! app.startup().await.unwrap();
//! assert_eq!(app.status(), Status::Alert);
//! # });
//! ```

pub mod app;
pub mod chart;
pub mod data;
pub mod error;
pub mod events;
pub mod logging;
pub mod settings;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use chart::{ChartRenderer, RenderOutcome, Scene, Surface, SvgSurface};
pub use data::{classify, Measurement, MeasurementWindow, Status};
pub use error::{CloseOutcome, FetchError, SubscriptionError};
pub use settings::Settings;
pub use source::{
    ChannelBackend, ChannelFeed, MeasurementBackend, StreamBackend, StreamSubscription,
    TableFilter,
};
#[cfg(feature = "supabase")]
pub use source::{SupabaseBackend, SupabaseConfig};
pub use ui::Theme;
