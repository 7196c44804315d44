//! Measurement model, classification and buffering.
//!
//! ## Submodules
//!
//! - [`measurement`]: The [`Measurement`] entity and its JSON wire format
//! - [`status`]: Distance classification ([`classify`], [`Status`]) and marker bands ([`MarkerTier`])
//! - [`window`]: Bounded newest-first history ([`MeasurementWindow`])
//! - [`limits`]: Every threshold, cap and chart dimension
//! - [`color`]: Backend-agnostic colors shared by the TUI and SVG output
//!
//! ## Data Flow
//!
//! ```text
//! backend row (JSON)
//!        │
//!        ▼
//! Measurement::from_value()
//!        │
//!        ├──▶ MeasurementWindow::push() (newest first, capped)
//!        │
//!        └──▶ classify() / MarkerTier (on demand)
//! ```

pub mod color;
pub mod limits;
pub mod measurement;
pub mod status;
pub mod window;

pub use color::Rgb;
pub use measurement::{Measurement, SensorReading};
pub use status::{classify, MarkerTier, Status, StatusPalette};
pub use window::MeasurementWindow;
