//! Fixed numeric constants shared by classification, buffering and rendering.
//!
//! Every threshold, cap and chart dimension lives here so the classifier,
//! the window and the chart never disagree about a boundary.

/// Maximum number of measurements retained in a window.
pub const WINDOW_CAPACITY: usize = 50;

/// Distances strictly above this are classified as `Alert`.
pub const STATUS_ALERT_ABOVE: f64 = 25.0;

/// Distances at or above this (and not above [`STATUS_ALERT_ABOVE`]) are `Warning`.
pub const STATUS_WARNING_FROM: f64 = 16.0;

/// Markers at or above this distance are drawn red.
pub const MARKER_ALERT_FROM: f64 = 30.0;

/// Lower bound (inclusive) of the blue "observe" marker band.
pub const MARKER_OBSERVE_FROM: f64 = 26.0;

/// Upper bound (inclusive) of the blue "observe" marker band.
pub const MARKER_OBSERVE_TO: f64 = 29.0;

/// Markers at or above this distance (outside the other bands) are drawn yellow.
pub const MARKER_WARNING_FROM: f64 = 16.0;

/// Reference line for the warning overlay, in cm.
pub const OVERLAY_WARNING: f64 = 15.0;

/// Reference line for the observe overlay, in cm.
pub const OVERLAY_OBSERVE: f64 = 25.0;

/// Reference line for the alert overlay, in cm.
pub const OVERLAY_ALERT: f64 = 30.0;

/// The value axis never tops out below this, so the threshold band stays visible.
pub const VALUE_SCALE_FLOOR: f64 = 50.0;

/// Headroom multiplier applied to the largest distance on the value axis.
pub const VALUE_SCALE_HEADROOM: f64 = 1.1;

/// Total chart height in pixels.
pub const CHART_HEIGHT: f64 = 300.0;

/// Default total chart width when no container width is known.
pub const CHART_DEFAULT_WIDTH: f64 = 800.0;

/// Chart margins in pixels.
pub const MARGIN_TOP: f64 = 20.0;
pub const MARGIN_RIGHT: f64 = 30.0;
pub const MARGIN_BOTTOM: f64 = 40.0;
pub const MARGIN_LEFT: f64 = 50.0;

/// Maximum number of ticks on the time axis.
pub const TIME_AXIS_TICKS: usize = 5;

/// Target number of ticks on the value axis.
pub const VALUE_AXIS_TICKS: usize = 10;
