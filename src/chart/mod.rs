//! Time-series chart of distance readings.
//!
//! [`ChartRenderer`] turns a newest-first sequence of measurements into a
//! fixed chart: time on x, distance on y, a gradient-filled area under a
//! smoothed line, one colored marker per reading and three dashed
//! threshold lines. Drawing goes through the [`Surface`] trait, so the same
//! chart can be recorded into a [`Scene`] (for the terminal) or written as
//! SVG ([`SvgSurface`]).

pub mod curve;
pub mod scale;
pub mod scene;
pub mod svg;

pub use scale::{LinearScale, TimeScale};
pub use scene::{ChartFrame, Element, Path, Point, Scene, Stroke, Surface, Text, TextAnchor};
pub use svg::SvgSurface;

use crate::data::color::{self, Rgb};
use crate::data::limits::{
    CHART_HEIGHT, OVERLAY_ALERT, OVERLAY_OBSERVE, OVERLAY_WARNING, TIME_AXIS_TICKS,
    VALUE_AXIS_TICKS, VALUE_SCALE_FLOOR, VALUE_SCALE_HEADROOM,
};
use crate::data::{MarkerTier, Measurement};
use scene::{Axis, AxisSide, GradientStop, LinearGradient, Tick};

/// Id of the area gradient.
pub const GRADIENT_ID: &str = "distance-gradient";

const MARKER_RADIUS: f64 = 4.0;
const LINE_WIDTH: f64 = 2.5;

/// A fixed horizontal reference line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdOverlay {
    pub value: f64,
    pub color: Rgb,
    pub name: &'static str,
}

impl ThresholdOverlay {
    pub fn label(&self) -> String {
        format!("{} Threshold ({}cm)", self.name, self.value)
    }
}

/// The overlays drawn on every chart, lowest first.
pub const OVERLAYS: [ThresholdOverlay; 3] = [
    ThresholdOverlay {
        value: OVERLAY_WARNING,
        color: color::YELLOW,
        name: "Warning",
    },
    ThresholdOverlay {
        value: OVERLAY_OBSERVE,
        color: color::BLUE,
        name: "Observe",
    },
    ThresholdOverlay {
        value: OVERLAY_ALERT,
        color: color::RED,
        name: "Alert",
    },
];

/// Result of a render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Too few points to draw a series; the surface was cleared.
    Cleared,
    Drawn,
}

/// Upper bound of the value axis for a set of distances.
///
/// Never below [`VALUE_SCALE_FLOOR`]; otherwise the largest distance plus
/// headroom. Non-finite distances are ignored.
pub fn value_ceiling(distances: impl IntoIterator<Item = f64>) -> f64 {
    distances
        .into_iter()
        .filter(|d| d.is_finite())
        .fold(VALUE_SCALE_FLOOR, |acc, d| acc.max(d * VALUE_SCALE_HEADROOM))
}

/// Draws the distance chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    height: f64,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self {
            height: CHART_HEIGHT,
        }
    }
}

impl ChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total height used by [`render_width`](Self::render_width).
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Render at the fixed chart height.
    pub fn render_width<'a, S>(
        &self,
        surface: &mut S,
        data: impl IntoIterator<Item = &'a Measurement>,
        width: f64,
    ) -> RenderOutcome
    where
        S: Surface + ?Sized,
    {
        self.render(surface, data, width, self.height)
    }

    /// Clear `surface` and draw `data`, given newest first.
    ///
    /// With fewer than two measurements the surface is only cleared.
    pub fn render<'a, S>(
        &self,
        surface: &mut S,
        data: impl IntoIterator<Item = &'a Measurement>,
        width: f64,
        height: f64,
    ) -> RenderOutcome
    where
        S: Surface + ?Sized,
    {
        let mut series: Vec<&Measurement> = data.into_iter().collect();
        surface.clear();
        if series.len() < 2 {
            return RenderOutcome::Cleared;
        }

        // Oldest first; readings with equal timestamps keep arrival order.
        series.reverse();
        series.sort_by_key(|m| m.created_at);

        let frame = ChartFrame::new(width, height);
        let inner_w = frame.inner_width();
        let inner_h = frame.inner_height();
        surface.begin(frame);

        let (first, last) = (series[0], series[series.len() - 1]);
        let x = TimeScale::new((first.created_at, last.created_at), (0.0, inner_w));
        let ceiling = value_ceiling(series.iter().map(|m| m.distance_cm()));
        let peak = series
            .iter()
            .map(|m| m.distance_cm())
            .filter(|d| d.is_finite())
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))))
            .unwrap_or(0.0);
        let y = LinearScale::new((0.0, ceiling), (inner_h, 0.0));

        surface.draw(Element::Axis(Axis {
            side: AxisSide::Bottom,
            origin: Point::new(0.0, inner_h),
            range: (0.0, inner_w),
            ticks: x
                .ticks(TIME_AXIS_TICKS)
                .into_iter()
                .map(|t| Tick {
                    position: x.apply(t),
                    label: scale::format_time_tick(t),
                })
                .collect(),
            line_color: color::AXIS_LINE,
            text_color: color::AXIS_TEXT,
        }));

        surface.draw(Element::Axis(Axis {
            side: AxisSide::Left,
            origin: Point::new(0.0, 0.0),
            range: (inner_h, 0.0),
            ticks: y
                .ticks(VALUE_AXIS_TICKS)
                .into_iter()
                .map(|v| Tick {
                    position: y.apply(v),
                    label: y.tick_format(VALUE_AXIS_TICKS, v),
                })
                .collect(),
            line_color: color::AXIS_LINE,
            text_color: color::AXIS_TEXT,
        }));

        let margin_left = frame.margins.left;
        let mut axis_label = Text::new(
            Point::new(-inner_h / 2.0, -margin_left + 5.0),
            "Distance (cm)",
            color::LABEL_TEXT,
            12.0,
        );
        axis_label.rotation = -90.0;
        axis_label.anchor = TextAnchor::Middle;
        axis_label.dy = 1.0;
        surface.draw(Element::Text(axis_label));

        surface.draw(Element::Gradient(LinearGradient {
            id: GRADIENT_ID.to_string(),
            y1: y.apply(0.0),
            // Fade ends at the highest reading, not the top of the axis.
            y2: y.apply(peak),
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: color::SLATE_800,
                    opacity: 0.5,
                },
                GradientStop {
                    offset: 1.0,
                    color: color::SKY,
                    opacity: 0.3,
                },
            ],
        }));

        let points: Vec<Point> = series
            .iter()
            .map(|m| Point::new(x.apply(m.created_at), y.apply(m.distance_cm())))
            .collect();

        surface.draw(Element::Area {
            path: curve::monotone_area(&points, inner_h),
            gradient: GRADIENT_ID.to_string(),
        });
        surface.draw(Element::Line {
            path: curve::monotone_x(&points),
            stroke: Stroke::solid(color::SKY, LINE_WIDTH),
        });

        for (m, &center) in series.iter().zip(&points) {
            surface.draw(Element::Marker {
                center,
                radius: MARKER_RADIUS,
                fill: MarkerTier::for_distance(m.distance_cm()).color(),
                stroke: Stroke::solid(color::SLATE_900, 2.0),
            });
        }

        for overlay in OVERLAYS.iter().filter(|o| ceiling > o.value) {
            let level = y.apply(overlay.value);
            surface.draw(Element::Rule {
                from: Point::new(0.0, level),
                to: Point::new(inner_w, level),
                stroke: Stroke::solid(overlay.color, 1.5)
                    .dashed(5.0, 5.0)
                    .with_opacity(0.8),
            });

            let mut label = Text::new(
                Point::new(inner_w - 5.0, level - 5.0),
                overlay.label(),
                overlay.color,
                10.0,
            );
            label.anchor = TextAnchor::End;
            label.bold = true;
            surface.draw(Element::Text(label));
        }

        RenderOutcome::Drawn
    }
}
