//! Chart panel.
//!
//! Paints the recorded [`Scene`] onto a braille canvas. The scene is laid out
//! in pixels with y pointing down; the canvas uses the same extent with y
//! pointing up, so every point is shifted by the margins and flipped.

use std::collections::HashMap;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Context, Line as CanvasLine},
        Block, Borders, Paragraph,
    },
    Frame,
};

use crate::app::App;
use crate::chart::scene::{Axis, AxisSide, ChartFrame, Element, Path, Point, TextAnchor};
use crate::data::Rgb;
use crate::ui::Theme;

/// Samples per curve segment when flattening.
const CURVE_STEPS: usize = 8;

/// Render the chart panel.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Distance (cm) ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let Some(chart_frame) = app.scene.frame().copied() else {
        let message = if app.loading {
            "Loading..."
        } else {
            "Waiting for at least two readings"
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let inner = block.inner(area);
    let painter = Painter {
        frame: chart_frame,
        cell_width: chart_frame.width / f64::from(inner.width.max(1)),
        theme: &app.theme,
    };
    let elements = app.scene.elements();

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, chart_frame.width])
        .y_bounds([0.0, chart_frame.height])
        .paint(|ctx| painter.paint(ctx, elements));

    frame.render_widget(canvas, area);
}

struct Painter<'t> {
    frame: ChartFrame,
    /// Canvas units covered by one terminal column.
    cell_width: f64,
    theme: &'t Theme,
}

impl Painter<'_> {
    fn paint(&self, ctx: &mut Context<'_>, elements: &[Element]) {
        let mut gradients: HashMap<&str, Rgb> = HashMap::new();
        let mut on_marker_layer = false;

        for element in elements {
            match element {
                Element::Gradient(gradient) => {
                    if let Some(stop) = gradient.stops.first() {
                        gradients.insert(gradient.id.as_str(), stop.color);
                    }
                }
                Element::Area { path, gradient } => {
                    if let Some(&fill) = gradients.get(gradient.as_str()) {
                        self.fill(ctx, path, fill);
                        ctx.layer();
                    }
                }
                Element::Axis(axis) => self.axis(ctx, axis),
                Element::Line { path, stroke } => {
                    self.polyline(ctx, path, stroke.color);
                }
                Element::Marker { center, fill, .. } => {
                    if !on_marker_layer {
                        ctx.layer();
                        on_marker_layer = true;
                    }
                    let (x, y) = self.to_canvas(*center);
                    let style = Style::default().fg(self.theme.color(*fill));
                    ctx.print(x, y, Span::styled("●", style));
                }
                Element::Rule { from, to, stroke } => {
                    let (dash, gap) = stroke.dash.unwrap_or((f64::INFINITY, 0.0));
                    self.dashed(ctx, *from, *to, dash, gap, stroke.color);
                }
                Element::Text(text) => {
                    // Rotated text has no terminal form; the panel title carries it.
                    if text.rotation != 0.0 {
                        continue;
                    }
                    let style = Style::default().fg(self.theme.color(text.color));
                    let style = if text.bold {
                        style.add_modifier(Modifier::BOLD)
                    } else {
                        style
                    };
                    self.label(ctx, text.anchor_point(), &text.content, text.anchor, style);
                }
            }
        }
    }

    fn to_canvas(&self, p: Point) -> (f64, f64) {
        let m = self.frame.margins;
        (p.x + m.left, self.frame.height - (p.y + m.top))
    }

    fn segment(&self, ctx: &mut Context<'_>, a: Point, b: Point, color: Rgb) {
        let (x1, y1) = self.to_canvas(a);
        let (x2, y2) = self.to_canvas(b);
        ctx.draw(&CanvasLine::new(x1, y1, x2, y2, self.theme.color(color)));
    }

    fn polyline(&self, ctx: &mut Context<'_>, path: &Path, color: Rgb) {
        for line in path.flatten(CURVE_STEPS) {
            for pair in line.windows(2) {
                self.segment(ctx, pair[0], pair[1], color);
            }
        }
    }

    fn dashed(
        &self,
        ctx: &mut Context<'_>,
        from: Point,
        to: Point,
        dash: f64,
        gap: f64,
        color: Rgb,
    ) {
        let length = ((to.x - from.x).powi(2) + (to.y - from.y).powi(2)).sqrt();
        if length == 0.0 || !length.is_finite() {
            return;
        }
        let at = |d: f64| {
            let t = (d / length).min(1.0);
            Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
        };

        let mut d = 0.0;
        while d < length {
            self.segment(ctx, at(d), at(d + dash), color);
            d += dash + gap;
        }
    }

    /// Fill a closed outline with vertical strokes, one per column.
    fn fill(&self, ctx: &mut Context<'_>, path: &Path, color: Rgb) {
        let edges: Vec<(Point, Point)> = path
            .flatten(CURVE_STEPS)
            .iter()
            .flat_map(|line| line.windows(2).map(|w| (w[0], w[1])).collect::<Vec<_>>())
            .collect();
        let (min_x, max_x) = edges
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |acc, (a, b)| {
                (acc.0.min(a.x).min(b.x), acc.1.max(a.x).max(b.x))
            });
        if !(min_x <= max_x) {
            return;
        }

        let step = (self.cell_width / 2.0).max(0.5);
        let mut x = min_x;
        while x <= max_x {
            let crossings = edges.iter().filter_map(|(a, b)| {
                let (lo, hi) = if a.x <= b.x { (a, b) } else { (b, a) };
                if x < lo.x || x > hi.x || hi.x == lo.x {
                    return None;
                }
                Some(lo.y + (hi.y - lo.y) * (x - lo.x) / (hi.x - lo.x))
            });
            let (top, bottom) = crossings.fold((f64::INFINITY, f64::NEG_INFINITY), |acc, y| {
                (acc.0.min(y), acc.1.max(y))
            });
            if top < bottom {
                self.segment(ctx, Point::new(x, top), Point::new(x, bottom), color);
            }
            x += step;
        }
    }

    fn axis(&self, ctx: &mut Context<'_>, axis: &Axis) {
        let o = axis.origin;
        let (r0, r1) = axis.range;
        let line = self.theme.axis;
        let text = Style::default().fg(self.theme.axis);
        let offset = Axis::TICK_SIZE + Axis::TICK_PADDING;

        match axis.side {
            AxisSide::Bottom => {
                let (x1, y) = self.to_canvas(Point::new(o.x + r0, o.y));
                let (x2, _) = self.to_canvas(Point::new(o.x + r1, o.y));
                ctx.draw(&CanvasLine::new(x1, y, x2, y, line));
                for tick in &axis.ticks {
                    let at = Point::new(o.x + tick.position, o.y + offset);
                    self.label(ctx, at, &tick.label, TextAnchor::Middle, text);
                }
            }
            AxisSide::Left => {
                let (x, y1) = self.to_canvas(Point::new(o.x, o.y + r0));
                let (_, y2) = self.to_canvas(Point::new(o.x, o.y + r1));
                ctx.draw(&CanvasLine::new(x, y1, x, y2, line));
                for tick in &axis.ticks {
                    let at = Point::new(o.x - offset, o.y + tick.position);
                    self.label(ctx, at, &tick.label, TextAnchor::End, text);
                }
            }
        }
    }

    fn label(
        &self,
        ctx: &mut Context<'_>,
        at: Point,
        content: &str,
        anchor: TextAnchor,
        style: Style,
    ) {
        let width = content.chars().count() as f64 * self.cell_width;
        let shift = match anchor {
            TextAnchor::Start => 0.0,
            TextAnchor::Middle => width / 2.0,
            TextAnchor::End => width,
        };
        let (x, y) = self.to_canvas(at);
        let x = (x - shift).max(0.0);
        ctx.print(x, y, Span::styled(content.to_string(), style));
    }
}
