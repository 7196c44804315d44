//! SVG output.
//!
//! Produces a standalone document whose structure mirrors what a browser
//! chart would build: one translated group for the plotting area, axes as
//! groups of ticks, and the gradient defined inline before its first use.

use std::fmt::Write as _;

use super::scene::{num, Axis, AxisSide, ChartFrame, Element, Stroke, Surface, Text};

/// A surface that writes SVG markup.
#[derive(Debug, Clone, Default)]
pub struct SvgSurface {
    frame: Option<ChartFrame>,
    body: String,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The complete document, or `None` if nothing has been drawn since the
    /// last clear.
    pub fn document(&self) -> Option<String> {
        let frame = self.frame?;
        let mut out = String::new();
        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = num(frame.width),
            h = num(frame.height),
        );
        out.push('\n');
        let _ = writeln!(
            out,
            r#"<g transform="translate({},{})">"#,
            num(frame.margins.left),
            num(frame.margins.top)
        );
        out.push_str(&self.body);
        out.push_str("</g>\n</svg>\n");
        Some(out)
    }

    fn axis(&mut self, axis: &Axis) {
        let (class, anchor) = match axis.side {
            AxisSide::Bottom => ("x-axis", "middle"),
            AxisSide::Left => ("y-axis", "end"),
        };
        let _ = writeln!(
            self.body,
            r#"<g class="{}" transform="translate({},{})" fill="none" font-size="10" font-family="sans-serif" text-anchor="{}">"#,
            class,
            num(axis.origin.x),
            num(axis.origin.y),
            anchor
        );

        let size = Axis::TICK_SIZE;
        let (r0, r1) = axis.range;
        let domain = match axis.side {
            AxisSide::Bottom => format!("M{},{}V0H{}V{}", num(r0), num(size), num(r1), num(size)),
            AxisSide::Left => format!("M{},{}H0V{}H{}", num(-size), num(r0), num(r1), num(-size)),
        };
        let _ = writeln!(
            self.body,
            r#"<path class="domain" stroke="{}" d="{}"/>"#,
            axis.line_color, domain
        );

        let offset = size + Axis::TICK_PADDING;
        for tick in &axis.ticks {
            let (transform, line, text) = match axis.side {
                AxisSide::Bottom => (
                    format!("translate({},0)", num(tick.position)),
                    format!(r#"y2="{}""#, num(size)),
                    format!(r#"y="{}" dy="0.71em""#, num(offset)),
                ),
                AxisSide::Left => (
                    format!("translate(0,{})", num(tick.position)),
                    format!(r#"x2="{}""#, num(-size)),
                    format!(r#"x="{}" dy="0.32em""#, num(-offset)),
                ),
            };
            let _ = writeln!(
                self.body,
                r#"<g class="tick" opacity="1" transform="{}"><line stroke="{}" {}/><text fill="{}" {}>{}</text></g>"#,
                transform,
                axis.line_color,
                line,
                axis.text_color,
                text,
                escape(&tick.label)
            );
        }
        self.body.push_str("</g>\n");
    }

    fn text(&mut self, text: &Text) {
        let mut attrs = String::new();
        if text.rotation != 0.0 {
            let _ = write!(attrs, r#" transform="rotate({})""#, num(text.rotation));
        }
        let _ = write!(
            attrs,
            r#" x="{}" y="{}""#,
            num(text.position.x),
            num(text.position.y)
        );
        if text.dy != 0.0 {
            let _ = write!(attrs, r#" dy="{}em""#, num(text.dy));
        }
        let _ = write!(
            attrs,
            r#" text-anchor="{}" font-size="{}px""#,
            text.anchor.as_str(),
            num(text.size)
        );
        if text.bold {
            attrs.push_str(r#" font-weight="bold""#);
        }
        let _ = writeln!(
            self.body,
            r#"<text{} fill="{}">{}</text>"#,
            attrs,
            text.color,
            escape(&text.content)
        );
    }
}

fn stroke_attrs(stroke: &Stroke) -> String {
    let mut attrs = format!(
        r#"stroke="{}" stroke-width="{}""#,
        stroke.color,
        num(stroke.width)
    );
    if let Some((dash, gap)) = stroke.dash {
        let _ = write!(attrs, r#" stroke-dasharray="{},{}""#, num(dash), num(gap));
    }
    if stroke.opacity != 1.0 {
        let _ = write!(attrs, r#" opacity="{}""#, num(stroke.opacity));
    }
    attrs
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl Surface for SvgSurface {
    fn clear(&mut self) {
        self.frame = None;
        self.body.clear();
    }

    fn begin(&mut self, frame: ChartFrame) {
        self.frame = Some(frame);
    }

    fn draw(&mut self, element: Element) {
        match element {
            Element::Axis(axis) => self.axis(&axis),
            Element::Text(text) => self.text(&text),
            Element::Gradient(gradient) => {
                let _ = writeln!(
                    self.body,
                    r#"<defs><linearGradient id="{}" gradientUnits="userSpaceOnUse" x1="0" y1="{}" x2="0" y2="{}">"#,
                    escape(&gradient.id),
                    num(gradient.y1),
                    num(gradient.y2)
                );
                for stop in &gradient.stops {
                    let _ = writeln!(
                        self.body,
                        r#"<stop offset="{}%" stop-color="{}" stop-opacity="{}"/>"#,
                        num(stop.offset * 100.0),
                        stop.color,
                        num(stop.opacity)
                    );
                }
                self.body.push_str("</linearGradient></defs>\n");
            }
            Element::Area { path, gradient } => {
                let _ = writeln!(
                    self.body,
                    r#"<path class="area" fill="url(#{})" d="{}"/>"#,
                    escape(&gradient),
                    path.to_svg_d()
                );
            }
            Element::Line { path, stroke } => {
                let _ = writeln!(
                    self.body,
                    r#"<path class="line" fill="none" {} d="{}"/>"#,
                    stroke_attrs(&stroke),
                    path.to_svg_d()
                );
            }
            Element::Marker {
                center,
                radius,
                fill,
                stroke,
            } => {
                let _ = writeln!(
                    self.body,
                    r#"<circle class="dot" cx="{}" cy="{}" r="{}" fill="{}" {}/>"#,
                    num(center.x),
                    num(center.y),
                    num(radius),
                    fill,
                    stroke_attrs(&stroke)
                );
            }
            Element::Rule { from, to, stroke } => {
                let _ = writeln!(
                    self.body,
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" {}/>"#,
                    num(from.x),
                    num(from.y),
                    num(to.x),
                    num(to.y),
                    stroke_attrs(&stroke)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::scene::{Point, TextAnchor, Tick};
    use crate::data::color::{AXIS_LINE, AXIS_TEXT, RED, SLATE_900};

    #[test]
    fn test_empty_surface_has_no_document() {
        let mut svg = SvgSurface::new();
        assert!(svg.document().is_none());

        svg.begin(ChartFrame::default());
        svg.clear();
        assert!(svg.document().is_none());
    }

    #[test]
    fn test_document_frame() {
        let mut svg = SvgSurface::new();
        svg.begin(ChartFrame::new(640.0, 300.0));
        let doc = svg.document().unwrap();
        assert!(doc.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="640" height="300""#));
        assert!(doc.contains(r#"<g transform="translate(50,20)">"#));
        assert!(doc.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_marker_and_rule_markup() {
        let mut svg = SvgSurface::new();
        svg.begin(ChartFrame::default());
        svg.draw(Element::Marker {
            center: Point::new(10.0, 20.5),
            radius: 4.0,
            fill: RED,
            stroke: Stroke::solid(SLATE_900, 2.0),
        });
        svg.draw(Element::Rule {
            from: Point::new(0.0, 96.0),
            to: Point::new(720.0, 96.0),
            stroke: Stroke::solid(RED, 1.5).dashed(5.0, 5.0).with_opacity(0.8),
        });

        let doc = svg.document().unwrap();
        assert!(doc.contains(
            r##"<circle class="dot" cx="10" cy="20.5" r="4" fill="#ef4444" stroke="#111827" stroke-width="2"/>"##
        ));
        assert!(doc.contains(
            r##"<line x1="0" y1="96" x2="720" y2="96" stroke="#ef4444" stroke-width="1.5" stroke-dasharray="5,5" opacity="0.8"/>"##
        ));
    }

    #[test]
    fn test_axis_markup() {
        let mut svg = SvgSurface::new();
        svg.begin(ChartFrame::default());
        svg.draw(Element::Axis(Axis {
            side: AxisSide::Left,
            origin: Point::new(0.0, 0.0),
            range: (240.0, 0.0),
            ticks: vec![Tick {
                position: 120.0,
                label: "25".to_string(),
            }],
            line_color: AXIS_LINE,
            text_color: AXIS_TEXT,
        }));

        let doc = svg.document().unwrap();
        assert!(doc.contains(r#"class="y-axis""#));
        assert!(doc.contains(r#"d="M-6,240H0V0H-6""#));
        assert!(doc.contains(r#"transform="translate(0,120)""#));
        assert!(doc.contains(r##"<text fill="#9ca3af" x="-9" dy="0.32em">25</text>"##));
    }

    #[test]
    fn test_text_is_escaped_and_rotated() {
        let mut svg = SvgSurface::new();
        svg.begin(ChartFrame::default());
        let mut text = Text::new(Point::new(-120.0, -45.0), "a < b & c", AXIS_TEXT, 12.0);
        text.rotation = -90.0;
        text.anchor = TextAnchor::Middle;
        text.dy = 1.0;
        svg.draw(Element::Text(text));

        let doc = svg.document().unwrap();
        assert!(doc.contains(
            r##"<text transform="rotate(-90)" x="-120" y="-45" dy="1em" text-anchor="middle" font-size="12px" fill="#9ca3af">a &lt; b &amp; c</text>"##
        ));
    }
}
