//! Drawing primitives and the [`Surface`] a chart is rendered onto.
//!
//! Elements are positioned in inner-area coordinates: the origin is the top
//! left corner of the plotting area, after the frame margins.

use crate::data::color::Rgb;
use crate::data::limits::{
    CHART_DEFAULT_WIDTH, CHART_HEIGHT, MARGIN_BOTTOM, MARGIN_LEFT, MARGIN_RIGHT, MARGIN_TOP,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Cubic Bézier with two control points and an end point.
    CubicTo(Point, Point, Point),
    Close,
}

/// A sequence of path commands, as in an SVG `d` attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub commands: Vec<PathCommand>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, p: Point) {
        self.commands.push(PathCommand::MoveTo(p));
    }

    pub fn line_to(&mut self, p: Point) {
        self.commands.push(PathCommand::LineTo(p));
    }

    pub fn cubic_to(&mut self, c1: Point, c2: Point, end: Point) {
        self.commands.push(PathCommand::CubicTo(c1, c2, end));
    }

    pub fn close(&mut self) {
        self.commands.push(PathCommand::Close);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Serialize as SVG path data.
    pub fn to_svg_d(&self) -> String {
        let mut d = String::new();
        for command in &self.commands {
            match *command {
                PathCommand::MoveTo(p) => d.push_str(&format!("M{},{}", num(p.x), num(p.y))),
                PathCommand::LineTo(p) => d.push_str(&format!("L{},{}", num(p.x), num(p.y))),
                PathCommand::CubicTo(c1, c2, p) => d.push_str(&format!(
                    "C{},{},{},{},{},{}",
                    num(c1.x),
                    num(c1.y),
                    num(c2.x),
                    num(c2.y),
                    num(p.x),
                    num(p.y)
                )),
                PathCommand::Close => d.push('Z'),
            }
        }
        d
    }

    /// Approximate the path by polylines, one per subpath.
    ///
    /// Each curve segment is sampled `steps` times.
    pub fn flatten(&self, steps: usize) -> Vec<Vec<Point>> {
        let steps = steps.max(1);
        let mut polylines: Vec<Vec<Point>> = Vec::new();
        let mut current: Vec<Point> = Vec::new();

        for command in &self.commands {
            match *command {
                PathCommand::MoveTo(p) => {
                    if current.len() > 1 {
                        polylines.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(p);
                }
                PathCommand::LineTo(p) => current.push(p),
                PathCommand::CubicTo(c1, c2, end) => {
                    let Some(&start) = current.last() else {
                        current.push(end);
                        continue;
                    };
                    for i in 1..=steps {
                        let t = i as f64 / steps as f64;
                        current.push(cubic_point(start, c1, c2, end, t));
                    }
                }
                PathCommand::Close => {
                    if let Some(&first) = current.first() {
                        current.push(first);
                    }
                }
            }
        }
        if current.len() > 1 {
            polylines.push(current);
        }
        polylines
    }
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

/// Format a coordinate compactly: at most three decimals, no trailing zeros.
pub(crate) fn num(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    // Avoid printing "-0"
    format!("{}", rounded + 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgb,
    pub width: f64,
    pub opacity: f64,
    /// Dash and gap length.
    pub dash: Option<(f64, f64)>,
}

impl Stroke {
    pub fn solid(color: Rgb, width: f64) -> Self {
        Self {
            color,
            width,
            opacity: 1.0,
            dash: None,
        }
    }

    pub fn dashed(mut self, dash: f64, gap: f64) -> Self {
        self.dash = Some((dash, gap));
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    /// Position in the text's own (possibly rotated) coordinate system.
    pub position: Point,
    pub content: String,
    pub color: Rgb,
    pub size: f64,
    pub bold: bool,
    pub anchor: TextAnchor,
    /// Rotation in degrees applied around the origin before positioning.
    pub rotation: f64,
    /// Baseline shift in em.
    pub dy: f64,
}

impl Text {
    pub fn new(position: Point, content: impl Into<String>, color: Rgb, size: f64) -> Self {
        Self {
            position,
            content: content.into(),
            color,
            size,
            bold: false,
            anchor: TextAnchor::Start,
            rotation: 0.0,
            dy: 0.0,
        }
    }

    /// Where the anchor point ends up once the rotation is applied.
    pub fn anchor_point(&self) -> Point {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        Point::new(
            self.position.x * cos - self.position.y * sin,
            self.position.x * sin + self.position.y * cos,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSide {
    Bottom,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Offset along the axis.
    pub position: f64,
    pub label: String,
}

/// An axis with its domain line, tick marks and tick labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub side: AxisSide,
    /// Translation of the axis origin.
    pub origin: Point,
    /// Extent of the domain line along the axis.
    pub range: (f64, f64),
    pub ticks: Vec<Tick>,
    pub line_color: Rgb,
    pub text_color: Rgb,
}

impl Axis {
    pub const TICK_SIZE: f64 = 6.0;
    pub const TICK_PADDING: f64 = 3.0;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient, 0 to 1.
    pub offset: f64,
    pub color: Rgb,
    pub opacity: f64,
}

/// A vertical linear gradient in user space, from `y1` to `y2`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub id: String,
    pub y1: f64,
    pub y2: f64,
    pub stops: Vec<GradientStop>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Axis(Axis),
    Text(Text),
    Gradient(LinearGradient),
    /// Filled region painted with a previously drawn gradient.
    Area { path: Path, gradient: String },
    Line { path: Path, stroke: Stroke },
    Marker {
        center: Point,
        radius: f64,
        fill: Rgb,
        stroke: Stroke,
    },
    /// Straight reference line.
    Rule { from: Point, to: Point, stroke: Stroke },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: MARGIN_TOP,
            right: MARGIN_RIGHT,
            bottom: MARGIN_BOTTOM,
            left: MARGIN_LEFT,
        }
    }
}

/// Outer size of a drawing and its margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartFrame {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
}

impl Default for ChartFrame {
    fn default() -> Self {
        Self::new(CHART_DEFAULT_WIDTH, CHART_HEIGHT)
    }
}

impl ChartFrame {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margins: Margins::default(),
        }
    }

    /// Width of the plotting area, never negative.
    pub fn inner_width(&self) -> f64 {
        (self.width - self.margins.left - self.margins.right).max(0.0)
    }

    /// Height of the plotting area, never negative.
    pub fn inner_height(&self) -> f64 {
        (self.height - self.margins.top - self.margins.bottom).max(0.0)
    }
}

/// A drawing target for the chart renderer.
pub trait Surface {
    /// Remove everything previously drawn.
    fn clear(&mut self);

    /// Start a new drawing of the given frame.
    fn begin(&mut self, frame: ChartFrame);

    /// Draw one element on top of the previous ones.
    fn draw(&mut self, element: Element);
}

/// A surface that records elements in draw order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    frame: Option<ChartFrame>,
    elements: Vec<Element>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// The frame of the current drawing, if one was started.
    pub fn frame(&self) -> Option<&ChartFrame> {
        self.frame.as_ref()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Replay the recorded drawing onto another surface.
    pub fn replay<S: Surface + ?Sized>(&self, target: &mut S) {
        target.clear();
        if let Some(frame) = self.frame {
            target.begin(frame);
        }
        for element in &self.elements {
            target.draw(element.clone());
        }
    }
}

impl Surface for Scene {
    fn clear(&mut self) {
        self.frame = None;
        self.elements.clear();
    }

    fn begin(&mut self, frame: ChartFrame) {
        self.frame = Some(frame);
    }

    fn draw(&mut self, element: Element) {
        self.elements.push(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::color::SKY;
    use approx::assert_relative_eq;

    #[test]
    fn test_frame_inner_size() {
        let frame = ChartFrame::new(800.0, 300.0);
        assert_eq!(frame.inner_width(), 720.0);
        assert_eq!(frame.inner_height(), 240.0);

        let tiny = ChartFrame::new(40.0, 30.0);
        assert_eq!(tiny.inner_width(), 0.0);
        assert_eq!(tiny.inner_height(), 0.0);
    }

    #[test]
    fn test_path_svg_data() {
        let mut path = Path::new();
        path.move_to(Point::new(0.0, 10.5));
        path.line_to(Point::new(1.0 / 3.0, -0.0));
        path.cubic_to(
            Point::new(1.0, 2.0),
            Point::new(3.0, 4.0),
            Point::new(5.0, 6.0),
        );
        path.close();
        assert_eq!(path.to_svg_d(), "M0,10.5L0.333,0C1,2,3,4,5,6Z");
    }

    #[test]
    fn test_flatten_samples_curves() {
        let mut path = Path::new();
        path.move_to(Point::new(0.0, 0.0));
        path.cubic_to(
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        );

        let lines = path.flatten(4);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 5);
        let mid = lines[0][2];
        assert_relative_eq!(mid.x, 5.0);
        assert_relative_eq!(mid.y, 7.5);
        assert_eq!(lines[0][4], Point::new(10.0, 0.0));
    }

    #[test]
    fn test_flatten_splits_subpaths_and_closes() {
        let mut path = Path::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(1.0, 0.0));
        path.line_to(Point::new(1.0, 1.0));
        path.close();
        path.move_to(Point::new(5.0, 5.0));
        path.line_to(Point::new(6.0, 6.0));

        let lines = path.flatten(8);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].last(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(lines[1].len(), 2);
    }

    #[test]
    fn test_rotated_text_anchor() {
        let mut text = Text::new(Point::new(-130.0, -45.0), "Distance (cm)", SKY, 12.0);
        text.rotation = -90.0;
        let p = text.anchor_point();
        assert_relative_eq!(p.x, -45.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 130.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scene_records_and_clears() {
        let mut scene = Scene::new();
        scene.begin(ChartFrame::default());
        scene.draw(Element::Rule {
            from: Point::new(0.0, 0.0),
            to: Point::new(1.0, 0.0),
            stroke: Stroke::solid(SKY, 1.0),
        });
        assert_eq!(scene.elements().len(), 1);
        assert!(scene.frame().is_some());

        let mut copy = Scene::new();
        scene.replay(&mut copy);
        assert_eq!(copy.elements(), scene.elements());

        scene.clear();
        assert!(scene.is_empty());
        assert!(scene.frame().is_none());
    }
}
