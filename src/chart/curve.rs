//! Monotone cubic interpolation in x (Steffen's method).
//!
//! The curve passes through every point and never overshoots between two
//! points, so a reading is never drawn above or below its neighbours.

use super::scene::{Path, Point};

/// Builds a monotone curve one point at a time.
struct MonotoneX<'a> {
    path: &'a mut Path,
    /// Whether the first point continues the path instead of moving to it.
    connect: bool,
    count: usize,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    t0: f64,
}

impl<'a> MonotoneX<'a> {
    fn new(path: &'a mut Path, connect: bool) -> Self {
        Self {
            path,
            connect,
            count: 0,
            x0: f64::NAN,
            y0: f64::NAN,
            x1: f64::NAN,
            y1: f64::NAN,
            t0: f64::NAN,
        }
    }

    fn point(&mut self, x: f64, y: f64) {
        if x == self.x1 && y == self.y1 {
            // Coincident points carry no direction.
            return;
        }

        let mut t1 = f64::NAN;
        match self.count {
            0 => {
                self.count = 1;
                if self.connect {
                    self.path.line_to(Point::new(x, y));
                } else {
                    self.path.move_to(Point::new(x, y));
                }
            }
            1 => self.count = 2,
            2 => {
                self.count = 3;
                t1 = self.slope3(x, y);
                let t0 = self.slope2(t1);
                self.segment(t0, t1);
            }
            _ => {
                t1 = self.slope3(x, y);
                self.segment(self.t0, t1);
            }
        }

        self.x0 = self.x1;
        self.x1 = x;
        self.y0 = self.y1;
        self.y1 = y;
        self.t0 = t1;
    }

    fn end(&mut self) {
        match self.count {
            2 => self.path.line_to(Point::new(self.x1, self.y1)),
            3 => {
                let t1 = self.slope2(self.t0);
                self.segment(self.t0, t1);
            }
            _ => {}
        }
    }

    /// Tangent at (x1, y1) given the following point.
    fn slope3(&self, x2: f64, y2: f64) -> f64 {
        let h0 = self.x1 - self.x0;
        let h1 = x2 - self.x1;
        let s0 = (self.y1 - self.y0) / h0;
        let s1 = (y2 - self.y1) / h1;
        let p = (s0 * h1 + s1 * h0) / (h0 + h1);
        let t = (sign(s0) + sign(s1)) * min_nan(min_nan(s0.abs(), s1.abs()), 0.5 * p.abs());
        if t.is_finite() {
            t
        } else {
            0.0
        }
    }

    /// One-sided tangent at an end point, given the tangent at the other end.
    fn slope2(&self, t: f64) -> f64 {
        let h = self.x1 - self.x0;
        if h != 0.0 {
            (3.0 * (self.y1 - self.y0) / h - t) / 2.0
        } else {
            t
        }
    }

    fn segment(&mut self, t0: f64, t1: f64) {
        let dx = (self.x1 - self.x0) / 3.0;
        self.path.cubic_to(
            Point::new(self.x0 + dx, self.y0 + dx * t0),
            Point::new(self.x1 - dx, self.y1 - dx * t1),
            Point::new(self.x1, self.y1),
        );
    }
}

fn sign(v: f64) -> f64 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

fn min_nan(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn trace(path: &mut Path, points: impl IntoIterator<Item = Point>, connect: bool) {
    let mut curve = MonotoneX::new(path, connect);
    for p in points {
        curve.point(p.x, p.y);
    }
    curve.end();
}

/// A monotone curve through `points`, which must be ordered by x.
pub fn monotone_x(points: &[Point]) -> Path {
    let mut path = Path::new();
    trace(&mut path, points.iter().copied(), false);
    path
}

/// The region between a monotone curve through `points` and the horizontal
/// line at `baseline`.
pub fn monotone_area(points: &[Point], baseline: f64) -> Path {
    let mut path = Path::new();
    if points.is_empty() {
        return path;
    }
    trace(&mut path, points.iter().copied(), false);
    trace(
        &mut path,
        points.iter().rev().map(|p| Point::new(p.x, baseline)),
        true,
    );
    path.close();
    path
}
