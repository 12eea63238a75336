use crate::contours::{GridPoint, Polarity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<GridPoint> for Point {
    fn from(p: GridPoint) -> Self {
        Self::new(p.x as f64, p.y as f64)
    }
}

/// One piece of a traced outline.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Segment {
    Line {
        start: Point,
        end: Point,
    },
    Cubic {
        start: Point,
        ctrl1: Point,
        ctrl2: Point,
        end: Point,
    },
}

impl Segment {
    pub fn start(&self) -> Point {
        match *self {
            Segment::Line { start, .. } | Segment::Cubic { start, .. } => start,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            Segment::Line { end, .. } | Segment::Cubic { end, .. } => end,
        }
    }

    pub fn is_curve(&self) -> bool {
        matches!(self, Segment::Cubic { .. })
    }

    /// Every coordinate the segment carries, control points included.
    pub fn points(&self) -> Vec<Point> {
        match *self {
            Segment::Line { start, end } => vec![start, end],
            Segment::Cubic {
                start,
                ctrl1,
                ctrl2,
                end,
            } => vec![start, ctrl1, ctrl2, end],
        }
    }

    pub fn eval(&self, t: f64) -> Point {
        match *self {
            Segment::Line { start, end } => start.lerp(end, t),
            Segment::Cubic {
                start,
                ctrl1,
                ctrl2,
                end,
            } => eval_cubic(start, ctrl1, ctrl2, end, t),
        }
    }
}

pub(crate) fn eval_cubic(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

/// Closed outline replacing one contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathChain {
    pub polarity: Polarity,
    pub segments: Vec<Segment>,
}

impl PathChain {
    /// First segment starts exactly where the last one ends.
    pub fn is_closed(&self) -> bool {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => first.start() == last.end(),
            _ => false,
        }
    }

    /// Index of the first segment that does not start where its predecessor ends.
    pub fn first_gap(&self) -> Option<usize> {
        self.segments
            .windows(2)
            .position(|w| w[0].end() != w[1].start())
            .map(|i| i + 1)
    }

    pub fn curve_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_curve()).count()
    }

    /// Samples the outline into a closed polyline, `steps` points per curve.
    pub fn flatten(&self, steps: usize) -> Vec<Point> {
        let mut out = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Line { start, .. } => out.push(*start),
                Segment::Cubic { .. } => {
                    let steps = steps.max(1);
                    for i in 0..steps {
                        out.push(segment.eval(i as f64 / steps as f64));
                    }
                }
            }
        }
        out
    }
}
