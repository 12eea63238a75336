//! Turns dense lattice contours into short chains of lines and cubic curves.
//!
//! 1. Straight runs of the staircase are merged (Douglas-Peucker between the
//!    ring's bounding-box extrema).
//! 2. Each remaining vertex gets an alpha from the triangle it forms with its
//!    neighbours; `alpha >= alphamax` marks a hard corner.
//! 3. Corners keep two straight half-edges; every other run between anchors
//!    is fitted with a least-squares cubic and split at its worst vertex
//!    until every run vertex lies within `opttolerance` of the curve and the
//!    curve stays inside the staircase band around the run.

use crate::contours::Contour;
use crate::params::TraceParams;
use crate::path::{eval_cubic, PathChain, Point, Segment};

/// Digitised straight edges wobble up to a pixel around their true line.
const STAIRCASE_TOLERANCE: f64 = 1.0;
/// Alpha approached by a vertex sticking far out of its neighbours' chord.
const MAX_ALPHA: f64 = 4.0 / 3.0;
const CURVE_SAMPLES: usize = 64;
const REPARAM_PASSES: usize = 2;
const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f64,
            height: height as f64,
        }
    }

    fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexKind {
    Plain,
    Corner,
    /// Midpoint of an edge next to a corner.
    Joint,
}

/// A fitted segment and the (unwrapped) ring range it replaces.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Piece {
    pub segment: Segment,
    pub first: usize,
    pub last: usize,
}

struct CubicFit {
    segment: Segment,
    /// Worst distance from an interior run vertex to the curve.
    error: f64,
    split: usize,
    /// Worst distance from the curve back to the run's polyline.
    bulge: f64,
}

pub fn optimize_contour(contour: &Contour, params: &TraceParams, canvas: Canvas) -> PathChain {
    let ring: Vec<Point> = contour.points.iter().map(|&p| Point::from(p)).collect();
    let segments = if ring.len() <= 4 {
        straight_segments(&ring)
    } else {
        let merged = merge_straight_runs(&ring);
        if merged.len() <= 4 {
            straight_segments(&merged)
        } else {
            let corners = find_corners(&merged, params.alphamax);
            let (anchored, kinds) = insert_corner_joints(&merged, &corners);
            let anchors = anchor_indices(&anchored, &kinds);
            let pieces = fit_ring(&anchored, &anchors, params.opttolerance, canvas);
            merge_collinear_lines(pieces.into_iter().map(|p| p.segment).collect())
        }
    };

    PathChain {
        polarity: contour.polarity,
        segments,
    }
}

fn straight_segments(ring: &[Point]) -> Vec<Segment> {
    let n = ring.len();
    (0..n)
        .map(|i| Segment::Line {
            start: ring[i],
            end: ring[(i + 1) % n],
        })
        .collect()
}

/// Collapses staircase runs that stay within a pixel of a straight chord.
pub(crate) fn merge_straight_runs(ring: &[Point]) -> Vec<Point> {
    let n = ring.len();
    if n <= 4 {
        return ring.to_vec();
    }

    let anchors = ring_extrema(ring);
    let mut keep = vec![false; n];
    for &a in &anchors {
        keep[a] = true;
    }
    for (k, &start) in anchors.iter().enumerate() {
        let end = anchors.get(k + 1).copied().unwrap_or(anchors[0] + n);
        mark_douglas_peucker(ring, start, end, STAIRCASE_TOLERANCE, &mut keep);
    }

    let merged: Vec<Point> = ring
        .iter()
        .zip(&keep)
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect();

    let before = signed_area(ring);
    let after = signed_area(&merged);
    if merged.len() < 3 || after.abs() < EPS || after.signum() != before.signum() {
        return ring.to_vec();
    }
    merged
}

fn mark_douglas_peucker(ring: &[Point], start: usize, end: usize, epsilon: f64, keep: &mut [bool]) {
    let n = ring.len();
    let mut stack = vec![(start, end)];
    while let Some((s, e)) = stack.pop() {
        if e <= s + 1 {
            continue;
        }
        let first = ring[s % n];
        let last = ring[e % n];
        let mut max_dist = 0.0;
        let mut index = s;
        for i in (s + 1)..e {
            let dist = perpendicular_distance(ring[i % n], first, last);
            if dist > max_dist {
                index = i;
                max_dist = dist;
            }
        }
        if max_dist >= epsilon {
            keep[index % n] = true;
            stack.push((index, e));
            stack.push((s, index));
        }
    }
}

fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;
    if dx.abs() < EPS && dy.abs() < EPS {
        return point.distance(line_start);
    }

    let numerator =
        (dy * point.x - dx * point.y + line_end.x * line_start.y - line_end.y * line_start.x).abs();
    numerator / dx.hypot(dy)
}

/// Indices of the leftmost, rightmost, topmost and bottommost vertices.
fn ring_extrema(ring: &[Point]) -> Vec<usize> {
    let mut min_x = 0;
    let mut max_x = 0;
    let mut min_y = 0;
    let mut max_y = 0;
    for (j, p) in ring.iter().enumerate().skip(1) {
        if p.x < ring[min_x].x {
            min_x = j;
        }
        if p.x > ring[max_x].x {
            max_x = j;
        }
        if p.y < ring[min_y].y {
            min_y = j;
        }
        if p.y > ring[max_y].y {
            max_y = j;
        }
    }
    let mut extrema = vec![min_x, max_x, min_y, max_y];
    extrema.sort_unstable();
    extrema.dedup();
    extrema
}

fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    let mut twice = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice * 0.5
}

/// How far `cur` sticks out of the chord `prev`-`next`, normalised so that
/// vertices more than a pixel out score above zero and large right angles
/// approach [`MAX_ALPHA`].
pub(crate) fn vertex_alpha(prev: Point, cur: Point, next: Point) -> f64 {
    let dpara = (cur.x - prev.x) * (next.y - prev.y) - (cur.y - prev.y) * (next.x - prev.x);
    let ddenom = (next.x - prev.x).abs() + (next.y - prev.y).abs();
    if ddenom < EPS {
        return MAX_ALPHA;
    }

    let dd = (dpara / ddenom).abs();
    let alpha = if dd > 1.0 { 1.0 - 1.0 / dd } else { 0.0 };
    alpha / 0.75
}

fn find_corners(ring: &[Point], alphamax: f64) -> Vec<bool> {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            vertex_alpha(prev, ring[i], next) >= alphamax
        })
        .collect()
}

/// Inserts the midpoint of every edge touching a corner, so corners end up
/// between two straight half-edges.
fn insert_corner_joints(ring: &[Point], corners: &[bool]) -> (Vec<Point>, Vec<VertexKind>) {
    let n = ring.len();
    let mut points = Vec::with_capacity(n * 2);
    let mut kinds = Vec::with_capacity(n * 2);
    for i in 0..n {
        let j = (i + 1) % n;
        points.push(ring[i]);
        kinds.push(if corners[i] {
            VertexKind::Corner
        } else {
            VertexKind::Plain
        });
        if corners[i] || corners[j] {
            points.push(ring[i].lerp(ring[j], 0.5));
            kinds.push(VertexKind::Joint);
        }
    }
    (points, kinds)
}

fn anchor_indices(ring: &[Point], kinds: &[VertexKind]) -> Vec<usize> {
    let mut anchors: Vec<usize> = kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| **k != VertexKind::Plain)
        .map(|(i, _)| i)
        .collect();
    anchors.extend(ring_extrema(ring));
    anchors.sort_unstable();
    anchors.dedup();
    anchors
}

/// Fits every run between consecutive anchors, in ring order.
pub(crate) fn fit_ring(ring: &[Point], anchors: &[usize], tolerance: f64, canvas: Canvas) -> Vec<Piece> {
    let n = ring.len();
    let mut pieces = Vec::new();
    for (k, &start) in anchors.iter().enumerate() {
        let end = anchors.get(k + 1).copied().unwrap_or(anchors[0] + n);
        fit_run(ring, start, end, tolerance, canvas, &mut pieces);
    }
    pieces
}

/// Fits `ring[start..=end]` (indices wrap), subdividing through a worklist.
pub(crate) fn fit_run(
    ring: &[Point],
    start: usize,
    end: usize,
    tolerance: f64,
    canvas: Canvas,
    out: &mut Vec<Piece>,
) {
    let n = ring.len();
    let mut stack = vec![(start, end)];
    while let Some((s, e)) = stack.pop() {
        if e - s < 2 {
            out.push(Piece {
                segment: Segment::Line {
                    start: ring[s % n],
                    end: ring[e % n],
                },
                first: s,
                last: e,
            });
            continue;
        }

        let points: Vec<Point> = (s..=e).map(|i| ring[i % n]).collect();
        let fit = match (tangent(ring, s), tangent(ring, e)) {
            (Some(t0), Some(t1)) => {
                fit_cubic(&points, t0, Point::new(-t1.x, -t1.y), tolerance, canvas)
            }
            _ => None,
        };

        match fit {
            Some(fit) if fit.error <= tolerance && fit.bulge <= STAIRCASE_TOLERANCE + tolerance => {
                out.push(Piece {
                    segment: fit.segment,
                    first: s,
                    last: e,
                })
            }
            Some(fit) => {
                let split = if fit.error > tolerance {
                    s + fit.split
                } else {
                    s + (e - s) / 2
                };
                stack.push((split, e));
                stack.push((s, split));
            }
            None => {
                let mid = s + (e - s) / 2;
                stack.push((mid, e));
                stack.push((s, mid));
            }
        }
    }
}

/// Unit tangent at a ring vertex from its two neighbours.
fn tangent(ring: &[Point], idx: usize) -> Option<Point> {
    let n = ring.len();
    let prev = ring[(idx + n - 1) % n];
    let cur = ring[idx % n];
    let next = ring[(idx + 1) % n];
    unit(Point::new(next.x - prev.x, next.y - prev.y))
        .or_else(|| unit(Point::new(next.x - cur.x, next.y - cur.y)))
}

fn unit(v: Point) -> Option<Point> {
    let len = v.x.hypot(v.y);
    (len > EPS).then(|| Point::new(v.x / len, v.y / len))
}

fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

fn sub(a: Point, b: Point) -> Point {
    Point::new(a.x - b.x, a.y - b.y)
}

fn add_scaled(a: Point, v: Point, s: f64) -> Point {
    Point::new(a.x + v.x * s, a.y + v.y * s)
}

/// Least-squares cubic with fixed end tangents (`t1` points back into the run).
fn fit_cubic(points: &[Point], t0: Point, t1: Point, tolerance: f64, canvas: Canvas) -> Option<CubicFit> {
    let m = points.len();
    let p0 = points[0];
    let p3 = points[m - 1];
    let chord = p0.distance(p3);
    if chord < EPS {
        return None;
    }

    let mut u = chord_length_params(points)?;
    let mut best: Option<CubicFit> = None;

    for pass in 0..=REPARAM_PASSES {
        let (mut a1, mut a2) = handle_lengths(points, &u, t0, t1, chord);
        if a1 > chord || a2 > chord {
            a1 = chord / 3.0;
            a2 = a1;
        }
        let ctrl1 = canvas.clamp(add_scaled(p0, t0, a1));
        let ctrl2 = canvas.clamp(add_scaled(p3, t1, a2));
        let samples = sample_cubic(p0, ctrl1, ctrl2, p3);
        let (error, split) = vertex_deviation(points, &samples);

        if best.as_ref().map_or(true, |b| error < b.error) {
            best = Some(CubicFit {
                segment: Segment::Cubic {
                    start: p0,
                    ctrl1,
                    ctrl2,
                    end: p3,
                },
                error,
                split,
                bulge: polyline_deviation(&samples, points),
            });
        }
        if error <= tolerance || pass == REPARAM_PASSES {
            break;
        }
        u = reparameterize(points, &u, p0, ctrl1, ctrl2, p3);
    }

    best
}

fn chord_length_params(points: &[Point]) -> Option<Vec<f64>> {
    let mut u = Vec::with_capacity(points.len());
    u.push(0.0);
    for w in points.windows(2) {
        let last = u[u.len() - 1];
        u.push(last + w[0].distance(w[1]));
    }
    let total = u[u.len() - 1];
    if total < EPS {
        return None;
    }
    for t in &mut u {
        *t /= total;
    }
    Some(u)
}

fn handle_lengths(points: &[Point], u: &[f64], t0: Point, t1: Point, chord: f64) -> (f64, f64) {
    let p0 = points[0];
    let p3 = points[points.len() - 1];
    let (mut c00, mut c01, mut c11, mut x0, mut x1) = (0.0, 0.0, 0.0, 0.0, 0.0);

    for (p, &t) in points.iter().zip(u) {
        let mt = 1.0 - t;
        let b0 = mt * mt * mt;
        let b1 = 3.0 * mt * mt * t;
        let b2 = 3.0 * mt * t * t;
        let b3 = t * t * t;
        let a1 = Point::new(t0.x * b1, t0.y * b1);
        let a2 = Point::new(t1.x * b2, t1.y * b2);
        c00 += dot(a1, a1);
        c01 += dot(a1, a2);
        c11 += dot(a2, a2);
        let base = Point::new(
            p0.x * (b0 + b1) + p3.x * (b2 + b3),
            p0.y * (b0 + b1) + p3.y * (b2 + b3),
        );
        let tmp = sub(*p, base);
        x0 += dot(a1, tmp);
        x1 += dot(a2, tmp);
    }

    let floor = chord * 1e-6;
    let usable = |a: f64| a.is_finite() && a >= floor;

    let det = c00 * c11 - c01 * c01;
    if det.abs() > EPS * (c00 * c11).max(1.0) {
        let alpha1 = (x0 * c11 - x1 * c01) / det;
        let alpha2 = (c00 * x1 - c01 * x0) / det;
        if usable(alpha1) && usable(alpha2) {
            return (alpha1, alpha2);
        }
    }

    // A single interior vertex only pins one length; share it between both handles.
    let shared = c00 + 2.0 * c01 + c11;
    if shared > EPS {
        let alpha = (x0 + x1) / shared;
        if usable(alpha) {
            return (alpha, alpha);
        }
    }

    (chord / 3.0, chord / 3.0)
}

fn sample_cubic(p0: Point, p1: Point, p2: Point, p3: Point) -> Vec<Point> {
    (0..=CURVE_SAMPLES)
        .map(|i| eval_cubic(p0, p1, p2, p3, i as f64 / CURVE_SAMPLES as f64))
        .collect()
}

/// Worst distance from an interior vertex to the flattened curve, and that vertex.
fn vertex_deviation(points: &[Point], samples: &[Point]) -> (f64, usize) {
    let m = points.len();
    let mut worst = 0.0;
    let mut split = m / 2;
    for (i, p) in points.iter().enumerate().take(m - 1).skip(1) {
        let d = distance_to_polyline(*p, samples);
        if d > worst {
            worst = d;
            split = i;
        }
    }
    (worst, split)
}

fn polyline_deviation(samples: &[Point], points: &[Point]) -> f64 {
    samples
        .iter()
        .map(|s| distance_to_polyline(*s, points))
        .fold(0.0, f64::max)
}

fn distance_to_polyline(p: Point, polyline: &[Point]) -> f64 {
    polyline
        .windows(2)
        .map(|w| distance_to_segment(p, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = sub(b, a);
    let len_sq = dot(ab, ab);
    if len_sq < EPS {
        return p.distance(a);
    }
    let t = (dot(sub(p, a), ab) / len_sq).clamp(0.0, 1.0);
    p.distance(add_scaled(a, ab, t))
}

/// One Newton step per interior vertex towards its nearest curve parameter.
fn reparameterize(points: &[Point], u: &[f64], p0: Point, p1: Point, p2: Point, p3: Point) -> Vec<f64> {
    let m = points.len();
    points
        .iter()
        .zip(u)
        .enumerate()
        .map(|(i, (p, &t))| {
            if i == 0 || i == m - 1 {
                return t;
            }
            let q = eval_cubic(p0, p1, p2, p3, t);
            let mt = 1.0 - t;
            let d1 = Point::new(
                3.0 * (mt * mt * (p1.x - p0.x) + 2.0 * mt * t * (p2.x - p1.x) + t * t * (p3.x - p2.x)),
                3.0 * (mt * mt * (p1.y - p0.y) + 2.0 * mt * t * (p2.y - p1.y) + t * t * (p3.y - p2.y)),
            );
            let d2 = Point::new(
                6.0 * (mt * (p2.x - 2.0 * p1.x + p0.x) + t * (p3.x - 2.0 * p2.x + p1.x)),
                6.0 * (mt * (p2.y - 2.0 * p1.y + p0.y) + t * (p3.y - 2.0 * p2.y + p1.y)),
            );
            let diff = sub(q, *p);
            let numerator = dot(diff, d1);
            let denominator = dot(d1, d1) + dot(diff, d2);
            if denominator.abs() < EPS {
                return t;
            }
            (t - numerator / denominator).clamp(0.0, 1.0)
        })
        .collect()
}

fn merge_collinear_lines(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let (Some(Segment::Line { start, end: mid }), Segment::Line { end, .. }) =
            (out.last().copied(), segment)
        {
            if continues_straight(start, mid, end) {
                let last = out.len() - 1;
                out[last] = Segment::Line { start, end };
                continue;
            }
        }
        out.push(segment);
    }

    if out.len() > 3 {
        if let (Some(Segment::Line { start, end: mid }), Some(Segment::Line { end, .. })) =
            (out.last().copied(), out.first().copied())
        {
            if continues_straight(start, mid, end) {
                out.pop();
                out[0] = Segment::Line { start, end };
            }
        }
    }
    out
}

fn continues_straight(a: Point, b: Point, c: Point) -> bool {
    let ab = sub(b, a);
    let bc = sub(c, b);
    (ab.x * bc.y - ab.y * bc.x).abs() < EPS && dot(ab, bc) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::contours::{extract_contours, GridPoint, Polarity};

    fn canvas() -> Canvas {
        Canvas::new(100, 100)
    }

    fn disc(size: u32, radius: f64) -> Bitmap {
        let mut bitmap = Bitmap::new(size, size);
        let c = size as f64 / 2.0;
        for y in 0..size {
            for x in 0..size {
                let dx = x as f64 + 0.5 - c;
                let dy = y as f64 + 0.5 - c;
                bitmap.set(x, y, dx * dx + dy * dy <= radius * radius);
            }
        }
        bitmap
    }

    /// Distance from each source vertex to the curve, flattened finer than the fitter does.
    fn max_vertex_deviation(segment: &Segment, source: &[Point]) -> f64 {
        let samples: Vec<Point> = (0..=CURVE_SAMPLES * 16)
            .map(|i| segment.eval(i as f64 / (CURVE_SAMPLES * 16) as f64))
            .collect();
        source
            .iter()
            .map(|p| {
                samples
                    .windows(2)
                    .map(|w| distance_to_segment(*p, w[0], w[1]))
                    .fold(f64::INFINITY, f64::min)
            })
            .fold(0.0, f64::max)
    }

    // Flattening the curve into 64 chords shifts distances by a hair.
    const FLATTEN_SLACK: f64 = 0.02;

    #[test]
    fn rectangle_becomes_four_lines() {
        let contour = Contour {
            points: vec![
                GridPoint::new(2, 3),
                GridPoint::new(12, 3),
                GridPoint::new(12, 9),
                GridPoint::new(2, 9),
            ],
            polarity: Polarity::Outer,
            area: 60,
        };
        let chain = optimize_contour(&contour, &TraceParams::default(), canvas());
        assert_eq!(chain.segments.len(), 4);
        assert!(chain.segments.iter().all(|s| !s.is_curve()));
        assert!(chain.is_closed());
        assert_eq!(chain.segments[0].start(), Point::new(2.0, 3.0));
        assert_eq!(chain.segments[2].start(), Point::new(12.0, 9.0));
    }

    #[test]
    fn right_angles_of_large_shapes_are_corners() {
        let alpha = vertex_alpha(
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert!(alpha >= 1.0 && alpha < MAX_ALPHA);

        let flat = vertex_alpha(
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.5),
            Point::new(10.0, 0.0),
        );
        assert_eq!(flat, 0.0);
    }

    #[test]
    fn staircase_diagonal_merges_to_a_single_edge() {
        let rows: Vec<String> = (0..8)
            .map(|y| format!("{}{}", "#".repeat(y + 1), ".".repeat(7 - y)))
            .collect();
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let contours = extract_contours(&Bitmap::from_rows(&rows)).unwrap();
        assert_eq!(contours.len(), 1);

        let ring: Vec<Point> = contours[0].points.iter().map(|&p| Point::from(p)).collect();
        assert!(ring.len() > 10);
        let merged = merge_straight_runs(&ring);
        assert_eq!(
            merged,
            vec![
                Point::new(0.0, 0.0),
                Point::new(8.0, 7.0),
                Point::new(8.0, 8.0),
                Point::new(0.0, 8.0),
            ]
        );
    }

    #[test]
    fn smooth_arc_fits_one_cubic() {
        let radius = 20.0;
        let ring: Vec<Point> = (0..40)
            .map(|i| {
                let a = i as f64 / 40.0 * std::f64::consts::TAU;
                Point::new(50.0 + radius * a.cos(), 50.0 + radius * a.sin())
            })
            .collect();
        let mut pieces = Vec::new();
        fit_run(&ring, 0, 10, 0.2, canvas(), &mut pieces);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].segment.is_curve());
        assert_eq!(pieces[0].segment.start(), ring[0]);
        assert_eq!(pieces[0].segment.end(), ring[10]);
    }

    fn traced_ring(bitmap: &Bitmap) -> Vec<Point> {
        let contours = extract_contours(bitmap).unwrap();
        assert_eq!(contours.len(), 1);
        contours[0].points.iter().map(|&p| Point::from(p)).collect()
    }

    fn curves_at(bitmap: &Bitmap, alphamax: f64) -> usize {
        let contours = extract_contours(bitmap).unwrap();
        let params = TraceParams {
            alphamax,
            ..TraceParams::default()
        };
        let canvas = Canvas::new(bitmap.width(), bitmap.height());
        optimize_contour(&contours[0], &params, canvas).curve_count()
    }

    #[test]
    fn fitted_curves_stay_within_tolerance() {
        let ring = traced_ring(&disc(60, 24.0));

        for tolerance in [0.1, 0.2, 0.4] {
            let merged = merge_straight_runs(&ring);
            let corners = find_corners(&merged, 1.0);
            let (anchored, kinds) = insert_corner_joints(&merged, &corners);
            let anchors = anchor_indices(&anchored, &kinds);
            let pieces = fit_ring(&anchored, &anchors, tolerance, Canvas::new(60, 60));
            assert!(pieces.iter().any(|p| p.segment.is_curve()));

            let n = anchored.len();
            for piece in &pieces {
                let source: Vec<Point> = (piece.first..=piece.last).map(|i| anchored[i % n]).collect();
                if piece.segment.is_curve() {
                    assert!(source.len() >= 3);
                    let dev = max_vertex_deviation(&piece.segment, &source);
                    assert!(
                        dev <= tolerance + FLATTEN_SLACK,
                        "deviation {} > {}",
                        dev,
                        tolerance
                    );
                    let flat = piece.segment.points();
                    let samples = sample_cubic(flat[0], flat[1], flat[2], flat[3]);
                    assert!(polyline_deviation(&samples, &source) <= STAIRCASE_TOLERANCE + tolerance);
                } else {
                    assert_eq!(source.len(), 2);
                }
            }
            for w in pieces.windows(2) {
                assert_eq!(w[0].segment.end(), w[1].segment.start());
            }
        }
    }

    #[test]
    fn merged_outline_stays_within_a_pixel_of_the_staircase() {
        for (size, radius) in [(60, 24.0), (100, 41.7), (40, 15.3)] {
            let ring = traced_ring(&disc(size, radius));
            let mut merged = merge_straight_runs(&ring);
            assert!(merged.len() < ring.len());
            merged.push(merged[0]);
            for p in &ring {
                assert!(distance_to_polyline(*p, &merged) < STAIRCASE_TOLERANCE);
            }
        }
    }

    #[test]
    fn traced_discs_come_out_curved() {
        for (size, radius) in [(60, 24.0), (100, 41.7), (40, 15.3)] {
            let bitmap = disc(size, radius);
            let contours = extract_contours(&bitmap).unwrap();
            let chain = optimize_contour(
                &contours[0],
                &TraceParams::default(),
                Canvas::new(size, size),
            );

            assert!(chain.is_closed());
            assert!(chain.curve_count() > 0, "no curves for radius {}", radius);
            assert!(chain.segments.len() < contours[0].points.len());
            for segment in &chain.segments {
                for p in segment.points() {
                    assert!(p.x >= 0.0 && p.x <= size as f64 && p.y >= 0.0 && p.y <= size as f64);
                }
            }
        }
    }

    #[test]
    fn raising_alphamax_never_loses_curves() {
        let bitmap = disc(40, 15.3);
        let counts: Vec<usize> = [0.0, 0.6, 1.0, 1.3]
            .iter()
            .map(|&alphamax| curves_at(&bitmap, alphamax))
            .collect();

        assert_eq!(counts[0], 0);
        assert!(counts[3] > 0);
        for w in counts.windows(2) {
            assert!(w[0] <= w[1], "curve counts {:?}", counts);
        }
    }

    #[test]
    fn disc_touching_the_border_keeps_controls_on_canvas() {
        let bitmap = disc(20, 11.0);
        let contours = extract_contours(&bitmap).unwrap();
        for contour in &contours {
            let chain = optimize_contour(contour, &TraceParams::sticker(), Canvas::new(20, 20));
            assert!(chain.is_closed());
            for segment in &chain.segments {
                for p in segment.points() {
                    assert!(p.x >= 0.0 && p.x <= 20.0 && p.y >= 0.0 && p.y <= 20.0);
                }
            }
        }
    }

    #[test]
    fn jagged_polygon_terminates_and_closes() {
        let mut points = Vec::new();
        for i in 0..60 {
            let x = i * 2;
            points.push(GridPoint::new(x, if i % 2 == 0 { 0 } else { 9 }));
            points.push(GridPoint::new(x + 1, if i % 2 == 0 { 0 } else { 9 }));
        }
        points.push(GridPoint::new(120, 20));
        points.push(GridPoint::new(0, 20));
        let area = crate::contours::shoelace_area(&points);
        let contour = Contour {
            points,
            polarity: Polarity::Outer,
            area,
        };

        let chain = optimize_contour(&contour, &TraceParams::default(), Canvas::new(120, 20));
        assert!(chain.is_closed());
        assert!(!chain.segments.is_empty());
    }

    #[test]
    fn high_alphamax_rounds_more_vertices() {
        let bitmap = Bitmap::from_rows(&[
            "....######....",
            "..##########..",
            ".############.",
            "##############",
            "##############",
            ".############.",
            "..##########..",
            "....######....",
        ]);
        let contours = extract_contours(&bitmap).unwrap();
        let ring: Vec<Point> = contours[0].points.iter().map(|&p| Point::from(p)).collect();
        let merged = merge_straight_runs(&ring);

        let sharp = find_corners(&merged, 0.0).iter().filter(|&&c| c).count();
        let smooth = find_corners(&merged, MAX_ALPHA + 0.1).iter().filter(|&&c| c).count();
        assert_eq!(sharp, merged.len());
        assert_eq!(smooth, 0);
    }

    #[test]
    fn collinear_lines_are_merged_across_the_seam() {
        let p = |x: f64, y: f64| Point::new(x, y);
        let segments = vec![
            Segment::Line { start: p(2.0, 0.0), end: p(4.0, 0.0) },
            Segment::Line { start: p(4.0, 0.0), end: p(4.0, 4.0) },
            Segment::Line { start: p(4.0, 4.0), end: p(0.0, 4.0) },
            Segment::Line { start: p(0.0, 4.0), end: p(0.0, 0.0) },
            Segment::Line { start: p(0.0, 0.0), end: p(2.0, 0.0) },
        ];
        let merged = merge_collinear_lines(segments);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0], Segment::Line { start: p(0.0, 0.0), end: p(4.0, 0.0) });
        assert_eq!(merged[3].end(), merged[0].start());
    }
}
