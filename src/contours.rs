//! Boundary extraction on the pixel-corner lattice.
//!
//! Every foreground pixel contributes one directed unit edge per side that
//! faces background. Edges run with foreground on their right, so outer
//! boundaries wind clockwise on screen (positive shoelace area with y down)
//! and hole boundaries wind counter-clockwise (negative area).

use crate::bitmap::Bitmap;
use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Polarity {
    Outer,
    Hole,
}

/// Closed lattice polygon. The closing point is not repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contour {
    pub points: Vec<GridPoint>,
    pub polarity: Polarity,
    /// Signed shoelace area in pixels.
    pub area: i64,
}

impl Contour {
    pub fn abs_area(&self) -> u64 {
        self.area.unsigned_abs()
    }

    /// Centre of the foreground pixel on the right of the first edge.
    pub fn interior_sample(&self) -> (f64, f64) {
        let a = self.points[0];
        let b = self.points[1 % self.points.len()];
        let dx = (b.x - a.x).signum() as f64;
        let dy = (b.y - a.y).signum() as f64;
        (
            a.x as f64 + 0.5 * dx - 0.5 * dy,
            a.y as f64 + 0.5 * dy + 0.5 * dx,
        )
    }

    /// Lattice corners of the axis-aligned bounding box, min then max.
    pub fn bounds(&self) -> (GridPoint, GridPoint) {
        let first = self.points[0];
        self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                GridPoint::new(lo.x.min(p.x), lo.y.min(p.y)),
                GridPoint::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        })
    }

    /// Even-odd ray cast. Only meaningful for points off the lattice lines.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.points.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            let (xi, yi) = (pi.x as f64, pi.y as f64);
            let (xj, yj) = (pj.x as f64, pj.y as f64);
            if (yi > y) != (yj > y) {
                let cross_x = xj + (y - yj) * (xi - xj) / (yi - yj);
                if x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Walks every foreground/background boundary in raster discovery order.
pub fn extract_contours(bitmap: &Bitmap) -> Result<Vec<Contour>> {
    let edges = boundary_edges(bitmap);
    if edges.is_empty() {
        return Ok(Vec::new());
    }

    let mut starts = HashMap::<GridPoint, Vec<usize>>::new();
    for (idx, edge) in edges.iter().enumerate() {
        starts.entry(edge.0).or_default().push(idx);
    }

    let mut used = vec![false; edges.len()];
    let mut contours = Vec::<Contour>::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }

        let mut loop_points = Vec::<GridPoint>::new();
        let mut current = first;
        let mut closed = false;

        for _ in 0..edges.len() {
            used[current] = true;
            loop_points.push(edges[current].0);

            let Some(next) = next_edge(&edges, &starts, current) else {
                break;
            };
            if next == first {
                closed = true;
                break;
            }
            if used[next] {
                break;
            }
            current = next;
        }

        if !closed {
            return Err(TraceError::design_violation(format!(
                "boundary walk from {:?} did not close",
                edges[first].0
            )));
        }

        let points = drop_collinear(loop_points);
        let area = shoelace_area(&points);
        let polarity = match area.signum() {
            1 => Polarity::Outer,
            -1 => Polarity::Hole,
            _ => {
                return Err(TraceError::design_violation(format!(
                    "boundary walk from {:?} enclosed zero area",
                    edges[first].0
                )))
            }
        };
        if points.len() < 3 {
            return Err(TraceError::design_violation(format!(
                "boundary walk from {:?} produced {} vertices",
                edges[first].0,
                points.len()
            )));
        }

        contours.push(Contour {
            points,
            polarity,
            area,
        });
    }

    Ok(contours)
}

fn boundary_edges(bitmap: &Bitmap) -> Vec<(GridPoint, GridPoint)> {
    let mut edges = Vec::<(GridPoint, GridPoint)>::new();

    for y in 0..bitmap.height() as i64 {
        for x in 0..bitmap.width() as i64 {
            if !bitmap.get(x, y) {
                continue;
            }
            let (gx, gy) = (x as i32, y as i32);

            if !bitmap.get(x, y - 1) {
                edges.push((GridPoint::new(gx, gy), GridPoint::new(gx + 1, gy)));
            }
            if !bitmap.get(x + 1, y) {
                edges.push((GridPoint::new(gx + 1, gy), GridPoint::new(gx + 1, gy + 1)));
            }
            if !bitmap.get(x, y + 1) {
                edges.push((GridPoint::new(gx + 1, gy + 1), GridPoint::new(gx, gy + 1)));
            }
            if !bitmap.get(x - 1, y) {
                edges.push((GridPoint::new(gx, gy + 1), GridPoint::new(gx, gy)));
            }
        }
    }

    edges
}

/// Successor of `current` at its end vertex: right turn, then straight, then left.
///
/// Where two pixels touch only at a corner the right turn keeps them apart,
/// so the pairing of incoming to outgoing edges is a fixed permutation.
fn next_edge(
    edges: &[(GridPoint, GridPoint)],
    starts: &HashMap<GridPoint, Vec<usize>>,
    current: usize,
) -> Option<usize> {
    let (from, to) = edges[current];
    let heading = direction(from, to);
    starts
        .get(&to)?
        .iter()
        .copied()
        .min_by_key(|&candidate| {
            let (a, b) = edges[candidate];
            turn_rank(heading, direction(a, b))
        })
}

fn direction(from: GridPoint, to: GridPoint) -> (i32, i32) {
    (to.x - from.x, to.y - from.y)
}

fn turn_rank(heading: (i32, i32), out: (i32, i32)) -> u8 {
    let right = (-heading.1, heading.0);
    let left = (heading.1, -heading.0);
    if out == right {
        0
    } else if out == heading {
        1
    } else if out == left {
        2
    } else {
        3
    }
}

fn drop_collinear(loop_points: Vec<GridPoint>) -> Vec<GridPoint> {
    let len = loop_points.len();
    if len < 4 {
        return loop_points;
    }

    let mut simplified = Vec::with_capacity(len);
    for i in 0..len {
        let prev = loop_points[(i + len - 1) % len];
        let curr = loop_points[i];
        let next = loop_points[(i + 1) % len];

        let collinear_x = prev.x == curr.x && curr.x == next.x;
        let collinear_y = prev.y == curr.y && curr.y == next.y;
        if !(collinear_x || collinear_y) {
            simplified.push(curr);
        }
    }
    simplified
}

pub(crate) fn shoelace_area(points: &[GridPoint]) -> i64 {
    let n = points.len();
    let mut twice = 0i64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    twice / 2
}
