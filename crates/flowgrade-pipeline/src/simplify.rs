//! Polygon approximation using the Ramer-Douglas-Peucker algorithm.
//!
//! Contours are closed, so the curve is first split in two at the point
//! farthest from its starting point. Each half is simplified as an open
//! chain and the results are stitched back together. The vertex count
//! of the result is what the classifier keys on.

use crate::types::{Point, Polyline};

/// Approximate a closed contour with a polygon.
///
/// Points within `epsilon` pixels of the chord between their kept
/// neighbors are removed. Contours with fewer than 3 points are
/// returned unchanged.
#[must_use = "returns the simplified polygon"]
pub fn approximate_polygon(contour: &Polyline, epsilon: f64) -> Polyline {
    let points = contour.points();
    if points.len() < 3 {
        return contour.clone();
    }

    let first = points[0];
    let split = points
        .iter()
        .enumerate()
        .skip(1)
        .fold((1, 0.0), |(best, best_d), (i, p)| {
            let d = p.distance_squared(first);
            if d > best_d { (i, d) } else { (best, best_d) }
        })
        .0;

    // Second chain wraps around: split..=last, then back to the start.
    let mut second: Vec<Point> = points[split..].to_vec();
    second.push(first);

    let mut kept = simplify_open(&points[..=split], epsilon);
    let tail = simplify_open(&second, epsilon);

    // The split point and the start point are shared by both chains.
    kept.pop();
    kept.extend_from_slice(&tail[..tail.len() - 1]);

    Polyline::new(kept)
}

/// Simplify an open chain, always keeping both endpoints.
fn simplify_open(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, epsilon, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
