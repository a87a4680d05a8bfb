//! Polygon measurements used by the classifier.

use geo::{Area, Coord, LineString, Polygon};

use crate::types::{BoundingBox, Point, Polyline};

/// Convert a closed polyline into a `geo::Polygon` without holes.
fn to_polygon(polyline: &Polyline) -> Polygon<f64> {
    let exterior: LineString<f64> = polyline
        .points()
        .iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect();
    Polygon::new(exterior, Vec::new())
}

/// Unsigned area enclosed by a closed polyline.
///
/// Vertices are pixel centers, so a traced 10x10 block of pixels
/// encloses 81 square pixels, not 100.
#[must_use]
pub fn contour_area(polyline: &Polyline) -> f64 {
    if polyline.len() < 3 {
        return 0.0;
    }
    to_polygon(polyline).unsigned_area()
}

/// Length of a closed polyline including the closing segment.
#[must_use]
pub fn perimeter(polyline: &Polyline) -> f64 {
    let points = polyline.points();
    match points {
        [] | [_] => 0.0,
        [first, .., last] => {
            let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
            open + last.distance(*first)
        }
    }
}

/// Inclusive pixel bounding box of a set of points.
///
/// Returns `None` for an empty polyline.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bounding_box(polyline: &Polyline) -> Option<BoundingBox> {
    let first = polyline.points().first()?;
    let init = (first.x, first.y, first.x, first.y);
    let (min_x, min_y, max_x, max_y) =
        polyline
            .points()
            .iter()
            .fold(init, |(min_x, min_y, max_x, max_y), p: &Point| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            });
    let x = min_x.max(0.0).floor() as u32;
    let y = min_y.max(0.0).floor() as u32;
    let right = max_x.max(0.0).floor() as u32;
    let bottom = max_y.max(0.0).floor() as u32;
    Some(BoundingBox::new(x, y, right - x + 1, bottom - y + 1))
}

/// Polygon area divided by the area of its bounding box.
///
/// Close to 1 for axis-aligned rectangles and about 0.5 for diamonds.
#[must_use]
pub fn fill_ratio(polygon: &Polyline) -> f64 {
    match bounding_box(polygon) {
        Some(bbox) if bbox.area() > 0.0 => contour_area(polygon) / bbox.area(),
        _ => 0.0,
    }
}
