//! Duplicate suppression for nested contour detections.
//!
//! A thick stroke produces an outer border and a hole border for the
//! same symbol, and text inside a symbol can survive the area filter.
//! Candidates are visited from the largest bounding box down; a
//! candidate whose center lies within `radius` pixels of an already
//! accepted center is dropped as a duplicate of that larger shape.
//!
//! Survivors are returned in their input order, ids untouched, so
//! running the filter on its own output changes nothing.

use log::debug;

use crate::types::ShapeRecord;

/// Collapse candidates whose centers lie closer than `radius` pixels.
#[must_use = "returns the deduplicated shapes"]
pub fn filter_duplicates(shapes: Vec<ShapeRecord>, radius: f64) -> Vec<ShapeRecord> {
    let mut by_area: Vec<usize> = (0..shapes.len()).collect();
    // Stable sort keeps input order among equal areas.
    by_area.sort_by(|&a, &b| shapes[b].bbox.area().total_cmp(&shapes[a].bbox.area()));

    let radius_sq = radius * radius;
    let mut keep = vec![false; shapes.len()];
    let mut accepted_centers = Vec::with_capacity(shapes.len());

    for idx in by_area {
        let center = shapes[idx].bbox.center();
        if accepted_centers
            .iter()
            .any(|&c| center.distance_squared(c) < radius_sq)
        {
            debug!(shape_id = shapes[idx].id; "dropping nested duplicate");
            continue;
        }
        accepted_centers.push(center);
        keep[idx] = true;
    }

    shapes
        .into_iter()
        .zip(keep)
        .filter_map(|(shape, k)| k.then_some(shape))
        .collect()
}
