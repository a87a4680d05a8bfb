//! Contour tracing: extract closed borders from a foreground mask.
//!
//! Uses Suzuki-Abe border following via
//! [`imageproc::contours::find_contours`]. Both outer borders and hole
//! borders are kept, together with the index of the enclosing contour,
//! because a thick stroke around one symbol yields one of each. The
//! duplicate filter collapses them later.

use image::GrayImage;
use imageproc::contours::BorderType;

use crate::types::{Point, Polyline};

/// Whether a traced border encloses foreground or a hole in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    Outer,
    Hole,
}

/// One closed border with its place in the contour hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct TracedContour {
    pub points: Polyline,
    pub border: BorderKind,
    /// Index of the enclosing contour in the same trace, if any.
    pub parent: Option<usize>,
}

/// Trace every outer and hole border in a binary mask.
///
/// Borders with fewer than three points cannot enclose an area and are
/// dropped. Parent indices refer to positions in the returned vector.
#[must_use = "returns the traced contours"]
pub fn trace_contours(mask: &GrayImage) -> Vec<TracedContour> {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(mask);

    // Map imageproc indices to output indices so parents stay valid
    // after short borders are filtered out.
    let mut remap = vec![None; contours.len()];
    let mut next = 0;
    for (i, c) in contours.iter().enumerate() {
        if c.points.len() >= 3 {
            remap[i] = Some(next);
            next += 1;
        }
    }

    contours
        .into_iter()
        .filter(|c| c.points.len() >= 3)
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            TracedContour {
                points: Polyline::new(points),
                border: match c.border_type {
                    BorderType::Outer => BorderKind::Outer,
                    BorderType::Hole => BorderKind::Hole,
                },
                parent: c.parent.and_then(|p| remap[p]),
            }
        })
        .collect()
}
