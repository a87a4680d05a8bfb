//! Shape detection: grayscale image in, typed symbol candidates out.
//!
//! 1. Binarize with the configured [`Binarizer`].
//! 2. Trace outer and hole borders.
//! 3. Drop contours outside the dynamic area window and frame-sized boxes.
//! 4. Approximate each survivor with a polygon (tolerance proportional
//!    to its perimeter).
//! 5. Classify by vertex count and fill ratio.
//!
//! Candidates come back in reading order (top to bottom, then left to
//! right) with ids assigned in that order. Nested duplicates are still
//! present; see [`crate::dedup`].

use image::GrayImage;
use log::debug;

use crate::contour::{self, TracedContour};
use crate::geometry;
use crate::simplify;
use crate::threshold::Binarizer;
use crate::types::{ClassificationPolicy, Dimensions, PipelineConfig, ShapeRecord};

/// Everything the detector produced, including intermediates the
/// analysis report and diagnostics need.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Binary foreground mask.
    pub mask: GrayImage,
    /// Number of contours traced before filtering.
    pub contour_count: usize,
    /// Classified candidates that passed the area and frame filters.
    pub shapes: Vec<ShapeRecord>,
}

/// Run binarization, contour tracing, filtering and classification.
///
/// [`analyze`](crate::analyze) runs the same three steps inline as its
/// stages 2-4 so it can time them separately; keep the two in step.
#[must_use = "returns the detected shapes"]
pub fn detect_shapes(gray: &GrayImage, config: &PipelineConfig) -> Detection {
    let mask = config.binarizer.binarize(gray, config);
    let contours = contour::trace_contours(&mask);
    let dimensions = Dimensions {
        width: gray.width(),
        height: gray.height(),
    };
    let shapes = classify_contours(&contours, dimensions, &config.classification);

    Detection {
        mask,
        contour_count: contours.len(),
        shapes,
    }
}

/// Turn traced contours into candidates in reading order, ids assigned.
#[must_use = "returns the classified shapes"]
pub fn classify_contours(
    contours: &[TracedContour],
    dimensions: Dimensions,
    policy: &ClassificationPolicy,
) -> Vec<ShapeRecord> {
    let mut shapes: Vec<ShapeRecord> = contours
        .iter()
        .filter_map(|c| candidate_from_contour(c, dimensions, policy))
        .collect();

    shapes.sort_by_key(|s| (s.bbox.y, s.bbox.x));
    for (id, shape) in shapes.iter_mut().enumerate() {
        shape.id = id;
    }

    debug!(
        contours = contours.len(),
        candidates = shapes.len();
        "shape classification finished"
    );
    shapes
}

/// Filter and classify one traced contour.
///
/// Returns `None` when the contour is noise, background or a frame.
/// The returned record has a placeholder id of zero.
#[must_use]
pub fn candidate_from_contour(
    contour: &TracedContour,
    dimensions: Dimensions,
    policy: &ClassificationPolicy,
) -> Option<ShapeRecord> {
    #[allow(clippy::cast_precision_loss)]
    let image_area = dimensions.pixel_count() as f64;
    let area = geometry::contour_area(&contour.points);
    if !policy.accepts_area(area, image_area) {
        return None;
    }

    let bbox = geometry::bounding_box(&contour.points)?;
    if policy.is_frame(bbox.width, bbox.height, dimensions.width, dimensions.height) {
        return None;
    }

    let epsilon = policy.approx_epsilon_fraction * geometry::perimeter(&contour.points);
    let polygon = simplify::approximate_polygon(&contour.points, epsilon);
    let kind = policy.classify(polygon.len(), geometry::fill_ratio(&polygon));

    Some(ShapeRecord::unlabeled(0, kind, bbox, polygon))
}

#[cfg(test)]
mod tests {
    use imageproc::drawing::{draw_filled_ellipse_mut, draw_filled_rect_mut, draw_polygon_mut};
    use imageproc::rect::Rect;

    use super::*;
    use crate::threshold::BinarizerKind;
    use crate::types::ShapeKind;

    const INK: image::Luma<u8> = image::Luma([0]);
    const PAPER: image::Luma<u8> = image::Luma([255]);

    fn page() -> GrayImage {
        GrayImage::from_pixel(400, 400, PAPER)
    }

    fn global() -> PipelineConfig {
        PipelineConfig {
            binarizer: BinarizerKind::Global,
            ..PipelineConfig::default()
        }
    }

    fn kinds(detection: &Detection) -> Vec<ShapeKind> {
        detection.shapes.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn blank_page_has_no_shapes() {
        let detection = detect_shapes(&page(), &PipelineConfig::default());
        assert_eq!(detection.contour_count, 0);
        assert!(detection.shapes.is_empty());
    }

    #[test]
    fn filled_rectangle_is_process() {
        let mut img = page();
        draw_filled_rect_mut(&mut img, Rect::at(100, 150).of_size(160, 80), INK);
        let detection = detect_shapes(&img, &global());
        assert_eq!(kinds(&detection), vec![ShapeKind::Process]);
        // Blurring may shave a pixel off the corners but not the extents.
        let bbox = detection.shapes[0].bbox;
        assert!(bbox.x.abs_diff(100) <= 1 && bbox.y.abs_diff(150) <= 1);
        assert!(bbox.width.abs_diff(160) <= 2 && bbox.height.abs_diff(80) <= 2);
    }

    #[test]
    fn filled_diamond_is_decision() {
        let mut img = page();
        draw_polygon_mut(
            &mut img,
            &[
                imageproc::point::Point::new(200, 100),
                imageproc::point::Point::new(300, 180),
                imageproc::point::Point::new(200, 260),
                imageproc::point::Point::new(100, 180),
            ],
            INK,
        );
        let detection = detect_shapes(&img, &global());
        assert_eq!(kinds(&detection), vec![ShapeKind::Decision]);
    }

    #[test]
    fn filled_oval_is_start_end() {
        let mut img = page();
        draw_filled_ellipse_mut(&mut img, (200, 200), 70, 45, INK);
        let detection = detect_shapes(&img, &global());
        assert_eq!(kinds(&detection), vec![ShapeKind::StartEnd]);
    }

    #[test]
    fn specks_and_frames_are_filtered() {
        let mut img = page();
        // 5x5 speck: 16 px² of contour area, below 0.1% of 160 000.
        draw_filled_rect_mut(&mut img, Rect::at(20, 20).of_size(5, 5), INK);
        // Wide horizontal bar spanning 90% of the width.
        draw_filled_rect_mut(&mut img, Rect::at(20, 350).of_size(360, 20), INK);
        let detection = detect_shapes(&img, &global());
        assert_eq!(detection.contour_count, 2);
        assert!(detection.shapes.is_empty());
    }

    #[test]
    fn ids_follow_reading_order() {
        let mut img = page();
        draw_filled_rect_mut(&mut img, Rect::at(120, 260).of_size(160, 60), INK);
        draw_filled_ellipse_mut(&mut img, (200, 80), 70, 35, INK);
        let detection = detect_shapes(&img, &global());
        assert_eq!(kinds(&detection), vec![ShapeKind::StartEnd, ShapeKind::Process]);
        let ids: Vec<usize> = detection.shapes.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn thick_outline_yields_nested_duplicates() {
        let mut img = page();
        draw_filled_rect_mut(&mut img, Rect::at(100, 100).of_size(200, 100), INK);
        draw_filled_rect_mut(&mut img, Rect::at(106, 106).of_size(188, 88), PAPER);
        let detection = detect_shapes(&img, &global());
        assert_eq!(
            kinds(&detection),
            vec![ShapeKind::Process, ShapeKind::Process],
            "outer and inner borders of one stroke"
        );
    }
}
