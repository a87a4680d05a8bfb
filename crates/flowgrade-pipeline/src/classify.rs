//! Symbol classification from polygon vertex count and fill ratio.
//!
//! | vertices                    | fill ratio                  | kind      |
//! |-----------------------------|-----------------------------|-----------|
//! | 4                           | < `decision_fill_ratio`     | Decision  |
//! | 4                           | < `rounded_fill_ratio`      | Start/End |
//! | 4                           | otherwise                   | Process   |
//! | >= `oval_min_vertices`      | any                         | Start/End |
//! | anything else               | any                         | Unknown   |

use crate::types::{ClassificationPolicy, ShapeKind};

const QUADRILATERAL: usize = 4;

impl ClassificationPolicy {
    /// Classify a simplified polygon.
    #[must_use]
    pub fn classify(&self, num_vertices: usize, fill_ratio: f64) -> ShapeKind {
        if num_vertices == QUADRILATERAL {
            if fill_ratio < self.decision_fill_ratio {
                ShapeKind::Decision
            } else if self.rounded_fill_ratio.is_some_and(|cutoff| fill_ratio < cutoff) {
                ShapeKind::StartEnd
            } else {
                ShapeKind::Process
            }
        } else if num_vertices >= self.oval_min_vertices {
            ShapeKind::StartEnd
        } else {
            ShapeKind::Unknown
        }
    }

    /// Whether a contour of `area` square pixels falls inside the
    /// plausible symbol size window for an image of `image_area`.
    #[must_use]
    pub fn accepts_area(&self, area: f64, image_area: f64) -> bool {
        area >= image_area * self.min_area_fraction && area <= image_area * self.max_area_fraction
    }

    /// Whether a bounding box spans so much of the image that it is
    /// probably the page border or a frame.
    #[must_use]
    pub fn is_frame(&self, width: u32, height: u32, image_width: u32, image_height: u32) -> bool {
        f64::from(width) > f64::from(image_width) * self.max_extent_fraction
            || f64::from(height) > f64::from(image_height) * self.max_extent_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fill_ratio;
    use crate::types::{Point, Polyline};

    fn poly(points: &[(f64, f64)]) -> Polyline {
        Polyline::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    fn classify_polygon(policy: &ClassificationPolicy, polygon: &Polyline) -> ShapeKind {
        policy.classify(polygon.len(), fill_ratio(polygon))
    }

    #[test]
    fn diamond_is_decision() {
        let diamond = poly(&[(50.0, 0.0), (100.0, 40.0), (50.0, 80.0), (0.0, 40.0)]);
        assert_eq!(
            classify_polygon(&ClassificationPolicy::default(), &diamond),
            ShapeKind::Decision
        );
    }

    #[test]
    fn rectangle_is_process() {
        let rect = poly(&[(0.0, 0.0), (120.0, 0.0), (120.0, 60.0), (0.0, 60.0)]);
        assert_eq!(
            classify_polygon(&ClassificationPolicy::default(), &rect),
            ShapeKind::Process
        );
    }

    #[test]
    fn hexagon_is_start_end() {
        let hex = poly(&[
            (20.0, 0.0),
            (80.0, 0.0),
            (100.0, 30.0),
            (80.0, 60.0),
            (20.0, 60.0),
            (0.0, 30.0),
        ]);
        assert_eq!(
            classify_polygon(&ClassificationPolicy::default(), &hex),
            ShapeKind::StartEnd
        );
    }

    #[test]
    fn triangle_is_unknown() {
        let tri = poly(&[(0.0, 0.0), (100.0, 0.0), (50.0, 80.0)]);
        assert_eq!(
            classify_polygon(&ClassificationPolicy::default(), &tri),
            ShapeKind::Unknown
        );
    }

    #[test]
    fn cutoff_is_tunable() {
        // Fill ratio of 0.68 sits between the two historical cutoffs.
        let loose = ClassificationPolicy::default();
        let strict = ClassificationPolicy {
            decision_fill_ratio: 0.70,
            ..ClassificationPolicy::default()
        };
        assert_eq!(loose.classify(4, 0.68), ShapeKind::Process);
        assert_eq!(strict.classify(4, 0.68), ShapeKind::Decision);
    }

    #[test]
    fn rounded_band_yields_start_end() {
        let policy = ClassificationPolicy {
            rounded_fill_ratio: Some(0.95),
            ..ClassificationPolicy::default()
        };
        assert_eq!(policy.classify(4, 0.5), ShapeKind::Decision);
        assert_eq!(policy.classify(4, 0.85), ShapeKind::StartEnd);
        assert_eq!(policy.classify(4, 0.98), ShapeKind::Process);
    }

    #[test]
    fn vertex_boundary_is_tunable() {
        let policy = ClassificationPolicy {
            oval_min_vertices: 7,
            ..ClassificationPolicy::default()
        };
        assert_eq!(policy.classify(6, 0.8), ShapeKind::Unknown);
        assert_eq!(policy.classify(7, 0.8), ShapeKind::StartEnd);
    }

    #[test]
    fn area_window_scales_with_image() {
        let policy = ClassificationPolicy::default();
        let image_area = 100_000.0;
        assert!(!policy.accepts_area(99.0, image_area));
        assert!(policy.accepts_area(100.0, image_area));
        assert!(policy.accepts_area(50_000.0, image_area));
        assert!(!policy.accepts_area(50_001.0, image_area));
    }

    #[test]
    fn wide_box_is_frame() {
        let policy = ClassificationPolicy::default();
        assert!(policy.is_frame(390, 20, 400, 400));
        assert!(policy.is_frame(20, 330, 400, 400));
        assert!(!policy.is_frame(300, 300, 400, 400));
    }
}
