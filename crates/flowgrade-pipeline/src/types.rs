//! Shared types for the flowgrade analysis pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::threshold::BinarizerKind;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A sequence of connected points.
///
/// Contours and simplified polygons are both closed: the last point
/// connects back to the first implicitly, without being repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// The larger of width and height.
    #[must_use]
    pub fn max_side(self) -> u32 {
        self.width.max(self.height)
    }
}

/// Axis-aligned bounding box in pixel coordinates.
///
/// Extents are inclusive: a box covering columns 10..=19 has
/// `x = 10, width = 10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box area in square pixels.
    #[must_use]
    pub fn area(self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }

    /// Geometric center of the box.
    #[must_use]
    pub fn center(self) -> Point {
        Point::new(
            f64::from(self.width).mul_add(0.5, f64::from(self.x)),
            f64::from(self.height).mul_add(0.5, f64::from(self.y)),
        )
    }

    /// Y coordinate of the top edge.
    #[must_use]
    pub fn top(self) -> f64 {
        f64::from(self.y)
    }

    /// Y coordinate of the bottom edge (`y + height`).
    #[must_use]
    pub fn bottom(self) -> f64 {
        f64::from(self.y) + f64::from(self.height)
    }

    /// `[x, y, width, height]`, the shape position reported to callers.
    #[must_use]
    pub const fn to_array(self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// Flowchart symbol classes recognized by the shape detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Terminal symbol: oval, stadium or rounded rectangle.
    #[serde(rename = "Start/End")]
    StartEnd,
    /// Axis-aligned rectangle.
    Process,
    /// Diamond.
    Decision,
    /// Anything else. Retained so later stages can report it.
    Unknown,
}

impl ShapeKind {
    /// Human-readable name used in algorithm steps and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartEnd => "Start/End",
            Self::Process => "Process",
            Self::Decision => "Decision",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected flowchart symbol.
///
/// Created by the shape detector with an empty `text`; the label is
/// filled in once by [`crate::text::assign_labels`] and never changed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    /// Stable identifier within one analysis run.
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub bbox: BoundingBox,
    /// Simplified polygon vertices.
    pub polygon: Polyline,
    pub text: String,
}

impl ShapeRecord {
    /// A record without a label, as produced by the shape detector.
    #[must_use]
    pub const fn unlabeled(id: usize, kind: ShapeKind, bbox: BoundingBox, polygon: Polyline) -> Self {
        Self {
            id,
            kind,
            bbox,
            polygon,
            text: String::new(),
        }
    }
}

/// Thresholds that decide which contours become which symbols.
///
/// Revisions of the classifier disagreed on the exact cutoffs, and
/// photographed input needs different values than clean digital
/// drawings, so every number lives here instead of in the logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationPolicy {
    /// Contours smaller than this fraction of the image area are noise.
    pub min_area_fraction: f64,
    /// Contours larger than this fraction of the image area are background.
    pub max_area_fraction: f64,
    /// Bounding boxes wider or taller than this fraction of the image
    /// are frame artifacts.
    pub max_extent_fraction: f64,
    /// Polygon approximation tolerance as a fraction of the perimeter.
    pub approx_epsilon_fraction: f64,
    /// Quadrilaterals with a fill ratio below this are diamonds.
    pub decision_fill_ratio: f64,
    /// When set, quadrilaterals with a fill ratio in
    /// `decision_fill_ratio..rounded_fill_ratio` are treated as rounded
    /// terminals instead of rectangles.
    pub rounded_fill_ratio: Option<f64>,
    /// Polygons with at least this many vertices are ovals.
    pub oval_min_vertices: usize,
    /// Centers closer than this many pixels belong to the same symbol.
    pub duplicate_radius: f64,
}

impl ClassificationPolicy {
    pub const DEFAULT_MIN_AREA_FRACTION: f64 = 0.001;
    pub const DEFAULT_MAX_AREA_FRACTION: f64 = 0.5;
    pub const DEFAULT_MAX_EXTENT_FRACTION: f64 = 0.8;
    pub const DEFAULT_APPROX_EPSILON_FRACTION: f64 = 0.03;
    pub const DEFAULT_DECISION_FILL_RATIO: f64 = 0.65;
    pub const DEFAULT_OVAL_MIN_VERTICES: usize = 5;
    pub const DEFAULT_DUPLICATE_RADIUS: f64 = 20.0;
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            min_area_fraction: Self::DEFAULT_MIN_AREA_FRACTION,
            max_area_fraction: Self::DEFAULT_MAX_AREA_FRACTION,
            max_extent_fraction: Self::DEFAULT_MAX_EXTENT_FRACTION,
            approx_epsilon_fraction: Self::DEFAULT_APPROX_EPSILON_FRACTION,
            decision_fill_ratio: Self::DEFAULT_DECISION_FILL_RATIO,
            rounded_fill_ratio: None,
            oval_min_vertices: Self::DEFAULT_OVAL_MIN_VERTICES,
            duplicate_radius: Self::DEFAULT_DUPLICATE_RADIUS,
        }
    }
}

/// Parameters of the spatial edge heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphPolicy {
    /// How far (pixels) a candidate's top edge may rise above the
    /// source's bottom edge and still count as "below".
    pub overlap_tolerance: f64,
    /// Edges longer than this fraction of the larger image dimension
    /// are not inferred.
    pub max_edge_fraction: f64,
}

impl GraphPolicy {
    pub const DEFAULT_OVERLAP_TOLERANCE: f64 = 10.0;
    pub const DEFAULT_MAX_EDGE_FRACTION: f64 = 0.5;
}

impl Default for GraphPolicy {
    fn default() -> Self {
        Self {
            overlap_tolerance: Self::DEFAULT_OVERLAP_TOLERANCE,
            max_edge_fraction: Self::DEFAULT_MAX_EDGE_FRACTION,
        }
    }
}

/// Hough transform settings for the informational line count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowDetection {
    pub vote_threshold: u32,
    pub suppression_radius: u32,
}

impl Default for ArrowDetection {
    fn default() -> Self {
        Self {
            vote_threshold: 50,
            suppression_radius: 8,
        }
    }
}

/// Configuration for the analysis pipeline.
///
/// All parameters have defaults tuned for photographed or scanned
/// hand-drawn charts. Clean digital renderings usually work better with
/// [`BinarizerKind::Global`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Which binarization strategy to use.
    pub binarizer: BinarizerKind,

    /// Neighborhood size (odd, pixels) for adaptive thresholding.
    pub adaptive_block_size: u32,

    /// Constant subtracted from the local mean in adaptive thresholding.
    pub adaptive_offset: i16,

    /// Radius of the square structuring element used for opening and
    /// closing the adaptive mask. Zero disables morphology.
    pub morphology_radius: u8,

    /// Gaussian blur sigma applied before global thresholding.
    pub blur_sigma: f32,

    /// Gray level below which a pixel is foreground under global
    /// thresholding.
    pub global_threshold: u8,

    pub classification: ClassificationPolicy,

    pub graph: GraphPolicy,

    pub arrows: ArrowDetection,
}

impl PipelineConfig {
    pub const DEFAULT_BINARIZER: BinarizerKind = BinarizerKind::Adaptive;
    pub const DEFAULT_ADAPTIVE_BLOCK_SIZE: u32 = 11;
    pub const DEFAULT_ADAPTIVE_OFFSET: i16 = 2;
    pub const DEFAULT_MORPHOLOGY_RADIUS: u8 = 1;
    pub const DEFAULT_BLUR_SIGMA: f32 = 1.0;
    pub const DEFAULT_GLOBAL_THRESHOLD: u8 = 127;

    /// Check parameter invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first
    /// parameter that is out of range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let policy = &self.classification;
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "adaptive_block_size must be odd and at least 3, got {}",
                self.adaptive_block_size
            )));
        }
        if !(0.0..1.0).contains(&policy.min_area_fraction)
            || !(policy.min_area_fraction..=1.0).contains(&policy.max_area_fraction)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "area window must satisfy 0 <= min < max <= 1, got {}..{}",
                policy.min_area_fraction, policy.max_area_fraction
            )));
        }
        if !(0.0..=1.0).contains(&policy.max_extent_fraction) {
            return Err(PipelineError::InvalidConfig(format!(
                "max_extent_fraction must be within 0..=1, got {}",
                policy.max_extent_fraction
            )));
        }
        if !(0.0..=1.0).contains(&policy.decision_fill_ratio) {
            return Err(PipelineError::InvalidConfig(format!(
                "decision_fill_ratio must be within 0..=1, got {}",
                policy.decision_fill_ratio
            )));
        }
        if let Some(rounded) = policy.rounded_fill_ratio
            && !(policy.decision_fill_ratio..=1.0).contains(&rounded)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "rounded_fill_ratio must lie between decision_fill_ratio and 1, got {rounded}"
            )));
        }
        if policy.oval_min_vertices <= 4 {
            return Err(PipelineError::InvalidConfig(format!(
                "oval_min_vertices must exceed the quadrilateral vertex count, got {}",
                policy.oval_min_vertices
            )));
        }
        if !(policy.approx_epsilon_fraction.is_finite() && policy.approx_epsilon_fraction >= 0.0)
            || !(policy.duplicate_radius.is_finite() && policy.duplicate_radius >= 0.0)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "approx_epsilon_fraction and duplicate_radius must be finite and non-negative, got {} and {}",
                policy.approx_epsilon_fraction, policy.duplicate_radius
            )));
        }
        if !(self.graph.overlap_tolerance.is_finite() && self.graph.overlap_tolerance >= 0.0)
            || !(self.graph.max_edge_fraction.is_finite() && self.graph.max_edge_fraction > 0.0)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "graph overlap_tolerance must be finite and >= 0 and max_edge_fraction finite and > 0, got {} and {}",
                self.graph.overlap_tolerance, self.graph.max_edge_fraction
            )));
        }
        if !(-255..=255).contains(&self.adaptive_offset) {
            return Err(PipelineError::InvalidConfig(format!(
                "adaptive_offset must be within -255..=255, got {}",
                self.adaptive_offset
            )));
        }
        if !(self.blur_sigma.is_finite() && self.blur_sigma > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "blur_sigma must be finite and positive, got {}",
                self.blur_sigma
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            binarizer: Self::DEFAULT_BINARIZER,
            adaptive_block_size: Self::DEFAULT_ADAPTIVE_BLOCK_SIZE,
            adaptive_offset: Self::DEFAULT_ADAPTIVE_OFFSET,
            morphology_radius: Self::DEFAULT_MORPHOLOGY_RADIUS,
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            global_threshold: Self::DEFAULT_GLOBAL_THRESHOLD,
            classification: ClassificationPolicy::default(),
            graph: GraphPolicy::default(),
            arrows: ArrowDetection::default(),
        }
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("invalid image: {0}")]
    InvalidImage(#[from] image::ImageError),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bounding_box_geometry() {
        let b = BoundingBox::new(10, 20, 40, 30);
        assert!((b.area() - 1200.0).abs() < f64::EPSILON);
        assert_eq!(b.center(), Point::new(30.0, 35.0));
        assert!((b.top() - 20.0).abs() < f64::EPSILON);
        assert!((b.bottom() - 50.0).abs() < f64::EPSILON);
        assert_eq!(b.to_array(), [10, 20, 40, 30]);
    }

    #[test]
    fn shape_kind_display() {
        assert_eq!(ShapeKind::StartEnd.to_string(), "Start/End");
        assert_eq!(ShapeKind::Decision.to_string(), "Decision");
        assert_eq!(
            serde_json::to_string(&ShapeKind::StartEnd).unwrap(),
            "\"Start/End\""
        );
    }

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn even_block_size_is_rejected() {
        let config = PipelineConfig {
            adaptive_block_size: 10,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rounded_cutoff_below_decision_cutoff_is_rejected() {
        let config = PipelineConfig {
            classification: ClassificationPolicy {
                rounded_fill_ratio: Some(0.5),
                ..ClassificationPolicy::default()
            },
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    fn rejected(config: &PipelineConfig) -> bool {
        matches!(config.validate(), Err(PipelineError::InvalidConfig(_)))
    }

    #[test]
    fn adaptive_offset_outside_gray_range_is_rejected() {
        for offset in [i16::MIN, -256, 256, i16::MAX] {
            let config = PipelineConfig {
                adaptive_offset: offset,
                ..PipelineConfig::default()
            };
            assert!(rejected(&config), "offset {offset}");
        }
        for offset in [-255, 0, 255] {
            let config = PipelineConfig {
                adaptive_offset: offset,
                ..PipelineConfig::default()
            };
            assert!(config.validate().is_ok(), "offset {offset}");
        }
    }

    #[test]
    fn non_finite_or_non_positive_blur_sigma_is_rejected() {
        for sigma in [f32::NAN, f32::INFINITY, 0.0, -1.0] {
            let config = PipelineConfig {
                blur_sigma: sigma,
                ..PipelineConfig::default()
            };
            assert!(rejected(&config), "sigma {sigma}");
        }
    }

    #[test]
    fn non_finite_duplicate_radius_is_rejected() {
        for radius in [f64::NAN, f64::INFINITY] {
            let config = PipelineConfig {
                classification: ClassificationPolicy {
                    duplicate_radius: radius,
                    ..ClassificationPolicy::default()
                },
                ..PipelineConfig::default()
            };
            assert!(rejected(&config), "radius {radius}");
        }
    }

    #[test]
    fn non_finite_graph_policy_is_rejected() {
        for value in [f64::NAN, f64::INFINITY] {
            let tolerance = PipelineConfig {
                graph: GraphPolicy {
                    overlap_tolerance: value,
                    ..GraphPolicy::default()
                },
                ..PipelineConfig::default()
            };
            let fraction = PipelineConfig {
                graph: GraphPolicy {
                    max_edge_fraction: value,
                    ..GraphPolicy::default()
                },
                ..PipelineConfig::default()
            };
            assert!(rejected(&tolerance), "overlap_tolerance {value}");
            assert!(rejected(&fraction), "max_edge_fraction {value}");
        }
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"binarizer":"Global","classification":{"decision_fill_ratio":0.7}}"#)
                .unwrap();
        assert_eq!(config.binarizer, BinarizerKind::Global);
        assert!((config.classification.decision_fill_ratio - 0.7).abs() < f64::EPSILON);
        assert!(
            (config.classification.duplicate_radius - ClassificationPolicy::DEFAULT_DUPLICATE_RADIUS)
                .abs()
                < f64::EPSILON
        );
        assert_eq!(config.adaptive_block_size, PipelineConfig::DEFAULT_ADAPTIVE_BLOCK_SIZE);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty"
        );
        assert_eq!(
            PipelineError::InvalidConfig("bad".to_string()).to_string(),
            "invalid pipeline configuration: bad"
        );
    }
}
