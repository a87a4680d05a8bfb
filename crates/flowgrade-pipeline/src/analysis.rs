//! End-to-end analysis: image bytes in, scored report out.

use std::time::Instant;

use log::info;
use serde::Serialize;

use crate::arrows::count_line_segments;
use crate::contour::{self, BorderKind};
use crate::dedup::filter_duplicates;
use crate::detect::classify_contours;
use crate::diagnostics::{AnalysisDiagnostics, StageDiagnostics, StageMetrics};
use crate::evaluate::{
    Evaluate, ReferenceAlgorithm, ReferenceEvaluator, RubricEvaluator, StepMatch,
};
use crate::graph::GraphBuilder;
use crate::grayscale::decode_and_grayscale;
use crate::linearize::linearize;
use crate::text::{TextExtractor, assign_labels};
use crate::threshold::{Binarizer, foreground_count};
use crate::types::{Dimensions, PipelineConfig, PipelineError, ShapeKind, ShapeRecord};

/// How the generated algorithm is scored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EvaluationMode {
    /// Structural rubric; no reference needed.
    #[default]
    Rubric,
    /// Similarity against a known-good algorithm.
    Reference(ReferenceAlgorithm),
}

impl EvaluationMode {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rubric => "rubric",
            Self::Reference(_) => "reference",
        }
    }
}

/// One detected symbol as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeSummary {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub text: String,
    /// `[x, y, width, height]` in pixels.
    pub position: [u32; 4],
}

impl From<&ShapeRecord> for ShapeSummary {
    fn from(shape: &ShapeRecord) -> Self {
        Self {
            kind: shape.kind,
            text: shape.text.clone(),
            position: shape.bbox.to_array(),
        }
    }
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub shapes_detected: usize,
    /// Number of Hough lines (infinite polar lines after non-maximum
    /// suppression) in the foreground mask. This is not a segment count.
    /// Informational only; never used for edges.
    pub arrows_detected: usize,
    pub graph_valid: bool,
    pub validation_message: String,
    pub generated_algorithm: Vec<String>,
    pub score: f64,
    pub max_score: u32,
    pub feedback: Vec<String>,
    pub shapes: Vec<ShapeSummary>,
    /// Inferred flow edges as `[source index, target index]` into `shapes`.
    pub edges: Vec<(usize, usize)>,
    /// Per reference step outcome; empty in rubric mode.
    pub step_matches: Vec<StepMatch>,
    pub diagnostics: AnalysisDiagnostics,
}

/// Run the whole pipeline on one encoded image.
///
/// Decode, binarize, trace, classify, drop duplicates, label, infer the
/// flow graph, validate it, linearize it and score the result. Only
/// decoding and configuration problems are errors; an image without
/// recognizable symbols yields a report with zero shapes and a
/// diagnostic step.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// validation, [`PipelineError::EmptyInput`] for empty input and
/// [`PipelineError::InvalidImage`] if the bytes cannot be decoded.
pub fn analyze(
    image_bytes: &[u8],
    config: &PipelineConfig,
    extractor: &dyn TextExtractor,
    mode: &EvaluationMode,
) -> Result<AnalysisReport, PipelineError> {
    config.validate()?;
    let total_start = Instant::now();

    // 1. Decode and convert to grayscale.
    let start = Instant::now();
    let gray = decode_and_grayscale(image_bytes)?;
    let dimensions = Dimensions {
        width: gray.width(),
        height: gray.height(),
    };
    let decode = StageDiagnostics::since(
        start,
        StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
        },
    );

    // Stages 2-4 are the same composition as `detect::detect_shapes`,
    // split out here so each one is timed separately.

    // 2. Binarize.
    let start = Instant::now();
    let mask = config.binarizer.binarize(&gray, config);
    let binarize = StageDiagnostics::since(
        start,
        StageMetrics::Binarize {
            strategy: format!("{:?}", config.binarizer),
            foreground_pixels: foreground_count(&mask),
            total_pixels: dimensions.pixel_count(),
        },
    );

    // 3. Contour tracing.
    let start = Instant::now();
    let contours = contour::trace_contours(&mask);
    let outer_count = contours
        .iter()
        .filter(|c| c.border == BorderKind::Outer)
        .count();
    let contour_tracing = StageDiagnostics::since(
        start,
        StageMetrics::ContourTracing {
            contour_count: contours.len(),
            outer_count,
            hole_count: contours.len() - outer_count,
        },
    );

    // 4. Area filtering and classification.
    let start = Instant::now();
    let candidates = classify_contours(&contours, dimensions, &config.classification);
    let count_kind = |kind: ShapeKind| candidates.iter().filter(|s| s.kind == kind).count();
    let classification = StageDiagnostics::since(
        start,
        StageMetrics::Classification {
            candidates: candidates.len(),
            start_end: count_kind(ShapeKind::StartEnd),
            process: count_kind(ShapeKind::Process),
            decision: count_kind(ShapeKind::Decision),
            unknown: count_kind(ShapeKind::Unknown),
        },
    );

    // 5. Duplicate suppression.
    let start = Instant::now();
    let before = candidates.len();
    let mut shapes = filter_duplicates(candidates, config.classification.duplicate_radius);
    let dedup = StageDiagnostics::since(
        start,
        StageMetrics::Dedup {
            before,
            after: shapes.len(),
        },
    );

    // 6. Informational line count.
    let start = Instant::now();
    let arrows_detected = count_line_segments(&mask, config.arrows);
    let arrows = StageDiagnostics::since(
        start,
        StageMetrics::Arrows {
            lines: arrows_detected,
        },
    );

    // 7. Labels.
    let start = Instant::now();
    assign_labels(&gray, &mut shapes, extractor);
    let labeling = StageDiagnostics::since(
        start,
        StageMetrics::Labeling {
            shapes: shapes.len(),
            with_text: shapes.iter().filter(|s| !s.text.is_empty()).count(),
        },
    );

    // 8. Flow graph and validation.
    let start = Instant::now();
    let summaries: Vec<ShapeSummary> = shapes.iter().map(ShapeSummary::from).collect();
    let index_of: Vec<usize> = shapes.iter().map(|s| s.id).collect();
    let graph = GraphBuilder::new(dimensions, config.graph.clone()).build(shapes);
    let graph_valid = graph.validate_flow();
    let validation_message = graph.validation_message();
    let edges: Vec<(usize, usize)> = graph
        .edges()
        .into_iter()
        .filter_map(|(from, to)| {
            let position = |id| index_of.iter().position(|&i| i == id);
            Some((position(from)?, position(to)?))
        })
        .collect();
    let graph_stage = StageDiagnostics::since(
        start,
        StageMetrics::Graph {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            valid: graph_valid,
        },
    );

    // 9. Linearize.
    let start = Instant::now();
    let steps = linearize(&graph);
    let linearize_stage = StageDiagnostics::since(start, StageMetrics::Linearize { steps: steps.len() });

    // 10. Score.
    let start = Instant::now();
    let result = match mode {
        EvaluationMode::Rubric => RubricEvaluator::new(&graph).evaluate(&steps),
        EvaluationMode::Reference(reference) => ReferenceEvaluator::new(reference).evaluate(&steps),
    };
    let evaluate = StageDiagnostics::since(
        start,
        StageMetrics::Evaluate {
            mode: mode.name().to_string(),
            score: result.score,
            pairs_compared: result.pairs_compared,
        },
    );

    info!(
        shapes = summaries.len(),
        edges = edges.len(),
        valid = graph_valid,
        mode = mode.name(),
        score = result.score;
        "analysis finished"
    );

    Ok(AnalysisReport {
        shapes_detected: summaries.len(),
        arrows_detected,
        graph_valid,
        validation_message,
        generated_algorithm: steps.iter().map(ToString::to_string).collect(),
        score: result.score,
        max_score: result.max_score,
        feedback: result.feedback,
        shapes: summaries,
        edges,
        step_matches: result.step_matches,
        diagnostics: AnalysisDiagnostics {
            decode,
            binarize,
            contour_tracing,
            classification,
            dedup,
            arrows,
            labeling,
            graph: graph_stage,
            linearize: linearize_stage,
            evaluate,
            total_duration: total_start.elapsed(),
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use image::{GrayImage, ImageFormat, Luma};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    use super::*;
    use crate::text::NoOcr;
    use crate::threshold::BinarizerKind;

    fn png(img: &GrayImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn blank_page_degrades_gracefully() {
        let page = GrayImage::from_pixel(300, 300, Luma([255]));
        let report = analyze(&png(&page), &PipelineConfig::default(), &NoOcr, &EvaluationMode::Rubric)
            .unwrap();
        assert_eq!(report.shapes_detected, 0);
        assert!(!report.graph_valid);
        assert_eq!(report.generated_algorithm, vec!["Error: No Start node found."]);
        assert_eq!(report.score, 0.0);
        assert_eq!(report.max_score, 100);
    }

    #[test]
    fn invalid_config_is_rejected_before_decoding() {
        let config = PipelineConfig {
            adaptive_block_size: 4,
            ..PipelineConfig::default()
        };
        let err = analyze(&[], &config, &NoOcr, &EvaluationMode::Rubric).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn out_of_range_offset_is_rejected_before_binarizing() {
        let page = GrayImage::from_pixel(50, 50, Luma([255]));
        let config = PipelineConfig {
            adaptive_offset: i16::MIN,
            ..PipelineConfig::default()
        };
        let err = analyze(&png(&page), &config, &NoOcr, &EvaluationMode::Rubric).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn empty_bytes_are_rejected() {
        let err = analyze(&[], &PipelineConfig::default(), &NoOcr, &EvaluationMode::Rubric)
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn placeholder_labels_flow_into_the_report() {
        let mut page = GrayImage::from_pixel(400, 400, Luma([255]));
        draw_filled_rect_mut(&mut page, Rect::at(120, 150).of_size(160, 80), Luma([0]));
        let config = PipelineConfig {
            binarizer: BinarizerKind::Global,
            ..PipelineConfig::default()
        };
        let report = analyze(&png(&page), &config, &NoOcr, &EvaluationMode::Rubric).unwrap();
        assert_eq!(report.shapes_detected, 1);
        assert_eq!(report.shapes[0].kind, ShapeKind::Process);
        assert_eq!(report.shapes[0].text, "Process Step 1");
        assert!(report.edges.is_empty());
    }
}
