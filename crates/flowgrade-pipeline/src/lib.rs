//! flowgrade-pipeline: flowchart image analysis and scoring (sans-IO).
//!
//! Turns a raster image of a flowchart into typed symbols, infers the
//! flow between them, linearizes the flow into an algorithm and scores
//! it:
//! decode -> binarize -> contour tracing -> classification ->
//! duplicate suppression -> labeling -> flow graph -> linearize ->
//! evaluate.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Reading files, OCR engines
//! and presentation live with the caller (see the `flowgrade` CLI).

pub mod analysis;
pub mod arrows;
pub mod blur;
pub mod classify;
pub mod contour;
pub mod dedup;
pub mod detect;
pub mod diagnostics;
pub mod evaluate;
pub mod geometry;
pub mod graph;
pub mod grayscale;
pub mod linearize;
pub mod simplify;
pub mod text;
pub mod threshold;
pub mod types;

pub use analysis::{AnalysisReport, EvaluationMode, ShapeSummary, analyze};
pub use diagnostics::AnalysisDiagnostics;
pub use evaluate::{
    Evaluate, ReferenceAlgorithm, ReferenceEvaluator, RubricEvaluator, ScoreResult,
    SimilarityError, Verdict,
};
pub use graph::{FlowGraph, GraphBuilder};
pub use linearize::{AlgorithmStep, linearize};
pub use text::{FixedLabels, NoOcr, TextExtractor, normalize_text};
pub use threshold::{Binarizer, BinarizerKind};
pub use types::{
    BoundingBox, ClassificationPolicy, Dimensions, GraphPolicy, PipelineConfig, PipelineError,
    Point, Polyline, ShapeKind, ShapeRecord,
};
