//! Scoring of generated algorithms.
//!
//! Two strategies share the [`Evaluate`] contract:
//!
//! - [`ReferenceEvaluator`] compares the generated steps with a
//!   caller-supplied [`ReferenceAlgorithm`] using TF-IDF cosine
//!   similarity, plus a small bonus for matching length.
//! - [`RubricEvaluator`] awards fixed point buckets for structural
//!   features of the [`FlowGraph`] and needs no reference.
//!
//! Similarity is computed independently for every (reference step,
//! generated step) pair with a vocabulary of just those two strings, so
//! the cost is quadratic in the number of steps. Charts have tens of
//! nodes, which keeps this cheap.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::graph::FlowGraph;
use crate::linearize::AlgorithmStep;
use crate::types::ShapeKind;

/// Upper bound of every score.
pub const MAX_SCORE: u32 = 100;

/// Points available for matching the reference length.
const LENGTH_POINTS: u32 = 10;
/// Points for a reference step classified Correct.
const CORRECT_POINTS: u32 = 10;
/// Points for a reference step classified Partial.
const PARTIAL_POINTS: u32 = 5;
const CORRECT_SIMILARITY: f64 = 0.7;
const PARTIAL_SIMILARITY: f64 = 0.4;

/// Result of scoring one generated algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Score in `[0, MAX_SCORE]`, rounded to two decimals.
    pub score: f64,
    pub max_score: u32,
    /// Human-readable feedback, one line per check or reference step.
    pub feedback: Vec<String>,
    /// Per reference step outcome. Empty in rubric mode.
    pub step_matches: Vec<StepMatch>,
    /// Number of similarity computations performed.
    pub pairs_compared: usize,
}

impl ScoreResult {
    fn new(score: f64, feedback: Vec<String>) -> Self {
        Self {
            score: round2(score.clamp(0.0, f64::from(MAX_SCORE))),
            max_score: MAX_SCORE,
            feedback,
            step_matches: Vec::new(),
            pairs_compared: 0,
        }
    }
}

/// How well one reference step was matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepMatch {
    /// Zero-based position in the reference.
    pub index: usize,
    pub reference: String,
    /// Best similarity against any generated step.
    pub similarity: f64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Correct,
    Partial,
    Missing,
}

impl Verdict {
    fn from_similarity(similarity: f64) -> Self {
        if similarity > CORRECT_SIMILARITY {
            Self::Correct
        } else if similarity > PARTIAL_SIMILARITY {
            Self::Partial
        } else {
            Self::Missing
        }
    }

    const fn points(self) -> u32 {
        match self {
            Self::Correct => CORRECT_POINTS,
            Self::Partial => PARTIAL_POINTS,
            Self::Missing => 0,
        }
    }
}

/// A scoring strategy.
pub trait Evaluate {
    /// Score the generated steps. Never fails; degenerate input yields a
    /// zero score with an explanatory feedback line.
    fn evaluate(&self, steps: &[AlgorithmStep]) -> ScoreResult;
}

/// Canonical step sequence supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceAlgorithm {
    steps: Vec<String>,
}

impl ReferenceAlgorithm {
    #[must_use]
    pub const fn new(steps: Vec<String>) -> Self {
        Self { steps }
    }

    /// One step per non-blank line, trimmed.
    #[must_use]
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect(),
        )
    }

    /// Accept either a JSON array of strings or plain lines.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.trim_start().starts_with('[') {
            if let Ok(steps) = serde_json::from_str::<Vec<String>>(text) {
                return Self::new(steps);
            }
            debug!("reference looks like JSON but does not parse, reading lines");
        }
        Self::from_lines(text)
    }

    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Reference-comparison scoring.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceEvaluator<'a> {
    reference: &'a ReferenceAlgorithm,
}

impl<'a> ReferenceEvaluator<'a> {
    #[must_use]
    pub const fn new(reference: &'a ReferenceAlgorithm) -> Self {
        Self { reference }
    }
}

impl Evaluate for ReferenceEvaluator<'_> {
    fn evaluate(&self, steps: &[AlgorithmStep]) -> ScoreResult {
        if steps.is_empty() || self.reference.is_empty() {
            return ScoreResult::new(0.0, vec!["Empty algorithm provided.".to_string()]);
        }

        let generated: Vec<String> = steps.iter().map(ToString::to_string).collect();
        let length_gap = self.reference.len().abs_diff(generated.len());
        let mut marks = LENGTH_POINTS.saturating_sub(u32::try_from(length_gap).unwrap_or(u32::MAX));

        let mut feedback = Vec::with_capacity(self.reference.len());
        let mut step_matches = Vec::with_capacity(self.reference.len());
        let mut pairs_compared = 0;

        for (index, reference) in self.reference.steps().iter().enumerate() {
            let similarity = generated
                .iter()
                .map(|candidate| {
                    pairs_compared += 1;
                    tfidf_cosine(reference, candidate).unwrap_or_else(|e| {
                        debug!(
                            reference = reference.as_str(),
                            candidate = candidate.as_str(),
                            error:% = e;
                            "similarity treated as 0"
                        );
                        0.0
                    })
                })
                .fold(0.0, f64::max);

            let verdict = Verdict::from_similarity(similarity);
            marks += verdict.points();
            let n = index + 1;
            feedback.push(match verdict {
                Verdict::Correct => format!("Step {n} Correct: '{reference}' found."),
                Verdict::Partial => format!("Step {n} Partial: '{reference}' partially addressed."),
                Verdict::Missing => format!("Step {n} Missing: '{reference}' not found."),
            });
            step_matches.push(StepMatch {
                index,
                reference: reference.clone(),
                similarity,
                verdict,
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let possible = (self.reference.len() * CORRECT_POINTS as usize + LENGTH_POINTS as usize) as f64;
        let mut result = ScoreResult::new(f64::from(marks) / possible * 100.0, feedback);
        result.step_matches = step_matches;
        result.pairs_compared = pairs_compared;
        result
    }
}

/// Fixed-bucket structural scoring.
#[derive(Debug, Clone, Copy)]
pub struct RubricEvaluator<'a> {
    graph: &'a FlowGraph,
}

impl<'a> RubricEvaluator<'a> {
    #[must_use]
    pub const fn new(graph: &'a FlowGraph) -> Self {
        Self { graph }
    }
}

impl Evaluate for RubricEvaluator<'_> {
    /// The steps are not inspected; every bucket comes from the graph.
    fn evaluate(&self, _steps: &[AlgorithmStep]) -> ScoreResult {
        let graph = self.graph;
        let validation = graph.validation();
        let mut score = 0.0;
        let mut feedback = Vec::new();

        if validation.has_start {
            feedback.push("✓ Flowchart has a proper START node".to_string());
            score += 15.0;
        } else {
            feedback.push(
                "✗ Missing START node - flowcharts should begin with a start symbol".to_string(),
            );
        }

        if validation.has_end {
            feedback.push("✓ Flowchart has a proper END node".to_string());
            score += 15.0;
        } else {
            feedback
                .push("✗ Missing END node - flowcharts should end with a stop/end symbol".to_string());
        }

        let processes = graph.shapes().filter(|s| s.kind == ShapeKind::Process).count();
        if processes > 0 {
            feedback.push(format!("✓ Contains {processes} process step(s)"));
            score += capped_points(processes, 5, 20);
        } else {
            feedback.push(
                "! No process steps detected - flowcharts typically have actions/processes"
                    .to_string(),
            );
        }

        let decisions = graph.shapes().filter(|s| s.kind == ShapeKind::Decision).count();
        if decisions > 0 {
            feedback.push(format!("✓ Contains {decisions} decision point(s)"));
            score += capped_points(decisions, 10, 20);
        } else {
            feedback.push(
                "! No decision points detected - consider if conditional logic is needed"
                    .to_string(),
            );
        }

        let message = graph.validation_message();
        if validation.is_valid() {
            feedback.push(format!("✓ Graph structure is valid: {message}"));
            score += 15.0;
        } else {
            feedback.push(format!("✗ Graph structure issue: {message}"));
        }

        let total = graph.node_count();
        let labeled = graph.shapes().filter(|s| !s.text.trim().is_empty()).count();
        if labeled > 0 {
            feedback.push(format!("✓ {labeled}/{total} shapes have readable text"));
            #[allow(clippy::cast_precision_loss)]
            let proportion = labeled as f64 / total.max(1) as f64;
            score += (proportion * 15.0).min(15.0);
        } else {
            feedback.push(
                "! No text detected in shapes - ensure labels are clear and readable".to_string(),
            );
        }

        ScoreResult::new(score, feedback)
    }
}

fn capped_points(count: usize, each: u32, cap: u32) -> f64 {
    let points = u32::try_from(count).unwrap_or(u32::MAX).saturating_mul(each);
    f64::from(points.min(cap))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Failure to compare two strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SimilarityError {
    /// Neither string contains a token of two or more word characters.
    #[error("empty vocabulary: neither text contains a word token")]
    EmptyVocabulary,
}

/// Word tokens: runs of two or more word characters, lowercased.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Cosine similarity of the TF-IDF vectors of `a` and `b`, fitted on
/// just these two documents.
///
/// Term weights are raw counts times a smoothed inverse document
/// frequency `ln(3 / (1 + df)) + 1`; vectors are L2-normalized. A
/// string without tokens compares as 0 against a string with tokens.
///
/// # Errors
///
/// Returns [`SimilarityError::EmptyVocabulary`] when neither string has
/// a token.
pub fn tfidf_cosine(a: &str, b: &str) -> Result<f64, SimilarityError> {
    let docs = [tokenize(a), tokenize(b)];

    // term -> count per document
    let mut counts: BTreeMap<&str, [u32; 2]> = BTreeMap::new();
    for (doc, tokens) in docs.iter().enumerate() {
        for token in tokens {
            counts.entry(token.as_str()).or_default()[doc] += 1;
        }
    }
    if counts.is_empty() {
        return Err(SimilarityError::EmptyVocabulary);
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for [ca, cb] in counts.into_values() {
        let df = f64::from(u32::from(ca > 0) + u32::from(cb > 0));
        let idf = (3.0 / (1.0 + df)).ln() + 1.0;
        let (wa, wb) = (f64::from(ca) * idf, f64::from(cb) * idf);
        dot += wa * wb;
        norm_a += wa * wa;
        norm_b += wb * wb;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0))
}
