//! Symbol labels: the text-extraction seam and label normalization.
//!
//! Optical character recognition is not part of this crate. Callers
//! plug an OCR engine in through [`TextExtractor`] and are expected to
//! pass raw recognizer output through [`normalize_text`]. When the
//! extractor has nothing to offer, every node still gets a
//! deterministic placeholder label, so distinct nodes get distinct
//! labels.

use std::collections::HashMap;

use image::GrayImage;
use log::debug;

use crate::types::{BoundingBox, ShapeKind, ShapeRecord};

/// Canonical tokens and the words folded into them, checked in order.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("start", &["begin", "entry"]),
    ("stop", &["end", "exit", "finish"]),
    ("input", &["read", "get", "scan"]),
    ("print", &["output", "display", "show", "write"]),
];

/// Pluggable text recognition for one detected symbol.
///
/// Implementations may be slow (real OCR). Callers that need a time
/// bound must impose it inside the implementation.
pub trait TextExtractor {
    /// Read the label inside `bbox`, already normalized.
    ///
    /// Return `None` when recognition is unavailable or inconclusive;
    /// the pipeline then falls back to a placeholder label.
    fn extract(
        &self,
        image: &GrayImage,
        bbox: BoundingBox,
        kind: ShapeKind,
        index: usize,
    ) -> Option<String>;
}

/// Extractor for deployments without OCR: placeholders only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcr;

impl TextExtractor for NoOcr {
    fn extract(&self, _: &GrayImage, _: BoundingBox, _: ShapeKind, _: usize) -> Option<String> {
        None
    }
}

/// Labels supplied by the caller, one per node index in reading order.
///
/// Labels are used verbatim. Missing or blank entries fall back to
/// placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedLabels(Vec<String>);

impl FixedLabels {
    #[must_use]
    pub const fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }
}

impl TextExtractor for FixedLabels {
    fn extract(&self, _: &GrayImage, _: BoundingBox, _: ShapeKind, index: usize) -> Option<String> {
        self.0.get(index).cloned()
    }
}

/// Clean recognized text and fold common synonyms onto canonical tokens.
///
/// Characters other than ASCII letters, digits, whitespace and the
/// operators `+ - * / = > < !` are dropped, the rest is lowercased and
/// trimmed. If the result contains any synonym of a canonical token,
/// the whole label becomes that token.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || "+-*/=><!".contains(*c))
        .collect::<String>()
        .to_lowercase();
    let cleaned = cleaned.trim();

    SYNONYMS
        .iter()
        .find(|(_, words)| words.iter().any(|w| cleaned.contains(w)))
        .map_or_else(|| cleaned.to_string(), |(canonical, _)| (*canonical).to_string())
}

/// Whether a label denotes the start terminal.
#[must_use]
pub fn denotes_start(text: &str) -> bool {
    normalize_text(text).contains("start")
}

/// Whether a label denotes an end terminal (`stop`, `end`, `exit`, ...).
#[must_use]
pub fn denotes_end(text: &str) -> bool {
    let normalized = normalize_text(text);
    normalized.contains("stop") || normalized.contains("end") || normalized.contains("exit")
}

/// Deterministic per-kind placeholder labels.
///
/// The first Start/End symbol is `Start`, later ones are `End`;
/// decisions and processes are numbered per kind from 1. Unknown
/// symbols stay unlabeled so they show up as text-less in scoring.
#[derive(Debug, Default)]
struct Placeholders {
    seen: HashMap<ShapeKind, usize>,
}

impl Placeholders {
    fn next(&mut self, kind: ShapeKind) -> String {
        let n = self.seen.entry(kind).or_insert(0);
        *n += 1;
        match kind {
            ShapeKind::StartEnd if *n == 1 => "Start".to_string(),
            ShapeKind::StartEnd => "End".to_string(),
            ShapeKind::Decision => format!("Check condition {n}"),
            ShapeKind::Process => format!("Process Step {n}"),
            ShapeKind::Unknown => String::new(),
        }
    }
}

/// Fill in `text` for every shape, in node order.
///
/// Extractor output is trimmed; blank or missing output is replaced by
/// the placeholder for that shape.
pub fn assign_labels(image: &GrayImage, shapes: &mut [ShapeRecord], extractor: &dyn TextExtractor) {
    let mut placeholders = Placeholders::default();
    for (index, shape) in shapes.iter_mut().enumerate() {
        // Advance the counter even when OCR succeeds so placeholder
        // numbering depends only on shape order.
        let fallback = placeholders.next(shape.kind);
        let recognized = extractor
            .extract(image, shape.bbox, shape.kind, index)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        shape.text = recognized.unwrap_or_else(|| {
            debug!(shape_id = shape.id, kind = shape.kind.as_str(); "using placeholder label");
            fallback
        });
    }
}
