//! Analysis diagnostics: timing and counts for each stage.
//!
//! Every call to [`analyze`](crate::analyze) collects these alongside
//! the report. They exist for threshold tuning: when a chart is scored
//! unexpectedly, the per-stage counts show where symbols were lost.
//!
//! Durations are serialized as fractional seconds (`f64`), since
//! `std::time::Duration` does not implement serde traits.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    pub decode: StageDiagnostics,
    pub binarize: StageDiagnostics,
    pub contour_tracing: StageDiagnostics,
    /// Area filtering, polygon approximation and classification.
    pub classification: StageDiagnostics,
    pub dedup: StageDiagnostics,
    /// Informational Hough line count.
    pub arrows: StageDiagnostics,
    pub labeling: StageDiagnostics,
    pub graph: StageDiagnostics,
    pub linearize: StageDiagnostics,
    pub evaluate: StageDiagnostics,
    /// Wall-clock duration of the entire run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    pub metrics: StageMetrics,
}

impl StageDiagnostics {
    /// Diagnostics for a stage that started at `start` and just ended.
    pub(crate) fn since(start: Instant, metrics: StageMetrics) -> Self {
        Self {
            duration: start.elapsed(),
            metrics,
        }
    }
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    Decode {
        input_bytes: usize,
        width: u32,
        height: u32,
        pixel_count: u64,
    },
    Binarize {
        strategy: String,
        /// Pixels classified as ink.
        foreground_pixels: u64,
        total_pixels: u64,
    },
    ContourTracing {
        contour_count: usize,
        outer_count: usize,
        hole_count: usize,
    },
    Classification {
        /// Contours that passed the area and frame filters.
        candidates: usize,
        start_end: usize,
        process: usize,
        decision: usize,
        unknown: usize,
    },
    Dedup {
        before: usize,
        after: usize,
    },
    Arrows {
        lines: usize,
    },
    Labeling {
        shapes: usize,
        with_text: usize,
    },
    Graph {
        nodes: usize,
        edges: usize,
        valid: bool,
    },
    Linearize {
        steps: usize,
    },
    Evaluate {
        mode: String,
        score: f64,
        pairs_compared: usize,
    },
}

impl AnalysisDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Analysis Diagnostics Report\n{}", "=".repeat(60)));
        if let StageMetrics::Decode {
            width,
            height,
            pixel_count,
            ..
        } = self.decode.metrics
        {
            lines.push(format!("Image: {width}x{height} ({pixel_count} pixels)"));
        }
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<20} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Binarize", &self.binarize),
            ("Contour Tracing", &self.contour_tracing),
            ("Classification", &self.classification),
            ("Dedup", &self.dedup),
            ("Arrows", &self.arrows),
            ("Labeling", &self.labeling),
            ("Graph", &self.graph),
            ("Linearize", &self.linearize),
            ("Evaluate", &self.evaluate),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<20} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Binarize {
            strategy,
            foreground_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixels > 0 {
                *foreground_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!("{strategy} ink={foreground_pixels} ({density:.1}%)")
        }
        StageMetrics::ContourTracing {
            contour_count,
            outer_count,
            hole_count,
        } => format!("{contour_count} contours ({outer_count} outer, {hole_count} hole)"),
        StageMetrics::Classification {
            candidates,
            start_end,
            process,
            decision,
            unknown,
        } => format!(
            "{candidates} candidates: start/end={start_end} process={process} decision={decision} unknown={unknown}"
        ),
        StageMetrics::Dedup { before, after } => {
            format!("{before}->{after} shapes ({} duplicates)", before.saturating_sub(*after))
        }
        StageMetrics::Arrows { lines } => format!("{lines} Hough lines"),
        StageMetrics::Labeling { shapes, with_text } => format!("{with_text}/{shapes} with text"),
        StageMetrics::Graph {
            nodes,
            edges,
            valid,
        } => format!("{nodes} nodes, {edges} edges, valid={valid}"),
        StageMetrics::Linearize { steps } => format!("{steps} steps"),
        StageMetrics::Evaluate {
            mode,
            score,
            pairs_compared,
        } => format!("{mode} score={score:.2} pairs={pairs_compared}"),
    }
}
