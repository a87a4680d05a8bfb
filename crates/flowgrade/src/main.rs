//! flowgrade: extract the algorithm drawn in a flowchart image and grade it.
//!
//! Reads an image, runs the analysis pipeline and prints the detected
//! symbols, the generated algorithm, the score and feedback. Without
//! `--reference` the structural rubric is used.
//!
//! # Usage
//!
//! ```text
//! flowgrade [OPTIONS] <IMAGE_PATH>
//! flowgrade chart.png --labels labels.txt --reference model.txt --json
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use flowgrade_pipeline::{
    AnalysisReport, BinarizerKind, ClassificationPolicy, EvaluationMode, FixedLabels, NoOcr,
    PipelineConfig, PipelineError, ReferenceAlgorithm, TextExtractor,
};
use log::{LevelFilter, debug, info};

/// Extract and grade the algorithm drawn in a flowchart image.
#[derive(Debug, Parser)]
#[command(name = "flowgrade", version)]
struct Cli {
    /// Path to the flowchart image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Reference algorithm: one step per line, or a JSON array of strings.
    ///
    /// When omitted, the chart is scored with the structural rubric.
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Symbol labels, one per line in reading order (top to bottom,
    /// then left to right). Blank lines fall back to placeholders.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Binarization strategy.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_BINARIZER)]
    binarizer: Binarizer,

    /// Fill ratio below which a quadrilateral is a decision diamond.
    #[arg(long, default_value_t = ClassificationPolicy::DEFAULT_DECISION_FILL_RATIO)]
    decision_fill_ratio: f64,

    /// Full pipeline config as a JSON file.
    ///
    /// When provided, the individual pipeline flags are ignored.
    #[arg(long, conflicts_with = "config_json")]
    config: Option<PathBuf>,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, the individual pipeline flags are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Print the analysis report as JSON.
    #[arg(long)]
    json: bool,

    /// Print per-stage diagnostics (to stderr unless `--json`).
    #[arg(long)]
    diagnostics: bool,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Binarization strategy selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Binarizer {
    /// Local threshold plus opening and closing (photos, hand drawings).
    Adaptive,
    /// Blur plus one global threshold (clean digital renderings).
    Global,
}

const fn binarizer_from_pipeline(kind: BinarizerKind) -> Binarizer {
    match kind {
        BinarizerKind::Adaptive => Binarizer::Adaptive,
        BinarizerKind::Global => Binarizer::Global,
    }
}

/// Derived from [`PipelineConfig::DEFAULT_BINARIZER`] so the two cannot
/// silently diverge.
const CLI_DEFAULT_BINARIZER: Binarizer = binarizer_from_pipeline(PipelineConfig::DEFAULT_BINARIZER);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

fn read_to_string(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// A JSON config (file or string) wins over the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, CliError> {
    if let Some(ref path) = cli.config {
        return Ok(serde_json::from_str(&read_to_string(path)?)?);
    }
    if let Some(ref json) = cli.config_json {
        return Ok(serde_json::from_str(json)?);
    }

    let defaults = PipelineConfig::default();
    Ok(PipelineConfig {
        binarizer: match cli.binarizer {
            Binarizer::Adaptive => BinarizerKind::Adaptive,
            Binarizer::Global => BinarizerKind::Global,
        },
        classification: ClassificationPolicy {
            decision_fill_ratio: cli.decision_fill_ratio,
            ..defaults.classification
        },
        ..defaults
    })
}

fn evaluation_mode(cli: &Cli) -> Result<EvaluationMode, CliError> {
    Ok(match cli.reference {
        Some(ref path) => EvaluationMode::Reference(ReferenceAlgorithm::parse(&read_to_string(path)?)),
        None => EvaluationMode::Rubric,
    })
}

fn extractor(cli: &Cli) -> Result<Box<dyn TextExtractor>, CliError> {
    Ok(match cli.labels {
        Some(ref path) => Box::new(parse_labels(&read_to_string(path)?)),
        None => Box::new(NoOcr),
    })
}

/// One label per line; positions are kept, so blank lines stay blank.
fn parse_labels(text: &str) -> FixedLabels {
    FixedLabels::new(text.lines().map(|line| line.trim().to_string()).collect())
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = config_from_cli(cli)?;
    let mode = evaluation_mode(cli)?;
    let extractor = extractor(cli)?;
    debug!(config:?; "pipeline configuration");

    let image_bytes = std::fs::read(&cli.image_path).map_err(|source| CliError::Io {
        path: cli.image_path.clone(),
        source,
    })?;
    info!(path:? = cli.image_path, bytes = image_bytes.len(), mode = mode.name(); "analyzing");

    let report = flowgrade_pipeline::analyze(&image_bytes, &config, extractor.as_ref(), &mode)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render(&report));
        if cli.diagnostics {
            eprintln!("{}", report.diagnostics.report());
        }
    }
    Ok(())
}

/// Human-readable summary of one analysis.
fn render(report: &AnalysisReport) -> String {
    let mut lines = vec![
        format!(
            "Detected {} shapes and {} Hough lines.",
            report.shapes_detected, report.arrows_detected
        ),
        String::new(),
    ];
    for (i, shape) in report.shapes.iter().enumerate() {
        let [x, y, w, h] = shape.position;
        lines.push(format!(
            "  [{i}] {:<10} {:<24} at ({x}, {y}) {w}x{h}",
            shape.kind.as_str(),
            format!("{:?}", shape.text)
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Graph: {} ({})",
        report.validation_message,
        if report.graph_valid { "valid" } else { "invalid" }
    ));
    lines.push(String::new());
    lines.push("Generated algorithm:".to_string());
    for (i, step) in report.generated_algorithm.iter().enumerate() {
        lines.push(format!("  {}. {step}", i + 1));
    }
    lines.push(String::new());
    lines.push(format!("Score: {:.2}/{}", report.score, report.max_score));
    for line in &report.feedback {
        lines.push(format!("  {line}"));
    }
    lines.join("\n")
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", cli.log_level);
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("flowgrade").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_default_from_pipeline_constants() {
        let config = config_from_cli(&parse(&["chart.png"])).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn individual_flags_override_defaults() {
        let cli = parse(&["chart.png", "--binarizer", "global", "--decision-fill-ratio", "0.7"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.binarizer, BinarizerKind::Global);
        assert!((config.classification.decision_fill_ratio - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn config_json_wins_over_flags() {
        let cli = parse(&[
            "chart.png",
            "--binarizer",
            "adaptive",
            "--config-json",
            r#"{"binarizer": "Global", "graph": {"overlap_tolerance": 4.0}}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.binarizer, BinarizerKind::Global);
        assert!((config.graph.overlap_tolerance - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.classification, ClassificationPolicy::default());
    }

    #[test]
    fn malformed_config_json_is_reported() {
        let cli = parse(&["chart.png", "--config-json", "{not json"]);
        assert!(matches!(config_from_cli(&cli), Err(CliError::Json(_))));
    }

    #[test]
    fn missing_reference_file_is_an_io_error() {
        let cli = parse(&["chart.png", "--reference", "/nonexistent/reference.txt"]);
        let err = evaluation_mode(&cli).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/reference.txt"));
    }

    #[test]
    fn labels_keep_blank_positions() {
        let labels = parse_labels("Start\n\nStop\n");
        assert_eq!(
            labels,
            FixedLabels::new(vec!["Start".to_string(), String::new(), "Stop".to_string()])
        );
    }

    #[test]
    fn render_includes_algorithm_and_score() {
        let page = image::GrayImage::from_pixel(200, 200, image::Luma([255]));
        let mut png = std::io::Cursor::new(Vec::new());
        page.write_to(&mut png, image::ImageFormat::Png).unwrap();

        let report = flowgrade_pipeline::analyze(
            &png.into_inner(),
            &PipelineConfig::default(),
            &NoOcr,
            &EvaluationMode::Rubric,
        )
        .unwrap();
        let text = render(&report);
        assert!(text.contains("Detected 0 shapes and 0 Hough lines."));
        assert!(text.contains("Graph: Graph has 0 nodes and 0 edges; no start node, no end node (invalid)"));
        assert!(text.contains("  1. Error: No Start node found."));
        assert!(text.contains("Score: 0.00/100"));
    }
}
