//! Informational line count over the foreground mask.
//!
//! Straight strokes in a flowchart are mostly connectors, so the number
//! of Hough lines is a rough proxy for the number of arrows. The count
//! is reported but never used to build the flow graph.

use image::GrayImage;
use imageproc::hough::{LineDetectionOptions, detect_lines};
use log::debug;

use crate::types::ArrowDetection;

/// Count straight lines in a binary mask. Foreground pixels vote.
///
/// The result is the number of polar Hough lines that survive
/// non-maximum suppression. Lines are infinite, so collinear strokes
/// count once and the value is not a count of drawn segments.
#[must_use]
pub fn count_line_segments(mask: &GrayImage, settings: ArrowDetection) -> usize {
    let lines = detect_lines(
        mask,
        LineDetectionOptions {
            vote_threshold: settings.vote_threshold,
            suppression_radius: settings.suppression_radius,
        },
    );
    debug!(lines = lines.len(); "hough line detection finished");
    lines.len()
}
