//! Gaussian smoothing.
//!
//! Used twice: as noise reduction ahead of global thresholding, and as
//! the Gaussian-weighted local mean inside adaptive thresholding.

use image::GrayImage;

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive or NaN sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics unless `sigma > 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma.is_nan() || sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Sigma of the Gaussian window matching a square kernel of `block_size`
/// pixels: `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_block_size(block_size: u32) -> f32 {
    let k = block_size as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}
