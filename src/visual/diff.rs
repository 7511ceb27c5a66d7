//! Per-pixel image difference.
//!
//! Colour distance is measured in YIQ space after blending each pixel with a
//! white background, the metric popularised by pixelmatch. A pixel counts as
//! mismatched when its squared distance exceeds `35215 * threshold²`, where
//! 35215 is the largest possible YIQ distance.

use image::{Rgba, RgbaImage};

/// Largest possible squared YIQ distance between two colours
const MAX_YIQ_DELTA: f64 = 35215.0;

/// Opacity of the unchanged pixels in the diff raster
const DIFF_FADE_ALPHA: f64 = 0.1;

const DIFF_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Outcome of diffing two equally sized images
#[derive(Debug, Clone)]
pub struct PixelDiff {
    /// Pixels whose colour distance exceeded the threshold
    pub mismatched: u64,
    /// Total pixels compared
    pub total: u64,
    /// Faded greyscale copy of the expected image with mismatches in red
    pub diff_image: RgbaImage,
}

impl PixelDiff {
    /// Mismatched fraction in `[0, 1]`; zero for empty images
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.mismatched as f64 / self.total as f64
        }
    }
}

/// Compare two images of identical dimensions.
///
/// Returns `None` when the dimensions differ; callers are expected to check
/// dimensions first and report the mismatch themselves.
pub fn pixel_diff(expected: &RgbaImage, actual: &RgbaImage, threshold: f64) -> Option<PixelDiff> {
    if expected.dimensions() != actual.dimensions() {
        return None;
    }

    let max_delta = MAX_YIQ_DELTA * threshold * threshold;
    let (width, height) = expected.dimensions();
    let mut diff_image = RgbaImage::new(width, height);
    let mut mismatched = 0u64;

    for ((px_expected, px_actual), out) in expected
        .pixels()
        .zip(actual.pixels())
        .zip(diff_image.pixels_mut())
    {
        if px_expected != px_actual && color_delta(px_expected, px_actual) > max_delta {
            mismatched += 1;
            *out = DIFF_COLOR;
        } else {
            *out = faded_gray(px_expected);
        }
    }

    Some(PixelDiff {
        mismatched,
        total: u64::from(width) * u64::from(height),
        diff_image,
    })
}

/// Squared YIQ distance of two pixels blended over white
fn color_delta(a: &Rgba<u8>, b: &Rgba<u8>) -> f64 {
    let (r1, g1, b1) = blend_white(a);
    let (r2, g2, b2) = blend_white(b);

    let y = rgb_to_y(r1, g1, b1) - rgb_to_y(r2, g2, b2);
    let i = rgb_to_i(r1, g1, b1) - rgb_to_i(r2, g2, b2);
    let q = rgb_to_q(r1, g1, b1) - rgb_to_q(r2, g2, b2);

    0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q
}

fn blend_white(px: &Rgba<u8>) -> (f64, f64, f64) {
    let [r, g, b, a] = px.0;
    let alpha = f64::from(a) / 255.0;
    let blend = |c: u8| 255.0 + (f64::from(c) - 255.0) * alpha;
    (blend(r), blend(g), blend(b))
}

fn rgb_to_y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}

fn rgb_to_i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}

fn rgb_to_q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}

fn faded_gray(px: &Rgba<u8>) -> Rgba<u8> {
    let (r, g, b) = blend_white(px);
    let y = rgb_to_y(r, g, b);
    let value = (255.0 + (y - 255.0) * DIFF_FADE_ALPHA).clamp(0.0, 255.0) as u8;
    Rgba([value, value, value, 255])
}
