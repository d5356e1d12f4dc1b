//! Laplacian edge response.
//!
//! Cosmic ray hits are sharper than anything the optics can deliver, so the
//! negative of the discrete Laplacian peaks on them much harder than on stars.

use rayon::prelude::*;

/// Standard deviation of the 5-point Laplacian of unit-variance white noise
/// (`sqrt(4^2 + 4 * 1^2)`).
pub(super) const LAPLACIAN_NOISE_SCALE: f32 = 4.472_136;

/// Positive part of `4 * center - (left + right + up + down)`.
///
/// Out-of-bounds neighbours are clamped to the center value.
pub(super) fn laplacian_response(pixels: &[f32], width: usize, height: usize) -> Vec<f32> {
    debug_assert_eq!(pixels.len(), width * height);

    let mut response = vec![0.0f32; pixels.len()];
    response
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let idx = y * width + x;
                let center = pixels[idx];
                let left = if x > 0 { pixels[idx - 1] } else { center };
                let right = if x + 1 < width {
                    pixels[idx + 1]
                } else {
                    center
                };
                let up = if y > 0 { pixels[idx - width] } else { center };
                let down = if y + 1 < height {
                    pixels[idx + width]
                } else {
                    center
                };

                *out = (4.0 * center - (left + right + up + down)).max(0.0);
            }
        });

    response
}
