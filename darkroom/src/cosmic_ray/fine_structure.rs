//! Median filtering and the fine structure image.
//!
//! The fine structure `m3 - m7` (3x3 median, then a 7x7 median of that)
//! is large for resolved sources whose cores are a few pixels wide and close
//! to zero for single-pixel hits. Comparing it with the Laplacian separates
//! the two.

use rayon::prelude::*;

use crate::math::median_f32_mut;

/// Median over a `(2 * radius + 1)` square window, truncated at the borders.
pub(super) fn median_filter(pixels: &[f32], width: usize, height: usize, radius: usize) -> Vec<f32> {
    debug_assert_eq!(pixels.len(), width * height);

    let side = 2 * radius + 1;
    let mut filtered = vec![0.0f32; pixels.len()];
    filtered
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let mut window = Vec::with_capacity(side * side);
            let y0 = y.saturating_sub(radius);
            let y1 = (y + radius).min(height - 1);

            for (x, out) in row.iter_mut().enumerate() {
                let x0 = x.saturating_sub(radius);
                let x1 = (x + radius).min(width - 1);

                window.clear();
                for ny in y0..=y1 {
                    window.extend_from_slice(&pixels[ny * width + x0..=ny * width + x1]);
                }
                *out = median_f32_mut(&mut window);
            }
        });

    filtered
}

/// `median3(pixels) - median7(median3(pixels))`.
pub(super) fn fine_structure(pixels: &[f32], width: usize, height: usize) -> Vec<f32> {
    let m3 = median_filter(pixels, width, height, 1);
    let m7 = median_filter(&m3, width, height, 3);
    m3.iter().zip(m7.iter()).map(|(&a, &b)| a - b).collect()
}
