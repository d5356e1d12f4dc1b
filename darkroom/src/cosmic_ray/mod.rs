//! Cosmic ray detection.
//!
//! Detection is pluggable through [`CosmicRayDetector`]. The built-in
//! [`LaCosmic`] follows van Dokkum 2001, PASP 113, 1420:
//! "Cosmic-Ray Rejection by Laplacian Edge Detection".
//!
//! One pass of the algorithm:
//! 1. Laplacian edge response, normalized by a Poisson + read noise model
//!    taken from a 5x5 median of the frame
//! 2. Large scale structure of that significance image removed with a
//!    second 5x5 median
//! 3. Candidates exceed `sig_clip` and out-contrast the fine structure
//!    image by `obj_lim`, which keeps stars out
//! 4. Detections grow into neighbours above `sig_clip`, then into
//!    neighbours above `sig_clip * sig_frac`
//! 5. Flagged pixels are replaced by the median of unflagged 5x5 neighbours
//!
//! Passes repeat until nothing new is found or `max_iter` is reached.

mod config;
mod fine_structure;
mod laplacian;


pub use config::CosmicRayConfig;

use crate::error::DetectionError;
use crate::math::median_f32_mut;
use crate::pixels::Pixels;
use fine_structure::{fine_structure, median_filter};
use laplacian::{laplacian_response, LAPLACIAN_NOISE_SCALE};

/// Smallest frame side the 3x3 kernels can work on.
const MIN_FRAME_SIDE: usize = 3;

/// Floor of the fine structure contrast, as in the reference algorithm.
const MIN_FINE_STRUCTURE: f32 = 0.01;

/// Floor of the per-pixel noise estimate in electrons.
const MIN_NOISE: f32 = 1e-3;

/// Half-width of the window used for noise estimation and replacement.
const REPLACE_RADIUS: usize = 2;

/// Finds and repairs cosmic ray hits in a single frame.
///
/// Implementations must not modify their input.
pub trait CosmicRayDetector: Send + Sync {
    fn detect(
        &self,
        pixels: &Pixels,
        config: &CosmicRayConfig,
    ) -> Result<CosmicRayResult, DetectionError>;
}

/// Output of a detector run.
#[derive(Debug, Clone)]
pub struct CosmicRayResult {
    /// Row-major, `true` for pixels identified as cosmic rays.
    pub mask: Vec<bool>,
    /// Input with flagged pixels replaced.
    pub cleaned: Pixels,
}

impl CosmicRayResult {
    /// Number of flagged pixels.
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&flagged| flagged).count()
    }
}

/// Built-in L.A.Cosmic detector.
#[derive(Debug, Default, Clone, Copy)]
pub struct LaCosmic;

impl CosmicRayDetector for LaCosmic {
    fn detect(
        &self,
        pixels: &Pixels,
        config: &CosmicRayConfig,
    ) -> Result<CosmicRayResult, DetectionError> {
        config.validate()?;

        let (width, height) = pixels.shape();
        if width < MIN_FRAME_SIDE || height < MIN_FRAME_SIDE {
            return Err(DetectionError::new(format!(
                "frame of {width}x{height} is smaller than {MIN_FRAME_SIDE}x{MIN_FRAME_SIDE}"
            )));
        }

        let mut data = pixels.as_slice().to_vec();
        let mut mask = vec![false; data.len()];

        for iteration in 0..config.max_iter {
            let found = detection_pass(&data, &mask, width, height, config);
            tracing::debug!(iteration, found = found.len(), "L.A.Cosmic pass");
            if found.is_empty() {
                break;
            }
            for idx in found {
                mask[idx] = true;
            }
            replace_flagged(&mut data, &mask, width, height);
        }

        let cleaned = Pixels::from_fn(width, height, |x, y| data[y * width + x]);
        Ok(CosmicRayResult { mask, cleaned })
    }
}

/// Indices of pixels newly identified in this pass.
fn detection_pass(
    data: &[f32],
    mask: &[bool],
    width: usize,
    height: usize,
    config: &CosmicRayConfig,
) -> Vec<usize> {
    let gain = config.gain;
    let readnoise_sq = config.readnoise * config.readnoise;

    let noise: Vec<f32> = median_filter(data, width, height, REPLACE_RADIUS)
        .into_iter()
        .map(|m| ((m * gain).max(0.0) + readnoise_sq).sqrt().max(MIN_NOISE))
        .collect();

    let significance: Vec<f32> = laplacian_response(data, width, height)
        .into_iter()
        .zip(noise.iter())
        .map(|(lap, &n)| lap * gain / (n * LAPLACIAN_NOISE_SCALE))
        .collect();
    let background = median_filter(&significance, width, height, REPLACE_RADIUS);
    let sprime: Vec<f32> = significance
        .iter()
        .zip(background.iter())
        .map(|(&s, &b)| s - b)
        .collect();

    let fine = fine_structure(data, width, height);

    let mut flagged: Vec<bool> = (0..data.len())
        .map(|i| {
            let contrast = (fine[i] * gain / noise[i]).max(MIN_FINE_STRUCTURE);
            !mask[i] && sprime[i] > config.sig_clip && sprime[i] / contrast > config.obj_lim
        })
        .collect();

    grow(&mut flagged, &sprime, width, height, config.sig_clip);
    grow(
        &mut flagged,
        &sprime,
        width,
        height,
        config.sig_clip * config.sig_frac,
    );

    flagged
        .iter()
        .enumerate()
        .filter(|&(i, &f)| f && !mask[i])
        .map(|(i, _)| i)
        .collect()
}

/// Flags 8-connected neighbours of flagged pixels whose significance exceeds `threshold`.
fn grow(flagged: &mut [bool], sprime: &[f32], width: usize, height: usize, threshold: f32) {
    let seeds: Vec<usize> = flagged
        .iter()
        .enumerate()
        .filter(|&(_, &f)| f)
        .map(|(i, _)| i)
        .collect();

    for idx in seeds {
        let (x, y) = (idx % width, idx / width);
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                let n = ny * width + nx;
                if sprime[n] > threshold {
                    flagged[n] = true;
                }
            }
        }
    }
}

/// Replaces every masked pixel with the median of the unmasked pixels in its
/// 5x5 window. Pixels with no unmasked neighbours keep their value.
fn replace_flagged(data: &mut [f32], mask: &[bool], width: usize, height: usize) {
    let mut window = Vec::with_capacity((2 * REPLACE_RADIUS + 1).pow(2));

    for idx in 0..data.len() {
        if !mask[idx] {
            continue;
        }
        let (x, y) = (idx % width, idx / width);

        window.clear();
        for ny in y.saturating_sub(REPLACE_RADIUS)..=(y + REPLACE_RADIUS).min(height - 1) {
            for nx in x.saturating_sub(REPLACE_RADIUS)..=(x + REPLACE_RADIUS).min(width - 1) {
                let n = ny * width + nx;
                if !mask[n] {
                    window.push(data[n]);
                }
            }
        }

        if !window.is_empty() {
            data[idx] = median_f32_mut(&mut window);
        }
    }
}
