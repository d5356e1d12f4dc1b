use serde::Deserialize;

use crate::error::DetectionError;

/// Cosmic ray detection parameters.
///
/// Names and defaults follow the usual L.A.Cosmic conventions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CosmicRayConfig {
    /// Maximum number of detect-and-replace passes.
    pub max_iter: u32,
    /// Laplacian significance (sigma) a pixel must exceed to be a candidate.
    pub sig_clip: f32,
    /// Fraction of `sig_clip` used when growing detections into neighbours.
    pub sig_frac: f32,
    /// Minimum contrast between the Laplacian and the fine structure image.
    /// Protects compact but resolved sources such as stars.
    pub obj_lim: f32,
    /// Read noise in electrons.
    pub readnoise: f32,
    /// Gain in electrons per ADU.
    pub gain: f32,
}

impl Default for CosmicRayConfig {
    fn default() -> Self {
        Self {
            max_iter: 3,
            sig_clip: 5.0,
            sig_frac: 0.3,
            obj_lim: 5.0,
            readnoise: 10.0,
            gain: 2.2,
        }
    }
}

impl CosmicRayConfig {
    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.max_iter == 0 {
            return Err(DetectionError::new("max_iter must be at least 1"));
        }
        if !(self.sig_clip > 0.0) {
            return Err(DetectionError::new(format!(
                "sig_clip must be positive, got {}",
                self.sig_clip
            )));
        }
        if !(self.gain > 0.0) {
            return Err(DetectionError::new(format!(
                "gain must be positive, got {}",
                self.gain
            )));
        }
        if self.readnoise < 0.0 {
            return Err(DetectionError::new(format!(
                "readnoise must not be negative, got {}",
                self.readnoise
            )));
        }
        Ok(())
    }
}
