use std::sync::Arc;

use crate::config::CalibrationConfig;
use crate::cosmic_ray::{CosmicRayDetector, LaCosmic};
use crate::error::Result;
use crate::frame_set::FrameSet;

/// Standard calibration run over a mixed set of raw frames.
///
/// Stages, in order:
/// 1. darks → master darks
/// 2. flats → master flats
/// 3. master dark subtracted from object frames and master flats
/// 4. cosmic ray cleaning of object frames (if enabled)
///
/// Frames no stage applies to come out unchanged.
#[derive(Clone)]
pub struct CalibrationPipeline {
    pub config: CalibrationConfig,
    pub detector: Arc<dyn CosmicRayDetector>,
}

impl CalibrationPipeline {
    pub fn new(config: CalibrationConfig, detector: Arc<dyn CosmicRayDetector>) -> Self {
        Self { config, detector }
    }

    pub fn run(&self, set: &FrameSet) -> Result<FrameSet> {
        tracing::info!(frames = set.len(), "Calibration started");

        let set = super::build_master_darks(set, &self.config)?;
        tracing::info!(frames = set.len(), "Master darks built");

        let set = super::build_master_flats(&set, &self.config)?;
        tracing::info!(frames = set.len(), "Master flats built");

        let set = super::dark_subtraction(&set, self.config.parallel)?;
        tracing::info!(frames = set.len(), "Dark subtraction done");

        if !self.config.clean_cosmic_rays {
            return Ok(set);
        }

        let set = super::clean_all_cosmic_rays(&set, Arc::clone(&self.detector), &self.config)?;
        tracing::info!(frames = set.len(), "Cosmic ray cleaning done");

        Ok(set)
    }
}

impl Default for CalibrationPipeline {
    fn default() -> Self {
        Self::new(CalibrationConfig::default(), Arc::new(LaCosmic))
    }
}

impl std::fmt::Debug for CalibrationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
