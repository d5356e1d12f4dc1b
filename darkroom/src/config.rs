//! Calibration run configuration.

use std::path::Path;

use serde::Deserialize;

use crate::cosmic_ray::CosmicRayConfig;
use crate::error::Result;
use crate::keywords;

/// Settings for [`CalibrationPipeline`](crate::CalibrationPipeline) and the
/// master frame builders.
///
/// Every field has a default, so a config file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Header keys darks are grouped by; one master dark per distinct value tuple.
    pub master_dark_keys: Vec<String>,
    /// Header keys flats are grouped by; one master flat per distinct value tuple.
    pub master_flat_keys: Vec<String>,
    /// Run cosmic ray cleaning on object frames after dark subtraction.
    pub clean_cosmic_rays: bool,
    pub cosmic_ray: CosmicRayConfig,
    /// Aggregate buckets on the rayon pool.
    pub parallel: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            master_dark_keys: vec![keywords::IMAGETYP.to_string()],
            master_flat_keys: vec![keywords::IMAGETYP.to_string(), "FILTER".to_string()],
            clean_cosmic_rays: true,
            cosmic_ray: CosmicRayConfig::default(),
            parallel: true,
        }
    }
}

impl CalibrationConfig {
    /// Loads a YAML (`.yaml`/`.yml`) or JSON (`.json`) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = common::deserialize_file(path.as_ref())?;
        config.cosmic_ray.validate()?;
        Ok(config)
    }
}
