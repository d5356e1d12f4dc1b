//! Darkroom - metadata-driven calibration of astronomical frames.
//!
//! Frames carry a FITS-style header and lazily loaded pixel data. Calibration
//! steps are expressed as [`PartitionTransform`]s over a [`FrameSet`]:
//! filter the frames a step applies to, group them by header values,
//! aggregate each group, pass everything else through.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use darkroom::prelude::*;
//!
//! let set = FrameSet::load_paths(Arc::new(FitsLoader::default()), paths, true)?;
//! let calibrated = CalibrationPipeline::default().run(&set)?;
//!
//! for frame in calibrated.of_type(FrameType::Object).iter() {
//!     println!("{:?}", frame.source_ids());
//! }
//! ```

mod calibration;
mod config;
mod cosmic_ray;
mod error;
mod frame;
mod frame_set;
mod frame_type;
mod header;
pub mod keywords;
pub mod loader;
pub(crate) mod math;
mod pixels;
mod transform;

#[cfg(test)]
pub mod testing;

pub mod prelude;

// ============================================================================
// Frames and sets
// ============================================================================

pub use frame::{Frame, FrameRef};
pub use frame_set::{FrameSet, IntoFrames};
pub use frame_type::FrameType;
pub use header::{Header, HeaderValue};
pub use pixels::Pixels;

// ============================================================================
// Transforms
// ============================================================================

pub use transform::{Aggregate, FrameFilter, Partition, PartitionTransform, TypeFilter};

// ============================================================================
// Calibration
// ============================================================================

pub use calibration::{
    apply_dark_subtraction, build_master_darks, build_master_flats, clean_all_cosmic_rays,
    clean_cosmic_rays, combine_median, subtract, CalibrationPipeline,
};
pub use config::CalibrationConfig;
pub use cosmic_ray::{CosmicRayConfig, CosmicRayDetector, CosmicRayResult, LaCosmic};

// ============================================================================
// Loading and errors
// ============================================================================

pub use error::{DetectionError, Error, LoadError, Result};
#[cfg(feature = "fits")]
pub use loader::FitsLoader;
pub use loader::{FrameLoader, FrameSource, MemoryLoader};
