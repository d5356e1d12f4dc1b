//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use darkroom::prelude::*;
//! ```

// Frames
pub use crate::{Frame, FrameRef, FrameSet, FrameType, Header, HeaderValue, Pixels};

// Transforms
pub use crate::{FrameFilter, PartitionTransform, TypeFilter};

// Calibration
pub use crate::{
    CalibrationConfig, CalibrationPipeline, CosmicRayConfig, CosmicRayDetector, LaCosmic,
};

// Loading
#[cfg(feature = "fits")]
pub use crate::FitsLoader;
pub use crate::{FrameLoader, MemoryLoader};

pub use crate::frame_set;
