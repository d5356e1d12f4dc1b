//! Header keywords read or written by the calibration operations.

/// Frame type tag, see [`FrameType`](crate::FrameType).
pub const IMAGETYP: &str = "IMAGETYP";
/// Original file name, used as a source identifier for in-memory frames.
pub const FILENAME: &str = "FILENAME";
/// Source identifiers of every frame combined into a master.
pub const SOURCES: &str = "SOURCES";
/// Number of frames combined into a master.
pub const NCOMBINE: &str = "NCOMBINE";
/// Source identifiers of the frame subtracted from this one.
pub const SUBSRCS: &str = "SUBSRCS";
/// Set once a reference frame has been subtracted.
pub const SUBTRACT: &str = "SUBTRACT";
/// Set once cosmic rays have been cleaned.
pub const CRCLEAN: &str = "CRCLEAN";
/// Number of pixels replaced by cosmic ray cleaning.
pub const CRCOUNT: &str = "CRCOUNT";
