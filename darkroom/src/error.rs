//! Error types for frame loading and calibration.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur when reading a frame from its backing storage.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load FITS file '{path}': {reason}")]
    Fits { path: PathBuf, reason: String },

    #[error("No frame stored at '{path}'")]
    NotFound { path: PathBuf },

    #[error("Frame has neither pixel data nor a source to load it from")]
    NoSource,
}

/// Failure reported by a cosmic ray detector.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct DetectionError {
    pub reason: String,
}

impl DetectionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by frame, transform and calibration operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{operation} requires at least {required} frame(s), got {actual}")]
    Arity {
        operation: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Shape mismatch in {operation}: expected {expected:?}, got {actual:?}")]
    Shape {
        operation: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Expected at most one frame matching {criteria}, found {count}")]
    AmbiguousReference { criteria: String, count: usize },

    #[error("Cosmic ray detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Failed to read configuration: {0}")]
    Config(#[from] common::SerdeFormatError),
}
