//! Testing utilities for darkroom.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cosmic_ray::{CosmicRayConfig, CosmicRayDetector, CosmicRayResult};
use crate::error::DetectionError;
use crate::header::Header;
use crate::keywords;
use crate::pixels::Pixels;
use crate::Frame;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Header with `IMAGETYP` and `FILENAME` set.
pub fn header(name: &str, imagetyp: &str) -> Header {
    Header::new()
        .with(keywords::IMAGETYP, imagetyp)
        .with(keywords::FILENAME, name)
}

/// In-memory frame filled with a constant value.
pub fn constant_frame(name: &str, imagetyp: &str, width: usize, height: usize, value: f32) -> Frame {
    Frame::new(header(name, imagetyp), Pixels::new_filled(width, height, value))
}

/// In-memory frame with the given row-major pixel values on a `width`-wide grid.
pub fn frame_with_pixels(name: &str, imagetyp: &str, width: usize, data: Vec<f32>) -> Frame {
    let height = data.len() / width;
    let pixels = Pixels::new(width, height, data).expect("test pixel data must be rectangular");
    Frame::new(header(name, imagetyp), pixels)
}

enum FakeBehavior {
    ClipAbove { threshold: f32, fill: f32 },
    Fail(String),
}

/// Stand-in detector: flags pixels above a threshold and replaces them, or
/// always fails.
pub struct FakeDetector {
    behavior: FakeBehavior,
    calls: AtomicUsize,
}

impl FakeDetector {
    pub fn clip_above(threshold: f32, fill: f32) -> Self {
        Self {
            behavior: FakeBehavior::ClipAbove { threshold, fill },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            behavior: FakeBehavior::Fail(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CosmicRayDetector for FakeDetector {
    fn detect(
        &self,
        pixels: &Pixels,
        _config: &CosmicRayConfig,
    ) -> Result<CosmicRayResult, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            FakeBehavior::ClipAbove { threshold, fill } => {
                let mask: Vec<bool> = pixels.iter().map(|&v| v > *threshold).collect();
                let cleaned = Pixels::from_fn(pixels.width(), pixels.height(), |x, y| {
                    let v = pixels.get(x, y);
                    if v > *threshold { *fill } else { v }
                });
                Ok(CosmicRayResult { mask, cleaned })
            }
            FakeBehavior::Fail(reason) => Err(DetectionError::new(reason.clone())),
        }
    }
}
