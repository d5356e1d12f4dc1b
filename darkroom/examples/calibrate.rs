//! Example: Calibrate a night of FITS frames.
//!
//! Loads every `.fit`/`.fits` file in a directory (lazily), builds master
//! darks and flats, subtracts the master dark and cleans cosmic rays from the
//! object frames. Frames are classified by their `IMAGETYP` header.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p darkroom --features fits --example calibrate -- /path/to/night [config.yaml]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use darkroom::prelude::*;

fn main() -> anyhow::Result<()> {
    common::log_setup::setup_logging("info")?;

    let mut args = std::env::args().skip(1);
    let Some(frames_dir) = args.next().map(PathBuf::from) else {
        bail!("usage: calibrate <frames dir> [config.yaml|config.json]");
    };
    let config = match args.next() {
        Some(path) => CalibrationConfig::from_file(&path)
            .with_context(|| format!("Failed to load config '{path}'"))?,
        None => CalibrationConfig::default(),
    };
    tracing::info!(?config, "Configuration");

    let paths = fits_files(&frames_dir)?;
    if paths.is_empty() {
        bail!("No FITS files found in '{}'", frames_dir.display());
    }

    let start = Instant::now();
    let set = FrameSet::load_paths(Arc::new(FitsLoader::default()), paths, true)?;
    tracing::info!(%set, "Frames loaded");

    let pipeline = CalibrationPipeline::new(config, Arc::new(LaCosmic));
    let calibrated = pipeline.run(&set)?;

    for frame in calibrated.iter() {
        tracing::info!(
            frame_type = ?frame.frame_type(),
            shape = ?frame.shape()?,
            sources = frame.source_ids().len(),
            "Output frame"
        );
    }
    tracing::info!(elapsed = ?start.elapsed(), %calibrated, "Calibration finished");

    Ok(())
}

fn fits_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Reading '{}'", dir.display()))? {
        let path = entry?.path();
        let is_fits = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("fits") || ext.eq_ignore_ascii_case("fit"));
        if is_fits {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
