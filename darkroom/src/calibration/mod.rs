//! Calibration operations and the transforms built from them.
//!
//! The per-frame operations ([`combine_median`], [`subtract`],
//! [`clean_cosmic_rays`]) work on frames directly. The set-level operations
//! wrap them in [`PartitionTransform`]s.

mod pipeline;

#[cfg(test)]
mod tests;

pub use pipeline::CalibrationPipeline;

use std::sync::Arc;

use crate::config::CalibrationConfig;
use crate::cosmic_ray::{CosmicRayConfig, CosmicRayDetector};
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameRef};
use crate::frame_set::FrameSet;
use crate::frame_type::FrameType;
use crate::header::HeaderValue;
use crate::keywords;
use crate::math::median_f32_mut;
use crate::pixels::Pixels;
use crate::transform::{PartitionTransform, TypeFilter};

/// Frame counts up to this are combined with a stack buffer per pixel.
const MAX_STACK_FRAMES: usize = 256;

/// Per-pixel median of `frames`, tagged as `frame_type`.
///
/// The header is the first frame's with `IMAGETYP` set to `frame_type`,
/// `SOURCES` listing the source ids of every input and `NCOMBINE` the input count.
pub fn combine_median(frames: &[FrameRef], frame_type: FrameType) -> Result<Frame> {
    let first = frames.first().ok_or(Error::Arity {
        operation: "combine_median",
        required: 1,
        actual: 0,
    })?;

    let planes = frames
        .iter()
        .map(|frame| frame.pixels())
        .collect::<Result<Vec<&Pixels>>>()?;
    let reference = planes[0];
    for plane in &planes[1..] {
        reference.ensure_same_shape(plane, "combine_median")?;
    }

    let (width, height) = reference.shape();
    let frame_count = planes.len();
    let mut data = vec![0.0f32; width * height];
    common::parallel::parallel_chunked(&mut data, |pixel_idx| {
        if frame_count <= MAX_STACK_FRAMES {
            let mut values = [0.0f32; MAX_STACK_FRAMES];
            for (value, plane) in values.iter_mut().zip(&planes) {
                *value = plane.as_slice()[pixel_idx];
            }
            median_f32_mut(&mut values[..frame_count])
        } else {
            let mut values: Vec<f32> = planes.iter().map(|p| p.as_slice()[pixel_idx]).collect();
            median_f32_mut(&mut values)
        }
    });

    let sources: Vec<String> = frames.iter().flat_map(|frame| frame.source_ids()).collect();
    tracing::info!(
        frame_type = %frame_type,
        frames = frame_count,
        width,
        height,
        "Combined frames by median"
    );

    Ok(first.derive(
        [
            (keywords::IMAGETYP, frame_type.header_value()),
            (keywords::SOURCES, HeaderValue::from(sources)),
            (keywords::NCOMBINE, HeaderValue::from(frame_count)),
        ],
        Pixels::new(width, height, data)?,
    ))
}

/// `image - reference`, with `image`'s header plus `SUBSRCS` naming the
/// reference's sources and `SUBTRACT = T`.
pub fn subtract(image: &Frame, reference: &Frame) -> Result<Frame> {
    let pixels = image.pixels()?.subtract(reference.pixels()?)?;
    Ok(image.derive(
        [
            (keywords::SUBSRCS, HeaderValue::from(reference.source_ids())),
            (keywords::SUBTRACT, HeaderValue::from(true)),
        ],
        pixels,
    ))
}

/// Subtracts the set's master dark from every object and master flat frame.
///
/// Fails with [`Error::AmbiguousReference`] when the set holds more than one
/// master dark. Without one the set is returned as is.
pub fn apply_dark_subtraction(set: &FrameSet) -> Result<FrameSet> {
    dark_subtraction(set, false)
}

fn dark_subtraction(set: &FrameSet, parallel: bool) -> Result<FrameSet> {
    let Some(dark) = set.one_of_type(FrameType::MasterDark)? else {
        tracing::warn!("No master dark in set, skipping dark subtraction");
        return Ok(set.clone());
    };

    let transform = PartitionTransform::new(move |frames: &[FrameRef]| {
        frames
            .iter()
            .map(|frame| subtract(frame, &dark))
            .collect::<Result<Vec<Frame>>>()
    })
    .with_filter(TypeFilter::any_of([FrameType::Object, FrameType::MasterFlat]));

    run(&transform, set, parallel)
}

/// Median-combines dark frames into master darks, one per distinct value of
/// `config.master_dark_keys`. Other frames pass through.
pub fn build_master_darks(set: &FrameSet, config: &CalibrationConfig) -> Result<FrameSet> {
    let transform = master_transform(FrameType::Dark, FrameType::MasterDark, &config.master_dark_keys);
    run(&transform, set, config.parallel)
}

/// Median-combines flat frames into master flats, one per distinct value of
/// `config.master_flat_keys`. Other frames pass through.
pub fn build_master_flats(set: &FrameSet, config: &CalibrationConfig) -> Result<FrameSet> {
    let transform = master_transform(FrameType::Flat, FrameType::MasterFlat, &config.master_flat_keys);
    run(&transform, set, config.parallel)
}

fn master_transform(input: FrameType, output: FrameType, keys: &[String]) -> PartitionTransform {
    PartitionTransform::new(move |frames: &[FrameRef]| combine_median(frames, output))
        .with_filter(TypeFilter::any_of([input]))
        .partition_by(keys.iter().cloned())
}

/// Replaces `frame`'s pixels with the detector's cleaned output and marks the
/// header with `CRCLEAN = T` and the number of flagged pixels in `CRCOUNT`.
pub fn clean_cosmic_rays(
    frame: &Frame,
    detector: &dyn CosmicRayDetector,
    config: &CosmicRayConfig,
) -> Result<Frame> {
    let result = detector.detect(frame.pixels()?, config)?;
    let count = result.count();
    tracing::debug!(count, sources = ?frame.source_ids(), "Cleaned cosmic rays");

    Ok(frame.derive(
        [
            (keywords::CRCLEAN, HeaderValue::from(true)),
            (keywords::CRCOUNT, HeaderValue::from(count)),
        ],
        result.cleaned,
    ))
}

/// Runs [`clean_cosmic_rays`] on every object frame, one detector call per frame.
pub fn clean_all_cosmic_rays(
    set: &FrameSet,
    detector: Arc<dyn CosmicRayDetector>,
    config: &CalibrationConfig,
) -> Result<FrameSet> {
    let cosmic_ray = config.cosmic_ray.clone();
    let transform = PartitionTransform::new(move |frames: &[FrameRef]| {
        frames
            .iter()
            .map(|frame| clean_cosmic_rays(frame, detector.as_ref(), &cosmic_ray))
            .collect::<Result<Vec<Frame>>>()
    })
    .with_filter(TypeFilter::any_of([FrameType::Object]));

    run(&transform, set, config.parallel)
}

fn run(transform: &PartitionTransform, set: &FrameSet, parallel: bool) -> Result<FrameSet> {
    if parallel {
        transform.apply_par(set)
    } else {
        transform.apply(set)
    }
}
