//! Property-based tests for the partition transform and median combination.
//!
//! Run with ProptestConfig::with_cases(64); frames are tiny, so each case is cheap.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use darkroom::{
    combine_median, Frame, FrameRef, FrameSet, FrameType, Header, HeaderValue, PartitionTransform,
    Pixels, Result, TypeFilter,
};
use proptest::prelude::*;

const TYPES: &[&str] = &["object", "flat", "dark", "bias", "masterflat", "masterdark"];
const FILTERS: &[&str] = &["R", "G", "B"];

// ============================================================================
// Generators
// ============================================================================

/// Frame set with random IMAGETYP/FILTER combinations; pixel values encode the
/// input position so outputs can be traced back.
fn arb_frame_set(max_len: usize) -> impl Strategy<Value = FrameSet> {
    proptest::collection::vec((0..TYPES.len(), 0..FILTERS.len(), any::<bool>()), 0..max_len).prop_map(
        |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (type_idx, filter_idx, has_filter))| {
                    let mut header = Header::new()
                        .with("IMAGETYP", TYPES[type_idx])
                        .with("FILENAME", format!("frame_{i}.fits"));
                    if has_filter {
                        header = header.with("FILTER", FILTERS[filter_idx]);
                    }
                    Frame::new(header, Pixels::new_filled(2, 2, i as f32))
                })
                .collect()
        },
    )
}

fn passthrough(frames: &[FrameRef]) -> Result<Vec<FrameRef>> {
    Ok(frames.to_vec())
}

fn addresses(set: &FrameSet) -> Vec<usize> {
    set.iter().map(|frame| Arc::as_ptr(frame) as usize).collect()
}

fn sorted(mut values: Vec<usize>) -> Vec<usize> {
    values.sort_unstable();
    values
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every input frame reaches the output exactly once when the
    /// aggregate hands its bucket back.
    #[test]
    fn prop_partition_is_complete(set in arb_frame_set(24)) {
        let transform = PartitionTransform::new(passthrough)
            .with_filter(TypeFilter::any_of([FrameType::Flat, FrameType::Object]))
            .partition_by(["IMAGETYP", "FILTER"]);

        let result = transform.apply(&set).unwrap();

        prop_assert_eq!(sorted(addresses(&result)), sorted(addresses(&set)));
    }

    /// Property: buckets hold frames with equal key values, and the aggregate
    /// runs once per distinct value tuple.
    #[test]
    fn prop_buckets_are_homogeneous(set in arb_frame_set(24)) {
        let transform = PartitionTransform::new(passthrough).partition_by(["IMAGETYP", "FILTER"]);

        let partition = transform.partition(&set);

        let describe = |frame: &FrameRef| -> (Option<String>, Option<String>) {
            (
                frame.get("IMAGETYP").map(HeaderValue::to_string),
                frame.get("FILTER").map(HeaderValue::to_string),
            )
        };
        let distinct: HashSet<_> = set.iter().map(describe).collect();
        prop_assert_eq!(partition.buckets.len(), distinct.len());
        prop_assert!(partition.excluded.is_empty());
        for bucket in &partition.buckets {
            let first = describe(&bucket[0]);
            prop_assert!(bucket.iter().all(|frame| describe(frame) == first));
        }
    }

    /// Property: repeated and parallel application produce the same order.
    #[test]
    fn prop_apply_is_deterministic(set in arb_frame_set(24)) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let transform = PartitionTransform::new(move |frames: &[FrameRef]| -> Result<Vec<FrameRef>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(frames.iter().rev().cloned().collect())
        })
        .partition_by(["FILTER"]);

        let first = transform.apply(&set).unwrap();
        let second = transform.apply(&set).unwrap();
        let parallel = transform.apply_par(&set).unwrap();

        prop_assert!(first.same_frames(&second));
        prop_assert!(first.same_frames(&parallel));
        prop_assert_eq!(calls.load(Ordering::SeqCst), 3 * transform.partition(&set).buckets.len());
    }

    /// Property: a filter that rejects everything returns the input unchanged.
    #[test]
    fn prop_rejecting_filter_is_identity(set in arb_frame_set(24)) {
        let transform = PartitionTransform::new(passthrough)
            .with_filter(|_: &Frame| false)
            .partition_by(["IMAGETYP"]);

        let result = transform.apply(&set).unwrap();

        prop_assert!(result.same_frames(&set));
    }

    /// Property: excluded frames keep their relative order after the outputs.
    #[test]
    fn prop_excluded_frames_trail_in_order(set in arb_frame_set(24)) {
        let filter = TypeFilter::any_of([FrameType::Dark]);
        let transform = PartitionTransform::new(passthrough)
            .with_filter(filter)
            .partition_by(["IMAGETYP"]);

        let result = transform.apply(&set).unwrap();

        let darks = set.of_type(FrameType::Dark).len();
        let rest: Vec<usize> = set
            .iter()
            .filter(|frame| frame.frame_type() != Some(FrameType::Dark))
            .map(|frame| Arc::as_ptr(frame) as usize)
            .collect();
        let output = addresses(&result);
        prop_assert_eq!(&output[darks..], rest.as_slice());
    }

    /// Property: every median pixel lies within the input range and a stack
    /// of identical frames reproduces them.
    #[test]
    fn prop_median_is_bounded(
        values in proptest::collection::vec(proptest::collection::vec(-1.0e4f32..1.0e4, 6), 1..9)
    ) {
        let frames: Vec<FrameRef> = values
            .iter()
            .enumerate()
            .map(|(i, data)| {
                let header = Header::new().with("FILENAME", format!("f{i}"));
                Arc::new(Frame::new(header, Pixels::new(3, 2, data.clone()).unwrap()))
            })
            .collect();

        let master = combine_median(&frames, FrameType::MasterFlat).unwrap();
        let pixels = master.pixels().unwrap();

        for idx in 0..6 {
            let min = values.iter().map(|v| v[idx]).fold(f32::INFINITY, f32::min);
            let max = values.iter().map(|v| v[idx]).fold(f32::NEG_INFINITY, f32::max);
            let median = pixels.as_slice()[idx];
            prop_assert!(median >= min && median <= max);
        }

        let repeated: Vec<FrameRef> = (0..3).map(|_| Arc::clone(&frames[0])).collect();
        let same = combine_median(&repeated, FrameType::MasterFlat).unwrap();
        prop_assert_eq!(same.pixels().unwrap().as_slice(), frames[0].pixels().unwrap().as_slice());
    }
}
