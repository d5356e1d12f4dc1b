use std::sync::Arc;

use super::*;
use crate::frame_set;
use crate::loader::MemoryLoader;
use crate::testing::{constant_frame, frame_with_pixels, header, init_tracing, FakeDetector};

fn shared(frame: Frame) -> FrameRef {
    Arc::new(frame)
}

fn sequential() -> CalibrationConfig {
    CalibrationConfig {
        parallel: false,
        ..Default::default()
    }
}

fn flat(name: &str, filter: &str, value: f32) -> Frame {
    Frame::new(
        header(name, "flat").with("FILTER", filter),
        Pixels::new_filled(3, 2, value),
    )
}

fn str_list<'a>(frame: &'a Frame, key: &str) -> &'a [String] {
    frame.get(key).and_then(HeaderValue::as_str_list).unwrap()
}

// ============================================================================
// combine_median
// ============================================================================

#[test]
fn test_median_of_identical_frames() {
    let frames: Vec<FrameRef> = (0..3)
        .map(|i| shared(constant_frame(&format!("d{i}"), "dark", 4, 3, 0.75)))
        .collect();

    let master = combine_median(&frames, FrameType::MasterDark).unwrap();

    assert_eq!(master.shape().unwrap(), (4, 3));
    assert!(master.pixels().unwrap().iter().all(|&v| v == 0.75));
}

#[test]
fn test_median_odd_count() {
    let frames = vec![
        shared(frame_with_pixels("a", "flat", 2, vec![1.0, 30.0, 5.0, -1.0])),
        shared(frame_with_pixels("b", "flat", 2, vec![2.0, 10.0, 5.0, -3.0])),
        shared(frame_with_pixels("c", "flat", 2, vec![3.0, 20.0, 6.0, -2.0])),
    ];

    let master = combine_median(&frames, FrameType::MasterFlat).unwrap();

    assert_eq!(master.pixels().unwrap().as_slice(), &[2.0, 20.0, 5.0, -2.0]);
}

#[test]
fn test_median_even_count_averages_middle_values() {
    let frames: Vec<FrameRef> = [1.0, 2.0, 3.0, 10.0]
        .iter()
        .map(|&v| shared(constant_frame("f", "flat", 2, 2, v)))
        .collect();

    let master = combine_median(&frames, FrameType::MasterFlat).unwrap();

    assert!(master.pixels().unwrap().iter().all(|&v| v == 2.5));
}

#[test]
fn test_median_header_provenance() {
    let first = Frame::new(
        header("dark_1.fits", "dark").with("EXPTIME", 120.0),
        Pixels::new_filled(2, 2, 1.0),
    );
    let frames = vec![
        shared(first),
        shared(constant_frame("dark_2.fits", "dark", 2, 2, 1.0)),
        shared(constant_frame("dark_3.fits", "dark", 2, 2, 1.0)),
    ];

    let master = combine_median(&frames, FrameType::MasterDark).unwrap();

    assert_eq!(master.frame_type(), Some(FrameType::MasterDark));
    assert_eq!(
        str_list(&master, keywords::SOURCES),
        ["dark_1.fits", "dark_2.fits", "dark_3.fits"]
    );
    assert_eq!(
        master.get(keywords::NCOMBINE).and_then(HeaderValue::as_i64),
        Some(3)
    );
    assert_eq!(master.get("EXPTIME"), Some(&HeaderValue::Float(120.0)));
    // Inputs keep their own headers.
    assert_eq!(frames[0].frame_type(), Some(FrameType::Dark));
    assert!(!frames[0].header().contains_key(keywords::SOURCES));
}

#[test]
fn test_median_of_masters_flattens_sources() {
    let a = combine_median(
        &[shared(constant_frame("a1", "flat", 1, 1, 1.0)), shared(constant_frame("a2", "flat", 1, 1, 1.0))],
        FrameType::MasterFlat,
    )
    .unwrap();
    let b = constant_frame("b1", "flat", 1, 1, 1.0);

    let combined = combine_median(&[shared(a), shared(b)], FrameType::MasterFlat).unwrap();

    assert_eq!(str_list(&combined, keywords::SOURCES), ["a1", "a2", "b1"]);
}

#[test]
fn test_median_requires_frames() {
    let err = combine_median(&[], FrameType::MasterFlat).unwrap_err();
    assert!(matches!(
        err,
        Error::Arity {
            operation: "combine_median",
            required: 1,
            actual: 0
        }
    ));
}

#[test]
fn test_median_shape_mismatch() {
    let frames = vec![
        shared(constant_frame("a", "flat", 4, 4, 1.0)),
        shared(constant_frame("b", "flat", 4, 3, 1.0)),
    ];

    let err = combine_median(&frames, FrameType::MasterFlat).unwrap_err();

    assert!(matches!(
        err,
        Error::Shape {
            expected: (4, 4),
            actual: (4, 3),
            ..
        }
    ));
}

#[test]
fn test_median_loads_lazy_frames() {
    let loader = Arc::new(
        MemoryLoader::new()
            .with_frame("raw/d1.fits", header("d1", "dark"), Pixels::new_filled(2, 2, 4.0))
            .with_frame("raw/d2.fits", header("d2", "dark"), Pixels::new_filled(2, 2, 6.0)),
    );
    let set = FrameSet::load_paths(loader.clone(), ["raw/d1.fits", "raw/d2.fits"], true).unwrap();
    assert_eq!(loader.pixel_reads(), 0);

    let master = combine_median(set.frames(), FrameType::MasterDark).unwrap();

    assert_eq!(loader.pixel_reads(), 2);
    assert!(master.pixels().unwrap().iter().all(|&v| v == 5.0));
    assert_eq!(
        str_list(&master, keywords::SOURCES),
        ["raw/d1.fits", "raw/d2.fits"]
    );
}

// ============================================================================
// subtract
// ============================================================================

#[test]
fn test_subtract_single_frame_median_is_zero() {
    let x = shared(frame_with_pixels("x", "object", 3, vec![1.5, -2.0, 7.0, 0.0, 3.25, 9.0]));
    let master = combine_median(std::slice::from_ref(&x), FrameType::MasterDark).unwrap();

    let diff = subtract(&master, &x).unwrap();

    assert!(diff.pixels().unwrap().iter().all(|&v| v == 0.0));
}

#[test]
fn test_subtract_provenance() {
    let image = constant_frame("light_1.fits", "object", 2, 2, 10.0);
    let dark = combine_median(
        &[shared(constant_frame("d1", "dark", 2, 2, 3.0)), shared(constant_frame("d2", "dark", 2, 2, 3.0))],
        FrameType::MasterDark,
    )
    .unwrap();

    let result = subtract(&image, &dark).unwrap();

    assert!(result.pixels().unwrap().iter().all(|&v| v == 7.0));
    assert_eq!(str_list(&result, keywords::SUBSRCS), ["d1", "d2"]);
    assert_eq!(
        result.get(keywords::SUBTRACT).and_then(HeaderValue::as_bool),
        Some(true)
    );
    assert_eq!(result.frame_type(), Some(FrameType::Object));
    assert!(!image.header().contains_key(keywords::SUBTRACT));
    assert!(image.pixels().unwrap().iter().all(|&v| v == 10.0));
}

#[test]
fn test_subtract_shape_mismatch() {
    let image = constant_frame("light", "object", 2, 2, 1.0);
    let dark = constant_frame("dark", "masterdark", 3, 2, 1.0);

    let err = subtract(&image, &dark).unwrap_err();

    assert!(matches!(err, Error::Shape { .. }));
}

// ============================================================================
// apply_dark_subtraction
// ============================================================================

#[test]
fn test_dark_subtraction_dispatch() {
    init_tracing();

    let dark = shared(constant_frame("md", "masterdark", 2, 2, 1.0));
    let object = shared(constant_frame("obj", "object", 2, 2, 10.0));
    let mflat = shared(constant_frame("mf", "masterflat", 2, 2, 5.0));
    let bias = shared(constant_frame("bias", "bias", 2, 2, 3.0));
    let set = frame_set![&dark, &object, &mflat, &bias];

    let result = apply_dark_subtraction(&set).unwrap();

    assert_eq!(result.len(), 4);
    // Subtracted frames first, then the untouched ones in input order.
    assert_eq!(result[0].frame_type(), Some(FrameType::Object));
    assert!(result[0].pixels().unwrap().iter().all(|&v| v == 9.0));
    assert_eq!(result[1].frame_type(), Some(FrameType::MasterFlat));
    assert!(result[1].pixels().unwrap().iter().all(|&v| v == 4.0));
    for frame in [&result[0], &result[1]] {
        assert_eq!(str_list(frame, keywords::SUBSRCS), ["md"]);
    }
    assert!(Arc::ptr_eq(&result[2], &dark));
    assert!(Arc::ptr_eq(&result[3], &bias));
    assert!(!result[3].header().contains_key(keywords::SUBTRACT));
}

#[test]
fn test_dark_subtraction_rejects_two_master_darks() {
    let set = frame_set![
        constant_frame("md1", "masterdark", 2, 2, 1.0),
        constant_frame("md2", "masterdark", 2, 2, 2.0),
        constant_frame("obj", "object", 2, 2, 10.0),
    ];

    let err = apply_dark_subtraction(&set).unwrap_err();

    assert!(matches!(err, Error::AmbiguousReference { count: 2, .. }));
}

#[test]
fn test_dark_subtraction_finds_master_dark_regardless_of_case() {
    let set = frame_set![
        constant_frame("md", "MASTERDARK", 2, 2, 1.0),
        constant_frame("obj", "Object", 2, 2, 10.0),
    ];

    let result = apply_dark_subtraction(&set).unwrap();

    assert_eq!(result[0].frame_type(), Some(FrameType::Object));
    assert!(result[0].pixels().unwrap().iter().all(|&v| v == 9.0));
    assert_eq!(
        result[0].get(keywords::SUBTRACT).and_then(HeaderValue::as_bool),
        Some(true)
    );
}

#[test]
fn test_dark_subtraction_counts_master_darks_regardless_of_case() {
    let set = frame_set![
        constant_frame("md1", "masterdark", 2, 2, 1.0),
        constant_frame("md2", "MasterDark ", 2, 2, 2.0),
        constant_frame("obj", "object", 2, 2, 10.0),
    ];

    let err = apply_dark_subtraction(&set).unwrap_err();

    assert!(matches!(err, Error::AmbiguousReference { count: 2, .. }));
}

#[test]
fn test_dark_subtraction_without_dark_is_identity() {
    let set = frame_set![
        constant_frame("obj", "object", 2, 2, 10.0),
        constant_frame("mf", "masterflat", 2, 2, 5.0),
    ];

    let result = apply_dark_subtraction(&set).unwrap();

    assert!(result.same_frames(&set));
}

#[test]
fn test_dark_subtraction_shape_mismatch_fails_whole_set() {
    let set = frame_set![
        constant_frame("md", "masterdark", 2, 2, 1.0),
        constant_frame("obj1", "object", 2, 2, 10.0),
        constant_frame("obj2", "object", 4, 4, 10.0),
    ];

    assert!(matches!(
        apply_dark_subtraction(&set),
        Err(Error::Shape { .. })
    ));
}

// ============================================================================
// master builders
// ============================================================================

#[test]
fn test_build_master_darks_single_master() {
    let set = frame_set![
        constant_frame("d1", "dark", 2, 2, 1.0),
        constant_frame("obj", "object", 2, 2, 50.0),
        constant_frame("d2", "dark", 2, 2, 3.0),
        constant_frame("d3", "dark", 2, 2, 2.0),
    ];

    let result = build_master_darks(&set, &sequential()).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].frame_type(), Some(FrameType::MasterDark));
    assert!(result[0].pixels().unwrap().iter().all(|&v| v == 2.0));
    assert_eq!(str_list(&result[0], keywords::SOURCES), ["d1", "d2", "d3"]);
    assert!(Arc::ptr_eq(&result[1], &set[1]));
}

#[test]
fn test_build_master_darks_merges_tag_spellings() {
    let set = frame_set![
        constant_frame("d1", "dark", 2, 2, 1.0),
        constant_frame("d2", "DARK", 2, 2, 3.0),
        constant_frame("d3", " Dark", 2, 2, 2.0),
    ];

    let result = build_master_darks(&set, &sequential()).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].frame_type(), Some(FrameType::MasterDark));
    assert_eq!(str_list(&result[0], keywords::SOURCES), ["d1", "d2", "d3"]);
}

#[test]
fn test_pipeline_with_mixed_case_darks() {
    let set = frame_set![
        constant_frame("d1", "dark", 2, 2, 2.0),
        constant_frame("d2", "DARK", 2, 2, 2.0),
        constant_frame("light", "object", 2, 2, 20.0),
    ];
    let config = CalibrationConfig {
        clean_cosmic_rays: false,
        ..sequential()
    };

    let result = CalibrationPipeline::new(config, Arc::new(FakeDetector::clip_above(1e6, 0.0)))
        .run(&set)
        .unwrap();

    assert_eq!(result.of_type(FrameType::MasterDark).len(), 1);
    let lights = result.of_type(FrameType::Object);
    assert!(lights[0].pixels().unwrap().iter().all(|&v| v == 18.0));
}

#[test]
fn test_build_master_flats_per_filter() {
    let set = frame_set![
        flat("r1", "R", 10.0),
        flat("g1", "G", 20.0),
        constant_frame("obj", "object", 3, 2, 50.0),
        flat("r2", "R", 12.0),
    ];

    let result = build_master_flats(&set, &sequential()).unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result[0].get("FILTER"), Some(&HeaderValue::from("R")));
    assert!(result[0].pixels().unwrap().iter().all(|&v| v == 11.0));
    assert_eq!(str_list(&result[0], keywords::SOURCES), ["r1", "r2"]);
    assert_eq!(result[1].get("FILTER"), Some(&HeaderValue::from("G")));
    assert!(result[1].pixels().unwrap().iter().all(|&v| v == 20.0));
    assert_eq!(result[2].frame_type(), Some(FrameType::Object));
}

#[test]
fn test_build_master_flats_parallel_matches_sequential() {
    let set = frame_set![
        flat("r1", "R", 10.0),
        flat("g1", "G", 20.0),
        flat("b1", "B", 30.0),
        flat("r2", "R", 12.0),
        flat("g2", "G", 22.0),
    ];
    let parallel = CalibrationConfig {
        parallel: true,
        ..Default::default()
    };

    let seq = build_master_flats(&set, &sequential()).unwrap();
    let par = build_master_flats(&set, &parallel).unwrap();

    assert_eq!(seq.len(), par.len());
    for (a, b) in seq.iter().zip(par.iter()) {
        assert_eq!(a.header(), b.header());
        assert_eq!(a.pixels().unwrap(), b.pixels().unwrap());
    }
}

// ============================================================================
// cosmic rays
// ============================================================================

#[test]
fn test_clean_cosmic_rays_marks_header() {
    let frame = frame_with_pixels("light", "object", 2, vec![10.0, 900.0, 10.0, 800.0]);
    let detector = FakeDetector::clip_above(100.0, 10.0);

    let cleaned = clean_cosmic_rays(&frame, &detector, &CosmicRayConfig::default()).unwrap();

    assert!(cleaned.pixels().unwrap().iter().all(|&v| v == 10.0));
    assert_eq!(
        cleaned.get(keywords::CRCLEAN).and_then(HeaderValue::as_bool),
        Some(true)
    );
    assert_eq!(
        cleaned.get(keywords::CRCOUNT).and_then(HeaderValue::as_i64),
        Some(2)
    );
    assert_eq!(frame.pixels().unwrap().get(1, 0), 900.0);
}

#[test]
fn test_clean_cosmic_rays_detector_failure() {
    let frame = constant_frame("light", "object", 2, 2, 1.0);
    let detector = FakeDetector::failing("saturated readout");

    let err = clean_cosmic_rays(&frame, &detector, &CosmicRayConfig::default()).unwrap_err();

    assert!(matches!(err, Error::Detection(_)));
    assert!(err.to_string().contains("saturated readout"));
}

#[test]
fn test_clean_all_cosmic_rays_only_touches_objects() {
    let detector = Arc::new(FakeDetector::clip_above(100.0, 0.0));
    let set = frame_set![
        constant_frame("o1", "object", 2, 2, 500.0),
        constant_frame("mf", "masterflat", 2, 2, 500.0),
        constant_frame("o2", "object", 2, 2, 50.0),
    ];

    let result = clean_all_cosmic_rays(&set, detector.clone(), &sequential()).unwrap();

    assert_eq!(detector.calls(), 2);
    assert_eq!(result.len(), 3);
    assert!(result[0].pixels().unwrap().iter().all(|&v| v == 0.0));
    assert_eq!(
        result[1].get(keywords::CRCOUNT).and_then(HeaderValue::as_i64),
        Some(0)
    );
    assert!(Arc::ptr_eq(&result[2], &set[1]));
}

// ============================================================================
// pipeline
// ============================================================================

fn raw_session() -> FrameSet {
    frame_set![
        constant_frame("d1", "dark", 2, 2, 1.0),
        constant_frame("d2", "dark", 2, 2, 3.0),
        constant_frame("d3", "dark", 2, 2, 2.0),
        Frame::new(header("f1", "flat").with("FILTER", "R"), Pixels::new_filled(2, 2, 10.0)),
        Frame::new(header("f2", "flat").with("FILTER", "R"), Pixels::new_filled(2, 2, 12.0)),
        frame_with_pixels("light", "object", 2, vec![20.0, 20.0, 20.0, 500.0]),
        constant_frame("bias", "bias", 2, 2, 0.5),
    ]
}

#[test]
fn test_pipeline_end_to_end() {
    init_tracing();

    let detector = Arc::new(FakeDetector::clip_above(100.0, 18.0));
    let pipeline = CalibrationPipeline::new(CalibrationConfig::default(), detector.clone());

    let result = pipeline.run(&raw_session()).unwrap();

    assert_eq!(detector.calls(), 1);
    assert_eq!(result.len(), 4);

    let light = &result[0];
    assert_eq!(light.frame_type(), Some(FrameType::Object));
    assert!(light.pixels().unwrap().iter().all(|&v| v == 18.0));
    assert_eq!(str_list(light, keywords::SUBSRCS), ["d1", "d2", "d3"]);
    assert_eq!(
        light.get(keywords::CRCOUNT).and_then(HeaderValue::as_i64),
        Some(1)
    );

    let master_flat = &result[1];
    assert_eq!(master_flat.frame_type(), Some(FrameType::MasterFlat));
    assert!(master_flat.pixels().unwrap().iter().all(|&v| v == 9.0));

    assert_eq!(result.of_type(FrameType::MasterDark).len(), 1);
    assert_eq!(result.of_type(FrameType::Bias).len(), 1);
}

#[test]
fn test_pipeline_without_cosmic_ray_cleaning() {
    let detector = Arc::new(FakeDetector::clip_above(100.0, 18.0));
    let config = CalibrationConfig {
        clean_cosmic_rays: false,
        ..sequential()
    };
    let pipeline = CalibrationPipeline::new(config, detector.clone());

    let result = pipeline.run(&raw_session()).unwrap();

    assert_eq!(detector.calls(), 0);
    let lights = result.of_type(FrameType::Object);
    let light = &lights[0];
    assert_eq!(light.pixels().unwrap().get(1, 1), 498.0);
    assert!(!light.header().contains_key(keywords::CRCLEAN));
}

#[test]
fn test_pipeline_propagates_detector_failure() {
    let pipeline = CalibrationPipeline::new(
        sequential(),
        Arc::new(FakeDetector::failing("detector offline")),
    );

    let err = pipeline.run(&raw_session()).unwrap_err();

    assert!(matches!(err, Error::Detection(_)));
}
