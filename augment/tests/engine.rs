use approx::assert_abs_diff_eq;
use augment::{
    AugmentError, AugmentationEngine, AugmentationEngineInit, ManifestStore, Manifest,
    MemoryImageSource, Operation, OperationType,
};
use bbox::{prelude::*, XYWH};
use image::{Rgb, RgbImage};
use label::{ImageInfo, Label};
use noisy_float::prelude::*;

fn image_info(id: &str, width: u32, height: u32) -> ImageInfo {
    ImageInfo {
        id: id.into(),
        dataset_id: Some("d1".into()),
        name: format!("{}.png", id),
        path: format!("{}.png", id),
        size: 0,
        width,
        height,
        pipeline_id: None,
    }
}

fn label(id: &str, xywh: [f64; 4], category: &str) -> Label {
    let [x, y, w, h] = xywh;
    Label::new(id, XYWH::from_xywh([r64(x), r64(y), r64(w), r64(h)]))
        .with_image("i1")
        .with_category(category)
}

fn checkerboard(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if (x / 10 + y / 10) % 2 == 0 {
            Rgb([200, 180, 160])
        } else {
            Rgb([40, 60, 80])
        }
    })
}

fn engine_with(images: &[(&str, RgbImage)], seed: Option<u64>) -> AugmentationEngine<MemoryImageSource> {
    let mut source = MemoryImageSource::new();
    for (id, raster) in images {
        source.insert_raster(*id, raster).unwrap();
    }
    AugmentationEngineInit {
        seed,
        marker_threshold: None,
    }
    .build(source)
}

#[test]
fn identity_rotation_keeps_the_label() {
    let engine = engine_with(&[("i1", checkerboard(100, 100))], Some(1));
    let labels = [label("l1", [0.4, 0.4, 0.2, 0.2], "cat1")];
    let ops = [Operation::new(OperationType::Rotate, 1.0).with("max_angle", 0)];

    let samples = engine
        .run(&image_info("i1", 100, 100), &labels, &ops, 1)
        .unwrap();
    assert_eq!(samples.len(), 1);

    let sample = &samples[0];
    assert_eq!(sample.image.dimensions(), (100, 100));
    assert_eq!(sample.labels.len(), 1);

    let decoded = &sample.labels[0];
    assert_eq!(decoded.category_id.as_deref(), Some("cat1"));
    assert_eq!(decoded.image_id.as_deref(), Some(sample.id.as_str()));
    assert_ne!(decoded.id, "l1");
    for (value, expect) in decoded.rect.xywh().iter().zip([0.4, 0.4, 0.2, 0.2]) {
        assert_abs_diff_eq!(value.raw(), expect, epsilon = 0.04);
    }
}

#[test]
fn top_left_crop_drops_the_label() {
    let engine = engine_with(&[("i1", checkerboard(100, 100))], Some(2));
    let labels = [label("l1", [0.4, 0.4, 0.2, 0.2], "cat1")];
    let ops = [Operation::new(OperationType::CropRandom, 1.0)
        .with("percentage_area", 0.1)
        .with("anchor", "top_left")];

    let samples = engine
        .run(&image_info("i1", 100, 100), &labels, &ops, 1)
        .unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].image.dimensions(), (10, 10));
    assert!(samples[0].labels.is_empty());
}

#[test]
fn crop_keeps_a_contained_label() {
    let engine = engine_with(&[("i1", checkerboard(100, 100))], Some(3));
    let labels = [label("l1", [0.1, 0.1, 0.2, 0.2], "cat1")];
    let ops = [Operation::new(OperationType::CropRandom, 1.0)
        .with("percentage_area", 0.5)
        .with("anchor", "top_left")];

    let samples = engine
        .run(&image_info("i1", 100, 100), &labels, &ops, 1)
        .unwrap();
    let decoded = &samples[0].labels[0];
    for (value, expect) in decoded.rect.xywh().iter().zip([0.2, 0.2, 0.4, 0.4]) {
        assert_abs_diff_eq!(value.raw(), expect, epsilon = 0.07);
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let engine = engine_with(&[("i1", checkerboard(80, 60))], Some(1234));
    let labels = [
        label("l1", [0.1, 0.1, 0.3, 0.3], "cat1"),
        label("l2", [0.5, 0.4, 0.4, 0.5], "cat2"),
    ];
    let ops = [
        Operation::new(OperationType::Rotate, 0.7).with("max_angle", 20),
        Operation::new(OperationType::RandomDistortion, 0.5)
            .with("grid_width", 3)
            .with("grid_height", 3)
            .with("magnitude", 4),
        Operation::new(OperationType::RandomContrast, 0.5)
            .with("min_factor", 0.6)
            .with("max_factor", 1.4),
        Operation::new(OperationType::FlipRandom, 0.5),
    ];
    let info = image_info("i1", 80, 60);

    let first = engine.run(&info, &labels, &ops, 4).unwrap();
    let second = engine.run(&info, &labels, &ops, 4).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_sample_respects_categories_and_cardinality() {
    let engine = engine_with(&[("i1", checkerboard(120, 90))], None);
    let labels = [
        label("l1", [0.05, 0.05, 0.2, 0.2], "cat1"),
        label("l2", [0.6, 0.6, 0.3, 0.3], "cat2"),
        label("l3", [0.4, 0.1, 0.1, 0.6], "cat3"),
    ];
    let ops = [
        Operation::new(OperationType::Rotate, 0.5)
            .with("max_left_rotation", 15)
            .with("max_right_rotation", 15),
        Operation::new(OperationType::Skew, 0.5).with("magnitude", 0.5),
        Operation::new(OperationType::Shear, 0.5)
            .with("max_shear_left", 10)
            .with("max_shear_right", 10),
        Operation::new(OperationType::CropRandom, 0.5)
            .with("percentage_area", 0.8)
            .with("randomise_percentage_area", true),
        Operation::new(OperationType::Invert, 0.5),
        Operation::new(OperationType::Greyscale, 0.5),
    ];

    let samples = engine
        .run(&image_info("i1", 120, 90), &labels, &ops, 12)
        .unwrap();
    assert_eq!(samples.len(), 12);

    for sample in &samples {
        assert!(sample.labels.len() <= labels.len());
        for decoded in &sample.labels {
            let category = decoded.category_id.as_deref().unwrap();
            assert!(labels
                .iter()
                .any(|source| source.category_id.as_deref() == Some(category)));
            let [_, _, w, h] = decoded.rect.xywh();
            assert!(w > 0.0 && h > 0.0);
        }
    }
}

#[test]
fn preview_uses_orientation_policy() {
    let engine = engine_with(
        &[("wide", checkerboard(60, 30)), ("tall", checkerboard(30, 60))],
        Some(5),
    );
    let ops = [Operation::new(OperationType::FlipRandom, 1.0)];

    let wide = engine.preview(&image_info("wide", 60, 30), &[], &ops).unwrap();
    assert_eq!(wide.len(), 4);
    let tall = engine.preview(&image_info("tall", 30, 60), &[], &ops).unwrap();
    assert_eq!(tall.len(), 3);
}

#[test]
fn invalid_input_fails_before_fetching() {
    // no pixel data is registered, so reaching the fetch would fail differently
    let engine = engine_with(&[], Some(0));
    let info = image_info("i1", 100, 100);
    let labels = [label("l1", [0.4, 0.4, 0.2, 0.2], "cat1")];
    let ops = [Operation::new(OperationType::Invert, 1.0)];

    let err = engine.run(&info, &labels, &[], 1).unwrap_err();
    assert!(matches!(err, AugmentError::InvalidOperationChain { .. }));

    let bad_ops = [Operation::new(OperationType::Invert, 2.0)];
    let err = engine.run(&info, &labels, &bad_ops, 1).unwrap_err();
    assert!(matches!(err, AugmentError::InvalidOperationChain { .. }));

    let err = engine.run(&info, &labels, &ops, 0).unwrap_err();
    assert!(matches!(err, AugmentError::InvalidSampleCount));

    let degenerate = [label("l1", [0.4, 0.4, 0.0, 0.2], "cat1")];
    let err = engine.run(&info, &degenerate, &ops, 1).unwrap_err();
    assert!(matches!(err, AugmentError::InvalidLabel { .. }));
    assert!(err.is_configuration_error());

    let oversized = [label("l1", [0.5, 0.5, 5.0, 5.0], "cat1")];
    let err = engine.run(&info, &oversized, &ops, 1).unwrap_err();
    assert!(matches!(err, AugmentError::InvalidLabel { .. }));
}

#[test]
fn missing_pixels_are_source_unavailable() {
    let engine = engine_with(&[], Some(0));
    let ops = [Operation::new(OperationType::Invert, 1.0)];
    let err = engine
        .run(&image_info("i1", 10, 10), &[], &ops, 1)
        .unwrap_err();
    assert!(matches!(err, AugmentError::SourceUnavailable { ref image_id, .. } if image_id == "i1"));
    assert!(!err.is_configuration_error());
}

#[test]
fn corrupt_pixels_are_decode_failure() {
    let mut source = MemoryImageSource::new();
    source.insert("i1", b"definitely not an image".to_vec());
    let engine = AugmentationEngineInit::default().build(source);
    let ops = [Operation::new(OperationType::Invert, 1.0)];

    let err = engine
        .run(&image_info("i1", 10, 10), &[], &ops, 1)
        .unwrap_err();
    assert!(matches!(err, AugmentError::DecodeFailure { .. }));
}

#[test]
fn run_by_id_looks_up_labels() {
    let engine = engine_with(&[("i1", checkerboard(100, 100))], Some(8));
    let store = ManifestStore::from_manifest(Manifest {
        images: vec![image_info("i1", 100, 100)],
        labels: vec![
            label("l1", [0.4, 0.4, 0.2, 0.2], "cat1"),
            label("l2", [0.1, 0.1, 0.1, 0.1], "cat2"),
        ],
    })
    .unwrap();
    let ops = [Operation::new(OperationType::RandomBrightness, 1.0)
        .with("min_factor", 0.8)
        .with("max_factor", 1.2)];

    let samples = engine.run_by_id(&store, "i1", &ops, 2).unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples.iter().all(|sample| sample.labels.len() == 2));

    let err = engine.run_by_id(&store, "missing", &ops, 2).unwrap_err();
    assert!(matches!(err, AugmentError::ImageNotFound { .. }));
}
