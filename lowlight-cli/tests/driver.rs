use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use lowlight_cli::{
    collect_images, enhance_dataset, DriverOptions, EnhanceError, EnhanceResult, Enhancer, Image,
    StopSignal,
};
use lowlight_core::{PipelineConfig, Variant};
use lowlight_enhance::{LowLightSimulator, TraditionalPipeline};

fn write_gradient(path: &Path, seed: u8) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(24, 16, |x, y| {
        Rgb([
            (x * 3) as u8 + seed,
            (y * 4) as u8 + seed,
            ((x + y) * 2) as u8,
        ])
    });
    img.save(path).unwrap();
}

fn simple_pipeline() -> TraditionalPipeline {
    TraditionalPipeline::new(PipelineConfig {
        variant: Variant::Simple,
        ..PipelineConfig::default()
    })
    .unwrap()
}

#[test]
fn corrupt_image_is_counted_and_batch_continues() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    for i in 0..4u8 {
        write_gradient(&input.path().join(format!("img_{}.png", i)), i * 10);
    }
    fs::write(input.path().join("broken.png"), b"definitely not a png").unwrap();

    let report = enhance_dataset(
        input.path(),
        output.path(),
        &simple_pipeline(),
        &DriverOptions::with_workers(2),
    )
    .unwrap();

    assert_eq!(report.discovered, 5);
    assert_eq!(report.processed, 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, "unreadable_image");
    assert!(report.failures[0].path.ends_with("broken.png"));

    assert_eq!(collect_images(output.path()).len(), 4);
    assert!(!output.path().join("broken.png").exists());
}

#[test]
fn nested_layout_is_mirrored() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    for i in 0..3u8 {
        write_gradient(&input.path().join("train").join(format!("t{}.png", i)), i);
    }
    for i in 0..2u8 {
        write_gradient(&input.path().join("val").join(format!("v{}.png", i)), i);
    }

    let report = enhance_dataset(
        input.path(),
        output.path(),
        &simple_pipeline(),
        &DriverOptions::with_workers(3),
    )
    .unwrap();
    assert_eq!(report.succeeded, 5);

    assert_eq!(collect_images(&output.path().join("train")).len(), 3);
    assert_eq!(collect_images(&output.path().join("val")).len(), 2);

    let enhanced = image::open(output.path().join("val").join("v1.png")).unwrap().to_rgb8();
    assert_eq!(enhanced.dimensions(), (24, 16));
}

#[test]
fn non_image_files_are_ignored() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    write_gradient(&input.path().join("frame.png"), 0);
    fs::write(input.path().join("labels.txt"), "0 0.5 0.5 0.1 0.1\n").unwrap();

    let report = enhance_dataset(
        input.path(),
        output.path(),
        &simple_pipeline(),
        &DriverOptions::with_workers(1),
    )
    .unwrap();

    assert_eq!(report.discovered, 1);
    assert_eq!(report.succeeded, 1);
    assert!(!output.path().join("labels.txt").exists());
}

#[test]
fn stop_before_start_skips_everything() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    for i in 0..3u8 {
        write_gradient(&input.path().join(format!("img_{}.png", i)), i);
    }

    let stop = StopSignal::new();
    stop.stop();
    let options = DriverOptions { workers: 2, stop };

    let report =
        enhance_dataset(input.path(), output.path(), &simple_pipeline(), &options).unwrap();
    assert_eq!(report.discovered, 3);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.processed, 0);
    assert!(collect_images(output.path()).is_empty());
}

#[test]
fn unwritable_output_is_counted_and_batch_continues() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    write_gradient(&input.path().join("a.png"), 0);
    write_gradient(&input.path().join("b.png"), 10);
    write_gradient(&input.path().join("night").join("c.png"), 20);
    // A file where the mirrored subdirectory has to go
    fs::write(output.path().join("night"), b"in the way").unwrap();

    let report = enhance_dataset(
        input.path(),
        output.path(),
        &simple_pipeline(),
        &DriverOptions::with_workers(2),
    )
    .unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, "write_failure");
    assert!(report.failures[0].path.ends_with("c.png"));
    assert!(output.path().join("a.png").is_file());
    assert!(output.path().join("b.png").is_file());
}

/// Requests a stop from inside its first call
struct StopsAfterFirst {
    inner: TraditionalPipeline,
    stop: StopSignal,
}

impl Enhancer for StopsAfterFirst {
    fn name(&self) -> &str {
        "stops-after-first"
    }

    fn enhance(&self, image: &Image) -> EnhanceResult<Image> {
        self.stop.stop();
        self.inner.enhance(image)
    }
}

#[test]
fn stop_mid_run_finishes_in_flight_image() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    for i in 0..6u8 {
        write_gradient(&input.path().join(format!("img_{}.png", i)), i);
    }

    let stop = StopSignal::new();
    let enhancer = StopsAfterFirst {
        inner: simple_pipeline(),
        stop: stop.clone(),
    };
    let options = DriverOptions { workers: 1, stop };

    let report = enhance_dataset(input.path(), output.path(), &enhancer, &options).unwrap();
    assert_eq!(report.processed + report.skipped, report.discovered);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 5);
    // The image being enhanced when the stop arrived is still written
    assert_eq!(collect_images(output.path()).len(), 1);
}

#[test]
fn uncreatable_output_root_aborts() {
    let input = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    write_gradient(&input.path().join("img.png"), 0);

    let blocker = scratch.path().join("not_a_dir");
    fs::write(&blocker, b"file").unwrap();

    let err = enhance_dataset(
        input.path(),
        &blocker.join("out"),
        &simple_pipeline(),
        &DriverOptions::with_workers(1),
    )
    .unwrap_err();
    assert!(matches!(err, EnhanceError::BatchIOFailure { .. }));
}

#[test]
fn missing_input_dir_aborts() {
    let scratch = tempfile::tempdir().unwrap();
    let err = enhance_dataset(
        &scratch.path().join("nope"),
        &scratch.path().join("out"),
        &simple_pipeline(),
        &DriverOptions::with_workers(1),
    )
    .unwrap_err();
    assert!(matches!(err, EnhanceError::BatchIOFailure { .. }));
}

#[test]
fn darkening_run_produces_darker_copies() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_gradient(&input.path().join("day.png"), 100);

    let simulator = LowLightSimulator::new((0.3, 0.7), 42).unwrap();
    let report = enhance_dataset(
        input.path(),
        output.path(),
        &simulator,
        &DriverOptions::with_workers(1),
    )
    .unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.enhancer, "lowlight-simulator");

    let original = image::open(input.path().join("day.png")).unwrap().to_rgb8();
    let dark = image::open(output.path().join("day.png")).unwrap().to_rgb8();
    let sum = |img: &RgbImage| img.iter().map(|&v| v as u64).sum::<u64>();
    assert!(sum(&dark) < sum(&original));
}
