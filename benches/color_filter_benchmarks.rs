//! Benchmarks for the color filters and the largest-region scan

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deepgaze::{
    color_detection::{BackProjectionColorDetector, ColorDetector, FilterOptions, HsvRange, RangeColorDetector},
    contours,
    skin_detection::RangeSkinDetector,
};
use opencv::{
    core::{Mat, Rect, Scalar, CV_8UC3},
    imgproc,
};

/// Blue frame with a red and a skin-colored patch
fn test_frame(width: i32, height: i32) -> Mat {
    let mut frame =
        Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::new(255.0, 0.0, 0.0, 0.0)).unwrap();
    for (rect, color) in [
        (Rect::new(width / 8, height / 8, width / 4, height / 4), Scalar::new(0.0, 0.0, 255.0, 0.0)),
        (Rect::new(width / 2, height / 2, width / 3, height / 3), Scalar::new(90.0, 140.0, 220.0, 0.0)),
    ] {
        imgproc::rectangle(&mut frame, rect, color, imgproc::FILLED, imgproc::LINE_8, 0).unwrap();
    }
    frame
}

fn benchmark_detectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("color_detectors");
    let options = FilterOptions::default();

    let template = Mat::new_rows_cols_with_default(20, 20, CV_8UC3, Scalar::new(0.0, 0.0, 255.0, 0.0)).unwrap();
    let mut backprojection = BackProjectionColorDetector::new();
    backprojection.set_template(&template).unwrap();

    let range = RangeColorDetector::new(HsvRange::new([0, 100, 100], [10, 255, 255]).unwrap());
    let skin = RangeSkinDetector::new();

    for (width, height) in [(320, 240), (640, 480)] {
        let frame = test_frame(width, height);
        let size = format!("{width}x{height}");

        group.bench_with_input(BenchmarkId::new("backprojection", &size), &frame, |b, frame| {
            b.iter(|| black_box(backprojection.filtered(frame, &options).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("range", &size), &frame, |b, frame| {
            b.iter(|| black_box(range.filtered(frame, &options).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("skin_denoised", &size), &frame, |b, frame| {
            b.iter(|| black_box(skin.filter_denoised(frame).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_contours(c: &mut Criterion) {
    let mut group = c.benchmark_group("contours");

    let frame = test_frame(640, 480);
    let skin = RangeSkinDetector::new();
    let mask = skin.mask(&frame, &FilterOptions::raw()).unwrap();

    group.bench_function("max_area_rectangle", |b| {
        b.iter(|| black_box(contours::max_area_rectangle(&mask).unwrap()));
    });
    group.bench_function("max_area_center", |b| {
        b.iter(|| black_box(contours::max_area_center(&mask).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, benchmark_detectors, benchmark_contours);
criterion_main!(benches);
