//! Benchmarks for pose estimation and ROI bookkeeping

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deepgaze::{
    constants::HEAD_MODEL_POINTS,
    pose_estimation::{CameraModel, HeadPose, PoseEstimator},
    roi::RoiTracker,
    utils::safe_cast::f64_to_pixel,
};
use opencv::core::{Point3f, Rect, Vec3d};

fn benchmark_pose_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pose_estimation");

    let estimator = PoseEstimator::new(CameraModel::default()).expect("Failed to create pose estimator");
    let truth = HeadPose {
        rotation: Vec3d::from([0.1, -0.2, 0.05]),
        translation: Vec3d::from([10.0, -5.0, 700.0]),
    };
    let model: Vec<Point3f> = HEAD_MODEL_POINTS.iter().map(|p| Point3f::new(p[0], p[1], p[2])).collect();
    let image_points = estimator.project_points(&truth, &model).expect("Projection failed");

    group.bench_function("estimate_11_points", |b| {
        b.iter(|| black_box(estimator.estimate(&image_points).expect("Pose estimation failed")));
    });

    group.bench_function("project_axis", |b| {
        b.iter(|| black_box(estimator.project_axis(&truth, 50.0).expect("Projection failed")));
    });

    group.bench_function("euler_degrees", |b| {
        b.iter(|| black_box(truth.euler_degrees()));
    });

    group.finish();
}

fn benchmark_roi(c: &mut Criterion) {
    let mut group = c.benchmark_group("roi");

    group.bench_function("register_face_and_miss", |b| {
        let mut tracker = RoiTracker::new(640, 480, 50);
        b.iter(|| {
            black_box(tracker.register_face(Rect::new(30, 20, 120, 140)));
            black_box(tracker.register_miss());
        });
    });

    group.bench_function("f64_to_pixel", |b| {
        let values = [10.5, -20.3, 1e9, -1e9, f64::NAN];
        b.iter(|| {
            for &value in &values {
                black_box(f64_to_pixel(value, 0, 639));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_pose_estimation, benchmark_roi);
criterion_main!(benches);
