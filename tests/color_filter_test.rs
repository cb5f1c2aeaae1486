//! Color filters and largest-region queries on synthetic frames


use deepgaze::{
    color_detection::{BackProjectionColorDetector, ColorDetector, FilterOptions, HsvRange, RangeColorDetector},
    skin_detection::RangeSkinDetector,
    Error,
};
use opencv::{
    core::{self, Mat, Rect, Vec3b},
    prelude::*,
};
use test_helpers::{frame_with_patch, solid_frame, BLUE, RED};

fn red_patch_frame() -> Mat {
    frame_with_patch(120, 160, BLUE, Rect::new(60, 30, 50, 40), RED).unwrap()
}

#[test]
fn test_backprojection_isolates_template_color() {
    let mut detector = BackProjectionColorDetector::new();
    detector.set_template(&solid_frame(20, 20, RED).unwrap()).unwrap();

    let frame = red_patch_frame();
    let filtered = detector.filtered(&frame, &FilterOptions::default()).unwrap();

    assert_eq!(*filtered.at_2d::<Vec3b>(50, 85).unwrap(), Vec3b::from([0, 0, 255]));
    assert_eq!(*filtered.at_2d::<Vec3b>(5, 5).unwrap(), Vec3b::from([0, 0, 0]));
    assert_eq!(*filtered.at_2d::<Vec3b>(110, 150).unwrap(), Vec3b::from([0, 0, 0]));
}

#[test]
fn test_backprojection_mask_has_three_channels() {
    let mut detector = BackProjectionColorDetector::new();
    detector.set_template(&solid_frame(20, 20, RED).unwrap()).unwrap();

    let mask = detector.mask(&red_patch_frame(), &FilterOptions::default()).unwrap();
    assert_eq!(mask.channels(), 3);
    assert_eq!(mask.rows(), 120);
    assert_eq!(mask.cols(), 160);
}

#[test]
fn test_backprojection_largest_region() {
    let mut detector = BackProjectionColorDetector::new();
    detector.set_template(&solid_frame(20, 20, RED).unwrap()).unwrap();

    let mask = detector.mask(&red_patch_frame(), &FilterOptions::default()).unwrap();
    let rect = detector.max_area_rectangle(&mask).unwrap().unwrap();
    let patch = Rect::new(60, 30, 50, 40);

    // Convolution and blur grow the region by a few pixels
    assert!((rect.x - patch.x).abs() <= 4, "{rect:?}");
    assert!((rect.y - patch.y).abs() <= 4, "{rect:?}");
    assert!((rect.width - patch.width).abs() <= 8, "{rect:?}");
    assert!((rect.height - patch.height).abs() <= 8, "{rect:?}");

    let center = detector.max_area_center(&mask).unwrap().unwrap();
    assert!((center.x - 85).abs() <= 2 && (center.y - 50).abs() <= 2, "{center:?}");
}

#[test]
fn test_backprojection_without_template_fails() {
    let detector = BackProjectionColorDetector::new();
    let result = detector.mask(&red_patch_frame(), &FilterOptions::default());
    assert!(matches!(result, Err(Error::MissingTemplate)));
}

#[test]
fn test_backprojection_template_not_in_frame() {
    let mut detector = BackProjectionColorDetector::new();
    detector.set_template(&solid_frame(20, 20, RED).unwrap()).unwrap();

    let mask = detector.mask(&solid_frame(60, 60, BLUE).unwrap(), &FilterOptions::default()).unwrap();
    assert_eq!(detector.max_area_rectangle(&mask).unwrap(), None);
    assert_eq!(detector.max_area_center(&mask).unwrap(), None);
}

#[test]
fn test_range_detector_selects_hue_band() {
    // Red sits at hue 0, blue at hue 120
    let detector = RangeColorDetector::new(HsvRange::new([110, 100, 100], [130, 255, 255]).unwrap());
    let frame = red_patch_frame();

    let mask = detector.mask(&frame, &FilterOptions::raw()).unwrap();
    assert_eq!(mask.channels(), 1);
    assert_eq!(core::count_non_zero(&mask).unwrap(), 120 * 160 - 50 * 40);

    let filtered = detector.filtered(&frame, &FilterOptions::default()).unwrap();
    assert_eq!(*filtered.at_2d::<Vec3b>(5, 5).unwrap(), Vec3b::from([255, 0, 0]));
    assert_eq!(*filtered.at_2d::<Vec3b>(50, 85).unwrap(), Vec3b::from([0, 0, 0]));
}

#[test]
fn test_range_detector_largest_region_is_patch() {
    let detector = RangeColorDetector::new(HsvRange::new([0, 100, 100], [10, 255, 255]).unwrap());
    let mask = detector.mask(&red_patch_frame(), &FilterOptions::raw()).unwrap();

    assert_eq!(detector.max_area_rectangle(&mask).unwrap(), Some(Rect::new(60, 30, 50, 40)));
    let contour = detector.max_area_contour(&mask).unwrap().unwrap();
    assert!(contour.len() >= 4);
}

#[test]
fn test_skin_detector_as_color_detector() {
    // BGR (90, 140, 220) is a light skin tone
    let frame = frame_with_patch(100, 100, BLUE, Rect::new(30, 30, 40, 40), (90.0, 140.0, 220.0)).unwrap();
    let detector = RangeSkinDetector::new();

    let mask = detector.mask(&frame, &FilterOptions::default()).unwrap();
    let center = detector.max_area_center(&mask).unwrap().unwrap();
    assert!((center.x - 49).abs() <= 2 && (center.y - 49).abs() <= 2, "{center:?}");
}
