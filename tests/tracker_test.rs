//! Tracking loop with scripted face finder and landmark predictor


use deepgaze::{
    face_detection::{CascadeParams, FaceDetection, FaceFinder, FaceType},
    mark_detection::{FaceLandmarks, LandmarkPredictor},
    pose_estimation::CameraModel,
    tracker::{HeadTracker, TrackerSettings},
    Result,
};
use opencv::core::{Mat, Point2f, Rect, CV_8UC3};
use std::collections::VecDeque;
use test_helpers::{assert_point_near, assert_vec3d_finite, create_test_image, frontal_pose, landmarks_for_pose};

/// Replays detections (relative to the searched crop) and records what it saw
struct ScriptedFinder {
    answers: VecDeque<Option<FaceDetection>>,
    first_stage_seen: Vec<FaceType>,
}

impl ScriptedFinder {
    fn new(answers: Vec<Option<FaceDetection>>) -> Self {
        Self {
            answers: answers.into(),
            first_stage_seen: Vec::new(),
        }
    }
}

impl FaceFinder for ScriptedFinder {
    fn find_face(&mut self, _gray: &Mat, params: &CascadeParams) -> Result<Option<FaceDetection>> {
        self.first_stage_seen.push(params.stage_order()[0]);
        Ok(self.answers.pop_front().flatten())
    }
}

/// Always returns the same landmarks
struct FixedPredictor {
    landmarks: FaceLandmarks,
}

impl LandmarkPredictor for FixedPredictor {
    fn predict(&mut self, _frame: &Mat, _face: Rect) -> Result<FaceLandmarks> {
        Ok(self.landmarks.clone())
    }
}

fn frontal(rect: Rect) -> Option<FaceDetection> {
    Some(FaceDetection {
        rect,
        face_type: FaceType::Frontal,
    })
}

fn build(
    answers: Vec<Option<FaceDetection>>,
    settings: TrackerSettings,
) -> HeadTracker<ScriptedFinder, FixedPredictor> {
    let camera = CameraModel::from_frame_size(640, 480, settings.fov_degrees).unwrap();
    let predictor = FixedPredictor {
        landmarks: landmarks_for_pose(camera, &frontal_pose()).unwrap(),
    };
    HeadTracker::new(
        ScriptedFinder::new(answers),
        predictor,
        640,
        480,
        CascadeParams::default(),
        settings,
    )
    .unwrap()
}

fn frame() -> Mat {
    create_test_image(480, 640, CV_8UC3).unwrap()
}

#[test]
fn test_frontal_face_recovers_pose_and_axis() {
    let mut tracker = build(vec![frontal(Rect::new(250, 150, 140, 160))], TrackerSettings::default());
    let result = tracker.process(&frame()).unwrap();

    assert_eq!(result.face_type, FaceType::Frontal);
    assert_eq!(result.face, Some(Rect::new(250, 150, 140, 160)));
    let pose = result.pose.expect("pose for a frontal face");
    assert_vec3d_finite(&pose.rotation);
    assert_vec3d_finite(&pose.translation);

    let truth = frontal_pose();
    for i in 0..3 {
        assert!((pose.rotation[i] - truth.rotation[i]).abs() < 1e-2);
        assert!((pose.translation[i] - truth.translation[i]).abs() < 1.0);
    }

    // The axis starts on the sellion, which the head model places at its origin
    let axis = result.axis.expect("axis with a pose");
    let sellion = result.landmarks.expect("landmarks for a frontal face").sellion();
    assert_point_near(
        Point2f::new(axis.origin.x as f32, axis.origin.y as f32),
        sellion,
        1.0,
    );
    assert_ne!(axis.x, axis.origin);
}

#[test]
fn test_profile_face_skips_landmarks() {
    let mut tracker = build(
        vec![Some(FaceDetection {
            rect: Rect::new(100, 100, 80, 100),
            face_type: FaceType::ProfileRight,
        })],
        TrackerSettings::default(),
    );
    let result = tracker.process(&frame()).unwrap();

    assert_eq!(result.face_type, FaceType::ProfileRight);
    assert!(result.landmarks.is_none());
    assert!(result.pose.is_none());
    assert!(result.axis.is_none());
}

#[test]
fn test_last_face_type_is_tried_first() {
    let mut tracker = build(
        vec![
            Some(FaceDetection {
                rect: Rect::new(100, 100, 80, 100),
                face_type: FaceType::ProfileLeft,
            }),
            None,
            None,
        ],
        TrackerSettings::default(),
    );
    for _ in 0..3 {
        tracker.process(&frame()).unwrap();
    }
    assert_eq!(
        tracker.finder().first_stage_seen,
        vec![FaceType::Frontal, FaceType::ProfileLeft, FaceType::Frontal]
    );
    assert_eq!(tracker.params().last_face_type, FaceType::None);
}

#[test]
fn test_roi_follows_face_in_frame_coordinates() {
    let mut tracker = build(
        vec![
            frontal(Rect::new(300, 200, 100, 100)),
            // Relative to the ROI (236, 152, 228, 196)
            frontal(Rect::new(20, 10, 100, 100)),
        ],
        TrackerSettings::default(),
    );

    let first = tracker.process(&frame()).unwrap();
    assert_eq!(first.roi, Rect::new(236, 152, 228, 196));

    let second = tracker.process(&frame()).unwrap();
    assert_eq!(second.face, Some(Rect::new(256, 162, 100, 100)));
    assert_eq!(second.roi, Rect::new(192, 114, 228, 196));
}

#[test]
fn test_roi_resets_after_misses_in_a_row() {
    let settings = TrackerSettings {
        roi_reset_frames: 3,
        ..TrackerSettings::default()
    };
    let mut tracker = build(
        vec![frontal(Rect::new(300, 200, 100, 100)), None, None, None],
        settings,
    );

    tracker.process(&frame()).unwrap();
    assert_ne!(tracker.roi(), Rect::new(0, 0, 640, 480));

    assert!(!tracker.process(&frame()).unwrap().roi_reset);
    assert!(!tracker.process(&frame()).unwrap().roi_reset);
    let third = tracker.process(&frame()).unwrap();
    assert!(third.roi_reset);
    assert_eq!(third.roi, Rect::new(0, 0, 640, 480));
}

#[test]
fn test_roi_reset_counts_misses_across_faces() {
    let settings = TrackerSettings {
        roi_reset_frames: 3,
        ..TrackerSettings::default()
    };
    let mut tracker = build(
        vec![None, None, frontal(Rect::new(300, 200, 100, 100)), None],
        settings,
    );

    assert!(!tracker.process(&frame()).unwrap().roi_reset);
    assert!(!tracker.process(&frame()).unwrap().roi_reset);

    let found = tracker.process(&frame()).unwrap();
    assert!(found.face.is_some());
    assert_ne!(found.roi, Rect::new(0, 0, 640, 480));

    let missed = tracker.process(&frame()).unwrap();
    assert!(missed.roi_reset);
    assert_eq!(missed.roi, Rect::new(0, 0, 640, 480));
}

#[test]
fn test_reset_forgets_face() {
    let mut tracker = build(vec![frontal(Rect::new(300, 200, 100, 100))], TrackerSettings::default());
    tracker.process(&frame()).unwrap();
    tracker.reset();
    assert_eq!(tracker.roi(), Rect::new(0, 0, 640, 480));
    assert_eq!(tracker.params().last_face_type, FaceType::None);
}
