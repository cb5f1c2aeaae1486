//! Per-frame head tracking: cascade search inside the ROI, landmarks on
//! frontal faces, then head pose.

use crate::{
    constants::{DEFAULT_AXIS_LENGTH, DEFAULT_FOV_DEGREES, DEFAULT_ROI_RESET_FRAMES},
    face_detection::{CascadeParams, FaceFinder, FaceType},
    mark_detection::{FaceLandmarks, LandmarkPredictor},
    pose_estimation::{CameraModel, HeadPose, PoseEstimator},
    roi::RoiTracker,
    utils::safe_cast::f64_to_pixel,
    Error, Result,
};
use opencv::{
    core::{Mat, Point, Rect},
    imgproc,
    prelude::*,
};

/// Projected head axis: origin at the sellion and the X, Y, Z end points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadAxis {
    pub origin: Point,
    pub x: Point,
    pub y: Point,
    pub z: Point,
}

/// Outcome of one tracked frame
#[derive(Debug, Clone, Default)]
pub struct TrackResult {
    /// Stage that found the face, `FaceType::None` on a miss
    pub face_type: FaceType,
    /// Face in frame coordinates
    pub face: Option<Rect>,
    /// Search window for the next frame
    pub roi: Rect,
    /// Landmarks, only for frontal faces
    pub landmarks: Option<FaceLandmarks>,
    pub pose: Option<HeadPose>,
    pub axis: Option<HeadAxis>,
    /// Whether this frame sent the ROI back to the whole frame
    pub roi_reset: bool,
}

/// Tracking parameters that are not part of the cascade search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    /// Length of the drawn head axis in model units
    pub axis_length: f32,
    /// Misses, counted in total, before the ROI is reset
    pub roi_reset_frames: u32,
    /// Horizontal field of view used to approximate the camera
    pub fov_degrees: f64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            axis_length: DEFAULT_AXIS_LENGTH,
            roi_reset_frames: DEFAULT_ROI_RESET_FRAMES,
            fov_degrees: DEFAULT_FOV_DEGREES,
        }
    }
}

/// Head tracker over a stream of frames of fixed size
pub struct HeadTracker<F: FaceFinder, L: LandmarkPredictor> {
    finder: F,
    predictor: L,
    estimator: PoseEstimator,
    roi: RoiTracker,
    params: CascadeParams,
    axis_length: f32,
}

impl<F: FaceFinder, L: LandmarkPredictor> HeadTracker<F, L> {
    /// Create a tracker for frames of `frame_width` x `frame_height`
    ///
    /// # Errors
    ///
    /// Returns an error if the frame size or field of view is invalid.
    pub fn new(
        finder: F,
        predictor: L,
        frame_width: i32,
        frame_height: i32,
        params: CascadeParams,
        settings: TrackerSettings,
    ) -> Result<Self> {
        let camera = CameraModel::from_frame_size(frame_width, frame_height, settings.fov_degrees)?;
        log::info!(
            "Initializing HeadTracker for {}x{} frames, ROI reset after {} misses",
            frame_width,
            frame_height,
            settings.roi_reset_frames
        );
        Ok(Self {
            finder,
            predictor,
            estimator: PoseEstimator::new(camera)?,
            roi: RoiTracker::new(frame_width, frame_height, settings.roi_reset_frames),
            params,
            axis_length: settings.axis_length,
        })
    }

    /// Current search window
    #[must_use]
    pub const fn roi(&self) -> Rect {
        self.roi.roi()
    }

    /// Cascade parameters, including the stage tried first
    #[must_use]
    pub const fn params(&self) -> &CascadeParams {
        &self.params
    }

    #[must_use]
    pub const fn finder(&self) -> &F {
        &self.finder
    }

    /// Forget the tracked face
    pub fn reset(&mut self) {
        self.roi.reset();
        self.params.last_face_type = FaceType::None;
    }

    /// Track the head in one BGR frame
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The frame is empty, not BGR, or does not match the tracker size
    /// - The face finder or the landmark predictor fails
    pub fn process(&mut self, frame: &Mat) -> Result<TrackResult> {
        if frame.empty() || frame.channels() != 3 {
            return Err(Error::InvalidInput("Expected a non-empty BGR frame".to_string()));
        }
        let bounds = self.roi.frame();
        if frame.cols() != bounds.width || frame.rows() != bounds.height {
            return Err(Error::InvalidInput(format!(
                "Frame is {}x{}, tracker expects {}x{}",
                frame.cols(),
                frame.rows(),
                bounds.width,
                bounds.height
            )));
        }

        let search = self.roi.roi();
        let crop = Mat::roi(frame, search)?.try_clone()?;
        let mut gray = Mat::default();
        imgproc::cvt_color(&crop, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

        let Some(detection) = self.finder.find_face(&gray, &self.params)? else {
            self.params.last_face_type = FaceType::None;
            let roi_reset = self.roi.register_miss();
            return Ok(TrackResult {
                roi: self.roi.roi(),
                roi_reset,
                ..TrackResult::default()
            });
        };

        let face = self.roi.register_face(detection.rect);
        self.params.last_face_type = detection.face_type;
        log::debug!("FACE: {:?} {:?}", detection.face_type, face);
        log::debug!("ROI: {:?}", self.roi.roi());

        let mut result = TrackResult {
            face_type: detection.face_type,
            face: Some(face),
            roi: self.roi.roi(),
            ..TrackResult::default()
        };

        if detection.face_type == FaceType::Frontal && face.area() > 0 {
            let landmarks = self.predictor.predict(frame, face)?;
            match self.solve(&landmarks) {
                Ok((pose, axis)) => {
                    result.pose = Some(pose);
                    result.axis = Some(axis);
                }
                Err(e) => log::warn!("Head pose not found for this frame: {e}"),
            }
            result.landmarks = Some(landmarks);
        }

        Ok(result)
    }

    fn solve(&self, landmarks: &FaceLandmarks) -> Result<(HeadPose, HeadAxis)> {
        let pose = self.estimator.estimate(&landmarks.tracked_points())?;
        let [x, y, z] = self.estimator.project_axis(&pose, self.axis_length)?;
        let sellion = landmarks.sellion();
        let origin = Point::new(
            f64_to_pixel(f64::from(sellion.x), i32::MIN, i32::MAX),
            f64_to_pixel(f64::from(sellion.y), i32::MIN, i32::MAX),
        );
        Ok((pose, HeadAxis { origin, x, y, z }))
    }
}
