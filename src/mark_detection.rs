//! 68-point facial landmarks from an ONNX model.

use crate::{
    constants::{NUM_FACIAL_LANDMARKS, SELLION_INDEX, TRACKED_POINTS},
    utils::{clamp_rect, safe_cast::usize_to_i32},
    Error, Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Point2f, Rect, Size, Vec3f, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Default landmark detector input size
const DEFAULT_LANDMARK_INPUT_SIZE: i32 = 128;

/// 68 facial landmarks in frame coordinates (iBUG 300-W ordering)
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<Point2f>,
}

impl FaceLandmarks {
    /// Wrap a full set of landmarks
    ///
    /// # Errors
    ///
    /// Returns an error if `points` does not hold exactly 68 landmarks.
    pub fn new(points: Vec<Point2f>) -> Result<Self> {
        if points.len() != NUM_FACIAL_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Expected {} landmarks, got {}",
                NUM_FACIAL_LANDMARKS,
                points.len()
            )));
        }
        Ok(Self { points })
    }

    /// All 68 points
    #[must_use]
    pub fn points(&self) -> &[Point2f] {
        &self.points
    }

    /// The 11 points matching the anthropometric head model, in model order
    #[must_use]
    pub fn tracked_points(&self) -> Vec<Point2f> {
        TRACKED_POINTS.iter().map(|&i| self.points[i]).collect()
    }

    /// The sellion, origin of the head axis
    #[must_use]
    pub fn sellion(&self) -> Point2f {
        self.points[SELLION_INDEX]
    }
}

/// Anything able to place 68 landmarks on a face
pub trait LandmarkPredictor {
    /// Predict the landmarks of the face inside `face` (frame coordinates)
    ///
    /// # Errors
    ///
    /// Returns an error if the face region is empty or the model fails.
    fn predict(&mut self, frame: &Mat, face: Rect) -> Result<FaceLandmarks>;
}

/// Facial landmark detector using `ONNX` Runtime
pub struct MarkDetector {
    session: Session,
    input_size: i32,
}

impl MarkDetector {
    /// Create a new landmark detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The model has no input or output
    /// - The ONNX runtime environment cannot be created
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        log::info!(
            "Initializing MarkDetector with model: {}",
            model_path.as_ref().display()
        );
        if !model_path.as_ref().exists() {
            return Err(Error::ModelError(format!(
                "Landmark model not found: {}",
                model_path.as_ref().display()
            )));
        }

        let environment = Arc::new(
            Environment::builder()
                .with_name("mark_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
        })
    }

    /// Resize the face crop to the model input and lay it out as NHWC RGB in [0, 1]
    #[allow(clippy::cast_sign_loss)] // OpenCV dimensions are positive
    fn preprocess(&self, face_image: &Mat) -> Result<Array4<f32>> {
        let mut resized = Mat::default();
        imgproc::resize(
            face_image,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let size = self.input_size as usize;
        let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
        for row in 0..size {
            for col in 0..size {
                let pixel = float_image.at_2d::<Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..3 {
                    tensor[[0, row, col, ch]] = pixel[ch];
                }
            }
        }
        Ok(tensor)
    }

    /// Run the model and return the flat (x, y) output
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let marks_output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?;

        let marks_tensor = marks_output.try_extract::<f32>()?;
        let marks_view = marks_tensor.view();
        let marks = marks_view
            .as_slice()
            .ok_or_else(|| Error::ModelOutputError("Failed to get output data".to_string()))?;

        Ok(marks.to_vec())
    }
}

impl LandmarkPredictor for MarkDetector {
    fn predict(&mut self, frame: &Mat, face: Rect) -> Result<FaceLandmarks> {
        let region = clamp_rect(face, frame.cols(), frame.rows());
        if region.width <= 0 || region.height <= 0 {
            return Err(Error::InvalidInput(format!("Face region {face:?} lies outside the frame")));
        }

        let face_image = Mat::roi(frame, region)?.try_clone()?;
        let marks = self.forward(self.preprocess(&face_image)?)?;
        scale_marks(&marks, region, self.input_size)
    }
}

/// Convert model output, normalised to the model input size, to frame
/// coordinates of `region`
#[allow(clippy::cast_precision_loss)] // Precision loss acceptable for pixel coordinates
fn scale_marks(marks: &[f32], region: Rect, input_size: i32) -> Result<FaceLandmarks> {
    if marks.len() < NUM_FACIAL_LANDMARKS * 2 {
        return Err(Error::ModelDataFormatError(format!(
            "Expected {} values from the landmark model, got {}",
            NUM_FACIAL_LANDMARKS * 2,
            marks.len()
        )));
    }

    let scale_x = region.width as f32 / input_size as f32;
    let scale_y = region.height as f32 / input_size as f32;

    let points = marks
        .chunks_exact(2)
        .take(NUM_FACIAL_LANDMARKS)
        .map(|xy| Point2f::new(region.x as f32 + xy[0] * scale_x, region.y as f32 + xy[1] * scale_y))
        .collect();

    FaceLandmarks::new(points)
}
