//! Face search with a chain of Haar cascades: frontal, rotated frontal and
//! both profiles.

use crate::{
    config::CascadeConfig,
    constants::{
        DEFAULT_FRONTAL_SCALE_FACTOR, DEFAULT_MIN_FACE_SIZE, DEFAULT_MIN_NEIGHBORS, DEFAULT_PROFILE_SCALE_FACTOR,
        DEFAULT_ROTATED_SCALE_FACTOR, DEFAULT_ROTATION_ANGLE,
    },
    utils::{clamp_rect, rotate_point},
    Error, Result,
};
use opencv::{
    core::{self, Mat, Point2f, Rect, Scalar, Size, Vector, BORDER_CONSTANT},
    imgproc,
    objdetect::{self, CascadeClassifier},
    prelude::*,
};
use std::path::Path;

/// Which cascade stage produced a detection.
///
/// The numeric codes are stable: 0 means no face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FaceType {
    /// No face found
    #[default]
    None = 0,
    /// Upright frontal face
    Frontal = 1,
    /// Frontal face tilted to the left (found on the image rotated counter-clockwise)
    FrontRotLeft = 2,
    /// Frontal face tilted to the right (found on the image rotated clockwise)
    FrontRotRight = 3,
    /// Face turned to the left
    ProfileLeft = 4,
    /// Face turned to the right (found on the mirrored image)
    ProfileRight = 5,
}

impl FaceType {
    /// Stable numeric code
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Short label for overlays and logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Frontal => "FRONTAL",
            Self::FrontRotLeft => "FRONTAL ROT LEFT",
            Self::FrontRotRight => "FRONTAL ROT RIGHT",
            Self::ProfileLeft => "PROFILE LEFT",
            Self::ProfileRight => "PROFILE RIGHT",
        }
    }

    /// Whether a face was found
    #[must_use]
    pub const fn is_face(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Face found by a [`FaceFinder`], in the coordinates of the searched image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceDetection {
    /// Bounding box of the face
    pub rect: Rect,
    /// Stage that found it
    pub face_type: FaceType,
}

/// Parameters of one cascade search
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeParams {
    pub run_frontal: bool,
    pub run_frontal_rotated: bool,
    pub run_left: bool,
    pub run_right: bool,
    pub frontal_scale_factor: f64,
    pub rotated_scale_factor: f64,
    pub left_scale_factor: f64,
    pub right_scale_factor: f64,
    /// Smallest face searched for
    pub min_size: Size,
    pub min_neighbors: i32,
    /// Rotation applied for the tilted frontal stages, in degrees
    pub rotation_angle: f64,
    /// Stage tried first, usually the one that found the previous face
    pub last_face_type: FaceType,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            run_frontal: true,
            run_frontal_rotated: true,
            run_left: true,
            run_right: true,
            frontal_scale_factor: DEFAULT_FRONTAL_SCALE_FACTOR,
            rotated_scale_factor: DEFAULT_ROTATED_SCALE_FACTOR,
            left_scale_factor: DEFAULT_PROFILE_SCALE_FACTOR,
            right_scale_factor: DEFAULT_PROFILE_SCALE_FACTOR,
            min_size: Size::new(DEFAULT_MIN_FACE_SIZE, DEFAULT_MIN_FACE_SIZE),
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            rotation_angle: DEFAULT_ROTATION_ANGLE,
            last_face_type: FaceType::None,
        }
    }
}

impl From<&CascadeConfig> for CascadeParams {
    fn from(config: &CascadeConfig) -> Self {
        Self {
            run_frontal: config.run_frontal,
            run_frontal_rotated: config.run_frontal_rotated,
            run_left: config.run_left,
            run_right: config.run_right,
            frontal_scale_factor: config.frontal_scale_factor,
            rotated_scale_factor: config.rotated_scale_factor,
            left_scale_factor: config.left_scale_factor,
            right_scale_factor: config.right_scale_factor,
            min_size: Size::new(config.min_size, config.min_size),
            min_neighbors: config.min_neighbors,
            rotation_angle: config.rotation_angle,
            last_face_type: FaceType::None,
        }
    }
}

impl CascadeParams {
    /// Enabled stages in search order, with `last_face_type` moved to the front
    #[must_use]
    pub fn stage_order(&self) -> Vec<FaceType> {
        let enabled = |stage: FaceType| match stage {
            FaceType::Frontal => self.run_frontal,
            FaceType::FrontRotLeft | FaceType::FrontRotRight => self.run_frontal_rotated,
            FaceType::ProfileLeft => self.run_left,
            FaceType::ProfileRight => self.run_right,
            FaceType::None => false,
        };

        let mut order: Vec<FaceType> = [
            FaceType::Frontal,
            FaceType::FrontRotLeft,
            FaceType::FrontRotRight,
            FaceType::ProfileLeft,
            FaceType::ProfileRight,
        ]
        .into_iter()
        .filter(|&stage| enabled(stage))
        .collect();

        if let Some(pos) = order.iter().position(|&stage| stage == self.last_face_type) {
            let last = order.remove(pos);
            order.insert(0, last);
        }
        order
    }
}

/// Anything able to locate a single face in a grayscale image
pub trait FaceFinder {
    /// Search `gray` and return the face found, in `gray` coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying detector fails.
    fn find_face(&mut self, gray: &Mat, params: &CascadeParams) -> Result<Option<FaceDetection>>;
}

/// Chain of Haar cascades: frontal, tilted frontal, left and right profile.
///
/// Stages run in order and the search stops at the first stage that finds a
/// face; each stage keeps its largest candidate.
pub struct HaarCascade {
    frontal: CascadeClassifier,
    profile: CascadeClassifier,
}

impl HaarCascade {
    /// Load the frontal and profile cascade files
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing or is not a valid cascade.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(frontal_path: P, profile_path: Q) -> Result<Self> {
        log::info!(
            "Initializing HaarCascade with {} and {}",
            frontal_path.as_ref().display(),
            profile_path.as_ref().display()
        );
        Ok(Self {
            frontal: Self::load(frontal_path.as_ref())?,
            profile: Self::load(profile_path.as_ref())?,
        })
    }

    fn load(path: &Path) -> Result<CascadeClassifier> {
        if !path.exists() {
            return Err(Error::CascadeError(format!("Cascade file not found: {}", path.display())));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::CascadeError(format!("Cascade path is not valid UTF-8: {}", path.display())))?;
        let classifier = CascadeClassifier::new(path_str)?;
        if classifier.empty()? {
            return Err(Error::CascadeError(format!("Cascade file is empty or invalid: {}", path.display())));
        }
        Ok(classifier)
    }

    fn run_stage(&mut self, stage: FaceType, gray: &Mat, params: &CascadeParams) -> Result<Option<Rect>> {
        match stage {
            FaceType::Frontal => largest_detection(&mut self.frontal, gray, params.frontal_scale_factor, params),
            FaceType::FrontRotLeft => self.rotated_stage(gray, params.rotation_angle, params),
            FaceType::FrontRotRight => self.rotated_stage(gray, -params.rotation_angle, params),
            FaceType::ProfileLeft => largest_detection(&mut self.profile, gray, params.left_scale_factor, params),
            FaceType::ProfileRight => {
                let mut mirrored = Mat::default();
                core::flip(gray, &mut mirrored, 1)?;
                Ok(largest_detection(&mut self.profile, &mirrored, params.right_scale_factor, params)?
                    .map(|rect| mirror_x(rect, gray.cols())))
            }
            FaceType::None => Ok(None),
        }
    }

    fn rotated_stage(&mut self, gray: &Mat, angle: f64, params: &CascadeParams) -> Result<Option<Rect>> {
        #[allow(clippy::cast_precision_loss)] // Image dimensions are small
        let center = Point2f::new(gray.cols() as f32 / 2.0, gray.rows() as f32 / 2.0);
        let rotation = imgproc::get_rotation_matrix_2d(center, angle, 1.0)?;

        let mut rotated = Mat::default();
        imgproc::warp_affine(
            gray,
            &mut rotated,
            &rotation,
            gray.size()?,
            imgproc::INTER_LINEAR,
            BORDER_CONSTANT,
            Scalar::all(0.0),
        )?;

        Ok(largest_detection(&mut self.frontal, &rotated, params.rotated_scale_factor, params)?
            .map(|rect| unrotate_rect(rect, center, angle, gray.cols(), gray.rows())))
    }
}

impl FaceFinder for HaarCascade {
    fn find_face(&mut self, gray: &Mat, params: &CascadeParams) -> Result<Option<FaceDetection>> {
        if gray.empty() {
            return Ok(None);
        }
        for stage in params.stage_order() {
            if let Some(rect) = self.run_stage(stage, gray, params)? {
                log::debug!("{} face at {:?}", stage.label(), rect);
                return Ok(Some(FaceDetection { rect, face_type: stage }));
            }
        }
        Ok(None)
    }
}

fn largest_detection(
    classifier: &mut CascadeClassifier,
    image: &Mat,
    scale_factor: f64,
    params: &CascadeParams,
) -> Result<Option<Rect>> {
    let mut faces = Vector::<Rect>::new();
    classifier.detect_multi_scale(
        image,
        &mut faces,
        scale_factor,
        params.min_neighbors,
        objdetect::CASCADE_SCALE_IMAGE,
        params.min_size,
        Size::new(0, 0),
    )?;
    Ok(largest_rect(faces.iter()))
}

/// Largest rectangle by area, first one on ties
pub(crate) fn largest_rect(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().fold(None, |best: Option<Rect>, rect| match best {
        Some(current) if current.area() >= rect.area() => Some(current),
        _ => Some(rect),
    })
}

/// Map a rectangle found on a horizontally flipped image back
fn mirror_x(rect: Rect, image_width: i32) -> Rect {
    Rect::new(image_width - rect.x - rect.width, rect.y, rect.width, rect.height)
}

/// Map a rectangle found on an image rotated by `angle` about `center` back to
/// the original image, as the clamped bounding box of its rotated corners.
fn unrotate_rect(rect: Rect, center: Point2f, angle: f64, width: i32, height: i32) -> Rect {
    #[allow(clippy::cast_precision_loss)] // Pixel coordinates
    let corners = [
        Point2f::new(rect.x as f32, rect.y as f32),
        Point2f::new((rect.x + rect.width) as f32, rect.y as f32),
        Point2f::new(rect.x as f32, (rect.y + rect.height) as f32),
        Point2f::new((rect.x + rect.width) as f32, (rect.y + rect.height) as f32),
    ];
    let mapped: Vec<Point2f> = corners.iter().map(|&p| rotate_point(p, center, -angle)).collect();

    let min_x = mapped.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let max_x = mapped.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = mapped.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = mapped.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

    #[allow(clippy::cast_possible_truncation)] // Bounded by the image size after clamping
    let bounds = Rect::new(
        min_x.floor() as i32,
        min_y.floor() as i32,
        (max_x - min_x).ceil() as i32,
        (max_y - min_y).ceil() as i32,
    );
    clamp_rect(bounds, width, height)
}
