//! Head pose from 2D landmarks via Perspective-n-Point.

use crate::{
    constants::{DEFAULT_FOV_DEGREES, HEAD_MODEL_POINTS, NUM_DISTORTION_COEFFS},
    utils::safe_cast::f64_to_pixel,
    Error, Result,
};
use nalgebra::{Rotation3, Vector3};
use opencv::{
    calib3d,
    core::{Mat, Point, Point2f, Point3f, Vec3d, Vector, CV_64F},
    prelude::*,
};

/// Bound on projected coordinates handed to the drawing functions
const MAX_PIXEL_OFFSET: i32 = 1 << 15;

/// Pinhole model of an uncalibrated webcam
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    /// Focal lengths in pixels
    pub fx: f64,
    pub fy: f64,
    /// Optical centre in pixels
    pub cx: f64,
    pub cy: f64,
}

impl CameraModel {
    /// Approximate the intrinsics from the frame size and horizontal field of
    /// view: the optical centre is the frame centre and
    /// `f = cx / tan(fov / 2)`. A 640x480 frame at 60 degrees gives
    /// `f = 554.26`.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is empty or the field of view is not in
    /// `(0, 180)` degrees.
    pub fn from_frame_size(width: i32, height: i32, fov_degrees: f64) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidInput(format!("Invalid frame size {width}x{height}")));
        }
        if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
            return Err(Error::InvalidInput(format!(
                "Field of view must be in (0, 180) degrees, got {fov_degrees}"
            )));
        }

        let cx = f64::from(width) / 2.0;
        let cy = f64::from(height) / 2.0;
        let focal = cx / (fov_degrees / 2.0).to_radians().tan();
        Ok(Self {
            fx: focal,
            fy: focal,
            cx,
            cy,
        })
    }

    /// 3x3 camera matrix
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix cannot be allocated.
    pub fn matrix(&self) -> Result<Mat> {
        Ok(Mat::from_slice_2d(&[
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ])?)
    }
}

impl Default for CameraModel {
    fn default() -> Self {
        Self::from_frame_size(640, 480, DEFAULT_FOV_DEGREES).unwrap_or(Self {
            fx: 554.256,
            fy: 554.256,
            cx: 320.0,
            cy: 240.0,
        })
    }
}

/// Rotation and translation bringing head-model points into the camera frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    /// Rodrigues rotation vector
    pub rotation: Vec3d,
    /// Translation in model units (millimetres)
    pub translation: Vec3d,
}

impl HeadPose {
    /// (roll, pitch, yaw) of the rotation, in degrees
    #[must_use]
    pub fn euler_degrees(&self) -> (f64, f64, f64) {
        let axis = Vector3::new(self.rotation[0], self.rotation[1], self.rotation[2]);
        let (roll, pitch, yaw) = Rotation3::from_scaled_axis(axis).euler_angles();
        (roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
    }
}

/// Head pose estimator using the 11-point anthropometric head model
pub struct PoseEstimator {
    model_points: Vector<Point3f>,
    camera_matrix: Mat,
    dist_coeffs: Mat,
}

impl PoseEstimator {
    /// Create an estimator for the given camera, assuming no lens distortion
    ///
    /// # Errors
    ///
    /// Returns an error if the `OpenCV` matrices cannot be allocated.
    pub fn new(camera: CameraModel) -> Result<Self> {
        log::info!(
            "Initializing PoseEstimator with f={:.2}, c=({:.1}, {:.1})",
            camera.fx,
            camera.cx,
            camera.cy
        );
        let model_points = HEAD_MODEL_POINTS
            .iter()
            .map(|p| Point3f::new(p[0], p[1], p[2]))
            .collect();

        Ok(Self {
            model_points,
            camera_matrix: camera.matrix()?,
            dist_coeffs: Mat::zeros(NUM_DISTORTION_COEFFS, 1, CV_64F)?.to_mat()?,
        })
    }

    /// Solve the head pose from the 11 tracked landmarks, in model order
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The number of points does not match the head model
    /// - The PnP solver does not find a solution
    /// - OpenCV operations fail
    pub fn estimate(&self, image_points: &[Point2f]) -> Result<HeadPose> {
        if image_points.len() != self.model_points.len() {
            return Err(Error::InvalidInput(format!(
                "Expected {} landmarks, got {}",
                self.model_points.len(),
                image_points.len()
            )));
        }
        if image_points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::InvalidInput("Landmarks contain non-finite coordinates".to_string()));
        }

        let image_points: Vector<Point2f> = image_points.iter().copied().collect();
        let mut rvec = Mat::default();
        let mut tvec = Mat::default();

        let solved = calib3d::solve_pnp(
            &self.model_points,
            &image_points,
            &self.camera_matrix,
            &self.dist_coeffs,
            &mut rvec,
            &mut tvec,
            false,
            calib3d::SOLVEPNP_ITERATIVE,
        )?;
        if !solved {
            return Err(Error::InvalidInput("PnP solver found no solution".to_string()));
        }

        Ok(HeadPose {
            rotation: mat_to_vec3d(&rvec)?,
            translation: mat_to_vec3d(&tvec)?,
        })
    }

    /// Project 3D points given in head-model coordinates onto the image
    ///
    /// # Errors
    ///
    /// Returns an error if the projection fails.
    pub fn project_points(&self, pose: &HeadPose, points: &[Point3f]) -> Result<Vec<Point2f>> {
        let object_points: Vector<Point3f> = points.iter().copied().collect();
        let mut projected = Vector::<Point2f>::new();
        calib3d::project_points(
            &object_points,
            &pose.rotation,
            &pose.translation,
            &self.camera_matrix,
            &self.dist_coeffs,
            &mut projected,
            &mut Mat::default(),
            0.0,
        )?;
        Ok(projected.to_vec())
    }

    /// End points of the X, Y and Z head axes of the given length, in pixels.
    /// Points far outside the frame are clamped to a drawable range.
    ///
    /// # Errors
    ///
    /// Returns an error if the projection fails.
    pub fn project_axis(&self, pose: &HeadPose, length: f32) -> Result<[Point; 3]> {
        let axis = [
            Point3f::new(length, 0.0, 0.0),
            Point3f::new(0.0, length, 0.0),
            Point3f::new(0.0, 0.0, length),
        ];
        let projected = self.project_points(pose, &axis)?;
        let to_pixel = |p: &Point2f| {
            Point::new(
                f64_to_pixel(f64::from(p.x), -MAX_PIXEL_OFFSET, MAX_PIXEL_OFFSET),
                f64_to_pixel(f64::from(p.y), -MAX_PIXEL_OFFSET, MAX_PIXEL_OFFSET),
            )
        };
        match projected.as_slice() {
            [x, y, z] => Ok([to_pixel(x), to_pixel(y), to_pixel(z)]),
            other => Err(Error::InvalidInput(format!(
                "Axis projection returned {} points",
                other.len()
            ))),
        }
    }
}

fn mat_to_vec3d(mat: &Mat) -> Result<Vec3d> {
    if mat.total() != 3 {
        return Err(Error::InvalidInput(format!("Expected a 3-vector, got {} values", mat.total())));
    }
    Ok(Vec3d::from([*mat.at::<f64>(0)?, *mat.at::<f64>(1)?, *mat.at::<f64>(2)?]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_from_vga_frame() {
        let camera = CameraModel::from_frame_size(640, 480, 60.0).unwrap();
        assert!((camera.fx - 554.26).abs() < 0.01);
        assert!((camera.fy - camera.fx).abs() < f64::EPSILON);
        assert!((camera.cx - 320.0).abs() < f64::EPSILON);
        assert!((camera.cy - 240.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_camera_rejects_bad_input() {
        assert!(CameraModel::from_frame_size(0, 480, 60.0).is_err());
        assert!(CameraModel::from_frame_size(640, 480, 0.0).is_err());
        assert!(CameraModel::from_frame_size(640, 480, 180.0).is_err());
    }

    #[test]
    fn test_camera_matrix_layout() {
        let matrix = CameraModel::default().matrix().unwrap();
        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.cols(), 3);
        assert!((*matrix.at_2d::<f64>(0, 2).unwrap() - 320.0).abs() < 1e-9);
        assert!((*matrix.at_2d::<f64>(2, 2).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_head_pose_euler_identity() {
        let pose = HeadPose {
            rotation: Vec3d::from([0.0, 0.0, 0.0]),
            translation: Vec3d::from([0.0, 0.0, 500.0]),
        };
        let (roll, pitch, yaw) = pose.euler_degrees();
        assert!(roll.abs() < 1e-9 && pitch.abs() < 1e-9 && yaw.abs() < 1e-9);
    }

    #[test]
    fn test_head_pose_euler_yaw() {
        let pose = HeadPose {
            rotation: Vec3d::from([0.0, 0.0, 30f64.to_radians()]),
            translation: Vec3d::from([0.0, 0.0, 500.0]),
        };
        let (_, _, yaw) = pose.euler_degrees();
        assert!((yaw - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_rejects_wrong_point_count() {
        let estimator = PoseEstimator::new(CameraModel::default()).unwrap();
        let points = vec![Point2f::new(0.0, 0.0); 10];
        assert!(matches!(estimator.estimate(&points), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_estimate_rejects_non_finite_points() {
        let estimator = PoseEstimator::new(CameraModel::default()).unwrap();
        let mut points = vec![Point2f::new(320.0, 240.0); HEAD_MODEL_POINTS.len()];
        points[3] = Point2f::new(f32::NAN, 240.0);
        assert!(matches!(estimator.estimate(&points), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_estimate_recovers_known_pose() {
        let estimator = PoseEstimator::new(CameraModel::default()).unwrap();
        let truth = HeadPose {
            rotation: Vec3d::from([0.1, -0.2, 0.05]),
            translation: Vec3d::from([10.0, -5.0, 800.0]),
        };
        let model: Vec<Point3f> = HEAD_MODEL_POINTS.iter().map(|p| Point3f::new(p[0], p[1], p[2])).collect();
        let image_points = estimator.project_points(&truth, &model).unwrap();

        let pose = estimator.estimate(&image_points).unwrap();
        for i in 0..3 {
            assert!((pose.rotation[i] - truth.rotation[i]).abs() < 1e-2, "rotation {i}");
            assert!((pose.translation[i] - truth.translation[i]).abs() < 1.0, "translation {i}");
        }
    }

    #[test]
    fn test_project_axis_origin_offset() {
        let estimator = PoseEstimator::new(CameraModel::default()).unwrap();
        let pose = HeadPose {
            rotation: Vec3d::from([0.0, 0.0, 0.0]),
            translation: Vec3d::from([0.0, 0.0, 500.0]),
        };
        let [x_end, y_end, z_end] = estimator.project_axis(&pose, 50.0).unwrap();
        // X axis moves right of the optical centre, Y axis moves down
        assert!(x_end.x > 320 && x_end.y == 240);
        assert!(y_end.y > 240 && y_end.x == 320);
        // Z axis points along the optical axis and projects onto the centre
        assert_eq!(z_end, Point::new(320, 240));
    }
}
