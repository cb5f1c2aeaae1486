//! Debug drawing on frames.

use crate::{tracker::HeadAxis, utils::label_anchor, Result};
use opencv::{
    core::{Mat, Point, Point2f, Rect, Scalar},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
};

/// Green, used for the face
pub const FACE_COLOR: [f64; 3] = [0.0, 255.0, 0.0];
/// Yellow, used for the ROI
pub const ROI_COLOR: [f64; 3] = [0.0, 255.0, 255.0];
/// Red, used for landmarks and the X axis
pub const LANDMARK_COLOR: [f64; 3] = [0.0, 0.0, 255.0];

const AXIS_X_COLOR: [f64; 3] = [0.0, 0.0, 255.0];
const AXIS_Y_COLOR: [f64; 3] = [0.0, 255.0, 0.0];
const AXIS_Z_COLOR: [f64; 3] = [255.0, 0.0, 0.0];
const AXIS_THICKNESS: i32 = 3;
const RECT_THICKNESS: i32 = 2;
const LABEL_SCALE: f64 = 0.5;
const LANDMARK_RADIUS: i32 = 2;

/// `OpenCV` scalar from a BGR triple
#[must_use]
pub fn bgr(color: [f64; 3]) -> Scalar {
    Scalar::new(color[0], color[1], color[2], 0.0)
}

/// Rectangle with a text label 3 px above its top-left corner
///
/// # Errors
///
/// Returns an error if drawing fails.
pub fn draw_labelled_rect(frame: &mut Mat, rect: Rect, label: &str, color: Scalar) -> Result<()> {
    imgproc::put_text(
        frame,
        label,
        label_anchor(rect),
        FONT_HERSHEY_SIMPLEX,
        LABEL_SCALE,
        color,
        1,
        LINE_8,
        false,
    )?;
    imgproc::rectangle(frame, rect, color, RECT_THICKNESS, LINE_8, 0)?;
    Ok(())
}

/// Filled dot on every landmark
///
/// # Errors
///
/// Returns an error if drawing fails.
#[allow(clippy::cast_possible_truncation)] // Landmarks lie inside the frame
pub fn draw_landmarks(frame: &mut Mat, points: &[Point2f]) -> Result<()> {
    for point in points {
        imgproc::circle(
            frame,
            Point::new(point.x as i32, point.y as i32),
            LANDMARK_RADIUS,
            bgr(LANDMARK_COLOR),
            -1,
            LINE_8,
            0,
        )?;
    }
    Ok(())
}

/// Head axis from the sellion: Y green, Z blue, X red (drawn in that order)
///
/// # Errors
///
/// Returns an error if drawing fails.
pub fn draw_axis(frame: &mut Mat, axis: &HeadAxis) -> Result<()> {
    for (end, color) in [(axis.y, AXIS_Y_COLOR), (axis.z, AXIS_Z_COLOR), (axis.x, AXIS_X_COLOR)] {
        imgproc::line(frame, axis.origin, end, bgr(color), AXIS_THICKNESS, LINE_8, 0)?;
    }
    Ok(())
}
