//! Utility functions for rectangle bookkeeping and coordinate transformations.

pub mod safe_cast;

use opencv::core::{Point, Point2f, Rect};

/// Build a rectangle from two corners, clamping both to a `width` x `height`
/// frame.
///
/// Corners may be given in any order. The result can be empty when the
/// corners fall outside the frame on the same side.
#[must_use]
pub fn rect_from_corners_clamped(x1: i32, y1: i32, x2: i32, y2: i32, width: i32, height: i32) -> Rect {
    let (left, right) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
    let (top, bottom) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };

    let left = left.clamp(0, width);
    let right = right.clamp(0, width);
    let top = top.clamp(0, height);
    let bottom = bottom.clamp(0, height);

    Rect::new(left, top, right - left, bottom - top)
}

/// Intersect a rectangle with the frame bounds
#[must_use]
pub fn clamp_rect(rect: Rect, width: i32, height: i32) -> Rect {
    rect_from_corners_clamped(rect.x, rect.y, rect.x + rect.width, rect.y + rect.height, width, height)
}

/// Rotate `point` around `center` by `angle_degrees`, counter-clockwise in
/// image coordinates (the same convention as `getRotationMatrix2D`).
#[must_use]
pub fn rotate_point(point: Point2f, center: Point2f, angle_degrees: f64) -> Point2f {
    let rotation = nalgebra::Rotation2::new(-angle_degrees.to_radians());
    let offset = nalgebra::Vector2::new(f64::from(point.x - center.x), f64::from(point.y - center.y));
    let rotated = rotation * offset;

    #[allow(clippy::cast_possible_truncation)] // Pixel coordinates fit in f32
    Point2f::new(center.x + rotated.x as f32, center.y + rotated.y as f32)
}

/// Anchor for a text label drawn just above a rectangle
#[must_use]
pub fn label_anchor(rect: Rect) -> Point {
    Point::new(rect.x, (rect.y - 3).max(0))
}
