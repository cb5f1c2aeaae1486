//! Checked numeric conversions at the `OpenCV` boundary

use crate::{Error, Result};

/// Convert a collection length or index to an `OpenCV` `i32`
///
/// # Errors
///
/// Returns an error if the value exceeds `i32::MAX`
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Convert an `f64` to `i32`, truncating toward zero
///
/// # Errors
///
/// Returns an error if the value is not finite or outside the `i32` range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
pub fn f64_to_i32(value: f64) -> Result<i32> {
    if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Ok(value as i32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to i32"
        )))
    }
}

/// Convert a sub-pixel coordinate to a drawable pixel coordinate.
///
/// Projected points can land far outside the frame when the pose is
/// degenerate; the value is clamped to `[min, max]` and non-finite input maps
/// to `min`.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f64_to_pixel(value: f64, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    (value.clamp(f64::from(min), f64::from(max)) as i32).clamp(min, max)
}
