//! Largest-region utilities for binary masks.
//!
//! Contours are retrieved as a flat list (`RETR_LIST`) with simple chain
//! approximation, then reduced to the one enclosing the largest area. Masks
//! with three identical channels, as produced by the backprojection
//! detector, are accepted and reduced to one channel first.

use crate::{utils::safe_cast::f64_to_i32, Error, Result};
use opencv::{
    core::{Mat, Point, Rect, Vector, CV_8U},
    imgproc,
    prelude::*,
};

/// Extract every contour of a mask
///
/// # Errors
///
/// Returns an error if the mask is empty, not 8-bit, or has neither one nor
/// three channels.
pub fn find_contours(mask: &Mat) -> Result<Vector<Vector<Point>>> {
    let single = single_channel(mask)?;
    let mut contours = Vector::<Vector<Point>>::new();
    imgproc::find_contours(
        &single,
        &mut contours,
        imgproc::RETR_LIST,
        imgproc::CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;
    Ok(contours)
}

/// Contour enclosing the largest area, `None` when the mask is blank.
/// Ties keep the first contour found.
///
/// # Errors
///
/// Returns an error if contour extraction fails.
pub fn max_area_contour(mask: &Mat) -> Result<Option<Vec<Point>>> {
    Ok(largest(&find_contours(mask)?)?.map(|contour| contour.to_vec()))
}

/// Centroid of the largest contour.
///
/// A degenerate contour (a line or a single pixel, zero area) has no
/// centroid; the centre of its bounding rectangle is returned instead.
///
/// # Errors
///
/// Returns an error if contour extraction or the moment computation fails.
pub fn max_area_center(mask: &Mat) -> Result<Option<Point>> {
    let Some(contour) = largest(&find_contours(mask)?)? else {
        return Ok(None);
    };

    let moments = imgproc::moments(&contour, false)?;
    if moments.m00.abs() > f64::EPSILON {
        return Ok(Some(Point::new(
            f64_to_i32(moments.m10 / moments.m00)?,
            f64_to_i32(moments.m01 / moments.m00)?,
        )));
    }

    let rect = imgproc::bounding_rect(&contour)?;
    Ok(Some(Point::new(rect.x + rect.width / 2, rect.y + rect.height / 2)))
}

/// Bounding rectangle of the largest contour
///
/// # Errors
///
/// Returns an error if contour extraction fails.
pub fn max_area_rectangle(mask: &Mat) -> Result<Option<Rect>> {
    largest(&find_contours(mask)?)?
        .map(|contour| imgproc::bounding_rect(&contour).map_err(Into::into))
        .transpose()
}

fn largest(contours: &Vector<Vector<Point>>) -> Result<Option<Vector<Point>>> {
    let mut best: Option<(f64, Vector<Point>)> = None;
    for contour in contours {
        let area = imgproc::contour_area(&contour, false)?;
        if best.as_ref().map_or(true, |(best_area, _)| area > *best_area) {
            best = Some((area, contour));
        }
    }
    Ok(best.map(|(_, contour)| contour))
}

fn single_channel(mask: &Mat) -> Result<Mat> {
    if mask.empty() {
        return Err(Error::InvalidInput("Empty mask".to_string()));
    }
    if mask.depth() != CV_8U {
        return Err(Error::InvalidInput(format!("Mask must be 8-bit, got depth {}", mask.depth())));
    }
    match mask.channels() {
        1 => Ok(mask.try_clone()?),
        3 => {
            let mut gray = Mat::default();
            imgproc::cvt_color(mask, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
            Ok(gray)
        }
        n => Err(Error::InvalidInput(format!("Mask must have 1 or 3 channels, got {n}"))),
    }
}
