//! Skin detector: a range detector preset to the HSV interval of human skin.

use crate::{
    color_detection::{apply_mask, gaussian_blur, ColorDetector, FilterOptions, HsvRange, RangeColorDetector},
    constants::{SKIN_DENOISE_BLUR, SKIN_DENOISE_ITERATIONS, SKIN_DENOISE_KERNEL, SKIN_HSV_MAX, SKIN_HSV_MIN},
    Result,
};
use opencv::{
    core::{Mat, Point, Size, BORDER_CONSTANT},
    imgproc,
};

/// Skin pixels sit in H = [0, 20], S = [48, 255], V = [80, 255] for most
/// Asian and Caucasian skin tones.
#[derive(Debug, Clone)]
pub struct RangeSkinDetector {
    inner: RangeColorDetector,
}

impl Default for RangeSkinDetector {
    fn default() -> Self {
        Self {
            inner: RangeColorDetector::new(Self::default_range()),
        }
    }
}

impl RangeSkinDetector {
    /// Detector using the default skin range
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector using a custom range
    #[must_use]
    pub const fn with_range(range: HsvRange) -> Self {
        Self {
            inner: RangeColorDetector::new(range),
        }
    }

    /// The default skin interval
    #[must_use]
    pub const fn default_range() -> HsvRange {
        HsvRange::from_trusted(SKIN_HSV_MIN, SKIN_HSV_MAX)
    }

    /// Replace the range
    pub fn set_range(&mut self, range: HsvRange) {
        self.inner.set_range(range);
    }

    /// Current range
    #[must_use]
    pub const fn range(&self) -> HsvRange {
        self.inner.range()
    }

    /// Frame with non-skin pixels blacked out, no denoising
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a 3-channel BGR image.
    pub fn filter(&self, frame: &Mat) -> Result<Mat> {
        apply_mask(frame, &self.inner.in_range(frame)?)
    }

    /// Raw in-range mask: white where skin was found
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a 3-channel BGR image.
    pub fn raw_mask(&self, frame: &Mat) -> Result<Mat> {
        self.inner.in_range(frame)
    }

    /// Frame with non-skin pixels blacked out after heavy denoising: two
    /// erosions and two dilations with an 11x11 ellipse, then a 3x3 blur.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a 3-channel BGR image or an
    /// `OpenCV` call fails.
    pub fn filter_denoised(&self, frame: &Mat) -> Result<Mat> {
        let mask = self.inner.in_range(frame)?;

        let ellipse = imgproc::get_structuring_element(
            imgproc::MORPH_ELLIPSE,
            Size::new(SKIN_DENOISE_KERNEL, SKIN_DENOISE_KERNEL),
            Point::new(-1, -1),
        )?;
        let border = imgproc::morphology_default_border_value()?;

        let mut eroded = Mat::default();
        imgproc::erode(
            &mask,
            &mut eroded,
            &ellipse,
            Point::new(-1, -1),
            SKIN_DENOISE_ITERATIONS,
            BORDER_CONSTANT,
            border,
        )?;
        let mut dilated = Mat::default();
        imgproc::dilate(
            &eroded,
            &mut dilated,
            &ellipse,
            Point::new(-1, -1),
            SKIN_DENOISE_ITERATIONS,
            BORDER_CONSTANT,
            border,
        )?;

        let smoothed = gaussian_blur(&dilated, SKIN_DENOISE_BLUR)?;
        apply_mask(frame, &smoothed)
    }
}

impl ColorDetector for RangeSkinDetector {
    fn filtered(&self, frame: &Mat, options: &FilterOptions) -> Result<Mat> {
        self.inner.filtered(frame, options)
    }

    fn mask(&self, frame: &Mat, options: &FilterOptions) -> Result<Mat> {
        self.inner.mask(frame, options)
    }
}
