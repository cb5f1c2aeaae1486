//! Color detectors working in the HSV color space.
//!
//! Two strategies are provided:
//! - [`BackProjectionColorDetector`] learns a hue/saturation histogram from a
//!   template image and keeps the pixels whose color is likely under that
//!   histogram (Swain & Ballard histogram backprojection).
//! - [`RangeColorDetector`] keeps the pixels whose HSV value lies inside a
//!   fixed [`HsvRange`].
//!
//! Both share the same denoising knobs ([`FilterOptions`]) and implement
//! [`ColorDetector`], which also exposes the largest-region helpers from
//! [`crate::contours`].

use crate::{
    config::ColorFilterConfig,
    constants::{
        DEFAULT_BACKPROJECTION_THRESHOLD, DEFAULT_KERNEL_SIZE, DEFAULT_MORPH_ITERATIONS, HUE_BINS, HUE_MAX,
        SATURATION_BINS,
    },
    contours, Error, Result,
};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size, Vector, BORDER_CONSTANT, BORDER_DEFAULT, CV_8U, NORM_MINMAX},
    imgproc,
    prelude::*,
};

/// Inclusive HSV interval using the `OpenCV` 8-bit convention
/// (H in `[0, 180]`, S and V in `[0, 255]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    min: [u8; 3],
    max: [u8; 3],
}

impl HsvRange {
    /// Create a validated range
    ///
    /// # Errors
    ///
    /// Returns an error if a hue bound exceeds 180 or if any `min` component
    /// is greater than the matching `max` component.
    pub fn new(min: [u8; 3], max: [u8; 3]) -> Result<Self> {
        if min[0] > HUE_MAX || max[0] > HUE_MAX {
            return Err(Error::InvalidInput(format!(
                "Hue bounds must be within [0, {HUE_MAX}], got {} and {}",
                min[0], max[0]
            )));
        }
        if let Some(channel) = (0..3).find(|&i| min[i] > max[i]) {
            return Err(Error::InvalidInput(format!(
                "HSV range min {:?} exceeds max {:?} on channel {channel}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Build a range from bounds already known to be ordered
    pub(crate) const fn from_trusted(min: [u8; 3], max: [u8; 3]) -> Self {
        Self { min, max }
    }

    /// Lower bound
    #[must_use]
    pub const fn min(&self) -> [u8; 3] {
        self.min
    }

    /// Upper bound
    #[must_use]
    pub const fn max(&self) -> [u8; 3] {
        self.max
    }

    /// Whether an HSV triple falls inside the range
    #[must_use]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| (self.min[i]..=self.max[i]).contains(&hsv[i]))
    }

    fn lower(&self) -> Scalar {
        Scalar::new(f64::from(self.min[0]), f64::from(self.min[1]), f64::from(self.min[2]), 0.0)
    }

    fn upper(&self) -> Scalar {
        Scalar::new(f64::from(self.max[0]), f64::from(self.max[1]), f64::from(self.max[2]), 0.0)
    }
}

/// Denoising parameters shared by the color detectors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOptions {
    /// Erosion followed by dilation to remove speckles
    pub morph_opening: bool,
    /// Gaussian blur to smooth the mask edges
    pub blur: bool,
    /// Side of the square kernel used for convolution, opening and blur
    pub kernel_size: i32,
    /// Number of opening passes
    pub iterations: i32,
    /// Backprojection likelihood kept as foreground (0-255)
    pub threshold: f64,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            morph_opening: true,
            blur: true,
            kernel_size: DEFAULT_KERNEL_SIZE,
            iterations: DEFAULT_MORPH_ITERATIONS,
            threshold: DEFAULT_BACKPROJECTION_THRESHOLD,
        }
    }
}

impl From<&ColorFilterConfig> for FilterOptions {
    fn from(config: &ColorFilterConfig) -> Self {
        Self {
            morph_opening: config.morph_opening,
            blur: config.blur,
            kernel_size: config.kernel_size,
            iterations: config.iterations,
            threshold: config.threshold,
        }
    }
}

impl FilterOptions {
    /// Options with opening and blur disabled
    #[must_use]
    pub fn raw() -> Self {
        Self {
            morph_opening: false,
            blur: false,
            ..Self::default()
        }
    }

    /// Check the options against what the `OpenCV` kernels accept
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel size is not a positive odd number, if
    /// opening is enabled with fewer than one iteration, or if the threshold
    /// is outside `[0, 255]`.
    pub fn validate(&self) -> Result<()> {
        if self.kernel_size <= 0 || self.kernel_size % 2 == 0 {
            return Err(Error::InvalidInput(format!(
                "Kernel size must be a positive odd number, got {}",
                self.kernel_size
            )));
        }
        if self.morph_opening && self.iterations < 1 {
            return Err(Error::InvalidInput(format!(
                "Opening needs at least one iteration, got {}",
                self.iterations
            )));
        }
        if !(0.0..=255.0).contains(&self.threshold) {
            return Err(Error::InvalidInput(format!(
                "Threshold must be between 0 and 255, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Common interface of the HSV detectors
pub trait ColorDetector {
    /// Return the frame with every pixel outside the detected color set to black
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a 3-channel BGR image or an
    /// `OpenCV` call fails.
    fn filtered(&self, frame: &Mat, options: &FilterOptions) -> Result<Mat>;

    /// Return the black/white mask of the detected color
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a 3-channel BGR image or an
    /// `OpenCV` call fails.
    fn mask(&self, frame: &Mat, options: &FilterOptions) -> Result<Mat>;

    /// Centroid of the largest region of a mask returned by [`Self::mask`]
    ///
    /// # Errors
    ///
    /// Returns an error if contour extraction fails.
    fn max_area_center(&self, mask: &Mat) -> Result<Option<Point>> {
        contours::max_area_center(mask)
    }

    /// Largest region of a mask returned by [`Self::mask`]
    ///
    /// # Errors
    ///
    /// Returns an error if contour extraction fails.
    fn max_area_contour(&self, mask: &Mat) -> Result<Option<Vec<Point>>> {
        contours::max_area_contour(mask)
    }

    /// Bounding rectangle of the largest region of a mask
    ///
    /// # Errors
    ///
    /// Returns an error if contour extraction fails.
    fn max_area_rectangle(&self, mask: &Mat) -> Result<Option<Rect>> {
        contours::max_area_rectangle(mask)
    }
}

/// Histogram backprojection detector.
///
/// The template can be a region of interest of the frame or any image showing
/// the color scheme to isolate. It is stored in HSV.
#[derive(Default)]
pub struct BackProjectionColorDetector {
    template_hsv: Option<Mat>,
}

impl BackProjectionColorDetector {
    /// Create a detector without a template
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the BGR image used as color template
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not a 3-channel image.
    pub fn set_template(&mut self, template_bgr: &Mat) -> Result<()> {
        self.template_hsv = Some(bgr_to_hsv(template_bgr)?);
        Ok(())
    }

    /// Return the template converted back to BGR, if one is set
    ///
    /// # Errors
    ///
    /// Returns an error if the color conversion fails.
    pub fn template(&self) -> Result<Option<Mat>> {
        self.template_hsv
            .as_ref()
            .map(|hsv| -> Result<Mat> {
                let mut bgr = Mat::default();
                imgproc::cvt_color(hsv, &mut bgr, imgproc::COLOR_HSV2BGR, 0)?;
                Ok(bgr)
            })
            .transpose()
    }

    /// Whether a template has been set
    #[must_use]
    pub fn has_template(&self) -> bool {
        self.template_hsv.is_some()
    }

    /// Per-pixel likelihood (0-255) that the frame color belongs to the template
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTemplate`] without a template, or an error if
    /// the frame is not a 3-channel image.
    pub fn backproject(&self, frame: &Mat) -> Result<Mat> {
        let template_hsv = self.template_hsv.as_ref().ok_or(Error::MissingTemplate)?;
        let frame_hsv = bgr_to_hsv(frame)?;

        let channels = Vector::<i32>::from_slice(&[0, 1]);
        let ranges = Vector::<f32>::from_slice(&[0.0, f32::from(HUE_MAX), 0.0, 256.0]);

        let mut template_images = Vector::<Mat>::new();
        template_images.push(template_hsv.try_clone()?);
        let mut histogram = Mat::default();
        imgproc::calc_hist(
            &template_images,
            &channels,
            &Mat::default(),
            &mut histogram,
            &Vector::<i32>::from_slice(&[HUE_BINS, SATURATION_BINS]),
            &ranges,
            false,
        )?;

        let mut normalized = Mat::default();
        core::normalize(&histogram, &mut normalized, 0.0, 255.0, NORM_MINMAX, -1, &Mat::default())?;

        let mut frame_images = Vector::<Mat>::new();
        frame_images.push(frame_hsv);
        let mut likelihood = Mat::default();
        imgproc::calc_back_project(&frame_images, &channels, &normalized, &mut likelihood, &ranges, 1.0)?;

        Ok(likelihood)
    }

    /// Backprojection, convolution, denoising and threshold: single channel
    fn threshold(&self, frame: &Mat, options: &FilterOptions) -> Result<Mat> {
        options.validate()?;
        let likelihood = self.backproject(frame)?;

        let disc = imgproc::get_structuring_element(
            imgproc::MORPH_ELLIPSE,
            Size::new(options.kernel_size, options.kernel_size),
            Point::new(-1, -1),
        )?;
        let mut convolved = Mat::default();
        imgproc::filter_2d(&likelihood, &mut convolved, -1, &disc, Point::new(-1, -1), 0.0, BORDER_DEFAULT)?;

        let denoised = denoise(convolved, options)?;

        let mut binary = Mat::default();
        imgproc::threshold(&denoised, &mut binary, options.threshold, 255.0, imgproc::THRESH_BINARY)?;
        Ok(binary)
    }
}

impl ColorDetector for BackProjectionColorDetector {
    fn filtered(&self, frame: &Mat, options: &FilterOptions) -> Result<Mat> {
        let mask = self.mask(frame, options)?;
        let mut output = Mat::default();
        core::bitwise_and(frame, &mask, &mut output, &Mat::default())?;
        Ok(output)
    }

    /// The mask has three identical channels so it can be combined with the
    /// BGR frame directly.
    fn mask(&self, frame: &Mat, options: &FilterOptions) -> Result<Mat> {
        let binary = self.threshold(frame, options)?;
        merge_three(&binary)
    }
}

/// Fixed-range HSV detector.
///
/// Hue and saturation characterise the color independently of the
/// illumination, which is carried by the value channel.
#[derive(Debug, Clone)]
pub struct RangeColorDetector {
    range: HsvRange,
}

impl RangeColorDetector {
    /// Create a detector for the given range
    #[must_use]
    pub const fn new(range: HsvRange) -> Self {
        Self { range }
    }

    /// Replace the range
    pub fn set_range(&mut self, range: HsvRange) {
        self.range = range;
    }

    /// Current range
    #[must_use]
    pub const fn range(&self) -> HsvRange {
        self.range
    }

    /// Raw in-range mask, no denoising
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a 3-channel image.
    pub fn in_range(&self, frame: &Mat) -> Result<Mat> {
        let hsv = bgr_to_hsv(frame)?;
        let mut mask = Mat::default();
        core::in_range(&hsv, &self.range.lower(), &self.range.upper(), &mut mask)?;
        Ok(mask)
    }
}

impl ColorDetector for RangeColorDetector {
    fn filtered(&self, frame: &Mat, options: &FilterOptions) -> Result<Mat> {
        let mask = self.mask(frame, options)?;
        apply_mask(frame, &mask)
    }

    /// Single-channel mask. With blur enabled the edges are soft (0-255), not
    /// strictly binary.
    fn mask(&self, frame: &Mat, options: &FilterOptions) -> Result<Mat> {
        options.validate()?;
        denoise(self.in_range(frame)?, options)
    }
}

/// Convert a BGR frame to HSV
pub(crate) fn bgr_to_hsv(frame: &Mat) -> Result<Mat> {
    ensure_bgr(frame)?;
    let mut hsv = Mat::default();
    imgproc::cvt_color(frame, &mut hsv, imgproc::COLOR_BGR2HSV, 0)?;
    Ok(hsv)
}

fn ensure_bgr(frame: &Mat) -> Result<()> {
    if frame.empty() {
        return Err(Error::InvalidInput("Empty frame".to_string()));
    }
    if frame.channels() != 3 || frame.depth() != CV_8U {
        return Err(Error::InvalidInput(format!(
            "Expected an 8-bit 3-channel BGR frame, got {} channel(s) of depth {}",
            frame.channels(),
            frame.depth()
        )));
    }
    Ok(())
}

/// Opening with a square kernel of ones, then Gaussian blur, as enabled
fn denoise(mask: Mat, options: &FilterOptions) -> Result<Mat> {
    let mut mask = mask;
    if options.morph_opening {
        mask = morph_open(&mask, options.kernel_size, options.iterations)?;
    }
    if options.blur {
        mask = gaussian_blur(&mask, options.kernel_size)?;
    }
    Ok(mask)
}

pub(crate) fn morph_open(mask: &Mat, kernel_size: i32, iterations: i32) -> Result<Mat> {
    let kernel = Mat::ones(kernel_size, kernel_size, CV_8U)?.to_mat()?;
    let mut opened = Mat::default();
    imgproc::morphology_ex(
        mask,
        &mut opened,
        imgproc::MORPH_OPEN,
        &kernel,
        Point::new(-1, -1),
        iterations,
        BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;
    Ok(opened)
}

pub(crate) fn gaussian_blur(mask: &Mat, kernel_size: i32) -> Result<Mat> {
    let mut blurred = Mat::default();
    imgproc::gaussian_blur(
        mask,
        &mut blurred,
        Size::new(kernel_size, kernel_size),
        0.0,
        0.0,
        BORDER_DEFAULT,
    )?;
    Ok(blurred)
}

/// Keep the frame pixels where the single-channel mask is non-zero
pub(crate) fn apply_mask(frame: &Mat, mask: &Mat) -> Result<Mat> {
    let mut output = Mat::default();
    core::bitwise_and(frame, frame, &mut output, mask)?;
    Ok(output)
}

fn merge_three(channel: &Mat) -> Result<Mat> {
    let mut planes = Vector::<Mat>::new();
    for _ in 0..3 {
        planes.push(channel.try_clone()?);
    }
    let mut merged = Mat::default();
    core::merge(&planes, &mut merged)?;
    Ok(merged)
}
