//! Main application module: capture loop, windows and the processing modes.

use crate::{
    color_detection::{BackProjectionColorDetector, ColorDetector, FilterOptions, HsvRange, RangeColorDetector},
    config::Config,
    constants::{KEY_ESCAPE, KEY_QUIT},
    error::{Error, Result},
    face_detection::{CascadeParams, HaarCascade},
    mark_detection::MarkDetector,
    overlay::{self, bgr, FACE_COLOR, ROI_COLOR},
    skin_detection::RangeSkinDetector,
    tracker::{HeadTracker, TrackResult, TrackerSettings},
};
use log::{debug, info, warn};
use opencv::{
    core::{self, Mat},
    highgui::{self, WINDOW_AUTOSIZE},
    imgcodecs,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

/// Consecutive failed camera reads before giving up
const MAX_READ_FAILURES: u32 = 30;

/// Title of the mask window
const MASK_WINDOW: &str = "Mask";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Camera index or video file path
    pub video_source: VideoSource,
    /// What to do with each frame
    pub mode: AppMode,
    /// GUI display mode
    pub gui_mode: GuiMode,
    /// Draw debug overlays and log per-frame results
    pub debug: bool,
    /// Values loaded from the configuration file
    pub settings: Config,
}

/// Video source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// Processing applied to each frame
#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    /// Face tracking with landmarks and head pose
    HeadPose,
    /// Skin filter with the configured skin range
    Skin,
    /// Filter on a fixed HSV range
    Color(HsvRange),
    /// Filter on the colors of a template image
    BackProjection(PathBuf),
}

/// GUI display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiMode {
    /// Show the video and the mask windows
    All,
    /// Show the video window only
    Video,
    /// Show the mask window only
    Mask,
    /// No GUI (headless)
    None,
}

impl GuiMode {
    const fn shows_video(self) -> bool {
        matches!(self, Self::All | Self::Video)
    }

    const fn shows_mask(self) -> bool {
        matches!(self, Self::All | Self::Mask)
    }
}

impl FromStr for GuiMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "video" | "cam" => Ok(Self::Video),
            "mask" => Ok(Self::Mask),
            "none" => Ok(Self::None),
            other => Err(Error::InvalidInput(format!("Unknown GUI mode '{other}'"))),
        }
    }
}

/// Per-mode processing state
enum Pipeline {
    HeadPose(Box<HeadTracker<HaarCascade, MarkDetector>>),
    Color {
        detector: Box<dyn ColorDetector>,
        label: &'static str,
    },
}

/// What one frame produced for display
struct FrameOutput {
    view: Mat,
    mask: Option<Mat>,
}

/// Main application struct
pub struct App {
    config: AppConfig,
    video_capture: VideoCapture,
    first_frame: Option<Mat>,
    pipeline: Pipeline,
    filter_options: FilterOptions,
    window_name: String,
}

impl App {
    /// Open the video source and build the components of the selected mode
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The video source cannot be opened or yields no frame
    /// - A cascade, model or template file is missing or invalid
    /// - The configured filter options are invalid
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing deepgaze application in {:?} mode", config.mode);

        let mut video_capture = open_capture(&config)?;

        // The first frame gives the frame size for the camera model
        let mut first_frame = Mat::default();
        if !video_capture.read(&mut first_frame)? || first_frame.empty() {
            return Err(Error::VideoSource("No frame could be read from the video source".to_string()));
        }
        let frame_width = first_frame.cols();
        let frame_height = first_frame.rows();
        info!("Frame size {}x{}", frame_width, frame_height);

        let filter_options = FilterOptions::from(&config.settings.color_filter);
        filter_options.validate()?;

        let pipeline = build_pipeline(&config, frame_width, frame_height)?;

        let window_name = config.settings.display.window_name.clone();
        if config.gui_mode.shows_video() {
            highgui::named_window(&window_name, WINDOW_AUTOSIZE)?;
        }
        if config.gui_mode.shows_mask() && !matches!(pipeline, Pipeline::HeadPose(_)) {
            highgui::named_window(MASK_WINDOW, WINDOW_AUTOSIZE)?;
        }

        Ok(Self {
            config,
            video_capture,
            first_frame: Some(first_frame),
            pipeline,
            filter_options,
            window_name,
        })
    }

    /// Run the main application loop until the source ends or the user quits
    ///
    /// # Errors
    ///
    /// Returns an error if a frame cannot be processed or displayed, or the
    /// camera stops delivering frames.
    pub fn run(&mut self) -> Result<()> {
        info!("Starting main application loop");

        let start_time = Instant::now();
        let mut frame_count: u64 = 0;
        let mut read_failures = 0;

        loop {
            let frame = if let Some(frame) = self.first_frame.take() {
                frame
            } else {
                let mut frame = Mat::default();
                if !self.video_capture.read(&mut frame)? || frame.empty() {
                    if matches!(self.config.video_source, VideoSource::File(_)) {
                        info!("End of video file reached");
                        break;
                    }
                    read_failures += 1;
                    if read_failures >= MAX_READ_FAILURES {
                        return Err(Error::VideoSource(format!(
                            "Camera returned no frame {read_failures} times in a row"
                        )));
                    }
                    warn!("Failed to read frame, retrying...");
                    continue;
                }
                frame
            };
            read_failures = 0;

            let output = self.process_frame(frame)?;
            frame_count += 1;

            if self.config.gui_mode != GuiMode::None {
                self.display(&output)?;

                let key = highgui::wait_key(1)?;
                if key == KEY_ESCAPE || key == KEY_QUIT {
                    info!("Exit requested by user");
                    break;
                }
            }
        }

        #[allow(clippy::cast_precision_loss)] // Frame counts stay far below 2^52
        let fps = frame_count as f64 / start_time.elapsed().as_secs_f64().max(f64::EPSILON);
        info!("Processed {} frames ({:.1} FPS), shutting down", frame_count, fps);
        Ok(())
    }

    /// Process a single frame
    fn process_frame(&mut self, mut frame: Mat) -> Result<FrameOutput> {
        match &mut self.pipeline {
            Pipeline::HeadPose(tracker) => {
                let result = tracker.process(&frame)?;
                if result.roi_reset {
                    debug!("ROI reset to the full frame");
                }
                if self.config.debug {
                    draw_tracking(&mut frame, &result)?;
                }
                Ok(FrameOutput { view: frame, mask: None })
            }
            Pipeline::Color { detector, label } => {
                let mask = detector.mask(&frame, &self.filter_options)?;
                let mut view = masked(&frame, &mask)?;
                if self.config.debug {
                    if let Some(rect) = detector.max_area_rectangle(&mask)? {
                        debug!("{}: largest region {:?}", label, rect);
                        overlay::draw_labelled_rect(&mut view, rect, label, bgr(FACE_COLOR))?;
                    }
                }
                Ok(FrameOutput { view, mask: Some(mask) })
            }
        }
    }

    fn display(&self, output: &FrameOutput) -> Result<()> {
        if self.config.gui_mode.shows_video() {
            highgui::imshow(&self.window_name, &output.view)?;
        }
        if self.config.gui_mode.shows_mask() {
            if let Some(mask) = &output.mask {
                highgui::imshow(MASK_WINDOW, mask)?;
            }
        }
        Ok(())
    }
}

fn open_capture(config: &AppConfig) -> Result<VideoCapture> {
    let mut video_capture = match &config.video_source {
        VideoSource::Camera(index) => {
            info!("Opening camera {}", index);
            let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;

            // Reduce buffer size for lower latency (webcam only)
            cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
            cap
        }
        VideoSource::File(path) => {
            info!("Opening video file: {}", path);
            VideoCapture::from_file(path, videoio::CAP_ANY)?
        }
    };

    if !video_capture.is_opened()? {
        return Err(Error::VideoSource(format!("Cannot open {:?}", config.video_source)));
    }

    let camera = &config.settings.camera;
    if matches!(config.video_source, VideoSource::Camera(_)) && camera.width > 0 && camera.height > 0 {
        video_capture.set(CAP_PROP_FRAME_WIDTH, f64::from(camera.width))?;
        video_capture.set(CAP_PROP_FRAME_HEIGHT, f64::from(camera.height))?;
    }
    Ok(video_capture)
}

fn build_pipeline(config: &AppConfig, frame_width: i32, frame_height: i32) -> Result<Pipeline> {
    let settings = &config.settings;
    match &config.mode {
        AppMode::HeadPose => {
            let cascade = HaarCascade::new(&settings.cascade.frontal_path, &settings.cascade.profile_path)?;
            let marks = MarkDetector::new(&settings.landmarks.model_path)?;
            let tracker = HeadTracker::new(
                cascade,
                marks,
                frame_width,
                frame_height,
                CascadeParams::from(&settings.cascade),
                TrackerSettings {
                    axis_length: settings.tracking.axis_length,
                    roi_reset_frames: settings.tracking.roi_reset_frames,
                    fov_degrees: settings.camera.fov_degrees,
                },
            )?;
            Ok(Pipeline::HeadPose(Box::new(tracker)))
        }
        AppMode::Skin => {
            let range = HsvRange::new(settings.color_filter.skin_min, settings.color_filter.skin_max)?;
            Ok(Pipeline::Color {
                detector: Box::new(RangeSkinDetector::with_range(range)),
                label: "SKIN",
            })
        }
        AppMode::Color(range) => Ok(Pipeline::Color {
            detector: Box::new(RangeColorDetector::new(*range)),
            label: "COLOR",
        }),
        AppMode::BackProjection(path) => {
            let template = load_template(path)?;
            let mut detector = BackProjectionColorDetector::new();
            detector.set_template(&template)?;
            Ok(Pipeline::Color {
                detector: Box::new(detector),
                label: "TEMPLATE",
            })
        }
    }
}

/// Read a BGR template image
///
/// # Errors
///
/// Returns an error if the file is missing or cannot be decoded.
pub fn load_template(path: &std::path::Path) -> Result<Mat> {
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::InvalidInput(format!("Template path is not valid UTF-8: {}", path.display())))?;
    let template = imgcodecs::imread(path_str, imgcodecs::IMREAD_COLOR)?;
    if template.empty() {
        return Err(Error::InvalidInput(format!("Cannot read template image {}", path.display())));
    }
    info!("Loaded {}x{} template from {}", template.cols(), template.rows(), path.display());
    Ok(template)
}

/// Frame pixels kept by a one- or three-channel mask
fn masked(frame: &Mat, mask: &Mat) -> Result<Mat> {
    let mut output = Mat::default();
    if mask.channels() == 1 {
        core::bitwise_and(frame, frame, &mut output, mask)?;
    } else {
        core::bitwise_and(frame, mask, &mut output, &Mat::default())?;
    }
    Ok(output)
}

/// Face, landmarks and axis under the ROI
fn draw_tracking(frame: &mut Mat, result: &TrackResult) -> Result<()> {
    if let Some(face) = result.face {
        overlay::draw_labelled_rect(frame, face, "FACE", bgr(FACE_COLOR))?;
    }
    if let Some(landmarks) = &result.landmarks {
        overlay::draw_landmarks(frame, &landmarks.tracked_points())?;
    }
    if let Some(axis) = &result.axis {
        overlay::draw_axis(frame, axis)?;
    }
    if let Some(pose) = &result.pose {
        let (roll, pitch, yaw) = pose.euler_degrees();
        debug!("Head pose roll {:.1} pitch {:.1} yaw {:.1}", roll, pitch, yaw);
    }
    overlay::draw_labelled_rect(frame, result.roi, "ROI", bgr(ROI_COLOR))?;
    Ok(())
}
