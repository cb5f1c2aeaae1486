//! Configuration management for the deepgaze application

use crate::{
    app::GuiMode,
    color_detection::{FilterOptions, HsvRange},
    constants::{
        DEFAULT_AXIS_LENGTH, DEFAULT_BACKPROJECTION_THRESHOLD, DEFAULT_FOV_DEGREES, DEFAULT_FRONTAL_SCALE_FACTOR,
        DEFAULT_KERNEL_SIZE, DEFAULT_MIN_FACE_SIZE, DEFAULT_MIN_NEIGHBORS, DEFAULT_MORPH_ITERATIONS,
        DEFAULT_PROFILE_SCALE_FACTOR, DEFAULT_ROI_RESET_FRAMES, DEFAULT_ROTATED_SCALE_FACTOR, DEFAULT_ROTATION_ANGLE,
        SKIN_HSV_MAX, SKIN_HSV_MIN,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture device settings
    pub camera: CameraConfig,

    /// Face cascade settings
    pub cascade: CascadeConfig,

    /// Landmark model settings
    pub landmarks: LandmarkConfig,

    /// ROI tracking and pose settings
    pub tracking: TrackingConfig,

    /// Color filter post-processing
    pub color_filter: ColorFilterConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Capture device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index
    pub index: i32,

    /// Requested frame width, 0 keeps the device default
    pub width: i32,

    /// Requested frame height, 0 keeps the device default
    pub height: i32,

    /// Horizontal field of view in degrees, used to approximate the intrinsics
    pub fov_degrees: f64,
}

/// Haar cascade configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Frontal face cascade file
    pub frontal_path: PathBuf,

    /// Profile face cascade file
    pub profile_path: PathBuf,

    pub run_frontal: bool,
    pub run_frontal_rotated: bool,
    pub run_left: bool,
    pub run_right: bool,

    pub frontal_scale_factor: f64,
    pub rotated_scale_factor: f64,
    pub left_scale_factor: f64,
    pub right_scale_factor: f64,

    /// Smallest face side in pixels
    pub min_size: i32,

    pub min_neighbors: i32,

    /// Tilt searched by the rotated frontal stages, in degrees
    pub rotation_angle: f64,
}

/// Landmark model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    /// Path to the 68-point landmark ONNX model
    pub model_path: PathBuf,
}

/// Tracking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Frames without a face, counted in total, before the ROI is reset
    pub roi_reset_frames: u32,

    /// Length of the drawn head axis
    pub axis_length: f32,
}

/// Color filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorFilterConfig {
    /// Apply morphological opening to the mask
    pub morph_opening: bool,

    /// Apply Gaussian blur to the mask
    pub blur: bool,

    /// Kernel side for opening and blur (odd)
    pub kernel_size: i32,

    /// Opening iterations
    pub iterations: i32,

    /// Backprojection binarisation threshold
    pub threshold: f64,

    /// Lower HSV bound of the skin detector
    pub skin_min: [u8; 3],

    /// Upper HSV bound of the skin detector
    pub skin_max: [u8; 3],
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Default GUI mode: "all", "video", "mask" or "none"
    pub gui_mode: String,

    /// Draw face, ROI, landmarks and axis
    pub debug: bool,

    /// Main window title
    pub window_name: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 0,
            height: 0,
            fov_degrees: DEFAULT_FOV_DEGREES,
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            frontal_path: PathBuf::from("assets/haarcascade_frontalface_alt.xml"),
            profile_path: PathBuf::from("assets/haarcascade_profileface.xml"),
            run_frontal: true,
            run_frontal_rotated: true,
            run_left: true,
            run_right: true,
            frontal_scale_factor: DEFAULT_FRONTAL_SCALE_FACTOR,
            rotated_scale_factor: DEFAULT_ROTATED_SCALE_FACTOR,
            left_scale_factor: DEFAULT_PROFILE_SCALE_FACTOR,
            right_scale_factor: DEFAULT_PROFILE_SCALE_FACTOR,
            min_size: DEFAULT_MIN_FACE_SIZE,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            rotation_angle: DEFAULT_ROTATION_ANGLE,
        }
    }
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("assets/face_landmarks.onnx"),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            roi_reset_frames: DEFAULT_ROI_RESET_FRAMES,
            axis_length: DEFAULT_AXIS_LENGTH,
        }
    }
}

impl Default for ColorFilterConfig {
    fn default() -> Self {
        Self {
            morph_opening: true,
            blur: true,
            kernel_size: DEFAULT_KERNEL_SIZE,
            iterations: DEFAULT_MORPH_ITERATIONS,
            threshold: DEFAULT_BACKPROJECTION_THRESHOLD,
            skin_min: SKIN_HSV_MIN,
            skin_max: SKIN_HSV_MAX,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            gui_mode: "all".to_string(),
            debug: true,
            window_name: "Video".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Load a configuration file, falling back to the defaults with a warning
    /// when it is missing or invalid
    #[must_use]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let loaded = Self::from_file(&path).and_then(|config| config.validate().map(|()| config));
        match loaded {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.as_ref().display());
                config
            }
            Err(e) => {
                log::warn!(
                    "Ignoring configuration {}: {}, using defaults",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration values. File paths are checked when the
    /// components are built, not here.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(Error::ConfigError(
                "Camera field of view must be between 0 and 180 degrees".to_string(),
            ));
        }
        if self.camera.width < 0 || self.camera.height < 0 {
            return Err(Error::ConfigError("Camera size must not be negative".to_string()));
        }

        // Cascade parameters
        for (name, factor) in [
            ("frontal", self.cascade.frontal_scale_factor),
            ("rotated", self.cascade.rotated_scale_factor),
            ("left", self.cascade.left_scale_factor),
            ("right", self.cascade.right_scale_factor),
        ] {
            if factor <= 1.0 {
                return Err(Error::ConfigError(format!(
                    "The {name} scale factor must be greater than 1.0"
                )));
            }
        }
        if self.cascade.min_size <= 0 {
            return Err(Error::ConfigError("Minimum face size must be greater than 0".to_string()));
        }
        if self.cascade.min_neighbors < 0 {
            return Err(Error::ConfigError("Minimum neighbors must not be negative".to_string()));
        }

        if self.tracking.roi_reset_frames == 0 {
            return Err(Error::ConfigError(
                "ROI reset frames must be greater than 0".to_string(),
            ));
        }
        if self.tracking.axis_length <= 0.0 {
            return Err(Error::ConfigError("Axis length must be greater than 0".to_string()));
        }

        // Color filter
        FilterOptions::from(&self.color_filter)
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid color filter: {e}")))?;
        HsvRange::new(self.color_filter.skin_min, self.color_filter.skin_max)
            .map_err(|e| Error::ConfigError(format!("Invalid skin range: {e}")))?;

        self.display
            .gui_mode
            .parse::<GuiMode>()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# deepgaze configuration

# Capture device
camera:
  index: 0
  width: 0
  height: 0
  fov_degrees: 60.0

# Face cascades
cascade:
  frontal_path: "assets/haarcascade_frontalface_alt.xml"
  profile_path: "assets/haarcascade_profileface.xml"
  run_frontal: true
  run_frontal_rotated: true
  run_left: true
  run_right: true
  frontal_scale_factor: 1.1
  rotated_scale_factor: 1.25
  left_scale_factor: 1.25
  right_scale_factor: 1.25
  min_size: 40
  min_neighbors: 4
  rotation_angle: 30.0

# Landmark model
landmarks:
  model_path: "assets/face_landmarks.onnx"

# ROI tracking and pose
tracking:
  roi_reset_frames: 50
  axis_length: 50.0

# Color filters
color_filter:
  morph_opening: true
  blur: true
  kernel_size: 5
  iterations: 1
  threshold: 50.0
  skin_min: [0, 48, 80]
  skin_max: [20, 255, 255]

# Display settings
display:
  gui_mode: "all"
  debug: true
  window_name: "Video"
"#;
