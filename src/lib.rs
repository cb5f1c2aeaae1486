//! Color filtering and webcam head pose tracking on top of `OpenCV`.
//!
//! The library provides:
//! - HSV color filters, by histogram backprojection of a template or by a
//!   fixed range, with a skin-color preset
//! - Largest-region utilities for binary masks
//! - A face tracker that searches a chain of Haar cascades inside a moving
//!   region of interest, places 68 landmarks with an ONNX model and solves the
//!   head pose with `PnP` (Perspective-n-Point)
//!
//! # Examples
//!
//! ## Color filtering
//!
//! ```no_run
//! use deepgaze::color_detection::{BackProjectionColorDetector, ColorDetector, FilterOptions};
//! use opencv::imgcodecs;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = imgcodecs::imread("template.png", imgcodecs::IMREAD_COLOR)?;
//! let frame = imgcodecs::imread("frame.png", imgcodecs::IMREAD_COLOR)?;
//!
//! let mut detector = BackProjectionColorDetector::new();
//! detector.set_template(&template)?;
//!
//! let options = FilterOptions::default();
//! let mask = detector.mask(&frame, &options)?;
//! if let Some(center) = detector.max_area_center(&mask)? {
//!     println!("Largest region centered at ({}, {})", center.x, center.y);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Head tracking
//!
//! ```no_run
//! use deepgaze::{
//!     face_detection::{CascadeParams, HaarCascade},
//!     mark_detection::MarkDetector,
//!     tracker::{HeadTracker, TrackerSettings},
//! };
//! use opencv::{core::Mat, prelude::*, videoio};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cascade = HaarCascade::new(
//!     "assets/haarcascade_frontalface_alt.xml",
//!     "assets/haarcascade_profileface.xml",
//! )?;
//! let marks = MarkDetector::new("assets/face_landmarks.onnx")?;
//! let mut tracker = HeadTracker::new(cascade, marks, 640, 480, CascadeParams::default(), TrackerSettings::default())?;
//!
//! let mut cap = videoio::VideoCapture::new(0, videoio::CAP_ANY)?;
//! let mut frame = Mat::default();
//! while cap.read(&mut frame)? {
//!     let result = tracker.process(&frame)?;
//!     if let Some(pose) = result.pose {
//!         let (roll, pitch, yaw) = pose.euler_degrees();
//!         println!("roll {roll:.1} pitch {pitch:.1} yaw {yaw:.1}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// HSV color detectors
pub mod color_detection;

/// Skin color preset
pub mod skin_detection;

/// Largest-contour utilities
pub mod contours;

/// Haar cascade face detection
pub mod face_detection;

/// Facial landmark detection module for finding 68 key points
pub mod mark_detection;

/// Head pose estimation module using `PnP` algorithm
pub mod pose_estimation;

/// Region of interest bookkeeping
pub mod roi;

/// Per-frame face tracking pipeline
pub mod tracker;

/// Drawing helpers for debug overlays
pub mod overlay;

/// Utility functions for rectangles and coordinate transformations
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
