//! Constants used throughout the library

/// Number of facial landmarks produced by the landmark model
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Anthropometric coordinates of the human head, in millimetres.
///
/// X points forward and Y to the left of the subject (ROS convention), the
/// sellion sits at the origin.
pub const P3D_RIGHT_SIDE: [f32; 3] = [-100.0, -77.5, -5.0];
pub const P3D_MENTON: [f32; 3] = [0.0, 0.0, -133.0];
pub const P3D_LEFT_SIDE: [f32; 3] = [-100.0, 77.5, -5.0];
pub const P3D_SELLION: [f32; 3] = [0.0, 0.0, 0.0];
pub const P3D_NOSE: [f32; 3] = [21.0, 0.0, -48.0];
pub const P3D_SUB_NOSE: [f32; 3] = [5.0, 0.0, -55.0];
pub const P3D_RIGHT_EYE: [f32; 3] = [-20.0, -65.5, -5.0];
pub const P3D_RIGHT_TEAR: [f32; 3] = [-10.0, -40.5, -5.0];
pub const P3D_LEFT_TEAR: [f32; 3] = [-10.0, 40.5, -5.0];
pub const P3D_LEFT_EYE: [f32; 3] = [-20.0, 65.5, -5.0];
pub const P3D_STOMION: [f32; 3] = [10.0, 0.0, -75.0];

/// 3D model points in the same order as [`TRACKED_POINTS`]
pub const HEAD_MODEL_POINTS: [[f32; 3]; 11] = [
    P3D_RIGHT_SIDE,
    P3D_MENTON,
    P3D_LEFT_SIDE,
    P3D_SELLION,
    P3D_NOSE,
    P3D_SUB_NOSE,
    P3D_RIGHT_EYE,
    P3D_RIGHT_TEAR,
    P3D_LEFT_TEAR,
    P3D_LEFT_EYE,
    P3D_STOMION,
];

/// Indices of the 68-point landmarks matching [`HEAD_MODEL_POINTS`]
pub const TRACKED_POINTS: [usize; 11] = [0, 8, 16, 27, 30, 33, 36, 39, 42, 45, 62];

/// Index of the sellion in the 68-point landmark set
pub const SELLION_INDEX: usize = 27;

/// Horizontal field of view assumed for an uncalibrated webcam
pub const DEFAULT_FOV_DEGREES: f64 = 60.0;

/// Number of distortion coefficients passed to the PnP solver
pub const NUM_DISTORTION_COEFFS: i32 = 5;

/// Length of the projected head axis, in model units
pub const DEFAULT_AXIS_LENGTH: f32 = 50.0;

/// Frames without a face before the ROI falls back to the whole frame
pub const DEFAULT_ROI_RESET_FRAMES: u32 = 50;

/// The ROI grows by `frame_size / ROI_MARGIN_DIVISOR` around the last face
pub const ROI_MARGIN_DIVISOR: i32 = 10;

/// Histogram bins for the hue and saturation channels
pub const HUE_BINS: i32 = 180;
pub const SATURATION_BINS: i32 = 256;

/// Upper bounds of the OpenCV 8-bit HSV channels
pub const HUE_MAX: u8 = 180;
pub const SATURATION_MAX: u8 = 255;
pub const VALUE_MAX: u8 = 255;

/// Backprojection likelihood kept as foreground
pub const DEFAULT_BACKPROJECTION_THRESHOLD: f64 = 50.0;

/// Default kernel used for convolution, opening and blur
pub const DEFAULT_KERNEL_SIZE: i32 = 5;

/// Default number of opening passes
pub const DEFAULT_MORPH_ITERATIONS: i32 = 1;

/// Skin color range in HSV (Asian and Caucasian skin tones)
pub const SKIN_HSV_MIN: [u8; 3] = [0, 48, 80];
pub const SKIN_HSV_MAX: [u8; 3] = [20, 255, 255];

/// Denoising parameters of the skin detector
pub const SKIN_DENOISE_KERNEL: i32 = 11;
pub const SKIN_DENOISE_ITERATIONS: i32 = 2;
pub const SKIN_DENOISE_BLUR: i32 = 3;

/// Cascade defaults used by the tracking loop
pub const DEFAULT_FRONTAL_SCALE_FACTOR: f64 = 1.10;
pub const DEFAULT_ROTATED_SCALE_FACTOR: f64 = 1.25;
pub const DEFAULT_PROFILE_SCALE_FACTOR: f64 = 1.25;
pub const DEFAULT_MIN_FACE_SIZE: i32 = 40;
pub const DEFAULT_MIN_NEIGHBORS: i32 = 4;
pub const DEFAULT_ROTATION_ANGLE: f64 = 30.0;

/// Key codes that stop the capture loop
pub const KEY_ESCAPE: i32 = 27;
pub const KEY_QUIT: i32 = b'q' as i32;
