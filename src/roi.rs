//! Region of interest that follows the face between frames.

use crate::{constants::ROI_MARGIN_DIVISOR, utils::clamp_rect};
use opencv::core::Rect;

/// Search window bookkeeping.
///
/// Starts as the whole frame. A face found inside the window becomes the new
/// window, grown by a tenth of the frame size on every side. Misses are
/// counted in total, not only in a row: a found face leaves the count alone.
/// When the count reaches `reset_after` the window goes back to the whole
/// frame and counting starts over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiTracker {
    frame_width: i32,
    frame_height: i32,
    margin_x: i32,
    margin_y: i32,
    reset_after: u32,
    misses: u32,
    roi: Rect,
}

impl RoiTracker {
    #[must_use]
    pub fn new(frame_width: i32, frame_height: i32, reset_after: u32) -> Self {
        let frame_width = frame_width.max(0);
        let frame_height = frame_height.max(0);
        Self {
            frame_width,
            frame_height,
            margin_x: frame_width / ROI_MARGIN_DIVISOR,
            margin_y: frame_height / ROI_MARGIN_DIVISOR,
            reset_after: reset_after.max(1),
            misses: 0,
            roi: Rect::new(0, 0, frame_width, frame_height),
        }
    }

    /// Current search window
    #[must_use]
    pub const fn roi(&self) -> Rect {
        self.roi
    }

    /// Frames without a face since the last reset
    #[must_use]
    pub const fn misses(&self) -> u32 {
        self.misses
    }

    /// Full frame rectangle
    #[must_use]
    pub const fn frame(&self) -> Rect {
        Rect::new(0, 0, self.frame_width, self.frame_height)
    }

    /// Record a face found at `face_in_roi` (coordinates relative to the
    /// current window) and move the window onto it.
    ///
    /// Returns the face in frame coordinates.
    pub fn register_face(&mut self, face_in_roi: Rect) -> Rect {
        let face = clamp_rect(
            Rect::new(
                self.roi.x + face_in_roi.x,
                self.roi.y + face_in_roi.y,
                face_in_roi.width,
                face_in_roi.height,
            ),
            self.frame_width,
            self.frame_height,
        );

        let grown = Rect::new(
            face.x - self.margin_x,
            face.y - self.margin_y,
            face.width + 2 * self.margin_x,
            face.height + 2 * self.margin_y,
        );
        self.roi = clamp_rect(grown, self.frame_width, self.frame_height);
        if self.roi.width <= 0 || self.roi.height <= 0 {
            self.roi = self.frame();
        }
        face
    }

    /// Record a frame without a face. Returns `true` when this miss sent the
    /// window back to the whole frame.
    pub fn register_miss(&mut self) -> bool {
        self.misses += 1;
        if self.misses >= self.reset_after {
            log::debug!("No face for {} frames, resetting ROI", self.misses);
            self.reset();
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.roi = self.frame();
        self.misses = 0;
    }
}
