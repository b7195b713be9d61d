// rover_core/src/types.rs

use image::{GrayImage, RgbImage};

// --- Core Type Aliases ---

/// A raw camera frame. Row 0 is the top of the image.
pub type Frame = RgbImage;

/// A single-channel binary raster. Every pixel is either 0 or 1.
pub type Mask = GrayImage;

/// A point in the rover-centric top-down frame, in pixels.
/// `x` points forward, `y` points left.
pub type PixelOffset = (f64, f64);

/// A clipped world-grid cell index `(x, y)`.
pub type GridCell = (usize, usize);

/// Maximum steering magnitude the rover accepts, in degrees.
pub const MAX_STEER_DEG: f64 = 15.0;
