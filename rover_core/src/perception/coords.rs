// rover_core/src/perception/coords.rs

//! Conversions between the top-down image, the rover-centric frame and the
//! world grid.
//!
//! Frames used here:
//! - **Image** (`row`, `col`): row 0 at the top of the top-down mask.
//! - **Rover-centric** (`x`, `y`): origin at the bottom-center of the mask,
//!   `x` forward, `y` to the left, in top-down pixels.
//! - **World grid** (`x`, `y`): integer cell indices, clipped into the grid.

use nalgebra::{Point2, Rotation2, Vector2};

use crate::types::{GridCell, Mask, PixelOffset};
use crate::utils::clip;

/// Parallel coordinate lists of the set pixels of one mask, in the
/// rover-centric frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoverCentricPoints {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl RoverCentricPoints {
    /// Collects every nonzero pixel of `mask`: `x = height - row`,
    /// `y = width / 2 - col`.
    pub fn from_mask(mask: &Mask) -> Self {
        let height = mask.height() as f64;
        let half_width = mask.width() as f64 / 2.0;

        let mut points = Self::default();
        for (col, row, px) in mask.enumerate_pixels() {
            if px[0] != 0 {
                points.xs.push(height - row as f64);
                points.ys.push(half_width - col as f64);
            }
        }
        points
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PixelOffset> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }

    /// Distance (pixels) and angle (radians from the forward axis, positive
    /// left) of every point.
    pub fn to_polar(&self) -> (Vec<f64>, Vec<f64>) {
        self.iter()
            .map(|(x, y)| (x.hypot(y), y.atan2(x)))
            .unzip()
    }
}

/// Rotates rover-centric offsets by `yaw_deg` (counter-clockwise).
pub fn rotate(points: &RoverCentricPoints, yaw_deg: f64) -> Vec<Vector2<f64>> {
    let rotation = Rotation2::new(yaw_deg.to_radians());
    points
        .iter()
        .map(|(x, y)| rotation * Vector2::new(x, y))
        .collect()
}

/// Grid cells hit by one class of points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldPoints {
    pub cells: Vec<GridCell>,
}

impl WorldPoints {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Projects rover-centric pixels into world-grid cells for a rover at
/// `position` with heading `yaw_deg`.
///
/// Offsets are rotated, divided by `scale` (pixels per world unit), shifted
/// by the rover position, truncated toward zero and finally clipped into
/// `[0, world_size - 1]` on both axes.
pub fn pix_to_world(
    points: &RoverCentricPoints,
    position: Point2<f64>,
    yaw_deg: f64,
    world_size: usize,
    scale: f64,
) -> WorldPoints {
    let max_index = world_size.saturating_sub(1) as f64;
    let to_cell = |v: f64| clip(v.trunc(), 0.0, max_index) as usize;

    let cells = rotate(points, yaw_deg)
        .into_iter()
        .map(|offset| {
            let world = position + offset / scale;
            (to_cell(world.x), to_cell(world.y))
        })
        .collect();
    WorldPoints { cells }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Luma;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn mask_pixels_map_to_rover_frame() {
        let mut mask = Mask::new(320, 160);
        // Straight ahead, 10 px up from the bottom edge.
        mask.put_pixel(160, 150, Luma([1]));
        // Left of center.
        mask.put_pixel(150, 159, Luma([1]));

        let points = RoverCentricPoints::from_mask(&mask);
        assert_eq!(points.len(), 2);
        let collected: Vec<_> = points.iter().collect();
        assert!(collected.contains(&(10.0, 0.0)));
        assert!(collected.contains(&(1.0, 10.0)));
    }

    #[test]
    fn polar_angles_are_positive_to_the_left() {
        let points = RoverCentricPoints {
            xs: vec![10.0, 10.0],
            ys: vec![0.0, 10.0],
        };
        let (dists, angles) = points.to_polar();
        assert_abs_diff_eq!(dists[0], 10.0);
        assert_abs_diff_eq!(angles[0], 0.0);
        assert_abs_diff_eq!(dists[1], 200.0_f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(angles[1], FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn world_projection_rotates_scales_and_translates() {
        let points = RoverCentricPoints {
            xs: vec![20.0],
            ys: vec![0.0],
        };
        // Facing +y: a point 20 px ahead lands 2 units north.
        let world = pix_to_world(&points, Point2::new(50.5, 60.5), 90.0, 200, 10.0);
        assert_eq!(world.cells, vec![(50, 62)]);
    }

    #[test]
    fn world_projection_clips_to_grid() {
        let points = RoverCentricPoints {
            xs: vec![-5000.0, 5000.0],
            ys: vec![0.0, 0.0],
        };
        let world = pix_to_world(&points, Point2::new(1.0, 1.0), 0.0, 200, 10.0);
        assert_eq!(world.cells, vec![(0, 1), (199, 1)]);
    }
}
