// rover_core/src/perception/warp.rs

use image::Luma;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::error::{RoverError, RoverResult};
use crate::types::Mask;

/// Solves the homography `H` with `dst ≈ H * src` from exactly four point
/// correspondences, with `H[(2, 2)] = 1`.
pub fn homography_from_corners(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> RoverResult<Matrix3<f64>> {
    // Two rows per correspondence in the unknowns [h0 .. h7]:
    //   [ x  y  1  0  0  0  -u*x  -u*y ] h = u
    //   [ 0  0  0  x  y  1  -v*x  -v*y ] h = v
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for i in 0..4 {
        let [x, y] = src[i];
        let [u, v] = dst[i];
        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let lu = a.lu();
    if lu.determinant().abs() < 1e-9 {
        return Err(RoverError::DegenerateHomography);
    }
    let h = lu.solve(&b).ok_or(RoverError::DegenerateHomography)?;
    if h.iter().any(|v| !v.is_finite()) {
        return Err(RoverError::DegenerateHomography);
    }
    Ok(Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0))
}

/// Projects `(x, y)` through `h`. Returns `None` for points mapped to infinity.
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> Option<[f64; 2]> {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-12 {
        return None;
    }
    Some([p[0] / p[2], p[1] / p[2]])
}

/// The fixed camera-to-top-down unwarp.
///
/// For each output pixel the inverse homography gives the nearest source
/// pixel; the lookup is built once and shared by every mask of every tick.
#[derive(Debug, Clone)]
pub struct PerspectiveWarp {
    homography: Matrix3<f64>,
    width: u32,
    height: u32,
    /// Flat source index for each destination pixel, row-major.
    lookup: Vec<Option<usize>>,
}

impl PerspectiveWarp {
    pub fn new(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4], width: u32, height: u32) -> RoverResult<Self> {
        let homography = homography_from_corners(src, dst)?;
        let inverse = homography
            .try_inverse()
            .ok_or(RoverError::DegenerateHomography)?;

        let mut lookup = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let source = project(&inverse, x as f64, y as f64).and_then(|[sx, sy]| {
                    let (sx, sy) = (sx.round(), sy.round());
                    let in_bounds =
                        sx >= 0.0 && sy >= 0.0 && sx < width as f64 && sy < height as f64;
                    in_bounds.then(|| sy as usize * width as usize + sx as usize)
                });
                lookup.push(source);
            }
        }

        Ok(Self {
            homography,
            width,
            height,
            lookup,
        })
    }

    /// The camera-to-top-down homography.
    pub fn homography(&self) -> &Matrix3<f64> {
        &self.homography
    }

    /// Re-expresses a camera-perspective mask in the top-down view.
    /// Pixels that see outside the camera frame are 0.
    pub fn warp(&self, mask: &Mask) -> Mask {
        debug_assert_eq!(mask.dimensions(), (self.width, self.height));
        let raw = mask.as_raw();
        let width = self.width as usize;
        Mask::from_fn(self.width, self.height, |x, y| {
            let value = self.lookup[y as usize * width + x as usize]
                .and_then(|idx| raw.get(idx).copied())
                .unwrap_or(0);
            Luma([value])
        })
    }
}
