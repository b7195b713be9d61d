// rover_core/src/perception/roi.rs

//! Polygonal region-of-interest masks.

use image::Luma;

use crate::types::Mask;

/// A closed polygon in pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiPolygon {
    vertices: Vec<[f64; 2]>,
}

impl RoiPolygon {
    pub fn new(vertices: Vec<[f64; 2]>) -> Self {
        Self { vertices }
    }

    /// Scales `[x, y]` fractions of the frame into pixel coordinates.
    pub fn from_fractions(fractions: &[[f64; 2]], width: u32, height: u32) -> Self {
        let vertices = fractions
            .iter()
            .map(|[fx, fy]| [fx * width as f64, fy * height as f64])
            .collect();
        Self { vertices }
    }

    /// Whether the pixel at `(x, y)` is inside the polygon. Pixels lying on an
    /// edge count as inside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let [xi, yi] = self.vertices[i];
            let [xj, yj] = self.vertices[j];

            if on_segment([xi, yi], [xj, yj], [x, y]) {
                return true;
            }

            // Crossing-number test on a ray cast towards +x.
            if (yi > y) != (yj > y) {
                let x_cross = xi + (y - yi) * (xj - xi) / (yj - yi);
                if x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Rasterizes the polygon into a binary mask of the given size.
    pub fn rasterize(&self, width: u32, height: u32) -> Mask {
        Mask::from_fn(width, height, |x, y| {
            Luma([u8::from(self.contains(x as f64, y as f64))])
        })
    }
}

fn on_segment(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> bool {
    const EPS: f64 = 1e-9;
    let cross = (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0]);
    if cross.abs() > EPS {
        return false;
    }
    p[0] >= a[0].min(b[0]) - EPS
        && p[0] <= a[0].max(b[0]) + EPS
        && p[1] >= a[1].min(b[1]) - EPS
        && p[1] <= a[1].max(b[1]) + EPS
}
