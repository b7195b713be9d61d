// rover_core/src/mapping/mod.rs

//! The persistent world map: three hit counters per grid cell.

use image::{Rgb, RgbImage};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::perception::coords::WorldPoints;
use crate::perception::WorldObservations;
use crate::utils::wrap_degrees_360;

/// The dominant evidence in one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellClass {
    Unknown,
    Navigable,
    Obstacle,
    Sample,
}

/// Accumulated per-cell evidence over the whole mission.
///
/// Counters only grow; the single exception is [`WorldMap::cleanup_terrain`].
/// Cells are addressed `(x, y)` and stored row-major with `y` as the row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "bevy", derive(bevy_ecs::prelude::Resource))]
pub struct WorldMap {
    size: usize,
    leveling_tolerance_deg: f64,
    obstacle: DMatrix<u32>,
    sample: DMatrix<u32>,
    navigable: DMatrix<u32>,
}

impl WorldMap {
    pub fn new(size: usize, leveling_tolerance_deg: f64) -> Self {
        Self {
            size,
            leveling_tolerance_deg,
            obstacle: DMatrix::zeros(size, size),
            sample: DMatrix::zeros(size, size),
            navigable: DMatrix::zeros(size, size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether roll and pitch are close enough to level for the top-down
    /// projection to be trusted.
    pub fn is_level(&self, roll_deg: f64, pitch_deg: f64) -> bool {
        let tol = self.leveling_tolerance_deg;
        let near_zero = |a: f64| {
            let a = wrap_degrees_360(a);
            a < tol || a > 360.0 - tol
        };
        near_zero(roll_deg) && near_zero(pitch_deg)
    }

    /// Adds one hit per observed cell. Skipped entirely (returns `false`)
    /// when the rover is not level.
    pub fn update(&mut self, observations: &WorldObservations, roll_deg: f64, pitch_deg: f64) -> bool {
        if !self.is_level(roll_deg, pitch_deg) {
            debug!(roll_deg, pitch_deg, "map update skipped, rover not level");
            return false;
        }
        Self::accumulate(&mut self.obstacle, &observations.obstacle, self.size);
        Self::accumulate(&mut self.sample, &observations.sample, self.size);
        Self::accumulate(&mut self.navigable, &observations.navigable, self.size);
        true
    }

    fn accumulate(layer: &mut DMatrix<u32>, points: &WorldPoints, size: usize) {
        for &(x, y) in &points.cells {
            // Indices are clipped upstream; clamp again so a foreign caller
            // can never index out of the grid.
            let (x, y) = (x.min(size - 1), y.min(size - 1));
            layer[(y, x)] = layer[(y, x)].saturating_add(1);
        }
    }

    /// Zeroes the obstacle counter of every cell that also has navigable
    /// evidence. Returns how many cells changed.
    pub fn cleanup_terrain(&mut self) -> usize {
        let mut cleared = 0;
        for (obstacle, navigable) in self.obstacle.iter_mut().zip(self.navigable.iter()) {
            if *obstacle > 0 && *navigable > 0 {
                *obstacle = 0;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn obstacle_hits(&self, x: usize, y: usize) -> u32 {
        self.obstacle[(y, x)]
    }

    pub fn sample_hits(&self, x: usize, y: usize) -> u32 {
        self.sample[(y, x)]
    }

    pub fn navigable_hits(&self, x: usize, y: usize) -> u32 {
        self.navigable[(y, x)]
    }

    pub fn classify(&self, x: usize, y: usize) -> CellClass {
        let (obstacle, sample, navigable) = (
            self.obstacle_hits(x, y),
            self.sample_hits(x, y),
            self.navigable_hits(x, y),
        );
        if sample > 0 {
            CellClass::Sample
        } else if navigable > 0 && navigable >= obstacle {
            CellClass::Navigable
        } else if obstacle > 0 {
            CellClass::Obstacle
        } else {
            CellClass::Unknown
        }
    }

    /// Number of cells with any evidence at all.
    pub fn mapped_cells(&self) -> usize {
        (0..self.size)
            .flat_map(|y| (0..self.size).map(move |x| (x, y)))
            .filter(|&(x, y)| self.classify(x, y) != CellClass::Unknown)
            .count()
    }

    /// The map as an image, north up: obstacle red, navigable blue, sample
    /// white.
    pub fn render(&self) -> RgbImage {
        let side = self.size as u32;
        RgbImage::from_fn(side, side, |px, py| {
            let (x, y) = (px as usize, self.size - 1 - py as usize);
            match self.classify(x, y) {
                CellClass::Unknown => Rgb([0, 0, 0]),
                CellClass::Navigable => Rgb([0, 0, 255]),
                CellClass::Obstacle => Rgb([255, 0, 0]),
                CellClass::Sample => Rgb([255, 255, 255]),
            }
        })
    }

    /// Compares navigable classification with ground truth.
    ///
    /// Returns `(fidelity, mapped_fraction)`: the share of mapped cells whose
    /// navigable/not-navigable verdict matches `is_navigable`, and the share
    /// of truly navigable cells the map has marked navigable.
    pub fn fidelity_against<F>(&self, is_navigable: F) -> (f64, f64)
    where
        F: Fn(usize, usize) -> bool,
    {
        let (mut mapped, mut correct, mut truth_nav, mut found_nav) = (0usize, 0usize, 0usize, 0usize);
        for y in 0..self.size {
            for x in 0..self.size {
                let truth = is_navigable(x, y);
                let class = self.classify(x, y);
                if truth {
                    truth_nav += 1;
                }
                if class == CellClass::Unknown {
                    continue;
                }
                mapped += 1;
                let says_nav = matches!(class, CellClass::Navigable | CellClass::Sample);
                if says_nav == truth {
                    correct += 1;
                }
                if truth && class == CellClass::Navigable {
                    found_nav += 1;
                }
            }
        }
        let ratio = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 };
        (ratio(correct, mapped), ratio(found_nav, truth_nav))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observations(obstacle: &[(usize, usize)], navigable: &[(usize, usize)]) -> WorldObservations {
        WorldObservations {
            obstacle: WorldPoints {
                cells: obstacle.to_vec(),
            },
            sample: WorldPoints::default(),
            navigable: WorldPoints {
                cells: navigable.to_vec(),
            },
        }
    }

    #[test]
    fn level_gate_accepts_both_sides_of_zero() {
        let map = WorldMap::new(10, 0.4);
        assert!(map.is_level(0.0, 0.0));
        assert!(map.is_level(359.7, 0.3));
        assert!(map.is_level(-0.2, 0.1));
        assert!(!map.is_level(0.5, 0.0));
        assert!(!map.is_level(0.0, 359.5));
    }

    #[test]
    fn update_counts_hits_and_respects_gate() {
        let mut map = WorldMap::new(10, 0.4);
        let obs = observations(&[(2, 3)], &[(4, 5), (4, 5)]);
        assert!(map.update(&obs, 0.1, 359.9));
        assert_eq!(map.obstacle_hits(2, 3), 1);
        assert_eq!(map.navigable_hits(4, 5), 2);

        assert!(!map.update(&obs, 1.0, 0.0));
        assert_eq!(map.obstacle_hits(2, 3), 1);
        assert_eq!(map.navigable_hits(4, 5), 2);
    }

    #[test]
    fn cleanup_zeroes_contested_obstacles() {
        let mut map = WorldMap::new(10, 0.4);
        map.update(&observations(&[(1, 1), (2, 2)], &[(1, 1)]), 0.0, 0.0);
        assert_eq!(map.classify(1, 1), CellClass::Navigable);
        assert_eq!(map.cleanup_terrain(), 1);
        assert_eq!(map.obstacle_hits(1, 1), 0);
        assert_eq!(map.obstacle_hits(2, 2), 1);
        assert_eq!(map.classify(2, 2), CellClass::Obstacle);
        assert_eq!(map.mapped_cells(), 2);
    }

    #[test]
    fn render_puts_north_up() {
        let mut map = WorldMap::new(10, 0.4);
        map.update(&observations(&[], &[(0, 9)]), 0.0, 0.0);
        let img = map.render();
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(img.get_pixel(0, 9), &Rgb([0, 0, 0]));
    }

    #[test]
    fn fidelity_counts_matches() {
        let mut map = WorldMap::new(4, 0.4);
        map.update(&observations(&[(0, 0)], &[(1, 0), (2, 0)]), 0.0, 0.0);
        // Ground truth: only x >= 2 is navigable.
        let (fidelity, coverage) = map.fidelity_against(|x, _| x >= 2);
        // (0,0) obstacle correct, (1,0) navigable wrong, (2,0) navigable correct.
        assert!((fidelity - 2.0 / 3.0).abs() < 1e-12);
        // 8 truly navigable cells, one found.
        assert!((coverage - 1.0 / 8.0).abs() < 1e-12);
    }
}
