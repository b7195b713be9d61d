// rover_core/src/perception/features.rs

use crate::error::{RoverError, RoverResult};
use crate::perception::coords::RoverCentricPoints;
use crate::types::Mask;
use crate::utils::{mean, percentile};

/// Which class a feature set was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureClass {
    Navigable,
    Obstacle,
    Sample,
}

impl FeatureClass {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureClass::Navigable => "navigable",
            FeatureClass::Obstacle => "obstacle",
            FeatureClass::Sample => "sample",
        }
    }
}

/// Polar coordinates of every pixel of one class.
///
/// `angles` are radians from the forward axis, positive to the left;
/// `dists` are top-down pixels. Both lists always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarFeature {
    pub class: FeatureClass,
    pub dists: Vec<f64>,
    pub angles: Vec<f64>,
}

impl PolarFeature {
    pub fn new(class: FeatureClass, dists: Vec<f64>, angles: Vec<f64>) -> Self {
        debug_assert_eq!(dists.len(), angles.len());
        Self {
            class,
            dists,
            angles,
        }
    }

    pub fn empty(class: FeatureClass) -> Self {
        Self::new(class, Vec::new(), Vec::new())
    }

    pub fn from_points(class: FeatureClass, points: &RoverCentricPoints) -> Self {
        let (dists, angles) = points.to_polar();
        Self::new(class, dists, angles)
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    fn empty_error(&self) -> RoverError {
        RoverError::EmptyFeatureSet {
            feature: self.class.name(),
        }
    }

    pub fn mean_angle_deg(&self) -> RoverResult<f64> {
        mean(&self.angles)
            .map(f64::to_degrees)
            .ok_or_else(|| self.empty_error())
    }

    /// The `q`-th percentile of the angles, in degrees.
    pub fn percentile_angle_deg(&self, q: f64) -> RoverResult<f64> {
        percentile(&self.angles, q)
            .map(f64::to_degrees)
            .ok_or_else(|| self.empty_error())
    }

    pub fn mean_distance(&self) -> RoverResult<f64> {
        mean(&self.dists).ok_or_else(|| self.empty_error())
    }

    /// Mean angle (degrees) of the points lying at or beyond the mean
    /// distance. Near-field pixels are ignored so the rover aims at the open
    /// ground further out.
    pub fn far_field_angle_deg(&self) -> RoverResult<f64> {
        let cutoff = self.mean_distance()?;
        let far: Vec<f64> = self
            .dists
            .iter()
            .zip(&self.angles)
            .filter(|(d, _)| **d >= cutoff)
            .map(|(_, a)| *a)
            .collect();
        mean(&far)
            .map(f64::to_degrees)
            .ok_or_else(|| self.empty_error())
    }
}

/// The per-class feature sets handed to the decision policy.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationFeatures {
    pub navigable: PolarFeature,
    pub obstacle: PolarFeature,
    pub sample: PolarFeature,
}

impl Default for NavigationFeatures {
    fn default() -> Self {
        Self {
            navigable: PolarFeature::empty(FeatureClass::Navigable),
            obstacle: PolarFeature::empty(FeatureClass::Obstacle),
            sample: PolarFeature::empty(FeatureClass::Sample),
        }
    }
}

/// Builds polar feature sets from rover-centric points of each class.
pub fn extract(
    navigable: &RoverCentricPoints,
    obstacle: &RoverCentricPoints,
    sample: &RoverCentricPoints,
) -> NavigationFeatures {
    NavigationFeatures {
        navigable: PolarFeature::from_points(FeatureClass::Navigable, navigable),
        obstacle: PolarFeature::from_points(FeatureClass::Obstacle, obstacle),
        sample: PolarFeature::from_points(FeatureClass::Sample, sample),
    }
}

/// Whether the top-down obstacle mask has anything in the small window just
/// ahead and to the right of the rover's ground-contact point.
///
/// The window spans five rows either side of `bottom_offset` (measured up
/// from the bottom edge) and 20 columns from the center line.
pub fn obstacle_ahead(obstacle: &Mask, bottom_offset: f64) -> bool {
    let (w, h) = obstacle.dimensions();
    let origin = h as i64 - bottom_offset.round() as i64;
    let rows = (origin - 5).max(0)..(origin + 5).min(h as i64);
    let cx = w / 2;
    let cols = cx..(cx + 20).min(w);

    rows.into_iter().any(|row| {
        cols.clone()
            .any(|col| obstacle.get_pixel(col, row as u32)[0] != 0)
    })
}
