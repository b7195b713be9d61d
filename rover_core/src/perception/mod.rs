// rover_core/src/perception/mod.rs

//! Frame → masks → top-down view → rover-centric points → features and world
//! cells, for one tick.

pub mod classifier;
pub mod coords;
pub mod features;
pub mod roi;
pub mod warp;

use image::{Rgb, RgbImage};
use tracing::debug;

use crate::config::PerceptionConfig;
use crate::error::RoverResult;
use crate::perception::classifier::ImageClassifier;
use crate::perception::coords::{pix_to_world, RoverCentricPoints, WorldPoints};
use crate::perception::features::NavigationFeatures;
use crate::perception::warp::PerspectiveWarp;
use crate::state::RoverState;
use crate::types::{Frame, Mask};

/// The three binary class masks of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMasks {
    pub terrain: Mask,
    pub obstacle: Mask,
    pub sample: Mask,
}

impl ClassifiedMasks {
    /// Composes the masks into one debug image: obstacle in red, sample in
    /// green, terrain in blue.
    pub fn vision_image(&self) -> RgbImage {
        let on = |m: &Mask, x: u32, y: u32| -> u8 { if m.get_pixel(x, y)[0] != 0 { 255 } else { 0 } };
        RgbImage::from_fn(self.terrain.width(), self.terrain.height(), |x, y| {
            Rgb([
                on(&self.obstacle, x, y),
                on(&self.sample, x, y),
                on(&self.terrain, x, y),
            ])
        })
    }
}

/// World-grid cells observed in one frame, per class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldObservations {
    pub obstacle: WorldPoints,
    pub sample: WorldPoints,
    pub navigable: WorldPoints,
}

/// Everything perception derives from one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionOutput {
    /// Class masks in the top-down view.
    pub masks: ClassifiedMasks,
    pub features: NavigationFeatures,
    pub world: WorldObservations,
    /// An obstacle sits directly in front of the rover. Reported for
    /// telemetry only; the decision policy steers from `features`.
    pub obstacle_ahead: bool,
}

/// The perception stage: classifier and unwarp, built once for a fixed
/// frame size.
#[derive(Debug, Clone)]
pub struct Perception {
    config: PerceptionConfig,
    classifier: ImageClassifier,
    warp: PerspectiveWarp,
}

impl Perception {
    pub fn new(config: &PerceptionConfig) -> RoverResult<Self> {
        config.validate()?;
        let warp = PerspectiveWarp::new(
            &config.source_corners,
            &config.destination_corners(),
            config.frame_width,
            config.frame_height,
        )?;
        Ok(Self {
            config: config.clone(),
            classifier: ImageClassifier::new(config),
            warp,
        })
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    pub fn warp(&self) -> &PerspectiveWarp {
        &self.warp
    }

    /// `(width, height)` every frame must have.
    pub fn frame_dimensions(&self) -> (u32, u32) {
        (self.config.frame_width, self.config.frame_height)
    }

    /// Runs the full perception chain on `frame` for a rover in `state`.
    pub fn process(&self, frame: &Frame, state: &RoverState) -> PerceptionOutput {
        // 1. Classify in camera perspective.
        let camera = self.classifier.classify(frame);

        // 2. Unwarp each mask to the top-down view.
        let masks = ClassifiedMasks {
            terrain: self.warp.warp(&camera.terrain),
            obstacle: self.warp.warp(&camera.obstacle),
            sample: self.warp.warp(&camera.sample),
        };

        // 3. Rover-centric points per class.
        let navigable = RoverCentricPoints::from_mask(&masks.terrain);
        let obstacle = RoverCentricPoints::from_mask(&masks.obstacle);
        let sample = RoverCentricPoints::from_mask(&masks.sample);

        // 4. World-grid cells for the map.
        let project = |points: &RoverCentricPoints| {
            pix_to_world(
                points,
                state.position,
                state.yaw,
                self.config.world_size,
                self.config.world_scale,
            )
        };
        let world = WorldObservations {
            obstacle: project(&obstacle),
            sample: project(&sample),
            navigable: project(&navigable),
        };

        // 5. Polar features for the decision policy.
        let features = features::extract(&navigable, &obstacle, &sample);
        let obstacle_ahead = features::obstacle_ahead(&masks.obstacle, self.config.bottom_offset);
        if obstacle_ahead {
            debug!("obstacle directly ahead");
        }
        debug!(
            navigable = features.navigable.len(),
            obstacle = features.obstacle.len(),
            sample = features.sample.len(),
            "perception features"
        );

        PerceptionOutput {
            masks,
            features,
            world,
            obstacle_ahead,
        }
    }
}
