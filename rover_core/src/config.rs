// rover_core/src/config.rs

use serde::{Deserialize, Serialize};

use crate::error::{RoverError, RoverResult};

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// All tunables of the perception-to-decision loop.
///
/// Every field has a default, so a partial TOML document (or none at all)
/// yields a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RoverConfig {
    pub perception: PerceptionConfig,
    pub decision: DecisionConfig,
}

impl RoverConfig {
    pub fn validate(&self) -> RoverResult<()> {
        self.perception.validate()?;
        self.decision.validate()
    }
}

// =========================================================================
// == Perception ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerceptionConfig {
    /// Expected frame width in pixels.
    pub frame_width: u32,
    /// Expected frame height in pixels.
    pub frame_height: u32,

    /// A pixel is terrain iff every channel is strictly above this value.
    pub terrain_threshold: [u8; 3],
    /// Inclusive lower bound of the sample (rock) color band.
    pub sample_low: [u8; 3],
    /// Inclusive upper bound of the sample (rock) color band.
    pub sample_high: [u8; 3],
    /// Inclusive lower bound of the sky color band.
    pub sky_low: [u8; 3],
    /// Inclusive upper bound of the sky color band.
    pub sky_high: [u8; 3],

    /// Region of interest for terrain, as `[x, y]` fractions of width/height.
    pub terrain_roi: Vec<[f64; 2]>,
    /// Region of interest for sky detection, as `[x, y]` fractions of width/height.
    pub sky_roi: Vec<[f64; 2]>,

    /// The four calibration corners in camera pixels, ordered
    /// bottom-left, bottom-right, top-right, top-left.
    pub source_corners: [[f64; 2]; 4],
    /// Half the side length of the destination calibration square, in pixels.
    pub dst_size: f64,
    /// Distance from the image bottom to the near edge of the destination square.
    pub bottom_offset: f64,

    /// Side length of the square world grid, in cells.
    pub world_size: usize,
    /// Top-down pixels per world unit.
    pub world_scale: f64,
    /// Roll and pitch must be this close to level (degrees) for a map update.
    pub leveling_tolerance_deg: f64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            frame_width: 320,
            frame_height: 160,
            terrain_threshold: [120, 90, 80],
            sample_low: [100, 100, 0],
            sample_high: [190, 190, 50],
            sky_low: [70, 70, 70],
            sky_high: [160, 160, 160],
            // Lower 70% of the frame.
            terrain_roi: vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.3], [0.0, 0.3]],
            // Upper 40% of the frame.
            sky_roi: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 0.4], [0.0, 0.4]],
            source_corners: [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]],
            dst_size: 5.0,
            bottom_offset: 6.0,
            world_size: 200,
            world_scale: 10.0,
            leveling_tolerance_deg: 0.4,
        }
    }
}

impl PerceptionConfig {
    /// The destination square matching `source_corners`, in top-down pixels.
    pub fn destination_corners(&self) -> [[f64; 2]; 4] {
        let cx = self.frame_width as f64 / 2.0;
        let near = self.frame_height as f64 - self.bottom_offset;
        let far = near - 2.0 * self.dst_size;
        [
            [cx - self.dst_size, near],
            [cx + self.dst_size, near],
            [cx + self.dst_size, far],
            [cx - self.dst_size, far],
        ]
    }

    pub fn validate(&self) -> RoverResult<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(RoverError::InvalidConfig(
                "frame dimensions must be non-zero".into(),
            ));
        }
        for (name, roi) in [("terrain_roi", &self.terrain_roi), ("sky_roi", &self.sky_roi)] {
            if roi.len() < 3 {
                return Err(RoverError::InvalidConfig(format!(
                    "{name} needs at least 3 vertices, got {}",
                    roi.len()
                )));
            }
        }
        for (name, low, high) in [
            ("sample", self.sample_low, self.sample_high),
            ("sky", self.sky_low, self.sky_high),
        ] {
            if low.iter().zip(high.iter()).any(|(l, h)| l > h) {
                return Err(RoverError::InvalidConfig(format!(
                    "{name} color band is inverted: low {low:?} > high {high:?}"
                )));
            }
        }
        if self.dst_size <= 0.0 || self.world_scale <= 0.0 {
            return Err(RoverError::InvalidConfig(
                "dst_size and world_scale must be positive".into(),
            ));
        }
        if self.world_size == 0 {
            return Err(RoverError::InvalidConfig("world_size must be non-zero".into()));
        }
        if self.leveling_tolerance_deg < 0.0 {
            return Err(RoverError::InvalidConfig(
                "leveling_tolerance_deg must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

// =========================================================================
// == Decision ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecisionConfig {
    /// Cruise throttle.
    pub throttle_set: f64,
    /// Throttle magnitude limit applied to every command.
    pub max_throttle: f64,
    /// Full braking value.
    pub brake_set: f64,
    /// Light braking used to slow down while approaching a sample.
    pub approach_brake: f64,
    /// Cruise speed ceiling.
    pub max_vel: f64,
    /// Below this many navigable pixels the rover stops.
    pub stop_forward: usize,
    /// At or above this many navigable pixels a stopped rover resumes.
    pub go_forward: usize,
    /// Speeds at or below this count as stopped.
    pub stop_velocity: f64,
    /// Below this speed the cruise throttle is doubled.
    pub boost_velocity: f64,
    /// Steering used to rotate in place while searching for a path.
    pub search_steer_deg: f64,
    /// Samples to collect before heading home.
    pub samples_required: u32,
    /// When set, only samples whose mean angle is within this many degrees
    /// of straight ahead trigger a pickup approach.
    pub pickup_max_angle_deg: Option<f64>,
    pub steering: SteeringStrategy,
    pub stuck: StuckConfig,
    pub homing: HomingConfig,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            throttle_set: 0.2,
            max_throttle: 1.0,
            brake_set: 10.0,
            approach_brake: 1.0,
            max_vel: 2.0,
            stop_forward: 50,
            go_forward: 500,
            stop_velocity: 0.2,
            boost_velocity: 0.5,
            search_steer_deg: -15.0,
            samples_required: 6,
            pickup_max_angle_deg: None,
            steering: SteeringStrategy::default(),
            stuck: StuckConfig::default(),
            homing: HomingConfig::default(),
        }
    }
}

impl DecisionConfig {
    pub fn validate(&self) -> RoverResult<()> {
        if self.max_throttle <= 0.0 || self.throttle_set.abs() > self.max_throttle {
            return Err(RoverError::InvalidConfig(format!(
                "throttle_set {} must lie within max_throttle {}",
                self.throttle_set, self.max_throttle
            )));
        }
        if self.brake_set < 0.0 || self.approach_brake < 0.0 {
            return Err(RoverError::InvalidConfig("brakes must be non-negative".into()));
        }
        if self.go_forward < self.stop_forward {
            return Err(RoverError::InvalidConfig(format!(
                "go_forward ({}) must be at least stop_forward ({})",
                self.go_forward, self.stop_forward
            )));
        }
        self.steering.validate()?;
        self.stuck.validate()?;
        self.homing.validate()
    }
}

// --- Steering ---

/// How the forward state turns navigable terrain into a steering angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "PascalCase")] // e.g., "WallFollow" in TOML maps to `WallFollow`
pub enum SteeringStrategy {
    /// Mean navigable angle: seeks the centerline of open ground.
    Mean,
    /// A high percentile of the navigable angle distribution: hugs the left wall.
    Percentile { q: f64 },
    /// Discrete steering from left/right obstacle density near the rover.
    WallFollow(WallFollowConfig),
    /// Mean angle of navigable pixels at or beyond the mean navigable distance.
    FarField,
}

impl Default for SteeringStrategy {
    fn default() -> Self {
        SteeringStrategy::Percentile { q: 75.0 }
    }
}

impl SteeringStrategy {
    fn validate(&self) -> RoverResult<()> {
        let q = match self {
            SteeringStrategy::Percentile { q } => *q,
            SteeringStrategy::WallFollow(cfg) => {
                if !(cfg.near_px < cfg.mid_px && cfg.mid_px < cfg.far_px) {
                    return Err(RoverError::InvalidConfig(
                        "wall-follow windows must satisfy near < mid < far".into(),
                    ));
                }
                cfg.fallback_percentile
            }
            SteeringStrategy::Mean | SteeringStrategy::FarField => return Ok(()),
        };
        if !(0.0..=100.0).contains(&q) {
            return Err(RoverError::InvalidConfig(format!(
                "percentile {q} is outside [0, 100]"
            )));
        }
        Ok(())
    }
}

/// Windows are measured in top-down pixels from the rover's ground-contact point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WallFollowConfig {
    /// Obstacle pixel fraction above which a window counts as blocked.
    pub density_threshold: f64,
    /// Width of each side window.
    pub lateral_px: u32,
    /// Far edge of the near band.
    pub near_px: u32,
    /// Far edge of the mid band.
    pub mid_px: u32,
    /// Far edge of the far band.
    pub far_px: u32,
    /// Percentile of navigable angles used when both sides are clear.
    pub fallback_percentile: f64,
}

impl Default for WallFollowConfig {
    fn default() -> Self {
        Self {
            density_threshold: 0.15,
            lateral_px: 30,
            near_px: 15,
            mid_px: 35,
            far_px: 60,
            fallback_percentile: 75.0,
        }
    }
}

// --- Stuck recovery ---

/// Throttle demanded during one recovery phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThrottleAction {
    /// Zero throttle, zero brake.
    Release,
    /// `gain` times the cruise throttle.
    Cruise(f64),
    /// Full forward throttle.
    Max,
    /// Full reverse throttle.
    Reverse,
}

/// Steering demanded during one recovery phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SteerAction {
    /// Whatever the configured steering strategy asks for.
    Navigation,
    /// A fixed angle in degrees.
    Fixed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StuckPhase {
    /// Exclusive end of the phase, in seconds since stuck onset.
    /// The phase starts where the previous one ended (or at 0).
    pub until: f64,
    pub throttle: ThrottleAction,
    pub steer: SteerAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StuckConfig {
    /// In forward mode, speeds below this count as stalled.
    pub velocity: f64,
    pub phases: Vec<StuckPhase>,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            velocity: 0.2,
            phases: vec![
                StuckPhase {
                    until: 5.0,
                    throttle: ThrottleAction::Cruise(2.0),
                    steer: SteerAction::Navigation,
                },
                StuckPhase {
                    until: 8.0,
                    throttle: ThrottleAction::Max,
                    steer: SteerAction::Navigation,
                },
                StuckPhase {
                    until: 11.0,
                    throttle: ThrottleAction::Release,
                    steer: SteerAction::Fixed(-15.0),
                },
                StuckPhase {
                    until: 14.0,
                    throttle: ThrottleAction::Max,
                    steer: SteerAction::Navigation,
                },
                StuckPhase {
                    until: 16.0,
                    throttle: ThrottleAction::Reverse,
                    steer: SteerAction::Fixed(15.0),
                },
            ],
        }
    }
}

impl StuckConfig {
    fn validate(&self) -> RoverResult<()> {
        if self.phases.is_empty() {
            return Err(RoverError::InvalidConfig(
                "stuck recovery needs at least one phase".into(),
            ));
        }
        let mut previous = 0.0;
        for phase in &self.phases {
            if phase.until <= previous {
                return Err(RoverError::InvalidConfig(format!(
                    "stuck phase ending at {}s does not follow {}s",
                    phase.until, previous
                )));
            }
            previous = phase.until;
        }
        Ok(())
    }
}

// --- Homing ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HomingConfig {
    /// Within this distance of home the mission is complete.
    pub home_radius: f64,
    /// Heading error (degrees) at which the rover locks onto home.
    pub fine_heading_deg: f64,
    /// Heading error (degrees) beyond which a lock is dropped.
    pub coarse_heading_deg: f64,
    /// Multiplier on cruise throttle while driving home.
    pub throttle_gain: f64,
    /// Lower bound of the steering corridor, as a navigable-angle percentile.
    pub corridor_low_percentile: f64,
    /// Upper bound of the steering corridor, as a navigable-angle percentile.
    pub corridor_high_percentile: f64,
    /// Above this speed the arrival branch applies the full brake.
    pub arrival_velocity: f64,
    /// Brake held once the rover is parked at home.
    pub hold_brake: f64,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            home_radius: 3.0,
            fine_heading_deg: 10.0,
            coarse_heading_deg: 45.0,
            throttle_gain: 1.5,
            corridor_low_percentile: 25.0,
            corridor_high_percentile: 75.0,
            arrival_velocity: 0.5,
            hold_brake: 1.0,
        }
    }
}

impl HomingConfig {
    fn validate(&self) -> RoverResult<()> {
        if self.fine_heading_deg > self.coarse_heading_deg {
            return Err(RoverError::InvalidConfig(
                "fine_heading_deg must not exceed coarse_heading_deg".into(),
            ));
        }
        if self.corridor_low_percentile > self.corridor_high_percentile {
            return Err(RoverError::InvalidConfig(
                "corridor percentiles are inverted".into(),
            ));
        }
        Ok(())
    }
}
