// rover_core/src/state.rs

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::MAX_STEER_DEG;
use crate::utils::clip;

/// The mode of the decision state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoverMode {
    #[default]
    Forward,
    Stop,
    Pickup,
    ReturnHome,
}

impl fmt::Display for RoverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoverMode::Forward => "forward",
            RoverMode::Stop => "stop",
            RoverMode::Pickup => "pickup",
            RoverMode::ReturnHome => "return-home",
        };
        f.write_str(name)
    }
}

/// The actuator demand produced by one decision.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Commands {
    pub throttle: f64,
    pub brake: f64,
    /// Degrees, positive turns left.
    pub steer: f64,
}

impl Commands {
    pub fn new(throttle: f64, brake: f64, steer: f64) -> Self {
        Self {
            throttle,
            brake,
            steer,
        }
    }

    /// Full stop: no throttle, `brake` applied, wheels straight.
    pub fn brake(brake: f64) -> Self {
        Self::new(0.0, brake, 0.0)
    }

    /// Clamps every output into its valid range. A braking command never
    /// carries throttle.
    pub fn clamped(self, max_throttle: f64) -> Self {
        let brake = if self.brake.is_nan() { 0.0 } else { self.brake.max(0.0) };
        let throttle = if brake > 0.0 {
            0.0
        } else {
            clip(self.throttle, -max_throttle, max_throttle)
        };
        Self {
            throttle,
            brake,
            steer: clip(self.steer, -MAX_STEER_DEG, MAX_STEER_DEG),
        }
    }
}

/// The full, explicitly typed record of the rover for one tick.
///
/// Created once at mission start and replaced every tick by the value
/// returned from [`crate::decision::DecisionPolicy::step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(bevy_ecs::prelude::Resource))]
pub struct RoverState {
    // --- Pose & kinematics (reported by the vehicle) ---
    /// World units.
    pub position: Point2<f64>,
    /// Degrees on `[0, 360)`.
    pub yaw: f64,
    pub roll: f64,
    pub pitch: f64,
    pub velocity: f64,

    // --- Outputs ---
    pub commands: Commands,
    pub mode: RoverMode,

    // --- Mission bookkeeping ---
    pub samples_found: u32,
    pub samples_total: u32,
    pub near_sample: bool,
    pub picking_up: bool,
    /// Raised by the decision loop; consumed by the pickup collaborator.
    pub send_pickup: bool,
    /// Latched once the rover faces home during the return leg.
    pub turn_to_start: bool,
    /// Seconds (clock time) at which the current stall began.
    pub stuck_since: Option<f64>,
    pub home: Point2<f64>,
    pub mission_complete: bool,
}

impl RoverState {
    /// Starts a mission at `position`, which is recorded as home.
    pub fn new(position: Point2<f64>, yaw: f64, samples_total: u32) -> Self {
        Self {
            position,
            yaw,
            roll: 0.0,
            pitch: 0.0,
            velocity: 0.0,
            commands: Commands::default(),
            mode: RoverMode::Forward,
            samples_found: 0,
            samples_total,
            near_sample: false,
            picking_up: false,
            send_pickup: false,
            turn_to_start: false,
            stuck_since: None,
            home: position,
            mission_complete: false,
        }
    }

    pub fn distance_to_home(&self) -> f64 {
        (self.home - self.position).norm()
    }
}
