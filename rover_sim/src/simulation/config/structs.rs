// rover_sim/src/simulation/config/structs.rs

use bevy::prelude::Resource;
use rover_core::prelude::{DecisionConfig, PerceptionConfig, RoverConfig};
use serde::{Deserialize, Serialize};

// =========================================================================
// == Top-Level Configuration Resource ==
// =========================================================================

/// # MissionConfig
/// Everything needed for one simulated mission, as parsed from a
/// `missions/*.toml` file. Every section is optional.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct MissionConfig {
    pub simulation: SimulationSettings,
    pub terrain: TerrainSettings,
    pub rover: RoverSettings,
    pub vehicle: VehicleSettings,
    /// Passed straight through to the core perception stage.
    pub perception: PerceptionConfig,
    /// Passed straight through to the core decision policy.
    pub decision: DecisionConfig,
}

impl MissionConfig {
    /// The core configuration embedded in this mission.
    pub fn rover_config(&self) -> RoverConfig {
        RoverConfig {
            perception: self.perception.clone(),
            decision: self.decision.clone(),
        }
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in a mission file.
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Simulated seconds before the mission is abandoned.
    pub duration_seconds: f64,
    /// Ticks per simulated second.
    pub tick_rate_hz: f64,
    /// Simulated seconds between telemetry lines.
    pub log_interval_seconds: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: None,
            duration_seconds: 900.0,
            tick_rate_hz: 25.0,
            log_interval_seconds: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerrainSettings {
    /// Width of the impassable band around the edge of the world, in cells.
    pub border_cells: usize,
    /// Number of circular rock outcrops scattered over the terrain.
    pub obstacle_count: usize,
    /// `[min, max]` outcrop radius, in world units.
    pub obstacle_radius: [f64; 2],
    /// Outcrops are kept at least this far from the start position.
    pub start_clearance: f64,
    /// Number of samples hidden on navigable ground.
    pub sample_count: u32,
    /// Samples are placed at least this far from the start position.
    pub sample_min_distance: f64,
    /// Radius of a sample as seen by the camera, in world units.
    pub sample_radius: f64,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            border_cells: 15,
            obstacle_count: 30,
            obstacle_radius: [2.0, 6.0],
            start_clearance: 10.0,
            sample_count: 6,
            sample_min_distance: 10.0,
            sample_radius: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoverSettings {
    /// Start (and home) position in world units.
    pub start: [f64; 2],
    /// Initial heading in degrees.
    pub yaw_deg: f64,
}

impl Default for RoverSettings {
    fn default() -> Self {
        Self {
            start: [100.0, 100.0],
            yaw_deg: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VehicleSettings {
    /// Speed limit in world units per second.
    pub max_speed: f64,
    /// Acceleration per unit of throttle.
    pub accel_per_throttle: f64,
    /// Deceleration per unit of brake.
    pub decel_per_brake: f64,
    /// Linear drag coefficient.
    pub drag: f64,
    /// Rolling resistance while coasting (no throttle, no brake).
    pub rolling_decel: f64,
    /// Distance between axles, in world units.
    pub wheelbase: f64,
    /// Yaw rate (deg/s) per degree of steer when turning in place.
    pub spin_rate_per_steer: f64,
    /// Pitch (degrees) per unit of longitudinal acceleration.
    pub pitch_per_accel: f64,
    /// Roll (degrees) per unit of lateral acceleration.
    pub roll_per_lateral_accel: f64,
    /// Standard deviation of the attitude noise, degrees.
    pub attitude_noise_deg: f64,
    /// A sample within this distance can be picked up.
    pub pickup_radius: f64,
    /// How long the arm takes to collect a sample, seconds.
    pub pickup_seconds: f64,
}

impl Default for VehicleSettings {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            accel_per_throttle: 2.0,
            decel_per_brake: 0.4,
            drag: 0.2,
            rolling_decel: 0.5,
            wheelbase: 1.0,
            spin_rate_per_steer: 2.0,
            pitch_per_accel: 0.2,
            roll_per_lateral_accel: 0.2,
            attitude_noise_deg: 0.05,
            pickup_radius: 1.0,
            pickup_seconds: 2.0,
        }
    }
}
