// rover_core/src/decision/homing.rs

use tracing::{debug, info};

use crate::config::{DecisionConfig, HomingConfig};
use crate::perception::features::PolarFeature;
use crate::state::{Commands, RoverState};
use crate::types::MAX_STEER_DEG;
use crate::utils::{clip, wrap_degrees_180, wrap_degrees_360};

/// Bearing from the rover to home, degrees on `[0, 360)`.
pub fn bearing_to_home_deg(state: &RoverState) -> f64 {
    let delta = state.home - state.position;
    wrap_degrees_360(delta.y.atan2(delta.x).to_degrees())
}

/// Heading error to home, degrees on `(-180, 180]`. Positive means home is
/// to the left.
pub fn heading_error_deg(state: &RoverState) -> f64 {
    wrap_degrees_180(bearing_to_home_deg(state) - state.yaw)
}

/// Steers the rover back to its recorded home position.
///
/// A rover well off the home bearing first rotates in place until it faces
/// home. Otherwise it drives with the heading error kept inside the navigable
/// corridor, and parks once within `home_radius`.
#[derive(Debug, Clone)]
pub struct HomingController {
    config: HomingConfig,
    throttle_set: f64,
    brake_set: f64,
    max_vel: f64,
    stop_velocity: f64,
}

impl HomingController {
    pub fn new(decision: &DecisionConfig) -> Self {
        Self {
            config: decision.homing.clone(),
            throttle_set: decision.throttle_set,
            brake_set: decision.brake_set,
            max_vel: decision.max_vel,
            stop_velocity: decision.stop_velocity,
        }
    }

    pub fn step(&self, mut state: RoverState, navigable: &PolarFeature) -> RoverState {
        let cfg = &self.config;
        let distance = state.distance_to_home();

        // --- Arrival ---
        if distance <= cfg.home_radius {
            let brake = if state.velocity > cfg.arrival_velocity {
                self.brake_set
            } else {
                cfg.hold_brake
            };
            state.commands = Commands::brake(brake);
            if !state.mission_complete {
                info!(distance, "home reached, mission complete");
            }
            state.mission_complete = true;
            return state;
        }

        // --- Heading latch ---
        let error = heading_error_deg(&state);
        if state.turn_to_start && error.abs() > cfg.coarse_heading_deg {
            debug!(error, "lost heading to home");
            state.turn_to_start = false;
        } else if !state.turn_to_start && error.abs() <= cfg.fine_heading_deg {
            debug!(error, "facing home");
            state.turn_to_start = true;
        }

        state.commands = if !state.turn_to_start && error.abs() > cfg.coarse_heading_deg {
            self.rotate(&state, error)
        } else {
            self.drive(&state, error, navigable)
        };
        state
    }

    /// Turn in place toward home, braking to a stop first.
    fn rotate(&self, state: &RoverState, error: f64) -> Commands {
        if state.velocity > self.stop_velocity {
            Commands::brake(self.brake_set)
        } else {
            Commands::new(0.0, 0.0, clip(error, -MAX_STEER_DEG, MAX_STEER_DEG))
        }
    }

    /// Drive toward home, keeping the steer inside the navigable corridor.
    fn drive(&self, state: &RoverState, error: f64, navigable: &PolarFeature) -> Commands {
        let corridor = navigable
            .percentile_angle_deg(self.config.corridor_low_percentile)
            .and_then(|low| {
                navigable
                    .percentile_angle_deg(self.config.corridor_high_percentile)
                    .map(|high| (low, high))
            });
        let Ok((low, high)) = corridor else {
            return self.rotate(state, error);
        };

        let throttle = if state.velocity < self.max_vel {
            self.config.throttle_gain * self.throttle_set
        } else {
            0.0
        };
        let steer = clip(clip(error, low, high), -MAX_STEER_DEG, MAX_STEER_DEG);
        Commands::new(throttle, 0.0, steer)
    }
}
