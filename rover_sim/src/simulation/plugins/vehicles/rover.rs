// rover_sim/src/simulation/plugins/vehicles/rover.rs

use nalgebra::{Point2, Vector2};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rover_core::utils::wrap_degrees_360;

use crate::prelude::*;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::simulation_setup::SimClock;
use crate::simulation::plugins::world::terrain::{spawn_terrain, GroundTruth};

/// Below this speed with no throttle or brake the rover turns in place.
const SPIN_SPEED: f64 = 0.05;

// =========================================================================
// == Kinematic Model ==
// =========================================================================

/// Where the vehicle is and how fast it goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehiclePose {
    pub position: Point2<f64>,
    /// Degrees on `[0, 360)`.
    pub yaw: f64,
    pub velocity: f64,
}

/// Result of one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleStep {
    pub pose: VehiclePose,
    /// Longitudinal acceleration over the step.
    pub accel: f64,
    /// Radians per second.
    pub yaw_rate: f64,
    /// The rover tried to drive into impassable ground and was held back.
    pub blocked: bool,
}

/// A skid-steer rover on flat ground: bicycle kinematics while rolling,
/// turn-in-place when stopped.
#[derive(Resource, Debug, Clone)]
pub struct VehicleModel {
    settings: VehicleSettings,
    attitude_noise: Option<Normal<f64>>,
}

impl VehicleModel {
    pub fn new(settings: &VehicleSettings) -> Self {
        let attitude_noise = (settings.attitude_noise_deg > 0.0)
            .then(|| Normal::new(0.0, settings.attitude_noise_deg).ok())
            .flatten();
        Self {
            settings: settings.clone(),
            attitude_noise,
        }
    }

    /// Applies `commands` for `dt` seconds.
    pub fn step(
        &self,
        pose: &VehiclePose,
        commands: &rover_core::prelude::Commands,
        dt: f64,
        truth: &GroundTruth,
    ) -> VehicleStep {
        let s = &self.settings;
        let v0 = pose.velocity;

        // --- 1. Longitudinal ---
        let mut v = if commands.brake > 0.0 {
            toward_zero(v0, commands.brake * s.decel_per_brake * dt)
        } else if commands.throttle == 0.0 {
            toward_zero(v0 - s.drag * v0 * dt, s.rolling_decel * dt)
        } else {
            v0 + (commands.throttle * s.accel_per_throttle - s.drag * v0) * dt
        };
        v = v.clamp(-s.max_speed, s.max_speed);

        // --- 2. Heading ---
        let spinning =
            v.abs() < SPIN_SPEED && commands.throttle == 0.0 && commands.brake == 0.0;
        let yaw_rate = if spinning {
            (commands.steer * s.spin_rate_per_steer).to_radians()
        } else {
            v * commands.steer.to_radians().tan() / s.wheelbase
        };
        let yaw = wrap_degrees_360(pose.yaw + yaw_rate.to_degrees() * dt);

        // --- 3. Position, unless the ground ahead is impassable ---
        let heading = Vector2::new(yaw.to_radians().cos(), yaw.to_radians().sin());
        let candidate = pose.position + heading * (v * dt);
        let blocked = v != 0.0 && !truth.is_navigable_at(&candidate);
        let (position, v) = if blocked {
            (pose.position, 0.0)
        } else {
            (candidate, v)
        };

        VehicleStep {
            pose: VehiclePose {
                position,
                yaw,
                velocity: v,
            },
            accel: if blocked { 0.0 } else { (v - v0) / dt },
            yaw_rate,
            blocked,
        }
    }

    /// Roll and pitch in degrees on `[0, 360)`: the body leans with
    /// acceleration, plus sensor noise.
    pub fn attitude(&self, step: &VehicleStep, rng: &mut impl Rng) -> (f64, f64) {
        let s = &self.settings;
        let pitch = -step.accel * s.pitch_per_accel + self.noise(rng);
        let roll = step.pose.velocity * step.yaw_rate * s.roll_per_lateral_accel + self.noise(rng);
        (wrap_degrees_360(roll), wrap_degrees_360(pitch))
    }

    fn noise(&self, rng: &mut impl Rng) -> f64 {
        self.attitude_noise.map_or(0.0, |n| n.sample(rng))
    }
}

/// Slows `v` by `dv` without reversing it.
fn toward_zero(v: f64, dv: f64) -> f64 {
    if v > 0.0 {
        (v - dv).max(0.0)
    } else {
        (v + dv).min(0.0)
    }
}

// =========================================================================
// == Plugin ==
// =========================================================================

pub struct RoverVehiclePlugin;

impl Plugin for RoverVehiclePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_rover.after(spawn_terrain))
            .add_systems(Update, drive_system.in_set(SimulationSet::Actuation));
    }
}

/// Places the rover at its start pose. The mission needs every sample that
/// was actually placed on the terrain.
fn spawn_rover(mut commands: Commands, mission: Res<MissionConfig>, truth: Res<GroundTruth>) {
    let [x, y] = mission.rover.start;
    let total = truth.samples.len() as u32;
    info!(
        "Spawning rover at ({:.1}, {:.1}) heading {:.1} deg, {} samples to find",
        x, y, mission.rover.yaw_deg, total
    );
    commands.insert_resource(RoverState::new(
        Point2::new(x, y),
        wrap_degrees_360(mission.rover.yaw_deg),
        total,
    ));
    commands.insert_resource(VehicleModel::new(&mission.vehicle));
}

fn drive_system(
    model: Res<VehicleModel>,
    truth: Res<GroundTruth>,
    clock: Res<SimClock>,
    mut rng: ResMut<SimulationRng>,
    mut state: ResMut<RoverState>,
) {
    let pose = VehiclePose {
        position: state.position,
        yaw: state.yaw,
        velocity: state.velocity,
    };
    let step = model.step(&pose, &state.commands, clock.dt, &truth);
    if step.blocked {
        debug!("Rover blocked at ({:.2}, {:.2})", pose.position.x, pose.position.y);
    }
    let (roll, pitch) = model.attitude(&step, &mut rng.0);

    state.position = step.pose.position;
    state.yaw = step.pose.yaw;
    state.velocity = step.pose.velocity;
    state.roll = roll;
    state.pitch = pitch;
}
