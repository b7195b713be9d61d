// rover_sim/src/lib.rs

use bevy::prelude::*;
use rover_core::prelude::{Frame, RoverPipeline};

use crate::cli::Cli;
use crate::simulation::config::{ConfigError, MissionConfig};
use crate::simulation::core::simulation_setup::SimClock;
use crate::simulation::plugins::sensors::camera::{CameraFrame, CameraModel};

// Import the plugins defined within the simulation crate.
use crate::simulation::core::simulation_setup::SimulationSetupPlugin;
use crate::simulation::plugins::autonomy::AutonomyPlugin;
use crate::simulation::plugins::sensors::camera::CameraPlugin;
use crate::simulation::plugins::telemetry::TelemetryPlugin;
use crate::simulation::plugins::vehicles::pickup::PickupPlugin;
use crate::simulation::plugins::vehicles::rover::RoverVehiclePlugin;
use crate::simulation::plugins::world::terrain::TerrainPlugin;

// This prelude is for convenience for other files WITHIN the rover_sim crate.
pub mod prelude;

// This module contains all the simulation-specific logic.
pub mod cli;
pub mod simulation;

/// The main plugin that brings together all the simulation parts.
///
/// Expects the resources inserted by [`insert_mission`].
pub struct RoverSimulationPlugin;

impl Plugin for RoverSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            // Schedule graph, deterministic PRNG and simulated time.
            SimulationSetupPlugin,
            // Generates the ground-truth terrain and samples.
            TerrainPlugin,
            // Kinematic rover and its sample arm.
            RoverVehiclePlugin,
            PickupPlugin,
            // Camera rendering and sample proximity.
            CameraPlugin,
            // The perception-to-decision loop.
            AutonomyPlugin,
            // Status lines, scoring and mission end.
            TelemetryPlugin,
        ));
    }
}

/// Builds the pipeline and camera for `mission` and inserts them, the mission
/// itself and the simulation plugin into `app`.
pub fn insert_mission(app: &mut App, mission: MissionConfig, cli: Cli) -> Result<(), ConfigError> {
    // The pipeline reads the same simulated clock the setup plugin advances.
    let sim_clock = SimClock::new(mission.simulation.tick_rate_hz);
    let pipeline = RoverPipeline::with_clock(
        &mission.rover_config(),
        Box::new(sim_clock.clock.clone()),
    )?;
    let camera = CameraModel::new(&mission.perception, mission.terrain.sample_radius)?;
    let (width, height) = camera.dimensions();

    app.insert_resource(CameraFrame(Frame::new(width, height)))
        .insert_resource(camera)
        .insert_resource(pipeline)
        .insert_resource(sim_clock)
        .insert_resource(mission)
        .insert_resource(cli)
        .add_plugins(RoverSimulationPlugin);
    Ok(())
}
