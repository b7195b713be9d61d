// rover_sim/src/main.rs

//! Headless closed-loop mission: terrain, camera, vehicle and the rover's
//! perception-to-decision pipeline, stepped at a fixed simulated rate.
//!
//! To run:
//! `cargo run -p rover_sim -- --config assets/missions/default.toml --map-out map.png`

// --- Bevy Imports ---
use bevy::{app::ScheduleRunnerPlugin, log::LogPlugin, prelude::*};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;

// --- Project-Specific Imports ---
use rover_sim::cli::Cli;
use rover_sim::insert_mission;
use rover_sim::simulation::config::load_mission;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut app = App::new();

    // --- 1. Core Bevy Plugins ---
    // No window: the schedule runner steps `Update` as fast as it can, and
    // simulated time advances by one tick per step.
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)),
        LogPlugin {
            level: bevy::log::Level::INFO,
            // A good filter for focusing on our crates' logs.
            filter: "info,rover_sim=debug,rover_core=debug".to_string(),
            ..default()
        },
    ));

    // --- 2. Mission Configuration & Resources ---
    let loaded = load_mission(&cli).and_then(|mission| insert_mission(&mut app, mission, cli));
    if let Err(e) = loaded {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    // --- 3. Run the App ---
    info!("Starting rover mission...");
    if app.run().is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
