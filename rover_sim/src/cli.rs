// rover_sim/src/cli.rs

use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Rover Sim: a headless closed-loop sample-return mission.
///
/// Generates a terrain, renders what the rover's camera sees, and runs the
/// perception-to-decision loop against a kinematic vehicle until the rover
/// is home or time runs out.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the mission TOML file to run.
    #[arg(short, long, default_value = "assets/missions/default.toml")]
    pub config: PathBuf,

    /// Overrides the terrain seed from the mission file.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Overrides the mission duration (simulated seconds).
    #[arg(long)]
    pub max_seconds: Option<f64>,

    /// Writes a PNG snapshot of the final world map here.
    #[arg(long)]
    pub map_out: Option<PathBuf>,
}
