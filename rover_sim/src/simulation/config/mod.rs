// rover_sim/src/simulation/config/mod.rs

//! This module handles loading, overriding and validating the mission
//! configuration before the Bevy app is built.

pub mod structs;

use bevy::prelude::*;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use rover_core::prelude::RoverError;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cli::Cli;
pub use structs::{MissionConfig, RoverSettings, SimulationSettings, TerrainSettings, VehicleSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load mission file {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    #[error(transparent)]
    Core(#[from] RoverError),

    #[error("invalid simulation setting: {0}")]
    Simulation(String),
}

/// Loads the mission named on the command line and applies CLI overrides.
///
/// Every section and key is optional; whatever the file leaves out keeps its
/// default. A missing file is not an error: the built-in defaults are used
/// and a warning is logged.
pub fn load_mission(cli: &Cli) -> Result<MissionConfig, ConfigError> {
    let mut mission = if cli.config.exists() {
        info!("Loading mission from: {}", cli.config.display());
        load_from_figment(Figment::new().merge(Toml::file(&cli.config)), &cli.config)?
    } else {
        warn!(
            "Mission file {} not found, using built-in defaults",
            cli.config.display()
        );
        MissionConfig::default()
    };

    if let Some(seed) = cli.seed {
        mission.simulation.seed = Some(seed);
    }
    if let Some(max_seconds) = cli.max_seconds {
        mission.simulation.duration_seconds = max_seconds;
    }

    validate(&mission)?;
    Ok(mission)
}

fn load_from_figment(figment: Figment, path: &Path) -> Result<MissionConfig, ConfigError> {
    figment.extract().map_err(|e| ConfigError::Load {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

/// Checks the simulator settings and the embedded core configuration.
pub fn validate(mission: &MissionConfig) -> Result<(), ConfigError> {
    mission.rover_config().validate()?;

    let sim = &mission.simulation;
    if !(sim.tick_rate_hz > 0.0) || !(sim.duration_seconds > 0.0) {
        return Err(ConfigError::Simulation(
            "tick_rate_hz and duration_seconds must be positive".into(),
        ));
    }

    let terrain = &mission.terrain;
    let [r_min, r_max] = terrain.obstacle_radius;
    if r_min < 0.0 || r_min > r_max {
        return Err(ConfigError::Simulation(format!(
            "obstacle_radius [{r_min}, {r_max}] is not a valid range"
        )));
    }
    if 2 * terrain.border_cells >= mission.perception.world_size {
        return Err(ConfigError::Simulation(
            "border_cells leaves no room inside the world".into(),
        ));
    }

    let [x, y] = mission.rover.start;
    let size = mission.perception.world_size as f64;
    if !(0.0..size).contains(&x) || !(0.0..size).contains(&y) {
        return Err(ConfigError::Simulation(format!(
            "start position [{x}, {y}] is outside the {size}x{size} world"
        )));
    }

    let v = &mission.vehicle;
    if v.attitude_noise_deg < 0.0 || v.rolling_decel < 0.0 {
        return Err(ConfigError::Simulation(
            "attitude_noise_deg and rolling_decel must be non-negative".into(),
        ));
    }
    if v.wheelbase <= 0.0 || v.max_speed <= 0.0 {
        return Err(ConfigError::Simulation(
            "wheelbase and max_speed must be positive".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_core::prelude::SteeringStrategy;

    fn from_toml(doc: &str) -> Result<MissionConfig, ConfigError> {
        load_from_figment(Figment::new().merge(Toml::string(doc)), Path::new("inline.toml"))
    }

    #[test]
    fn defaults_are_valid() {
        validate(&MissionConfig::default()).unwrap();
    }

    #[test]
    fn partial_document_merges_over_defaults() {
        let mission = from_toml(
            r#"
            [simulation]
            seed = 7
            tick_rate_hz = 10.0

            [decision]
            samples_required = 3
            steering = { type = "FarField" }
            "#,
        )
        .unwrap();
        assert_eq!(mission.simulation.seed, Some(7));
        assert_eq!(mission.simulation.tick_rate_hz, 10.0);
        assert_eq!(mission.simulation.duration_seconds, 900.0);
        assert_eq!(mission.decision.samples_required, 3);
        assert_eq!(mission.decision.steering, SteeringStrategy::FarField);
        assert_eq!(mission.perception.world_size, 200);
        validate(&mission).unwrap();
    }

    #[test]
    fn shipped_mission_is_the_defaults_with_a_fixed_seed() {
        let shipped: MissionConfig =
            toml::from_str(include_str!("../../../../assets/missions/default.toml")).unwrap();
        let mut expected = MissionConfig::default();
        expected.simulation.seed = Some(42);
        assert_eq!(shipped, expected);
        validate(&shipped).unwrap();
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = from_toml("[rover]\nspeed = 3.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn bad_core_settings_surface_as_core_errors() {
        let mut mission = MissionConfig::default();
        mission.decision.go_forward = 10;
        assert!(matches!(validate(&mission), Err(ConfigError::Core(_))));
    }

    #[test]
    fn start_outside_world_is_rejected() {
        let mut mission = MissionConfig::default();
        mission.rover.start = [250.0, 10.0];
        assert!(matches!(validate(&mission), Err(ConfigError::Simulation(_))));
    }

    #[test]
    fn cli_overrides_apply_to_defaults() {
        let cli = Cli {
            config: PathBuf::from("does/not/exist.toml"),
            seed: Some(42),
            max_seconds: Some(30.0),
            map_out: None,
        };
        let mission = load_mission(&cli).unwrap();
        assert_eq!(mission.simulation.seed, Some(42));
        assert_eq!(mission.simulation.duration_seconds, 30.0);
    }
}
