//! Headless runs of the whole simulation, stepped one tick at a time.

use bevy::prelude::*;
use clap::Parser;
use rover_core::prelude::{RoverPipeline, RoverState};
use rover_sim::cli::Cli;
use rover_sim::insert_mission;
use rover_sim::simulation::config::MissionConfig;
use rover_sim::simulation::core::simulation_setup::SimClock;
use rover_sim::simulation::plugins::world::terrain::GroundTruth;

fn mission_app(mission: MissionConfig) -> App {
    let mut app = App::new();
    insert_mission(&mut app, mission, Cli::parse_from(["rover_sim"])).unwrap();
    app
}

fn seeded(seed: u64) -> MissionConfig {
    let mut mission = MissionConfig::default();
    mission.simulation.seed = Some(seed);
    mission
}

#[test]
fn rover_leaves_home_and_maps_the_terrain() {
    let mut app = mission_app(seeded(7));

    for _ in 0..250 {
        app.update();
        let state = app.world().resource::<RoverState>();
        let c = state.commands;
        assert!((-15.0..=15.0).contains(&c.steer));
        assert!((-1.0..=1.0).contains(&c.throttle));
        assert!(c.brake == 0.0 || c.throttle == 0.0);
    }

    let world = app.world();
    assert_eq!(world.resource::<SimClock>().ticks, 250);
    let state = world.resource::<RoverState>();
    assert_ne!(state.position, state.home);
    assert!(world.resource::<RoverPipeline>().world_map().mapped_cells() > 0);
    assert_eq!(
        state.samples_total as usize,
        world.resource::<GroundTruth>().samples.len()
    );
}

#[test]
fn same_seed_same_trajectory() {
    let run = || {
        let mut app = mission_app(seeded(11));
        for _ in 0..100 {
            app.update();
        }
        let state = app.world().resource::<RoverState>();
        (state.position, state.yaw)
    };
    assert_eq!(run(), run());
}

#[test]
fn mission_ends_when_time_runs_out() {
    let mut mission = seeded(3);
    mission.simulation.duration_seconds = 1.95;
    mission.simulation.tick_rate_hz = 10.0;
    let mut app = mission_app(mission);

    let mut ticks = 0;
    while app.should_exit().is_none() {
        app.update();
        ticks += 1;
        assert!(ticks <= 30, "simulation never requested exit");
    }
    // Time 0.0 on the first tick, about 2.0 on the twenty-first.
    assert_eq!(ticks, 21);
}
