// rover_sim/src/simulation/plugins/telemetry/mod.rs

use std::path::Path;

use crate::cli::Cli;
use crate::prelude::*;
use crate::simulation::core::simulation_setup::SimClock;
use crate::simulation::plugins::world::terrain::GroundTruth;

/// Mapping quality against the true terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapScore {
    /// Fraction of mapped cells whose class agrees with the ground truth.
    pub fidelity: f64,
    /// Fraction of truly navigable cells the map has marked navigable.
    pub coverage: f64,
}

impl MapScore {
    pub fn of(map: &WorldMap, truth: &GroundTruth) -> Self {
        let (fidelity, coverage) = map.fidelity_against(|x, y| truth.is_navigable(x, y));
        Self { fidelity, coverage }
    }
}

/// When the next status line is due, and whether the run has ended.
#[derive(Resource, Debug, Clone, Default)]
pub struct TelemetryState {
    next_report: f64,
    finished: bool,
}

pub struct TelemetryPlugin;

impl Plugin for TelemetryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TelemetryState>().add_systems(
            Update,
            (status_report_system, mission_end_system)
                .chain()
                .in_set(SimulationSet::Telemetry),
        );
    }
}

fn status_report_system(
    mut telemetry: ResMut<TelemetryState>,
    clock: Res<SimClock>,
    mission: Res<MissionConfig>,
    state: Res<RoverState>,
    pipeline: Res<RoverPipeline>,
    truth: Res<GroundTruth>,
) {
    let now = clock.now();
    if now < telemetry.next_report {
        return;
    }
    telemetry.next_report = now + mission.simulation.log_interval_seconds;

    let score = MapScore::of(pipeline.world_map(), &truth);
    info!(
        "t={:>6.1}s mode={:<11} pos=({:6.1}, {:6.1}) yaw={:5.1} v={:4.2} samples={}/{} mapped={} fidelity={:.1}% coverage={:.1}%",
        now,
        state.mode.to_string(),
        state.position.x,
        state.position.y,
        state.yaw,
        state.velocity,
        state.samples_found,
        state.samples_total,
        pipeline.world_map().mapped_cells(),
        score.fidelity * 100.0,
        score.coverage * 100.0,
    );
}

/// Ends the run once the rover is home with its samples, or when time is up.
fn mission_end_system(
    mut telemetry: ResMut<TelemetryState>,
    mut exit: EventWriter<AppExit>,
    clock: Res<SimClock>,
    mission: Res<MissionConfig>,
    cli: Res<Cli>,
    state: Res<RoverState>,
    pipeline: Res<RoverPipeline>,
    truth: Res<GroundTruth>,
) {
    if telemetry.finished {
        return;
    }
    let now = clock.now();
    let timed_out = now >= mission.simulation.duration_seconds;
    if !state.mission_complete && !timed_out {
        return;
    }
    telemetry.finished = true;

    let score = MapScore::of(pipeline.world_map(), &truth);
    if state.mission_complete {
        info!(
            "Mission complete at t={:.1}s: {} samples home, fidelity {:.1}%, coverage {:.1}%",
            now,
            state.samples_found,
            score.fidelity * 100.0,
            score.coverage * 100.0
        );
    } else {
        warn!(
            "Mission timed out after {:.1}s with {}/{} samples, fidelity {:.1}%, coverage {:.1}%",
            now,
            state.samples_found,
            state.samples_total,
            score.fidelity * 100.0,
            score.coverage * 100.0
        );
    }

    if let Some(path) = &cli.map_out {
        save_map(pipeline.world_map(), path);
    }
    exit.write(AppExit::Success);
}

fn save_map(map: &WorldMap, path: &Path) {
    match map.render().save(path) {
        Ok(()) => info!("World map written to {}", path.display()),
        Err(e) => error!("Failed to write world map to {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_core::perception::coords::WorldPoints;
    use rover_core::perception::WorldObservations;

    #[test]
    fn score_counts_agreement_with_truth() {
        let mut truth = GroundTruth::open(10);
        truth.set_blocked(3, 3);

        let mut map = WorldMap::new(10, 0.4);
        let obs = WorldObservations {
            navigable: WorldPoints {
                cells: vec![(1, 1), (2, 2), (3, 3)],
            },
            ..Default::default()
        };
        map.update(&obs, 0.0, 0.0);

        let score = MapScore::of(&map, &truth);
        assert!((score.fidelity - 2.0 / 3.0).abs() < 1e-9);
        assert!((score.coverage - 2.0 / 99.0).abs() < 1e-9);
    }

    #[test]
    fn timeout_requests_exit() {
        let mut app = App::new();
        let mut mission = MissionConfig::default();
        mission.simulation.duration_seconds = 1.0;
        let clock = SimClock::new(1.0);
        clock.clock.set(5.0);
        let pipeline = RoverPipeline::with_clock(&mission.rover_config(), Box::new(clock.clock.clone()))
            .unwrap();

        app.add_event::<AppExit>()
            .insert_resource(mission)
            .insert_resource(clock)
            .insert_resource(Cli {
                config: "unused.toml".into(),
                seed: None,
                max_seconds: None,
                map_out: None,
            })
            .insert_resource(RoverState::new(nalgebra::Point2::new(5.0, 5.0), 0.0, 1))
            .insert_resource(pipeline)
            .insert_resource(GroundTruth::open(200))
            .init_resource::<TelemetryState>()
            .add_systems(Update, mission_end_system);
        app.update();

        assert!(app.world().resource::<TelemetryState>().finished);
        assert!(app.should_exit().is_some());
    }
}
