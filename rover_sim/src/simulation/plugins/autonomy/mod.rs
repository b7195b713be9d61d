// rover_sim/src/simulation/plugins/autonomy/mod.rs

//! Runs the rover's perception-to-decision pipeline once per tick on the
//! latest camera frame.

use crate::prelude::*;
use crate::simulation::plugins::sensors::camera::CameraFrame;

pub struct AutonomyPlugin;

impl Plugin for AutonomyPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, autonomy_system.in_set(SimulationSet::Autonomy));
    }
}

/// Feeds the frame through the pipeline and writes the next state back.
///
/// A frame the pipeline rejects is logged and the tick falls back to a
/// blind decision, so the rover keeps its cruise behavior instead of
/// freezing.
fn autonomy_system(
    mut pipeline: ResMut<RoverPipeline>,
    mut state: ResMut<RoverState>,
    frame: Res<CameraFrame>,
) {
    if state.mission_complete {
        return;
    }
    let previous_mode = state.mode;
    let current = state.clone();

    let next = match pipeline.tick(&frame.0, current.clone()) {
        Ok(next) => next,
        Err(e) => {
            error!("Perception rejected the camera frame: {}", e);
            pipeline.tick_blind(current)
        }
    };

    if next.mode != previous_mode {
        info!("Mode {} -> {}", previous_mode, next.mode);
    }
    *state = next;
}
