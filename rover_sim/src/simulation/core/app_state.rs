// rover_sim/src/simulation/core/app_state.rs

use bevy::ecs::schedule::SystemSet;

// =========================================================================
// == Main Simulation Sets (The "Data Flow Graph") ==
// =========================================================================

/// One tick of the mission, in order. Every set runs once per `Update`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Advance simulated time, render the camera frame and report proximity
    /// to samples. Runs first.
    Sensors,
    /// The perception-to-decision pipeline. Needs this tick's frame.
    Autonomy,
    /// The sample arm: consumes pickup requests raised by autonomy.
    Pickup,
    /// Apply the commanded throttle/brake/steer to the vehicle.
    Actuation,
    /// Logging, end-of-mission detection and exit. Runs last.
    Telemetry,
}
