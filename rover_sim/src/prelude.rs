// rover_sim/src/prelude.rs

// Re-export the entire Bevy prelude for convenience.
pub use bevy::prelude::*;

// The pure rover types the plugins work with. `Commands` stays out: it
// would clash with Bevy's.
pub use rover_core::prelude::{
    CellClass, Clock, DecisionConfig, Frame, ManualClock, Mask, Perception, PerceptionConfig,
    PerceptionOutput, RoverConfig, RoverError, RoverMode, RoverPipeline, RoverResult, RoverState,
    WorldMap,
};

// Re-export common simulation-specific types for easy access in other plugins.
pub use crate::simulation::config::structs::*;
pub use crate::simulation::core::app_state::SimulationSet;
