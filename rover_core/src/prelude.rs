// rover_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::clock::{Clock, ManualClock, MonotonicClock};
pub use crate::error::{RoverError, RoverResult};
pub use crate::types::{Frame, Mask};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::mapping::{CellClass, WorldMap};
pub use crate::perception::features::{NavigationFeatures, PolarFeature};
pub use crate::perception::{ClassifiedMasks, PerceptionOutput};
pub use crate::state::{Commands, RoverMode, RoverState};

// --- Configuration ---
pub use crate::config::{
    DecisionConfig, HomingConfig, PerceptionConfig, RoverConfig, SteeringStrategy,
};

// --- Algorithms ---
pub use crate::decision::DecisionPolicy;
pub use crate::perception::Perception;
pub use crate::pipeline::RoverPipeline;
