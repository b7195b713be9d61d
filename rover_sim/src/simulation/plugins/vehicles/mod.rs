// rover_sim/src/simulation/plugins/vehicles/mod.rs

pub mod pickup;
pub mod rover;
