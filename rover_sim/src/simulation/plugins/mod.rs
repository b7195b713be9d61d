// rover_sim/src/simulation/plugins/mod.rs

pub mod autonomy;
pub mod sensors;
pub mod telemetry;
pub mod vehicles;
pub mod world;
