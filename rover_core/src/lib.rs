// rover_core/src/lib.rs

// This file defines the public modules of the library.
pub mod clock;
pub mod config;
pub mod decision;
pub mod error;
pub mod mapping;
pub mod perception;
pub mod pipeline;
pub mod prelude;
pub mod state;
pub mod types;
pub mod utils;
