// rover_core/src/pipeline.rs

use tracing::{info, trace};

use crate::clock::{Clock, MonotonicClock};
use crate::config::RoverConfig;
use crate::decision::DecisionPolicy;
use crate::error::{RoverError, RoverResult};
use crate::mapping::WorldMap;
use crate::perception::{Perception, PerceptionOutput};
use crate::state::RoverState;
use crate::types::Frame;

/// One full perception-to-decision loop.
///
/// Owns everything that persists across ticks (the world map) and everything
/// built once from configuration (classifier ROI masks, unwarp lookup,
/// policy). The rover state itself is passed in and handed back by value.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "bevy", derive(bevy_ecs::prelude::Resource))]
pub struct RoverPipeline {
    perception: Perception,
    world_map: WorldMap,
    policy: DecisionPolicy,
    clock: Box<dyn Clock>,
    map_finalized: bool,
    last_output: Option<PerceptionOutput>,
}

impl RoverPipeline {
    /// Builds a pipeline reading wall-clock time.
    pub fn new(config: &RoverConfig) -> RoverResult<Self> {
        Self::with_clock(config, Box::new(MonotonicClock::new()))
    }

    /// Builds a pipeline reading time from `clock`.
    pub fn with_clock(config: &RoverConfig, clock: Box<dyn Clock>) -> RoverResult<Self> {
        config.validate()?;
        let p = &config.perception;
        Ok(Self {
            perception: Perception::new(p)?,
            world_map: WorldMap::new(p.world_size, p.leveling_tolerance_deg),
            policy: DecisionPolicy::new(&config.decision),
            clock,
            map_finalized: false,
            last_output: None,
        })
    }

    pub fn world_map(&self) -> &WorldMap {
        &self.world_map
    }

    pub fn perception(&self) -> &Perception {
        &self.perception
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The perception result of the most recent tick, for telemetry.
    pub fn last_output(&self) -> Option<&PerceptionOutput> {
        self.last_output.as_ref()
    }

    /// Runs one tick on `frame` and returns the next rover state.
    ///
    /// Fails only when the frame does not have the configured size.
    pub fn tick(&mut self, frame: &Frame, state: RoverState) -> RoverResult<RoverState> {
        let expected = self.perception.frame_dimensions();
        if frame.dimensions() != expected {
            return Err(RoverError::FrameDimensions {
                expected,
                actual: frame.dimensions(),
            });
        }

        let output = self.perception.process(frame, &state);
        // The map is frozen once the final cleanup has run.
        if !self.map_finalized {
            let updated = self.world_map.update(&output.world, state.roll, state.pitch);
            trace!(updated, "world map update");
        }

        let now = self.clock.now();
        let next = self.policy.step(state, Some(&output), now);
        self.last_output = Some(output);

        if next.mission_complete && !self.map_finalized {
            let cleared = self.world_map.cleanup_terrain();
            info!(cleared, mapped = self.world_map.mapped_cells(), "final terrain cleanup");
            self.map_finalized = true;
        }
        Ok(next)
    }

    /// Runs the decision step alone for a tick with no usable sensor data.
    pub fn tick_blind(&mut self, state: RoverState) -> RoverState {
        let now = self.clock.now();
        self.last_output = None;
        self.policy.step(state, None, now)
    }
}
