// rover_core/src/decision/mod.rs

//! The reactive controller: one mode-driven step per tick.

pub mod homing;
pub mod steering;
pub mod stuck;

use tracing::{debug, info, warn};

use crate::config::DecisionConfig;
use crate::decision::homing::HomingController;
use crate::decision::stuck::StuckRecovery;
use crate::perception::features::PolarFeature;
use crate::perception::PerceptionOutput;
use crate::state::{Commands, RoverMode, RoverState};

/// Below this speed the rover counts as standing still for a pickup.
const PICKUP_STANDSTILL: f64 = 1e-3;

/// The decision state machine.
///
/// `step` is a pure transition `(state, perception, now) -> state`: all mode
/// changes happen here, and every command leaves clamped.
#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    config: DecisionConfig,
    stuck: StuckRecovery,
    homing: HomingController,
}

impl DecisionPolicy {
    pub fn new(config: &DecisionConfig) -> Self {
        Self {
            config: config.clone(),
            stuck: StuckRecovery::new(&config.stuck, config.throttle_set, config.max_throttle),
            homing: HomingController::new(config),
        }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Advances the state machine by one tick.
    ///
    /// `perception` is `None` when the sensor produced nothing usable; the
    /// rover then cruises straight and the mode is left alone. `now` is clock
    /// time in seconds, used only by stuck recovery.
    pub fn step(&self, mut state: RoverState, perception: Option<&PerceptionOutput>, now: f64) -> RoverState {
        let cfg = &self.config;

        // 1. Enough samples collected: head home.
        let required = self.samples_to_collect(&state);
        if state.samples_found >= required && state.mode != RoverMode::ReturnHome {
            info!(found = state.samples_found, required, "switching to return-home");
            state.mode = RoverMode::ReturnHome;
            state.stuck_since = None;
        }

        // 2. Mode dispatch.
        state = match perception {
            None => {
                state.commands = Commands::new(cfg.throttle_set, 0.0, 0.0);
                state
            }
            Some(perception) => match state.mode {
                RoverMode::Forward => self.forward(state, perception, now),
                RoverMode::Stop => self.stop(state, perception),
                RoverMode::Pickup => self.pickup(state, perception),
                RoverMode::ReturnHome => self.homing.step(state, &perception.features.navigable),
            },
        };

        // 3. Standing next to a sample: ask for it to be collected.
        if state.velocity.abs() < PICKUP_STANDSTILL && state.near_sample && !state.picking_up {
            state.send_pickup = true;
        }

        // 4. Clamp last.
        state.commands = state.commands.clamped(cfg.max_throttle);
        state
    }

    /// Samples to collect before heading home: the configured requirement,
    /// capped by how many the terrain actually holds.
    pub fn samples_to_collect(&self, state: &RoverState) -> u32 {
        self.config.samples_required.min(state.samples_total)
    }

    /// A sample is visible and, when configured, close enough to straight
    /// ahead to approach.
    fn sample_in_reach(&self, sample: &PolarFeature) -> bool {
        if sample.is_empty() {
            return false;
        }
        match self.config.pickup_max_angle_deg {
            Some(limit) => sample.mean_angle_deg().map_or(false, |a| a.abs() <= limit),
            None => true,
        }
    }

    fn enter_pickup(&self, mut state: RoverState, perception: &PerceptionOutput) -> RoverState {
        info!(from = %state.mode, samples = perception.features.sample.len(), "sample spotted, approaching");
        state.mode = RoverMode::Pickup;
        state.stuck_since = None;
        self.pickup(state, perception)
    }

    // --- Forward ---

    fn forward(&self, mut state: RoverState, perception: &PerceptionOutput, now: f64) -> RoverState {
        let cfg = &self.config;
        if self.sample_in_reach(&perception.features.sample) {
            return self.enter_pickup(state, perception);
        }

        let navigable = &perception.features.navigable;
        if navigable.len() < cfg.stop_forward {
            info!(navigable = navigable.len(), "not enough terrain ahead, stopping");
            state.commands = Commands::brake(cfg.brake_set);
            state.mode = RoverMode::Stop;
            return state;
        }

        let nav_steer = match steering::navigation_steer(&cfg.steering, perception) {
            Ok(steer) => steer,
            Err(e) => {
                debug!("no steering target: {e}");
                0.0
            }
        };

        if state.velocity < cfg.stuck.velocity && !state.picking_up {
            state.commands = self.recover(&mut state, now, nav_steer);
            return state;
        }
        if state.stuck_since.take().is_some() {
            debug!(velocity = state.velocity, "moving again, stuck timer cleared");
        }

        let throttle = if state.velocity < cfg.boost_velocity {
            2.0 * cfg.throttle_set
        } else if state.velocity < cfg.max_vel {
            cfg.throttle_set
        } else {
            0.0
        };
        state.commands = Commands::new(throttle, 0.0, nav_steer);
        state
    }

    /// Starts or continues the stuck timer and returns the recovery command
    /// for the current phase.
    fn recover(&self, state: &mut RoverState, now: f64, nav_steer: f64) -> Commands {
        let mut onset = *state.stuck_since.get_or_insert(now);
        if self.stuck.is_exhausted(now - onset) {
            warn!(elapsed = now - onset, "stuck recovery exhausted, restarting schedule");
            onset = now;
            state.stuck_since = Some(onset);
        }
        let elapsed = now - onset;
        debug!(elapsed, phase = ?self.stuck.phase_index(elapsed), "stuck recovery");
        self.stuck.command(elapsed, nav_steer)
    }

    // --- Stop ---

    fn stop(&self, mut state: RoverState, perception: &PerceptionOutput) -> RoverState {
        let cfg = &self.config;
        if self.sample_in_reach(&perception.features.sample) {
            return self.enter_pickup(state, perception);
        }

        if state.velocity > cfg.stop_velocity {
            state.commands = Commands::brake(cfg.brake_set);
            return state;
        }

        let navigable = &perception.features.navigable;
        if navigable.len() < cfg.go_forward {
            state.commands = Commands::new(0.0, 0.0, cfg.search_steer_deg);
            return state;
        }

        info!(navigable = navigable.len(), "path found, resuming forward");
        let steer = navigable.mean_angle_deg().unwrap_or(0.0);
        state.commands = Commands::new(cfg.throttle_set, 0.0, steer);
        state.mode = RoverMode::Forward;
        state.stuck_since = None;
        state
    }

    // --- Pickup ---

    fn pickup(&self, mut state: RoverState, perception: &PerceptionOutput) -> RoverState {
        let cfg = &self.config;
        let sample = &perception.features.sample;
        let Ok(sample_angle) = sample.mean_angle_deg() else {
            // Lost sight of it: resume exploring, keeping last tick's commands.
            info!("sample out of view, back to forward");
            state.mode = RoverMode::Forward;
            return state;
        };

        if state.near_sample {
            state.commands = Commands::brake(cfg.brake_set);
            if !state.picking_up {
                debug!("at sample, requesting pickup");
                state.send_pickup = true;
            }
            return state;
        }

        state.commands = if state.velocity > cfg.max_vel / 2.0 {
            Commands::new(0.0, cfg.approach_brake, sample_angle)
        } else {
            Commands::new(cfg.throttle_set, 0.0, sample_angle)
        };
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::features::{FeatureClass, NavigationFeatures};
    use crate::perception::{ClassifiedMasks, WorldObservations};
    use crate::types::Mask;
    use approx::assert_abs_diff_eq;
    use nalgebra::Point2;

    /// Perception with `nav` navigable pixels spread over +-0.2 rad and the
    /// given sample angles.
    fn perception(nav: usize, sample_angles: Vec<f64>) -> PerceptionOutput {
        let angles: Vec<f64> = (0..nav)
            .map(|i| -0.2 + 0.4 * i as f64 / nav.max(2).saturating_sub(1) as f64)
            .collect();
        let sample_dists = vec![20.0; sample_angles.len()];
        PerceptionOutput {
            masks: ClassifiedMasks {
                terrain: Mask::new(320, 160),
                obstacle: Mask::new(320, 160),
                sample: Mask::new(320, 160),
            },
            features: NavigationFeatures {
                navigable: PolarFeature::new(FeatureClass::Navigable, vec![30.0; nav], angles),
                obstacle: PolarFeature::empty(FeatureClass::Obstacle),
                sample: PolarFeature::new(FeatureClass::Sample, sample_dists, sample_angles),
            },
            world: WorldObservations::default(),
            obstacle_ahead: false,
        }
    }

    fn policy() -> DecisionPolicy {
        DecisionPolicy::new(&DecisionConfig::default())
    }

    fn rover(mode: RoverMode, velocity: f64) -> RoverState {
        let mut state = RoverState::new(Point2::new(100.0, 100.0), 0.0, 6);
        state.mode = mode;
        state.velocity = velocity;
        state
    }

    #[test]
    fn no_terrain_in_forward_stops() {
        let next = policy().step(rover(RoverMode::Forward, 1.0), Some(&perception(0, vec![])), 0.0);
        assert_eq!(next.mode, RoverMode::Stop);
        assert_eq!(next.commands, Commands::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn stopped_without_path_rotates_in_place() {
        let next = policy().step(rover(RoverMode::Stop, 0.1), Some(&perception(100, vec![])), 0.0);
        assert_eq!(next.mode, RoverMode::Stop);
        assert_eq!(next.commands, Commands::new(0.0, 0.0, -15.0));
    }

    #[test]
    fn stopped_but_moving_keeps_braking() {
        let next = policy().step(rover(RoverMode::Stop, 0.5), Some(&perception(1000, vec![])), 0.0);
        assert_eq!(next.mode, RoverMode::Stop);
        assert_eq!(next.commands, Commands::brake(10.0));
    }

    #[test]
    fn stopped_with_open_path_resumes_forward() {
        let mut state = rover(RoverMode::Stop, 0.0);
        state.stuck_since = Some(3.0);
        let next = policy().step(state, Some(&perception(600, vec![])), 10.0);
        assert_eq!(next.mode, RoverMode::Forward);
        assert_eq!(next.commands.throttle, 0.2);
        assert_abs_diff_eq!(next.commands.steer, 0.0, epsilon = 1e-9);
        assert_eq!(next.stuck_since, None);
    }

    #[test]
    fn visible_sample_starts_approach() {
        let next = policy().step(rover(RoverMode::Forward, 0.5), Some(&perception(600, vec![0.1])), 0.0);
        assert_eq!(next.mode, RoverMode::Pickup);
        assert_abs_diff_eq!(next.commands.steer, 5.7296, epsilon = 1e-3);
        assert_eq!(next.commands.throttle, 0.2);
    }

    #[test]
    fn fast_approach_brakes_lightly() {
        let next = policy().step(rover(RoverMode::Pickup, 1.5), Some(&perception(600, vec![-0.1])), 0.0);
        assert_eq!(next.commands.throttle, 0.0);
        assert_eq!(next.commands.brake, 1.0);
        assert_abs_diff_eq!(next.commands.steer, -5.7296, epsilon = 1e-3);
    }

    #[test]
    fn near_sample_brakes_and_requests_pickup() {
        let mut state = rover(RoverMode::Pickup, 0.3);
        state.near_sample = true;
        let next = policy().step(state, Some(&perception(600, vec![0.0])), 0.0);
        assert_eq!(next.mode, RoverMode::Pickup);
        assert_eq!(next.commands, Commands::brake(10.0));
        assert!(next.send_pickup);
    }

    #[test]
    fn lost_sample_returns_to_forward_with_previous_commands() {
        let mut state = rover(RoverMode::Pickup, 0.3);
        state.commands = Commands::new(0.2, 0.0, 4.0);
        let next = policy().step(state, Some(&perception(600, vec![])), 0.0);
        assert_eq!(next.mode, RoverMode::Forward);
        assert_eq!(next.commands, Commands::new(0.2, 0.0, 4.0));
    }

    #[test]
    fn pickup_angle_gate_ignores_samples_off_to_the_side() {
        let cfg = DecisionConfig {
            pickup_max_angle_deg: Some(10.0),
            ..Default::default()
        };
        let policy = DecisionPolicy::new(&cfg);
        let next = policy.step(rover(RoverMode::Forward, 1.0), Some(&perception(600, vec![0.5])), 0.0);
        assert_eq!(next.mode, RoverMode::Forward);
    }

    #[test]
    fn forward_cruise_throttle_depends_on_speed() {
        let p = perception(600, vec![]);
        let slow = policy().step(rover(RoverMode::Forward, 0.3), Some(&p), 0.0);
        assert_eq!(slow.commands.throttle, 0.4);
        let cruising = policy().step(rover(RoverMode::Forward, 1.0), Some(&p), 0.0);
        assert_eq!(cruising.commands.throttle, 0.2);
        let fast = policy().step(rover(RoverMode::Forward, 2.5), Some(&p), 0.0);
        assert_eq!(fast.commands.throttle, 0.0);
        // Default percentile-75 steering leans left of center.
        assert!(cruising.commands.steer > 0.0);
    }

    #[test]
    fn missing_perception_cruises_straight() {
        let mut state = rover(RoverMode::Stop, 0.0);
        state.commands = Commands::brake(10.0);
        let next = policy().step(state, None, 0.0);
        assert_eq!(next.mode, RoverMode::Stop);
        assert_eq!(next.commands, Commands::new(0.2, 0.0, 0.0));
    }

    #[test]
    fn stuck_timer_starts_and_escalates() {
        let p = perception(600, vec![]);
        let first = policy().step(rover(RoverMode::Forward, 0.0), Some(&p), 100.0);
        assert_eq!(first.stuck_since, Some(100.0));
        assert_eq!(first.commands.throttle, 0.4);

        let later = policy().step(first.clone(), Some(&p), 109.0);
        assert_eq!(later.stuck_since, Some(100.0));
        assert_eq!(later.commands, Commands::new(0.0, 0.0, -15.0));

        let reversing = policy().step(first.clone(), Some(&p), 115.0);
        assert_eq!(reversing.commands, Commands::new(-1.0, 0.0, 15.0));

        let restarted = policy().step(first, Some(&p), 116.5);
        assert_eq!(restarted.stuck_since, Some(116.5));
        assert_eq!(restarted.commands.throttle, 0.4);
    }

    #[test]
    fn stuck_query_is_idempotent() {
        let p = perception(600, vec![]);
        let mut state = rover(RoverMode::Forward, 0.0);
        state.stuck_since = Some(50.0);
        let first = policy().step(state.clone(), Some(&p), 56.0);
        for _ in 0..3 {
            let again = policy().step(state.clone(), Some(&p), 56.0);
            assert_eq!(again.commands, first.commands);
            assert_eq!(again.stuck_since, first.stuck_since);
        }
        assert_eq!(first.commands.throttle, 1.0);
    }

    #[test]
    fn recovered_speed_clears_stuck_timer() {
        let mut state = rover(RoverMode::Forward, 1.0);
        state.stuck_since = Some(5.0);
        let next = policy().step(state, Some(&perception(600, vec![])), 7.0);
        assert_eq!(next.stuck_since, None);
    }

    #[test]
    fn enough_samples_switches_to_return_home() {
        let mut state = rover(RoverMode::Forward, 0.0);
        state.samples_found = 6;
        state.position = Point2::new(100.5, 100.5);
        state.velocity = 0.1;
        let next = policy().step(state, Some(&perception(600, vec![0.1])), 0.0);
        assert_eq!(next.mode, RoverMode::ReturnHome);
        assert_eq!(next.commands.throttle, 0.0);
        assert_eq!(next.commands.steer, 0.0);
        assert_eq!(next.commands.brake, 1.0);
        assert!(next.mission_complete);
    }

    #[test]
    fn fewer_samples_on_the_terrain_than_required_still_goes_home() {
        let mut state = rover(RoverMode::Forward, 1.0);
        state.samples_total = 3;
        state.samples_found = 2;
        state.position = Point2::new(150.0, 100.0);
        let still_searching = policy().step(state.clone(), Some(&perception(600, vec![])), 0.0);
        assert_eq!(still_searching.mode, RoverMode::Forward);

        state.samples_found = 3;
        let next = policy().step(state, Some(&perception(600, vec![])), 0.0);
        assert_eq!(next.mode, RoverMode::ReturnHome);
        assert!(!next.mission_complete);
    }

    #[test]
    fn obstacle_ahead_flag_does_not_change_the_decision() {
        let clear = perception(600, vec![]);
        let mut blocked = clear.clone();
        blocked.obstacle_ahead = true;
        let state = rover(RoverMode::Forward, 1.0);
        assert_eq!(
            policy().step(state.clone(), Some(&clear), 0.0),
            policy().step(state, Some(&blocked), 0.0)
        );
    }

    #[test]
    fn standing_next_to_sample_requests_pickup_in_any_mode() {
        let mut state = rover(RoverMode::Stop, 0.0);
        state.near_sample = true;
        let next = policy().step(state, None, 0.0);
        assert!(next.send_pickup);

        let mut busy = rover(RoverMode::Stop, 0.0);
        busy.near_sample = true;
        busy.picking_up = true;
        assert!(!policy().step(busy, None, 0.0).send_pickup);
    }
}
