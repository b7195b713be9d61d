// rover_core/src/decision/stuck.rs

//! Timed escape manoeuvre for a rover that has stalled in forward mode.

use crate::config::{SteerAction, StuckConfig, StuckPhase, ThrottleAction};
use crate::state::Commands;

/// Maps the time since stall onset to a command by walking the configured
/// phase schedule.
#[derive(Debug, Clone)]
pub struct StuckRecovery {
    phases: Vec<StuckPhase>,
    throttle_set: f64,
    max_throttle: f64,
}

impl StuckRecovery {
    pub fn new(config: &StuckConfig, throttle_set: f64, max_throttle: f64) -> Self {
        Self {
            phases: config.phases.clone(),
            throttle_set,
            max_throttle,
        }
    }

    /// Seconds after onset at which the schedule is exhausted.
    pub fn duration(&self) -> f64 {
        self.phases.last().map_or(0.0, |p| p.until)
    }

    /// Whether a stall that began `elapsed` seconds ago has run through
    /// every phase.
    pub fn is_exhausted(&self, elapsed: f64) -> bool {
        elapsed >= self.duration()
    }

    /// Index of the phase active at `elapsed`, if any.
    pub fn phase_index(&self, elapsed: f64) -> Option<usize> {
        self.phases.iter().position(|p| elapsed < p.until)
    }

    /// The command for `elapsed` seconds into the stall. `nav_steer` is what
    /// the steering strategy would do this tick.
    ///
    /// Pure in its arguments. Past the end of the schedule the first phase
    /// applies again, so there is always a command.
    pub fn command(&self, elapsed: f64, nav_steer: f64) -> Commands {
        let phase = self
            .phase_index(elapsed)
            .and_then(|i| self.phases.get(i))
            .or_else(|| self.phases.first());
        let Some(phase) = phase else {
            return Commands::new(self.throttle_set, 0.0, nav_steer);
        };

        let throttle = match phase.throttle {
            ThrottleAction::Release => 0.0,
            ThrottleAction::Cruise(gain) => gain * self.throttle_set,
            ThrottleAction::Max => self.max_throttle,
            ThrottleAction::Reverse => -self.max_throttle,
        };
        let steer = match phase.steer {
            SteerAction::Navigation => nav_steer,
            SteerAction::Fixed(angle) => angle,
        };
        Commands::new(throttle, 0.0, steer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recovery() -> StuckRecovery {
        StuckRecovery::new(&StuckConfig::default(), 0.2, 1.0)
    }

    #[test]
    fn default_schedule_phases() {
        let r = recovery();
        let nav = 7.0;
        assert_eq!(r.command(0.0, nav), Commands::new(0.4, 0.0, nav));
        assert_eq!(r.command(4.99, nav), Commands::new(0.4, 0.0, nav));
        assert_eq!(r.command(5.0, nav), Commands::new(1.0, 0.0, nav));
        assert_eq!(r.command(9.0, nav), Commands::new(0.0, 0.0, -15.0));
        assert_eq!(r.command(12.0, nav), Commands::new(1.0, 0.0, nav));
        assert_eq!(r.command(15.0, nav), Commands::new(-1.0, 0.0, 15.0));
    }

    #[test]
    fn exhausted_schedule_wraps_to_first_phase() {
        let r = recovery();
        assert_eq!(r.duration(), 16.0);
        assert!(r.is_exhausted(16.0));
        assert!(!r.is_exhausted(15.9));
        assert_eq!(r.command(16.0, 2.0), r.command(0.0, 2.0));
    }

    #[test]
    fn same_elapsed_gives_same_command() {
        let r = recovery();
        let first = r.command(6.0, -3.0);
        for _ in 0..5 {
            assert_eq!(r.command(6.0, -3.0), first);
        }
    }
}
