// rover_core/src/clock.rs

use dyn_clone::DynClone;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// The contract for any time source the decision loop can read.
///
/// Only the stuck-recovery timer consumes time. Implementations must be
/// monotonic: successive calls never return a smaller value.
pub trait Clock: Send + Sync + DynClone + Debug {
    /// Seconds elapsed since an arbitrary, fixed origin.
    fn now(&self) -> f64;
}

// Make the trait object cloneable.
dyn_clone::clone_trait_object!(Clock);

/// Wall-clock time backed by `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test (or the simulator) can
/// keep one handle and hand another to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds_bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_seconds: f64) -> Self {
        let clock = Self::default();
        clock.set(start_seconds);
        clock
    }

    /// Jumps to `seconds`. Going backwards is ignored to keep the clock monotonic.
    pub fn set(&self, seconds: f64) {
        let current = self.now();
        if seconds >= current {
            self.seconds_bits.store(seconds.to_bits(), Ordering::SeqCst);
        }
    }

    pub fn advance(&self, dt: f64) {
        if dt > 0.0 {
            self.set(self.now() + dt);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.seconds_bits.load(Ordering::SeqCst))
    }
}
