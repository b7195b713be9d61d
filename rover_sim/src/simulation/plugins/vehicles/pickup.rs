// rover_sim/src/simulation/plugins/vehicles/pickup.rs

use crate::prelude::*;
use crate::simulation::core::simulation_setup::SimClock;
use crate::simulation::plugins::world::terrain::GroundTruth;

/// The rover must be this close to stationary for the arm to deploy.
const ARM_MAX_SPEED: f64 = 0.2;

/// A collection in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PickupJob {
    sample: usize,
    done_at: f64,
}

/// The sample-collection arm. Consumes the `send_pickup` request raised by
/// the decision loop and reports back through `picking_up` and
/// `samples_found`.
#[derive(Resource, Debug, Clone, Default)]
pub struct PickupArm {
    job: Option<PickupJob>,
}

impl PickupArm {
    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    /// Advances the arm to time `now`.
    pub fn update(
        &mut self,
        state: &mut RoverState,
        truth: &mut GroundTruth,
        vehicle: &VehicleSettings,
        now: f64,
    ) {
        // --- 1. Finish a running collection ---
        if let Some(job) = self.job {
            if now >= job.done_at {
                if let Some(sample) = truth.samples.get_mut(job.sample) {
                    sample.collected = true;
                }
                state.samples_found += 1;
                state.picking_up = false;
                self.job = None;
                info!(
                    "Collected sample {} ({}/{})",
                    job.sample, state.samples_found, state.samples_total
                );
            }
            state.send_pickup = false;
            return;
        }

        // --- 2. Start a new one on request ---
        if !state.send_pickup {
            return;
        }
        state.send_pickup = false;

        let target = truth.sample_within(&state.position, vehicle.pickup_radius);
        match target {
            Some(sample) if state.velocity.abs() <= ARM_MAX_SPEED => {
                debug!("Arm deployed on sample {}", sample);
                self.job = Some(PickupJob {
                    sample,
                    done_at: now + vehicle.pickup_seconds,
                });
                state.picking_up = true;
            }
            Some(_) => trace!("Pickup requested while moving; ignored"),
            None => debug!("Pickup requested with no sample in reach"),
        }
    }
}

pub struct PickupPlugin;

impl Plugin for PickupPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PickupArm>()
            .add_systems(Update, pickup_system.in_set(SimulationSet::Pickup));
    }
}

fn pickup_system(
    mut arm: ResMut<PickupArm>,
    mut state: ResMut<RoverState>,
    mut truth: ResMut<GroundTruth>,
    mission: Res<MissionConfig>,
    clock: Res<SimClock>,
) {
    arm.update(&mut state, &mut truth, &mission.vehicle, clock.now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::plugins::world::terrain::Sample;
    use nalgebra::Point2;

    fn scene() -> (RoverState, GroundTruth) {
        let mut truth = GroundTruth::open(50);
        truth.samples.push(Sample {
            position: Point2::new(20.5, 20.0),
            collected: false,
        });
        let state = RoverState::new(Point2::new(20.0, 20.0), 0.0, 1);
        (state, truth)
    }

    #[test]
    fn request_next_to_a_sample_collects_it_after_the_arm_time() {
        let (mut state, mut truth) = scene();
        let vehicle = VehicleSettings::default();
        let mut arm = PickupArm::default();

        state.send_pickup = true;
        arm.update(&mut state, &mut truth, &vehicle, 10.0);
        assert!(state.picking_up);
        assert!(!state.send_pickup);
        assert!(arm.is_busy());

        arm.update(&mut state, &mut truth, &vehicle, 11.0);
        assert!(state.picking_up);
        assert_eq!(state.samples_found, 0);

        arm.update(&mut state, &mut truth, &vehicle, 12.0);
        assert!(!state.picking_up);
        assert_eq!(state.samples_found, 1);
        assert!(truth.samples[0].collected);
        assert_eq!(truth.samples_remaining(), 0);
    }

    #[test]
    fn request_with_nothing_in_reach_is_dropped() {
        let (mut state, mut truth) = scene();
        state.position = Point2::new(30.0, 30.0);
        state.send_pickup = true;
        let mut arm = PickupArm::default();
        arm.update(&mut state, &mut truth, &VehicleSettings::default(), 0.0);
        assert!(!state.send_pickup);
        assert!(!state.picking_up);
        assert!(!arm.is_busy());
    }

    #[test]
    fn arm_waits_for_the_rover_to_stop() {
        let (mut state, mut truth) = scene();
        state.velocity = 1.0;
        state.send_pickup = true;
        let mut arm = PickupArm::default();
        arm.update(&mut state, &mut truth, &VehicleSettings::default(), 0.0);
        assert!(!state.picking_up);
        assert!(!state.send_pickup);
    }
}
