// rover_sim/src/simulation/plugins/world/terrain.rs

use nalgebra::{DMatrix, Point2};
use rand::Rng;

use crate::prelude::*;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::simulation_setup::seed_rng;

// =========================================================================
// == Ground Truth ==
// =========================================================================

/// A rock sample lying on the terrain.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub position: Point2<f64>,
    pub collected: bool,
}

/// The true terrain the rover is exploring. Never visible to the pipeline;
/// only the camera renderer, the vehicle and the scoring read it.
#[derive(Resource, Debug, Clone)]
pub struct GroundTruth {
    size: usize,
    /// `true` where the ground is drivable, indexed `(y, x)`.
    navigable: DMatrix<bool>,
    pub samples: Vec<Sample>,
}

impl GroundTruth {
    /// An open world of `size` x `size` cells with no samples.
    pub fn open(size: usize) -> Self {
        Self {
            size,
            navigable: DMatrix::from_element(size, size, true),
            samples: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_navigable(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size && self.navigable[(y, x)]
    }

    /// Drivability of the cell containing world point `p`. Anything off the
    /// grid is impassable.
    pub fn is_navigable_at(&self, p: &Point2<f64>) -> bool {
        if p.x < 0.0 || p.y < 0.0 {
            return false;
        }
        self.is_navigable(p.x as usize, p.y as usize)
    }

    pub fn set_blocked(&mut self, x: usize, y: usize) {
        if x < self.size && y < self.size {
            self.navigable[(y, x)] = false;
        }
    }

    pub fn samples_remaining(&self) -> usize {
        self.samples.iter().filter(|s| !s.collected).count()
    }

    /// Index of the closest uncollected sample within `radius` of `p`.
    pub fn sample_within(&self, p: &Point2<f64>, radius: f64) -> Option<usize> {
        self.samples
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.collected)
            .map(|(i, s)| (i, (s.position - p).norm()))
            .filter(|&(_, d)| d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Number of navigable cells.
    pub fn navigable_cells(&self) -> usize {
        self.navigable.iter().filter(|&&n| n).count()
    }
}

// =========================================================================
// == Generation ==
// =========================================================================

/// Builds a random terrain: an impassable border, circular outcrops kept
/// clear of the start, and samples on open ground.
pub fn generate(
    settings: &TerrainSettings,
    world_size: usize,
    start: Point2<f64>,
    rng: &mut impl Rng,
) -> GroundTruth {
    let mut truth = GroundTruth::open(world_size);

    // --- 1. Border walls ---
    let border = settings.border_cells.min(world_size / 2);
    for y in 0..world_size {
        for x in 0..world_size {
            let inside = x >= border
                && y >= border
                && x < world_size - border
                && y < world_size - border;
            if !inside {
                truth.set_blocked(x, y);
            }
        }
    }

    // --- 2. Outcrops ---
    let [r_min, r_max] = settings.obstacle_radius;
    let mut placed = 0;
    let mut attempts = 0;
    while placed < settings.obstacle_count && attempts < settings.obstacle_count * 20 {
        attempts += 1;
        let radius = if r_max > r_min { rng.gen_range(r_min..=r_max) } else { r_min };
        let centre = Point2::new(
            rng.gen_range(0.0..world_size as f64),
            rng.gen_range(0.0..world_size as f64),
        );
        if (centre - start).norm() < settings.start_clearance + radius {
            continue;
        }
        stamp_disc(&mut truth, centre, radius);
        placed += 1;
    }

    // --- 3. Samples ---
    let mut attempts = 0;
    while truth.samples.len() < settings.sample_count as usize
        && attempts < settings.sample_count as usize * 200
    {
        attempts += 1;
        let p = Point2::new(
            rng.gen_range(0.0..world_size as f64),
            rng.gen_range(0.0..world_size as f64),
        );
        if (p - start).norm() < settings.sample_min_distance || !truth.is_navigable_at(&p) {
            continue;
        }
        truth.samples.push(Sample {
            position: p,
            collected: false,
        });
    }
    if truth.samples.len() < settings.sample_count as usize {
        warn!(
            "Only placed {} of {} samples on the generated terrain",
            truth.samples.len(),
            settings.sample_count
        );
    }

    truth
}

fn stamp_disc(truth: &mut GroundTruth, centre: Point2<f64>, radius: f64) {
    let size = truth.size() as f64;
    let x0 = (centre.x - radius).floor().max(0.0) as usize;
    let y0 = (centre.y - radius).floor().max(0.0) as usize;
    let x1 = (centre.x + radius).ceil().min(size - 1.0).max(0.0) as usize;
    let y1 = (centre.y + radius).ceil().min(size - 1.0).max(0.0) as usize;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let cell_centre = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
            if (cell_centre - centre).norm() <= radius {
                truth.set_blocked(x, y);
            }
        }
    }
}

// =========================================================================
// == Plugin ==
// =========================================================================

pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_terrain.after(seed_rng));
    }
}

pub fn spawn_terrain(
    mut commands: Commands,
    mission: Res<MissionConfig>,
    mut rng: ResMut<SimulationRng>,
) {
    let [x, y] = mission.rover.start;
    let truth = generate(
        &mission.terrain,
        mission.perception.world_size,
        Point2::new(x, y),
        &mut rng.0,
    );
    info!(
        "Generated terrain: {} navigable cells, {} samples",
        truth.navigable_cells(),
        truth.samples.len()
    );
    commands.insert_resource(truth);
}
