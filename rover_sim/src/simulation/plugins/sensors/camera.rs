// rover_sim/src/simulation/plugins/sensors/camera.rs

use image::Rgb;
use nalgebra::{Point2, Rotation2, Vector2};
use rover_core::perception::warp::{homography_from_corners, project};

use crate::prelude::*;
use crate::simulation::core::simulation_setup::advance_clock;
use crate::simulation::plugins::world::terrain::GroundTruth;

// --- Palette ---
// Chosen to land in the classifier's terrain, sample and sky bands.
pub const SKY: Rgb<u8> = Rgb([120, 120, 130]);
pub const GROUND: Rgb<u8> = Rgb([200, 180, 160]);
pub const WALL: Rgb<u8> = Rgb([40, 30, 20]);
pub const ROCK: Rgb<u8> = Rgb([160, 140, 20]);

// =========================================================================
// == Camera Model ==
// =========================================================================

/// A forward-facing camera over a flat world.
///
/// The same calibration the perception stage uses to unwarp frames is used
/// here, in reverse, to decide which patch of ground every camera pixel
/// sees. Pixels whose ray never meets the ground are sky.
#[derive(Resource, Debug, Clone)]
pub struct CameraModel {
    width: u32,
    height: u32,
    /// Sample radius in world units.
    sample_radius: f64,
    /// Rover-centric ground offset (world units, x forward, y left) per
    /// camera pixel, row-major. `None` for sky.
    rays: Vec<Option<Vector2<f64>>>,
}

impl CameraModel {
    pub fn new(perception: &PerceptionConfig, sample_radius: f64) -> RoverResult<Self> {
        let (width, height) = (perception.frame_width, perception.frame_height);
        let h = homography_from_corners(
            &perception.source_corners,
            &perception.destination_corners(),
        )?;

        // Which side of the horizon is ground: the bottom-center pixel always is.
        let w_of = |u: f64, v: f64| h[(2, 0)] * u + h[(2, 1)] * v + h[(2, 2)];
        let ground_sign = w_of(width as f64 / 2.0, (height - 1) as f64).signum();

        let half_width = width as f64 / 2.0;
        let top_down_height = height as f64;
        let scale = perception.world_scale;

        let mut rays = Vec::with_capacity(width as usize * height as usize);
        for v in 0..height {
            for u in 0..width {
                let (u, v) = (u as f64, v as f64);
                let ray = if w_of(u, v) * ground_sign > 1e-9 {
                    project(&h, u, v).map(|[tx, ty]| {
                        Vector2::new((top_down_height - ty) / scale, (half_width - tx) / scale)
                    })
                } else {
                    None
                };
                rays.push(ray);
            }
        }

        Ok(Self {
            width,
            height,
            sample_radius,
            rays,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The ground point seen by pixel `(u, v)` for a rover at `position`
    /// with heading `yaw_deg`.
    pub fn ground_point(&self, u: u32, v: u32, position: Point2<f64>, yaw_deg: f64) -> Option<Point2<f64>> {
        let idx = v as usize * self.width as usize + u as usize;
        let rotation = Rotation2::new(yaw_deg.to_radians());
        self.rays
            .get(idx)
            .copied()
            .flatten()
            .map(|offset| position + rotation * offset)
    }

    /// Renders the view from `position`/`yaw_deg` into `frame`.
    pub fn render_into(&self, frame: &mut Frame, truth: &GroundTruth, position: Point2<f64>, yaw_deg: f64) {
        let rotation = Rotation2::new(yaw_deg.to_radians());
        let visible: Vec<Point2<f64>> = truth
            .samples
            .iter()
            .filter(|s| !s.collected)
            .map(|s| s.position)
            .collect();

        for (u, v, px) in frame.enumerate_pixels_mut() {
            let idx = v as usize * self.width as usize + u as usize;
            *px = match self.rays.get(idx).copied().flatten() {
                None => SKY,
                Some(offset) => {
                    let p = position + rotation * offset;
                    if !truth.is_navigable_at(&p) {
                        WALL
                    } else if visible.iter().any(|s| (s - p).norm() <= self.sample_radius) {
                        ROCK
                    } else {
                        GROUND
                    }
                }
            };
        }
    }

    pub fn render(&self, truth: &GroundTruth, position: Point2<f64>, yaw_deg: f64) -> Frame {
        let mut frame = Frame::new(self.width, self.height);
        self.render_into(&mut frame, truth, position, yaw_deg);
        frame
    }
}

/// The most recent camera image.
#[derive(Resource, Debug, Clone)]
pub struct CameraFrame(pub Frame);

// =========================================================================
// == Plugin ==
// =========================================================================

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (camera_sensor_system, proximity_sensor_system)
                .after(advance_clock)
                .in_set(SimulationSet::Sensors),
        );
    }
}

fn camera_sensor_system(
    camera: Res<CameraModel>,
    truth: Res<GroundTruth>,
    state: Res<RoverState>,
    mut frame: ResMut<CameraFrame>,
) {
    camera.render_into(&mut frame.0, &truth, state.position, state.yaw);
}

/// Reports whether an uncollected sample is within reach of the arm.
fn proximity_sensor_system(
    truth: Res<GroundTruth>,
    mission: Res<MissionConfig>,
    mut state: ResMut<RoverState>,
) {
    let near = truth
        .sample_within(&state.position, mission.vehicle.pickup_radius)
        .is_some();
    if near != state.near_sample {
        debug!("near_sample -> {}", near);
        state.near_sample = near;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::plugins::world::terrain::Sample;

    fn camera() -> CameraModel {
        CameraModel::new(&PerceptionConfig::default(), 0.5).unwrap()
    }

    fn home() -> Point2<f64> {
        Point2::new(100.0, 100.0)
    }

    #[test]
    fn top_rows_are_sky_and_bottom_rows_are_ground() {
        let frame = camera().render(&GroundTruth::open(200), home(), 0.0);
        assert_eq!(*frame.get_pixel(160, 0), SKY);
        assert_eq!(*frame.get_pixel(160, 159), GROUND);
        assert_eq!(*frame.get_pixel(20, 150), GROUND);
    }

    #[test]
    fn calibration_corners_land_on_the_destination_square() {
        let cfg = PerceptionConfig::default();
        let cam = camera();
        // Bottom-left source corner maps 0.6 units ahead, 0.5 units left.
        let p = cam.ground_point(14, 140, Point2::new(0.0, 0.0), 0.0).unwrap();
        assert!((p.x - cfg.bottom_offset / cfg.world_scale).abs() < 1e-6);
        assert!((p.y - cfg.dst_size / cfg.world_scale).abs() < 1e-6);
    }

    #[test]
    fn view_rotates_with_heading() {
        let cam = camera();
        let ahead = cam.ground_point(160, 120, home(), 0.0).unwrap() - home();
        let turned = cam.ground_point(160, 120, home(), 90.0).unwrap() - home();
        assert!(ahead.x > 0.5);
        assert!((turned.x + ahead.y).abs() < 1e-9);
        assert!((turned.y - ahead.x).abs() < 1e-9);
    }

    #[test]
    fn wall_ahead_renders_dark_and_is_classified_as_obstacle() {
        let mut truth = GroundTruth::open(200);
        for y in 0..200 {
            for x in 100..200 {
                truth.set_blocked(x, y);
            }
        }
        let frame = camera().render(&truth, Point2::new(99.7, 100.0), 0.0);
        assert_eq!(*frame.get_pixel(160, 150), WALL);

        let perception = Perception::new(&PerceptionConfig::default()).unwrap();
        let state = RoverState::new(Point2::new(99.7, 100.0), 0.0, 0);
        let output = perception.process(&frame, &state);
        assert!(output.features.navigable.is_empty());
        assert!(!output.features.obstacle.is_empty());
    }

    #[test]
    fn rendered_sample_is_seen_by_perception() {
        let mut truth = GroundTruth::open(200);
        truth.samples.push(Sample {
            position: Point2::new(102.0, 100.0),
            collected: false,
        });
        let frame = camera().render(&truth, home(), 0.0);
        assert!(frame.pixels().any(|p| *p == ROCK));

        let perception = Perception::new(&PerceptionConfig::default()).unwrap();
        let output = perception.process(&frame, &RoverState::new(home(), 0.0, 1));
        assert!(!output.features.sample.is_empty());
        let angle = output.features.sample.mean_angle_deg().unwrap();
        assert!(angle.abs() < 5.0, "sample should be dead ahead, got {angle}");
    }
}
