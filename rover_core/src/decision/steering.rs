// rover_core/src/decision/steering.rs

use crate::config::{SteeringStrategy, WallFollowConfig};
use crate::error::RoverResult;
use crate::perception::PerceptionOutput;
use crate::types::Mask;

/// The steering angle (degrees, positive left, not yet clipped) that
/// `strategy` asks for given this tick's perception.
///
/// Fails with `EmptyFeatureSet` when the strategy needs navigable angles and
/// there are none.
pub fn navigation_steer(strategy: &SteeringStrategy, perception: &PerceptionOutput) -> RoverResult<f64> {
    let navigable = &perception.features.navigable;
    match strategy {
        SteeringStrategy::Mean => navigable.mean_angle_deg(),
        SteeringStrategy::Percentile { q } => navigable.percentile_angle_deg(*q),
        SteeringStrategy::FarField => navigable.far_field_angle_deg(),
        SteeringStrategy::WallFollow(cfg) => match wall_follow_steer(cfg, &perception.masks.obstacle) {
            Some(steer) => Ok(steer),
            None => navigable.percentile_angle_deg(cfg.fallback_percentile),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Scans the near, mid and far bands in turn. The first band with a blocked
/// side decides: steer toward the clearer side, harder the closer the band.
/// `None` when every band is clear on both sides.
fn wall_follow_steer(cfg: &WallFollowConfig, obstacle: &Mask) -> Option<f64> {
    let bands = [
        (0, cfg.near_px, 15.0),
        (cfg.near_px, cfg.mid_px, 10.0),
        (cfg.mid_px, cfg.far_px, 5.0),
    ];
    for (from, to, magnitude) in bands {
        let left = window_density(obstacle, cfg.lateral_px, from, to, Side::Left);
        let right = window_density(obstacle, cfg.lateral_px, from, to, Side::Right);
        if left > cfg.density_threshold || right > cfg.density_threshold {
            return Some(if left > right { -magnitude } else { magnitude });
        }
    }
    None
}

/// Fraction of set pixels in the window `lateral` columns wide beside the
/// center line, `from..to` pixels forward of the bottom edge.
fn window_density(mask: &Mask, lateral: u32, from: u32, to: u32, side: Side) -> f64 {
    let (w, h) = mask.dimensions();
    let cx = w / 2;
    let cols = match side {
        Side::Left => cx.saturating_sub(lateral)..cx,
        Side::Right => cx..(cx + lateral).min(w),
    };
    // Forward distance d corresponds to row h - d.
    let rows = h.saturating_sub(to)..h.saturating_sub(from);

    let area = cols.len() * rows.len();
    if area == 0 {
        return 0.0;
    }
    let hits = rows
        .flat_map(|row| cols.clone().map(move |col| (col, row)))
        .filter(|&(col, row)| mask.get_pixel(col, row)[0] != 0)
        .count();
    hits as f64 / area as f64
}
