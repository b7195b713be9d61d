// rover_core/src/utils.rs

//! Small numeric helpers shared by perception and decision code.

use num_traits::Float;

/// Clamps `value` into `[lo, hi]`. A NaN input collapses to zero (or to the
/// nearest bound if zero is outside the range) so it can never leak into an
/// actuator command.
pub fn clip<T: Float>(value: T, lo: T, hi: T) -> T {
    if value.is_nan() {
        return T::zero().max(lo).min(hi);
    }
    value.max(lo).min(hi)
}

/// Normalizes an angle in degrees into `[0, 360)`.
pub fn wrap_degrees_360<T: Float>(deg: T) -> T {
    let full = T::from(360.0).unwrap_or_else(T::zero);
    let wrapped = deg % full;
    if wrapped < T::zero() {
        wrapped + full
    } else {
        wrapped
    }
}

/// Normalizes an angle in degrees into `(-180, 180]`.
pub fn wrap_degrees_180<T: Float>(deg: T) -> T {
    let half = T::from(180.0).unwrap_or_else(T::zero);
    let full = half + half;
    let wrapped = wrap_degrees_360(deg);
    if wrapped > half {
        wrapped - full
    } else {
        wrapped
    }
}

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// The `q`-th percentile (`q` in `[0, 100]`) using linear interpolation
/// between the two nearest order statistics, or `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = clip(q, 0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}
