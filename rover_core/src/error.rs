// rover_core/src/error.rs

use thiserror::Error;

/// Every failure the core can report to its caller.
///
/// None of these are raised in steady-state operation: empty feature sets are
/// checked by the decision code before any statistic is taken, and the frame
/// and configuration variants are setup-time contract violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoverError {
    /// A statistic (mean, percentile) was requested over an empty feature set.
    #[error("cannot compute a statistic over an empty {feature} feature set")]
    EmptyFeatureSet { feature: &'static str },

    /// The frame does not have the size the perception stage was built for.
    #[error("frame size (width, height) is {actual:?}, expected {expected:?}")]
    FrameDimensions {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// The perspective correspondences do not define an invertible homography.
    #[error("perspective correspondences are degenerate; no homography exists")]
    DegenerateHomography,

    /// A configuration value is outside its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type RoverResult<T> = Result<T, RoverError>;
