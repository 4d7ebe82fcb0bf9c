use thiserror::Error;

/// Failure modes scoped to sensor line/pixel geometry.
#[derive(Debug, Error)]
pub enum SensorError {
    /// A sensor's configured line range is empty or inverted.
    #[error("invalid line range [{min_line}, {max_line}]")]
    InvalidRangeForLines {
        /// Configured minimum line.
        min_line: f64,
        /// Configured maximum line.
        max_line: f64,
    },

    /// A tabulated datation or LOS model's step between samples is zero or
    /// negative.
    #[error("invalid step {step} between tabulated samples")]
    InvalidStep {
        /// The offending step.
        step: f64,
    },

    /// Inverse location converged on a line outside the sensor's declared
    /// range.
    #[error("ground point crossing line {line} is outside range [{min_line}, {max_line}]")]
    GroundPointOutOfLineRange {
        /// The line the solver converged to.
        line: f64,
        /// Configured minimum line.
        min_line: f64,
        /// Configured maximum line.
        max_line: f64,
    },

    /// A ray/ellipsoid geometry computation propagated from `rugged-ellipsoid`.
    #[error(transparent)]
    Geometry(#[from] rugged_ellipsoid::GeometryError),

    /// A frame transform query propagated from `rugged-frames`.
    #[error(transparent)]
    Frames(#[from] rugged_frames::FramesError),
}
