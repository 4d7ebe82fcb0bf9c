use chrono::{DateTime, Utc};
use thiserror::Error;

/// The error type callers of the `rugged` façade see.
///
/// Each leaf crate's own error enum is wrapped wholesale via `#[from]`;
/// the remaining variants belong to the façade itself: configuration
/// (builder validation), estimation, and dump/replay.
#[derive(Debug, Error)]
pub enum RuggedError {
    /// A query named a sensor the instance was not built with.
    #[error("unknown sensor {name:?}")]
    UnknownSensor {
        /// The offending sensor name.
        name: String,
    },

    /// A builder was asked to build without every required field set.
    #[error("uninitialized context: {what}")]
    UninitializedContext {
        /// What was missing.
        what: String,
    },

    /// Two sensors were added under the same name.
    #[error("duplicated parameter name {name:?}")]
    DuplicatedParameterName {
        /// The repeated name.
        name: String,
    },

    /// An internal invariant was violated; this indicates a bug rather
    /// than a caller error.
    #[error("internal error: {detail}")]
    InternalError {
        /// Description of the violated invariant.
        detail: String,
    },

    /// A sensor-parameter estimation call received a parameter count that
    /// does not match the estimation model's expectations.
    #[error("estimated parameters number mismatch: expected {expected}, got {got}")]
    EstimatedParametersNumberMismatch {
        /// Parameters the estimation model expects.
        expected: usize,
        /// Parameters actually supplied.
        got: usize,
    },

    /// A replayed dump line could not be parsed as a known record.
    #[error("cannot parse replay line {line_number}: {line}")]
    CannotParseLine {
        /// 1-based line number in the dump.
        line_number: usize,
        /// The offending line's contents.
        line: String,
    },

    /// A replayed `direct location`/`inverse location` record set the
    /// light-time correction flag to a value already fixed by an earlier
    /// record.
    #[error("light time correction redefined at line {line_number}")]
    LightTimeCorrectionRedefined {
        /// 1-based line number in the dump.
        line_number: usize,
    },

    /// Same as [`LightTimeCorrectionRedefined`](Self::LightTimeCorrectionRedefined),
    /// for the aberration-of-light flag.
    #[error("aberration of light correction redefined at line {line_number}")]
    AberrationOfLightCorrectionRedefined {
        /// 1-based line number in the dump.
        line_number: usize,
    },

    /// A query date fell outside the mean-plane crossing solver's
    /// declared line range after conversion.
    #[error("date {date} could not be converted to a sensor line")]
    DateOutsideLineRange {
        /// The offending date.
        date: DateTime<Utc>,
    },

    /// A ray/ellipsoid geometry computation propagated from `rugged-ellipsoid`.
    #[error(transparent)]
    Geometry(#[from] rugged_ellipsoid::GeometryError),

    /// A DEM/intersection computation propagated from `rugged-dem`.
    #[error(transparent)]
    Dem(#[from] rugged_dem::DemError),

    /// A frame transform query propagated from `rugged-frames`.
    #[error(transparent)]
    Frames(#[from] rugged_frames::FramesError),

    /// A sensor geometry computation propagated from `rugged-sensor`.
    #[error(transparent)]
    Sensor(#[from] rugged_sensor::SensorError),
}
