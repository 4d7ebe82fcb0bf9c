use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure modes for [`crate::SpacecraftToBody`] construction and queries.
#[derive(Debug, Error)]
pub enum FramesError {
    /// A query date fell outside `[minDate - tolerance, maxDate + tolerance]`.
    #[error("date {date} outside interpolator range [{min_date}, {max_date}] (tolerance {tolerance}s)")]
    OutOfTimeRange {
        /// The offending query date.
        date: DateTime<Utc>,
        /// Grid lower bound.
        min_date: DateTime<Utc>,
        /// Grid upper bound.
        max_date: DateTime<Utc>,
        /// Configured tolerance, seconds.
        tolerance: f64,
    },
    /// Fewer than two ephemeris or attitude samples were supplied; a dense
    /// grid cannot be built without at least one interval to interpolate.
    #[error("at least two samples are required to build a dense transform grid, got {count}")]
    NotEnoughSamples {
        /// Number of samples actually supplied.
        count: usize,
    },
    /// A reloaded dump's frame identifiers do not match the caller's
    /// configured frames.
    #[error(
        "reloaded dump uses inertial frame {dump_inertial:?}/body frame {dump_body:?}, \
         configuration expects {expected_inertial:?}/{expected_body:?}"
    )]
    FramesMismatchWithInterpolatorDump {
        /// Inertial frame recorded in the dump.
        dump_inertial: rugged_ellipsoid::InertialFrameId,
        /// Body frame recorded in the dump.
        dump_body: rugged_ellipsoid::BodyFrameId,
        /// Inertial frame the caller configured.
        expected_inertial: rugged_ellipsoid::InertialFrameId,
        /// Body frame the caller configured.
        expected_body: rugged_ellipsoid::BodyFrameId,
    },
    /// The dump payload was not recognizable interpolator data.
    #[error("not interpolator dump data: {reason}")]
    NotInterpolatorDumpData {
        /// Human-readable parse/shape failure.
        reason: String,
    },
}
