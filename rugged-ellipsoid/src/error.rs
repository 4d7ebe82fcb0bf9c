use thiserror::Error;

use crate::C;

/// Errors raised while intersecting a ray with an [`Ellipsoid`](crate::Ellipsoid)
/// or one of its iso-surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[allow(missing_docs, clippy::module_name_repetitions)]
pub enum GeometryError {
    #[error("line of sight does not reach ground")]
    LineOfSightDoesNotReachGround,
    #[error("line of sight never crosses latitude {latitude_degrees}")]
    LineOfSightNeverCrossesLatitude { latitude_degrees: C },
    #[error("line of sight never crosses longitude")]
    LineOfSightNeverCrossesLongitude,
    #[error("line of sight never crosses altitude")]
    LineOfSightNeverCrossesAltitude,
}
