use chrono::{DateTime, Utc};
use nalgebra::{UnitQuaternion, Vector3};

/// Which time derivatives of a sampled position are trusted to build the
/// dense position grid (spec §4.5/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartesianInterpolationFilter {
    /// Use sampled position only; velocity/acceleration are estimated by
    /// finite differences across neighboring samples.
    UseP,
    /// Use sampled position and velocity.
    UsePv,
    /// Use sampled position, velocity, and acceleration.
    UsePva,
}

/// Which time derivatives of a sampled orientation are trusted to build the
/// dense rotation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngularInterpolationFilter {
    /// Use the sampled rotation only.
    UseR,
    /// Use the sampled rotation and its rate.
    UseRr,
    /// Use the sampled rotation, rate, and rate of rate.
    UseRra,
}

/// One sampled ephemeris point: a spacecraft (or body) position at a date,
/// with as much derivative information as the caller has on hand.
#[derive(Debug, Clone, Copy)]
pub struct CartesianSample {
    /// Sample date.
    pub date: DateTime<Utc>,
    /// Position, meters.
    pub position: Vector3<f64>,
    /// Velocity, m/s. Ignored when the filter is [`CartesianInterpolationFilter::UseP`].
    pub velocity: Vector3<f64>,
    /// Acceleration, m/s². Ignored unless the filter is
    /// [`CartesianInterpolationFilter::UsePva`].
    pub acceleration: Vector3<f64>,
}

/// One sampled attitude point: an orientation at a date, with as much
/// derivative information as the caller has on hand.
#[derive(Debug, Clone, Copy)]
pub struct AngularSample {
    /// Sample date.
    pub date: DateTime<Utc>,
    /// Rotation.
    pub rotation: UnitQuaternion<f64>,
    /// Rotation rate, rad/s. Ignored when the filter is
    /// [`AngularInterpolationFilter::UseR`].
    pub rotation_rate: Vector3<f64>,
    /// Rotation acceleration, rad/s². Ignored unless the filter is
    /// [`AngularInterpolationFilter::UseRra`].
    pub rotation_acceleration: Vector3<f64>,
}
