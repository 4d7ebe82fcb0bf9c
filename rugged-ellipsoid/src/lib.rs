#![deny(missing_docs)]
#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub use crate::{
    ellipsoid::{BodyFrameId, Ellipsoid, EllipsoidId, InertialFrameId},
    error::GeometryError,
    geodetic::{GeodeticPoint, NormalizedGeodeticPoint},
    intersect::{
        convert_los, point_at_altitude, point_at_altitude_k, point_at_latitude, point_at_latitude_k,
        point_at_longitude, point_at_longitude_k, point_on_ground, point_on_ground_k, Topocentric,
    },
};
pub use nalgebra;

mod ellipsoid;
mod error;
mod geodetic;
mod intersect;

/// Base floating point type used for all coordinates and calculations.
///
/// Note: this _could_ be a generic parameter, but doing so makes the
/// library more complicated, and every quantity here (orbital distances,
/// radian angles) is comfortably represented in `f64`.
pub type C = f64;

/// Speed of light in vacuum, m/s. Used by the light-time/aberration
/// correction layer in the `rugged` façade crate, but lives here so every
/// crate in the workspace shares one constant.
pub const SPEED_OF_LIGHT: C = 299_792_458.0;

/// Convergence threshold for altitude-seeking iterations, in meters.
pub const ALTITUDE_CONVERGENCE: C = 1.0e-3;
