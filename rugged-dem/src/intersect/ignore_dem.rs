use nalgebra::Vector3;
use rugged_ellipsoid::{point_on_ground, Ellipsoid, NormalizedGeodeticPoint};

use crate::error::DemError;

/// Treats the body as a bare ellipsoid: every `elevation` is zero and
/// intersection falls straight through to the ellipsoid surface.
///
/// Useful as a cheap first guess, or when the caller already knows the
/// scene has no meaningful relief (open ocean, a calibration target).
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreDem;

impl IgnoreDem {
    /// Returns a new instance.
    pub fn new() -> Self {
        Self
    }

    /// Intersects the line of sight with the bare ellipsoid.
    pub fn intersection(
        &self,
        ellipsoid: &Ellipsoid,
        position: Vector3<f64>,
        los: Vector3<f64>,
    ) -> Result<NormalizedGeodeticPoint, DemError> {
        let central_longitude = position.y.atan2(position.x);
        Ok(point_on_ground(ellipsoid, position, los, central_longitude)?)
    }

    /// Same as [`intersection`](Self::intersection); there is no coarse
    /// guess to refine since the bare ellipsoid has a closed-form crossing.
    pub fn refine_intersection(
        &self,
        ellipsoid: &Ellipsoid,
        position: Vector3<f64>,
        los: Vector3<f64>,
        _initial_guess: &NormalizedGeodeticPoint,
    ) -> Result<NormalizedGeodeticPoint, DemError> {
        self.intersection(ellipsoid, position, los)
    }

    /// Always zero.
    pub fn elevation(&self, _latitude: f64, _longitude: f64) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rugged_ellipsoid::{BodyFrameId, EllipsoidId};

    #[test]
    fn intersects_bare_ellipsoid() {
        let e = Ellipsoid::from_id(EllipsoidId::Wgs84, BodyFrameId::Itrf);
        let position = Vector3::new(2.0 * e.a, 0.0, 0.0);
        let los = Vector3::new(-1.0, 0.0, 0.0);
        let gp = IgnoreDem::new().intersection(&e, position, los).unwrap();
        assert_abs_diff_eq!(gp.altitude(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn elevation_is_always_zero() {
        assert_eq!(IgnoreDem::new().elevation(0.3, 1.2), 0.0);
    }
}
