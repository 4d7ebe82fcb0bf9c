use nalgebra::Vector3;
use rugged_ellipsoid::{point_at_altitude, Ellipsoid, NormalizedGeodeticPoint};

use crate::error::DemError;

/// Treats the body as an ellipsoid shifted up by a fixed altitude `h0`.
///
/// A cheap stand-in for real terrain over flat areas with a known mean
/// elevation (a lake, a runway, a coastal plain).
#[derive(Debug, Clone, Copy)]
pub struct ConstantElevation {
    h0: f64,
}

impl ConstantElevation {
    /// Builds an instance fixed at altitude `h0` meters above the ellipsoid.
    pub fn new(h0: f64) -> Self {
        Self { h0 }
    }

    /// Intersects the line of sight with the `h0`-altitude iso-surface.
    pub fn intersection(
        &self,
        ellipsoid: &Ellipsoid,
        position: Vector3<f64>,
        los: Vector3<f64>,
    ) -> Result<NormalizedGeodeticPoint, DemError> {
        let central_longitude = position.y.atan2(position.x);
        Ok(point_at_altitude(ellipsoid, position, los, self.h0, central_longitude)?)
    }

    /// Same as [`intersection`](Self::intersection): the iso-surface
    /// crossing is already exact, so there is nothing left to refine.
    pub fn refine_intersection(
        &self,
        ellipsoid: &Ellipsoid,
        position: Vector3<f64>,
        los: Vector3<f64>,
        _initial_guess: &NormalizedGeodeticPoint,
    ) -> Result<NormalizedGeodeticPoint, DemError> {
        self.intersection(ellipsoid, position, los)
    }

    /// Always `h0`.
    pub fn elevation(&self, _latitude: f64, _longitude: f64) -> f64 {
        self.h0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rugged_ellipsoid::{BodyFrameId, EllipsoidId, ALTITUDE_CONVERGENCE};

    #[test]
    fn intersects_shifted_ellipsoid() {
        let e = Ellipsoid::from_id(EllipsoidId::Wgs84, BodyFrameId::Itrf);
        let position = Vector3::new(2.0 * e.a, 0.0, 0.0);
        let los = Vector3::new(-1.0, 0.0, 0.0);
        let gp = ConstantElevation::new(250.0).intersection(&e, position, los).unwrap();
        assert_abs_diff_eq!(gp.altitude(), 250.0, epsilon = ALTITUDE_CONVERGENCE);
    }
}
