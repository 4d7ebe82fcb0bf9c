use nalgebra::Vector3;

use crate::{ellipsoid::Ellipsoid, geodetic::NormalizedGeodeticPoint, error::GeometryError, C, ALTITUDE_CONVERGENCE};

/// Threshold below which a line of sight is considered parallel to a
/// meridian half-plane (spec §4.4).
const LONGITUDE_PARALLEL_EPS: C = 1.0e-12;

/// Maximum Newton iterations for [`point_at_altitude`].
const ALTITUDE_MAX_ITER: usize = 50;

/// Returns the first point (smallest positive ray parameter `k`) where the
/// ray `position + k * los` meets `ellipsoid`'s surface.
///
/// Fails with [`GeometryError::LineOfSightDoesNotReachGround`] if the ray
/// never reaches the ellipsoid.
pub fn point_on_ground(
    ellipsoid: &Ellipsoid,
    position: Vector3<C>,
    los: Vector3<C>,
    central_longitude: C,
) -> Result<NormalizedGeodeticPoint, GeometryError> {
    point_on_ground_k(ellipsoid, position, los, central_longitude).map(|(_, p)| p)
}

/// Same as [`point_on_ground`] but also returns the ray parameter `k`.
///
/// Callers that need to order or bracket several crossings along the same
/// ray (the DEM walk in `rugged-dem`, notably) need `k` itself, not just the
/// geodetic point it corresponds to.
pub fn point_on_ground_k(
    ellipsoid: &Ellipsoid,
    position: Vector3<C>,
    los: Vector3<C>,
    central_longitude: C,
) -> Result<(C, NormalizedGeodeticPoint), GeometryError> {
    let k = smallest_positive_root(ellipsoid_quadratic(ellipsoid, position, los, 0.0))
        .ok_or(GeometryError::LineOfSightDoesNotReachGround)?;
    let point = position + k * los;
    Ok((k, ellipsoid.to_geodetic(point).normalize(central_longitude)))
}

/// Returns the point along the ray at altitude `h` above `ellipsoid`,
/// closest to the ray's origin along increasing `k`.
///
/// The quadratic solution against the `h`-inflated ellipsoid is refined by
/// Newton iteration on the true (non-spherical) altitude until it converges
/// to within [`ALTITUDE_CONVERGENCE`] meters.
pub fn point_at_altitude(
    ellipsoid: &Ellipsoid,
    position: Vector3<C>,
    los: Vector3<C>,
    h: C,
    central_longitude: C,
) -> Result<NormalizedGeodeticPoint, GeometryError> {
    point_at_altitude_k(ellipsoid, position, los, h, central_longitude).map(|(_, p)| p)
}

/// Same as [`point_at_altitude`] but also returns the ray parameter `k`.
pub fn point_at_altitude_k(
    ellipsoid: &Ellipsoid,
    position: Vector3<C>,
    los: Vector3<C>,
    h: C,
    central_longitude: C,
) -> Result<(C, NormalizedGeodeticPoint), GeometryError> {
    let mut k = smallest_positive_root(ellipsoid_quadratic(ellipsoid, position, los, h))
        .ok_or(GeometryError::LineOfSightNeverCrossesAltitude)?;

    for _ in 0..ALTITUDE_MAX_ITER {
        let point = position + k * los;
        let gp = ellipsoid.to_geodetic(point);
        let delta_h = h - gp.altitude;
        if delta_h.abs() <= ALTITUDE_CONVERGENCE {
            return Ok((k, gp.normalize(central_longitude)));
        }
        let zenith = surface_normal(ellipsoid, point);
        let slope = los.dot(&zenith);
        if slope.abs() < 1.0e-12 {
            // Ray runs tangent to the iso-altitude surface; Newton step
            // would blow up. The last iterate is the best we can do.
            return Ok((k, gp.normalize(central_longitude)));
        }
        k += delta_h / slope;
    }

    let gp = ellipsoid.to_geodetic(position + k * los);
    Ok((k, gp.normalize(central_longitude)))
}

/// Returns the point where the ray crosses the double-nappe cone of
/// constant geodetic latitude `phi` (radians), picking the solution closest
/// to `close_reference` when two valid crossings exist.
///
/// Fails with [`GeometryError::LineOfSightNeverCrossesLatitude`] if the ray
/// never crosses the cone.
pub fn point_at_latitude(
    ellipsoid: &Ellipsoid,
    position: Vector3<C>,
    los: Vector3<C>,
    phi: C,
    close_reference: Vector3<C>,
    central_longitude: C,
) -> Result<NormalizedGeodeticPoint, GeometryError> {
    point_at_latitude_k(ellipsoid, position, los, phi, close_reference, central_longitude).map(|(_, p)| p)
}

/// Same as [`point_at_latitude`] but also returns the ray parameter `k`.
pub fn point_at_latitude_k(
    ellipsoid: &Ellipsoid,
    position: Vector3<C>,
    los: Vector3<C>,
    phi: C,
    close_reference: Vector3<C>,
    central_longitude: C,
) -> Result<(C, NormalizedGeodeticPoint), GeometryError> {
    let e2 = ellipsoid.e2();
    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let n = ellipsoid.transverse_radius_of_curvature(phi);
    let c0 = n * e2 * sin_phi;
    let tan_phi = sin_phi / cos_phi;

    let (px, py, pz) = (position.x, position.y, position.z + c0);
    let (lx, ly, lz) = (los.x, los.y, los.z);
    let t2 = tan_phi * tan_phi;

    let a = lz * lz - t2 * (lx * lx + ly * ly);
    let b = lz * pz - t2 * (lx * px + ly * py);
    let cc = pz * pz - t2 * (px * px + py * py);

    let roots = quadratic_roots(a, b, cc);

    let err = || GeometryError::LineOfSightNeverCrossesLatitude {
        latitude_degrees: phi.to_degrees(),
    };

    let mut best: Option<(C, C)> = None; // (k, distance to close_reference)
    for k in roots {
        let point = position + k * los;
        let z_shifted = point.z + c0;
        let r = (point.x * point.x + point.y * point.y).sqrt();
        // Squaring the cone equation can introduce the opposite nappe as a
        // spurious root; keep only roots whose sign matches tan(phi).
        if cos_phi.abs() < 1.0e-12 {
            // phi == +-90deg: cone degenerates to the z axis itself.
            continue;
        }
        if tan_phi.abs() > 1e-12 && z_shifted.signum() != tan_phi.signum() && r > 1e-9 {
            continue;
        }
        let dist = (point - close_reference).norm();
        let better = match best {
            Some((_, best_dist)) => dist < best_dist,
            None => true,
        };
        if better {
            best = Some((k, dist));
        }
    }

    let k = best.ok_or_else(err)?.0;
    let point = position + k * los;
    Ok((k, ellipsoid.to_geodetic(point).normalize(central_longitude)))
}

/// Returns the point where the ray crosses the meridian half-plane at
/// longitude `lambda` (radians).
///
/// Fails with [`GeometryError::LineOfSightNeverCrossesLongitude`] if the ray
/// is parallel to the meridian plane, or crosses the full plane only on the
/// opposite (lambda + pi) half.
pub fn point_at_longitude(
    ellipsoid: &Ellipsoid,
    position: Vector3<C>,
    los: Vector3<C>,
    lambda: C,
    central_longitude: C,
) -> Result<NormalizedGeodeticPoint, GeometryError> {
    point_at_longitude_k(ellipsoid, position, los, lambda, central_longitude).map(|(_, p)| p)
}

/// Same as [`point_at_longitude`] but also returns the ray parameter `k`.
pub fn point_at_longitude_k(
    ellipsoid: &Ellipsoid,
    position: Vector3<C>,
    los: Vector3<C>,
    lambda: C,
    central_longitude: C,
) -> Result<(C, NormalizedGeodeticPoint), GeometryError> {
    let normal = Vector3::new(-lambda.sin(), lambda.cos(), 0.0);
    let denom = los.dot(&normal);
    if denom.abs() < LONGITUDE_PARALLEL_EPS {
        return Err(GeometryError::LineOfSightNeverCrossesLongitude);
    }
    let k = -position.dot(&normal) / denom;
    let point = position + k * los;

    let got_lambda = point.y.atan2(point.x);
    if angular_distance(got_lambda, lambda) > 1.0e-6 {
        return Err(GeometryError::LineOfSightNeverCrossesLongitude);
    }

    Ok((k, ellipsoid.to_geodetic(point).normalize(central_longitude)))
}

/// A line-of-sight vector expressed in the local East-North-Zenith frame at
/// a geodetic point (spec §4.4 `convertLos`).
///
/// `east` and `north` are in radians (scaled by the local radii of
/// curvature); `zenith` is in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Topocentric {
    /// East component, radians.
    pub east: C,
    /// North component, radians.
    pub north: C,
    /// Zenith (up) component, meters.
    pub zenith: C,
}

/// Converts a Cartesian line-of-sight vector at `point` into the local
/// topocentric East/North/Zenith frame, scaling East and North by the local
/// radii of curvature so their units are radians.
pub fn convert_los(ellipsoid: &Ellipsoid, point: crate::GeodeticPoint, los: Vector3<C>) -> Topocentric {
    let (sin_lat, cos_lat) = (point.latitude.sin(), point.latitude.cos());
    let (sin_lon, cos_lon) = (point.longitude.sin(), point.longitude.cos());

    let east = Vector3::new(-sin_lon, cos_lon, 0.0);
    let north = Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    let zenith = Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);

    let n = ellipsoid.transverse_radius_of_curvature(point.latitude);
    let m = ellipsoid.meridian_radius_of_curvature(point.latitude);

    Topocentric {
        east: los.dot(&east) / (n * cos_lat).max(1.0),
        north: los.dot(&north) / m,
        zenith: los.dot(&zenith),
    }
}

/// Returns the unit outward surface normal of `ellipsoid` at body-fixed
/// point `p` (not required to lie on the ellipsoid itself).
fn surface_normal(ellipsoid: &Ellipsoid, p: Vector3<C>) -> Vector3<C> {
    Vector3::new(p.x / ellipsoid.a2(), p.y / ellipsoid.a2(), p.z / ellipsoid.b2()).normalize()
}

/// Builds the `A k^2 + 2 B k + C = 0` ray/ellipsoid quadratic for an
/// ellipsoid inflated by altitude `h`.
fn ellipsoid_quadratic(ellipsoid: &Ellipsoid, position: Vector3<C>, los: Vector3<C>, h: C) -> (C, C, C) {
    let shifted = ellipsoid.shifted(h);
    let a2 = shifted.a2();
    let b2 = shifted.b2();

    let a = los.x * los.x / a2 + los.y * los.y / a2 + los.z * los.z / b2;
    let b = (position.x * los.x + position.y * los.y) / a2 + position.z * los.z / b2;
    let c = position.x * position.x / a2 + position.y * position.y / a2 + position.z * position.z / b2 - 1.0;
    (a, b, c)
}

/// Returns the smallest strictly-positive root of `a k^2 + 2 b k + c = 0`,
/// using the numerically stable quadratic formula (spec §9: select the root
/// via the sign of the linear coefficient to avoid catastrophic
/// cancellation).
fn smallest_positive_root(coeffs: (C, C, C)) -> Option<C> {
    let mut roots: Vec<C> = quadratic_roots(coeffs.0, coeffs.1, coeffs.2)
        .into_iter()
        .filter(|k| *k > 0.0)
        .collect();
    roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
    roots.into_iter().next()
}

/// Returns the real roots of `a k^2 + 2 b k + c = 0` (note the factor of 2
/// on the linear term, matching the ellipsoid/cone quadratics above), using
/// the numerically stable formulation.
fn quadratic_roots(a: C, b: C, c: C) -> Vec<C> {
    if a.abs() < 1.0e-30 {
        if b.abs() < 1.0e-30 {
            return Vec::new();
        }
        return vec![-c / (2.0 * b)];
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let s = disc.sqrt();
    // Stable formula: compute the root with the larger magnitude first,
    // then derive the other from the product of roots (c/a).
    let q = if b >= 0.0 { -(b + s) } else { -(b - s) };
    let k1 = q / a;
    let k2 = if q.abs() > 1.0e-300 { c / q } else { k1 };
    vec![k1, k2]
}

fn angular_distance(a: C, b: C) -> C {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut d = (a - b) % two_pi;
    if d > std::f64::consts::PI {
        d -= two_pi;
    } else if d < -std::f64::consts::PI {
        d += two_pi;
    }
    d.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BodyFrameId, EllipsoidId};
    use approx::assert_abs_diff_eq;

    fn wgs84() -> Ellipsoid {
        Ellipsoid::from_id(EllipsoidId::Wgs84, BodyFrameId::Itrf)
    }

    #[test]
    fn point_on_ground_hits_equator() {
        let e = wgs84();
        let position = Vector3::new(2.0 * e.a, 0.0, 0.0);
        let los = Vector3::new(-1.0, 0.0, 0.0);
        let gp = point_on_ground(&e, position, los, 0.0).unwrap();
        assert_abs_diff_eq!(gp.altitude(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(gp.latitude(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn point_on_ground_misses() {
        let e = wgs84();
        let position = Vector3::new(2.0 * e.a, 0.0, 0.0);
        let los = Vector3::new(0.0, 1.0, 0.0); // tangent, misses
        assert!(point_on_ground(&e, position, los, 0.0).is_err());
    }

    #[test]
    fn point_at_altitude_matches_target() {
        let e = wgs84();
        let position = Vector3::new(2.0 * e.a, 0.0, 0.0);
        let los = Vector3::new(-1.0, 0.0, 0.0);
        let gp = point_at_altitude(&e, position, los, 1000.0, 0.0).unwrap();
        assert_abs_diff_eq!(gp.altitude(), 1000.0, epsilon = ALTITUDE_CONVERGENCE);
    }

    #[test]
    fn point_at_longitude_matches() {
        let e = wgs84();
        let position = Vector3::new(2.0 * e.a, 2.0 * e.a, 0.0);
        let los = Vector3::new(-1.0, -1.0, 0.0);
        let lambda = std::f64::consts::FRAC_PI_4;
        let gp = point_at_longitude(&e, position, los, lambda, 0.0).unwrap();
        assert_abs_diff_eq!(gp.longitude(), lambda, epsilon = 1e-9);
    }

    #[test]
    fn point_at_longitude_parallel_fails() {
        let e = wgs84();
        let position = Vector3::new(e.a, 0.0, 0.0);
        let los = Vector3::new(0.0, 0.0, 1.0); // parallel to lambda=0 plane's normal is (0,1,0); dot=0
        let lambda = 0.0;
        assert!(point_at_longitude(&e, position, los, lambda, 0.0).is_err());
    }

    #[test]
    fn point_at_latitude_matches_target() {
        let e = wgs84();
        let phi = 0.7_f64;
        // Start well above the ellipsoid over that latitude and look straight down.
        let n = e.transverse_radius_of_curvature(phi);
        let surface = Vector3::new(
            n * phi.cos(),
            0.0,
            n * (1.0 - e.e2()) * phi.sin(),
        );
        let zenith = surface_normal(&e, surface);
        let position = surface + zenith * 1.0e6;
        let los = -zenith;
        let gp = point_at_latitude(&e, position, los, phi, surface, 0.0).unwrap();
        assert_abs_diff_eq!(gp.latitude(), phi, epsilon = 1e-8);
    }

    #[test]
    fn convert_los_zenith_only_for_straight_down() {
        let e = wgs84();
        let point = e.to_geodetic(Vector3::new(e.a, 0.0, 0.0));
        let los = Vector3::new(-1.0, 0.0, 0.0); // straight down at the equator/prime meridian
        let topo = convert_los(&e, point, los);
        assert_abs_diff_eq!(topo.east, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(topo.north, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(topo.zenith, -1.0, epsilon = 1e-9);
    }
}
