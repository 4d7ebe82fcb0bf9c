use crate::C;

/// One of the reference ellipsoid definitions exposed by the builder
/// configuration (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum EllipsoidId {
    Grs80,
    Wgs84,
    Iers96,
    Iers2003,
}

impl EllipsoidId {
    /// Returns the (equatorial radius, flattening) pair for this ellipsoid,
    /// in meters and dimensionless ratio respectively.
    pub fn parameters(self) -> (C, C) {
        match self {
            // GRS80 and the IERS conventions all share GRS80's defining
            // parameters; WGS84 differs in the least significant digits of
            // its flattening.
            EllipsoidId::Grs80 | EllipsoidId::Iers96 | EllipsoidId::Iers2003 => {
                (6_378_137.0, 1.0 / 298.257_222_101)
            }
            EllipsoidId::Wgs84 => (6_378_137.0, 1.0 / 298.257_223_563),
        }
    }
}

/// Identifier for the inertial frame an orbit/attitude sample is expressed
/// in. The actual frame realization (precession/nutation models, EOP
/// corrections, …) is the astrodynamics library's concern and out of scope
/// here; this tag exists so [`crate::Ellipsoid`] and the frame-transform
/// interpolator can check two configurations agree without pulling in that
/// machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum InertialFrameId {
    Gcrf,
    Eme2000,
    Mod,
    Tod,
    Veis1950,
}

/// Identifier for the Earth-fixed body frame. See [`InertialFrameId`] for
/// why this is a tag rather than a frame implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum BodyFrameId {
    Itrf,
    ItrfEquinox,
    Gtod,
}

/// An oblate spheroid reference ellipsoid.
///
/// Holds only the geometric parameters needed by the ray-intersection
/// helpers in this crate; it does not itself perform frame transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Equatorial radius, meters.
    pub a: C,
    /// Flattening, dimensionless.
    pub f: C,
    /// The body-fixed frame this ellipsoid's coordinates are expressed in.
    pub body_frame: BodyFrameId,
    a2: C,
    b2: C,
}

impl Ellipsoid {
    /// Builds an ellipsoid from its defining parameters.
    pub fn new(a: C, f: C, body_frame: BodyFrameId) -> Self {
        let b = a * (1.0 - f);
        Self {
            a,
            f,
            body_frame,
            a2: a * a,
            b2: b * b,
        }
    }

    /// Builds an ellipsoid from one of the named presets.
    pub fn from_id(id: EllipsoidId, body_frame: BodyFrameId) -> Self {
        let (a, f) = id.parameters();
        Self::new(a, f, body_frame)
    }

    /// Returns a copy of `self` inflated (or deflated) so that its surface
    /// sits at constant altitude `h` above the original surface along the
    /// normal direction. Used by the `ConstantElevation` intersection
    /// algorithm, which treats terrain as ellipsoid-plus-offset.
    ///
    /// This is an approximation (it is not a true offset surface for an
    /// oblate spheroid) but matches the reference implementation's
    /// `ConstantElevationAlgorithm`, which inflates `a` and `b` uniformly.
    pub fn shifted(&self, h: C) -> Self {
        let b = (self.b2).sqrt();
        let a = self.a + h;
        let b = b + h;
        Self {
            a,
            f: 1.0 - b / a,
            body_frame: self.body_frame,
            a2: a * a,
            b2: b * b,
        }
    }

    /// Squared equatorial radius.
    pub fn a2(&self) -> C {
        self.a2
    }

    /// Squared polar radius.
    pub fn b2(&self) -> C {
        self.b2
    }

    /// Polar radius, meters.
    pub fn b(&self) -> C {
        self.b2.sqrt()
    }

    /// First eccentricity squared, `e^2 = (a^2 - b^2) / a^2`.
    pub fn e2(&self) -> C {
        (self.a2 - self.b2) / self.a2
    }

    /// Radius of curvature in the prime vertical at geodetic latitude `lat`.
    pub fn transverse_radius_of_curvature(&self, lat: C) -> C {
        let sin_lat = lat.sin();
        self.a / (1.0 - self.e2() * sin_lat * sin_lat).sqrt()
    }

    /// Radius of curvature in the meridian at geodetic latitude `lat`.
    pub fn meridian_radius_of_curvature(&self, lat: C) -> C {
        let sin_lat = lat.sin();
        let denom = (1.0 - self.e2() * sin_lat * sin_lat).sqrt();
        self.a * (1.0 - self.e2()) / (denom * denom * denom)
    }

    /// Converts a body-frame Cartesian point to geodetic coordinates using
    /// Bowring's method (a couple of Newton iterations on the geodetic
    /// latitude; converges in 2-3 iterations for terrestrial eccentricities).
    pub fn to_geodetic(&self, position: nalgebra::Vector3<C>) -> crate::GeodeticPoint {
        let (x, y, z) = (position.x, position.y, position.z);
        let longitude = y.atan2(x);
        let p = (x * x + y * y).sqrt();
        let e2 = self.e2();
        let b = self.b();
        let mut lat = (z / p / (1.0 - e2)).atan();
        for _ in 0..5 {
            let sin_lat = lat.sin();
            let n = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
            lat = ((z + e2 * n * sin_lat) / p).atan();
        }
        let sin_lat = lat.sin();
        let n = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let altitude = if lat.cos().abs() > 1e-12 {
            p / lat.cos() - n
        } else {
            z.abs() - b
        };
        crate::GeodeticPoint::new(lat, longitude, altitude)
    }

    /// Approximates the geodetic coordinates of `position` by linearizing
    /// around `origin` in `origin`'s local East-North-Up tangent plane,
    /// instead of [`to_geodetic`](Self::to_geodetic)'s Newton iteration.
    ///
    /// `origin` is assumed to already sit on (or near) the ellipsoid
    /// surface; its radii of curvature are reused for every point converted
    /// against it. Accuracy degrades with distance from `origin` and with
    /// altitude, so this is only suitable for points a tile cell or two
    /// away from where `origin` was taken. Used by the Duvenhage
    /// intersection algorithm's flat-body variant (§4.3).
    pub fn to_geodetic_flat(&self, origin: crate::GeodeticPoint, position: nalgebra::Vector3<C>) -> crate::GeodeticPoint {
        let (sin_lat, cos_lat) = origin.latitude.sin_cos();
        let (sin_lon, cos_lon) = origin.longitude.sin_cos();
        let east = nalgebra::Vector3::new(-sin_lon, cos_lon, 0.0);
        let north = nalgebra::Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
        let up = nalgebra::Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);

        let d = position - self.to_cartesian(origin);
        let d_north = d.dot(&north);
        let d_east = d.dot(&east);
        let d_up = d.dot(&up);

        let m = self.meridian_radius_of_curvature(origin.latitude);
        let n = self.transverse_radius_of_curvature(origin.latitude);
        crate::GeodeticPoint::new(
            origin.latitude + d_north / m,
            origin.longitude + d_east / (n * cos_lat),
            origin.altitude + d_up,
        )
    }

    /// Converts a geodetic point to a body-frame Cartesian point.
    pub fn to_cartesian(&self, point: crate::GeodeticPoint) -> nalgebra::Vector3<C> {
        let sin_lat = point.latitude.sin();
        let cos_lat = point.latitude.cos();
        let n = self.a / (1.0 - self.e2() * sin_lat * sin_lat).sqrt();
        let x = (n + point.altitude) * cos_lat * point.longitude.cos();
        let y = (n + point.altitude) * cos_lat * point.longitude.sin();
        let z = (n * (1.0 - self.e2()) + point.altitude) * sin_lat;
        nalgebra::Vector3::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn wgs84() -> Ellipsoid {
        Ellipsoid::from_id(EllipsoidId::Wgs84, BodyFrameId::Itrf)
    }

    #[test]
    fn geodetic_roundtrip() {
        let e = wgs84();
        let gp = crate::GeodeticPoint::new(0.5, 1.2, 1000.0);
        let cart = e.to_cartesian(gp);
        let back = e.to_geodetic(cart);
        assert_abs_diff_eq!(back.latitude, gp.latitude, epsilon = 1e-12);
        assert_abs_diff_eq!(back.longitude, gp.longitude, epsilon = 1e-12);
        assert_abs_diff_eq!(back.altitude, gp.altitude, epsilon = 1e-6);
    }

    #[test]
    fn equatorial_point_has_zero_latitude() {
        let e = wgs84();
        let p = nalgebra::Vector3::new(e.a, 0.0, 0.0);
        let gp = e.to_geodetic(p);
        assert_abs_diff_eq!(gp.latitude, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(gp.altitude, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn flat_body_matches_exact_conversion_at_the_origin_itself() {
        let e = wgs84();
        let origin = crate::GeodeticPoint::new(0.3, 1.1, 50.0);
        let approx = e.to_geodetic_flat(origin, e.to_cartesian(origin));
        assert_abs_diff_eq!(approx.latitude, origin.latitude, epsilon = 1e-12);
        assert_abs_diff_eq!(approx.longitude, origin.longitude, epsilon = 1e-12);
        assert_abs_diff_eq!(approx.altitude, origin.altitude, epsilon = 1e-9);
    }

    #[test]
    fn flat_body_diverges_from_exact_conversion_a_few_kilometers_away() {
        let e = wgs84();
        let origin = crate::GeodeticPoint::new(0.3, 1.1, 0.0);
        let nearby = crate::GeodeticPoint::new(0.301, 1.101, 0.0);
        let point = e.to_cartesian(nearby);

        let exact = e.to_geodetic(point);
        let flat = e.to_geodetic_flat(origin, point);

        // Both approximate the same point closely, but not identically: the
        // flat-body linearization ignores the ellipsoid's curvature between
        // `origin` and `nearby`.
        assert_abs_diff_eq!(flat.latitude, exact.latitude, epsilon = 1e-6);
        assert!((flat.latitude - exact.latitude).abs() > 1e-12 || (flat.longitude - exact.longitude).abs() > 1e-12);
    }
}
