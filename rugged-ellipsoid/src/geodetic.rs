use crate::C;
use std::f64::consts::PI;

/// A geodetic (latitude, longitude, altitude) point.
///
/// Latitude and longitude are in radians, altitude in meters above the
/// reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticPoint {
    /// Geodetic latitude, radians.
    pub latitude: C,
    /// Geodetic longitude, radians.
    pub longitude: C,
    /// Altitude above the ellipsoid, meters.
    pub altitude: C,
}

impl GeodeticPoint {
    /// Returns a new geodetic point.
    pub fn new(latitude: C, longitude: C, altitude: C) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// Returns `self` with its longitude normalized into `[lc - pi, lc + pi)`
    /// around the given central longitude `lc`.
    pub fn normalize(self, central_longitude: C) -> NormalizedGeodeticPoint {
        NormalizedGeodeticPoint {
            point: GeodeticPoint {
                longitude: normalize_longitude(self.longitude, central_longitude),
                ..self
            },
            central_longitude,
        }
    }
}

/// A [`GeodeticPoint`] whose longitude is guaranteed to lie in
/// `[central_longitude - pi, central_longitude + pi)`.
///
/// Satellite imagery near the antimeridian would otherwise produce
/// longitudes that jump discontinuously between adjacent pixels; carrying
/// the reference longitude alongside the point lets every caller normalize
/// consistently relative to the tile or sensor swath it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedGeodeticPoint {
    point: GeodeticPoint,
    central_longitude: C,
}

impl NormalizedGeodeticPoint {
    /// Geodetic latitude, radians.
    pub fn latitude(&self) -> C {
        self.point.latitude
    }

    /// Geodetic longitude, radians, normalized to
    /// `[central_longitude - pi, central_longitude + pi)`.
    pub fn longitude(&self) -> C {
        self.point.longitude
    }

    /// Altitude above the ellipsoid, meters.
    pub fn altitude(&self) -> C {
        self.point.altitude
    }

    /// The central longitude this point was normalized against.
    pub fn central_longitude(&self) -> C {
        self.central_longitude
    }

    /// The underlying unnormalized point.
    pub fn point(&self) -> GeodeticPoint {
        self.point
    }
}

/// Normalizes `longitude` into `[center - pi, center + pi)`.
pub(crate) fn normalize_longitude(longitude: C, center: C) -> C {
    let two_pi = 2.0 * PI;
    longitude - two_pi * ((longitude - center + PI) / two_pi).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normalize_keeps_in_range_window() {
        let center = PI; // near antimeridian
        let lon = normalize_longitude(-PI + 1e-9, center);
        assert!(lon >= center - PI && lon < center + PI);
    }

    #[test]
    fn normalize_is_identity_when_already_in_range() {
        let lon = normalize_longitude(0.3, 0.0);
        assert_abs_diff_eq!(lon, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn normalize_wraps_across_antimeridian() {
        // A longitude of +179.9deg expressed relative to a central
        // longitude of -179.9deg should wrap to just below -180deg + 360deg
        // i.e. stay within [-180,180) relative window, not jump by 360deg.
        let center = (-179.9f64).to_radians();
        let lon = (179.9f64).to_radians();
        let normalized = normalize_longitude(lon, center);
        assert!(normalized >= center - PI && normalized < center + PI);
    }
}
