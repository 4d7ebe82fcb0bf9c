use std::sync::Arc;

use nalgebra::Vector3;
use rugged_ellipsoid::{point_at_altitude_k, Ellipsoid, NormalizedGeodeticPoint};

use crate::{
    cache::TilesCache,
    error::DemError,
    intersect::walk::{walk_within_tile, WalkOutcome},
    tile_updater::TileUpdater,
};

/// Brute-force ray/terrain intersection: the same per-cell bisection as
/// [`Duvenhage`](crate::Duvenhage), but attempted on every cell the ray's
/// horizontal projection crosses, without the kd-tree pruning step.
///
/// Exists only as a cross-check oracle for testing `Duvenhage`'s pruning;
/// do not reach for it outside tests, its cost grows with the number of
/// cells rather than the number of cells pruning can't rule out.
pub struct BasicScanForTestsOnly<U> {
    cache: Arc<TilesCache<U>>,
}

impl<U: TileUpdater> BasicScanForTestsOnly<U> {
    /// Builds an algorithm instance backed by `cache`.
    pub fn new(cache: Arc<TilesCache<U>>) -> Self {
        Self { cache }
    }

    /// Finds the first point (smallest `k`) where the ray crosses the DEM
    /// terrain surface, visiting every cell along the way.
    pub fn intersection(&self, ellipsoid: &Ellipsoid, position: Vector3<f64>, los: Vector3<f64>) -> Result<NormalizedGeodeticPoint, DemError> {
        let central_longitude = position.y.atan2(position.x);

        let (_, coarse) = rugged_ellipsoid::point_on_ground_k(ellipsoid, position, los, central_longitude)
            .map_err(|_| DemError::DemEntryPointIsBehindSpacecraft)?;
        let mut tile = self.cache.get_tile(coarse.latitude(), coarse.longitude())?;
        let (mut k, mut point) = point_at_altitude_k(ellipsoid, position, los, tile.max_elevation(), central_longitude)
            .map_err(|_| DemError::DemEntryPointIsBehindSpacecraft)?;

        for _ in 0..64 {
            if !tile.contains(point.latitude(), point.longitude()) {
                tile = self.cache.get_tile(point.latitude(), point.longitude())?;
            }
            match walk_within_tile(&tile, ellipsoid, position, los, k, central_longitude, false) {
                WalkOutcome::Hit(k_hit, gp_hit) => return Ok(gp_hit),
                WalkOutcome::Exited(k_exit, _) => {
                    let nudge = 1.0e-9_f64.max(tile.lat_step().min(tile.lon_step()) * 1.0e-6);
                    k = k_exit + nudge;
                    point = ellipsoid.to_geodetic(position + k * los).normalize(central_longitude);
                }
            }
        }

        Err(DemError::DemEntryPointIsBehindSpacecraft)
    }

    /// Terrain elevation at `(latitude, longitude)`.
    pub fn elevation(&self, latitude: f64, longitude: f64) -> Result<f64, DemError> {
        let tile = self.cache.get_tile(latitude, longitude)?;
        Ok(tile.interpolate_elevation(latitude, longitude)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::duvenhage::Duvenhage;
    use approx::assert_abs_diff_eq;
    use rugged_ellipsoid::{BodyFrameId, EllipsoidId, GeodeticPoint};

    use crate::tile_updater::UpdatableTile;

    struct RampUpdater;

    impl TileUpdater for RampUpdater {
        fn update_tile(&self, lat: f64, lon: f64, out: &mut UpdatableTile) {
            let tile_size = 0.01_f64;
            let min_lat = (lat / tile_size).floor() * tile_size;
            let min_lon = (lon / tile_size).floor() * tile_size;
            let step = tile_size / 8.0;
            out.set_geometry(min_lat, min_lon, step, step, 9, 9);
            for i in 0..9 {
                for j in 0..9 {
                    out.set_elevation(i, j, 50.0 + 5.0 * i as f64 + 2.0 * j as f64);
                }
            }
        }
    }

    fn wgs84() -> Ellipsoid {
        Ellipsoid::from_id(EllipsoidId::Wgs84, BodyFrameId::Itrf)
    }

    fn nadir_view(e: &Ellipsoid, lat: f64, lon: f64, range: f64) -> (Vector3<f64>, Vector3<f64>) {
        let surface = e.to_cartesian(GeodeticPoint::new(lat, lon, 0.0));
        let zenith = Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin());
        (surface + zenith * range, -zenith)
    }

    #[test]
    fn agrees_with_duvenhage_on_ramp_terrain() {
        let e = wgs84();
        let cache_scan = Arc::new(TilesCache::new(RampUpdater, 16));
        let cache_duv = Arc::new(TilesCache::new(RampUpdater, 16));
        let scan = BasicScanForTestsOnly::new(cache_scan);
        let duvenhage = Duvenhage::new(cache_duv);

        let (position, los) = nadir_view(&e, 0.0055, 0.0045, 600_000.0);

        let scan_gp = scan.intersection(&e, position, los).unwrap();
        let duv_gp = duvenhage.intersection(&e, position, los).unwrap();

        assert_abs_diff_eq!(scan_gp.altitude(), duv_gp.altitude(), epsilon = 1e-6);
        assert_abs_diff_eq!(scan_gp.latitude(), duv_gp.latitude(), epsilon = 1e-12);
        assert_abs_diff_eq!(scan_gp.longitude(), duv_gp.longitude(), epsilon = 1e-12);
    }
}
