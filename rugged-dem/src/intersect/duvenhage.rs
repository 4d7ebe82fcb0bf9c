use std::sync::Arc;

use nalgebra::Vector3;
use rugged_ellipsoid::{point_at_altitude_k, Ellipsoid, NormalizedGeodeticPoint};

use crate::{
    cache::TilesCache,
    error::DemError,
    intersect::walk::{walk_within_tile, WalkOutcome},
    tile_updater::TileUpdater,
};

/// Maximum number of tile crossings a single ray is allowed before giving
/// up; bounds the walk for rays that graze a tile boundary repeatedly.
const MAX_TILE_CROSSINGS: usize = 64;

/// Duvenhage's ray/terrain intersection algorithm (§4.1, §4.3): march the
/// ray cell by cell through the DEM, pruning whole cells with the tile's
/// min/max kd-tree, and resolve the bilinear-cell crossing exactly.
pub struct Duvenhage<U> {
    cache: Arc<TilesCache<U>>,
    flat_body: bool,
}

impl<U: TileUpdater> Duvenhage<U> {
    /// Builds an algorithm instance backed by `cache`.
    pub fn new(cache: Arc<TilesCache<U>>) -> Self {
        Self { cache, flat_body: false }
    }

    /// When set, the ellipsoid/tile crossing math treats the body as flat
    /// locally (§4.3 flat-body variant): cheaper, appropriate for small
    /// swaths where curvature is negligible relative to pixel footprint.
    ///
    /// Replaces each tile walk step's exact ellipsoid-to-geodetic
    /// conversion with a linear approximation in the local tangent plane
    /// anchored at the tile's entry point (see
    /// [`Ellipsoid::to_geodetic_flat`](rugged_ellipsoid::Ellipsoid::to_geodetic_flat)),
    /// strictly for validation against the exact path, not operational use.
    pub fn with_flat_body(mut self, flat_body: bool) -> Self {
        self.flat_body = flat_body;
        self
    }

    /// Whether the flat-body variant was requested.
    pub fn flat_body(&self) -> bool {
        self.flat_body
    }

    /// Finds the first point (smallest `k`) where the ray crosses the DEM
    /// terrain surface.
    pub fn intersection(&self, ellipsoid: &Ellipsoid, position: Vector3<f64>, los: Vector3<f64>) -> Result<NormalizedGeodeticPoint, DemError> {
        self.locate(ellipsoid, position, los, true).map(|(_, gp)| gp)
    }

    /// Refines a coarse guess into the exact crossing.
    ///
    /// [`intersection`](Self::intersection) already resolves the exact
    /// bilinear-cell crossing (no separate coarse step), so refining from a
    /// nearby guess degenerates to solving the same walk; `initial_guess` is
    /// accepted for interface symmetry with the other algorithms but is not
    /// otherwise consulted.
    pub fn refine_intersection(
        &self,
        ellipsoid: &Ellipsoid,
        position: Vector3<f64>,
        los: Vector3<f64>,
        _initial_guess: &NormalizedGeodeticPoint,
    ) -> Result<NormalizedGeodeticPoint, DemError> {
        self.intersection(ellipsoid, position, los)
    }

    /// Terrain elevation at `(latitude, longitude)`, bilinearly interpolated
    /// from whichever cached tile covers it.
    pub fn elevation(&self, latitude: f64, longitude: f64) -> Result<f64, DemError> {
        let tile = self.cache.get_tile(latitude, longitude)?;
        Ok(tile.interpolate_elevation(latitude, longitude)?)
    }

    fn locate(&self, ellipsoid: &Ellipsoid, position: Vector3<f64>, los: Vector3<f64>, prune: bool) -> Result<(f64, NormalizedGeodeticPoint), DemError> {
        let central_longitude = position.y.atan2(position.x);

        // Coarse guess at the ellipsoid surface, just to pick a starting tile.
        let (_, coarse) = rugged_ellipsoid::point_on_ground_k(ellipsoid, position, los, central_longitude)
            .map_err(|_| DemError::DemEntryPointIsBehindSpacecraft)?;
        let mut tile = self.cache.get_tile(coarse.latitude(), coarse.longitude())?;

        // Enter the tile's altitude slab from above, at its highest sample.
        let (mut k, mut point) = point_at_altitude_k(ellipsoid, position, los, tile.max_elevation(), central_longitude)
            .map_err(|_| DemError::DemEntryPointIsBehindSpacecraft)?;

        for _ in 0..MAX_TILE_CROSSINGS {
            if !tile.contains(point.latitude(), point.longitude()) {
                tile = self.cache.get_tile(point.latitude(), point.longitude())?;
            }

            match walk_within_tile(&tile, ellipsoid, position, los, k, central_longitude, prune, self.flat_body) {
                WalkOutcome::Hit(k_hit, gp_hit) => return Ok((k_hit, gp_hit)),
                WalkOutcome::Exited(k_exit, _) => {
                    // Nudge past the boundary so the next `get_tile` lands in
                    // the neighboring tile rather than re-fetching this one.
                    let nudge = 1.0e-9_f64.max(tile.lat_step().min(tile.lon_step()) * 1.0e-6);
                    k = k_exit + nudge;
                    point = ellipsoid.to_geodetic(position + k * los).normalize(central_longitude);
                }
            }
        }

        Err(DemError::DemEntryPointIsBehindSpacecraft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rugged_ellipsoid::{BodyFrameId, EllipsoidId, GeodeticPoint};

    use crate::tile_updater::UpdatableTile;

    struct FlatUpdater {
        elevation: f64,
    }

    impl TileUpdater for FlatUpdater {
        fn update_tile(&self, lat: f64, lon: f64, out: &mut UpdatableTile) {
            let tile_size = 0.01_f64;
            let min_lat = (lat / tile_size).floor() * tile_size;
            let min_lon = (lon / tile_size).floor() * tile_size;
            out.set_geometry(min_lat, min_lon, tile_size / 4.0, tile_size / 4.0, 5, 5);
            for i in 0..5 {
                for j in 0..5 {
                    out.set_elevation(i, j, self.elevation);
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
    fn finds_flat_terrain_crossing() {
        let e = wgs84();
        let cache = Arc::new(TilesCache::new(FlatUpdater { elevation: 120.0 }, 16));
        let duvenhage = Duvenhage::new(cache);

        let (position, los) = nadir_view(&e, 0.005, 0.005, 600_000.0);
        let gp = duvenhage.intersection(&e, position, los).unwrap();

        assert_abs_diff_eq!(gp.altitude(), 120.0, epsilon = 1e-3);
        assert_abs_diff_eq!(gp.latitude(), 0.005, epsilon = 1e-6);
        assert_abs_diff_eq!(gp.longitude(), 0.005, epsilon = 1e-6);
    }

    #[test]
    fn flat_body_variant_still_finds_the_crossing() {
        let e = wgs84();
        let cache = Arc::new(TilesCache::new(FlatUpdater { elevation: 150.0 }, 16));
        let duvenhage = Duvenhage::new(cache).with_flat_body(true);
        assert!(duvenhage.flat_body());

        let (position, los) = nadir_view(&e, 0.6, 0.3, 600_000.0);
        let gp = duvenhage.intersection(&e, position, los).unwrap();

        // The flat-body linearization is only approximate, unlike the exact
        // variant's ~1e-6 tolerance in `finds_flat_terrain_crossing`.
        assert_abs_diff_eq!(gp.altitude(), 150.0, epsilon = 1e-2);
        assert_abs_diff_eq!(gp.latitude(), 0.6, epsilon = 1e-5);
        assert_abs_diff_eq!(gp.longitude(), 0.3, epsilon = 1e-5);
    }

    #[test]
    fn elevation_matches_flat_tile() {
        let cache = Arc::new(TilesCache::new(FlatUpdater { elevation: 77.0 }, 16));
        let duvenhage = Duvenhage::new(cache);
        assert_abs_diff_eq!(duvenhage.elevation(0.005, 0.005).unwrap(), 77.0, epsilon = 1e-9);
    }
}
