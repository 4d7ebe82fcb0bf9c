use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use lru::LruCache;
use log::debug;

use crate::{
    error::DemError,
    indexed_tile::IndexedTile,
    store::CellStore,
    tile::{Tile, TileLocation},
    tile_updater::{TileUpdater, UpdatableTile},
};

#[derive(Clone, PartialEq, Eq, Hash)]
struct TileKey {
    min_lat: u64,
    min_lon: u64,
    lat_step: u64,
    lon_step: u64,
    rows: usize,
    cols: usize,
}

impl TileKey {
    fn from_tile(tile: &Tile) -> Self {
        Self {
            min_lat: tile.min_lat().to_bits(),
            min_lon: tile.min_lon().to_bits(),
            lat_step: tile.lat_step().to_bits(),
            lon_step: tile.lon_step().to_bits(),
            rows: tile.rows(),
            cols: tile.cols(),
        }
    }
}

/// Fixed-capacity LRU cache of [`Tile`]s, populated on demand by a
/// [`TileUpdater`] and stitching seams between neighboring tiles with
/// synthesized zipper tiles (§4.2).
pub struct TilesCache<U> {
    updater: U,
    capacity: usize,
    tiles: Mutex<LruCache<TileKey, Arc<IndexedTile>>>,
    allocations: AtomicUsize,
}

impl<U: TileUpdater> TilesCache<U> {
    /// Builds a cache with room for `capacity` tiles.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(updater: U, capacity: usize) -> Self {
        let capacity_nz = NonZeroUsize::new(capacity).expect("cache capacity must be nonzero");
        Self {
            updater,
            capacity,
            tiles: Mutex::new(LruCache::new(capacity_nz)),
            allocations: AtomicUsize::new(0),
        }
    }

    /// Configured cache capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tiles the `TileUpdater` has been asked to populate over
    /// this cache's lifetime. Exposed for the cache-eviction testable
    /// property (P6), which asserts this count stays flat under repeated
    /// in-window queries.
    pub fn allocation_count(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Returns a tile covering `(lat, lon)`, interpolable at that point:
    /// either a cached/fetched raw tile when the query already sits in its
    /// interior, or a synthesized zipper tile when the query is within two
    /// cells of a tile border.
    pub fn get_tile(&self, lat: f64, lon: f64) -> Result<Arc<IndexedTile>, DemError> {
        let base = self.find_or_fetch(lat, lon)?;
        match base.location(lat, lon) {
            TileLocation::HasInterpolationNeighbors => Ok(base),
            loc => self.zipper(lat, lon, &base, loc),
        }
    }

    fn find_or_fetch(&self, lat: f64, lon: f64) -> Result<Arc<IndexedTile>, DemError> {
        {
            let mut tiles = self.tiles.lock().unwrap();
            let found = tiles.iter().find(|(_, t)| t.contains(lat, lon)).map(|(k, _)| k.clone());
            if let Some(key) = found {
                return Ok(tiles.get(&key).unwrap().clone());
            }
        }

        let mut out = UpdatableTile::new();
        self.updater.update_tile(lat, lon, &mut out);
        let tile = out.finish().map_err(|_| DemError::NoDemData { latitude: lat, longitude: lon })?;
        if !tile.contains(lat, lon) {
            return Err(DemError::NoDemData { latitude: lat, longitude: lon });
        }
        self.allocations.fetch_add(1, Ordering::Relaxed);
        debug!("DEM tile miss at ({lat}, {lon}); fetched new tile ({} x {})", tile.rows(), tile.cols());

        let key = TileKey::from_tile(&tile);
        let arc = Arc::new(IndexedTile::new(tile));
        let mut tiles = self.tiles.lock().unwrap();
        tiles.put(key, arc.clone());
        Ok(arc)
    }

    fn zipper(&self, lat: f64, lon: f64, base: &Arc<IndexedTile>, loc: TileLocation) -> Result<Arc<IndexedTile>, DemError> {
        if self.capacity < 9 {
            return Err(DemError::TileWithoutRequiredNeighborsSelected { needed: 9, capacity: self.capacity });
        }

        let needs_north = matches!(loc, TileLocation::North | TileLocation::NorthEast | TileLocation::NorthWest);
        let needs_south = matches!(loc, TileLocation::South | TileLocation::SouthEast | TileLocation::SouthWest);
        let needs_east = matches!(loc, TileLocation::East | TileLocation::NorthEast | TileLocation::SouthEast);
        let needs_west = matches!(loc, TileLocation::West | TileLocation::NorthWest | TileLocation::SouthWest);

        let lat_neighbor = if needs_north {
            Some(self.find_or_fetch(base.max_lat() + base.lat_step(), lon)?)
        } else if needs_south {
            Some(self.find_or_fetch(base.min_lat() - base.lat_step(), lon)?)
        } else {
            None
        };
        let lon_neighbor = if needs_east {
            Some(self.find_or_fetch(lat, base.max_lon() + base.lon_step())?)
        } else if needs_west {
            Some(self.find_or_fetch(lat, base.min_lon() - base.lon_step())?)
        } else {
            None
        };
        let corner_neighbor = match (&lat_neighbor, &lon_neighbor) {
            (Some(_), Some(_)) => {
                let lat_q = if needs_north { base.max_lat() + base.lat_step() } else { base.min_lat() - base.lat_step() };
                let lon_q = if needs_east { base.max_lon() + base.lon_step() } else { base.min_lon() - base.lon_step() };
                Some(self.find_or_fetch(lat_q, lon_q)?)
            }
            _ => None,
        };

        debug!("synthesizing zipper tile for ({lat}, {lon}), location {loc:?}");

        let lat_step_z = lat_neighbor.as_ref().map_or(base.lat_step(), |n| base.lat_step().min(n.lat_step()));
        let lon_step_z = lon_neighbor.as_ref().map_or(base.lon_step(), |n| base.lon_step().min(n.lon_step()));

        let seam_lat = if needs_north {
            base.max_lat()
        } else if needs_south {
            base.min_lat()
        } else {
            lat
        };
        let seam_lon = if needs_east {
            base.max_lon()
        } else if needs_west {
            base.min_lon()
        } else {
            lon
        };

        let min_lat_z = seam_lat - 2.0 * lat_step_z;
        let min_lon_z = seam_lon - 2.0 * lon_step_z;

        let vertical_split = needs_north || needs_south;
        let horizontal_split = needs_east || needs_west;

        let mut samples = Vec::with_capacity(16);
        for i in 0..4 {
            let lat_c = min_lat_z + i as f64 * lat_step_z;
            let row_is_north_half = i >= 2;
            for j in 0..4 {
                let lon_c = min_lon_z + j as f64 * lon_step_z;
                let col_is_east_half = j >= 2;

                let use_lat_neighbor = vertical_split && ((needs_north && row_is_north_half) || (needs_south && !row_is_north_half));
                let use_lon_neighbor = horizontal_split && ((needs_east && col_is_east_half) || (needs_west && !col_is_east_half));

                let source = match (use_lat_neighbor, use_lon_neighbor) {
                    (false, false) => base.tile(),
                    (true, false) => lat_neighbor.as_ref().unwrap().tile(),
                    (false, true) => lon_neighbor.as_ref().unwrap().tile(),
                    (true, true) => corner_neighbor.as_ref().unwrap().tile(),
                };

                samples.push(nearest_sample(source, lat_c, lon_c, lat_step_z, lon_step_z));
            }
        }

        let zipper_tile = Tile::new(min_lat_z, min_lon_z, lat_step_z, lon_step_z, 4, 4, CellStore::new(samples.into_boxed_slice()));
        Ok(Arc::new(IndexedTile::new(zipper_tile)))
    }
}

/// Samples `tile` at `(lat, lon)`.
///
/// Same-resolution seams (the tile's own step equals the zipper's step)
/// land exactly on one of `tile`'s rows/columns, so nearest-index rounding
/// is exact. Different-resolution (coarser) tiles are sampled by `floor`
/// index, matching the finer side's own rounding at the shared boundary
/// (§9 design note decision).
fn nearest_sample(tile: &Tile, lat: f64, lon: f64, lat_step_z: f64, lon_step_z: f64) -> f64 {
    let same_resolution = (tile.lat_step() - lat_step_z).abs() < 1e-15 && (tile.lon_step() - lon_step_z).abs() < 1e-15;
    let (i, j) = if same_resolution {
        let i = ((lat - tile.min_lat()) / tile.lat_step()).round() as isize;
        let j = ((lon - tile.min_lon()) / tile.lon_step()).round() as isize;
        (i, j)
    } else {
        let i = ((lat - tile.min_lat()) / tile.lat_step()).floor() as isize;
        let j = ((lon - tile.min_lon()) / tile.lon_step()).floor() as isize;
        (i, j)
    };
    let i = i.clamp(0, tile.rows() as isize - 1) as usize;
    let j = j.clamp(0, tile.cols() as isize - 1) as usize;
    tile.get(i, j)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GridUpdater {
        tile_size: f64,
        step: f64,
    }

    impl TileUpdater for GridUpdater {
        fn update_tile(&self, lat: f64, lon: f64, out: &mut UpdatableTile) {
            let min_lat = (lat / self.tile_size).floor() * self.tile_size;
            let min_lon = (lon / self.tile_size).floor() * self.tile_size;
            let n = (self.tile_size / self.step).round() as usize + 1;
            out.set_geometry(min_lat, min_lon, self.step, self.step, n, n);
            for i in 0..n {
                for j in 0..n {
                    out.set_elevation(i, j, (i + j) as f64);
                }
            }
        }
    }

    #[test]
    fn repeated_interior_queries_do_not_reallocate() {
        let cache = TilesCache::new(GridUpdater { tile_size: 1.0, step: 0.1 }, 9);
        cache.get_tile(0.5, 0.5).unwrap();
        for _ in 0..100 {
            cache.get_tile(0.5, 0.5).unwrap();
        }
        assert_eq!(cache.allocation_count(), 1);
    }

    #[test]
    fn zipper_requires_capacity_of_nine() {
        let cache = TilesCache::new(GridUpdater { tile_size: 1.0, step: 0.1 }, 4);
        // A query right at the tile's north edge triggers zipper synthesis.
        let err = cache.get_tile(0.999_999, 0.5);
        assert!(err.is_err());
    }

    #[test]
    fn evicting_a_tile_triggers_refetch() {
        let cache = TilesCache::new(GridUpdater { tile_size: 1.0, step: 0.1 }, 1);
        cache.get_tile(0.5, 0.5).unwrap();
        cache.get_tile(5.5, 5.5).unwrap(); // different tile, evicts the first
        assert_eq!(cache.allocation_count(), 2);
        cache.get_tile(0.5, 0.5).unwrap(); // re-fetch
        assert_eq!(cache.allocation_count(), 3);
    }
}
