use thiserror::Error;

/// Errors raised while reading a [`Tile`](crate::Tile), populating the
/// [`TilesCache`](crate::TilesCache), or intersecting a ray with the terrain.
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum DemError {
    /// A query fell outside a tile's interior and no bilinear cell could be
    /// formed around it.
    #[error("indices ({lat_index}, {lon_index}) are outside tile bounds ({rows}, {cols})")]
    OutOfTileIndices {
        /// Latitude-axis cell index that was requested.
        lat_index: isize,
        /// Longitude-axis cell index that was requested.
        lon_index: isize,
        /// Number of rows in the tile.
        rows: usize,
        /// Number of columns in the tile.
        cols: usize,
    },

    /// A query's (lat, lon) does not fall within any tile the updater will
    /// admit to covering.
    #[error("no DEM data covers ({latitude}, {longitude})")]
    NoDemData {
        /// Requested latitude, radians.
        latitude: f64,
        /// Requested longitude, radians.
        longitude: f64,
    },

    /// Zipper synthesis needed the query's neighbor tiles but the cache
    /// does not have enough capacity to hold them all live.
    #[error("zipper synthesis needs {needed} live tiles but cache capacity is {capacity}")]
    TileWithoutRequiredNeighborsSelected {
        /// Tiles zipper synthesis needed live simultaneously.
        needed: usize,
        /// The cache's configured capacity.
        capacity: usize,
    },

    /// A tile was marked usable before every cell was populated.
    #[error("tile at ({min_lat}, {min_lon}) is empty")]
    EmptyTile {
        /// Tile's minimum latitude, radians.
        min_lat: f64,
        /// Tile's minimum longitude, radians.
        min_lon: f64,
    },

    /// The ray never reaches the bounding latitude/longitude/altitude box
    /// of any tile, so a Duvenhage walk cannot even begin.
    #[error("ray does not reach the DEM entry point; it points behind the spacecraft")]
    DemEntryPointIsBehindSpacecraft,

    /// A reference-ellipsoid computation needed by the intersection walk
    /// failed (the ray missed a bounding iso-surface entirely).
    #[error(transparent)]
    Geometry(#[from] rugged_ellipsoid::GeometryError),
}
