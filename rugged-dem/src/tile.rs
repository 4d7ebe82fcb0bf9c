use crate::{error::DemError, store::CellStore, sample::Sample};

/// A rectangular DEM raster tile: a regular lat/lon grid of elevation
/// samples.
///
/// `(0, 0)` is the south-west corner; row index increases northward, column
/// index increases eastward. This matches how a `TileUpdater` naturally
/// fills a tile cell by cell from its own raster's origin convention.
pub struct Tile {
    min_lat: f64,
    min_lon: f64,
    lat_step: f64,
    lon_step: f64,
    rows: usize,
    cols: usize,
    min_elevation: f64,
    max_elevation: f64,
    samples: CellStore,
}

/// Where a query (lat, lon) falls relative to a tile's interpolable
/// interior (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLocation {
    /// Strictly inside rows `[0, R-2]` and columns `[0, C-2]`: bilinear
    /// interpolation can proceed without consulting a neighbor tile.
    HasInterpolationNeighbors,
    /// North of the tile's interior, within its column range.
    North,
    /// South of the tile's interior, within its column range.
    South,
    /// East of the tile's interior, within its row range.
    East,
    /// West of the tile's interior, within its row range.
    West,
    /// North-east of the tile's interior, outside both axes.
    NorthEast,
    /// North-west of the tile's interior, outside both axes.
    NorthWest,
    /// South-east of the tile's interior, outside both axes.
    SouthEast,
    /// South-west of the tile's interior, outside both axes.
    SouthWest,
}

impl Tile {
    /// Builds a tile from a populated [`CellStore`].
    ///
    /// # Panics
    ///
    /// Panics if `rows < 2`, `cols < 2`, `lat_step <= 0`, `lon_step <= 0`, or
    /// `samples` does not hold exactly `rows * cols` cells.
    pub fn new(
        min_lat: f64,
        min_lon: f64,
        lat_step: f64,
        lon_step: f64,
        rows: usize,
        cols: usize,
        samples: CellStore,
    ) -> Self {
        assert!(rows >= 2 && cols >= 2, "tile must be at least 2x2 cells");
        assert!(lat_step > 0.0 && lon_step > 0.0, "tile steps must be positive");
        assert_eq!(samples.len(), rows * cols, "sample count must equal rows * cols");
        let (min_elevation, max_elevation) = samples.min_max();
        Self {
            min_lat,
            min_lon,
            lat_step,
            lon_step,
            rows,
            cols,
            min_elevation,
            max_elevation,
            samples,
        }
    }

    /// Tile's minimum (south-most) latitude, radians.
    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    /// Tile's minimum (west-most) longitude, radians.
    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    /// Tile's maximum (north-most) latitude, radians.
    pub fn max_lat(&self) -> f64 {
        self.min_lat + (self.rows - 1) as f64 * self.lat_step
    }

    /// Tile's maximum (east-most) longitude, radians.
    pub fn max_lon(&self) -> f64 {
        self.min_lon + (self.cols - 1) as f64 * self.lon_step
    }

    /// Spacing between adjacent rows, radians.
    pub fn lat_step(&self) -> f64 {
        self.lat_step
    }

    /// Spacing between adjacent columns, radians.
    pub fn lon_step(&self) -> f64 {
        self.lon_step
    }

    /// Number of rows (latitude samples).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (longitude samples).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Lowest elevation sample in this tile.
    pub fn min_elevation(&self) -> f64 {
        self.min_elevation
    }

    /// Highest elevation sample in this tile.
    pub fn max_elevation(&self) -> f64 {
        self.max_elevation
    }

    /// Returns and iterator over every cell in the tile.
    pub fn iter(&self) -> impl Iterator<Item = Sample<'_>> + '_ {
        (0..self.rows * self.cols).map(|index| Sample::new(self, index))
    }

    /// Latitude of row `i`'s sample centers, radians.
    pub fn lat_of(&self, i: usize) -> f64 {
        self.min_lat + i as f64 * self.lat_step
    }

    /// Longitude of column `j`'s sample centers, radians.
    pub fn lon_of(&self, j: usize) -> f64 {
        self.min_lon + j as f64 * self.lon_step
    }

    /// Returns `floor((lat - minLat) / latStep)`, which may be negative or
    /// `>= rows` when `lat` lies outside the tile.
    pub fn latitude_index(&self, lat: f64) -> isize {
        ((lat - self.min_lat) / self.lat_step).floor() as isize
    }

    /// Returns `floor((lon - minLon) / lonStep)`, which may be negative or
    /// `>= cols` when `lon` lies outside the tile.
    pub fn longitude_index(&self, lon: f64) -> isize {
        ((lon - self.min_lon) / self.lon_step).floor() as isize
    }

    /// Returns whether `(lat, lon)` falls within this tile's outer bounds
    /// (not necessarily its interpolable interior; see [`location`](Self::location)).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat() && lat <= self.max_lat() && lon >= self.min_lon() && lon <= self.max_lon()
    }

    /// Classifies a query (lat, lon) relative to this tile's interior.
    pub fn location(&self, lat: f64, lon: f64) -> TileLocation {
        let i = self.latitude_index(lat);
        let j = self.longitude_index(lon);
        let interior_i = i >= 0 && (i as usize) <= self.rows.saturating_sub(2);
        let interior_j = j >= 0 && (j as usize) <= self.cols.saturating_sub(2);

        match (interior_i, interior_j) {
            (true, true) => TileLocation::HasInterpolationNeighbors,
            (false, true) => {
                if i < 0 {
                    TileLocation::South
                } else {
                    TileLocation::North
                }
            }
            (true, false) => {
                if j < 0 {
                    TileLocation::West
                } else {
                    TileLocation::East
                }
            }
            (false, false) => match (i < 0, j < 0) {
                (true, true) => TileLocation::SouthWest,
                (true, false) => TileLocation::SouthEast,
                (false, true) => TileLocation::NorthWest,
                (false, false) => TileLocation::NorthEast,
            },
        }
    }

    /// Raw row-major index for cell `(i, j)`.
    pub(crate) fn linear_index(&self, i: usize, j: usize) -> usize {
        i * self.cols + j
    }

    /// Elevation at raw cell `(i, j)`. Panics if out of bounds.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let idx = self.linear_index(i, j);
        self.samples.get_unchecked(idx)
    }

    /// Bilinearly interpolates the terrain height at `(lat, lon)`.
    ///
    /// `u` runs along the latitude axis, `v` along longitude, matching
    /// z(lat, lon) = (1-u)(1-v) e00 + u(1-v) e10 + (1-u)v e01 + uv e11.
    pub fn interpolate_elevation(&self, lat: f64, lon: f64) -> Result<f64, DemError> {
        let i = self.latitude_index(lat);
        let j = self.longitude_index(lon);
        if i < 0 || j < 0 || i as usize > self.rows - 2 || j as usize > self.cols - 2 {
            return Err(DemError::OutOfTileIndices {
                lat_index: i,
                lon_index: j,
                rows: self.rows,
                cols: self.cols,
            });
        }
        let (i, j) = (i as usize, j as usize);
        let u = (lat - self.lat_of(i)) / self.lat_step;
        let v = (lon - self.lon_of(j)) / self.lon_step;

        let e00 = self.get(i, j);
        let e10 = self.get(i + 1, j);
        let e01 = self.get(i, j + 1);
        let e11 = self.get(i + 1, j + 1);

        Ok((1.0 - u) * (1.0 - v) * e00 + u * (1.0 - v) * e10 + (1.0 - u) * v * e01 + u * v * e11)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn flat_tile() -> Tile {
        let samples: Vec<f64> = vec![10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 30.0, 30.0, 30.0];
        Tile::new(0.0, 0.0, 1.0, 1.0, 3, 3, CellStore::new(samples.into_boxed_slice()))
    }

    #[test]
    fn interior_query_interpolates_to_corner_value() {
        let tile = flat_tile();
        let z = tile.interpolate_elevation(1.0, 1.0).unwrap();
        assert_abs_diff_eq!(z, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn out_of_tile_query_fails() {
        let tile = flat_tile();
        assert!(tile.interpolate_elevation(5.0, 5.0).is_err());
    }

    #[test]
    fn location_classifies_corner() {
        let tile = flat_tile();
        assert_eq!(tile.location(1.0, 1.0), TileLocation::HasInterpolationNeighbors);
        assert_eq!(tile.location(-1.0, 1.0), TileLocation::South);
        assert_eq!(tile.location(5.0, 5.0), TileLocation::NorthEast);
    }
}
