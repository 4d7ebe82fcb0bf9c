use crate::{error::DemError, store::CellStore, tile::Tile};

/// External collaborator that populates a [`Tile`] covering a requested
/// `(lat, lon)`.
///
/// Concrete raster-file readers (GeoTIFF, HGT, …) are the embedding
/// application's concern and out of scope here; this crate only defines the
/// contract and the handle it populates. Test code is free to implement
/// trivial in-memory updaters (synthetic cones, planes) to exercise the
/// intersection algorithms without a file format.
pub trait TileUpdater {
    /// Populates `out` with the geometry and elevation values of whichever
    /// tile covers `(lat, lon)`. Leaving `out` without a complete geometry
    /// and every cell set means "no data here" and surfaces as
    /// [`DemError::NoDemData`].
    fn update_tile(&self, lat: f64, lon: f64, out: &mut UpdatableTile);
}

/// The handle a [`TileUpdater`] populates.
///
/// Call [`set_geometry`](Self::set_geometry) once, then
/// [`set_elevation`](Self::set_elevation) for every `(i, j)` cell.
#[derive(Default)]
pub struct UpdatableTile {
    geometry: Option<(f64, f64, f64, f64, usize, usize)>,
    elevations: Vec<f64>,
}

impl UpdatableTile {
    /// Returns a fresh, empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the tile's raster parameters. Must be called before
    /// [`set_elevation`](Self::set_elevation).
    pub fn set_geometry(&mut self, min_lat: f64, min_lon: f64, lat_step: f64, lon_step: f64, rows: usize, cols: usize) {
        self.geometry = Some((min_lat, min_lon, lat_step, lon_step, rows, cols));
        self.elevations = vec![f64::NAN; rows * cols];
    }

    /// Sets the elevation of cell `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if called before [`set_geometry`](Self::set_geometry) or with
    /// an out-of-bounds `(i, j)`.
    pub fn set_elevation(&mut self, i: usize, j: usize, elevation: f64) {
        let (_, _, _, _, _rows, cols) = self.geometry.expect("set_geometry must be called before set_elevation");
        self.elevations[i * cols + j] = elevation;
    }

    /// Finalizes the handle into a [`Tile`], or fails with
    /// [`DemError::EmptyTile`] if geometry was never set or a cell is
    /// missing.
    pub(crate) fn finish(self) -> Result<Tile, DemError> {
        let (min_lat, min_lon, lat_step, lon_step, rows, cols) = self.geometry.ok_or(DemError::EmptyTile {
            min_lat: f64::NAN,
            min_lon: f64::NAN,
        })?;
        if self.elevations.iter().any(|e| e.is_nan()) {
            return Err(DemError::EmptyTile { min_lat, min_lon });
        }
        Ok(Tile::new(min_lat, min_lon, lat_step, lon_step, rows, cols, CellStore::new(self.elevations.into_boxed_slice())))
    }
}
