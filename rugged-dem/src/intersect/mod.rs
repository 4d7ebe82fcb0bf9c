//! Ray/terrain intersection algorithms (§4.3).
//!
//! This is a small, closed set of implementations consumed at hot-path
//! rates (once per pixel, per line, per scene), so it is a tagged enum over
//! concrete types rather than a trait object: no vtable indirection, and
//! the match in [`IntersectionAlgorithm`] is exhaustive and easy to extend.

mod basic_scan;
mod constant_elevation;
mod duvenhage;
mod ignore_dem;
mod walk;

use std::sync::Arc;

use nalgebra::Vector3;
use rugged_ellipsoid::{Ellipsoid, NormalizedGeodeticPoint};

pub use basic_scan::BasicScanForTestsOnly;
pub use constant_elevation::ConstantElevation;
pub use duvenhage::Duvenhage;
pub use ignore_dem::IgnoreDem;

use crate::{cache::TilesCache, error::DemError, tile_updater::TileUpdater};

/// Selects which ray/terrain intersection algorithm a `rugged-dem` consumer
/// runs. `U` is the [`TileUpdater`] backing the algorithms that need a
/// [`TilesCache`].
pub enum IntersectionAlgorithm<U> {
    /// No terrain: intersect the bare ellipsoid.
    IgnoreDem(IgnoreDem),
    /// Flat terrain at a fixed altitude.
    ConstantElevation(ConstantElevation),
    /// Exhaustive cell-by-cell scan; testing oracle only.
    BasicScan(BasicScanForTestsOnly<U>),
    /// Duvenhage's pruned kd-tree walk.
    Duvenhage(Duvenhage<U>),
}

impl<U: TileUpdater> IntersectionAlgorithm<U> {
    /// Convenience constructor for the [`Duvenhage`] variant.
    pub fn duvenhage(cache: Arc<TilesCache<U>>) -> Self {
        Self::Duvenhage(Duvenhage::new(cache))
    }

    /// Convenience constructor for the [`BasicScan`](Self::BasicScan)
    /// variant.
    pub fn basic_scan_for_tests_only(cache: Arc<TilesCache<U>>) -> Self {
        Self::BasicScan(BasicScanForTestsOnly::new(cache))
    }

    /// Finds the first point (smallest ray parameter) where the line of
    /// sight crosses the selected terrain model.
    pub fn intersection(&self, ellipsoid: &Ellipsoid, position: Vector3<f64>, los: Vector3<f64>) -> Result<NormalizedGeodeticPoint, DemError> {
        match self {
            Self::IgnoreDem(a) => a.intersection(ellipsoid, position, los),
            Self::ConstantElevation(a) => a.intersection(ellipsoid, position, los),
            Self::BasicScan(a) => a.intersection(ellipsoid, position, los),
            Self::Duvenhage(a) => a.intersection(ellipsoid, position, los),
        }
    }

    /// Refines a coarse ground point guess into an exact crossing.
    pub fn refine_intersection(
        &self,
        ellipsoid: &Ellipsoid,
        position: Vector3<f64>,
        los: Vector3<f64>,
        initial_guess: &NormalizedGeodeticPoint,
    ) -> Result<NormalizedGeodeticPoint, DemError> {
        match self {
            Self::IgnoreDem(a) => a.refine_intersection(ellipsoid, position, los, initial_guess),
            Self::ConstantElevation(a) => a.refine_intersection(ellipsoid, position, los, initial_guess),
            Self::BasicScan(a) => a.intersection(ellipsoid, position, los),
            Self::Duvenhage(a) => a.refine_intersection(ellipsoid, position, los, initial_guess),
        }
    }

    /// Terrain elevation at `(latitude, longitude)`.
    pub fn elevation(&self, latitude: f64, longitude: f64) -> Result<f64, DemError> {
        match self {
            Self::IgnoreDem(a) => Ok(a.elevation(latitude, longitude)),
            Self::ConstantElevation(a) => Ok(a.elevation(latitude, longitude)),
            Self::BasicScan(a) => a.elevation(latitude, longitude),
            Self::Duvenhage(a) => a.elevation(latitude, longitude),
        }
    }
}
