#![deny(missing_docs)]
#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub use crate::{
    cache::TilesCache,
    error::DemError,
    indexed_tile::IndexedTile,
    intersect::{BasicScanForTestsOnly, ConstantElevation, Duvenhage, IgnoreDem, IntersectionAlgorithm},
    kdtree::MinMaxKdTree,
    sample::Sample,
    store::CellStore,
    tile::{Tile, TileLocation},
    tile_updater::{TileUpdater, UpdatableTile},
};
pub use rugged_ellipsoid;

mod cache;
mod error;
mod indexed_tile;
mod intersect;
mod kdtree;
mod sample;
mod store;
mod tile;
mod tile_updater;
