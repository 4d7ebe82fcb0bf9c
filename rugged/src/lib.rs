#![deny(missing_docs)]
#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub use crate::{
    builder::{IntersectionAlgorithmKind, RuggedBuilder},
    dumper::{Dumper, TextDumper},
    error::RuggedError,
    replay::{ReplayReader, ReplayedCall},
    rugged::Rugged,
};
pub use rugged_dem;
pub use rugged_ellipsoid;
pub use rugged_frames;
pub use rugged_sensor;

mod builder;
mod correction;
mod dumper;
mod error;
mod replay;
#[allow(clippy::module_inception)]
mod rugged;
