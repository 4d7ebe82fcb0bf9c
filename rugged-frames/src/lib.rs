#![deny(missing_docs)]
#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub use crate::{
    error::FramesError,
    interpolation::{AngularInterpolationFilter, AngularSample, CartesianInterpolationFilter, CartesianSample},
    spacecraft_to_body::SpacecraftToBody,
    transform::TimeStampedTransform,
};
pub use rugged_ellipsoid;

mod error;
mod hermite;
mod interpolation;
mod spacecraft_to_body;
mod transform;
