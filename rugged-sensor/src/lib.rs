#![deny(missing_docs)]
#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub use crate::{
    error::SensorError,
    line_datation::{AffineLineDatation, LineDatationKind, TabulatedLineDatation},
    line_sensor::LineSensor,
    mean_plane_crossing::{CrossingResult, SensorMeanPlaneCrossing},
    pixel_crossing::{SensorPixel, SensorPixelCrossing},
    time_dependent_los::{PolynomialLos, TabulatedLos, TimeDependentLosKind},
};

mod brent;
mod error;
mod line_datation;
mod line_sensor;
mod mean_plane_crossing;
mod pixel_crossing;
mod time_dependent_los;
