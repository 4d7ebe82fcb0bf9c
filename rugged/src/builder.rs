use std::collections::HashMap;
use std::sync::Arc;

use rugged_dem::{
    BasicScanForTestsOnly, ConstantElevation, Duvenhage, IgnoreDem, IntersectionAlgorithm, TileUpdater, TilesCache,
};
use rugged_ellipsoid::{BodyFrameId, Ellipsoid, EllipsoidId, InertialFrameId};
use rugged_frames::SpacecraftToBody;
use rugged_sensor::LineSensor;

use crate::error::RuggedError;
use crate::rugged::Rugged;

/// Selects an [`IntersectionAlgorithm`] and its construction parameters,
/// mirroring the builder configuration enumeration of §6.
pub enum IntersectionAlgorithmKind {
    /// Duvenhage's pruned kd-tree walk.
    Duvenhage,
    /// Duvenhage with the flat-body simplification enabled; tests only.
    DuvenhageFlatBody,
    /// Exhaustive cell-by-cell scan; testing oracle only.
    BasicSlowExhaustiveScanForTestsOnly,
    /// Flat terrain at a fixed altitude above the ellipsoid.
    ConstantElevationOverEllipsoid {
        /// Altitude above the ellipsoid, meters.
        elevation: f64,
    },
    /// No terrain at all: the bare ellipsoid surface.
    IgnoreDemUseEllipsoid,
}

/// Builds an immutable [`Rugged`] instance.
///
/// The single constructor surface for the façade: collects the ellipsoid,
/// frames, intersection algorithm, frame-transform interpolator, and
/// named line sensors, validating everything before [`build`](Self::build)
/// hands back an instance with no further mutation points.
pub struct RuggedBuilder<U> {
    ellipsoid_id: Option<EllipsoidId>,
    inertial_frame: Option<InertialFrameId>,
    body_frame: Option<BodyFrameId>,
    algorithm_kind: Option<IntersectionAlgorithmKind>,
    tile_updater: Option<U>,
    cache_capacity: usize,
    sc_to_body: Option<SpacecraftToBody>,
    sensors: HashMap<String, LineSensor>,
    light_time_correction: bool,
    aberration_of_light_correction: bool,
}

impl<U> Default for RuggedBuilder<U> {
    fn default() -> Self {
        Self {
            ellipsoid_id: None,
            inertial_frame: None,
            body_frame: None,
            algorithm_kind: None,
            tile_updater: None,
            cache_capacity: 9,
            sc_to_body: None,
            sensors: HashMap::new(),
            light_time_correction: false,
            aberration_of_light_correction: false,
        }
    }
}

impl<U: TileUpdater> RuggedBuilder<U> {
    /// Returns a fresh, empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the reference ellipsoid.
    pub fn with_ellipsoid(mut self, id: EllipsoidId) -> Self {
        self.ellipsoid_id = Some(id);
        self
    }

    /// Selects the inertial frame ephemerides are expressed in.
    pub fn with_inertial_frame(mut self, id: InertialFrameId) -> Self {
        self.inertial_frame = Some(id);
        self
    }

    /// Selects the Earth-fixed body frame ground points are expressed in.
    pub fn with_body_frame(mut self, id: BodyFrameId) -> Self {
        self.body_frame = Some(id);
        self
    }

    /// Selects the terrain intersection algorithm.
    pub fn with_algorithm(mut self, kind: IntersectionAlgorithmKind) -> Self {
        self.algorithm_kind = Some(kind);
        self
    }

    /// Supplies the DEM raster collaborator and the tile cache capacity
    /// (ignored by algorithms that do not consult a DEM).
    pub fn with_tile_updater(mut self, updater: U, cache_capacity: usize) -> Self {
        self.tile_updater = Some(updater);
        self.cache_capacity = cache_capacity;
        self
    }

    /// Supplies the pre-built spacecraft/body frame-transform interpolator.
    pub fn with_sc_to_body(mut self, sc_to_body: SpacecraftToBody) -> Self {
        self.sc_to_body = Some(sc_to_body);
        self
    }

    /// Toggles the light-time correction (§4.8).
    pub fn with_light_time_correction(mut self, enabled: bool) -> Self {
        self.light_time_correction = enabled;
        self
    }

    /// Toggles the aberration-of-light correction (§4.8).
    pub fn with_aberration_of_light_correction(mut self, enabled: bool) -> Self {
        self.aberration_of_light_correction = enabled;
        self
    }

    /// Adds a named line sensor.
    ///
    /// # Errors
    ///
    /// Returns [`RuggedError::DuplicatedParameterName`] if a sensor with
    /// the same name was already added.
    pub fn add_line_sensor(mut self, sensor: LineSensor) -> Result<Self, RuggedError> {
        let name = sensor.name().to_string();
        if self.sensors.contains_key(&name) {
            return Err(RuggedError::DuplicatedParameterName { name });
        }
        self.sensors.insert(name, sensor);
        Ok(self)
    }

    /// Validates the accumulated configuration and builds the immutable
    /// [`Rugged`] instance.
    ///
    /// # Errors
    ///
    /// Returns [`RuggedError::UninitializedContext`] if a required field
    /// (ellipsoid, frames, algorithm, or, for DEM-backed algorithms, a
    /// tile updater) was never set.
    pub fn build(self) -> Result<Rugged<U>, RuggedError> {
        let ellipsoid_id = self.ellipsoid_id.ok_or_else(|| RuggedError::UninitializedContext {
            what: "ellipsoid".to_string(),
        })?;
        let inertial_frame = self.inertial_frame.ok_or_else(|| RuggedError::UninitializedContext {
            what: "inertial frame".to_string(),
        })?;
        let body_frame = self.body_frame.ok_or_else(|| RuggedError::UninitializedContext {
            what: "body frame".to_string(),
        })?;
        let algorithm_kind = self.algorithm_kind.ok_or_else(|| RuggedError::UninitializedContext {
            what: "intersection algorithm".to_string(),
        })?;
        let sc_to_body = self.sc_to_body.ok_or_else(|| RuggedError::UninitializedContext {
            what: "spacecraft-to-body interpolator".to_string(),
        })?;

        let ellipsoid = Ellipsoid::from_id(ellipsoid_id, body_frame);

        let algorithm = match algorithm_kind {
            IntersectionAlgorithmKind::IgnoreDemUseEllipsoid => IntersectionAlgorithm::IgnoreDem(IgnoreDem::new()),
            IntersectionAlgorithmKind::ConstantElevationOverEllipsoid { elevation } => {
                IntersectionAlgorithm::ConstantElevation(ConstantElevation::new(elevation))
            }
            IntersectionAlgorithmKind::BasicSlowExhaustiveScanForTestsOnly => {
                let updater = self.tile_updater.ok_or_else(|| RuggedError::UninitializedContext {
                    what: "tile updater".to_string(),
                })?;
                let cache = Arc::new(TilesCache::new(updater, self.cache_capacity));
                IntersectionAlgorithm::basic_scan_for_tests_only(cache)
            }
            IntersectionAlgorithmKind::Duvenhage => {
                let updater = self.tile_updater.ok_or_else(|| RuggedError::UninitializedContext {
                    what: "tile updater".to_string(),
                })?;
                let cache = Arc::new(TilesCache::new(updater, self.cache_capacity));
                IntersectionAlgorithm::duvenhage(cache)
            }
            IntersectionAlgorithmKind::DuvenhageFlatBody => {
                let updater = self.tile_updater.ok_or_else(|| RuggedError::UninitializedContext {
                    what: "tile updater".to_string(),
                })?;
                let cache = Arc::new(TilesCache::new(updater, self.cache_capacity));
                IntersectionAlgorithm::Duvenhage(Duvenhage::new(cache).with_flat_body(true))
            }
        };

        Ok(Rugged::new(
            ellipsoid,
            inertial_frame,
            body_frame,
            algorithm,
            sc_to_body,
            self.sensors,
            self.light_time_correction,
            self.aberration_of_light_correction,
        ))
    }
}
