use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::trace;
use nalgebra::Vector3;
use rugged_dem::{IntersectionAlgorithm, TileUpdater};
use rugged_ellipsoid::{BodyFrameId, Ellipsoid, InertialFrameId, NormalizedGeodeticPoint, SPEED_OF_LIGHT};
use rugged_frames::SpacecraftToBody;
use rugged_sensor::{LineSensor, SensorMeanPlaneCrossing, SensorPixelCrossing};

use crate::correction::aberration_of_light;
use crate::dumper::Dumper;
use crate::error::RuggedError;

/// Light-time correction converges in two refinement passes (§4.8); a
/// third buys nothing measurable at sub-millimeter ground sampling.
const LIGHT_TIME_ITERATIONS: usize = 2;

const DEFAULT_LINE_ACCURACY: f64 = 1.0e-3;
const DEFAULT_MAX_EVALUATIONS: usize = 50;

fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::nanoseconds((seconds * 1.0e9).round() as i64)
}

/// An immutable, fully configured geolocation engine for one pushbroom
/// instrument (possibly several co-registered line sensors sharing the
/// same platform).
///
/// Built exclusively through [`crate::RuggedBuilder`]; ground/image
/// conversions are the [`direct_location`](Self::direct_location) and
/// [`inverse_location`](Self::inverse_location) methods.
pub struct Rugged<U> {
    ellipsoid: Ellipsoid,
    inertial_frame: InertialFrameId,
    body_frame: BodyFrameId,
    algorithm: IntersectionAlgorithm<U>,
    sc_to_body: SpacecraftToBody,
    sensors: HashMap<String, LineSensor>,
    light_time_correction: bool,
    aberration_of_light_correction: bool,
}

impl<U: TileUpdater> Rugged<U> {
    pub(crate) fn new(
        ellipsoid: Ellipsoid,
        inertial_frame: InertialFrameId,
        body_frame: BodyFrameId,
        algorithm: IntersectionAlgorithm<U>,
        sc_to_body: SpacecraftToBody,
        sensors: HashMap<String, LineSensor>,
        light_time_correction: bool,
        aberration_of_light_correction: bool,
    ) -> Self {
        Self {
            ellipsoid,
            inertial_frame,
            body_frame,
            algorithm,
            sc_to_body,
            sensors,
            light_time_correction,
            aberration_of_light_correction,
        }
    }

    /// The reference ellipsoid.
    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// The inertial frame the spacecraft ephemeris is expressed in.
    pub fn inertial_frame(&self) -> InertialFrameId {
        self.inertial_frame
    }

    /// The Earth-fixed body frame ground points are expressed in.
    pub fn body_frame(&self) -> BodyFrameId {
        self.body_frame
    }

    fn sensor(&self, name: &str) -> Result<&LineSensor, RuggedError> {
        self.sensors.get(name).ok_or_else(|| RuggedError::UnknownSensor { name: name.to_string() })
    }

    /// Ray origin and direction of `sensor` at `line`, in the body frame,
    /// at the spacecraft position observed at `detection_date` but
    /// rotated into the Earth orientation holding at `emission_date`.
    ///
    /// Splitting the two dates is what makes the light-time iteration in
    /// [`direct_location`](Self::direct_location) work: only the Earth's
    /// rotation needs re-evaluating at the (earlier) emission instant, not
    /// the spacecraft's position.
    fn ray_in_body_frame(
        &self,
        sensor: &LineSensor,
        line: f64,
        pixel: f64,
        detection_date: DateTime<Utc>,
        emission_date: DateTime<Utc>,
    ) -> Result<(Vector3<f64>, Vector3<f64>), RuggedError> {
        let mut los_sc = sensor.los(pixel, line);
        if self.aberration_of_light_correction {
            let sc_to_inertial = self.sc_to_body.sc_to_inertial(detection_date)?;
            let los_inertial = sc_to_inertial.rotation().transform_vector(&los_sc);
            let corrected_inertial = aberration_of_light(los_inertial, sc_to_inertial.velocity(), SPEED_OF_LIGHT);
            los_sc = sc_to_inertial.rotation().inverse_transform_vector(&corrected_inertial);
        }

        // Composed by hand rather than via `TimeStampedTransform::compose`,
        // which requires both operands to share a date: here the
        // spacecraft position is deliberately evaluated at the detection
        // date while the body orientation is evaluated at the (possibly
        // earlier) emission date.
        let sc_to_inertial = self.sc_to_body.sc_to_inertial(detection_date)?;
        let inertial_to_body = self.sc_to_body.inertial_to_body(emission_date)?;

        let position_inertial = sc_to_inertial.rotation().transform_vector(&sensor.position()) + sc_to_inertial.translation();
        let los_inertial = sc_to_inertial.rotation().transform_vector(&los_sc);

        let position_body = inertial_to_body.rotation().transform_vector(&position_inertial) + inertial_to_body.translation();
        let los_body = inertial_to_body.rotation().transform_vector(&los_inertial);
        Ok((position_body, los_body))
    }

    /// Converts an (acquisition line, pixel) pair of `sensor_name` into a
    /// ground point.
    ///
    /// When the light-time correction is enabled, iterates twice: each
    /// pass estimates the ground point with the body orientation held at
    /// the previous pass's emission-time estimate, then tightens the
    /// emission date by the light travel time to that estimate (§4.8).
    ///
    /// # Errors
    ///
    /// Returns [`RuggedError::UnknownSensor`] if `sensor_name` was not
    /// registered with the builder, and propagates ray/ellipsoid or DEM
    /// intersection failures from the leaf crates.
    pub fn direct_location(
        &self,
        sensor_name: &str,
        line: f64,
        pixel: f64,
        mut dumper: Option<&mut dyn Dumper>,
    ) -> Result<NormalizedGeodeticPoint, RuggedError> {
        trace!("direct_location: sensor={sensor_name} line={line} pixel={pixel}");
        let sensor = self.sensor(sensor_name)?;
        let detection_date = sensor.date(line);

        if let Some(dumper) = dumper.as_deref_mut() {
            let (position, los) = self.ray_in_body_frame(sensor, line, pixel, detection_date, detection_date)?;
            dumper.dump_direct_location(
                sensor_name,
                detection_date,
                position,
                los,
                self.light_time_correction,
                self.aberration_of_light_correction,
            );
        }

        let result = if self.light_time_correction {
            self.direct_location_with_light_time(sensor, line, pixel, detection_date)?
        } else {
            let (position, los) = self.ray_in_body_frame(sensor, line, pixel, detection_date, detection_date)?;
            self.algorithm.intersection(&self.ellipsoid, position, los)?
        };

        if let Some(dumper) = dumper {
            dumper.dump_direct_location_result(&result);
        }
        Ok(result)
    }

    fn direct_location_with_light_time(
        &self,
        sensor: &LineSensor,
        line: f64,
        pixel: f64,
        detection_date: DateTime<Utc>,
    ) -> Result<NormalizedGeodeticPoint, RuggedError> {
        let (detection_position, _) = self.ray_in_body_frame(sensor, line, pixel, detection_date, detection_date)?;
        let mut emission_date = detection_date;
        let mut guess: Option<NormalizedGeodeticPoint> = None;

        for _ in 0..LIGHT_TIME_ITERATIONS {
            let (position, los) = self.ray_in_body_frame(sensor, line, pixel, detection_date, emission_date)?;
            let ground_point = self.algorithm.intersection(&self.ellipsoid, position, los)?;
            let emitter = self.ellipsoid.to_cartesian(ground_point.point());
            let delta_t = (emitter - detection_position).norm() / SPEED_OF_LIGHT;
            emission_date = detection_date - seconds_to_duration(delta_t);
            guess = Some(ground_point);
        }

        let (position, los) = self.ray_in_body_frame(sensor, line, pixel, detection_date, emission_date)?;
        let initial_guess = guess.ok_or_else(|| RuggedError::InternalError {
            detail: "light time iteration produced no ground point".to_string(),
        })?;
        Ok(self.algorithm.refine_intersection(&self.ellipsoid, position, los, &initial_guess)?)
    }

    /// Converts a ground point into the (line, pixel) pair of `sensor_name`
    /// that observes it, or `None` if the target never crosses the
    /// sensor's field of view within its declared line range.
    ///
    /// # Errors
    ///
    /// Returns [`RuggedError::UnknownSensor`] if `sensor_name` was not
    /// registered with the builder, and propagates frame-transform
    /// failures other than an out-of-range crossing.
    pub fn inverse_location(
        &self,
        sensor_name: &str,
        target: &NormalizedGeodeticPoint,
        mut dumper: Option<&mut dyn Dumper>,
    ) -> Result<Option<(f64, f64)>, RuggedError> {
        trace!("inverse_location: sensor={sensor_name} target=({}, {})", target.latitude(), target.longitude());
        let sensor = self.sensor(sensor_name)?;
        let target_body = self.ellipsoid.to_cartesian(target.point());

        if let Some(dumper) = dumper.as_deref_mut() {
            dumper.dump_inverse_location(
                sensor_name,
                target,
                sensor.min_line(),
                sensor.max_line(),
                self.light_time_correction,
                self.aberration_of_light_correction,
            );
        }

        let body_to_spacecraft = |date: DateTime<Utc>| -> Result<rugged_frames::TimeStampedTransform, rugged_sensor::SensorError> {
            Ok(self.sc_to_body.sc_to_body(date)?.invert())
        };

        let line_guess = (sensor.min_line() + sensor.max_line()) / 2.0;
        let crossing_search = SensorMeanPlaneCrossing::new(sensor, body_to_spacecraft, DEFAULT_LINE_ACCURACY, DEFAULT_MAX_EVALUATIONS);

        let result = match crossing_search.find(target_body, line_guess) {
            Ok(crossing) => {
                let mean_plane_normal = sensor.mean_plane_normal(crossing.line)?;
                let pixel_search = SensorPixelCrossing::new(sensor, crossing.line, DEFAULT_MAX_EVALUATIONS);
                match pixel_search.locate(crossing.target_direction, mean_plane_normal) {
                    Ok(pixel) => Some((crossing.line, pixel.pixel)),
                    Err(rugged_sensor::SensorError::InvalidStep { .. }) => None,
                    Err(other) => return Err(other.into()),
                }
            }
            Err(rugged_sensor::SensorError::GroundPointOutOfLineRange { .. }) => None,
            Err(other) => return Err(other.into()),
        };

        if let Some(dumper) = dumper {
            dumper.dump_inverse_location_result(result.map(|(l, _)| l), result.map(|(_, p)| p));
        }
        Ok(result)
    }
}
