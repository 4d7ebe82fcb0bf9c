use chrono::{DateTime, Utc};
use log::debug;
use nalgebra::Vector3;
use rugged_ellipsoid::{BodyFrameId, InertialFrameId};
use serde::{Deserialize, Serialize};

use crate::{
    error::FramesError,
    hermite::{angular_at, bracket_grid_index, cartesian_at, hermite_transform},
    interpolation::{AngularInterpolationFilter, AngularSample, CartesianInterpolationFilter, CartesianSample},
    transform::{seconds_between, seconds_to_duration, TimeStampedTransform},
};

/// Dense, uniformly stepped cache of body→inertial and spacecraft→inertial
/// transforms, Hermite-interpolated between grid points (spec §4.5).
///
/// Built once from sampled ephemeris/attitude or a propagator callback, then
/// queried many times at the per-line/per-pixel rate by `rugged-sensor` and
/// the `rugged` façade.
pub struct SpacecraftToBody {
    min_date: DateTime<Utc>,
    max_date: DateTime<Utc>,
    step: f64,
    tolerance: f64,
    inertial_frame: InertialFrameId,
    body_frame: BodyFrameId,
    body_to_inertial: Vec<TimeStampedTransform>,
    sc_to_inertial: Vec<TimeStampedTransform>,
}

/// On-disk representation of a [`SpacecraftToBody`] dump (spec §4.5/§6).
#[derive(Serialize, Deserialize)]
struct Dump {
    min_date: DateTime<Utc>,
    max_date: DateTime<Utc>,
    step: f64,
    tolerance: f64,
    inertial_frame: InertialFrameId,
    body_frame: BodyFrameId,
    body_to_inertial: Vec<DumpTransform>,
    sc_to_inertial: Vec<DumpTransform>,
}

#[derive(Serialize, Deserialize)]
struct DumpTransform {
    date: DateTime<Utc>,
    rotation: [f64; 4],
    translation: [f64; 3],
    velocity: [f64; 3],
    acceleration: [f64; 3],
    rotation_rate: [f64; 3],
    rotation_acceleration: [f64; 3],
}

impl DumpTransform {
    fn from_transform(t: &TimeStampedTransform) -> Self {
        let coords = t.rotation().into_inner().coords;
        Self {
            date: t.date(),
            rotation: [coords[3], coords[0], coords[1], coords[2]],
            translation: t.translation().into(),
            velocity: t.velocity().into(),
            acceleration: t.acceleration().into(),
            rotation_rate: t.rotation_rate().into(),
            rotation_acceleration: t.rotation_acceleration().into(),
        }
    }

    fn into_transform(self) -> TimeStampedTransform {
        let [w, i, j, k] = self.rotation;
        let rotation = nalgebra::UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, i, j, k));
        TimeStampedTransform::new(
            self.date,
            rotation,
            Vector3::from(self.translation),
            Vector3::from(self.velocity),
            Vector3::from(self.acceleration),
            Vector3::from(self.rotation_rate),
            Vector3::from(self.rotation_acceleration),
        )
    }
}

impl SpacecraftToBody {
    /// Builds the dense grid from sampled orbit, spacecraft attitude, and
    /// body orientation ephemerides, covering their shared date overlap.
    ///
    /// `step`/`tolerance` are seconds. Fails with
    /// [`FramesError::NotEnoughSamples`] if any series has fewer than two
    /// points or the three series do not overlap in time.
    #[allow(clippy::too_many_arguments)]
    pub fn from_samples(
        orbit: &[CartesianSample],
        orbit_filter: CartesianInterpolationFilter,
        attitude: &[AngularSample],
        attitude_filter: AngularInterpolationFilter,
        body_orientation: &[AngularSample],
        body_filter: AngularInterpolationFilter,
        step: f64,
        tolerance: f64,
        inertial_frame: InertialFrameId,
        body_frame: BodyFrameId,
    ) -> Result<Self, FramesError> {
        let shortest = orbit.len().min(attitude.len()).min(body_orientation.len());
        if shortest < 2 {
            return Err(FramesError::NotEnoughSamples { count: shortest });
        }

        let min_date = orbit[0].date.max(attitude[0].date).max(body_orientation[0].date);
        let max_date = orbit[orbit.len() - 1]
            .date
            .min(attitude[attitude.len() - 1].date)
            .min(body_orientation[body_orientation.len() - 1].date);
        if max_date <= min_date {
            return Err(FramesError::NotEnoughSamples { count: 0 });
        }

        Self::densify(min_date, max_date, step, tolerance, inertial_frame, body_frame, |t| {
            let orbit_pt = cartesian_at(orbit, orbit_filter, t);
            let att = angular_at(attitude, attitude_filter, t);
            let body = angular_at(body_orientation, body_filter, t);
            (orbit_pt, att, body)
        })
    }

    /// Builds the dense grid by sampling a propagator callback at every
    /// grid step instead of interpolating pre-recorded ephemeris.
    #[allow(clippy::too_many_arguments)]
    pub fn from_propagator(
        min_date: DateTime<Utc>,
        max_date: DateTime<Utc>,
        step: f64,
        tolerance: f64,
        inertial_frame: InertialFrameId,
        body_frame: BodyFrameId,
        mut propagate: impl FnMut(DateTime<Utc>) -> (CartesianSample, AngularSample, AngularSample),
    ) -> Result<Self, FramesError> {
        if max_date <= min_date {
            return Err(FramesError::NotEnoughSamples { count: 0 });
        }
        Self::densify(min_date, max_date, step, tolerance, inertial_frame, body_frame, |t| propagate(t))
    }

    fn densify(
        min_date: DateTime<Utc>,
        max_date: DateTime<Utc>,
        step: f64,
        tolerance: f64,
        inertial_frame: InertialFrameId,
        body_frame: BodyFrameId,
        mut sample_at: impl FnMut(DateTime<Utc>) -> (CartesianSample, AngularSample, AngularSample),
    ) -> Result<Self, FramesError> {
        let span = seconds_between(min_date, max_date);
        let n = (span / step).ceil() as usize + 1;
        debug!("densifying spacecraft-to-body grid: {n} points at step {step}s over {span}s");

        let mut sc_to_inertial = Vec::with_capacity(n);
        let mut body_to_inertial = Vec::with_capacity(n);
        for i in 0..n {
            let t = min_date + seconds_to_duration((i as f64 * step).min(span));
            let (orbit_pt, attitude, body) = sample_at(t);
            sc_to_inertial.push(TimeStampedTransform::new(
                t,
                attitude.rotation,
                orbit_pt.position,
                orbit_pt.velocity,
                orbit_pt.acceleration,
                attitude.rotation_rate,
                attitude.rotation_acceleration,
            ));
            body_to_inertial.push(TimeStampedTransform::new(
                t,
                body.rotation,
                Vector3::zeros(),
                Vector3::zeros(),
                Vector3::zeros(),
                body.rotation_rate,
                body.rotation_acceleration,
            ));
        }

        Ok(Self {
            min_date,
            max_date,
            step,
            tolerance,
            inertial_frame,
            body_frame,
            body_to_inertial,
            sc_to_inertial,
        })
    }

    /// Configured inertial frame identity.
    pub fn inertial_frame(&self) -> InertialFrameId {
        self.inertial_frame
    }

    /// Configured body frame identity.
    pub fn body_frame(&self) -> BodyFrameId {
        self.body_frame
    }

    /// Grid lower bound (before the tolerance margin).
    pub fn min_date(&self) -> DateTime<Utc> {
        self.min_date
    }

    /// Grid upper bound (before the tolerance margin).
    pub fn max_date(&self) -> DateTime<Utc> {
        self.max_date
    }

    /// Number of grid points densified per transform array.
    pub fn grid_len(&self) -> usize {
        self.sc_to_inertial.len()
    }

    /// Spacecraft-frame-to-inertial-frame transform at `date`.
    pub fn sc_to_inertial(&self, date: DateTime<Utc>) -> Result<TimeStampedTransform, FramesError> {
        self.interpolate(&self.sc_to_inertial, date)
    }

    /// Inertial-frame-to-body-frame transform at `date`.
    pub fn inertial_to_body(&self, date: DateTime<Utc>) -> Result<TimeStampedTransform, FramesError> {
        Ok(self.interpolate(&self.body_to_inertial, date)?.invert())
    }

    /// Body-frame-to-inertial-frame transform at `date`.
    pub fn body_to_inertial(&self, date: DateTime<Utc>) -> Result<TimeStampedTransform, FramesError> {
        self.interpolate(&self.body_to_inertial, date)
    }

    /// Spacecraft-frame-to-body-frame transform at `date`, composing
    /// `sc_to_inertial` with `inertial_to_body`.
    pub fn sc_to_body(&self, date: DateTime<Utc>) -> Result<TimeStampedTransform, FramesError> {
        let sc_to_inertial = self.sc_to_inertial(date)?;
        let inertial_to_body = self.inertial_to_body(date)?;
        Ok(sc_to_inertial.compose(&inertial_to_body))
    }

    fn interpolate(&self, grid: &[TimeStampedTransform], date: DateTime<Utc>) -> Result<TimeStampedTransform, FramesError> {
        let lower_bound = self.min_date - seconds_to_duration(self.tolerance);
        let upper_bound = self.max_date + seconds_to_duration(self.tolerance);
        if date < lower_bound || date > upper_bound {
            return Err(FramesError::OutOfTimeRange {
                date,
                min_date: self.min_date,
                max_date: self.max_date,
                tolerance: self.tolerance,
            });
        }

        let clamped = date.clamp(self.min_date, self.max_date);
        let idx = bracket_grid_index(grid.len(), |i| grid[i].date(), clamped);
        Ok(hermite_transform(&grid[idx], &grid[idx + 1], date))
    }

    /// Serializes the dense grid (spec §4.5 dump/reload contract).
    pub fn dump(&self) -> String {
        let dump = Dump {
            min_date: self.min_date,
            max_date: self.max_date,
            step: self.step,
            tolerance: self.tolerance,
            inertial_frame: self.inertial_frame,
            body_frame: self.body_frame,
            body_to_inertial: self.body_to_inertial.iter().map(DumpTransform::from_transform).collect(),
            sc_to_inertial: self.sc_to_inertial.iter().map(DumpTransform::from_transform).collect(),
        };
        serde_json::to_string(&dump).expect("SpacecraftToBody dump is always representable as JSON")
    }

    /// Reloads a grid previously produced by [`dump`](Self::dump).
    ///
    /// Fails with [`FramesError::FramesMismatchWithInterpolatorDump`] if the
    /// reloaded frame identifiers do not match `expected_inertial_frame`/
    /// `expected_body_frame`, or with
    /// [`FramesError::NotInterpolatorDumpData`] if the payload cannot be
    /// parsed at all.
    pub fn reload(
        text: &str,
        expected_inertial_frame: InertialFrameId,
        expected_body_frame: BodyFrameId,
    ) -> Result<Self, FramesError> {
        let dump: Dump = serde_json::from_str(text).map_err(|e| FramesError::NotInterpolatorDumpData { reason: e.to_string() })?;

        if dump.inertial_frame != expected_inertial_frame || dump.body_frame != expected_body_frame {
            return Err(FramesError::FramesMismatchWithInterpolatorDump {
                dump_inertial: dump.inertial_frame,
                dump_body: dump.body_frame,
                expected_inertial: expected_inertial_frame,
                expected_body: expected_body_frame,
            });
        }

        Ok(Self {
            min_date: dump.min_date,
            max_date: dump.max_date,
            step: dump.step,
            tolerance: dump.tolerance,
            inertial_frame: dump.inertial_frame,
            body_frame: dump.body_frame,
            body_to_inertial: dump.body_to_inertial.into_iter().map(DumpTransform::into_transform).collect(),
            sc_to_inertial: dump.sc_to_inertial.into_iter().map(DumpTransform::into_transform).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::UnitQuaternion;

    fn t0() -> DateTime<Utc> {
        "2020-01-01T00:00:00Z".parse().unwrap()
    }

    fn circular_orbit_samples() -> Vec<CartesianSample> {
        let omega = 0.0011;
        (0..=10)
            .map(|i| {
                let t = i as f64 * 10.0;
                let theta = omega * t;
                CartesianSample {
                    date: t0() + seconds_to_duration(t),
                    position: Vector3::new(7_000_000.0 * theta.cos(), 7_000_000.0 * theta.sin(), 0.0),
                    velocity: Vector3::new(-7_000_000.0 * omega * theta.sin(), 7_000_000.0 * omega * theta.cos(), 0.0),
                    acceleration: Vector3::zeros(),
                }
            })
            .collect()
    }

    fn steady_attitude_samples(count: usize, step: f64) -> Vec<AngularSample> {
        (0..count)
            .map(|i| AngularSample {
                date: t0() + seconds_to_duration(i as f64 * step),
                rotation: UnitQuaternion::identity(),
                rotation_rate: Vector3::zeros(),
                rotation_acceleration: Vector3::zeros(),
            })
            .collect()
    }

    #[test]
    fn interpolated_position_matches_orbit_at_grid_points() {
        let orbit = circular_orbit_samples();
        let attitude = steady_attitude_samples(11, 10.0);
        let body = steady_attitude_samples(11, 10.0);
        let grid = SpacecraftToBody::from_samples(
            &orbit,
            CartesianInterpolationFilter::UsePv,
            &attitude,
            AngularInterpolationFilter::UseR,
            &body,
            AngularInterpolationFilter::UseR,
            1.0,
            5.0,
            InertialFrameId::Eme2000,
            BodyFrameId::Itrf,
        )
        .unwrap();

        let transform = grid.sc_to_inertial(t0() + seconds_to_duration(50.0)).unwrap();
        assert_abs_diff_eq!(transform.translation().x, orbit[5].position.x, epsilon = 1.0);
        assert_abs_diff_eq!(transform.translation().y, orbit[5].position.y, epsilon = 1.0);
    }

    #[test]
    fn out_of_tolerance_date_is_rejected() {
        let orbit = circular_orbit_samples();
        let attitude = steady_attitude_samples(11, 10.0);
        let body = steady_attitude_samples(11, 10.0);
        let grid = SpacecraftToBody::from_samples(
            &orbit,
            CartesianInterpolationFilter::UsePv,
            &attitude,
            AngularInterpolationFilter::UseR,
            &body,
            AngularInterpolationFilter::UseR,
            1.0,
            1.0,
            InertialFrameId::Eme2000,
            BodyFrameId::Itrf,
        )
        .unwrap();

        assert!(grid.sc_to_inertial(t0() - seconds_to_duration(10.0)).is_err());
    }

    #[test]
    fn dump_and_reload_round_trips() {
        let orbit = circular_orbit_samples();
        let attitude = steady_attitude_samples(11, 10.0);
        let body = steady_attitude_samples(11, 10.0);
        let grid = SpacecraftToBody::from_samples(
            &orbit,
            CartesianInterpolationFilter::UsePv,
            &attitude,
            AngularInterpolationFilter::UseR,
            &body,
            AngularInterpolationFilter::UseR,
            1.0,
            5.0,
            InertialFrameId::Eme2000,
            BodyFrameId::Itrf,
        )
        .unwrap();

        let text = grid.dump();
        let reloaded = SpacecraftToBody::reload(&text, InertialFrameId::Eme2000, BodyFrameId::Itrf).unwrap();
        let date = t0() + seconds_to_duration(23.0);
        let a = grid.sc_to_inertial(date).unwrap();
        let b = reloaded.sc_to_inertial(date).unwrap();
        assert_abs_diff_eq!(a.translation().x, b.translation().x, epsilon = 1e-9);
    }

    #[test]
    fn reload_rejects_mismatched_frames() {
        let orbit = circular_orbit_samples();
        let attitude = steady_attitude_samples(11, 10.0);
        let body = steady_attitude_samples(11, 10.0);
        let grid = SpacecraftToBody::from_samples(
            &orbit,
            CartesianInterpolationFilter::UsePv,
            &attitude,
            AngularInterpolationFilter::UseR,
            &body,
            AngularInterpolationFilter::UseR,
            1.0,
            5.0,
            InertialFrameId::Eme2000,
            BodyFrameId::Itrf,
        )
        .unwrap();

        let text = grid.dump();
        let err = SpacecraftToBody::reload(&text, InertialFrameId::Gcrf, BodyFrameId::Itrf);
        assert!(matches!(err, Err(FramesError::FramesMismatchWithInterpolatorDump { .. })));
    }
}
