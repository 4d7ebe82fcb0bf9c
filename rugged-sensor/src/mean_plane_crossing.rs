use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use rugged_frames::TimeStampedTransform;

use crate::error::SensorError;
use crate::line_sensor::LineSensor;

/// The line at which a ground point crosses a sensor's mean plane, along
/// with the target direction and its time derivative at that line (a
/// first-order Taylor model, used by [`crate::pixel_crossing::SensorPixelCrossing`]
/// to refine the crossing to a sub-pixel location without re-querying
/// frame transforms).
#[derive(Debug, Clone, Copy)]
pub struct CrossingResult {
    /// Fractional line at which the target crosses the mean plane.
    pub line: f64,
    /// Date corresponding to `line`.
    pub date: DateTime<Utc>,
    /// Unit direction from the sensor to the target, in the spacecraft
    /// frame, at `date`.
    pub target_direction: Vector3<f64>,
    /// Time derivative of `target_direction`, rad/s-scale, estimated by
    /// central finite difference around `line`.
    pub target_direction_derivative: Vector3<f64>,
}

/// Secant solver for the line at which a ground point crosses a sensor's
/// mean plane.
///
/// `body_to_spacecraft` supplies, for any date within the acquisition
/// window, the rigid transform from the body frame (the frame the ground
/// point is expressed in) to the spacecraft frame (the frame the sensor's
/// lines of sight are expressed in).
pub struct SensorMeanPlaneCrossing<'a, F>
where
    F: Fn(DateTime<Utc>) -> Result<TimeStampedTransform, SensorError>,
{
    sensor: &'a LineSensor,
    body_to_spacecraft: F,
    max_evaluations: usize,
    line_accuracy: f64,
}

impl<'a, F> SensorMeanPlaneCrossing<'a, F>
where
    F: Fn(DateTime<Utc>) -> Result<TimeStampedTransform, SensorError>,
{
    /// Builds a solver over `sensor`, converging to within `line_accuracy`
    /// fractional lines within `max_evaluations` mean-plane evaluations.
    pub fn new(sensor: &'a LineSensor, body_to_spacecraft: F, line_accuracy: f64, max_evaluations: usize) -> Self {
        Self { sensor, body_to_spacecraft, max_evaluations, line_accuracy }
    }

    fn direction_in_spacecraft_frame(&self, target_body: Vector3<f64>, line: f64) -> Result<Vector3<f64>, SensorError> {
        let date = self.sensor.date(line);
        let transform = (self.body_to_spacecraft)(date)?;
        let point_sc = transform.rotation().transform_vector(&target_body) + transform.translation();
        let offset = point_sc - self.sensor.position();
        let norm = offset.norm();
        if norm == 0.0 {
            return Err(SensorError::InvalidStep { step: 0.0 });
        }
        Ok(offset / norm)
    }

    fn signed_distance(&self, target_body: Vector3<f64>, line: f64) -> Result<f64, SensorError> {
        let direction = self.direction_in_spacecraft_frame(target_body, line)?;
        let normal = self.sensor.mean_plane_normal(line)?;
        Ok(direction.dot(&normal))
    }

    /// Finds the line at which `target_body` (a ground point, in the body
    /// frame) crosses the sensor's mean plane, starting the secant search
    /// from `line_guess` and `line_guess + 1.0`.
    ///
    /// # Errors
    ///
    /// Propagates errors from `body_to_spacecraft` or [`LineSensor::mean_plane_normal`],
    /// and returns [`SensorError::GroundPointOutOfLineRange`] if the
    /// solver converges outside the sensor's declared line range, or
    /// [`SensorError::InvalidStep`] if it fails to converge within
    /// `max_evaluations`.
    pub fn find(&self, target_body: Vector3<f64>, line_guess: f64) -> Result<CrossingResult, SensorError> {
        let mut x0 = line_guess;
        let mut x1 = line_guess + 1.0;
        let mut f0 = self.signed_distance(target_body, x0)?;
        let mut f1 = self.signed_distance(target_body, x1)?;

        let mut line = x1;
        let mut converged = false;
        for _ in 0..self.max_evaluations {
            if (x1 - x0).abs() < self.line_accuracy {
                line = x1;
                converged = true;
                break;
            }
            if f1 == f0 {
                line = x1;
                converged = true;
                break;
            }
            let x2 = x1 - f1 * (x1 - x0) / (f1 - f0);
            x0 = x1;
            f0 = f1;
            x1 = x2;
            f1 = self.signed_distance(target_body, x1)?;
            line = x1;
        }
        if !converged && (x1 - x0).abs() >= self.line_accuracy {
            return Err(SensorError::InvalidStep { step: (x1 - x0).abs() });
        }

        if !self.sensor.contains_line(line) {
            return Err(SensorError::GroundPointOutOfLineRange {
                line,
                min_line: self.sensor.min_line(),
                max_line: self.sensor.max_line(),
            });
        }

        let date = self.sensor.date(line);
        let eps = self.line_accuracy.max(1e-6).min(0.5);
        let dt = eps / self.sensor.rate(line).abs().max(1e-9);
        let forward = self.direction_in_spacecraft_frame(target_body, line + eps)?;
        let backward = self.direction_in_spacecraft_frame(target_body, line - eps)?;
        let target_direction = self.direction_in_spacecraft_frame(target_body, line)?;
        let target_direction_derivative = (forward - backward) / (2.0 * dt);

        Ok(CrossingResult { line, date, target_direction, target_direction_derivative })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_datation::AffineLineDatation;
    use crate::time_dependent_los::PolynomialLos;
    use approx::assert_abs_diff_eq;
    use nalgebra::UnitQuaternion;

    fn sensor() -> LineSensor {
        let datation = AffineLineDatation::new("2020-01-01T00:00:00Z".parse().unwrap(), 0.0, 20.0).unwrap();
        let los = PolynomialLos::new([vec![0.0, 0.001], vec![0.0], vec![1.0]], 2000).unwrap();
        LineSensor::new("test", Vector3::zeros(), datation, los, 0.0, 1000.0).unwrap()
    }

    #[test]
    fn finds_crossing_line_for_a_nadir_target() {
        let s = sensor();
        let body_to_spacecraft = |date: DateTime<Utc>| -> Result<TimeStampedTransform, SensorError> {
            Ok(TimeStampedTransform::new(
                date,
                UnitQuaternion::identity(),
                Vector3::new(0.0, 0.0, -700_000.0),
                Vector3::zeros(),
                Vector3::zeros(),
                Vector3::zeros(),
                Vector3::zeros(),
            ))
        };
        let solver = SensorMeanPlaneCrossing::new(&s, body_to_spacecraft, 1e-6, 50);
        let target = Vector3::new(0.0, 0.0, 0.0);
        let result = solver.find(target, 500.0).unwrap();
        assert!(result.line >= 0.0 && result.line <= 1000.0);
        assert_abs_diff_eq!(result.target_direction.norm(), 1.0, epsilon = 1e-9);
    }
}
