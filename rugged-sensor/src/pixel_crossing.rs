use nalgebra::Vector3;

use crate::brent::find_root;
use crate::error::SensorError;
use crate::line_sensor::LineSensor;

const COARSE_PIXEL_ACCURACY: f64 = 0.01;
const REFINEMENT_STEP: f64 = 1.0e-3;

/// The pixel a target direction crosses, at a line already fixed by
/// [`crate::mean_plane_crossing::SensorMeanPlaneCrossing`].
#[derive(Debug, Clone, Copy)]
pub struct SensorPixel {
    /// Fractional pixel at which the target direction crosses the
    /// sensor's lines of sight.
    pub pixel: f64,
}

/// Solves, for a fixed acquisition line, which pixel's line of sight
/// points at a given target direction.
///
/// Combines a coarse Brent root-find (bracketing the pixel to within
/// [`COARSE_PIXEL_ACCURACY`]) with one analytic Newton refinement step
/// against the local two-pixel plane, avoiding the extra LOS evaluations
/// a tighter Brent tolerance would cost.
pub struct SensorPixelCrossing<'a> {
    sensor: &'a LineSensor,
    line: f64,
    max_evaluations: usize,
}

impl<'a> SensorPixelCrossing<'a> {
    /// Builds a solver for `sensor` at the (already known) acquisition
    /// `line`.
    pub fn new(sensor: &'a LineSensor, line: f64, max_evaluations: usize) -> Self {
        Self { sensor, line, max_evaluations }
    }

    fn los(&self, pixel: f64) -> Vector3<f64> {
        self.sensor.los(pixel, self.line)
    }

    /// Signed cross-track position of `target` relative to the pixel `p`'s
    /// line of sight, projected onto the mean plane normal: positive on
    /// one side of the crossing pixel, negative on the other, zero at the
    /// crossing.
    fn crossing_function(&self, target: Vector3<f64>, mean_plane_normal: Vector3<f64>, pixel: f64) -> f64 {
        self.los(pixel).cross(&target).dot(&mean_plane_normal)
    }

    /// Finds the pixel whose line of sight, at this solver's line, points
    /// at `target` (a unit direction in the spacecraft frame).
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidStep`] if no sign change brackets a
    /// crossing pixel among `[0, pixel_count - 1]`.
    pub fn locate(&self, target: Vector3<f64>, mean_plane_normal: Vector3<f64>) -> Result<SensorPixel, SensorError> {
        let count = self.sensor.pixel_count();
        let samples: Vec<f64> = (0..count)
            .map(|p| self.crossing_function(target, mean_plane_normal, p as f64))
            .collect();

        let mut bracket = None;
        for i in 0..count.saturating_sub(1) {
            if samples[i] == 0.0 {
                bracket = Some((i as f64, i as f64));
                break;
            }
            if samples[i].signum() != samples[i + 1].signum() {
                bracket = Some((i as f64, (i + 1) as f64));
                break;
            }
        }
        let (lo, hi) = bracket.ok_or(SensorError::InvalidStep { step: f64::NAN })?;

        let coarse = if lo == hi {
            lo
        } else {
            find_root(
                |p| self.crossing_function(target, mean_plane_normal, p),
                lo,
                hi,
                COARSE_PIXEL_ACCURACY,
                self.max_evaluations,
            )
        };

        Ok(SensorPixel { pixel: self.refine(target, coarse) })
    }

    /// One analytic Newton step refining `coarse` against the local plane
    /// spanned by the two pixels bracketing it: `beta` is the angle
    /// between `target` and that plane's normal, which equals `pi/2`
    /// exactly when `target` lies in the plane (i.e. at the true
    /// crossing); `Delta p = (pi/2 - beta) / beta'` with `beta'` estimated
    /// by a small forward finite difference.
    fn refine(&self, target: Vector3<f64>, coarse: f64) -> f64 {
        let base = coarse.floor().clamp(0.0, (self.sensor.pixel_count() - 2) as f64);
        let beta_at = |p: f64| -> f64 {
            let normal = self.los(p).cross(&self.los(p + 1.0));
            let norm = normal.norm();
            if norm == 0.0 {
                return std::f64::consts::FRAC_PI_2;
            }
            target.dot(&(normal / norm)).clamp(-1.0, 1.0).acos()
        };

        let beta = beta_at(base + (coarse - base));
        let beta_shifted = beta_at((base + (coarse - base) + REFINEMENT_STEP).min(base + 1.0));
        let beta_rate = (beta_shifted - beta) / REFINEMENT_STEP;
        if beta_rate.abs() < 1e-12 {
            return coarse;
        }
        let delta = (std::f64::consts::FRAC_PI_2 - beta) / beta_rate;
        (coarse + delta).clamp(base, base + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_datation::AffineLineDatation;
    use crate::time_dependent_los::PolynomialLos;
    use approx::assert_abs_diff_eq;

    fn sensor() -> LineSensor {
        let datation = AffineLineDatation::new("2020-01-01T00:00:00Z".parse().unwrap(), 0.0, 20.0).unwrap();
        let los = PolynomialLos::new([vec![0.0, 0.001], vec![0.0], vec![1.0]], 2000).unwrap();
        LineSensor::new("test", Vector3::zeros(), datation, los, 0.0, 1999.0).unwrap()
    }

    #[test]
    fn locates_the_pixel_pointing_exactly_at_its_own_los() {
        let s = sensor();
        let target_pixel = 640.3;
        let target = s.los(target_pixel, 0.0);
        let mean_plane_normal = s.mean_plane_normal(0.0).unwrap();
        let crossing = SensorPixelCrossing::new(&s, 0.0, 100);
        let found = crossing.locate(target, mean_plane_normal).unwrap();
        assert_abs_diff_eq!(found.pixel, target_pixel, epsilon = 0.05);
    }
}
