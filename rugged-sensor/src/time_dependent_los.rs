use chrono::{DateTime, Utc};
use nalgebra::Vector3;

use crate::error::SensorError;

/// Line of sight tabulated per pixel, constant in time (no thermo-elastic
/// or pointing-drift model).
pub struct TabulatedLos {
    directions: Vec<Vector3<f64>>,
}

impl TabulatedLos {
    /// Builds a tabulated LOS model from one direction per pixel. Each
    /// direction is normalized.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidStep`] if fewer than one direction is
    /// given or any direction has zero norm.
    pub fn new(directions: &[Vector3<f64>]) -> Result<Self, SensorError> {
        if directions.is_empty() {
            return Err(SensorError::InvalidStep { step: 0.0 });
        }
        let mut normalized = Vec::with_capacity(directions.len());
        for d in directions {
            let norm = d.norm();
            if norm == 0.0 {
                return Err(SensorError::InvalidStep { step: 0.0 });
            }
            normalized.push(d / norm);
        }
        Ok(Self { directions: normalized })
    }

    fn bracket(&self, pixel: f64) -> (usize, usize, f64) {
        let last = self.directions.len() - 1;
        if pixel <= 0.0 || last == 0 {
            return (0, 0, 0.0);
        }
        if pixel >= last as f64 {
            return (last, last, 0.0);
        }
        let lo = pixel.floor() as usize;
        (lo, lo + 1, pixel - lo as f64)
    }
}

impl TabulatedLos {
    /// Unit viewing direction for `pixel` at `date`, in the sensor frame.
    pub fn los(&self, pixel: f64, _date: DateTime<Utc>) -> Vector3<f64> {
        let (lo, hi, s) = self.bracket(pixel);
        if lo == hi {
            return self.directions[lo];
        }
        let blended = self.directions[lo].lerp(&self.directions[hi], s);
        blended.normalize()
    }

    /// Number of pixels this model covers.
    pub fn pixel_count(&self) -> usize {
        self.directions.len()
    }
}

/// Line of sight given by a per-axis polynomial in pixel number, constant
/// in time. Coefficients run from the constant term up (`c0 + c1 p + c2 p^2
/// + ...`), one series per axis.
pub struct PolynomialLos {
    coefficients: [Vec<f64>; 3],
    pixel_count: usize,
}

impl PolynomialLos {
    /// Builds a polynomial LOS model valid over `pixel_count` pixels
    /// (pixels numbered `0..pixel_count`).
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidStep`] if `pixel_count` is zero.
    pub fn new(coefficients: [Vec<f64>; 3], pixel_count: usize) -> Result<Self, SensorError> {
        if pixel_count == 0 {
            return Err(SensorError::InvalidStep { step: 0.0 });
        }
        Ok(Self { coefficients, pixel_count })
    }

    fn evaluate(series: &[f64], pixel: f64) -> f64 {
        let mut acc = 0.0;
        let mut p = 1.0;
        for c in series {
            acc += c * p;
            p *= pixel;
        }
        acc
    }
}

impl PolynomialLos {
    /// Unit viewing direction for `pixel` at `date`, in the sensor frame.
    pub fn los(&self, pixel: f64, _date: DateTime<Utc>) -> Vector3<f64> {
        let v = Vector3::new(
            Self::evaluate(&self.coefficients[0], pixel),
            Self::evaluate(&self.coefficients[1], pixel),
            Self::evaluate(&self.coefficients[2], pixel),
        );
        v.normalize()
    }

    /// Number of pixels this model covers.
    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }
}

/// Which concrete line-of-sight model a [`crate::LineSensor`] uses.
///
/// A tagged enum rather than `Box<dyn Trait>`, matching
/// [`crate::LineDatationKind`]'s rationale: a small closed set of models,
/// called once per located pixel.
pub enum TimeDependentLosKind {
    /// Per-pixel tabulated, time-invariant directions.
    Tabulated(TabulatedLos),
    /// Per-axis polynomial-in-pixel, time-invariant directions.
    Polynomial(PolynomialLos),
}

impl TimeDependentLosKind {
    /// Unit viewing direction for `pixel` at `date`, in the sensor frame.
    pub fn los(&self, pixel: f64, date: DateTime<Utc>) -> Vector3<f64> {
        match self {
            Self::Tabulated(m) => m.los(pixel, date),
            Self::Polynomial(m) => m.los(pixel, date),
        }
    }

    /// Number of pixels this model covers.
    pub fn pixel_count(&self) -> usize {
        match self {
            Self::Tabulated(m) => m.pixel_count(),
            Self::Polynomial(m) => m.pixel_count(),
        }
    }
}

impl From<TabulatedLos> for TimeDependentLosKind {
    fn from(m: TabulatedLos) -> Self {
        Self::Tabulated(m)
    }
}

impl From<PolynomialLos> for TimeDependentLosKind {
    fn from(m: PolynomialLos) -> Self {
        Self::Polynomial(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn t0() -> DateTime<Utc> {
        "2020-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn tabulated_los_interpolates_between_pixels() {
        let los = TabulatedLos::new(&[
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.1, 0.0, 1.0),
            Vector3::new(0.2, 0.0, 1.0),
        ])
        .unwrap();
        let mid = los.los(0.5, t0());
        assert_abs_diff_eq!(mid.norm(), 1.0, epsilon = 1e-12);
        assert!(mid.x > 0.0 && mid.x < 0.1);
    }

    #[test]
    fn polynomial_los_is_normalized() {
        let los = PolynomialLos::new(
            [vec![0.0, 0.001], vec![0.0], vec![1.0]],
            2000,
        )
        .unwrap();
        let v = los.los(500.0, t0());
        assert_abs_diff_eq!(v.norm(), 1.0, epsilon = 1e-12);
    }
}
