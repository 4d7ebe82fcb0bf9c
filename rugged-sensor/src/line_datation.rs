use chrono::{DateTime, Duration, Utc};

use crate::error::SensorError;

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_nanoseconds().map(|ns| ns as f64 * 1.0e-9).unwrap_or(0.0)
}

fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::nanoseconds((seconds * 1.0e9).round() as i64)
}

/// Constant-rate line datation: `date = t0 + (line - line0) / rate`.
#[derive(Debug, Clone, Copy)]
pub struct AffineLineDatation {
    t0: DateTime<Utc>,
    line0: f64,
    rate: f64,
}

impl AffineLineDatation {
    /// Builds an affine datation anchoring `line0` at `t0`, acquiring
    /// `rate` lines per second.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidStep`] if `rate` is zero or not finite.
    pub fn new(t0: DateTime<Utc>, line0: f64, rate: f64) -> Result<Self, SensorError> {
        if rate == 0.0 || !rate.is_finite() {
            return Err(SensorError::InvalidStep { step: rate });
        }
        Ok(Self { t0, line0, rate })
    }
}

impl AffineLineDatation {
    /// Date at which `line` was acquired.
    pub fn date(&self, line: f64) -> DateTime<Utc> {
        self.t0 + seconds_to_duration((line - self.line0) / self.rate)
    }

    /// Fractional line acquired at `date` (the inverse of [`date`](Self::date)).
    pub fn line(&self, date: DateTime<Utc>) -> f64 {
        self.line0 + self.rate * seconds_between(self.t0, date)
    }

    /// Local line rate `dl/dt`, lines per second, at `line`.
    pub fn rate(&self, _line: f64) -> f64 {
        self.rate
    }
}

/// Piecewise-linear line datation built from tabulated (line, date) pairs,
/// for sensors whose line rate drifts (e.g. across detector resets).
pub struct TabulatedLineDatation {
    lines: Vec<f64>,
    dates: Vec<DateTime<Utc>>,
}

impl TabulatedLineDatation {
    /// Builds a tabulated datation from samples sorted by ascending line
    /// number (and, since the mapping is monotone, ascending date).
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidStep`] if fewer than two samples are
    /// given or any consecutive pair does not strictly increase in both
    /// line and date.
    pub fn new(samples: &[(f64, DateTime<Utc>)]) -> Result<Self, SensorError> {
        if samples.len() < 2 {
            return Err(SensorError::InvalidStep { step: 0.0 });
        }
        for pair in samples.windows(2) {
            let (l0, d0) = pair[0];
            let (l1, d1) = pair[1];
            if l1 <= l0 || d1 <= d0 {
                return Err(SensorError::InvalidStep { step: l1 - l0 });
            }
        }
        Ok(Self {
            lines: samples.iter().map(|(l, _)| *l).collect(),
            dates: samples.iter().map(|(_, d)| *d).collect(),
        })
    }

    fn bracket_by_line(&self, line: f64) -> usize {
        let mut idx = 0;
        while idx + 2 < self.lines.len() && self.lines[idx + 1] <= line {
            idx += 1;
        }
        idx
    }

    fn bracket_by_date(&self, date: DateTime<Utc>) -> usize {
        let mut idx = 0;
        while idx + 2 < self.dates.len() && self.dates[idx + 1] <= date {
            idx += 1;
        }
        idx
    }
}

impl TabulatedLineDatation {
    /// Date at which `line` was acquired.
    pub fn date(&self, line: f64) -> DateTime<Utc> {
        let idx = self.bracket_by_line(line);
        let (l0, l1) = (self.lines[idx], self.lines[idx + 1]);
        let (d0, d1) = (self.dates[idx], self.dates[idx + 1]);
        let s = (line - l0) / (l1 - l0);
        d0 + seconds_to_duration(s * seconds_between(d0, d1))
    }

    /// Fractional line acquired at `date` (the inverse of [`date`](Self::date)).
    pub fn line(&self, date: DateTime<Utc>) -> f64 {
        let idx = self.bracket_by_date(date);
        let (l0, l1) = (self.lines[idx], self.lines[idx + 1]);
        let (d0, d1) = (self.dates[idx], self.dates[idx + 1]);
        let s = seconds_between(d0, date) / seconds_between(d0, d1);
        l0 + s * (l1 - l0)
    }

    /// Local line rate `dl/dt`, lines per second, at `line`.
    pub fn rate(&self, line: f64) -> f64 {
        let idx = self.bracket_by_line(line);
        let (l0, l1) = (self.lines[idx], self.lines[idx + 1]);
        let (d0, d1) = (self.dates[idx], self.dates[idx + 1]);
        (l1 - l0) / seconds_between(d0, d1)
    }
}

/// Which concrete line datation a [`crate::LineSensor`] uses.
///
/// A tagged enum rather than `Box<dyn Trait>`: the set of datation models
/// is small and closed, and this is on the hot path (one call per located
/// pixel), so a `match` is preferable to vtable dispatch.
pub enum LineDatationKind {
    /// Constant-rate datation.
    Affine(AffineLineDatation),
    /// Piecewise-linear, tabulated datation.
    Tabulated(TabulatedLineDatation),
}

impl LineDatationKind {
    /// Date at which `line` was acquired.
    pub fn date(&self, line: f64) -> DateTime<Utc> {
        match self {
            Self::Affine(d) => d.date(line),
            Self::Tabulated(d) => d.date(line),
        }
    }

    /// Fractional line acquired at `date`.
    pub fn line(&self, date: DateTime<Utc>) -> f64 {
        match self {
            Self::Affine(d) => d.line(date),
            Self::Tabulated(d) => d.line(date),
        }
    }

    /// Local line rate `dl/dt`, lines per second, at `line`.
    pub fn rate(&self, line: f64) -> f64 {
        match self {
            Self::Affine(d) => d.rate(line),
            Self::Tabulated(d) => d.rate(line),
        }
    }
}

impl From<AffineLineDatation> for LineDatationKind {
    fn from(d: AffineLineDatation) -> Self {
        Self::Affine(d)
    }
}

impl From<TabulatedLineDatation> for LineDatationKind {
    fn from(d: TabulatedLineDatation) -> Self {
        Self::Tabulated(d)
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
    fn affine_round_trips_line_and_date() {
        let d = AffineLineDatation::new(t0(), 0.0, 20.0).unwrap();
        let date = d.date(100.0);
        assert_abs_diff_eq!(d.line(date), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(d.rate(100.0), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn tabulated_interpolates_between_samples() {
        let d = TabulatedLineDatation::new(&[
            (0.0, t0()),
            (100.0, t0() + Duration::seconds(5)),
            (200.0, t0() + Duration::seconds(12)),
        ])
        .unwrap();
        assert_abs_diff_eq!(d.line(t0() + Duration::milliseconds(2500)), 50.0, epsilon = 1e-6);
    }

    #[test]
    fn tabulated_rejects_non_monotone_samples() {
        let result = TabulatedLineDatation::new(&[(0.0, t0()), (10.0, t0() - Duration::seconds(1))]);
        assert!(result.is_err());
    }
}
