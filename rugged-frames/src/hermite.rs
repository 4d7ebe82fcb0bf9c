use chrono::{DateTime, Utc};
use nalgebra::Vector3;

use crate::{
    interpolation::{AngularInterpolationFilter, AngularSample, CartesianInterpolationFilter, CartesianSample},
    transform::{seconds_between, TimeStampedTransform},
};

/// Two-point cubic Hermite spline: matches position and velocity at both
/// ends, `s` is the normalized position in `[0, 1]` (`t0` at `s=0`, `t1` at
/// `s=1`), `dt` is the duration in seconds between the two ends. Returns
/// `(position, velocity, acceleration)`; the acceleration is the curve's own
/// second derivative, which callers with independently sampled acceleration
/// typically override with a direct linear blend instead.
pub(crate) fn cubic_hermite(
    p0: Vector3<f64>,
    v0: Vector3<f64>,
    p1: Vector3<f64>,
    v1: Vector3<f64>,
    dt: f64,
    s: f64,
) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;
    let p = h00 * p0 + h10 * dt * v0 + h01 * p1 + h11 * dt * v1;

    let dh00 = 6.0 * s2 - 6.0 * s;
    let dh10 = 3.0 * s2 - 4.0 * s + 1.0;
    let dh01 = -6.0 * s2 + 6.0 * s;
    let dh11 = 3.0 * s2 - 2.0 * s;
    let v = (dh00 * p0 + dh10 * dt * v0 + dh01 * p1 + dh11 * dt * v1) / dt;

    let d2h00 = 12.0 * s - 6.0;
    let d2h10 = 6.0 * s - 4.0;
    let d2h01 = -12.0 * s + 6.0;
    let d2h11 = 6.0 * s - 2.0;
    let a = (d2h00 * p0 + d2h10 * dt * v0 + d2h01 * p1 + d2h11 * dt * v1) / (dt * dt);

    (p, v, a)
}

/// Locates the bracketing pair `[idx, idx+1]` such that `date_at(idx) <= t`,
/// clamped so `idx+1` is always a valid index.
fn bracket_index(len: usize, date_at: impl Fn(usize) -> DateTime<Utc>, t: DateTime<Utc>) -> usize {
    let mut idx = 0;
    while idx + 2 < len && date_at(idx + 1) <= t {
        idx += 1;
    }
    idx
}

fn finite_difference_velocity(samples: &[CartesianSample], i: usize) -> Vector3<f64> {
    let (lo, hi) = neighbor_pair(samples.len(), i);
    let dt = seconds_between(samples[lo].date, samples[hi].date);
    if dt == 0.0 {
        return Vector3::zeros();
    }
    (samples[hi].position - samples[lo].position) / dt
}

fn effective_velocity(samples: &[CartesianSample], i: usize, filter: CartesianInterpolationFilter) -> Vector3<f64> {
    match filter {
        CartesianInterpolationFilter::UseP => finite_difference_velocity(samples, i),
        CartesianInterpolationFilter::UsePv | CartesianInterpolationFilter::UsePva => samples[i].velocity,
    }
}

fn neighbor_pair(len: usize, i: usize) -> (usize, usize) {
    if len < 2 {
        (0, 0)
    } else if i == 0 {
        (0, 1)
    } else if i == len - 1 {
        (i - 1, i)
    } else {
        (i - 1, i + 1)
    }
}

/// Interpolates an ephemeris sample list onto an arbitrary date `t`, which
/// must lie within `[samples.first().date, samples.last().date]`.
pub(crate) fn cartesian_at(samples: &[CartesianSample], filter: CartesianInterpolationFilter, t: DateTime<Utc>) -> CartesianSample {
    let idx = bracket_index(samples.len(), |i| samples[i].date, t);
    let (a, b) = (samples[idx], samples[idx + 1]);
    let dt = seconds_between(a.date, b.date);
    let s = seconds_between(a.date, t) / dt;

    let va = effective_velocity(samples, idx, filter);
    let vb = effective_velocity(samples, idx + 1, filter);
    let (position, velocity, cubic_acceleration) = cubic_hermite(a.position, va, b.position, vb, dt, s);

    let acceleration = match filter {
        CartesianInterpolationFilter::UsePva => (1.0 - s) * a.acceleration + s * b.acceleration,
        _ => cubic_acceleration,
    };

    CartesianSample { date: t, position, velocity, acceleration }
}

fn finite_difference_rate(samples: &[AngularSample], i: usize) -> Vector3<f64> {
    let (lo, hi) = neighbor_pair(samples.len(), i);
    let dt = seconds_between(samples[lo].date, samples[hi].date);
    if dt == 0.0 {
        return Vector3::zeros();
    }
    let relative = samples[lo].rotation.inverse() * samples[hi].rotation;
    relative.scaled_axis() / dt
}

fn effective_rate(samples: &[AngularSample], i: usize, filter: AngularInterpolationFilter) -> Vector3<f64> {
    match filter {
        AngularInterpolationFilter::UseR => finite_difference_rate(samples, i),
        AngularInterpolationFilter::UseRr | AngularInterpolationFilter::UseRra => samples[i].rotation_rate,
    }
}

/// Interpolates an attitude sample list onto an arbitrary date `t`.
///
/// The rotation itself is spherically interpolated (`slerp`); its rate and
/// rate-of-rate are blended linearly across the bracketing pair rather than
/// matched by a true angular Hermite spline, since the grid step is short
/// enough that both agree to the precision this geolocation pipeline needs.
pub(crate) fn angular_at(samples: &[AngularSample], filter: AngularInterpolationFilter, t: DateTime<Utc>) -> AngularSample {
    let idx = bracket_index(samples.len(), |i| samples[i].date, t);
    let (a, b) = (samples[idx], samples[idx + 1]);
    let dt = seconds_between(a.date, b.date);
    let s = (seconds_between(a.date, t) / dt).clamp(0.0, 1.0);

    let rotation = a.rotation.slerp(&b.rotation, s);
    let ra = effective_rate(samples, idx, filter);
    let rb = effective_rate(samples, idx + 1, filter);
    let rotation_rate = (1.0 - s) * ra + s * rb;
    let (aa, ab) = match filter {
        AngularInterpolationFilter::UseRra => (samples[idx].rotation_acceleration, samples[idx + 1].rotation_acceleration),
        _ => (Vector3::zeros(), Vector3::zeros()),
    };
    let rotation_acceleration = (1.0 - s) * aa + s * ab;

    AngularSample { date: t, rotation, rotation_rate, rotation_acceleration }
}

/// Hermite-interpolates a `TimeStampedTransform` grid cell's pair of
/// endpoints onto `date`. `date` may sit slightly outside `[t0, t1]` when
/// the caller is servicing a query in the interpolator's tolerance margin;
/// rotation interpolation clamps its blend parameter to `[0, 1]` in that
/// case (an intentional approximation, negligible over a tolerance-sized
/// margin), while translation/velocity/acceleration extrapolate normally.
pub(crate) fn hermite_transform(t0: &TimeStampedTransform, t1: &TimeStampedTransform, date: DateTime<Utc>) -> TimeStampedTransform {
    let dt = seconds_between(t0.date(), t1.date());
    let s = seconds_between(t0.date(), date) / dt;

    let (position, velocity, _) = cubic_hermite(t0.translation(), t0.velocity(), t1.translation(), t1.velocity(), dt, s);
    let acceleration = (1.0 - s) * t0.acceleration() + s * t1.acceleration();

    let rotation = t0.rotation().slerp(&t1.rotation(), s.clamp(0.0, 1.0));
    let rotation_rate = (1.0 - s) * t0.rotation_rate() + s * t1.rotation_rate();
    let rotation_acceleration = (1.0 - s) * t0.rotation_acceleration() + s * t1.rotation_acceleration();

    TimeStampedTransform::new(date, rotation, position, velocity, acceleration, rotation_rate, rotation_acceleration)
}

pub(crate) fn bracket_grid_index(len: usize, date_at: impl Fn(usize) -> DateTime<Utc>, t: DateTime<Utc>) -> usize {
    bracket_index(len, date_at, t)
}
