use chrono::{DateTime, Duration, Utc};
use nalgebra::{UnitQuaternion, Vector3};

/// A rigid-body transform from a source frame to a destination frame,
/// anchored at a date, carrying the first and second time derivatives of
/// both its rotation and translation.
///
/// Convention: a point `p` fixed in the source frame maps to
/// `rotation.transform_vector(p) + translation` in the destination frame.
/// `rotation_rate`/`rotation_acceleration` are expressed in the destination
/// frame's axes and describe how those axes turn relative to the source
/// frame, matching how `SpacecraftToBody`'s grid samples an ephemeris: the
/// translation/velocity/acceleration triple is the moving frame's own
/// origin (e.g. the spacecraft position, velocity, acceleration) expressed
/// in the destination (inertial) frame.
#[derive(Debug, Clone, Copy)]
pub struct TimeStampedTransform {
    date: DateTime<Utc>,
    rotation: UnitQuaternion<f64>,
    translation: Vector3<f64>,
    velocity: Vector3<f64>,
    acceleration: Vector3<f64>,
    rotation_rate: Vector3<f64>,
    rotation_acceleration: Vector3<f64>,
}

impl TimeStampedTransform {
    /// Builds a transform from its date, rotation, translation, and all
    /// four derivative vectors.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: DateTime<Utc>,
        rotation: UnitQuaternion<f64>,
        translation: Vector3<f64>,
        velocity: Vector3<f64>,
        acceleration: Vector3<f64>,
        rotation_rate: Vector3<f64>,
        rotation_acceleration: Vector3<f64>,
    ) -> Self {
        Self {
            date,
            rotation,
            translation,
            velocity,
            acceleration,
            rotation_rate,
            rotation_acceleration,
        }
    }

    /// The identity transform at `date`: no rotation, no translation, all
    /// derivatives zero.
    pub fn identity(date: DateTime<Utc>) -> Self {
        Self {
            date,
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            rotation_rate: Vector3::zeros(),
            rotation_acceleration: Vector3::zeros(),
        }
    }

    /// Anchor date.
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Rotation from the source frame to the destination frame.
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        self.rotation
    }

    /// Moving frame's origin, expressed in the destination frame, meters.
    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// First time derivative of [`translation`](Self::translation), m/s.
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    /// Second time derivative of [`translation`](Self::translation), m/s².
    pub fn acceleration(&self) -> Vector3<f64> {
        self.acceleration
    }

    /// Angular velocity of the destination frame's axes, rad/s.
    pub fn rotation_rate(&self) -> Vector3<f64> {
        self.rotation_rate
    }

    /// First time derivative of [`rotation_rate`](Self::rotation_rate), rad/s².
    pub fn rotation_acceleration(&self) -> Vector3<f64> {
        self.rotation_acceleration
    }

    /// Analytically extrapolates this transform to `date`, using a
    /// second-order Taylor expansion of the translation and a quaternion
    /// exponential of the accumulated rotation increment.
    ///
    /// This is the grid's sole means of producing a transform between two
    /// sample dates before Hermite interpolation blends a pair of these
    /// extrapolations together (see [`crate::SpacecraftToBody`]).
    pub fn shifted_by(&self, date: DateTime<Utc>) -> Self {
        let dt = seconds_between(self.date, date);
        let half_dt2 = 0.5 * dt * dt;

        let translation = self.translation + self.velocity * dt + self.acceleration * half_dt2;
        let velocity = self.velocity + self.acceleration * dt;
        let acceleration = self.acceleration;

        let rotation_increment = self.rotation_rate * dt + self.rotation_acceleration * half_dt2;
        let rotation = UnitQuaternion::from_scaled_axis(rotation_increment) * self.rotation;
        let rotation_rate = self.rotation_rate + self.rotation_acceleration * dt;
        let rotation_acceleration = self.rotation_acceleration;

        Self {
            date,
            rotation,
            translation,
            velocity,
            acceleration,
            rotation_rate,
            rotation_acceleration,
        }
    }

    /// Returns the inverse transform (destination frame back to source
    /// frame), evaluated at the same date.
    ///
    /// Derivative inversion uses the moving-frame kinematics formulas for a
    /// point fixed at the new origin (`p = 0` in the destination frame):
    /// `v' = R^-1(-V) - Ω' × p'`, with `Ω'` the rotation rate re-expressed
    /// in the source frame.
    pub fn invert(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        let inv_translation = inv_rotation.transform_vector(&(-self.translation));
        let inv_rotation_rate = inv_rotation.transform_vector(&(-self.rotation_rate));
        let inv_rotation_acceleration = inv_rotation.transform_vector(&(-self.rotation_acceleration));

        let inv_velocity = inv_rotation.transform_vector(&(-self.velocity)) - inv_rotation_rate.cross(&inv_translation);
        let coriolis = 2.0 * inv_rotation_rate.cross(&inv_velocity);
        let centrifugal = inv_rotation_rate.cross(&inv_rotation_rate.cross(&inv_translation));
        let euler = inv_rotation_acceleration.cross(&inv_translation);
        let inv_acceleration = inv_rotation.transform_vector(&(-self.acceleration)) - coriolis - centrifugal - euler;

        Self {
            date: self.date,
            rotation: inv_rotation,
            translation: inv_translation,
            velocity: inv_velocity,
            acceleration: inv_acceleration,
            rotation_rate: inv_rotation_rate,
            rotation_acceleration: inv_rotation_acceleration,
        }
    }

    /// Composes `self` (frame A to frame B) with `next` (frame B to frame
    /// C), returning the combined frame A to frame C transform.
    ///
    /// Both must already share a date (callers align them via
    /// [`shifted_by`](Self::shifted_by) or grid interpolation first); the
    /// result is stamped with `self`'s date.
    ///
    /// Acceleration composition omits the second-order Coriolis cross-terms
    /// between `self`'s own rotation rate and `next`'s translation rate
    /// (both are usually slowly varying grid samples, so the dropped terms
    /// are negligible relative to the grid's own interpolation error); this
    /// is a documented simplification, not a physically exact composition.
    pub fn compose(&self, next: &Self) -> Self {
        let rotation = next.rotation * self.rotation;
        let translation = next.rotation.transform_vector(&self.translation) + next.translation;

        let omega_cross_t = next.rotation_rate.cross(&self.translation);
        let velocity = next.rotation.transform_vector(&(self.velocity + omega_cross_t)) + next.velocity;

        let coriolis = 2.0 * next.rotation_rate.cross(&self.velocity);
        let centrifugal = next.rotation_rate.cross(&next.rotation_rate.cross(&self.translation));
        let euler = next.rotation_acceleration.cross(&self.translation);
        let acceleration =
            next.rotation.transform_vector(&(self.acceleration + coriolis + centrifugal + euler)) + next.acceleration;

        let rotation_rate = self.rotation.inverse().transform_vector(&next.rotation_rate) + self.rotation_rate;
        let rotation_acceleration =
            self.rotation.inverse().transform_vector(&next.rotation_acceleration) + self.rotation_acceleration;

        Self {
            date: self.date,
            rotation,
            translation,
            velocity,
            acceleration,
            rotation_rate,
            rotation_acceleration,
        }
    }
}

pub(crate) fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    duration_to_seconds(to - from)
}

pub(crate) fn duration_to_seconds(duration: Duration) -> f64 {
    duration.num_nanoseconds().map(|ns| ns as f64 * 1.0e-9).unwrap_or_else(|| {
        duration.num_milliseconds() as f64 * 1.0e-3
    })
}

pub(crate) fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::nanoseconds((seconds * 1.0e9).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn t0() -> DateTime<Utc> {
        "2020-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn shifted_by_extrapolates_constant_velocity() {
        let t = TimeStampedTransform::new(
            t0(),
            UnitQuaternion::identity(),
            Vector3::new(1000.0, 0.0, 0.0),
            Vector3::new(0.0, 7000.0, 0.0),
            Vector3::zeros(),
            Vector3::zeros(),
            Vector3::zeros(),
        );
        let shifted = t.shifted_by(t0() + Duration::seconds(10));
        assert_abs_diff_eq!(shifted.translation().x, 1000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(shifted.translation().y, 70_000.0, epsilon = 1e-9);
    }

    #[test]
    fn invert_undoes_translation_only_transform() {
        let t = TimeStampedTransform::new(
            t0(),
            UnitQuaternion::identity(),
            Vector3::new(10.0, 20.0, 30.0),
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::zeros(),
            Vector3::zeros(),
            Vector3::zeros(),
        );
        let inv = t.invert();
        assert_abs_diff_eq!(inv.translation().x, -10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(inv.velocity().y, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn compose_with_identity_is_unchanged() {
        let t = TimeStampedTransform::new(
            t0(),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.1, 0.0, 0.0)),
            Vector3::new(10.0, 20.0, 30.0),
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::zeros(),
            Vector3::new(0.0, 0.0, 0.01),
            Vector3::zeros(),
        );
        let identity = TimeStampedTransform::identity(t0());
        let composed = t.compose(&identity);
        assert_abs_diff_eq!(composed.translation().x, t.translation().x, epsilon = 1e-12);
        assert_abs_diff_eq!(composed.rotation().angle(), t.rotation().angle(), epsilon = 1e-12);
    }
}
