use nalgebra::Vector3;

/// Classical (non-relativistic) aberration of light.
///
/// Given the observed line of sight `l_obs` (incoming photon direction) and
/// the spacecraft's inertial velocity `v_sat`, returns the corrected line
/// of sight `l' = (k/c) l_obs - v_sat/c`, where `k` is the positive root of
/// `a k^2 - 2 b k - c_ = 0` with `a = |l_obs|^2`, `b = l_obs . v_sat`,
/// `c_ = |v_sat|^2 - c^2`.
///
/// Uses the numerically stable root selection (`k = -c_/(s+b)` when `b >
/// 0`, else `(s-b)/a`) to avoid cancellation when `b` is small.
pub fn aberration_of_light(l_obs: Vector3<f64>, v_sat: Vector3<f64>, c: f64) -> Vector3<f64> {
    let a = l_obs.norm_squared();
    let b = l_obs.dot(&v_sat);
    let c_ = v_sat.norm_squared() - c * c;
    let s = (b * b - a * c_).sqrt();
    let k = if b > 0.0 { -c_ / (s + b) } else { (s - b) / a };
    (k / c) * l_obs - v_sat / c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rugged_ellipsoid::SPEED_OF_LIGHT as C;

    #[test]
    fn zero_velocity_leaves_los_direction_unchanged_up_to_scale() {
        let l_obs = Vector3::new(0.0, 0.0, 1.0);
        let corrected = aberration_of_light(l_obs, Vector3::zeros(), C);
        let normalized = corrected.normalize();
        assert_abs_diff_eq!(normalized.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn small_velocity_produces_a_small_correction() {
        let l_obs = Vector3::new(0.0, 0.0, 1.0);
        let v_sat = Vector3::new(7500.0, 0.0, 0.0);
        let corrected = aberration_of_light(l_obs, v_sat, C);
        let deflection = (corrected.normalize() - l_obs).norm();
        assert!(deflection > 0.0 && deflection < 1e-3);
    }
}
