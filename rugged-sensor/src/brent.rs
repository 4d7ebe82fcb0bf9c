/// Finds a root of `f` within `[lo, hi]`, where `f(lo)` and `f(hi)` must
/// have opposite signs, to within `tolerance` on the bracket width.
///
/// Classic Brent's method: bisection guarded secant/inverse-quadratic
/// interpolation, guaranteed to converge whenever the initial bracket is
/// valid.
///
/// # Panics
///
/// Panics if `f(lo)` and `f(hi)` have the same sign.
pub(crate) fn find_root<F>(mut f: F, lo: f64, hi: f64, tolerance: f64, max_iterations: usize) -> f64
where
    F: FnMut(f64) -> f64,
{
    let mut a = lo;
    let mut b = hi;
    let mut fa = f(a);
    let mut fb = f(b);
    assert!(fa * fb <= 0.0, "brent: root is not bracketed by [{lo}, {hi}]");

    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = a;
    let mut fc = fa;
    let mut mflag = true;
    let mut d = a;
    let mut s = b;

    for _ in 0..max_iterations {
        if fb == 0.0 || (b - a).abs() < tolerance {
            return b;
        }

        s = if fa != fc && fb != fc {
            // Inverse quadratic interpolation.
            a * fb * fc / ((fa - fb) * (fa - fc))
                + b * fa * fc / ((fb - fa) * (fb - fc))
                + c * fa * fb / ((fc - fa) * (fc - fb))
        } else {
            // Secant.
            b - fb * (b - a) / (fb - fa)
        };

        let bisection_mid = (3.0 * a + b) / 4.0;
        let out_of_range = (s < bisection_mid && s < b) || (s > bisection_mid && s > b);
        let step_too_small = mflag && (s - b).abs() >= (b - c).abs() / 2.0
            || !mflag && (s - b).abs() >= (c - d).abs() / 2.0;

        if out_of_range || step_too_small {
            s = (a + b) / 2.0;
            mflag = true;
        } else {
            mflag = false;
        }

        let fs = f(s);
        d = c;
        c = b;
        fc = fb;

        if fa * fs < 0.0 {
            b = s;
            fb = fs;
        } else {
            a = s;
            fa = fs;
        }

        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
    }
    let _ = d;
    log::warn!(
        "brent::find_root exhausted {max_iterations} iterations without reaching tolerance {tolerance}; \
         returning best-effort root {s} (remaining bracket width {})",
        (b - a).abs()
    );
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn finds_root_of_a_simple_cubic() {
        let root = find_root(|x| x * x * x - x - 2.0, 1.0, 2.0, 1e-12, 100);
        assert_abs_diff_eq!(root, 1.521379706804568, epsilon = 1e-9);
    }

    #[test]
    fn finds_root_of_a_linear_function() {
        let root = find_root(|x| 2.0 * x - 3.0, 0.0, 10.0, 1e-12, 100);
        assert_abs_diff_eq!(root, 1.5, epsilon = 1e-9);
    }
}
