//! Angle helpers. All headings are radians in `[0, 2π)`.

use std::f32::consts::{PI, TAU};

/// Wrap an angle into `[0, 2π)`.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Unsigned shortest distance between two headings, in `[0, π]`.
#[inline]
pub fn angle_distance(a: f32, b: f32) -> f32 {
    let d = (normalize_angle(a) - normalize_angle(b)).abs();
    d.min(TAU - d)
}

/// Signed shortest turn from `from` to `to`, in `[-π, π)`.
#[inline]
pub fn signed_angle_delta(from: f32, to: f32) -> f32 {
    (to - from + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-5);
        assert!((normalize_angle(TAU + 1.0) - 1.0).abs() < 1e-5);
        let n = normalize_angle(-1e-9);
        assert!((0.0..TAU).contains(&n));
    }

    #[test]
    fn test_angle_distance_wraps() {
        assert!((angle_distance(0.1, TAU - 0.1) - 0.2).abs() < 1e-5);
        assert!((angle_distance(0.0, PI) - PI).abs() < 1e-5);
    }

    #[test]
    fn test_signed_angle_delta() {
        assert!((signed_angle_delta(TAU - 0.1, 0.1) - 0.2).abs() < 1e-5);
        assert!((signed_angle_delta(0.1, TAU - 0.1) + 0.2).abs() < 1e-5);
    }
}
