use super::Vector2d;
use cgmath::prelude::*;
use cgmath::{Basis2, Rad};

/// The signed angle needed to rotate `from` onto `to`, anti-clockwise positive.
pub fn signed_angle(from: Vector2d, to: Vector2d) -> Rad<f64> {
    Rad(from.perp_dot(to).atan2(from.dot(to)))
}

/// Rotates the unit vector `current` towards `target` by `fraction` of the angle
/// between them. `fraction` is clamped to `[0, 1]`; a zero `target` leaves
/// `current` unchanged.
pub fn rotate_towards(current: Vector2d, target: Vector2d, fraction: f64) -> Vector2d {
    if target.magnitude2() < 1e-12 {
        return current;
    }
    if current.magnitude2() < 1e-12 {
        return target.normalize();
    }
    let angle = signed_angle(current, target) * fraction.clamp(0.0, 1.0);
    Basis2::from_angle(angle).rotate_vector(current.normalize())
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn rotate_towards_is_damped() {
        let x = Vector2d::new(1.0, 0.0);
        let y = Vector2d::new(0.0, 2.0);

        let half = rotate_towards(x, y, 0.5);
        let expected = std::f64::consts::FRAC_1_SQRT_2;
        assert_approx_eq!(half.x, expected);
        assert_approx_eq!(half.y, expected);

        let full = rotate_towards(x, y, 3.0);
        assert_approx_eq!(full.x, 0.0);
        assert_approx_eq!(full.y, 1.0);

        let back = rotate_towards(y.normalize(), x, 1.0);
        assert_approx_eq!(back.x, 1.0);
        assert_approx_eq!(back.y, 0.0);
    }

    #[test]
    fn zero_target_keeps_heading() {
        let x = Vector2d::new(1.0, 0.0);
        assert_eq!(rotate_towards(x, Vector2d::new(0.0, 0.0), 0.5), x);
    }
}
