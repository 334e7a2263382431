use crate::math::{rotate_towards, Vector2d};
use cgmath::InnerSpace;

/// The smallest tangent magnitude used to convert speed into a change of `t`.
const MIN_TANGENT_LEN: f64 = 0.1;

/// How far to advance the curve parameter for a vehicle travelling at `speed`
/// for `dt` seconds, where `tangent` is the curve's derivative at the current `t`.
pub fn param_step(speed: f64, dt: f64, tangent: Vector2d) -> f64 {
    speed * dt / f64::max(tangent.magnitude(), MIN_TANGENT_LEN)
}

/// Turns the heading `dir` towards the unit vector `target`,
/// at `rate` per second over `dt` seconds.
pub fn smooth_heading(dir: Vector2d, target: Vector2d, rate: f64, dt: f64) -> Vector2d {
    rotate_towards(dir, target, rate * dt)
}
