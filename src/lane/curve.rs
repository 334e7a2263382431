use crate::math::{CubicBezier2d, ParametricCurve2d, Placement, Point2d, Vector2d};
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The centre line of a lane: a cubic bezier authored in a local frame.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneCurve {
    bezier: CubicBezier2d,
    placement: Placement,
}

/// The result of sampling a [LaneCurve] in world space.
#[derive(Clone, Copy, Debug)]
pub struct LaneSample {
    /// The position on the centre line.
    pub pos: Point2d,
    /// The tangent unit vector, or zero where the curve is degenerate.
    pub dir: Vector2d,
}

impl LaneCurve {
    /// Creates a new [LaneCurve].
    pub fn new(bezier: CubicBezier2d, placement: Placement) -> Self {
        Self { bezier, placement }
    }

    /// The control points in the lane's local frame.
    pub fn control_points(&self) -> &[Point2d; 4] {
        self.bezier.points()
    }

    /// The frame the control points are authored in.
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// The point at parameter `t`, clamped to `[0, 1]`, in the local frame.
    pub fn point_at(&self, t: f64) -> Point2d {
        self.bezier.sample_clamped(t)
    }

    /// The unnormalized derivative at parameter `t`, clamped to `[0, 1]`, in the local frame.
    pub fn tangent_at(&self, t: f64) -> Vector2d {
        self.bezier.sample_dt_clamped(t)
    }

    /// The point at parameter `t` in world space.
    pub fn world_point(&self, t: f64) -> Point2d {
        self.placement.transform_point(self.point_at(t))
    }

    /// The unnormalized derivative at parameter `t` in world space.
    pub fn world_tangent(&self, t: f64) -> Vector2d {
        self.placement.transform_vector(self.tangent_at(t))
    }

    /// Samples the world space position and heading at parameter `t`.
    pub fn sample(&self, t: f64) -> LaneSample {
        let tan = self.world_tangent(t);
        let dir = if tan.magnitude2() > 0.0 {
            tan.normalize()
        } else {
            Vector2d::new(0.0, 0.0)
        };
        LaneSample {
            pos: self.world_point(t),
            dir,
        }
    }
}
