use super::{Point2d, Vector2d};
use cgmath::prelude::*;
use cgmath::{Basis2, Rad};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The frame a lane's control points are authored in,
/// relative to the world.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    origin: Point2d,
    rotation: Basis2<f64>,
}

impl Placement {
    /// A frame which coincides with world space.
    pub fn identity() -> Self {
        Self::new(Point2d::origin(), Rad(0.0))
    }

    /// A frame translated to `origin` and rotated anti-clockwise by `angle`.
    pub fn new(origin: Point2d, angle: Rad<f64>) -> Self {
        Self {
            origin,
            rotation: Basis2::from_angle(angle),
        }
    }

    /// Maps a point in local coordinates to world space.
    pub fn transform_point(&self, point: Point2d) -> Point2d {
        self.origin + self.rotation.rotate_vector(point.to_vec())
    }

    /// Maps a direction in local coordinates to world space.
    pub fn transform_vector(&self, vec: Vector2d) -> Vector2d {
        self.rotation.rotate_vector(vec)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}
