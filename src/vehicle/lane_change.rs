use crate::graph::LaneGraph;
use crate::lane::LaneSample;
use crate::math::Vector2d;
use crate::LaneId;
use cgmath::prelude::*;

/// Why a lane change was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneChangeKind {
    /// A step on the planned path; the path cursor advances once it completes.
    Planned,
    /// A merge off the planned path; the path is recomputed once it completes.
    Reroute,
}

/// An in-progress lane change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneChange {
    /// The lane being left.
    pub origin: LaneId,
    /// The lane being entered.
    pub destination: LaneId,
    /// How far through the manoeuvre the vehicle is, from 0 to 1.
    pub progress: f64,
    /// Why the lane change was started.
    pub kind: LaneChangeKind,
}

impl LaneChange {
    pub(crate) fn new(origin: LaneId, destination: LaneId, kind: LaneChangeKind) -> Self {
        Self {
            origin,
            destination,
            progress: 0.0,
            kind,
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Blends the samples of the origin and destination lanes at the same `t`.
    pub(crate) fn sample(&self, lanes: &LaneGraph, t: f64) -> Option<LaneSample> {
        let from = lanes.get(self.origin)?.curve().sample(t);
        let to = lanes.get(self.destination)?.curve().sample(t);
        let amount = self.progress.clamp(0.0, 1.0);

        let pos = from.pos + (to.pos - from.pos) * amount;
        let dir = from.dir.lerp(to.dir, amount);
        let dir = if dir.magnitude2() > 0.0 {
            dir.normalize()
        } else {
            Vector2d::new(0.0, 0.0)
        };
        Some(LaneSample { pos, dir })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lane::LaneAttributes;
    use crate::math::Point2d;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn sample_blends_between_lanes() {
        let mut lanes = LaneGraph::new();
        let a = lanes.add_lane(&LaneAttributes::straight(
            "a",
            Point2d::new(0.0, 0.0),
            Point2d::new(100.0, 0.0),
            10.0,
        ));
        let b = lanes.add_lane(&LaneAttributes::straight(
            "b",
            Point2d::new(0.0, 4.0),
            Point2d::new(100.0, 4.0),
            10.0,
        ));
        let mut lc = LaneChange::new(a, b, LaneChangeKind::Planned);

        lc.progress = 0.25;
        let sample = lc.sample(&lanes, 0.5).unwrap();
        assert_approx_eq!(sample.pos.x, 50.0);
        assert_approx_eq!(sample.pos.y, 1.0);
        assert_approx_eq!(sample.dir.x, 1.0);

        lc.progress = 1.5;
        assert!(lc.is_complete());
        assert_approx_eq!(lc.sample(&lanes, 0.5).unwrap().pos.y, 4.0);
    }
}
