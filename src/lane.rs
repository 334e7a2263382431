use crate::math::{CubicBezier2d, Placement, Point2d, Vector2d};
use crate::LaneId;
pub use curve::{LaneCurve, LaneSample};
use smallvec::SmallVec;

mod curve;

/// A lane is a single directed, curved segment of road.
#[derive(Clone, Debug)]
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// A name used in diagnostics.
    name: String,
    /// The geometry of the lane.
    curve: LaneCurve,
    /// The lanes that succeed this one.
    links_out: SmallVec<[LaneId; 4]>,
    /// The lane to the left, which can be entered by changing lanes.
    neighbour_left: Option<LaneId>,
    /// The lane to the right, which can be entered by changing lanes.
    neighbour_right: Option<LaneId>,
    /// Speed limit in m/s.
    speed_limit: f64,
    /// Whether the lane is closed, e.g. by an incident.
    closed: bool,
    /// Whether vehicles must stop before entering the lane.
    stop_signal: bool,
}

/// The attributes of a lane.
#[derive(Clone, Copy, Debug)]
pub struct LaneAttributes<'a> {
    /// A name used in diagnostics.
    pub name: &'a str,
    /// The centre line of the lane, relative to `placement`.
    pub curve: CubicBezier2d,
    /// The frame the curve's control points are authored in.
    pub placement: Placement,
    /// The speed limit in m/s.
    pub speed_limit: f64,
}

impl<'a> LaneAttributes<'a> {
    /// The attributes of a straight lane authored in world space.
    pub fn straight(name: &'a str, start: Point2d, end: Point2d, speed_limit: f64) -> Self {
        Self {
            name,
            curve: CubicBezier2d::line(start, end),
            placement: Placement::identity(),
            speed_limit,
        }
    }
}

impl Lane {
    /// Creates a new lane.
    pub(crate) fn new(id: LaneId, attribs: &LaneAttributes) -> Self {
        Self {
            id,
            name: attribs.name.to_owned(),
            curve: LaneCurve::new(attribs.curve, attribs.placement),
            links_out: SmallVec::new(),
            neighbour_left: None,
            neighbour_right: None,
            speed_limit: attribs.speed_limit,
            closed: false,
            stop_signal: false,
        }
    }

    /// Gets the lane's ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Gets the lane's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the curve representing the lane's centre line.
    pub fn curve(&self) -> &LaneCurve {
        &self.curve
    }

    /// Gets the speed limit of the lane in m/s.
    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    /// Whether the lane is closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a stop signal is active at the start of the lane.
    pub fn stop_signal(&self) -> bool {
        self.stop_signal
    }

    /// The lanes reachable by continuing forward off the end of this one.
    pub fn links_out(&self) -> &[LaneId] {
        &self.links_out
    }

    /// The lane to the left, if any.
    pub fn neighbour_left(&self) -> Option<LaneId> {
        self.neighbour_left
    }

    /// The lane to the right, if any.
    pub fn neighbour_right(&self) -> Option<LaneId> {
        self.neighbour_right
    }

    /// Whether `lane` can only be reached from this lane by changing lanes.
    pub fn is_neighbour(&self, lane: LaneId) -> bool {
        self.neighbour_left == Some(lane) || self.neighbour_right == Some(lane)
    }

    /// The world space position at parameter `t`.
    pub fn world_point(&self, t: f64) -> Point2d {
        self.curve.world_point(t)
    }

    /// The unnormalized world space tangent at parameter `t`.
    pub fn world_tangent(&self, t: f64) -> Vector2d {
        self.curve.world_tangent(t)
    }

    /// The world space position half way along the lane.
    pub fn midpoint(&self) -> Point2d {
        self.curve.world_point(0.5)
    }

    /// Adds a successor lane.
    pub(crate) fn add_link_out(&mut self, lane: LaneId) {
        if !self.links_out.contains(&lane) {
            self.links_out.push(lane);
        }
    }

    /// Sets the lateral neighbours.
    pub(crate) fn set_neighbours(&mut self, left: Option<LaneId>, right: Option<LaneId>) {
        self.neighbour_left = left;
        self.neighbour_right = right;
    }

    pub(crate) fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    pub(crate) fn set_stop_signal(&mut self, active: bool) {
        self.stop_signal = active;
    }
}
