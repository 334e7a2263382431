use crate::lane::{Lane, LaneAttributes};
use crate::math::{Point2d, Vector2d};
use crate::{LaneId, LaneSet};
use arrayvec::ArrayVec;
use std::ops::Index;

/// The road network: every lane plus its connectivity.
///
/// Forward edges are stored once, on the source lane, so the
/// predecessors returned by [LaneGraph::previous] can never disagree
/// with the successors returned by [LaneGraph::next].
#[derive(Clone, Default)]
pub struct LaneGraph {
    lanes: LaneSet,
}

impl LaneGraph {
    /// Creates an empty network.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a lane to the network.
    pub fn add_lane(&mut self, attributes: &LaneAttributes) -> LaneId {
        self.lanes.insert_with_key(|id| Lane::new(id, attributes))
    }

    /// Specifies that the end of the `from` lane connects to the start of the `to` lane.
    pub fn connect(&mut self, from: LaneId, to: LaneId) {
        if !self.lanes.contains_key(to) {
            return;
        }
        if let Some(lane) = self.lanes.get_mut(from) {
            lane.add_link_out(to);
        }
    }

    /// Sets the lanes either side of `lane` which can be entered by changing lanes.
    pub fn set_neighbours(&mut self, lane: LaneId, left: Option<LaneId>, right: Option<LaneId>) {
        let left = left.filter(|id| self.lanes.contains_key(*id));
        let right = right.filter(|id| self.lanes.contains_key(*id));
        if let Some(lane) = self.lanes.get_mut(lane) {
            lane.set_neighbours(left, right);
        }
    }

    /// The number of lanes.
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Whether the network has no lanes.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Gets the lane with the given ID, if it exists.
    pub fn get(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(id)
    }

    /// Whether the lane exists.
    pub fn contains(&self, id: LaneId) -> bool {
        self.lanes.contains_key(id)
    }

    /// Returns an iterator over all lanes, in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    /// Returns the IDs of all lanes, in the order they were added.
    pub fn lane_ids(&self) -> impl Iterator<Item = LaneId> + '_ {
        self.lanes.keys()
    }

    /// The lanes reachable by continuing forward off the end of `id`.
    pub fn next(&self, id: LaneId) -> impl Iterator<Item = LaneId> + '_ {
        self.lanes
            .get(id)
            .map(|lane| lane.links_out())
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(move |id| self.lanes.contains_key(*id))
    }

    /// The lanes whose end connects to the start of `id`.
    pub fn previous(&self, id: LaneId) -> impl Iterator<Item = LaneId> + '_ {
        self.lanes
            .values()
            .filter(move |lane| lane.links_out().contains(&id))
            .map(|lane| lane.id())
    }

    /// The lanes either side of `id`, left first.
    pub fn lateral_neighbours(&self, id: LaneId) -> ArrayVec<LaneId, 2> {
        self.lanes
            .get(id)
            .into_iter()
            .flat_map(|lane| [lane.neighbour_left(), lane.neighbour_right()])
            .flatten()
            .filter(|id| self.lanes.contains_key(*id))
            .collect()
    }

    /// Whether `to` is a lateral neighbour of `from`, rather than a forward connection.
    pub fn is_lateral(&self, from: LaneId, to: LaneId) -> bool {
        self.lanes
            .get(from)
            .map(|lane| lane.is_neighbour(to))
            .unwrap_or(false)
    }

    /// Whether the lane is closed. Unknown lanes count as closed.
    pub fn is_closed(&self, id: LaneId) -> bool {
        self.lanes.get(id).map(Lane::is_closed).unwrap_or(true)
    }

    /// Opens or closes a lane.
    pub fn set_closed(&mut self, id: LaneId, closed: bool) {
        if let Some(lane) = self.lanes.get_mut(id) {
            lane.set_closed(closed);
        }
    }

    /// Activates or clears the stop signal at the start of a lane.
    pub fn set_stop_signal(&mut self, id: LaneId, active: bool) {
        if let Some(lane) = self.lanes.get_mut(id) {
            lane.set_stop_signal(active);
        }
    }

    /// The world space position at parameter `t` along a lane.
    pub fn world_point(&self, id: LaneId, t: f64) -> Option<Point2d> {
        self.lanes.get(id).map(|lane| lane.world_point(t))
    }

    /// The unnormalized world space tangent at parameter `t` along a lane.
    pub fn world_tangent(&self, id: LaneId, t: f64) -> Option<Vector2d> {
        self.lanes.get(id).map(|lane| lane.world_tangent(t))
    }
}

impl Index<LaneId> for LaneGraph {
    type Output = Lane;

    fn index(&self, id: LaneId) -> &Lane {
        &self.lanes[id]
    }
}
