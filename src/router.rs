//! Routing over the lane graph.

use crate::graph::LaneGraph;
use crate::LaneId;
use pathfinding::directed::bfs::bfs;

/// Finds the path with the fewest hops from `start` to `end`, inclusive of both.
///
/// Both forward connections and lateral neighbours count as a single hop.
/// Closed lanes are never entered, though `start` itself may be closed.
/// Returns an empty path if `end` cannot be reached.
pub fn find_path(lanes: &LaneGraph, start: LaneId, end: LaneId) -> Vec<LaneId> {
    if !lanes.contains(start) {
        return vec![];
    }
    bfs(&start, |id| successors(lanes, *id), |id| *id == end).unwrap_or_default()
}

/// The lanes that can be entered directly from `lane`, in visiting order.
fn successors(lanes: &LaneGraph, lane: LaneId) -> impl Iterator<Item = LaneId> + '_ {
    lanes
        .next(lane)
        .chain(lanes.lateral_neighbours(lane))
        .filter(|id| !lanes.is_closed(*id))
}
