use self::dynamics::{param_step, smooth_heading};
pub use self::lane_change::{LaneChange, LaneChangeKind};
use crate::graph::LaneGraph;
use crate::math::{Point2d, Vector2d};
use crate::router::find_path;
use crate::{LaneId, VehicleId};
use log::{debug, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod dynamics;
mod lane_change;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    pub(crate) id: VehicleId,
    /// The vehicle's attributes.
    attribs: VehicleAttributes,
    /// The lane the vehicle is currently on.
    lane: LaneId,
    /// The lane the vehicle is trying to reach.
    target: Option<LaneId>,
    /// The curve parameter along the current lane, from 0 to 1.
    t: f64,
    /// The planned path from the lane the path was computed on to the target.
    path: Vec<LaneId>,
    /// The index of the next unconsumed lane in `path`.
    path_index: usize,
    /// What the vehicle is doing.
    state: VehicleState,
    /// Whether a reroute around a closed lane failed and should be retried.
    reroute_pending: bool,
    /// Whether the end of the path has been reported since the target was last set.
    arrival_reported: bool,
    /// The time since the last lane change finished in s.
    since_lane_change: f64,
    /// The world space coordinates of the vehicle.
    world_pos: Point2d,
    /// A world space unit vector aligned with the vehicle's heading.
    world_dir: Vector2d,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct VehicleAttributes {
    /// The vehicle's top speed in m/s.
    pub max_speed: f64,
    /// How quickly the heading turns towards the lane direction, per s.
    pub rotation_speed: f64,
    /// Whether the vehicle may start planned lane changes part way along a lane.
    pub lane_changing: bool,
    /// The fraction of a lane change completed per s.
    pub lane_change_rate: f64,
    /// The minimum time between lane changes in s.
    pub lane_change_cooldown: f64,
    /// How far along a lane (0 to 1) the vehicle must be to start a planned lane change.
    pub lane_change_trigger: f64,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            max_speed: 15.0,
            rotation_speed: 5.0,
            lane_changing: true,
            lane_change_rate: 2.0,
            lane_change_cooldown: 1.0,
            lane_change_trigger: 0.2,
        }
    }
}

/// What a vehicle is doing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VehicleState {
    /// Travelling along its current lane.
    FollowingLane,
    /// Moving across to a neighbouring lane.
    ChangingLane(LaneChange),
    /// Stopped at the end of its lane with nowhere to go until it is given a new target.
    PathExhausted,
}

/// Something that happened to a vehicle during a step of the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VehicleEvent {
    /// The vehicle ran out of path, either at the end of its target lane or,
    /// when the target was unreachable, at the end of the lane it was on.
    TargetReached { vehicle: VehicleId, lane: LaneId },
    /// No open route exists from the vehicle's lane to its target.
    NoRoute {
        vehicle: VehicleId,
        from: LaneId,
        to: LaneId,
    },
}

/// Adjusts a vehicle's speed to avoid whatever is ahead of it.
pub trait LocalAvoidance {
    /// Returns the speed the vehicle may travel at, given its unobstructed speed.
    fn limit_speed(&self, vehicle: &Vehicle, lanes: &LaneGraph, speed: f64) -> f64;
}

/// Local avoidance which never slows vehicles down.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAvoidance;

impl LocalAvoidance for NoAvoidance {
    fn limit_speed(&self, _vehicle: &Vehicle, _lanes: &LaneGraph, speed: f64) -> f64 {
        speed
    }
}

impl Vehicle {
    /// Creates a new vehicle at the start of `lane`.
    pub(crate) fn new(
        id: VehicleId,
        attribs: &VehicleAttributes,
        lane: LaneId,
        lanes: &LaneGraph,
    ) -> Self {
        let mut vehicle = Self {
            id,
            attribs: *attribs,
            lane,
            target: None,
            t: 0.0,
            path: vec![],
            path_index: 0,
            state: VehicleState::FollowingLane,
            reroute_pending: false,
            arrival_reported: false,
            since_lane_change: 0.0,
            world_pos: Point2d::new(0.0, 0.0),
            world_dir: Vector2d::new(0.0, 0.0),
        };
        if let Some(lane) = lanes.get(lane) {
            let sample = lane.curve().sample(0.0);
            vehicle.world_pos = sample.pos;
            vehicle.world_dir = sample.dir;
        }
        vehicle
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// Gets the vehicle's attributes.
    pub fn attributes(&self) -> &VehicleAttributes {
        &self.attribs
    }

    /// The ID of the lane the vehicle is currently on.
    pub fn lane_id(&self) -> LaneId {
        self.lane
    }

    /// The lane the vehicle is trying to reach.
    pub fn target(&self) -> Option<LaneId> {
        self.target
    }

    /// The curve parameter along the current lane, from 0 to 1.
    pub fn param(&self) -> f64 {
        self.t
    }

    /// The planned path, including lanes already travelled.
    pub fn path(&self) -> &[LaneId] {
        &self.path
    }

    /// The lanes on the planned path still to be entered.
    pub fn remaining_path(&self) -> &[LaneId] {
        self.path.get(self.path_index..).unwrap_or_default()
    }

    /// What the vehicle is doing.
    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// Whether the vehicle is part way through a lane change.
    pub fn is_changing_lanes(&self) -> bool {
        matches!(self.state, VehicleState::ChangingLane(_))
    }

    /// Whether the vehicle is waiting for a new target.
    pub fn is_idle(&self) -> bool {
        self.state == VehicleState::PathExhausted
    }

    /// Whether the vehicle is holding for a closed lane to reopen.
    pub fn is_awaiting_reroute(&self) -> bool {
        self.reroute_pending
    }

    /// The coordinates in world space of the vehicle.
    pub fn position(&self) -> Point2d {
        self.world_pos
    }

    /// A unit vector in world space aligned with the vehicle's heading.
    pub fn direction(&self) -> Vector2d {
        self.world_dir
    }

    /// Staggers when the vehicle may first change lanes.
    pub(crate) fn set_lane_change_timer(&mut self, elapsed: f64) {
        self.since_lane_change = elapsed;
    }

    /// Sets the vehicle's target lane and plans a path to it.
    ///
    /// If there is no route the vehicle drives to the end of its lane,
    /// where it reports reaching its target so it can be given another.
    pub(crate) fn set_target(&mut self, target: LaneId, lanes: &LaneGraph) -> Option<VehicleEvent> {
        self.target = Some(target);
        self.reroute_pending = false;
        self.arrival_reported = false;
        if let VehicleState::ChangingLane(lc) = &mut self.state {
            // The path is planned from the destination lane once the change completes
            lc.kind = LaneChangeKind::Reroute;
            return None;
        }
        if self.state == VehicleState::PathExhausted {
            self.state = VehicleState::FollowingLane;
        }
        self.replan(lanes)
    }

    /// Starts a merge into a neighbouring lane which isn't on the planned path.
    /// Returns `false` if `lane` isn't a neighbour or the vehicle is already changing lanes.
    pub(crate) fn merge_into(&mut self, lane: LaneId, lanes: &LaneGraph) -> bool {
        if self.is_changing_lanes() || !lanes.is_lateral(self.lane, lane) || lanes.is_closed(lane)
        {
            return false;
        }
        self.begin_lane_change(lane, LaneChangeKind::Reroute);
        true
    }

    /// Advances the vehicle by `dt` seconds.
    pub(crate) fn step(
        &mut self,
        dt: f64,
        lanes: &LaneGraph,
        avoidance: &dyn LocalAvoidance,
    ) -> Option<VehicleEvent> {
        let Some(lane) = lanes.get(self.lane) else {
            return None;
        };
        self.since_lane_change += dt;

        if self.state == VehicleState::PathExhausted {
            self.update_coords(lanes, dt);
            return None;
        }

        let base_speed = f64::min(self.attribs.max_speed, lane.speed_limit());
        let speed = f64::min(base_speed, avoidance.limit_speed(self, lanes, base_speed));

        // Start a planned lane change without waiting for the end of the lane
        if self.state == VehicleState::FollowingLane && self.may_change_lanes() {
            if let Some(next) = self.next_lane() {
                if lanes.is_lateral(self.lane, next)
                    && !lanes.is_closed(next)
                    && self.t > self.attribs.lane_change_trigger
                {
                    self.begin_lane_change(next, LaneChangeKind::Planned);
                }
            }
        }

        let mut event = None;

        if self.state == VehicleState::FollowingLane {
            self.t += param_step(speed, dt, lane.world_tangent(self.t));
            if self.t >= 1.0 {
                event = self.end_of_lane(lanes);
            }
        }

        if let VehicleState::ChangingLane(lc) = &mut self.state {
            lc.progress += dt * self.attribs.lane_change_rate;
            if lc.is_complete() {
                let lc = *lc;
                event = event.or(self.finish_lane_change(lc, lanes));
            }
        }

        self.update_coords(lanes, dt);
        event
    }

    /// Whether the cooldown allows a planned lane change to start.
    fn may_change_lanes(&self) -> bool {
        self.attribs.lane_changing && self.since_lane_change >= self.attribs.lane_change_cooldown
    }

    /// The next lane on the path to be entered.
    fn next_lane(&self) -> Option<LaneId> {
        self.path.get(self.path_index).copied()
    }

    /// Handles the vehicle reaching the end of its current lane.
    fn end_of_lane(&mut self, lanes: &LaneGraph) -> Option<VehicleEvent> {
        let overflow = self.t - 1.0;

        if self.next_lane().is_none() && self.reroute_pending {
            if !self.route(lanes) {
                self.t = 1.0;
                return None;
            }
            debug!("Vehicle {:?} found a new route to {:?}", self.id, self.target);
        }

        let Some(next) = self.next_lane() else {
            self.t = 1.0;
            self.state = VehicleState::PathExhausted;
            self.path.clear();
            self.path_index = 0;
            if self.target.is_none() || self.arrival_reported {
                return None;
            }
            self.arrival_reported = true;
            return Some(VehicleEvent::TargetReached {
                vehicle: self.id,
                lane: self.lane,
            });
        };

        if lanes.get(next).map(|lane| lane.stop_signal()).unwrap_or(false) {
            self.t = 1.0;
            return None;
        }

        if lanes.is_closed(next) {
            self.t = 1.0;
            debug!("Vehicle {:?} rerouting around closed lane {:?}", self.id, next);
            if self.route(lanes) {
                return None;
            }
            self.reroute_pending = true;
            return self.no_route(lanes);
        }

        if lanes.is_lateral(self.lane, next) {
            self.t = 1.0;
            self.begin_lane_change(next, LaneChangeKind::Planned);
            return None;
        }

        self.lane = next;
        self.path_index += 1;
        self.t = overflow;
        None
    }

    fn begin_lane_change(&mut self, destination: LaneId, kind: LaneChangeKind) {
        self.state = VehicleState::ChangingLane(LaneChange::new(self.lane, destination, kind));
    }

    fn finish_lane_change(&mut self, lc: LaneChange, lanes: &LaneGraph) -> Option<VehicleEvent> {
        self.lane = lc.destination;
        self.state = VehicleState::FollowingLane;
        self.since_lane_change = 0.0;
        match lc.kind {
            LaneChangeKind::Planned => {
                self.path_index += 1;
                None
            }
            LaneChangeKind::Reroute => self.replan(lanes),
        }
    }

    /// Recomputes the path to the target, reporting a failure.
    fn replan(&mut self, lanes: &LaneGraph) -> Option<VehicleEvent> {
        if self.target.is_none() {
            self.path.clear();
            self.path_index = 0;
            return None;
        }
        if self.route(lanes) {
            None
        } else {
            self.no_route(lanes)
        }
    }

    /// Recomputes the path from the current lane to the target.
    /// Returns `false`, leaving the path empty, if there is no route.
    fn route(&mut self, lanes: &LaneGraph) -> bool {
        let path = self
            .target
            .map(|target| find_path(lanes, self.lane, target))
            .unwrap_or_default();
        if path.is_empty() {
            self.path.clear();
            self.path_index = 0;
            false
        } else {
            self.path = path;
            self.path_index = 1;
            self.reroute_pending = false;
            true
        }
    }

    fn no_route(&self, lanes: &LaneGraph) -> Option<VehicleEvent> {
        let to = self.target?;
        let name = |id: LaneId| lanes.get(id).map(|lane| lane.name()).unwrap_or("<missing>");
        warn!(
            "Vehicle {:?} could not find a path from {} to {}",
            self.id,
            name(self.lane),
            name(to)
        );
        Some(VehicleEvent::NoRoute {
            vehicle: self.id,
            from: self.lane,
            to,
        })
    }

    /// Updates the vehicle's world coordinates and heading.
    fn update_coords(&mut self, lanes: &LaneGraph, dt: f64) {
        let sample = match &self.state {
            VehicleState::ChangingLane(lc) => lc.sample(lanes, self.t),
            _ => lanes.get(self.lane).map(|lane| lane.curve().sample(self.t)),
        };
        if let Some(sample) = sample {
            self.world_pos = sample.pos;
            self.world_dir = smooth_heading(
                self.world_dir,
                sample.dir,
                self.attribs.rotation_speed,
                dt,
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::test::series;
    use crate::lane::LaneAttributes;
    use crate::math::Point2d;
    use slotmap::KeyData;

    fn vehicle(lanes: &LaneGraph, lane: LaneId) -> Vehicle {
        let id = VehicleId::from(KeyData::from_ffi(1));
        Vehicle::new(id, &VehicleAttributes::default(), lane, lanes)
    }

    fn run(vehicle: &mut Vehicle, lanes: &LaneGraph, steps: usize) -> Vec<VehicleEvent> {
        (0..steps)
            .filter_map(|_| vehicle.step(0.1, lanes, &NoAvoidance))
            .collect()
    }

    /// Two parallel lanes, `a` and `a2`, with `a2` leading on to `b2`.
    fn two_lanes() -> (LaneGraph, [LaneId; 3]) {
        let mut lanes = LaneGraph::new();
        let straight = |name, y: f64, x: f64| {
            LaneAttributes::straight(name, Point2d::new(x, y), Point2d::new(x + 100.0, y), 10.0)
        };
        let a = lanes.add_lane(&straight("a", 0.0, 0.0));
        let a2 = lanes.add_lane(&straight("a2", 4.0, 0.0));
        let b2 = lanes.add_lane(&straight("b2", 4.0, 100.0));
        lanes.set_neighbours(a, None, Some(a2));
        lanes.set_neighbours(a2, Some(a), None);
        lanes.connect(a2, b2);
        (lanes, [a, a2, b2])
    }

    #[test]
    fn planned_lane_change_starts_part_way() {
        let (lanes, [a, a2, b2]) = two_lanes();
        let mut veh = vehicle(&lanes, a);
        veh.set_lane_change_timer(1.0);
        assert_eq!(veh.set_target(b2, &lanes), None);
        assert_eq!(veh.path(), &[a, a2, b2]);

        let mut started_at = None;
        for _ in 0..40 {
            veh.step(0.1, &lanes, &NoAvoidance);
            if started_at.is_none() && veh.is_changing_lanes() {
                started_at = Some(veh.param());
            }
        }

        let started_at = started_at.expect("lane change never started");
        assert!(started_at > 0.2 && started_at < 0.25);
        assert_eq!(veh.lane_id(), a2);
        assert_eq!(veh.state(), VehicleState::FollowingLane);
        assert_eq!(veh.remaining_path(), &[b2]);
        assert!((veh.position().y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn lane_change_waits_for_cooldown() {
        let (lanes, [a, _, b2]) = two_lanes();
        let mut veh = vehicle(&lanes, a);
        veh.set_lane_change_timer(-2.0);
        veh.set_target(b2, &lanes);

        run(&mut veh, &lanes, 25);
        assert!(!veh.is_changing_lanes());
        run(&mut veh, &lanes, 8);
        assert!(veh.is_changing_lanes());
    }

    #[test]
    fn stop_signal_holds_at_end_of_lane() {
        let (mut lanes, ids) = series(2);
        lanes.set_stop_signal(ids[1], true);
        let mut veh = vehicle(&lanes, ids[0]);
        veh.set_target(ids[1], &lanes);

        assert!(run(&mut veh, &lanes, 150).is_empty());
        assert_eq!(veh.lane_id(), ids[0]);
        assert_eq!(veh.param(), 1.0);
        assert_eq!(veh.remaining_path(), &[ids[1]]);

        lanes.set_stop_signal(ids[1], false);
        veh.step(0.1, &lanes, &NoAvoidance);
        assert_eq!(veh.lane_id(), ids[1]);
        assert!(veh.param() < 0.02);
    }

    #[test]
    fn target_reached_fires_once() {
        let (lanes, ids) = series(1);
        let mut veh = vehicle(&lanes, ids[0]);
        veh.set_target(ids[0], &lanes);

        let events = run(&mut veh, &lanes, 300);
        assert_eq!(
            events,
            vec![VehicleEvent::TargetReached {
                vehicle: veh.id(),
                lane: ids[0]
            }]
        );
        assert!(veh.is_idle());
        assert_eq!(veh.param(), 1.0);
    }

    #[test]
    fn unreachable_target_reports_end_of_lane() {
        let (lanes, ids) = series(2);
        let mut veh = vehicle(&lanes, ids[1]);
        let event = veh.set_target(ids[0], &lanes);
        assert!(matches!(event, Some(VehicleEvent::NoRoute { .. })));

        assert_eq!(
            run(&mut veh, &lanes, 300),
            vec![VehicleEvent::TargetReached {
                vehicle: veh.id(),
                lane: ids[1]
            }]
        );
        assert!(veh.is_idle());
        assert_eq!(veh.lane_id(), ids[1]);

        // Retargeting wakes the vehicle up
        assert_eq!(veh.set_target(ids[1], &lanes), None);
        assert!(!veh.is_idle());
        assert_eq!(run(&mut veh, &lanes, 1).len(), 1);
    }

    #[test]
    fn failed_retarget_when_idle_reports_again() {
        let (lanes, ids) = series(2);
        let mut veh = vehicle(&lanes, ids[1]);
        veh.set_target(ids[1], &lanes);
        assert_eq!(run(&mut veh, &lanes, 150).len(), 1);
        assert!(veh.is_idle());

        assert!(matches!(
            veh.set_target(ids[0], &lanes),
            Some(VehicleEvent::NoRoute { .. })
        ));
        assert_eq!(
            run(&mut veh, &lanes, 3),
            vec![VehicleEvent::TargetReached {
                vehicle: veh.id(),
                lane: ids[1]
            }]
        );
        assert!(veh.is_idle());
    }

    #[test]
    fn vehicle_without_target_stops_silently() {
        let (lanes, ids) = series(1);
        let mut veh = vehicle(&lanes, ids[0]);
        assert!(run(&mut veh, &lanes, 150).is_empty());
        assert!(veh.is_idle());
    }

    #[test]
    fn merge_replans_from_new_lane() {
        let (mut lanes, [a, a2, b2]) = two_lanes();
        let mut veh = vehicle(&lanes, a);
        // Keep the planned lane change from starting on its own
        veh.set_lane_change_timer(-100.0);
        veh.set_target(b2, &lanes);
        run(&mut veh, &lanes, 10);

        assert!(!veh.merge_into(b2, &lanes));
        lanes.set_closed(a2, true);
        assert!(!veh.merge_into(a2, &lanes));
        lanes.set_closed(a2, false);

        assert!(veh.merge_into(a2, &lanes));
        assert!(matches!(
            veh.state(),
            VehicleState::ChangingLane(LaneChange {
                kind: LaneChangeKind::Reroute,
                ..
            })
        ));
        assert!(!veh.merge_into(a2, &lanes));

        let mut steps = 0;
        while veh.is_changing_lanes() {
            veh.step(0.1, &lanes, &NoAvoidance);
            steps += 1;
            assert!(steps < 20, "merge never completed");
        }
        assert_eq!(veh.lane_id(), a2);
        assert_eq!(veh.path(), &[a2, b2]);
        assert_eq!(veh.remaining_path(), &[b2]);
        assert_eq!(veh.since_lane_change, 0.0);
    }

    #[test]
    fn retarget_during_lane_change_replans_from_destination() {
        let (mut lanes, [a, a2, b2]) = two_lanes();
        let c = lanes.add_lane(&LaneAttributes::straight(
            "c",
            Point2d::new(200.0, 4.0),
            Point2d::new(300.0, 4.0),
            10.0,
        ));
        lanes.connect(b2, c);

        let mut veh = vehicle(&lanes, a);
        veh.set_lane_change_timer(1.0);
        veh.set_target(b2, &lanes);
        while !veh.is_changing_lanes() {
            veh.step(0.1, &lanes, &NoAvoidance);
        }
        veh.set_target(c, &lanes);
        run(&mut veh, &lanes, 6);

        assert_eq!(veh.lane_id(), a2);
        assert_eq!(veh.path(), &[a2, b2, c]);
        assert_eq!(veh.remaining_path(), &[b2, c]);
    }

    #[test]
    fn heading_turns_gradually() {
        let mut lanes = LaneGraph::new();
        let a = lanes.add_lane(&LaneAttributes::straight(
            "east",
            Point2d::new(0.0, 0.0),
            Point2d::new(100.0, 0.0),
            10.0,
        ));
        let b = lanes.add_lane(&LaneAttributes::straight(
            "north",
            Point2d::new(100.0, 0.0),
            Point2d::new(100.0, 100.0),
            10.0,
        ));
        lanes.connect(a, b);
        let mut veh = vehicle(&lanes, a);
        veh.set_target(b, &lanes);

        while veh.lane_id() == a {
            veh.step(0.1, &lanes, &NoAvoidance);
        }
        let dir = veh.direction();
        assert!(dir.x > 0.0 && dir.y > 0.0);

        run(&mut veh, &lanes, 50);
        assert!((veh.direction().y - 1.0).abs() < 1e-6);
    }
}
