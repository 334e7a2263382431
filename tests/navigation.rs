//! Tests of vehicles navigating a chain of lanes.

use traffic_response::{
    math::Point2d, LaneAttributes, LaneId, Simulation, VehicleAttributes, VehicleEvent,
};

/// Adds `names.len()` straight 100 m lanes laid end to end, each connected to the next.
fn series(sim: &mut Simulation, names: &[&str]) -> Vec<LaneId> {
    let lanes = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let x = 100.0 * i as f64;
            sim.add_lane(&LaneAttributes::straight(
                name,
                Point2d::new(x, 0.0),
                Point2d::new(x + 100.0, 0.0),
                10.0,
            ))
        })
        .collect::<Vec<_>>();
    for pair in lanes.windows(2) {
        sim.add_lane_connection(pair[0], pair[1]);
    }
    lanes
}

fn count_arrivals(events: &[VehicleEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, VehicleEvent::TargetReached { .. }))
        .count()
}

/// Test that a vehicle's position increases monotonically.
#[test]
fn vehicle_drives_forward() {
    let mut sim = Simulation::with_seed(0);
    let lane = sim.add_lane(&LaneAttributes::straight(
        "long",
        Point2d::new(0.0, 0.0),
        Point2d::new(200.0, 0.0),
        16.66,
    ));
    let veh = sim.add_vehicle(&VehicleAttributes::default(), lane);

    let mut pos = sim.get_vehicle(veh).unwrap().position().x;
    for _ in 0..100 {
        sim.step(0.1);
        let next_pos = sim.get_vehicle(veh).unwrap().position().x;
        assert!(next_pos > pos);
        pos = next_pos;
    }
}

#[test]
fn vehicle_reaches_target_once() {
    let mut sim = Simulation::with_seed(0);
    let lanes = series(&mut sim, &["A", "B", "C"]);
    let veh = sim.add_vehicle(&VehicleAttributes::default(), lanes[0]);
    assert!(sim.set_vehicle_target(veh, lanes[2]).is_none());
    assert_eq!(sim.get_vehicle(veh).unwrap().path(), lanes.as_slice());

    let mut arrivals = 0;
    for _ in 0..400 {
        sim.step(0.1);
        let events = sim.take_events();
        arrivals += count_arrivals(&events);
    }

    let vehicle = sim.get_vehicle(veh).unwrap();
    assert_eq!(vehicle.lane_id(), lanes[2]);
    assert!(vehicle.is_idle());
    assert_eq!(arrivals, 1);
}

#[test]
fn vehicle_waits_for_closed_lane_to_reopen() {
    let mut sim = Simulation::with_seed(0);
    let lanes = series(&mut sim, &["A", "B", "C"]);
    let veh = sim.add_vehicle(&VehicleAttributes::default(), lanes[0]);
    sim.set_vehicle_target(veh, lanes[2]);
    sim.set_lane_closed(lanes[1], true);

    let mut no_routes = 0;
    for _ in 0..150 {
        sim.step(0.1);
        no_routes += sim
            .take_events()
            .iter()
            .filter(|e| matches!(e, VehicleEvent::NoRoute { .. }))
            .count();
    }
    let vehicle = sim.get_vehicle(veh).unwrap();
    assert_eq!(vehicle.lane_id(), lanes[0]);
    assert_eq!(vehicle.param(), 1.0);
    assert!(vehicle.is_awaiting_reroute());
    assert_eq!(no_routes, 1);

    sim.set_lane_closed(lanes[1], false);
    sim.step(0.1);
    let vehicle = sim.get_vehicle(veh).unwrap();
    assert_eq!(vehicle.path(), lanes.as_slice());
    assert_eq!(vehicle.lane_id(), lanes[1]);
    assert!(!vehicle.is_awaiting_reroute());

    for _ in 0..300 {
        sim.step(0.1);
    }
    assert_eq!(sim.get_vehicle(veh).unwrap().lane_id(), lanes[2]);
}

#[test]
fn vehicle_changes_lanes_to_reach_target() {
    let mut sim = Simulation::with_seed(0);
    let a = sim.add_lane(&LaneAttributes::straight(
        "left",
        Point2d::new(0.0, 4.0),
        Point2d::new(100.0, 4.0),
        10.0,
    ));
    let b = sim.add_lane(&LaneAttributes::straight(
        "right",
        Point2d::new(0.0, 0.0),
        Point2d::new(100.0, 0.0),
        10.0,
    ));
    let exit = sim.add_lane(&LaneAttributes::straight(
        "exit",
        Point2d::new(100.0, 0.0),
        Point2d::new(200.0, 0.0),
        10.0,
    ));
    sim.add_lane_connection(b, exit);
    sim.set_lane_neighbours(a, None, Some(b));
    sim.set_lane_neighbours(b, Some(a), None);

    let veh = sim.add_vehicle(&VehicleAttributes::default(), a);
    sim.set_vehicle_target(veh, exit);
    assert_eq!(sim.get_vehicle(veh).unwrap().path(), &[a, b, exit]);

    let mut changed = false;
    for _ in 0..300 {
        sim.step(0.1);
        changed |= sim.get_vehicle(veh).unwrap().is_changing_lanes();
    }
    assert!(changed);
    let vehicle = sim.get_vehicle(veh).unwrap();
    assert_eq!(vehicle.lane_id(), exit);
    assert!(vehicle.is_idle());
}
