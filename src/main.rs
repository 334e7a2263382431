use std::f64::consts::TAU;
use std::time::Instant;

use traffic_response::math::Point2d;
use traffic_response::{
    DispatchConfig, IncidentConfig, LaneAttributes, LaneId, LightTimings, RandomTargets,
    Simulation, TrafficLight, VehicleAttributes,
};

const SIDES: usize = 8;
const NUM_VEHICLES: usize = 24;
const NUM_FRAMES: u32 = 1000;
const DT: f64 = 0.05;

/// Builds a ring road of `SIDES` straight lanes with the given radius.
fn ring(sim: &mut Simulation, name: &str, radius: f64) -> Vec<LaneId> {
    let corner = |i: usize| {
        let angle = TAU * i as f64 / SIDES as f64;
        Point2d::new(radius * angle.cos(), radius * angle.sin())
    };
    let lanes = (0..SIDES)
        .map(|i| {
            sim.add_lane(&LaneAttributes::straight(
                &format!("{} {}", name, i),
                corner(i),
                corner(i + 1),
                13.9,
            ))
        })
        .collect::<Vec<_>>();
    for i in 0..SIDES {
        sim.add_lane_connection(lanes[i], lanes[(i + 1) % SIDES]);
    }
    lanes
}

fn main() {
    env_logger::init();

    let mut sim = Simulation::with_seed(2024);
    let outer = ring(&mut sim, "outer", 104.0);
    let inner = ring(&mut sim, "inner", 100.0);
    for (o, i) in outer.iter().zip(&inner) {
        sim.set_lane_neighbours(*o, Some(*i), None);
        sim.set_lane_neighbours(*i, None, Some(*o));
    }

    let mut light = TrafficLight::new(LightTimings::default());
    light.add_group(&[outer[0], inner[0]]);
    light.add_group(&[outer[SIDES / 2], inner[SIDES / 2]]);
    sim.add_traffic_light(light);

    sim.set_target_assigner(RandomTargets::new(7));
    if let Err(err) = sim.enable_incidents(&IncidentConfig::default()) {
        eprintln!("Running without incidents: {}", err);
    }
    if let Err(err) = sim.enable_dispatch(&DispatchConfig::default()) {
        eprintln!("Running without responders: {}", err);
    }

    let lanes = outer.iter().chain(&inner).copied().collect::<Vec<_>>();
    for n in 0..NUM_VEHICLES {
        let lane = lanes[n % lanes.len()];
        let vehicle = sim.add_vehicle(&VehicleAttributes::default(), lane);
        sim.set_vehicle_target(vehicle, lanes[(n * 5 + 3) % lanes.len()]);
    }

    println!("Simulating...");
    for _ in 0..10 {
        let start = Instant::now();
        for _ in 0..NUM_FRAMES {
            sim.step(DT);
        }
        let frame = start.elapsed() / NUM_FRAMES;
        println!(
            "t = {:.0} s, avg. frame: {:?}, {} incidents ({} active), {} vehicles idle",
            sim.time(),
            frame,
            sim.incident_history().len(),
            sim.active_incidents().count(),
            sim.iter_vehicles().filter(|v| v.is_idle()).count(),
        );
        for unit in sim.responders() {
            let lane = unit
                .standby_lane
                .and_then(|id| sim.get_lane(id))
                .map(|lane| lane.name())
                .unwrap_or("-");
            println!(
                "  responder at ({:.1}, {:.1}) on {}",
                unit.position.x, unit.position.y, lane
            );
        }
    }
}
