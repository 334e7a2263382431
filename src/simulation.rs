use crate::dispatch::{DispatchConfig, Dispatcher, ResponderUnit};
use crate::error::ConfigError;
use crate::graph::LaneGraph;
use crate::incident::{IncidentConfig, IncidentManager, IncidentRecord};
use crate::lane::{Lane, LaneAttributes};
use crate::light::TrafficLight;
use crate::targets::TargetAssigner;
use crate::vehicle::{LocalAvoidance, NoAvoidance, Vehicle, VehicleAttributes, VehicleEvent};
use crate::{LaneId, TrafficLightId, VehicleId, VehicleSet};
use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;
use smallvec::SmallVec;

/// A traffic simulation.
pub struct Simulation {
    /// The road network.
    lanes: LaneGraph,
    /// The traffic lights.
    lights: SlotMap<TrafficLightId, TrafficLight>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// Starts and clears incidents, if enabled.
    incidents: Option<IncidentManager>,
    /// Every incident that has occurred, oldest first.
    history: Vec<IncidentRecord>,
    /// Positions the responder units, if enabled.
    dispatcher: Option<Dispatcher>,
    /// Gives vehicles a new target when they reach their current one.
    assigner: Option<Box<dyn TargetAssigner>>,
    /// Limits vehicle speeds to avoid obstacles.
    avoidance: Box<dyn LocalAvoidance>,
    /// The vehicle events raised during the last step.
    events: Vec<VehicleEvent>,
    /// The source of randomness for every subsystem.
    rng: StdRng,
    /// The current frame of simulation.
    frame: usize,
    /// The simulated time in s.
    time: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Simulation {
    /// Creates a new simulation.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a new simulation whose random behaviour is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            lanes: LaneGraph::new(),
            lights: SlotMap::with_key(),
            vehicles: VehicleSet::with_key(),
            incidents: None,
            history: vec![],
            dispatcher: None,
            assigner: None,
            avoidance: Box::new(NoAvoidance),
            events: vec![],
            rng,
            frame: 0,
            time: 0.0,
        }
    }

    /// Adds a lane to the network.
    pub fn add_lane(&mut self, attributes: &LaneAttributes) -> LaneId {
        self.lanes.add_lane(attributes)
    }

    /// Specifies that the end of the `from` lane connects to the start of the `to` lane.
    pub fn add_lane_connection(&mut self, from: LaneId, to: LaneId) {
        self.lanes.connect(from, to);
    }

    /// Sets the lanes either side of `lane` which vehicles may change into.
    pub fn set_lane_neighbours(&mut self, lane: LaneId, left: Option<LaneId>, right: Option<LaneId>) {
        self.lanes.set_neighbours(lane, left, right);
    }

    /// Closes or reopens a lane.
    pub fn set_lane_closed(&mut self, lane: LaneId, closed: bool) {
        self.lanes.set_closed(lane, closed);
    }

    /// Activates or clears the stop signal at the start of a lane.
    pub fn set_lane_stop_signal(&mut self, lane: LaneId, active: bool) {
        self.lanes.set_stop_signal(lane, active);
    }

    /// Adds a traffic light to the simulation.
    pub fn add_traffic_light(&mut self, light: TrafficLight) -> TrafficLightId {
        let id = self.lights.insert(light);
        self.apply_light(id);
        id
    }

    /// Adds a vehicle at the start of `lane`.
    pub fn add_vehicle(&mut self, attributes: &VehicleAttributes, lane: LaneId) -> VehicleId {
        let cooldown = attributes.lane_change_cooldown;
        let stagger = if cooldown > 0.0 {
            self.rng.gen_range(0.0..cooldown)
        } else {
            0.0
        };
        self.vehicles.insert_with_key(|id| {
            let mut vehicle = Vehicle::new(id, attributes, lane, &self.lanes);
            vehicle.set_lane_change_timer(stagger);
            vehicle
        })
    }

    /// Removes a vehicle from the simulation.
    pub fn remove_vehicle(&mut self, id: VehicleId) {
        self.vehicles.remove(id);
    }

    /// Sets the lane a vehicle should drive to and plans its path.
    /// Returns a [VehicleEvent::NoRoute] if the lane can't be reached.
    pub fn set_vehicle_target(&mut self, vehicle_id: VehicleId, lane: LaneId) -> Option<VehicleEvent> {
        self.vehicles
            .get_mut(vehicle_id)?
            .set_target(lane, &self.lanes)
    }

    /// Causes a vehicle to merge into a neighbouring lane, after which it plans a
    /// new path to its target. Returns `false` if the merge isn't possible.
    pub fn do_lane_change(&mut self, vehicle_id: VehicleId, lane: LaneId) -> bool {
        match self.vehicles.get_mut(vehicle_id) {
            Some(vehicle) => vehicle.merge_into(lane, &self.lanes),
            None => false,
        }
    }

    /// Sets the assigner which gives vehicles a new target when they reach their current one.
    pub fn set_target_assigner(&mut self, assigner: impl TargetAssigner + 'static) {
        self.assigner = Some(Box::new(assigner));
    }

    /// Sets how vehicles slow down for obstacles ahead.
    pub fn set_local_avoidance(&mut self, avoidance: impl LocalAvoidance + 'static) {
        self.avoidance = Box::new(avoidance);
    }

    /// Starts generating random incidents.
    ///
    /// If the configuration is invalid the error is logged and returned,
    /// and the simulation continues without incidents.
    pub fn enable_incidents(&mut self, config: &IncidentConfig) -> Result<(), ConfigError> {
        let rng = StdRng::seed_from_u64(self.rng.gen());
        match IncidentManager::new(config, &self.lanes, rng) {
            Ok(manager) => {
                info!("Incidents enabled: {:?}", config);
                self.incidents = Some(manager);
                Ok(())
            }
            Err(err) => {
                error!("Incidents disabled: {}", err);
                self.incidents = None;
                Err(err)
            }
        }
    }

    /// Starts repositioning responder units around incident hotspots.
    ///
    /// If the configuration is invalid the error is logged and returned,
    /// and the simulation continues without responders.
    pub fn enable_dispatch(&mut self, config: &DispatchConfig) -> Result<(), ConfigError> {
        let rng = StdRng::seed_from_u64(self.rng.gen());
        match Dispatcher::new(config, &self.lanes, rng) {
            Ok(dispatcher) => {
                info!("Dispatch enabled: {:?}", config);
                self.dispatcher = Some(dispatcher);
                Ok(())
            }
            Err(err) => {
                error!("Dispatch disabled: {}", err);
                self.dispatcher = None;
                Err(err)
            }
        }
    }

    /// Starts an incident on a random open lane immediately.
    /// Returns `None` if incidents aren't enabled or every lane is closed.
    pub fn start_random_incident(&mut self) -> Option<IncidentRecord> {
        self.incidents
            .as_mut()?
            .start_random_incident(self.time, &mut self.lanes, &mut self.history)
    }

    /// Clears the incident closing `lane`, if there is one.
    pub fn clear_incident(&mut self, lane: LaneId) -> bool {
        match &mut self.incidents {
            Some(incidents) => incidents.reopen(lane, &mut self.lanes),
            None => false,
        }
    }

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.events.clear();
        self.frame += 1;
        self.time += dt;
        self.update_lights(dt);
        self.update_incidents(dt);
        self.update_vehicles(dt);
        self.assign_targets();
        self.update_dispatch(dt);
    }

    /// Takes the vehicle events raised during the last step.
    pub fn take_events(&mut self) -> Vec<VehicleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Gets the simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The road network.
    pub fn lanes(&self) -> &LaneGraph {
        &self.lanes
    }

    /// Returns an iterator over all the lanes in the simulation.
    pub fn iter_lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.iter()
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Returns an iterator over all the traffic lights in the simulation.
    pub fn iter_lights(&self) -> impl Iterator<Item = (TrafficLightId, &TrafficLight)> {
        self.lights.iter()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Gets a reference to the lane with the given ID.
    pub fn get_lane(&self, lane_id: LaneId) -> Option<&Lane> {
        self.lanes.get(lane_id)
    }

    /// Every incident that has occurred, oldest first.
    pub fn incident_history(&self) -> &[IncidentRecord] {
        &self.history
    }

    /// The lanes currently closed by an incident.
    pub fn active_incidents(&self) -> impl Iterator<Item = LaneId> + '_ {
        self.incidents.iter().flat_map(|m| m.active_closures())
    }

    /// The responder units, or an empty slice if dispatch isn't enabled.
    pub fn responders(&self) -> &[ResponderUnit] {
        self.dispatcher.as_ref().map(|d| d.units()).unwrap_or_default()
    }

    /// Writes a light's stop signals into the lanes it controls.
    fn apply_light(&mut self, id: TrafficLightId) {
        if let Some(light) = self.lights.get(id) {
            for (lane, stop) in light.get_states() {
                self.lanes.set_stop_signal(lane, stop);
            }
        }
    }

    /// Updates the traffic lights.
    fn update_lights(&mut self, dt: f64) {
        for (_, light) in &mut self.lights {
            light.step(dt);
            for (lane, stop) in light.get_states() {
                self.lanes.set_stop_signal(lane, stop);
            }
        }
    }

    /// Expires old incidents and possibly starts a new one.
    fn update_incidents(&mut self, dt: f64) {
        if let Some(incidents) = &mut self.incidents {
            incidents.step(dt, self.time, &mut self.lanes, &mut self.history);
        }
    }

    /// Moves the vehicles, collecting their events.
    fn update_vehicles(&mut self, dt: f64) {
        for (_, vehicle) in &mut self.vehicles {
            if let Some(event) = vehicle.step(dt, &self.lanes, self.avoidance.as_ref()) {
                self.events.push(event);
            }
        }
    }

    /// Gives a new target to each vehicle which reached its target this step.
    fn assign_targets(&mut self) {
        let Some(assigner) = self.assigner.as_mut() else {
            return;
        };
        let arrived = self
            .events
            .iter()
            .filter_map(|event| match event {
                VehicleEvent::TargetReached { vehicle, .. } => Some(*vehicle),
                _ => None,
            })
            .collect::<SmallVec<[_; 8]>>();

        for vehicle_id in arrived {
            let Some(vehicle) = self.vehicles.get_mut(vehicle_id) else {
                continue;
            };
            if let Some(target) = assigner.next_target(vehicle, &self.lanes) {
                if let Some(event) = vehicle.set_target(target, &self.lanes) {
                    self.events.push(event);
                }
            }
        }
    }

    /// Repositions the responder units when due.
    fn update_dispatch(&mut self, dt: f64) {
        if let Some(dispatcher) = &mut self.dispatcher {
            dispatcher.step(dt, &self.lanes, &self.history);
        }
    }
}
