//! Transient lane closures caused by randomly occurring incidents.

use crate::error::{check_positive, check_probability, ConfigError};
use crate::graph::LaneGraph;
use crate::math::Point2d;
use crate::util::RepeatingTimer;
use crate::LaneId;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand_distr::{Bernoulli, Distribution, Uniform, WeightedIndex};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The kind of an incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IncidentKind {
    VehicleAccident,
    StuckVehicle,
    StructureFire,
}

impl IncidentKind {
    /// Every kind, in the order of [IncidentConfig::kind_weights].
    pub const ALL: [IncidentKind; 3] = [
        IncidentKind::VehicleAccident,
        IncidentKind::StuckVehicle,
        IncidentKind::StructureFire,
    ];
}

/// A permanent record of an incident.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IncidentRecord {
    /// The simulation time at which the incident started, in s.
    pub time: f64,
    /// The kind of incident.
    pub kind: IncidentKind,
    /// The lane the incident occurred on.
    pub lane: LaneId,
    /// The curve parameter along the lane, from 0 to 1.
    pub position: f64,
}

impl IncidentRecord {
    /// The world space location of the incident.
    pub fn world_point(&self, lanes: &LaneGraph) -> Option<Point2d> {
        lanes.world_point(self.lane, self.position)
    }
}

/// Receives a record of every incident as it starts.
pub trait IncidentSink {
    fn record(&mut self, incident: IncidentRecord);
}

impl IncidentSink for Vec<IncidentRecord> {
    fn record(&mut self, incident: IncidentRecord) {
        self.push(incident);
    }
}

/// The configuration of an [IncidentManager].
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct IncidentConfig {
    /// The time between chances of an incident, in s.
    pub interval: f64,
    /// The probability that an incident starts each interval.
    pub chance: f64,
    /// How long an incident keeps its lane closed, in s.
    pub duration: f64,
    /// The relative likelihood of each kind, in the order of [IncidentKind::ALL].
    pub kind_weights: [f64; 3],
}

impl Default for IncidentConfig {
    fn default() -> Self {
        Self {
            interval: 10.0,
            chance: 0.5,
            duration: 15.0,
            kind_weights: [1.0, 0.0, 0.0],
        }
    }
}

impl IncidentConfig {
    /// Checks the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("interval", self.interval)?;
        check_probability("chance", self.chance)?;
        check_positive("duration", self.duration)?;
        let invalid = self.kind_weights.iter().any(|w| w.is_nan() || *w < 0.0);
        if invalid || self.kind_weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::NoIncidentKinds);
        }
        Ok(())
    }
}

/// A lane closed by an incident.
#[derive(Clone, Copy, Debug)]
struct Closure {
    lane: LaneId,
    /// The time until the lane reopens, in s.
    remaining: f64,
}

/// Periodically starts incidents which close a random open lane for a fixed duration.
#[derive(Clone, Debug)]
pub struct IncidentManager {
    duration: f64,
    timer: RepeatingTimer,
    chance: Bernoulli,
    kinds: WeightedIndex<f64>,
    closures: Vec<Closure>,
    rng: StdRng,
}

impl IncidentManager {
    /// Creates an incident manager for the given network.
    pub fn new(config: &IncidentConfig, lanes: &LaneGraph, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        if lanes.is_empty() {
            return Err(ConfigError::EmptyNetwork);
        }
        let chance = Bernoulli::new(config.chance).map_err(|_| ConfigError::Probability {
            field: "chance",
            value: config.chance,
        })?;
        let kinds =
            WeightedIndex::new(config.kind_weights).map_err(|_| ConfigError::NoIncidentKinds)?;
        Ok(Self {
            duration: config.duration,
            timer: RepeatingTimer::new(config.interval),
            chance,
            kinds,
            closures: vec![],
            rng,
        })
    }

    /// The lanes currently closed by an incident.
    pub fn active_closures(&self) -> impl Iterator<Item = LaneId> + '_ {
        self.closures.iter().map(|c| c.lane)
    }

    /// Whether the lane is closed by an incident.
    pub fn is_active(&self, lane: LaneId) -> bool {
        self.closures.iter().any(|c| c.lane == lane)
    }

    /// Advances by `dt` seconds: reopens expired closures, then possibly starts an incident.
    ///
    /// # Parameters
    /// * `dt` - The time step in seconds
    /// * `time` - The current simulation time, recorded against new incidents
    /// * `lanes` - The network whose lanes are closed and reopened
    /// * `sink` - Receives a record of any new incident
    pub fn step(
        &mut self,
        dt: f64,
        time: f64,
        lanes: &mut LaneGraph,
        sink: &mut dyn IncidentSink,
    ) -> Option<IncidentRecord> {
        for closure in &mut self.closures {
            closure.remaining -= dt;
        }
        let expired = self
            .closures
            .iter()
            .filter(|c| c.remaining <= 0.0)
            .map(|c| c.lane)
            .collect::<SmallVec<[_; 4]>>();
        for lane in expired {
            self.reopen(lane, lanes);
        }

        if self.timer.tick(dt) && self.chance.sample(&mut self.rng) {
            self.start_random_incident(time, lanes, sink)
        } else {
            None
        }
    }

    /// Starts an incident on a random open lane, unless every lane is closed.
    pub fn start_random_incident(
        &mut self,
        time: f64,
        lanes: &mut LaneGraph,
        sink: &mut dyn IncidentSink,
    ) -> Option<IncidentRecord> {
        let closures = &self.closures;
        let lane = lanes
            .iter()
            .filter(|lane| !lane.is_closed() && !closures.iter().any(|c| c.lane == lane.id()))
            .map(|lane| lane.id())
            .choose(&mut self.rng);
        let Some(lane) = lane else {
            debug!("No open lanes available for an incident");
            return None;
        };

        let record = IncidentRecord {
            time,
            kind: IncidentKind::ALL[self.kinds.sample(&mut self.rng)],
            lane,
            position: Uniform::new(0.0, 1.0).sample(&mut self.rng),
        };
        sink.record(record);

        info!("{:?} started on {}", record.kind, lanes[lane].name());
        lanes.set_closed(lane, true);
        self.closures.push(Closure {
            lane,
            remaining: self.duration,
        });
        Some(record)
    }

    /// Clears the incident closing `lane`. Returns `false`, doing nothing,
    /// if no incident is closing it.
    pub fn reopen(&mut self, lane: LaneId, lanes: &mut LaneGraph) -> bool {
        let Some(idx) = self.closures.iter().position(|c| c.lane == lane) else {
            return false;
        };
        self.closures.remove(idx);
        lanes.set_closed(lane, false);
        if let Some(lane) = lanes.get(lane) {
            info!("Incident cleared on {}", lane.name());
        }
        true
    }
}
