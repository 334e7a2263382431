//! Prepositioning of responder units near incident hotspots.

mod kmeans;

pub use kmeans::{kmeans, kmeans_from, KMeansResult};

use crate::error::{check_positive, ConfigError};
use crate::graph::LaneGraph;
use crate::incident::IncidentRecord;
use crate::math::Point2d;
use crate::util::RepeatingTimer;
use crate::LaneId;
use cgmath::MetricSpace;
use itertools::Itertools;
use log::{debug, warn};
use rand::rngs::StdRng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The configuration of a [Dispatcher].
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DispatchConfig {
    /// The number of responder units.
    pub unit_count: usize,
    /// The time between recomputations of the standby positions, in s.
    pub interval: f64,
    /// The maximum number of k-means refinement iterations.
    pub max_iterations: usize,
    /// The centroid movement below which k-means is considered converged, in m.
    pub convergence_threshold: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            unit_count: 3,
            interval: 10.0,
            max_iterations: 100,
            convergence_threshold: 0.01,
        }
    }
}

impl DispatchConfig {
    /// Checks the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("unit_count", self.unit_count as f64)?;
        check_positive("interval", self.interval)?;
        check_positive("max_iterations", self.max_iterations as f64)?;
        Ok(())
    }
}

/// A responder unit waiting at a standby position.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResponderUnit {
    /// The world space position of the unit.
    pub position: Point2d,
    /// The lane the unit is stationed at, if it has been assigned one yet.
    pub standby_lane: Option<LaneId>,
}

/// Periodically moves a fixed pool of responder units to the hotspots of past incidents.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    config: DispatchConfig,
    timer: RepeatingTimer,
    units: Vec<ResponderUnit>,
    rng: StdRng,
}

impl Dispatcher {
    /// Creates a dispatcher for the given network, with every unit at the origin.
    pub fn new(config: &DispatchConfig, lanes: &LaneGraph, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        if lanes.is_empty() {
            return Err(ConfigError::EmptyNetwork);
        }
        Ok(Self {
            config: *config,
            timer: RepeatingTimer::new(config.interval),
            units: vec![
                ResponderUnit {
                    position: Point2d::new(0.0, 0.0),
                    standby_lane: None,
                };
                config.unit_count
            ],
            rng,
        })
    }

    /// The responder units.
    pub fn units(&self) -> &[ResponderUnit] {
        &self.units
    }

    /// Advances by `dt` seconds, repositioning the units whenever the interval elapses.
    /// Returns `true` if the units were repositioned.
    pub fn step(&mut self, dt: f64, lanes: &LaneGraph, history: &[IncidentRecord]) -> bool {
        if !self.timer.tick(dt) {
            return false;
        }
        self.reposition(lanes, history);
        true
    }

    /// Moves each unit to the midpoint of its computed standby lane.
    ///
    /// When fewer standby lanes than units are found, the remaining units stay put.
    pub fn reposition(&mut self, lanes: &LaneGraph, history: &[IncidentRecord]) {
        let standby = self.compute_standby(lanes, history);
        if standby.len() < self.units.len() {
            debug!(
                "Only {} standby lanes for {} units",
                standby.len(),
                self.units.len()
            );
        }
        for (unit, lane) in self.units.iter_mut().zip(standby) {
            if let Some(lane_ref) = lanes.get(lane) {
                unit.position = lane_ref.midpoint();
                unit.standby_lane = Some(lane);
            }
        }
    }

    /// Computes the lane each unit should stand by at.
    ///
    /// With fewer incidents than units, the lanes are spread evenly over the network.
    /// Otherwise they are the lanes nearest the centres of a k-means clustering
    /// of the incident locations.
    pub fn compute_standby(&mut self, lanes: &LaneGraph, history: &[IncidentRecord]) -> Vec<LaneId> {
        let k = self.config.unit_count;
        let points = history
            .iter()
            .filter_map(|incident| incident.world_point(lanes))
            .collect::<Vec<_>>();

        if points.len() < k {
            return evenly_spaced_lanes(lanes, k);
        }

        let result = kmeans(
            &points,
            k,
            self.config.max_iterations,
            self.config.convergence_threshold,
            &mut self.rng,
        );
        result
            .centroids
            .into_iter()
            .filter_map(|centroid| closest_lane(lanes, centroid))
            .collect()
    }
}

/// Picks `count` lanes spread evenly through the network's lane order.
/// Fractional indices round half to even. Lanes picked more than once are only returned once.
pub fn evenly_spaced_lanes(lanes: &LaneGraph, count: usize) -> Vec<LaneId> {
    if lanes.is_empty() || count == 0 {
        return vec![];
    }
    let ids = lanes.lane_ids().collect::<Vec<_>>();
    let step = ids.len() as f64 / count as f64;
    (0..count)
        .map(|i| ((i as f64 * step).round_ties_even() as usize).min(ids.len() - 1))
        .unique()
        .map(|idx| ids[idx])
        .collect()
}

/// The lane whose midpoint is closest to `point`. The earliest lane wins ties.
pub fn closest_lane(lanes: &LaneGraph, point: Point2d) -> Option<LaneId> {
    let closest = lanes
        .iter()
        .map(|lane| (lane.id(), lane.midpoint().distance2(point)))
        .fold(None, |best: Option<(LaneId, f64)>, (id, dist)| match best {
            Some((_, best_dist)) if best_dist <= dist => best,
            _ => Some((id, dist)),
        })
        .map(|(id, _)| id);
    if closest.is_none() {
        warn!("No lanes to station a responder on");
    }
    closest
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::test::series;
    use crate::incident::IncidentKind;
    use crate::lane::LaneAttributes;
    use rand::SeedableRng;

    fn dispatcher(config: &DispatchConfig, lanes: &LaneGraph) -> Dispatcher {
        Dispatcher::new(config, lanes, StdRng::seed_from_u64(3)).unwrap()
    }

    fn incident(lane: LaneId, position: f64) -> IncidentRecord {
        IncidentRecord {
            time: 0.0,
            kind: IncidentKind::VehicleAccident,
            lane,
            position,
        }
    }

    #[test]
    fn evenly_spaced_without_history() {
        let (lanes, ids) = series(9);
        let mut dispatcher = dispatcher(&Default::default(), &lanes);
        assert_eq!(
            dispatcher.compute_standby(&lanes, &[]),
            vec![ids[0], ids[3], ids[6]]
        );
    }

    #[test]
    fn evenly_spaced_deduplicates() {
        let (lanes, ids) = series(2);
        // Indices 0, 0.4, 0.8, 1.2, 1.6 round to 0, 0, 1, 1, 2 (clamped to 1)
        assert_eq!(evenly_spaced_lanes(&lanes, 5), vec![ids[0], ids[1]]);
        assert!(evenly_spaced_lanes(&lanes, 0).is_empty());
        assert!(evenly_spaced_lanes(&LaneGraph::new(), 3).is_empty());
    }

    #[test]
    fn evenly_spaced_rounds_half_to_even() {
        let (lanes, ids) = series(10);
        // Indices 0, 2.5, 5, 7.5
        assert_eq!(
            evenly_spaced_lanes(&lanes, 4),
            vec![ids[0], ids[2], ids[5], ids[8]]
        );
    }

    #[test]
    fn too_few_incidents_fall_back() {
        let (lanes, ids) = series(9);
        let mut dispatcher = dispatcher(&Default::default(), &lanes);
        let history = [incident(ids[8], 0.5), incident(ids[8], 0.6)];
        assert_eq!(
            dispatcher.compute_standby(&lanes, &history),
            vec![ids[0], ids[3], ids[6]]
        );
    }

    #[test]
    fn units_gather_at_hotspots() {
        let (lanes, ids) = series(9);
        let config = DispatchConfig {
            unit_count: 2,
            interval: 5.0,
            ..Default::default()
        };
        let mut dispatcher = dispatcher(&config, &lanes);
        let history = (0..10)
            .flat_map(|i| {
                let position = 0.45 + 0.01 * i as f64;
                [incident(ids[1], position), incident(ids[7], position)]
            })
            .collect::<Vec<_>>();

        assert!(!dispatcher.step(4.0, &lanes, &history));
        assert!(dispatcher.units().iter().all(|u| u.standby_lane.is_none()));
        assert!(dispatcher.step(1.0, &lanes, &history));

        let mut stationed = dispatcher
            .units()
            .iter()
            .filter_map(|u| u.standby_lane)
            .collect::<Vec<_>>();
        stationed.sort();
        let mut expected = vec![ids[1], ids[7]];
        expected.sort();
        assert_eq!(stationed, expected);
        for unit in dispatcher.units() {
            let lane = unit.standby_lane.unwrap();
            assert_eq!(unit.position, lanes[lane].midpoint());
        }
    }

    #[test]
    fn closest_lane_prefers_first() {
        let (mut lanes, ids) = series(3);
        assert_eq!(closest_lane(&lanes, Point2d::new(260.0, -5.0)), Some(ids[2]));

        // A second lane with the same geometry as lane 1 ties with it
        let twin = lanes.add_lane(&LaneAttributes::straight(
            "twin",
            Point2d::new(100.0, 0.0),
            Point2d::new(200.0, 0.0),
            10.0,
        ));
        assert_eq!(lanes[twin].midpoint(), lanes[ids[1]].midpoint());
        assert_eq!(closest_lane(&lanes, Point2d::new(150.0, 3.0)), Some(ids[1]));
        assert_eq!(closest_lane(&LaneGraph::new(), Point2d::new(0.0, 0.0)), None);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let (lanes, _) = series(1);
        let config = DispatchConfig {
            unit_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            Dispatcher::new(&config, &lanes, StdRng::seed_from_u64(0)),
            Err(ConfigError::NonPositive { field: "unit_count", .. })
        ));
        assert_eq!(
            Dispatcher::new(&Default::default(), &LaneGraph::new(), StdRng::seed_from_u64(0)).err(),
            Some(ConfigError::EmptyNetwork)
        );
    }
}
