use crate::graph::LaneGraph;
use crate::vehicle::Vehicle;
use crate::LaneId;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;

/// Chooses a new target lane for a vehicle which has reached its previous target.
pub trait TargetAssigner {
    /// Returns the vehicle's next target, or `None` to leave it idle.
    fn next_target(&mut self, vehicle: &Vehicle, lanes: &LaneGraph) -> Option<LaneId>;
}

/// Sends vehicles to a random lane other than the one they are on.
#[derive(Clone, Debug)]
pub struct RandomTargets {
    rng: StdRng,
}

impl RandomTargets {
    /// Creates an assigner with a reproducible sequence of targets.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates an assigner seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl TargetAssigner for RandomTargets {
    fn next_target(&mut self, vehicle: &Vehicle, lanes: &LaneGraph) -> Option<LaneId> {
        let current = vehicle.lane_id();
        lanes
            .lane_ids()
            .filter(|id| *id != current)
            .choose(&mut self.rng)
            .or_else(|| lanes.lane_ids().next())
    }
}
