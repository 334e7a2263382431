use crate::LaneId;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A set of coordinated traffic lights which give each of its groups
/// of lanes a green phase in turn.
#[derive(Clone, Debug)]
pub struct TrafficLight {
    /// The groups of lanes, in the order they turn green.
    groups: Vec<Vec<LaneId>>,
    /// The phase durations.
    timings: LightTimings,
    /// The group which is currently green or amber.
    current: usize,
    /// The state of the current group.
    state: LightState,
    /// The time since the current state was entered, in s.
    since: f64,
}

/// How long each phase of a [TrafficLight] lasts.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct LightTimings {
    /// The duration of the green phase in s.
    pub green: f64,
    /// The duration of the amber phase in s.
    pub amber: f64,
}

impl Default for LightTimings {
    fn default() -> Self {
        Self {
            green: 10.0,
            amber: 2.0,
        }
    }
}

/// The state of a group of traffic lights.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum LightState {
    Red,
    Amber,
    Green,
}

impl LightState {
    /// Whether vehicles must stop. Amber still lets vehicles through.
    pub fn is_stop(self) -> bool {
        self == LightState::Red
    }
}

impl TrafficLight {
    /// Creates a traffic light with no groups.
    pub fn new(timings: LightTimings) -> Self {
        Self {
            groups: vec![],
            timings,
            current: 0,
            state: LightState::Green,
            since: 0.0,
        }
    }

    /// Adds a group of lanes which share a phase, returning its index.
    /// The first group added starts green; every other group starts red.
    pub fn add_group(&mut self, lanes: &[LaneId]) -> usize {
        self.groups.push(lanes.to_vec());
        self.groups.len() - 1
    }

    /// The number of groups.
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// The state of the given group.
    pub fn group_state(&self, group: usize) -> LightState {
        if group == self.current {
            self.state
        } else {
            LightState::Red
        }
    }

    /// Advances the light timing by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        if self.groups.is_empty() {
            return;
        }
        self.since += dt;
        match self.state {
            LightState::Green if self.since >= self.timings.green => {
                self.state = LightState::Amber;
                self.since = 0.0;
            }
            LightState::Amber if self.since >= self.timings.amber => {
                self.current = (self.current + 1) % self.groups.len();
                self.state = LightState::Green;
                self.since = 0.0;
            }
            _ => {}
        }
    }

    /// Gets whether each controlled lane must be stopped at.
    pub fn get_states(&self) -> impl Iterator<Item = (LaneId, bool)> + '_ {
        self.groups.iter().enumerate().flat_map(move |(idx, lanes)| {
            let stop = self.group_state(idx).is_stop();
            lanes.iter().map(move |lane| (*lane, stop))
        })
    }
}
