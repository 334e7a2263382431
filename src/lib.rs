pub use cgmath;
pub use dispatch::{DispatchConfig, Dispatcher, KMeansResult, ResponderUnit};
pub use error::ConfigError;
pub use graph::LaneGraph;
pub use incident::{IncidentConfig, IncidentKind, IncidentManager, IncidentRecord, IncidentSink};
pub use lane::{Lane, LaneAttributes, LaneCurve, LaneSample};
pub use light::{LightState, LightTimings, TrafficLight};
pub use router::find_path;
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use targets::{RandomTargets, TargetAssigner};
pub use util::{Interval, RepeatingTimer};
pub use vehicle::{
    LaneChange, LaneChangeKind, LocalAvoidance, NoAvoidance, Vehicle, VehicleAttributes,
    VehicleEvent, VehicleState,
};

pub mod dispatch;
mod error;
mod graph;
mod incident;
mod lane;
mod light;
pub mod math;
mod router;
mod simulation;
mod targets;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Lane].
    pub struct LaneId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a [TrafficLight].
    pub struct TrafficLightId;
}

type LaneSet = SlotMap<LaneId, Lane>;
type VehicleSet = SlotMap<VehicleId, Vehicle>;
