pub mod algorithms;
pub mod error;
pub mod forwarding;
pub mod network;
pub mod protocol;
pub mod report;
pub mod scenario;
pub mod simulation;

pub type NodeId = u32;
pub type Cost = u32;

/// Sentinel cost for unreachable destinations.
pub const INFINITY: Cost = Cost::MAX;

/// Adds two path costs, absorbing infinity and saturating on overflow.
pub fn cost_add(a: Cost, b: Cost) -> Cost {
    if a == INFINITY || b == INFINITY {
        INFINITY
    } else {
        a.saturating_add(b)
    }
}

pub use error::SimulationError;
pub use forwarding::{Delivery, DeliveryStatus, Message};
pub use network::{ChangeEvent, ChangeSchedule, EdgeChange, Topology};
pub use protocol::{
    DistanceVectorEngine, LinkStateEngine, NodeState, RouteEntry, RoutingEngine, RoutingTable,
};
pub use report::{RunReport, TableSnapshot};
pub use simulation::Simulation;
