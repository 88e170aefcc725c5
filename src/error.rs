use crate::NodeId;
use thiserror::Error;

/// Fatal simulation errors. Per-message failures (unreachable destination,
/// routing loop) are recorded in the message outcome instead, so a single
/// bad message never aborts the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("invalid topology edge {u} <-> {v}: cost {cost} is not a positive value")]
    InvalidTopologyEdge { u: NodeId, v: NodeId, cost: i64 },

    #[error("routing did not stabilize within {rounds} rounds")]
    NonConvergence { rounds: u32 },
}
