use std::collections::VecDeque;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::network::Topology;
use crate::{Cost, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeChange {
    CostUpdate(Cost),
    Remove,
}

/// A scripted topology mutation, applied at the boundary of `round` before
/// that round's engine step runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub round: u32,
    pub u: NodeId,
    pub v: NodeId,
    pub change: EdgeChange,
}

impl ChangeEvent {
    pub fn cost_update(round: u32, u: NodeId, v: NodeId, cost: Cost) -> Self {
        Self {
            round,
            u,
            v,
            change: EdgeChange::CostUpdate(cost),
        }
    }

    pub fn removal(round: u32, u: NodeId, v: NodeId) -> Self {
        Self {
            round,
            u,
            v,
            change: EdgeChange::Remove,
        }
    }

    /// Applies this event to the topology. A cost update creates the edge if
    /// absent; removing a missing edge is tolerated.
    pub fn apply(&self, topology: &mut Topology) -> Result<(), SimulationError> {
        match self.change {
            EdgeChange::CostUpdate(cost) => topology.add_or_update_edge(self.u, self.v, cost),
            EdgeChange::Remove => {
                topology.remove_edge(self.u, self.v);
                Ok(())
            }
        }
    }
}

/// Time-ordered list of change events. Events sharing a round keep their
/// input order.
#[derive(Debug, Clone, Default)]
pub struct ChangeSchedule {
    pending: VecDeque<ChangeEvent>,
}

impl ChangeSchedule {
    pub fn new(mut events: Vec<ChangeEvent>) -> Self {
        events.sort_by_key(|e| e.round);
        Self {
            pending: events.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Applies every event due at or before `round`, returning how many were
    /// applied. The driver calls this once per round boundary, before the
    /// engine step.
    pub fn apply_due(
        &mut self,
        round: u32,
        topology: &mut Topology,
    ) -> Result<usize, SimulationError> {
        let mut applied = 0;
        while let Some(event) = self.pending.pop_front() {
            if event.round > round {
                self.pending.push_front(event);
                break;
            }
            info!(
                "round {round}: applying change {} <-> {} ({:?})",
                event.u, event.v, event.change
            );
            event.apply(topology)?;
            applied += 1;
        }
        Ok(applied)
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_round(&self) -> Option<u32> {
        self.pending.front().map(|e| e.round)
    }

    pub fn last_round(&self) -> Option<u32> {
        self.pending.back().map(|e| e.round)
    }
}
