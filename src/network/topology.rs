use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::SimulationError;
use crate::{Cost, NodeId};

/// The simulated network: a set of nodes joined by weighted undirected edges.
///
/// Nodes are remembered once seen, even after their last edge is removed, so
/// a partitioned destination still shows up in every routing table as
/// unreachable. Ordered containers keep every iteration deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    nodes: BTreeSet<NodeId>,
    adjacency: BTreeMap<NodeId, BTreeMap<NodeId, Cost>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<I>(edges: I) -> Result<Self, SimulationError>
    where
        I: IntoIterator<Item = (NodeId, NodeId, Cost)>,
    {
        let mut topology = Self::new();
        for (u, v, cost) in edges {
            topology.add_or_update_edge(u, v, cost)?;
        }
        Ok(topology)
    }

    /// Inserts the edge or updates its cost, symmetrically in both
    /// directions. A cost below 1 or a self-loop is rejected.
    pub fn add_or_update_edge(
        &mut self,
        u: NodeId,
        v: NodeId,
        cost: Cost,
    ) -> Result<(), SimulationError> {
        if cost == 0 || u == v {
            return Err(SimulationError::InvalidTopologyEdge {
                u,
                v,
                cost: cost as i64,
            });
        }

        self.nodes.insert(u);
        self.nodes.insert(v);
        self.adjacency.entry(u).or_default().insert(v, cost);
        self.adjacency.entry(v).or_default().insert(u, cost);
        debug!("edge {u} <-> {v} set to cost {cost}");
        Ok(())
    }

    /// Removes the edge in both directions. Removing a missing edge is a
    /// no-op, not an error.
    pub fn remove_edge(&mut self, u: NodeId, v: NodeId) {
        let mut removed = false;
        if let Some(neighbors) = self.adjacency.get_mut(&u) {
            removed |= neighbors.remove(&v).is_some();
        }
        if let Some(neighbors) = self.adjacency.get_mut(&v) {
            removed |= neighbors.remove(&u).is_some();
        }
        if removed {
            debug!("edge {u} <-> {v} removed");
        }
    }

    pub fn edge_cost(&self, u: NodeId, v: NodeId) -> Option<Cost> {
        self.adjacency.get(&u).and_then(|n| n.get(&v)).copied()
    }

    /// Direct neighbors of a node with link costs, in ascending id order.
    pub fn neighbors_of(&self, node: NodeId) -> impl Iterator<Item = (NodeId, Cost)> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|n| n.iter().map(|(&id, &cost)| (id, cost)))
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|n| n.len()).sum::<usize>() / 2
    }

    /// Largest edge cost currently in the topology, 0 when there are no edges.
    pub fn max_edge_cost(&self) -> Cost {
        self.adjacency
            .values()
            .flat_map(|n| n.values().copied())
            .max()
            .unwrap_or(0)
    }

    /// Read-only adjacency view for shortest-path computations.
    pub fn adjacency(&self) -> &BTreeMap<NodeId, BTreeMap<NodeId, Cost>> {
        &self.adjacency
    }
}
