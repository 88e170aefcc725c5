use std::collections::BTreeMap;

use log::{debug, info};

use crate::network::Topology;
use crate::protocol::messages::DistanceVector;
use crate::protocol::routing_table::{RouteEntry, RoutingTable};
use crate::protocol::{NodeState, RoutingEngine};
use crate::{cost_add, NodeId, INFINITY};

/// Distance Vector routing over the simulated topology.
///
/// Each round every node recomputes its table from the vectors its neighbors
/// committed in the *previous* round (min cost via any neighbor), then all
/// new vectors are published at once. The one-round delay keeps the exchange
/// synchronous and order-independent.
///
/// Count-to-infinity is contained by a cost ceiling instead of split
/// horizon: any computed cost above `node_count * max_edge_cost` is clamped
/// to infinity and loses its next hop.
pub struct DistanceVectorEngine {
    tables: BTreeMap<NodeId, RoutingTable>,
    vectors: BTreeMap<NodeId, DistanceVector>,
    states: BTreeMap<NodeId, NodeState>,
    converged: bool,
    rounds: u32,
}

impl DistanceVectorEngine {
    pub fn new(topology: &Topology) -> Self {
        let mut engine = Self {
            tables: BTreeMap::new(),
            vectors: BTreeMap::new(),
            states: BTreeMap::new(),
            converged: false,
            rounds: 0,
        };
        for node in topology.nodes() {
            engine.seed_node(node, topology);
        }
        engine
    }

    /// Initial knowledge: a node knows only itself; everything else is
    /// unreachable until neighbor vectors arrive.
    fn seed_node(&mut self, node: NodeId, topology: &Topology) {
        let mut table = RoutingTable::new();
        let mut vector = DistanceVector::new(node);
        for destination in topology.nodes() {
            let entry = if destination == node {
                RouteEntry::to_self(destination)
            } else {
                RouteEntry::unreachable(destination)
            };
            vector.entries.insert(destination, entry.cost);
            table.set_route(entry);
        }
        self.tables.insert(node, table);
        self.vectors.insert(node, vector);
        self.states.insert(node, NodeState::Idle);
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// One node's view for the next round, computed purely from last round's
    /// committed neighbor vectors and the current topology.
    fn compute_node(
        &self,
        topology: &Topology,
        node: NodeId,
        ceiling: u64,
    ) -> (RoutingTable, DistanceVector) {
        let empty = DistanceVector::new(node);
        let mut table = RoutingTable::new();
        let mut vector = DistanceVector::new(node);

        for destination in topology.nodes() {
            let entry = if destination == node {
                RouteEntry::to_self(destination)
            } else {
                let mut best: Option<(u32, NodeId)> = None;
                for (neighbor, link_cost) in topology.neighbors_of(node) {
                    let advertised = self.vectors.get(&neighbor).unwrap_or(&empty);
                    let via = cost_add(link_cost, advertised.cost_to(destination).unwrap_or(INFINITY));
                    if via == INFINITY {
                        continue;
                    }
                    // equal cost resolves to the smallest next-hop id
                    if best.map_or(true, |(cost, hop)| (via, neighbor) < (cost, hop)) {
                        best = Some((via, neighbor));
                    }
                }
                match best {
                    Some((cost, _)) if (cost as u64) > ceiling => {
                        RouteEntry::unreachable(destination)
                    }
                    Some((cost, hop)) => RouteEntry::new(destination, cost, Some(hop)),
                    None => RouteEntry::unreachable(destination),
                }
            };
            vector.entries.insert(destination, entry.cost);
            table.set_route(entry);
        }

        (table, vector)
    }
}

impl RoutingEngine for DistanceVectorEngine {
    fn name(&self) -> &'static str {
        "distance-vector"
    }

    fn topology_changed(&mut self, topology: &Topology) {
        for node in topology.nodes() {
            if !self.vectors.contains_key(&node) {
                self.seed_node(node, topology);
            }
        }
        self.converged = false;
    }

    fn step(&mut self, topology: &Topology) -> bool {
        let ceiling = topology.node_count() as u64 * topology.max_edge_cost() as u64;

        // compute phase: every node reads only last round's committed state
        let mut next: BTreeMap<NodeId, (RoutingTable, DistanceVector)> = BTreeMap::new();
        for node in topology.nodes() {
            next.insert(node, self.compute_node(topology, node, ceiling));
        }

        // publish phase: commit all at once at the round boundary
        let mut any_changed = false;
        for (node, (table, vector)) in next {
            let changed = self.tables.get(&node) != Some(&table);
            if changed {
                debug!("round {}: node {node} updated its vector", self.rounds);
                any_changed = true;
            }
            let state = if changed {
                NodeState::Exchanging
            } else {
                NodeState::Converged
            };
            self.states.insert(node, state);
            self.tables.insert(node, table);
            self.vectors.insert(node, vector);
        }

        self.rounds += 1;
        self.converged = !any_changed;
        if self.converged {
            info!("distance vector converged after {} rounds", self.rounds);
        }
        any_changed
    }

    fn is_converged(&self) -> bool {
        self.converged
    }

    fn tables(&self) -> &BTreeMap<NodeId, RoutingTable> {
        &self.tables
    }

    fn node_states(&self) -> &BTreeMap<NodeId, NodeState> {
        &self.states
    }
}
