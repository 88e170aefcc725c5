use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::algorithms::dijkstra::shortest_paths;
use crate::network::Topology;
use crate::protocol::messages::LinkStateAdvertisement;
use crate::protocol::routing_table::{RouteEntry, RoutingTable};
use crate::protocol::{NodeState, RoutingEngine};
use crate::{Cost, NodeId};

/// An LSA travelling over one link, delivered at the next round boundary.
#[derive(Debug, Clone)]
struct Transmission {
    from: NodeId,
    to: NodeId,
    lsa: LinkStateAdvertisement,
}

/// Link State routing over the simulated topology.
///
/// Every node originates an advertisement of its direct link costs and
/// floods it network-wide; receivers keep only the freshest advertisement
/// per origin (by sequence number) and re-flood news to all neighbors except
/// the sender, one round later. A node whose database changed reassembles
/// its global graph view and reruns Dijkstra.
pub struct LinkStateEngine {
    tables: BTreeMap<NodeId, RoutingTable>,
    databases: BTreeMap<NodeId, BTreeMap<NodeId, LinkStateAdvertisement>>,
    sequences: BTreeMap<NodeId, u64>,
    states: BTreeMap<NodeId, NodeState>,
    in_flight: Vec<Transmission>,
    converged: bool,
    rounds: u32,
}

impl LinkStateEngine {
    pub fn new(topology: &Topology) -> Self {
        let mut engine = Self {
            tables: BTreeMap::new(),
            databases: BTreeMap::new(),
            sequences: BTreeMap::new(),
            states: BTreeMap::new(),
            in_flight: Vec::new(),
            converged: false,
            rounds: 0,
        };
        engine.topology_changed(topology);
        engine
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Latest advertisement database of one node, for inspection.
    pub fn database(&self, node: NodeId) -> Option<&BTreeMap<NodeId, LinkStateAdvertisement>> {
        self.databases.get(&node)
    }

    /// Issues a fresh self-advertisement for `node` and queues it toward all
    /// current neighbors.
    fn originate(&mut self, node: NodeId, links: BTreeMap<NodeId, Cost>) {
        let sequence = self.sequences.get(&node).copied().unwrap_or(0) + 1;
        self.sequences.insert(node, sequence);
        let lsa = LinkStateAdvertisement::new(node, sequence, links);
        debug!("node {node} originates LSA seq {sequence}");

        self.databases
            .entry(node)
            .or_default()
            .insert(node, lsa.clone());
        for (&neighbor, _) in &lsa.links {
            self.in_flight.push(Transmission {
                from: node,
                to: neighbor,
                lsa: lsa.clone(),
            });
        }
        self.states.insert(node, NodeState::Exchanging);
    }

    /// Builds a node's view of the network from its advertisement database.
    /// An edge counts only when both endpoints advertise each other, so a
    /// stale advertisement cannot resurrect a withdrawn link.
    fn assemble(database: &BTreeMap<NodeId, LinkStateAdvertisement>) -> BTreeMap<NodeId, BTreeMap<NodeId, Cost>> {
        let mut adjacency: BTreeMap<NodeId, BTreeMap<NodeId, Cost>> = BTreeMap::new();
        for (&origin, lsa) in database {
            for (&neighbor, &cost) in &lsa.links {
                let confirmed = database
                    .get(&neighbor)
                    .map(|peer| peer.links.contains_key(&origin))
                    .unwrap_or(false);
                if confirmed {
                    adjacency.entry(origin).or_default().insert(neighbor, cost);
                }
            }
        }
        adjacency
    }

    fn recompute_table(&mut self, node: NodeId, topology: &Topology) {
        let adjacency = self
            .databases
            .get(&node)
            .map(Self::assemble)
            .unwrap_or_default();
        let paths = shortest_paths(&adjacency, node);

        let mut table = RoutingTable::new();
        for destination in topology.nodes() {
            let entry = if destination == node {
                RouteEntry::to_self(destination)
            } else {
                match paths.get(&destination) {
                    Some(path) => RouteEntry::new(destination, path.cost, path.next_hop),
                    None => RouteEntry::unreachable(destination),
                }
            };
            table.set_route(entry);
        }
        self.tables.insert(node, table);
    }
}

impl RoutingEngine for LinkStateEngine {
    fn name(&self) -> &'static str {
        "link-state"
    }

    /// Re-advertises every node whose own direct links no longer match its
    /// stored self-advertisement. New nodes advertise for the first time.
    fn topology_changed(&mut self, topology: &Topology) {
        let mut dirty = Vec::new();
        for node in topology.nodes() {
            let links: BTreeMap<NodeId, Cost> = topology.neighbors_of(node).collect();
            let current = self
                .databases
                .get(&node)
                .and_then(|db| db.get(&node))
                .map(|lsa| &lsa.links);
            if current != Some(&links) {
                dirty.push((node, links));
            }
        }
        for (node, links) in dirty {
            self.originate(node, links);
            self.recompute_table(node, topology);
            self.converged = false;
        }
    }

    fn step(&mut self, topology: &Topology) -> bool {
        // deliver what was sent last round, then queue the forwards so they
        // travel one link per round
        let deliveries = std::mem::take(&mut self.in_flight);
        let mut forwards = Vec::new();
        let mut updated: BTreeSet<NodeId> = BTreeSet::new();

        for transmission in deliveries {
            let database = self.databases.entry(transmission.to).or_default();
            let fresh = match database.get(&transmission.lsa.origin) {
                Some(stored) => transmission.lsa.supersedes(stored),
                None => true,
            };
            if !fresh {
                continue;
            }
            database.insert(transmission.lsa.origin, transmission.lsa.clone());
            updated.insert(transmission.to);
            for (neighbor, _) in topology.neighbors_of(transmission.to) {
                if neighbor != transmission.from {
                    forwards.push(Transmission {
                        from: transmission.to,
                        to: neighbor,
                        lsa: transmission.lsa.clone(),
                    });
                }
            }
        }

        for &node in &updated {
            self.recompute_table(node, topology);
        }
        for node in topology.nodes() {
            let state = if updated.contains(&node) {
                NodeState::Exchanging
            } else {
                NodeState::Converged
            };
            self.states.insert(node, state);
        }

        self.in_flight = forwards;
        self.rounds += 1;
        let changed = !updated.is_empty() || !self.in_flight.is_empty();
        self.converged = !changed;
        if self.converged {
            info!("link state converged after {} rounds", self.rounds);
        }
        changed
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::INFINITY;

    fn converge(engine: &mut LinkStateEngine, topology: &Topology) -> u32 {
        let mut rounds = 0;
        while engine.step(topology) {
            rounds += 1;
            assert!(rounds < 100, "did not converge");
        }
        rounds
    }

    fn route(engine: &LinkStateEngine, node: NodeId, dest: NodeId) -> (Cost, Option<NodeId>) {
        let entry = engine.tables()[&node].route(dest).expect("entry missing");
        (entry.cost, entry.next_hop)
    }

    #[test]
    fn flooding_fills_every_database() {
        let topology = Topology::from_edges([(1, 2, 1), (2, 3, 1), (3, 4, 1)]).unwrap();
        let mut engine = LinkStateEngine::new(&topology);
        converge(&mut engine, &topology);

        for node in topology.nodes() {
            let database = engine.database(node).expect("database missing");
            assert_eq!(database.len(), 4, "node {node} misses advertisements");
        }
    }

    #[test]
    fn multi_hop_path_beats_expensive_direct_edge() {
        let topology =
            Topology::from_edges([(1, 2, 1), (2, 3, 1), (3, 4, 1), (1, 4, 10)]).unwrap();
        let mut engine = LinkStateEngine::new(&topology);
        converge(&mut engine, &topology);

        assert_eq!(route(&engine, 1, 4), (3, Some(2)));
        assert_eq!(route(&engine, 4, 1), (3, Some(3)));
    }

    #[test]
    fn converged_engine_is_idempotent() {
        let topology =
            Topology::from_edges([(1, 2, 1), (2, 3, 1), (3, 4, 1), (1, 4, 10)]).unwrap();
        let mut engine = LinkStateEngine::new(&topology);
        converge(&mut engine, &topology);

        let before = engine.tables().clone();
        assert!(!engine.step(&topology));
        assert_eq!(engine.tables(), &before);
        assert!(engine.is_converged());
    }

    #[test]
    fn stale_advertisements_are_dropped() {
        let topology = Topology::from_edges([(1, 2, 1), (2, 3, 1)]).unwrap();
        let mut engine = LinkStateEngine::new(&topology);
        converge(&mut engine, &topology);

        let stored = engine.database(3).unwrap().get(&1).unwrap().clone();

        // a copy at the stored sequence with different content must be
        // ignored: the freshness rule drops anything not strictly newer
        let stale = LinkStateAdvertisement::new(1, stored.sequence, BTreeMap::new());
        engine.in_flight.push(Transmission {
            from: 2,
            to: 3,
            lsa: stale,
        });
        assert!(!engine.step(&topology));

        assert_eq!(engine.database(3).unwrap().get(&1), Some(&stored));
    }

    #[test]
    fn equal_cost_routes_pick_the_smallest_next_hop() {
        let topology =
            Topology::from_edges([(1, 2, 1), (1, 3, 1), (2, 4, 1), (3, 4, 1)]).unwrap();
        let mut engine = LinkStateEngine::new(&topology);
        converge(&mut engine, &topology);

        assert_eq!(route(&engine, 1, 4), (2, Some(2)));
        assert_eq!(route(&engine, 4, 1), (2, Some(2)));
    }

    #[test]
    fn severed_component_becomes_unreachable() {
        let mut topology = Topology::from_edges([(1, 2, 1), (2, 3, 1), (3, 4, 1)]).unwrap();
        let mut engine = LinkStateEngine::new(&topology);
        converge(&mut engine, &topology);
        assert_eq!(route(&engine, 1, 4), (3, Some(2)));

        topology.remove_edge(2, 3);
        engine.topology_changed(&topology);
        converge(&mut engine, &topology);

        assert_eq!(route(&engine, 1, 3), (INFINITY, None));
        assert_eq!(route(&engine, 1, 4), (INFINITY, None));
        assert_eq!(route(&engine, 3, 4), (1, Some(4)));
    }

    #[test]
    fn cost_raise_reroutes_over_the_direct_edge() {
        let mut topology =
            Topology::from_edges([(1, 2, 1), (2, 3, 1), (3, 4, 1), (1, 4, 10)]).unwrap();
        let mut engine = LinkStateEngine::new(&topology);
        converge(&mut engine, &topology);

        topology.add_or_update_edge(2, 3, 100).unwrap();
        engine.topology_changed(&topology);
        let rounds = converge(&mut engine, &topology);

        assert_eq!(route(&engine, 1, 4), (10, Some(4)));
        assert_eq!(route(&engine, 2, 4), (11, Some(1)));
        // news only has to cross the network once
        assert!(rounds as u32 <= topology.node_count() as u32 + 1);
    }

    #[test]
    fn node_states_settle_after_flooding() {
        let topology = Topology::from_edges([(1, 2, 1), (2, 3, 1)]).unwrap();
        let mut engine = LinkStateEngine::new(&topology);
        assert!(engine
            .node_states()
            .values()
            .any(|s| *s == NodeState::Exchanging));

        converge(&mut engine, &topology);
        assert!(engine
            .node_states()
            .values()
            .all(|s| *s == NodeState::Converged));
    }

    #[test]
    fn isolated_node_knows_only_itself() {
        let mut topology = Topology::from_edges([(1, 2, 1), (1, 3, 1), (2, 3, 4)]).unwrap();
        let mut engine = LinkStateEngine::new(&topology);
        converge(&mut engine, &topology);

        topology.remove_edge(1, 2);
        topology.remove_edge(1, 3);
        engine.topology_changed(&topology);
        converge(&mut engine, &topology);

        assert_eq!(route(&engine, 1, 2), (INFINITY, None));
        assert_eq!(route(&engine, 1, 3), (INFINITY, None));
        assert_eq!(route(&engine, 2, 3), (4, Some(3)));
        assert_eq!(route(&engine, 2, 1), (INFINITY, None));
    }
}
