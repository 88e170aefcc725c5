use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Cost, NodeId, INFINITY};

/// One destination's forwarding decision. An unreachable destination has
/// infinite cost and no next hop; the self-route has cost 0 and no next hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub destination: NodeId,
    pub cost: Cost,
    pub next_hop: Option<NodeId>,
}

impl RouteEntry {
    pub fn new(destination: NodeId, cost: Cost, next_hop: Option<NodeId>) -> Self {
        // infinite cost and a next hop cannot coexist
        let next_hop = if cost == INFINITY { None } else { next_hop };
        Self {
            destination,
            cost,
            next_hop,
        }
    }

    pub fn to_self(destination: NodeId) -> Self {
        Self::new(destination, 0, None)
    }

    pub fn unreachable(destination: NodeId) -> Self {
        Self::new(destination, INFINITY, None)
    }

    pub fn is_reachable(&self) -> bool {
        self.cost != INFINITY
    }
}

/// A node's routing table, keyed by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    entries: BTreeMap<NodeId, RouteEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_route(&mut self, entry: RouteEntry) {
        self.entries.insert(entry.destination, entry);
    }

    pub fn route(&self, destination: NodeId) -> Option<&RouteEntry> {
        self.entries.get(&destination)
    }

    pub fn next_hop(&self, destination: NodeId) -> Option<NodeId> {
        self.entries.get(&destination).and_then(|e| e.next_hop)
    }

    pub fn cost_to(&self, destination: NodeId) -> Cost {
        self.entries
            .get(&destination)
            .map(|e| e.cost)
            .unwrap_or(INFINITY)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_cost_drops_the_next_hop() {
        let entry = RouteEntry::new(4, INFINITY, Some(2));
        assert_eq!(entry.next_hop, None);
        assert!(!entry.is_reachable());
    }

    #[test]
    fn lookups_on_missing_destinations_are_unreachable() {
        let table = RoutingTable::new();
        assert_eq!(table.cost_to(9), INFINITY);
        assert_eq!(table.next_hop(9), None);
    }

    #[test]
    fn set_route_replaces_the_previous_entry() {
        let mut table = RoutingTable::new();
        table.set_route(RouteEntry::new(2, 5, Some(3)));
        table.set_route(RouteEntry::new(2, 1, Some(2)));
        assert_eq!(table.cost_to(2), 1);
        assert_eq!(table.next_hop(2), Some(2));
        assert_eq!(table.len(), 1);
    }
}
