use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::protocol::RoutingTable;
use crate::{Cost, NodeId, INFINITY};

/// A scripted data message, injected into the simulation at `round`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub round: u32,
    pub source: NodeId,
    pub destination: NodeId,
    pub payload: String,
}

impl Message {
    pub fn new(round: u32, source: NodeId, destination: NodeId, payload: impl Into<String>) -> Self {
        Self {
            round,
            source,
            destination,
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryStatus {
    Delivered,
    /// Some table along the way had no next hop for the destination.
    Unreachable,
    /// The hop ceiling was exceeded; tables are transiently inconsistent.
    RoutingLoop,
}

/// The recorded outcome of forwarding one message. `path` holds the nodes
/// visited in order, ending at the destination on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub message: Message,
    pub status: DeliveryStatus,
    pub cost: Cost,
    pub path: Vec<NodeId>,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}

/// Forwards a message hop by hop through the current routing tables.
///
/// Each visited node's own table decides the next hop, exactly as a real
/// forwarding plane would. The walk stops after `node_count` hops; going
/// past that means the tables contain a loop (possible mid-convergence),
/// which is recorded per message rather than failing the run.
pub fn route(
    message: &Message,
    tables: &BTreeMap<NodeId, RoutingTable>,
    node_count: usize,
) -> Delivery {
    let mut path = vec![message.source];

    if message.source == message.destination {
        return Delivery {
            message: message.clone(),
            status: DeliveryStatus::Delivered,
            cost: 0,
            path,
        };
    }

    let cost = tables
        .get(&message.source)
        .map(|t| t.cost_to(message.destination))
        .unwrap_or(INFINITY);

    let mut current = message.source;
    loop {
        let next = tables
            .get(&current)
            .and_then(|t| t.next_hop(message.destination));
        let Some(next) = next else {
            debug!(
                "message {} -> {} undeliverable at node {current}",
                message.source, message.destination
            );
            return Delivery {
                message: message.clone(),
                status: DeliveryStatus::Unreachable,
                cost: INFINITY,
                path,
            };
        };

        path.push(next);
        if next == message.destination {
            return Delivery {
                message: message.clone(),
                status: DeliveryStatus::Delivered,
                cost,
                path,
            };
        }
        if path.len() > node_count {
            warn!(
                "message {} -> {} exceeded {node_count} hops, assuming a loop",
                message.source, message.destination
            );
            return Delivery {
                message: message.clone(),
                status: DeliveryStatus::RoutingLoop,
                cost: INFINITY,
                path,
            };
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RouteEntry;

    fn table(entries: &[(NodeId, Cost, Option<NodeId>)]) -> RoutingTable {
        let mut table = RoutingTable::new();
        for &(dest, cost, hop) in entries {
            table.set_route(RouteEntry::new(dest, cost, hop));
        }
        table
    }

    #[test]
    fn follows_next_hops_to_the_destination() {
        let mut tables = BTreeMap::new();
        tables.insert(1, table(&[(3, 2, Some(2))]));
        tables.insert(2, table(&[(3, 1, Some(3))]));
        tables.insert(3, table(&[]));

        let delivery = route(&Message::new(0, 1, 3, "hi"), &tables, 3);
        assert_eq!(delivery.status, DeliveryStatus::Delivered);
        assert_eq!(delivery.path, vec![1, 2, 3]);
        assert_eq!(delivery.cost, 2);
    }

    #[test]
    fn source_equals_destination_is_a_zero_hop_delivery() {
        let tables = BTreeMap::new();
        let delivery = route(&Message::new(0, 5, 5, "self"), &tables, 1);

        assert_eq!(delivery.status, DeliveryStatus::Delivered);
        assert_eq!(delivery.cost, 0);
        assert_eq!(delivery.path, vec![5]);
    }

    #[test]
    fn missing_next_hop_is_unreachable() {
        let mut tables = BTreeMap::new();
        tables.insert(1, table(&[(3, INFINITY, None)]));

        let delivery = route(&Message::new(0, 1, 3, "lost"), &tables, 3);
        assert_eq!(delivery.status, DeliveryStatus::Unreachable);
        assert_eq!(delivery.cost, INFINITY);
        assert_eq!(delivery.path, vec![1]);
    }

    #[test]
    fn failure_partway_records_the_partial_path() {
        let mut tables = BTreeMap::new();
        tables.insert(1, table(&[(4, 3, Some(2))]));
        tables.insert(2, table(&[]));

        let delivery = route(&Message::new(0, 1, 4, "drop"), &tables, 4);
        assert_eq!(delivery.status, DeliveryStatus::Unreachable);
        assert_eq!(delivery.path, vec![1, 2]);
    }

    #[test]
    fn inconsistent_tables_are_reported_as_a_loop() {
        // 1 and 2 each believe the other is the way to 9
        let mut tables = BTreeMap::new();
        tables.insert(1, table(&[(9, 5, Some(2))]));
        tables.insert(2, table(&[(9, 5, Some(1))]));

        let delivery = route(&Message::new(0, 1, 9, "spin"), &tables, 3);
        assert_eq!(delivery.status, DeliveryStatus::RoutingLoop);
        assert_eq!(delivery.cost, INFINITY);
    }
}
