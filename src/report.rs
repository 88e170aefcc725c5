use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::forwarding::{Delivery, DeliveryStatus};
use crate::protocol::RoutingTable;
use crate::NodeId;

/// All routing tables as they stood at one convergence point.
#[derive(Debug, Clone, Serialize)]
pub struct TableSnapshot {
    pub round: u32,
    pub tables: BTreeMap<NodeId, RoutingTable>,
}

/// Everything a scripted run produced, for the report emitter.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub rounds: u32,
    pub snapshots: Vec<TableSnapshot>,
    pub deliveries: Vec<Delivery>,
}

/// Renders routing tables in the legacy text format: one `dest next-hop
/// cost` row per destination in ascending order, the node's own row last,
/// a blank line between nodes.
pub fn render_tables(tables: &BTreeMap<NodeId, RoutingTable>) -> String {
    let mut out = String::new();
    for (&node, table) in tables {
        for entry in table.iter() {
            if entry.destination == node {
                continue;
            }
            match entry.next_hop {
                Some(hop) => {
                    writeln!(out, "{} {} {}", entry.destination, hop, entry.cost).unwrap()
                }
                None => writeln!(out, "{} - infinite", entry.destination).unwrap(),
            }
        }
        writeln!(out, "{node} {node} 0").unwrap();
        writeln!(out).unwrap();
    }
    out
}

/// One `from .. to .. cost .. hops .. message ..` line per message, with the
/// full hop path on success.
pub fn render_delivery(delivery: &Delivery) -> String {
    let message = &delivery.message;
    match delivery.status {
        DeliveryStatus::Delivered => {
            let hops = delivery
                .path
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "from {} to {} cost {} hops {} message {}",
                message.source, message.destination, delivery.cost, hops, message.payload
            )
        }
        DeliveryStatus::Unreachable => format!(
            "from {} to {} cost infinite hops unreachable message {}",
            message.source, message.destination, message.payload
        ),
        DeliveryStatus::RoutingLoop => format!(
            "from {} to {} cost infinite hops loop message {}",
            message.source, message.destination, message.payload
        ),
    }
}

pub fn render_run(report: &RunReport) -> String {
    let mut out = String::new();
    for snapshot in &report.snapshots {
        out.push_str(&render_tables(&snapshot.tables));
    }
    for delivery in &report.deliveries {
        out.push_str(&render_delivery(delivery));
        out.push('\n');
    }
    out
}

/// Interleaved rendering for epoch-style replays, where every convergence
/// point routed the same `per_epoch` messages: tables, then that epoch's
/// message lines, repeated.
pub fn render_epochs(report: &RunReport, per_epoch: usize) -> String {
    let mut out = String::new();
    for (i, snapshot) in report.snapshots.iter().enumerate() {
        out.push_str(&render_tables(&snapshot.tables));
        for delivery in report.deliveries.iter().skip(i * per_epoch).take(per_epoch) {
            out.push_str(&render_delivery(delivery));
            out.push('\n');
        }
    }
    out
}

pub fn to_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarding::Message;
    use crate::protocol::RouteEntry;
    use crate::INFINITY;

    #[test]
    fn tables_render_in_the_legacy_format() {
        let mut table = RoutingTable::new();
        table.set_route(RouteEntry::to_self(1));
        table.set_route(RouteEntry::new(2, 1, Some(2)));
        table.set_route(RouteEntry::new(3, 2, Some(2)));
        table.set_route(RouteEntry::unreachable(4));
        let mut tables = BTreeMap::new();
        tables.insert(1, table);

        let rendered = render_tables(&tables);
        assert_eq!(rendered, "2 2 1\n3 2 2\n4 - infinite\n1 1 0\n\n");
    }

    #[test]
    fn delivery_lines_match_the_legacy_format() {
        let delivered = Delivery {
            message: Message::new(0, 1, 3, "here is a message"),
            status: DeliveryStatus::Delivered,
            cost: 2,
            path: vec![1, 2, 3],
        };
        assert_eq!(
            render_delivery(&delivered),
            "from 1 to 3 cost 2 hops 1 2 3 message here is a message"
        );

        let unreachable = Delivery {
            message: Message::new(0, 1, 9, "lost"),
            status: DeliveryStatus::Unreachable,
            cost: INFINITY,
            path: vec![1],
        };
        assert_eq!(
            render_delivery(&unreachable),
            "from 1 to 9 cost infinite hops unreachable message lost"
        );
    }

    #[test]
    fn zero_hop_delivery_prints_the_single_node() {
        let delivery = Delivery {
            message: Message::new(0, 5, 5, "self"),
            status: DeliveryStatus::Delivered,
            cost: 0,
            path: vec![5],
        };
        assert_eq!(
            render_delivery(&delivery),
            "from 5 to 5 cost 0 hops 5 message self"
        );
    }
}
