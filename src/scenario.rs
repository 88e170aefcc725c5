use anyhow::{bail, Context, Result};

use crate::error::SimulationError;
use crate::forwarding::Message;
use crate::network::{ChangeEvent, Topology};
use crate::{Cost, NodeId};

/// Legacy change-file cost meaning "remove this edge".
pub const REMOVE_SENTINEL: i64 = -999;

fn numbered_lines(input: &str) -> impl Iterator<Item = (usize, &str)> {
    input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn parse_node(field: &str, number: usize) -> Result<NodeId> {
    field
        .parse()
        .with_context(|| format!("line {number}: invalid node id {field:?}"))
}

fn edge_cost(u: NodeId, v: NodeId, cost: i64) -> Result<Cost> {
    if cost < 1 || cost > Cost::MAX as i64 {
        bail!(SimulationError::InvalidTopologyEdge { u, v, cost });
    }
    Ok(cost as Cost)
}

/// Topology file: one `u v cost` triple per line.
pub fn parse_topology(input: &str) -> Result<Topology> {
    let mut topology = Topology::new();
    for (number, line) in numbered_lines(input) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[u, v, cost] = fields.as_slice() else {
            bail!("line {number}: expected `node node cost`, got {line:?}");
        };
        let u = parse_node(u, number)?;
        let v = parse_node(v, number)?;
        let cost: i64 = cost
            .parse()
            .with_context(|| format!("line {number}: invalid cost {cost:?}"))?;
        topology.add_or_update_edge(u, v, edge_cost(u, v, cost)?)?;
    }
    Ok(topology)
}

/// Message file: `source destination payload...` per line; the payload is
/// the rest of the line.
pub fn parse_messages(input: &str) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    for (number, line) in numbered_lines(input) {
        let mut fields = line.split_whitespace();
        let (Some(source), Some(destination)) = (fields.next(), fields.next()) else {
            bail!("line {number}: expected `source destination payload`, got {line:?}");
        };
        let source = parse_node(source, number)?;
        let destination = parse_node(destination, number)?;
        let payload = fields.collect::<Vec<_>>().join(" ");
        if payload.is_empty() {
            bail!("line {number}: message without a payload");
        }
        messages.push(Message::new(0, source, destination, payload));
    }
    Ok(messages)
}

/// Change file: `u v cost` per line, `-999` meaning removal. Events keep
/// file order; the nth line becomes the nth change.
pub fn parse_changes(input: &str) -> Result<Vec<ChangeEvent>> {
    let mut events = Vec::new();
    for (number, line) in numbered_lines(input) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[u, v, cost] = fields.as_slice() else {
            bail!("line {number}: expected `node node cost`, got {line:?}");
        };
        let u = parse_node(u, number)?;
        let v = parse_node(v, number)?;
        let cost: i64 = cost
            .parse()
            .with_context(|| format!("line {number}: invalid cost {cost:?}"))?;

        let round = events.len() as u32;
        let event = if cost == REMOVE_SENTINEL {
            ChangeEvent::removal(round, u, v)
        } else {
            ChangeEvent::cost_update(round, u, v, edge_cost(u, v, cost)?)
        };
        events.push(event);
    }
    Ok(events)
}
