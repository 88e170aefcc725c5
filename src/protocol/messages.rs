use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Cost, NodeId};

/// A node's advertised destination -> cost mapping, shared with direct
/// neighbors each round and superseded the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceVector {
    pub origin: NodeId,
    pub entries: BTreeMap<NodeId, Cost>,
}

impl DistanceVector {
    pub fn new(origin: NodeId) -> Self {
        Self {
            origin,
            entries: BTreeMap::new(),
        }
    }

    pub fn cost_to(&self, destination: NodeId) -> Option<Cost> {
        self.entries.get(&destination).copied()
    }
}

/// A node's direct-link cost list, stamped with a per-origin sequence number
/// so stale copies can be dropped during flooding. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStateAdvertisement {
    pub origin: NodeId,
    pub sequence: u64,
    pub links: BTreeMap<NodeId, Cost>,
}

impl LinkStateAdvertisement {
    pub fn new(origin: NodeId, sequence: u64, links: BTreeMap<NodeId, Cost>) -> Self {
        Self {
            origin,
            sequence,
            links,
        }
    }

    /// True if this advertisement is fresher than `other` for the same origin.
    pub fn supersedes(&self, other: &LinkStateAdvertisement) -> bool {
        self.origin == other.origin && self.sequence > other.sequence
    }
}
