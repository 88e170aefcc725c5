use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::{cost_add, Cost, NodeId, INFINITY};

/// Best route to one destination from a fixed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortestPath {
    pub cost: Cost,
    pub next_hop: Option<NodeId>,
}

#[derive(Debug, PartialEq, Eq)]
struct State {
    cost: Cost,
    node: NodeId,
    next_hop: Option<NodeId>,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for a min-heap; equal costs explore the smaller
        // next-hop id first.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.next_hop.cmp(&self.next_hop))
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-source shortest paths over a non-negative weighted adjacency view.
///
/// Relaxation compares `(cost, next_hop)` lexicographically, so among
/// equal-cost paths the one leaving the source through the smallest
/// neighbor id wins. Unreachable nodes are absent from the result.
pub fn shortest_paths(
    adjacency: &BTreeMap<NodeId, BTreeMap<NodeId, Cost>>,
    source: NodeId,
) -> BTreeMap<NodeId, ShortestPath> {
    let mut best: BTreeMap<NodeId, ShortestPath> = BTreeMap::new();
    let mut heap = BinaryHeap::new();

    best.insert(
        source,
        ShortestPath {
            cost: 0,
            next_hop: None,
        },
    );
    heap.push(State {
        cost: 0,
        node: source,
        next_hop: None,
    });

    while let Some(State {
        cost,
        node,
        next_hop,
    }) = heap.pop()
    {
        // skip entries made obsolete by a later improvement
        if let Some(current) = best.get(&node) {
            if (cost, next_hop) > (current.cost, current.next_hop) {
                continue;
            }
        }

        let Some(neighbors) = adjacency.get(&node) else {
            continue;
        };
        for (&neighbor, &link_cost) in neighbors {
            let new_cost = cost_add(cost, link_cost);
            if new_cost == INFINITY {
                continue;
            }
            let hop = if node == source {
                Some(neighbor)
            } else {
                next_hop
            };
            let improved = match best.get(&neighbor) {
                Some(current) => (new_cost, hop) < (current.cost, current.next_hop),
                None => true,
            };
            if improved {
                best.insert(
                    neighbor,
                    ShortestPath {
                        cost: new_cost,
                        next_hop: hop,
                    },
                );
                heap.push(State {
                    cost: new_cost,
                    node: neighbor,
                    next_hop: hop,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency(edges: &[(NodeId, NodeId, Cost)]) -> BTreeMap<NodeId, BTreeMap<NodeId, Cost>> {
        let mut adjacency: BTreeMap<NodeId, BTreeMap<NodeId, Cost>> = BTreeMap::new();
        for &(u, v, cost) in edges {
            adjacency.entry(u).or_default().insert(v, cost);
            adjacency.entry(v).or_default().insert(u, cost);
        }
        adjacency
    }

    #[test]
    fn finds_cheapest_path_over_a_line() {
        let adj = adjacency(&[(1, 2, 2), (2, 3, 3)]);
        let paths = shortest_paths(&adj, 1);

        assert_eq!(paths[&1].cost, 0);
        assert_eq!(paths[&1].next_hop, None);
        assert_eq!(paths[&2], ShortestPath { cost: 2, next_hop: Some(2) });
        assert_eq!(paths[&3], ShortestPath { cost: 5, next_hop: Some(2) });
    }

    #[test]
    fn cheap_detour_beats_expensive_direct_edge() {
        let adj = adjacency(&[(1, 2, 1), (2, 3, 1), (3, 4, 1), (1, 4, 10)]);
        let paths = shortest_paths(&adj, 1);

        assert_eq!(paths[&4], ShortestPath { cost: 3, next_hop: Some(2) });
    }

    #[test]
    fn equal_cost_paths_take_the_smallest_next_hop() {
        let adj = adjacency(&[(1, 2, 1), (1, 3, 1), (2, 4, 1), (3, 4, 1)]);
        let paths = shortest_paths(&adj, 1);

        assert_eq!(paths[&4], ShortestPath { cost: 2, next_hop: Some(2) });
    }

    #[test]
    fn unreachable_nodes_are_absent() {
        let adj = adjacency(&[(1, 2, 1), (3, 4, 1)]);
        let paths = shortest_paths(&adj, 1);

        assert!(paths.contains_key(&2));
        assert!(!paths.contains_key(&3));
        assert!(!paths.contains_key(&4));
    }

    #[test]
    fn source_without_edges_reaches_only_itself() {
        let adj = BTreeMap::new();
        let paths = shortest_paths(&adj, 7);

        assert_eq!(paths.len(), 1);
        assert_eq!(paths[&7].cost, 0);
    }
}
