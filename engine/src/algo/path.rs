//! Search results.

use crate::datastr::graph::*;
use crate::weighting::Weighting;

/// Result of a point to point query.
///
/// A path which was not found has no nodes, zero distance and time and infinite weight.
/// A path from a node to itself without edge constraints is found and empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    found: bool,
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
    distance: f64,
    time: u64,
    weight: Weight,
    visited_nodes: usize,
}

impl Path {
    pub fn not_found(visited_nodes: usize) -> Self {
        Path {
            found: false,
            nodes: Vec::new(),
            edges: Vec::new(),
            distance: 0.0,
            time: 0,
            weight: INFINITY,
            visited_nodes,
        }
    }

    /// The path from a node to itself.
    pub fn trivial(visited_nodes: usize) -> Self {
        Path {
            found: true,
            weight: 0.0,
            ..Self::not_found(visited_nodes)
        }
    }

    /// Builds a found path from consecutive edge states, accumulating distance, time and weight.
    /// With `edge_based` turn costs between consecutive edges are added.
    /// Panics if the states do not form a chain or a weight is negative, NaN or infinite.
    pub fn from_edges<W: Weighting + ?Sized>(weighting: &W, edge_based: bool, start: NodeId, edges: &[EdgeState], visited_nodes: usize) -> Self {
        let mut path = Path {
            found: true,
            nodes: Vec::with_capacity(edges.len() + 1),
            edges: Vec::with_capacity(edges.len()),
            distance: 0.0,
            time: 0,
            weight: 0.0,
            visited_nodes,
        };
        path.nodes.push(start);

        let mut prev: Option<&EdgeState> = None;
        for state in edges {
            assert_eq!(path.nodes.last().copied(), Some(state.base), "path edges do not form a chain");
            if let (Some(prev), true) = (prev, edge_based) {
                let turn = weighting.turn_weight(prev.edge, state.base, state.edge);
                assert!(turn >= 0.0 && turn.is_finite(), "invalid turn weight {} on path", turn);
                path.weight += turn;
                path.time += weighting.turn_millis(prev.edge, state.base, state.edge);
            }
            let weight = weighting.edge_weight(state, false);
            assert!(weight >= 0.0 && weight.is_finite(), "invalid edge weight {} on path", weight);
            path.weight += weight;
            path.distance += state.distance;
            path.time += weighting.edge_millis(state, false);
            path.nodes.push(state.adj);
            path.edges.push(state.edge);
            prev = Some(state);
        }
        path
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Meters
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Milliseconds
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// States settled by the search which produced this path.
    pub fn visited_nodes(&self) -> usize {
        self.visited_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighting::*;
    use std::sync::Arc;

    fn state(edge: EdgeId, base: NodeId, adj: NodeId, distance: f64) -> EdgeState {
        EdgeState {
            edge,
            base,
            adj,
            reverse: false,
            distance,
            flags: EdgeFlags::both_directions(36.0),
            orig_edge: edge,
        }
    }

    #[test]
    fn accumulates_turn_costs_only_edge_based() {
        let mut storage = TurnCostStorage::new();
        storage.set(1, 0, 1, 2.5);
        let weighting = FastestWeighting::new(100.0).with_turn_costs(TurnCostProvider::new(Arc::new(storage)));
        let edges = [state(0, 0, 1, 100.0), state(1, 1, 2, 50.0)];

        let path = Path::from_edges(&weighting, true, 0, &edges, 3);
        assert!(path.is_found());
        assert_eq!(path.nodes(), &[0, 1, 2]);
        assert_eq!(path.edges(), &[0, 1]);
        assert_eq!(path.distance(), 150.0);
        assert!((path.weight() - 17.5).abs() < 1e-9);
        assert_eq!(path.time(), 17_500);
        assert_eq!(path.visited_nodes(), 3);

        let node_based = Path::from_edges(&weighting, false, 0, &edges, 3);
        assert!((node_based.weight() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn not_found_and_trivial() {
        let missing = Path::not_found(4);
        assert!(!missing.is_found());
        assert_eq!(missing.weight(), INFINITY);
        assert_eq!(missing.distance(), 0.0);
        let trivial = Path::trivial(0);
        assert!(trivial.is_found());
        assert!(trivial.nodes().is_empty());
        assert_eq!(trivial.weight(), 0.0);
    }

    #[test]
    #[should_panic]
    fn broken_chains_panic() {
        let weighting = ShortestWeighting::new();
        Path::from_edges(&weighting, false, 0, &[state(0, 0, 1, 1.0), state(1, 2, 3, 1.0)], 0);
    }
}
