//! A per request overlay which splits edges at snapped positions.
//!
//! Snapped positions become virtual nodes with ids above the real node ids, the pieces of a split edge
//! become virtual edges with ids above the real edge ids. The wrapped graph is never modified:
//! the overlay answers for virtual ids and for real nodes next to a split edge, everything else is forwarded.

use crate::datastr::graph::*;
use crate::weighting::Weighting;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod ch;
pub mod potential;

pub use self::ch::QueryChGraph;
pub use self::potential::VirtualNodePotential;

/// A position on an edge: `fraction` of its length away from the edge's base node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    pub closest_edge: EdgeId,
    pub fraction: f64,
}

impl Snap {
    pub fn new(closest_edge: EdgeId, fraction: f64) -> Self {
        Snap { closest_edge, fraction }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryGraphError {
    #[error("snapped edge {edge} does not exist, the graph has {num_edges} edges")]
    EdgeOutOfRange { edge: EdgeId, num_edges: usize },
    #[error("fraction {fraction} on edge {edge} is not within [0, 1]")]
    InvalidFraction { edge: EdgeId, fraction: f64 },
    #[error("cannot snap to edge {0}, it has zero length")]
    ZeroLengthEdge(EdgeId),
    #[error("cannot snap to edge {0}, it is inaccessible in both directions")]
    InaccessibleEdge(EdgeId),
}

/// An edge split at one or more positions.
///
/// Positions along the edge: 0 is the base node, `1..=k` the virtual nodes in order, `k + 1` the adj node.
/// The piece between position `p` and `p + 1` is virtual edge `first_piece + p`, stored from base towards adj.
#[derive(Debug, Clone)]
pub struct SplitEdge {
    edge: EdgeId,
    base: NodeId,
    adj: NodeId,
    fractions: Vec<f64>,
    nodes: Vec<NodeId>,
    first_piece: EdgeId,
}

impl SplitEdge {
    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    /// Number of positions, including both real end points.
    pub fn num_positions(&self) -> usize {
        self.nodes.len() + 2
    }

    pub fn node_at(&self, position: usize) -> NodeId {
        if position == 0 {
            self.base
        } else if position <= self.nodes.len() {
            self.nodes[position - 1]
        } else {
            self.adj
        }
    }

    fn piece(&self, position: usize) -> EdgeId {
        self.first_piece + position as EdgeId
    }
}

#[derive(Debug, Clone, Copy)]
struct VirtualNode {
    coordinate: Coordinate,
    split: u32,
    position: u32,
}

#[derive(Debug, Clone, Copy)]
struct VirtualEdge {
    base: NodeId,
    adj: NodeId,
    distance: f64,
    flags: EdgeFlags,
    orig_edge: EdgeId,
}

#[derive(Debug)]
pub struct QueryGraph<'a, G> {
    graph: &'a G,
    base_nodes: usize,
    base_edges: usize,
    snapped: Vec<NodeId>,
    splits: Vec<SplitEdge>,
    virtual_nodes: Vec<VirtualNode>,
    virtual_edges: Vec<VirtualEdge>,
    // edge states of virtual nodes and of real nodes next to a split edge
    changed: FxHashMap<NodeId, Vec<EdgeState>>,
}

impl<'a, G: RoadGraph> QueryGraph<'a, G> {
    /// Splits the snapped edges. Snaps at fraction 0 or 1 resolve to the real end point,
    /// snaps at the same position of the same edge share one virtual node.
    pub fn lookup(graph: &'a G, snaps: &[Snap]) -> Result<Self, QueryGraphError> {
        let base_nodes = graph.num_nodes();
        let base_edges = graph.num_edges();

        let mut interior: BTreeMap<EdgeId, Vec<f64>> = BTreeMap::new();
        for snap in snaps {
            let edge = snap.closest_edge;
            if edge as usize >= base_edges {
                return Err(QueryGraphError::EdgeOutOfRange { edge, num_edges: base_edges });
            }
            if !(0.0..=1.0).contains(&snap.fraction) {
                return Err(QueryGraphError::InvalidFraction { edge, fraction: snap.fraction });
            }
            let state = graph.edge_state_by_key(edge_key(edge, false));
            if !state.access(false) && !state.access(true) {
                return Err(QueryGraphError::InaccessibleEdge(edge));
            }
            if snap.fraction > 0.0 && snap.fraction < 1.0 {
                if state.distance <= 0.0 {
                    return Err(QueryGraphError::ZeroLengthEdge(edge));
                }
                interior.entry(edge).or_default().push(snap.fraction);
            }
        }

        let mut query_graph = QueryGraph {
            graph,
            base_nodes,
            base_edges,
            snapped: Vec::with_capacity(snaps.len()),
            splits: Vec::with_capacity(interior.len()),
            virtual_nodes: Vec::new(),
            virtual_edges: Vec::new(),
            changed: FxHashMap::default(),
        };
        for (edge, mut fractions) in interior {
            fractions.sort_by(|a, b| a.total_cmp(b));
            fractions.dedup();
            query_graph.split(edge, fractions);
        }
        query_graph.collect_changed_nodes();

        for snap in snaps {
            let node = query_graph.resolve(snap);
            query_graph.snapped.push(node);
        }
        Ok(query_graph)
    }

    fn split(&mut self, edge: EdgeId, fractions: Vec<f64>) {
        let state = self.graph.edge_state_by_key(edge_key(edge, false));
        let (base_coord, adj_coord) = (self.graph.coordinate(state.base), self.graph.coordinate(state.adj));
        let split = self.splits.len() as u32;
        let first_piece = (self.base_edges + self.virtual_edges.len()) as EdgeId;

        let mut nodes = Vec::with_capacity(fractions.len());
        for (i, &fraction) in fractions.iter().enumerate() {
            nodes.push((self.base_nodes + self.virtual_nodes.len()) as NodeId);
            self.virtual_nodes.push(VirtualNode {
                coordinate: base_coord.interpolate(&adj_coord, fraction),
                split,
                position: i as u32 + 1,
            });
        }

        let mut covered = 0.0;
        let mut prev = (state.base, 0.0);
        for (i, &node) in nodes.iter().chain(std::iter::once(&state.adj)).enumerate() {
            let fraction = fractions.get(i).copied().unwrap_or(1.0);
            // the last piece takes the rest, so the pieces add up to the edge
            let distance = if i == fractions.len() {
                state.distance - covered
            } else {
                state.distance * (fraction - prev.1)
            };
            covered += distance;
            self.virtual_edges.push(VirtualEdge {
                base: prev.0,
                adj: node,
                distance,
                flags: state.flags,
                orig_edge: edge,
            });
            prev = (node, fraction);
        }

        self.splits.push(SplitEdge {
            edge,
            base: state.base,
            adj: state.adj,
            fractions,
            nodes,
            first_piece,
        });
    }

    fn collect_changed_nodes(&mut self) {
        let mut split_at: FxHashMap<EdgeId, usize> = FxHashMap::default();
        for (i, split) in self.splits.iter().enumerate() {
            split_at.insert(split.edge, i);
        }

        let mut changed = FxHashMap::default();
        for split in &self.splits {
            for node in [split.base, split.adj] {
                if changed.contains_key(&node) {
                    continue;
                }
                let states: Vec<EdgeState> = self
                    .graph
                    .link_iter(node)
                    .map(|state| match split_at.get(&state.edge) {
                        // leaving towards adj enters the first piece, leaving towards base the last one
                        Some(&i) if !state.reverse => self.virtual_state(self.splits[i].piece(0), false),
                        Some(&i) => self.virtual_state(self.splits[i].piece(self.splits[i].nodes.len()), true),
                        None => state,
                    })
                    .collect();
                changed.insert(node, states);
            }
            for (i, &node) in split.nodes.iter().enumerate() {
                let states = vec![self.virtual_state(split.piece(i), true), self.virtual_state(split.piece(i + 1), false)];
                changed.insert(node, states);
            }
        }
        self.changed = changed;
    }

    fn resolve(&self, snap: &Snap) -> NodeId {
        let state = self.graph.edge_state_by_key(edge_key(snap.closest_edge, false));
        if snap.fraction <= 0.0 {
            return state.base;
        }
        if snap.fraction >= 1.0 {
            return state.adj;
        }
        let split = self
            .splits
            .iter()
            .find(|split| split.edge == snap.closest_edge)
            .unwrap_or_else(|| panic!("edge {} was not split", snap.closest_edge));
        let position = split
            .fractions
            .binary_search_by(|fraction| fraction.total_cmp(&snap.fraction))
            .unwrap_or_else(|_| panic!("fraction {} missing on edge {}", snap.fraction, snap.closest_edge));
        split.nodes[position]
    }

    fn virtual_state(&self, edge: EdgeId, reverse: bool) -> EdgeState {
        let piece = &self.virtual_edges[edge as usize - self.base_edges];
        let (base, adj) = if reverse { (piece.adj, piece.base) } else { (piece.base, piece.adj) };
        EdgeState {
            edge,
            base,
            adj,
            reverse,
            distance: piece.distance,
            flags: piece.flags,
            orig_edge: piece.orig_edge,
        }
    }

    /// The node the `i`-th snap of `lookup` resolved to.
    pub fn snapped_node(&self, i: usize) -> NodeId {
        self.snapped[i]
    }

    pub fn base_graph(&self) -> &'a G {
        self.graph
    }

    pub fn num_base_nodes(&self) -> usize {
        self.base_nodes
    }

    pub fn num_base_edges(&self) -> usize {
        self.base_edges
    }

    pub fn num_virtual_nodes(&self) -> usize {
        self.virtual_nodes.len()
    }

    pub fn is_virtual_node(&self, node: NodeId) -> bool {
        node as usize >= self.base_nodes
    }

    pub fn is_virtual_edge(&self, edge: EdgeId) -> bool {
        is_valid_edge(edge) && edge as usize >= self.base_edges
    }

    /// Nodes whose edge states differ from the wrapped graph.
    pub fn changed_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.changed.keys().copied()
    }

    /// The split edge a virtual node lies on and its position along it.
    pub fn split_of(&self, node: NodeId) -> Option<(&SplitEdge, usize)> {
        if !self.is_virtual_node(node) {
            return None;
        }
        let virtual_node = &self.virtual_nodes[node as usize - self.base_nodes];
        Some((&self.splits[virtual_node.split as usize], virtual_node.position as usize))
    }

    /// Weight of following a split edge from position `from` to position `to`, `INFINITY` if a piece is not accessible.
    pub fn weight_along<W: Weighting + ?Sized>(&self, weighting: &W, split: &SplitEdge, from: usize, to: usize) -> Weight {
        let reverse = to < from;
        let range = if reverse { to..from } else { from..to };
        range.map(|position| weighting.edge_weight(&self.virtual_state(split.piece(position), reverse), false)).sum()
    }

    /// Wraps a weighting for searches on this graph: u-turns at virtual nodes are forbidden
    /// and turn costs at real nodes are looked up for the original edges of virtual edges.
    pub fn wrap_weighting<W: Weighting>(&self, weighting: W) -> QueryGraphWeighting<W> {
        QueryGraphWeighting {
            weighting,
            base_nodes: self.base_nodes,
            base_edges: self.base_edges,
            orig_edges: self.virtual_edges.iter().map(|piece| piece.orig_edge).collect(),
        }
    }
}

impl<'a, G: RoadGraph> Graph for QueryGraph<'a, G> {
    fn num_nodes(&self) -> usize {
        self.base_nodes + self.virtual_nodes.len()
    }

    fn num_arcs(&self) -> usize {
        self.graph.num_arcs() + 2 * self.virtual_edges.len() - 2 * self.splits.len()
    }

    fn degree(&self, node: NodeId) -> usize {
        match self.changed.get(&node) {
            Some(states) => states.len(),
            None => self.graph.degree(node),
        }
    }
}

/// Edge states of a query graph node, either forwarded or from the overlay.
#[derive(Debug, Clone)]
pub enum QueryGraphIter<'b, I> {
    Base(I),
    Changed(std::slice::Iter<'b, EdgeState>),
}

impl<'b, I: Iterator<Item = EdgeState>> Iterator for QueryGraphIter<'b, I> {
    type Item = EdgeState;

    fn next(&mut self) -> Option<EdgeState> {
        match self {
            QueryGraphIter::Base(iter) => iter.next(),
            QueryGraphIter::Changed(iter) => iter.next().copied(),
        }
    }
}

impl<'a, G: RoadGraph> LinkIterable<EdgeState> for QueryGraph<'a, G> {
    type Iter<'b> = QueryGraphIter<'b, G::Iter<'b>> where Self: 'b;

    fn link_iter(&self, node: NodeId) -> Self::Iter<'_> {
        match self.changed.get(&node) {
            Some(states) => QueryGraphIter::Changed(states.iter()),
            None => QueryGraphIter::Base(self.graph.link_iter(node)),
        }
    }
}

impl<'a, G: RoadGraph> RoadGraph for QueryGraph<'a, G> {
    fn num_edges(&self) -> usize {
        self.base_edges + self.virtual_edges.len()
    }

    fn edge_state(&self, edge: EdgeId, adj: NodeId) -> EdgeState {
        if !self.is_virtual_edge(edge) {
            return self.graph.edge_state(edge, adj);
        }
        let piece = &self.virtual_edges[edge as usize - self.base_edges];
        if piece.adj == adj {
            self.virtual_state(edge, false)
        } else if piece.base == adj {
            self.virtual_state(edge, true)
        } else {
            panic!("virtual edge {} ({}-{}) does not end at node {}", edge, piece.base, piece.adj, adj)
        }
    }

    fn edge_state_by_key(&self, key: EdgeKey) -> EdgeState {
        let edge = key_edge(key);
        if self.is_virtual_edge(edge) {
            self.virtual_state(edge, key_is_reverse(key))
        } else {
            self.graph.edge_state_by_key(key)
        }
    }

    fn coordinate(&self, node: NodeId) -> Coordinate {
        if self.is_virtual_node(node) {
            self.virtual_nodes[node as usize - self.base_nodes].coordinate
        } else {
            self.graph.coordinate(node)
        }
    }
}

/// A weighting aware of the virtual ids of one query graph, see `QueryGraph::wrap_weighting`.
#[derive(Debug, Clone)]
pub struct QueryGraphWeighting<W> {
    weighting: W,
    base_nodes: usize,
    base_edges: usize,
    orig_edges: Vec<EdgeId>,
}

impl<W: Weighting> QueryGraphWeighting<W> {
    fn orig_edge(&self, edge: EdgeId) -> EdgeId {
        if is_valid_edge(edge) && edge as usize >= self.base_edges {
            self.orig_edges[edge as usize - self.base_edges]
        } else {
            edge
        }
    }

    fn is_virtual_node(&self, node: NodeId) -> bool {
        node as usize >= self.base_nodes
    }

    pub fn inner(&self) -> &W {
        &self.weighting
    }
}

impl<W: Weighting> Weighting for QueryGraphWeighting<W> {
    fn edge_weight(&self, edge: &EdgeState, reverse: bool) -> Weight {
        self.weighting.edge_weight(edge, reverse)
    }

    fn edge_millis(&self, edge: &EdgeState, reverse: bool) -> u64 {
        self.weighting.edge_millis(edge, reverse)
    }

    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> Weight {
        if self.is_virtual_node(via) {
            if is_valid_edge(in_edge) && in_edge == out_edge {
                INFINITY
            } else {
                0.0
            }
        } else {
            self.weighting.turn_weight(self.orig_edge(in_edge), via, self.orig_edge(out_edge))
        }
    }

    fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64 {
        if self.is_virtual_node(via) {
            0
        } else {
            self.weighting.turn_millis(self.orig_edge(in_edge), via, self.orig_edge(out_edge))
        }
    }

    fn min_weight_per_distance(&self) -> f64 {
        self.weighting.min_weight_per_distance()
    }

    fn has_turn_costs(&self) -> bool {
        self.weighting.has_turn_costs()
    }

    fn name(&self) -> &str {
        self.weighting.name()
    }
}
