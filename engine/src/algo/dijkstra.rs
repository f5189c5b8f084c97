//! Dijkstra's algorithm: unidirectional, bidirectional, node and edge based, with optional potentials.
//!
//! Node based searches use node ids as search states.
//! Edge based searches use the key of the directed edge a node was reached by,
//! so turn costs between consecutive edges can be applied.

use super::a_star::{Potential, ZeroPotential};
use super::*;
use crate::datastr::{index_heap::*, timestamped_vector::*};
use crate::util::NonNan;
use crate::weighting::Weighting;

pub mod bidirectional;

pub use self::bidirectional::{BidirectionalAStar, BidirectionalDijkstra};

/// Marks "no parent state".
pub const NO_STATE: u32 = u32::MAX;

/// Priority Queue entries
#[derive(Copy, Clone, Eq, PartialEq, Debug, PartialOrd, Ord)]
pub struct State {
    pub key: NonNan,
    pub id: u32,
}

impl Indexing for State {
    #[inline]
    fn as_index(&self) -> usize {
        self.id as usize
    }
}

/// How a search state was reached: the state the search came from
/// and the edge state which was traversed, oriented in travel direction.
#[derive(Debug, Clone, Copy)]
pub struct Parent {
    pub state: u32,
    pub edge: Option<EdgeState>,
}

impl Parent {
    pub const ROOT: Parent = Parent { state: NO_STATE, edge: None };
}

/// Labels, parents and queue of one search direction.
#[derive(Debug, Clone)]
pub struct DijkstraData {
    pub weights: TimestampedVector<Weight>,
    pub parents: Vec<Parent>,
    pub queue: IndexdMinHeap<State>,
}

impl DijkstraData {
    pub fn new(num_states: usize) -> Self {
        DijkstraData {
            weights: TimestampedVector::new(num_states, INFINITY),
            parents: vec![Parent::ROOT; num_states],
            queue: IndexdMinHeap::new(num_states),
        }
    }

    pub fn num_states(&self) -> usize {
        self.parents.len()
    }

    pub fn reset(&mut self) {
        self.weights.reset();
        self.queue.clear();
    }

    #[inline]
    pub fn weight(&self, id: u32) -> Weight {
        self.weights[id as usize]
    }

    /// Sets the label of `id` if `weight` improves it and queues the state with `key`.
    pub fn relax(&mut self, id: u32, weight: Weight, key: Weight, parent: Parent) -> bool {
        debug_assert!(weight >= 0.0, "negative label {}", weight);
        if weight < self.weights[id as usize] {
            self.weights.set(id as usize, weight);
            self.parents[id as usize] = parent;
            self.queue.push_or_decrease(State { key: NonNan::key(key), id });
            true
        } else {
            false
        }
    }

    pub fn min_key(&self) -> Option<Weight> {
        self.queue.peek().map(|state| state.key.value())
    }

    /// Edges traversed from the search root to `id`, in travel order.
    pub fn edges_to(&self, id: u32) -> Vec<EdgeState> {
        let mut edges = Vec::new();
        let mut current = id;
        while current != NO_STATE {
            let parent = self.parents[current as usize];
            match parent.edge {
                Some(edge) => edges.push(edge),
                None => break,
            }
            current = parent.state;
        }
        edges.reverse();
        edges
    }

    /// Edges traversed from `id` to the search root (for searches run against edge direction), in travel order.
    pub fn edges_from(&self, id: u32) -> Vec<EdgeState> {
        let mut edges = self.edges_to(id);
        edges.reverse();
        edges
    }
}

/// Relaxes all states reachable from a settled state, calling `relax(state, node, weight increment, edge)`.
///
/// Node based, `node` is the settled node and `arrival` is ignored.
/// Edge based, `arrival` is the edge state the search arrived at `node` with (`None` at the source).
pub(crate) fn expand_forward<G, W, F>(graph: &G, weighting: &W, mode: TraversalMode, node: NodeId, arrival: Option<&EdgeState>, mut relax: F)
where
    G: RoadGraph,
    W: Weighting + ?Sized,
    F: FnMut(u32, NodeId, Weight, EdgeState),
{
    let in_edge = arrival.map(|state| state.edge).unwrap_or(NO_EDGE);
    for state in graph.link_iter(node) {
        let weight = weighting.edge_weight(&state, false);
        if weight == INFINITY {
            continue;
        }
        match mode {
            TraversalMode::NodeBased => relax(state.adj, state.adj, weight, state),
            TraversalMode::EdgeBased => {
                let turn = weighting.turn_weight(in_edge, node, state.edge);
                if turn < INFINITY {
                    relax(state.key(), state.adj, weight + turn, state);
                }
            }
        }
    }
}

/// Counterpart of `expand_forward` for searches running against edge direction.
///
/// Node based, relaxes the predecessors of `node`.
/// Edge based, `departure` is the edge state whose label is the weight after arriving at its adjacent node;
/// relaxed are the edges arriving at its base node, the increment includes the departure edge and the turn.
pub(crate) fn expand_backward<G, W, F>(graph: &G, weighting: &W, mode: TraversalMode, node: NodeId, departure: Option<&EdgeState>, mut relax: F)
where
    G: RoadGraph,
    W: Weighting + ?Sized,
    F: FnMut(u32, NodeId, Weight, EdgeState),
{
    match (mode, departure) {
        (TraversalMode::NodeBased, _) => {
            for state in graph.link_iter(node) {
                let weight = weighting.edge_weight(&state, true);
                if weight < INFINITY {
                    relax(state.adj, state.adj, weight, state.reversed());
                }
            }
        }
        (TraversalMode::EdgeBased, Some(departure)) => {
            let departure_weight = weighting.edge_weight(departure, false);
            debug_assert!(departure_weight < INFINITY);
            let via = departure.base;
            for state in graph.link_iter(via) {
                if weighting.edge_weight(&state, true) == INFINITY {
                    continue;
                }
                let turn = weighting.turn_weight(state.edge, via, departure.edge);
                if turn < INFINITY {
                    relax(state.reversed().key(), via, departure_weight + turn, *departure);
                }
            }
        }
        (TraversalMode::EdgeBased, None) => panic!("edge based backward expansion needs a departure edge"),
    }
}

/// Node based one to all search, turn costs are ignored.
/// With `reverse` the search runs against edge direction, computing weights towards `source`.
/// States above `max_weight` are not expanded. Returns the number of settled nodes.
pub fn one_to_all<G, W>(graph: &G, weighting: &W, source: NodeId, reverse: bool, max_weight: Weight, data: &mut DijkstraData) -> usize
where
    G: RoadGraph,
    W: Weighting + ?Sized,
{
    data.reset();
    data.relax(source, 0.0, 0.0, Parent::ROOT);
    let mut settled = 0;
    while let Some(State { id: node, .. }) = data.queue.pop() {
        settled += 1;
        let weight = data.weight(node);
        let mut relax = |next: u32, _: NodeId, increment: Weight, edge: EdgeState| {
            let next_weight = weight + increment;
            if next_weight <= max_weight {
                data.relax(next, next_weight, next_weight, Parent { state: node, edge: Some(edge) });
            }
        };
        if reverse {
            expand_backward(graph, weighting, TraversalMode::NodeBased, node, None, &mut relax);
        } else {
            expand_forward(graph, weighting, TraversalMode::NodeBased, node, None, &mut relax);
        }
    }
    settled
}

/// Unidirectional search. With a potential other than `ZeroPotential` this is A*.
pub struct Dijkstra<'a, G, W: ?Sized, P = ZeroPotential> {
    graph: &'a G,
    weighting: &'a W,
    mode: TraversalMode,
    potential: P,
    options: QueryOptions,
    data: DijkstraData,
    visited_nodes: usize,
}

/// A* is Dijkstra with a potential.
pub type AStar<'a, G, W, P> = Dijkstra<'a, G, W, P>;

impl<'a, G: RoadGraph, W: Weighting + ?Sized> Dijkstra<'a, G, W> {
    pub fn new(graph: &'a G, weighting: &'a W, mode: TraversalMode) -> Self {
        Self::with_potential(graph, weighting, mode, ZeroPotential())
    }
}

impl<'a, G: RoadGraph, W: Weighting + ?Sized, P: Potential> Dijkstra<'a, G, W, P> {
    pub fn with_potential(graph: &'a G, weighting: &'a W, mode: TraversalMode, potential: P) -> Self {
        Dijkstra {
            graph,
            weighting,
            mode,
            potential,
            options: QueryOptions::default(),
            data: DijkstraData::new(mode.num_states(graph)),
            visited_nodes: 0,
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    fn run(&mut self, query: Query) -> Option<u32> {
        self.data.reset();
        self.visited_nodes = 0;
        self.potential.init(query.from, query.to);

        let graph = self.graph;
        let options = self.options;
        let data = &mut self.data;
        let potential = &mut self.potential;

        match self.mode {
            TraversalMode::NodeBased => {
                if let Some(pot) = potential.potential(query.from) {
                    data.relax(query.from, 0.0, pot, Parent::ROOT);
                }
            }
            TraversalMode::EdgeBased => {
                expand_forward(graph, self.weighting, self.mode, query.from, None, |id, node, weight, edge| {
                    if !query.accepts_first_edge(edge.edge) || weight > options.max_weight {
                        return;
                    }
                    if let Some(pot) = potential.potential(node) {
                        data.relax(id, weight, weight + pot, Parent { state: NO_STATE, edge: Some(edge) });
                    }
                });
            }
        }

        while let Some(State { id, .. }) = self.data.queue.pop() {
            self.visited_nodes += 1;
            if self.visited_nodes > self.options.max_visited_nodes {
                return None;
            }

            let arrival = match self.mode {
                TraversalMode::NodeBased => None,
                TraversalMode::EdgeBased => Some(self.graph.edge_state_by_key(id)),
            };
            let node = arrival.map(|state| state.adj).unwrap_or(id);
            if node == query.to && arrival.map(|state| query.accepts_last_edge(state.edge)).unwrap_or(true) {
                return Some(id);
            }

            let weight = self.data.weight(id);
            let data = &mut self.data;
            let potential = &mut self.potential;
            expand_forward(graph, self.weighting, self.mode, node, arrival.as_ref(), |next, next_node, increment, edge| {
                let next_weight = weight + increment;
                if next_weight > options.max_weight || next_weight >= data.weight(next) {
                    return;
                }
                if let Some(pot) = potential.potential(next_node) {
                    data.relax(next, next_weight, next_weight + pot, Parent { state: id, edge: Some(edge) });
                }
            });
        }
        None
    }
}

impl<'a, G: RoadGraph, W: Weighting + ?Sized, P: Potential> QueryServer for Dijkstra<'a, G, W, P> {
    fn query(&mut self, query: Query) -> Path {
        assert!(self.mode.is_edge_based() || !query.is_constrained(), "edge constraints need an edge based search");
        if query.is_unsatisfiable() {
            self.visited_nodes = 0;
            return Path::not_found(0);
        }
        if query.from == query.to && !query.is_constrained() {
            self.visited_nodes = 0;
            return Path::trivial(0);
        }
        match self.run(query) {
            Some(target) => {
                let edges = self.data.edges_to(target);
                Path::from_edges(self.weighting, self.mode.is_edge_based(), query.from, &edges, self.visited_nodes)
            }
            None => Path::not_found(self.visited_nodes),
        }
    }

    fn visited_nodes(&self) -> usize {
        self.visited_nodes
    }

    fn name(&self) -> &'static str {
        match self.mode {
            TraversalMode::NodeBased => "dijkstra",
            TraversalMode::EdgeBased => "dijkstra_edge_based",
        }
    }
}
