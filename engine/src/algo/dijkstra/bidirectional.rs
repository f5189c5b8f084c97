//! Bidirectional Dijkstra and bidirectional A* with average potentials.

use super::*;
use crate::algo::a_star::AveragePotential;

/// Runs a forward search from the source and a backward search from the target, alternating by the smaller queue key.
///
/// Edge based, both directions key their states by directed edges: the forward label of an edge includes it,
/// the backward label is the weight after arriving at its adjacent node. The searches meet on the same edge.
pub struct BidirectionalDijkstra<'a, G, W: ?Sized, P = ZeroPotential> {
    graph: &'a G,
    weighting: &'a W,
    mode: TraversalMode,
    potential: AveragePotential<P>,
    options: QueryOptions,
    forward: DijkstraData,
    backward: DijkstraData,
    best: Weight,
    meeting_state: u32,
    visited_nodes: usize,
}

/// Bidirectional A* is a bidirectional Dijkstra with potentials.
pub type BidirectionalAStar<'a, G, W, P> = BidirectionalDijkstra<'a, G, W, P>;

impl<'a, G: RoadGraph, W: Weighting + ?Sized> BidirectionalDijkstra<'a, G, W> {
    pub fn new(graph: &'a G, weighting: &'a W, mode: TraversalMode) -> Self {
        Self::with_potentials(graph, weighting, mode, ZeroPotential(), ZeroPotential())
    }
}

impl<'a, G: RoadGraph, W: Weighting + ?Sized, P: Potential> BidirectionalDijkstra<'a, G, W, P> {
    /// `forward_potential` estimates the weight to the target,
    /// `backward_potential` the weight from the source (it gets initialized with source and target swapped).
    pub fn with_potentials(graph: &'a G, weighting: &'a W, mode: TraversalMode, forward_potential: P, backward_potential: P) -> Self {
        let num_states = mode.num_states(graph);
        BidirectionalDijkstra {
            graph,
            weighting,
            mode,
            potential: AveragePotential::new(forward_potential, backward_potential),
            options: QueryOptions::default(),
            forward: DijkstraData::new(num_states),
            backward: DijkstraData::new(num_states),
            best: INFINITY,
            meeting_state: NO_STATE,
            visited_nodes: 0,
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// The weight of the best path found so far.
    pub fn tentative_weight(&self) -> Weight {
        self.best
    }

    fn init(&mut self, query: Query) {
        self.forward.reset();
        self.backward.reset();
        self.best = INFINITY;
        self.meeting_state = NO_STATE;
        self.visited_nodes = 0;
        self.potential.init(query.from, query.to);

        let max_weight = self.options.max_weight;
        let (forward, backward, potential) = (&mut self.forward, &mut self.backward, &mut self.potential);
        let (best, meeting_state) = (&mut self.best, &mut self.meeting_state);

        match self.mode {
            TraversalMode::NodeBased => {
                if let Some(pot) = potential.forward(query.from) {
                    forward.relax(query.from, 0.0, pot, Parent::ROOT);
                }
                if let Some(pot) = potential.backward(query.to) {
                    backward.relax(query.to, 0.0, pot, Parent::ROOT);
                }
            }
            TraversalMode::EdgeBased => {
                for state in self.graph.link_iter(query.to) {
                    if !query.accepts_last_edge(state.edge) || self.weighting.edge_weight(&state, true) == INFINITY {
                        continue;
                    }
                    if let Some(pot) = potential.backward(query.to) {
                        backward.relax(state.reversed().key(), 0.0, pot, Parent::ROOT);
                    }
                }
                expand_forward(self.graph, self.weighting, self.mode, query.from, None, |id, node, weight, edge| {
                    if !query.accepts_first_edge(edge.edge) || weight > max_weight {
                        return;
                    }
                    if let Some(pot) = potential.forward(node) {
                        if forward.relax(id, weight, weight + pot, Parent { state: NO_STATE, edge: Some(edge) }) {
                            let total = weight + backward.weight(id);
                            if total < *best {
                                *best = total;
                                *meeting_state = id;
                            }
                        }
                    }
                });
            }
        }
    }

    fn settle_forward(&mut self) {
        let State { id, .. } = match self.forward.queue.pop() {
            Some(state) => state,
            None => return,
        };
        let arrival = match self.mode {
            TraversalMode::NodeBased => None,
            TraversalMode::EdgeBased => Some(self.graph.edge_state_by_key(id)),
        };
        let node = arrival.map(|state| state.adj).unwrap_or(id);
        let weight = self.forward.weight(id);
        let max_weight = self.options.max_weight.min(self.best);
        let (forward, backward, potential) = (&mut self.forward, &self.backward, &mut self.potential);
        let (best, meeting_state) = (&mut self.best, &mut self.meeting_state);

        expand_forward(self.graph, self.weighting, self.mode, node, arrival.as_ref(), |next, next_node, increment, edge| {
            let next_weight = weight + increment;
            if next_weight > max_weight || next_weight >= forward.weight(next) {
                return;
            }
            if let Some(pot) = potential.forward(next_node) {
                forward.relax(next, next_weight, next_weight + pot, Parent { state: id, edge: Some(edge) });
                let total = next_weight + backward.weight(next);
                if total < *best {
                    *best = total;
                    *meeting_state = next;
                }
            }
        });
    }

    fn settle_backward(&mut self) {
        let State { id, .. } = match self.backward.queue.pop() {
            Some(state) => state,
            None => return,
        };
        let departure = match self.mode {
            TraversalMode::NodeBased => None,
            TraversalMode::EdgeBased => Some(self.graph.edge_state_by_key(id)),
        };
        let node = departure.map(|state| state.adj).unwrap_or(id);
        let weight = self.backward.weight(id);
        let max_weight = self.options.max_weight.min(self.best);
        let (forward, backward, potential) = (&self.forward, &mut self.backward, &mut self.potential);
        let (best, meeting_state) = (&mut self.best, &mut self.meeting_state);

        expand_backward(self.graph, self.weighting, self.mode, node, departure.as_ref(), |next, next_node, increment, edge| {
            let next_weight = weight + increment;
            if next_weight > max_weight || next_weight >= backward.weight(next) {
                return;
            }
            if let Some(pot) = potential.backward(next_node) {
                backward.relax(next, next_weight, next_weight + pot, Parent { state: id, edge: Some(edge) });
                let total = forward.weight(next) + next_weight;
                if total < *best {
                    *best = total;
                    *meeting_state = next;
                }
            }
        });
    }

    fn run(&mut self, query: Query) -> bool {
        self.init(query);
        loop {
            let (forward_min, backward_min) = match (self.forward.min_key(), self.backward.min_key()) {
                (Some(forward_min), Some(backward_min)) => (forward_min, backward_min),
                // one side is exhausted, every path was seen by the other side
                _ => break,
            };
            if forward_min + backward_min >= self.best {
                break;
            }
            if self.visited_nodes >= self.options.max_visited_nodes {
                return false;
            }
            self.visited_nodes += 1;
            if forward_min <= backward_min {
                self.settle_forward();
            } else {
                self.settle_backward();
            }
        }
        self.best <= self.options.max_weight && self.meeting_state != NO_STATE
    }
}

impl<'a, G: RoadGraph, W: Weighting + ?Sized, P: Potential> QueryServer for BidirectionalDijkstra<'a, G, W, P> {
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
        if !self.run(query) {
            return Path::not_found(self.visited_nodes);
        }

        let mut edges = self.forward.edges_to(self.meeting_state);
        edges.extend(self.backward.edges_from(self.meeting_state));
        Path::from_edges(self.weighting, self.mode.is_edge_based(), query.from, &edges, self.visited_nodes)
    }

    fn visited_nodes(&self) -> usize {
        self.visited_nodes
    }

    fn name(&self) -> &'static str {
        match self.mode {
            TraversalMode::NodeBased => "bidirectional_dijkstra",
            TraversalMode::EdgeBased => "bidirectional_dijkstra_edge_based",
        }
    }
}
