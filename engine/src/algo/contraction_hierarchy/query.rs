//! Node based CH queries.

use super::unpacking::unpack_arcs;
use super::*;
use crate::algo::a_star::{Potential, ZeroPotential};
use crate::algo::dijkstra::{State, NO_STATE};
use crate::datastr::{index_heap::*, timestamped_vector::*};
use crate::util::NonNan;
use crate::weighting::Weighting;

/// Labels of one direction of a CH search.
/// Parents store the previous state and the arc key the state was reached by.
#[derive(Debug, Clone)]
pub(super) struct ChSearchData {
    weights: TimestampedVector<Weight>,
    parents: Vec<(u32, EdgeKey)>,
    nodes: Vec<NodeId>,
    pub(super) queue: IndexdMinHeap<State>,
}

impl ChSearchData {
    pub(super) fn new(num_states: usize) -> Self {
        ChSearchData {
            weights: TimestampedVector::new(num_states, INFINITY),
            parents: vec![(NO_STATE, NO_KEY); num_states],
            nodes: vec![NO_NODE; num_states],
            queue: IndexdMinHeap::new(num_states),
        }
    }

    pub(super) fn reset(&mut self) {
        self.weights.reset();
        self.queue.clear();
    }

    #[inline]
    pub(super) fn weight(&self, id: u32) -> Weight {
        self.weights[id as usize]
    }

    /// Node a state belongs to. Only valid for labeled states.
    #[inline]
    pub(super) fn node(&self, id: u32) -> NodeId {
        self.nodes[id as usize]
    }

    pub(super) fn relax(&mut self, id: u32, node: NodeId, weight: Weight, key: Weight, parent: (u32, EdgeKey)) -> bool {
        if weight < self.weights[id as usize] {
            self.weights.set(id as usize, weight);
            self.parents[id as usize] = parent;
            self.nodes[id as usize] = node;
            // settled states may come back when potentials are not exact
            self.queue.push_or_decrease(State { key: NonNan::key(key), id });
            true
        } else {
            false
        }
    }

    pub(super) fn min_key(&self) -> Option<Weight> {
        self.queue.peek().map(|state| state.key.value())
    }

    /// Arc keys from the search root to `id`, the last arc first.
    pub(super) fn arcs_to(&self, id: u32) -> Vec<EdgeKey> {
        let mut arcs = Vec::new();
        let mut current = id;
        while current != NO_STATE {
            let (prev, arc) = self.parents[current as usize];
            if arc == NO_KEY {
                break;
            }
            arcs.push(arc);
            current = prev;
        }
        arcs
    }
}

/// Bidirectional search on a node based hierarchy. Both searches only relax arcs towards higher levels.
///
/// Without potentials stall on demand is applied: a settled node is not expanded
/// when one of its higher neighbors proves that its label is too large.
/// With potentials each direction uses its own potential without averaging,
/// so labels may be corrected and a direction only stops once its queue minimum reaches the best path.
pub struct ChQuery<'a, G, C, W: ?Sized, P = ZeroPotential> {
    graph: &'a G,
    ch: &'a C,
    weighting: &'a W,
    forward_potential: P,
    backward_potential: P,
    goal_directed: bool,
    options: QueryOptions,
    forward: ChSearchData,
    backward: ChSearchData,
    best: Weight,
    meeting_node: NodeId,
    visited_nodes: usize,
}

impl<'a, G: RoadGraph, C: ChGraph, W: Weighting + ?Sized> ChQuery<'a, G, C, W> {
    pub fn new(graph: &'a G, ch: &'a C, weighting: &'a W) -> Self {
        let mut query = Self::with_potentials(graph, ch, weighting, ZeroPotential(), ZeroPotential());
        query.goal_directed = false;
        query
    }
}

impl<'a, G: RoadGraph, C: ChGraph, W: Weighting + ?Sized, P: Potential> ChQuery<'a, G, C, W, P> {
    /// `forward_potential` estimates the weight to the target,
    /// `backward_potential` the weight from the source (it gets initialized with source and target swapped).
    pub fn with_potentials(graph: &'a G, ch: &'a C, weighting: &'a W, forward_potential: P, backward_potential: P) -> Self {
        assert!(!ch.is_edge_based(), "node based query on an edge based hierarchy");
        assert_eq!(graph.num_nodes(), ch.num_nodes());
        let n = ch.num_nodes();
        ChQuery {
            graph,
            ch,
            weighting,
            forward_potential,
            backward_potential,
            goal_directed: true,
            options: QueryOptions::default(),
            forward: ChSearchData::new(n),
            backward: ChSearchData::new(n),
            best: INFINITY,
            meeting_node: NO_NODE,
            visited_nodes: 0,
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    fn stall_on_demand(&self) -> bool {
        self.options.stall_on_demand && !self.goal_directed
    }

    fn init(&mut self, query: Query) {
        self.forward.reset();
        self.backward.reset();
        self.best = INFINITY;
        self.meeting_node = NO_NODE;
        self.visited_nodes = 0;
        self.forward_potential.init(query.from, query.to);
        self.backward_potential.init(query.to, query.from);

        if let Some(pot) = self.forward_potential.potential(query.from) {
            self.forward.relax(query.from, query.from, 0.0, pot, (NO_STATE, NO_KEY));
        }
        if let Some(pot) = self.backward_potential.potential(query.to) {
            self.backward.relax(query.to, query.to, 0.0, pot, (NO_STATE, NO_KEY));
        }
    }

    fn update_best(&mut self, node: NodeId) {
        let total = self.forward.weight(node) + self.backward.weight(node);
        if total < self.best {
            self.best = total;
            self.meeting_node = node;
        }
    }

    fn settle_forward(&mut self) {
        let State { id: node, .. } = match self.forward.queue.pop() {
            Some(state) => state,
            None => return,
        };
        self.update_best(node);
        let weight = self.forward.weight(node);

        if self.stall_on_demand() {
            let stalled = self
                .ch
                .upward_in(node)
                .iter()
                .any(|arc| self.forward.weight(arc.adj) + arc.weight < weight);
            if stalled {
                return;
            }
        }

        let max_weight = self.options.max_weight.min(self.best);
        let ch = self.ch;
        for arc in ch.upward_out(node) {
            let next_weight = weight + arc.weight;
            if next_weight > max_weight || next_weight >= self.forward.weight(arc.adj) {
                continue;
            }
            if let Some(pot) = self.forward_potential.potential(arc.adj) {
                if self.forward.relax(arc.adj, arc.adj, next_weight, next_weight + pot, (node, arc.key)) {
                    self.update_best(arc.adj);
                }
            }
        }
    }

    fn settle_backward(&mut self) {
        let State { id: node, .. } = match self.backward.queue.pop() {
            Some(state) => state,
            None => return,
        };
        self.update_best(node);
        let weight = self.backward.weight(node);

        if self.stall_on_demand() {
            let stalled = self
                .ch
                .upward_out(node)
                .iter()
                .any(|arc| self.backward.weight(arc.adj) + arc.weight < weight);
            if stalled {
                return;
            }
        }

        let max_weight = self.options.max_weight.min(self.best);
        let ch = self.ch;
        for arc in ch.upward_in(node) {
            let next_weight = weight + arc.weight;
            if next_weight > max_weight || next_weight >= self.backward.weight(arc.adj) {
                continue;
            }
            if let Some(pot) = self.backward_potential.potential(arc.adj) {
                if self.backward.relax(arc.adj, arc.adj, next_weight, next_weight + pot, (node, arc.key)) {
                    self.update_best(arc.adj);
                }
            }
        }
    }

    fn run(&mut self, query: Query) -> bool {
        self.init(query);
        loop {
            // each direction stops on its own once it cannot improve the best path anymore
            let forward_min = self.forward.min_key().filter(|&key| key < self.best);
            let backward_min = self.backward.min_key().filter(|&key| key < self.best);
            let settle_forward = match (forward_min, backward_min) {
                (None, None) => break,
                (Some(forward_min), Some(backward_min)) => forward_min <= backward_min,
                (forward_min, _) => forward_min.is_some(),
            };
            if self.visited_nodes >= self.options.max_visited_nodes {
                return false;
            }
            self.visited_nodes += 1;
            if settle_forward {
                self.settle_forward();
            } else {
                self.settle_backward();
            }
        }
        self.best <= self.options.max_weight && self.meeting_node != NO_NODE
    }
}

impl<'a, G: RoadGraph, C: ChGraph, W: Weighting + ?Sized, P: Potential> QueryServer for ChQuery<'a, G, C, W, P> {
    fn query(&mut self, query: Query) -> Path {
        assert!(!query.is_constrained(), "edge constraints need an edge based hierarchy");
        if query.from == query.to {
            self.visited_nodes = 0;
            return Path::trivial(0);
        }
        if !self.run(query) {
            return Path::not_found(self.visited_nodes);
        }

        let mut arcs = self.forward.arcs_to(self.meeting_node);
        arcs.reverse();
        arcs.extend(self.backward.arcs_to(self.meeting_node));
        let edges = unpack_arcs(self.graph, self.ch, &arcs);
        Path::from_edges(self.weighting, false, query.from, &edges, self.visited_nodes)
    }

    fn visited_nodes(&self) -> usize {
        self.visited_nodes
    }

    fn name(&self) -> &'static str {
        if self.goal_directed {
            "ch_astar"
        } else {
            "ch"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::a_star::PerfectPotential;
    use crate::algo::dijkstra::Dijkstra;
    use crate::datastr::graph::base_graph::*;
    use crate::weighting::ShortestWeighting;

    // 0 - 1 - 2 - 3
    // |           |
    // 4 --------- 5
    fn ring() -> BaseGraph {
        let mut builder = GraphBuilder::new();
        for i in 0..6 {
            builder.add_node(50.0 + (i / 4) as f64 * 0.01, 8.0 + (i % 4) as f64 * 0.01);
        }
        let flags = EdgeFlags::both_directions(50.0);
        builder.add_edge(0, 1, 2.0, flags);
        builder.add_edge(1, 2, 2.0, flags);
        builder.add_edge(2, 3, 2.0, flags);
        builder.add_edge(0, 4, 1.0, flags);
        builder.add_edge(4, 5, 3.0, flags);
        builder.add_edge(5, 3, 1.0, flags);
        builder.freeze()
    }

    #[test]
    fn matches_dijkstra_on_all_pairs() {
        let graph = ring();
        let weighting = ShortestWeighting::new();
        let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
        let mut ch_query = ChQuery::new(&graph, &ch, &weighting);
        let mut dijkstra = Dijkstra::new(&graph, &weighting, TraversalMode::NodeBased);
        for from in 0..6 {
            for to in 0..6 {
                let expected = dijkstra.calc_path(from, to);
                let path = ch_query.calc_path(from, to);
                assert_eq!(path.is_found(), expected.is_found());
                assert_eq!(path.weight(), expected.weight(), "{} -> {}", from, to);
                assert_eq!(path.nodes().first().copied(), expected.nodes().first().copied());
            }
        }
        let path = ch_query.calc_path(0, 3);
        assert_eq!(path.nodes(), &[0, 4, 5, 3]);
        assert_eq!(path.weight(), 5.0);
    }

    #[test]
    fn stalling_does_not_change_results() {
        let graph = ring();
        let weighting = ShortestWeighting::new();
        let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
        let options = QueryOptions {
            stall_on_demand: false,
            ..QueryOptions::default()
        };
        let mut with_sod = ChQuery::new(&graph, &ch, &weighting);
        let mut without_sod = ChQuery::new(&graph, &ch, &weighting).with_options(options);
        for from in 0..6 {
            for to in 0..6 {
                assert_eq!(with_sod.calc_path(from, to).weight(), without_sod.calc_path(from, to).weight());
            }
        }
    }

    #[test]
    fn exact_potentials_keep_results() {
        let graph = ring();
        let weighting = ShortestWeighting::new();
        let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
        let mut query = ChQuery::with_potentials(
            &graph,
            &ch,
            &weighting,
            PerfectPotential::new(&graph, &weighting),
            PerfectPotential::reversed(&graph, &weighting),
        );
        assert_eq!(query.name(), "ch_astar");
        let path = query.calc_path(1, 5);
        assert_eq!(path.weight(), 5.0);
        assert_eq!(path.nodes(), &[1, 2, 3, 5]);
        assert_eq!(query.calc_path(4, 2).weight(), 5.0);
    }

    #[test]
    fn limits_abort_the_search() {
        let graph = ring();
        let weighting = ShortestWeighting::new();
        let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
        let options = QueryOptions {
            max_weight: 4.0,
            ..QueryOptions::default()
        };
        let mut query = ChQuery::new(&graph, &ch, &weighting).with_options(options);
        assert!(!query.calc_path(0, 3).is_found());
        assert!(query.calc_path(0, 2).is_found());

        let options = QueryOptions {
            max_visited_nodes: 1,
            ..QueryOptions::default()
        };
        let mut query = ChQuery::new(&graph, &ch, &weighting).with_options(options);
        let path = query.calc_path(0, 3);
        assert!(!path.is_found());
        assert_eq!(path.visited_nodes(), 1);
    }

    #[test]
    fn trivial_queries() {
        let graph = ring();
        let weighting = ShortestWeighting::new();
        let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
        let mut query = ChQuery::new(&graph, &ch, &weighting);
        let path = query.calc_path(2, 2);
        assert!(path.is_found());
        assert_eq!(path.weight(), 0.0);
        assert_eq!(query.name(), "ch");
    }
}
