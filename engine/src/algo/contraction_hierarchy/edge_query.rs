//! Edge based CH queries with turn costs and edge constraints.
//!
//! Forward states are the last original edge key of the arc they were reached by, backward states the first one.
//! Turn costs are applied between the last original edge of one arc and the first original edge of the next.
//! The searches meet at a node where a forward state arrives and a backward state departs,
//! paying the turn between the two.

use super::query::ChSearchData;
use super::unpacking::unpack_arcs;
use super::*;
use crate::algo::dijkstra::{State, NO_STATE};
use crate::weighting::Weighting;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Meeting {
    forward: u32,
    backward: u32,
}

pub struct EdgeChQuery<'a, G, C, W: ?Sized> {
    graph: &'a G,
    ch: &'a C,
    weighting: &'a W,
    options: QueryOptions,
    forward: ChSearchData,
    backward: ChSearchData,
    // states labeled so far, per node
    forward_at: FxHashMap<NodeId, Vec<u32>>,
    backward_at: FxHashMap<NodeId, Vec<u32>>,
    query: Query,
    best: Weight,
    meeting: Option<Meeting>,
    visited_nodes: usize,
}

impl<'a, G: RoadGraph, C: ChGraph, W: Weighting + ?Sized> EdgeChQuery<'a, G, C, W> {
    pub fn new(graph: &'a G, ch: &'a C, weighting: &'a W) -> Self {
        assert!(ch.is_edge_based(), "edge based query on a node based hierarchy");
        assert_eq!(graph.num_nodes(), ch.num_nodes());
        let num_states = graph.num_keys();
        EdgeChQuery {
            graph,
            ch,
            weighting,
            options: QueryOptions::default(),
            forward: ChSearchData::new(num_states),
            backward: ChSearchData::new(num_states),
            forward_at: FxHashMap::default(),
            backward_at: FxHashMap::default(),
            query: Query::new(NO_NODE, NO_NODE),
            best: INFINITY,
            meeting: None,
            visited_nodes: 0,
        }
    }

    /// `stall_on_demand` is ignored, edge based labels cannot be compared across states.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    fn init(&mut self, query: Query) {
        self.forward.reset();
        self.backward.reset();
        self.forward_at.clear();
        self.backward_at.clear();
        self.query = query;
        self.best = INFINITY;
        self.meeting = None;
        self.visited_nodes = 0;

        let max_weight = self.options.max_weight;
        for arc in self.ch.upward_out(query.from) {
            if !query.accepts_first_edge(orig_edge(arc.first_orig)) || arc.weight > max_weight {
                continue;
            }
            if self.forward.relax(arc.last_orig, arc.adj, arc.weight, arc.weight, (NO_STATE, arc.key)) {
                self.forward_at.entry(arc.adj).or_default().push(arc.last_orig);
            }
        }
        for arc in self.ch.upward_in(query.to) {
            if !query.accepts_last_edge(orig_edge(arc.last_orig)) || arc.weight > max_weight {
                continue;
            }
            if self.backward.relax(arc.first_orig, arc.adj, arc.weight, arc.weight, (NO_STATE, arc.key)) {
                self.backward_at.entry(arc.adj).or_default().push(arc.first_orig);
            }
        }
    }

    fn candidate(&mut self, total: Weight, forward: u32, backward: u32) {
        if total < self.best {
            self.best = total;
            self.meeting = Some(Meeting { forward, backward });
        }
    }

    fn settle_forward(&mut self) {
        let State { id, .. } = match self.forward.queue.pop() {
            Some(state) => state,
            None => return,
        };
        let node = self.forward.node(id);
        let weight = self.forward.weight(id);
        let in_edge = orig_edge(id);

        if node == self.query.to && self.query.accepts_last_edge(in_edge) {
            self.candidate(weight, id, NO_STATE);
        }
        if let Some(states) = self.backward_at.get(&node) {
            let mut best = (INFINITY, NO_STATE);
            for &state in states {
                let total = weight + self.weighting.turn_weight(in_edge, node, orig_edge(state)) + self.backward.weight(state);
                if total < best.0 {
                    best = (total, state);
                }
            }
            self.candidate(best.0, id, best.1);
        }

        let max_weight = self.options.max_weight.min(self.best);
        let ch = self.ch;
        for arc in ch.upward_out(node) {
            let turn = self.weighting.turn_weight(in_edge, node, orig_edge(arc.first_orig));
            let next_weight = weight + turn + arc.weight;
            if next_weight > max_weight || next_weight >= self.forward.weight(arc.last_orig) {
                continue;
            }
            let labeled = self.forward.weight(arc.last_orig) < INFINITY;
            if self.forward.relax(arc.last_orig, arc.adj, next_weight, next_weight, (id, arc.key)) && !labeled {
                self.forward_at.entry(arc.adj).or_default().push(arc.last_orig);
            }
        }
    }

    fn settle_backward(&mut self) {
        let State { id, .. } = match self.backward.queue.pop() {
            Some(state) => state,
            None => return,
        };
        let node = self.backward.node(id);
        let weight = self.backward.weight(id);
        let out_edge = orig_edge(id);

        if node == self.query.from && self.query.accepts_first_edge(out_edge) {
            self.candidate(weight, NO_STATE, id);
        }
        if let Some(states) = self.forward_at.get(&node) {
            let mut best = (INFINITY, NO_STATE);
            for &state in states {
                let total = self.forward.weight(state) + self.weighting.turn_weight(orig_edge(state), node, out_edge) + weight;
                if total < best.0 {
                    best = (total, state);
                }
            }
            self.candidate(best.0, best.1, id);
        }

        let max_weight = self.options.max_weight.min(self.best);
        let ch = self.ch;
        for arc in ch.upward_in(node) {
            let turn = self.weighting.turn_weight(orig_edge(arc.last_orig), node, out_edge);
            let next_weight = weight + turn + arc.weight;
            if next_weight > max_weight || next_weight >= self.backward.weight(arc.first_orig) {
                continue;
            }
            let labeled = self.backward.weight(arc.first_orig) < INFINITY;
            if self.backward.relax(arc.first_orig, arc.adj, next_weight, next_weight, (id, arc.key)) && !labeled {
                self.backward_at.entry(arc.adj).or_default().push(arc.first_orig);
            }
        }
    }

    fn run(&mut self, query: Query) -> bool {
        self.init(query);
        loop {
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
        self.best <= self.options.max_weight && self.meeting.is_some()
    }
}

impl<'a, G: RoadGraph, C: ChGraph, W: Weighting + ?Sized> QueryServer for EdgeChQuery<'a, G, C, W> {
    fn query(&mut self, query: Query) -> Path {
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
        let meeting = match self.meeting {
            Some(meeting) => meeting,
            None => return Path::not_found(self.visited_nodes),
        };

        let mut arcs = if meeting.forward != NO_STATE { self.forward.arcs_to(meeting.forward) } else { Vec::new() };
        arcs.reverse();
        if meeting.backward != NO_STATE {
            arcs.extend(self.backward.arcs_to(meeting.backward));
        }
        let edges = unpack_arcs(self.graph, self.ch, &arcs);
        Path::from_edges(self.weighting, true, query.from, &edges, self.visited_nodes)
    }

    fn visited_nodes(&self) -> usize {
        self.visited_nodes
    }

    fn name(&self) -> &'static str {
        "ch_edge_based"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::dijkstra::Dijkstra;
    use crate::datastr::graph::base_graph::*;
    use crate::datastr::graph::TurnCostStorage;
    use crate::weighting::{ShortestWeighting, TurnCostProvider};
    use std::sync::Arc;

    // 0 - 1 - 2
    //     |   |
    //     3 - 4
    fn square(turn_costs: TurnCostStorage) -> (BaseGraph, ShortestWeighting) {
        let mut builder = GraphBuilder::new();
        for i in 0..5 {
            builder.add_node(50.0 + if i >= 3 { 0.01 } else { 0.0 }, 8.0 + [0.0, 0.01, 0.02, 0.01, 0.02][i] as f64);
        }
        let flags = EdgeFlags::both_directions(50.0);
        builder.add_edge(0, 1, 1.0, flags);
        builder.add_edge(1, 2, 1.0, flags);
        builder.add_edge(1, 3, 1.0, flags);
        builder.add_edge(2, 4, 1.0, flags);
        builder.add_edge(3, 4, 1.0, flags);
        let weighting = ShortestWeighting::new().with_turn_costs(TurnCostProvider::new(Arc::new(turn_costs)));
        (builder.freeze(), weighting)
    }

    #[test]
    fn matches_edge_based_dijkstra() {
        let mut turn_costs = TurnCostStorage::new();
        turn_costs.set(1, 0, 1, 3.0);
        turn_costs.restrict(4, 3, 4);
        let (graph, weighting) = square(turn_costs);
        let ch = prepare_ch(&graph, &weighting, ChConfig::edge_based()).unwrap();
        let mut query = EdgeChQuery::new(&graph, &ch, &weighting);
        let mut dijkstra = Dijkstra::new(&graph, &weighting, TraversalMode::EdgeBased);
        for from in 0..5 {
            for to in 0..5 {
                let expected = dijkstra.calc_path(from, to);
                let path = query.calc_path(from, to);
                assert_eq!(path.weight(), expected.weight(), "{} -> {}", from, to);
                assert_eq!(path.is_found(), expected.is_found());
            }
        }
        // the turn from 0 via 1 towards 2 costs extra
        let path = query.calc_path(0, 2);
        assert_eq!(path.nodes(), &[0, 1, 3, 4, 2]);
        assert_eq!(path.weight(), 4.0);
    }

    #[test]
    fn restrictions_force_detours() {
        let mut turn_costs = TurnCostStorage::new();
        // 0 -> 1 -> 3 is forbidden
        turn_costs.restrict(1, 0, 2);
        let (graph, weighting) = square(turn_costs);
        let ch = prepare_ch(&graph, &weighting, ChConfig::edge_based()).unwrap();
        let mut query = EdgeChQuery::new(&graph, &ch, &weighting);
        let path = query.calc_path(0, 3);
        assert_eq!(path.nodes(), &[0, 1, 2, 4, 3]);
        assert_eq!(path.weight(), 4.0);
    }

    #[test]
    fn edge_constraints() {
        let (graph, weighting) = square(TurnCostStorage::new());
        let ch = prepare_ch(&graph, &weighting, ChConfig::edge_based()).unwrap();
        let mut query = EdgeChQuery::new(&graph, &ch, &weighting);

        let path = query.calc_path_directed(1, 4, ANY_EDGE, 4);
        assert_eq!(path.nodes(), &[1, 3, 4]);
        let path = query.calc_path_directed(1, 4, 1, ANY_EDGE);
        assert_eq!(path.nodes(), &[1, 2, 4]);
        // leaving over edge 2 and arriving over edge 3 needs a u-turn
        assert!(!query.calc_path_directed(1, 4, 2, 3).is_found());
        assert!(!query.calc_path_directed(1, 4, NO_EDGE, ANY_EDGE).is_found());

        // a round trip through the square
        let path = query.calc_path_directed(1, 1, 1, 2);
        assert_eq!(path.nodes(), &[1, 2, 4, 3, 1]);
        assert_eq!(path.weight(), 4.0);
        assert!(query.calc_path(1, 1).nodes().is_empty());
    }
}
