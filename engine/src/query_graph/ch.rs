//! A query graph on top of a contraction hierarchy.

use super::*;
use crate::algo::contraction_hierarchy::*;
use crate::datastr::node_order::Level;

/// Exposes a `ContractionHierarchy` with the virtual nodes and edges of a `QueryGraph`.
///
/// Virtual nodes get the highest level and their edges are always relaxed, in both directions.
/// Real nodes next to a split edge additionally get arcs towards the virtual nodes.
/// Shortcuts and original arcs stay untouched, so paths through snapped positions of other snaps
/// may also follow the unsplit edge.
///
/// Virtual arc keys are shifted above the hierarchy's key space, `expand` maps them back to query graph keys.
pub struct QueryChGraph<'a, G> {
    ch: &'a ContractionHierarchy,
    query_graph: &'a QueryGraph<'a, G>,
    ch_keys: u32,
    out_arcs: FxHashMap<NodeId, Vec<ChArc>>,
    in_arcs: FxHashMap<NodeId, Vec<ChArc>>,
}

impl<'a, G: RoadGraph> QueryChGraph<'a, G> {
    /// `weighting` must be the one the hierarchy was built with, it weighs the virtual edges.
    pub fn new<W: Weighting + ?Sized>(ch: &'a ContractionHierarchy, query_graph: &'a QueryGraph<'a, G>, weighting: &W) -> Self {
        assert_eq!(ch.num_nodes(), query_graph.num_base_nodes(), "hierarchy and query graph do not match");
        assert_eq!(ch.num_edges(), query_graph.num_base_edges(), "hierarchy and query graph do not match");
        let ch_keys = ch.num_keys() as u32;
        let virtual_keys_start = 2 * query_graph.num_base_edges() as u32;

        let mut out_arcs = FxHashMap::default();
        let mut in_arcs = FxHashMap::default();
        for node in query_graph.changed_nodes() {
            let (mut out, mut inc) = if query_graph.is_virtual_node(node) {
                (Vec::new(), Vec::new())
            } else {
                (ch.upward_out(node).to_vec(), ch.upward_in(node).to_vec())
            };
            for state in query_graph.link_iter(node).filter(|state| query_graph.is_virtual_edge(state.edge)) {
                let key = state.key();
                let forward = weighting.edge_weight(&state, false);
                if forward < INFINITY {
                    out.push(ChArc {
                        key: ch_keys + key - virtual_keys_start,
                        adj: state.adj,
                        weight: forward,
                        first_orig: key,
                        last_orig: key,
                    });
                }
                let backward = weighting.edge_weight(&state, true);
                if backward < INFINITY {
                    let key = reverse_key(key);
                    inc.push(ChArc {
                        key: ch_keys + key - virtual_keys_start,
                        adj: state.adj,
                        weight: backward,
                        first_orig: key,
                        last_orig: key,
                    });
                }
            }
            out_arcs.insert(node, out);
            in_arcs.insert(node, inc);
        }

        QueryChGraph {
            ch,
            query_graph,
            ch_keys,
            out_arcs,
            in_arcs,
        }
    }

    pub fn query_graph(&self) -> &'a QueryGraph<'a, G> {
        self.query_graph
    }
}

impl<'a, G: RoadGraph> ChGraph for QueryChGraph<'a, G> {
    fn num_nodes(&self) -> usize {
        self.query_graph.num_nodes()
    }

    fn level(&self, node: NodeId) -> Level {
        if self.query_graph.is_virtual_node(node) {
            Level::MAX
        } else {
            self.ch.level(node)
        }
    }

    fn upward_out(&self, node: NodeId) -> &[ChArc] {
        match self.out_arcs.get(&node) {
            Some(arcs) => arcs,
            None => self.ch.upward_out(node),
        }
    }

    fn upward_in(&self, node: NodeId) -> &[ChArc] {
        match self.in_arcs.get(&node) {
            Some(arcs) => arcs,
            None => self.ch.upward_in(node),
        }
    }

    fn is_edge_based(&self) -> bool {
        self.ch.is_edge_based()
    }

    fn expand(&self, key: EdgeKey) -> ChEdge {
        if key >= self.ch_keys {
            ChEdge::Original(key - self.ch_keys + 2 * self.query_graph.num_base_edges() as EdgeKey)
        } else {
            self.ch.expand(key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::dijkstra::Dijkstra;
    use crate::algo::*;
    use crate::datastr::graph::base_graph::*;
    use crate::weighting::*;
    use std::sync::Arc;

    // 0 - 1 - 2
    // |   |   |
    // 3 - 4 - 5
    fn ladder() -> BaseGraph {
        let mut builder = GraphBuilder::new();
        for i in 0..6 {
            builder.add_node(50.0 + (i / 3) as f64 * 0.01, 8.0 + (i % 3) as f64 * 0.01);
        }
        let flags = EdgeFlags::both_directions(50.0);
        builder.add_edge(0, 1, 10.0, flags);
        builder.add_edge(1, 2, 12.0, flags);
        builder.add_edge(3, 4, 9.0, flags);
        builder.add_edge(4, 5, 11.0, flags);
        builder.add_edge(0, 3, 5.0, flags);
        builder.add_edge(1, 4, 6.0, EdgeFlags::one_way(50.0));
        builder.add_edge(2, 5, 7.0, flags);
        builder.freeze()
    }

    fn snaps() -> Vec<Snap> {
        vec![Snap::new(0, 0.3), Snap::new(3, 0.6), Snap::new(5, 0.5), Snap::new(1, 1.0)]
    }

    #[test]
    fn node_based_matches_dijkstra_on_the_query_graph() {
        let graph = ladder();
        let weighting = ShortestWeighting::new();
        let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
        let query_graph = QueryGraph::lookup(&graph, &snaps()).unwrap();
        let wrapped = query_graph.wrap_weighting(weighting.clone());
        let query_ch = QueryChGraph::new(&ch, &query_graph, &weighting);
        assert_eq!(query_ch.level(6), Level::MAX);

        let mut ch_query = ChQuery::new(&query_graph, &query_ch, &wrapped);
        let mut dijkstra = Dijkstra::new(&query_graph, &wrapped, TraversalMode::NodeBased);
        for i in 0..4 {
            for j in 0..4 {
                let (from, to) = (query_graph.snapped_node(i), query_graph.snapped_node(j));
                let expected = dijkstra.calc_path(from, to);
                let path = ch_query.calc_path(from, to);
                assert!((path.weight() - expected.weight()).abs() < 1e-6, "{} -> {}", from, to);
                assert!((path.distance() - expected.distance()).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn edge_based_matches_dijkstra_on_the_query_graph() {
        let graph = ladder();
        let mut turn_costs = TurnCostStorage::new();
        turn_costs.set(1, 0, 5, 4.0);
        turn_costs.restrict(4, 2, 3);
        let weighting = ShortestWeighting::new().with_turn_costs(TurnCostProvider::new(Arc::new(turn_costs)));
        let ch = prepare_ch(&graph, &weighting, ChConfig::edge_based()).unwrap();
        let query_graph = QueryGraph::lookup(&graph, &snaps()).unwrap();
        let wrapped = query_graph.wrap_weighting(weighting.clone());
        let query_ch = QueryChGraph::new(&ch, &query_graph, &weighting);

        let mut ch_query = EdgeChQuery::new(&query_graph, &query_ch, &wrapped);
        let mut dijkstra = Dijkstra::new(&query_graph, &wrapped, TraversalMode::EdgeBased);
        for i in 0..4 {
            for j in 0..4 {
                let (from, to) = (query_graph.snapped_node(i), query_graph.snapped_node(j));
                let expected = dijkstra.calc_path(from, to);
                let path = ch_query.calc_path(from, to);
                assert_eq!(path.is_found(), expected.is_found(), "{} -> {}", from, to);
                assert!((path.weight() - expected.weight()).abs() < 1e-6 || path.weight() == expected.weight(), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn virtual_keys_unpack_to_query_graph_keys() {
        let graph = ladder();
        let weighting = ShortestWeighting::new();
        let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
        let query_graph = QueryGraph::lookup(&graph, &snaps()).unwrap();
        let query_ch = QueryChGraph::new(&ch, &query_graph, &weighting);
        let virtual_node = query_graph.snapped_node(0);
        assert!(query_graph.is_virtual_node(virtual_node));
        assert_eq!(query_ch.upward_out(virtual_node).len(), 2);
        for arc in query_ch.upward_out(virtual_node) {
            match query_ch.expand(arc.key) {
                ChEdge::Original(key) => {
                    let state = query_graph.edge_state_by_key(key);
                    assert_eq!((state.base, state.adj), (virtual_node, arc.adj));
                    assert_eq!(key, arc.first_orig);
                }
                ChEdge::Shortcut(..) => panic!("virtual arcs are never shortcuts"),
            }
        }
    }
}
