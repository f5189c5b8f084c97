//! Node based contraction: shortcuts between in- and out-neighbors.

use super::prepare::Contractor;
use super::preparation_graph::*;
use super::witness_search::*;
use super::*;

#[derive(Debug)]
pub(super) struct NodeContractor {
    witness_search: NodeWitnessSearch,
    contracted_neighbors: Vec<u32>,
    heuristic_settled_factor: f64,
    contraction_settled_factor: f64,
    mean_degree: f64,
}

impl NodeContractor {
    pub fn new(num_nodes: usize, params: &ContractionParams) -> Self {
        NodeContractor {
            witness_search: NodeWitnessSearch::new(num_nodes),
            contracted_neighbors: vec![0; num_nodes],
            heuristic_settled_factor: params.witness_settled_factor_heuristic,
            contraction_settled_factor: params.witness_settled_factor_contraction,
            mean_degree: 1.0,
        }
    }

    /// Calls `found` for every pair of in- and out-arc of `node` without a witness.
    fn find_shortcuts(&mut self, graph: &PreparationGraph, node: NodeId, max_settled: usize, mut found: impl FnMut(ShortcutCandidate)) {
        let out_arcs = graph.out_arcs(node);
        let max_out = out_arcs.iter().map(|arc| arc.weight).fold(0.0, Weight::max);

        for in_arc in graph.in_arcs(node) {
            let from = in_arc.other;
            self.witness_search.run(graph, from, node, in_arc.weight + max_out, max_settled);
            for out_arc in out_arcs {
                if out_arc.other == from {
                    continue;
                }
                let via_weight = in_arc.weight + out_arc.weight;
                if self.witness_search.weight(out_arc.other) <= via_weight {
                    continue;
                }
                found(ShortcutCandidate {
                    from,
                    to: out_arc.other,
                    weight: via_weight,
                    skip1: in_arc.key,
                    skip2: out_arc.key,
                    first_orig: in_arc.first_orig,
                    last_orig: out_arc.last_orig,
                    orig_edge_count: in_arc.orig_edge_count + out_arc.orig_edge_count,
                });
            }
        }
    }
}

impl Contractor for NodeContractor {
    /// `10 * edge difference + original edges of the new shortcuts + contracted neighbors`
    fn priority(&mut self, graph: &PreparationGraph, node: NodeId) -> Weight {
        let mut num_shortcuts = 0i64;
        let mut orig_edges = 0i64;
        let max_settled = settled_limit(self.heuristic_settled_factor, self.mean_degree);
        self.find_shortcuts(graph, node, max_settled, |candidate| {
            num_shortcuts += 1;
            orig_edges += candidate.orig_edge_count as i64;
        });
        let edge_difference = num_shortcuts - graph.degree(node) as i64;
        (10 * edge_difference + orig_edges + self.contracted_neighbors[node as usize] as i64) as Weight
    }

    fn contract(&mut self, graph: &mut PreparationGraph, node: NodeId) -> Vec<NodeId> {
        let mut candidates = Vec::new();
        let max_settled = settled_limit(self.contraction_settled_factor, self.mean_degree);
        self.find_shortcuts(graph, node, max_settled, |candidate| candidates.push(candidate));
        for candidate in candidates {
            graph.add_or_update_shortcut(candidate);
        }
        let neighbors = graph.disconnect(node);
        for &neighbor in &neighbors {
            self.contracted_neighbors[neighbor as usize] += 1;
        }
        neighbors
    }

    fn set_mean_degree(&mut self, mean_degree: f64) {
        self.mean_degree = mean_degree;
    }
}
