//! Edge based contraction.
//!
//! With turn costs the best way through a node depends on the edge a path arrives with.
//! For every in-neighbor `u` of the contracted node `v` and every original edge arriving at `u`
//! (and for paths starting at `u`), all bridge paths `u -> v (-> loops at v)* -> w` are collected.
//! A bridge path needs a shortcut unless a witness search from `u` avoiding `v` reaches `w` with the same
//! last original edge and at most the same weight. Bridge paths over loops yield nested shortcuts.

use super::prepare::Contractor;
use super::preparation_graph::*;
use super::witness_search::*;
use super::*;
use crate::util::NonNan;
use crate::weighting::Weighting;
use rustc_hash::FxHashMap;
use std::{cmp::Reverse, collections::BinaryHeap};

const NO_PARENT: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct BridgeEntry {
    weight: Weight,
    arc: PrepArc,
    parent: usize,
}

/// Arcs `u -> v`, loops at `v`, and an exit arc `v -> w`.
/// `weight` includes the turn from the edge the search started with.
#[derive(Debug, Clone)]
struct Bridge {
    weight: Weight,
    chain: Vec<PrepArc>,
}

impl Bridge {
    fn exit(&self) -> &PrepArc {
        &self.chain[self.chain.len() - 1]
    }
}

#[derive(Debug, Default)]
struct BridgeSearch {
    entries: Vec<BridgeEntry>,
    best: FxHashMap<EdgeKey, usize>,
    queue: BinaryHeap<Reverse<(NonNan, usize)>>,
}

impl BridgeSearch {
    fn push(&mut self, entry: BridgeEntry) {
        if entry.weight == INFINITY {
            return;
        }
        if let Some(&idx) = self.best.get(&entry.arc.last_orig) {
            if self.entries[idx].weight <= entry.weight {
                return;
            }
        }
        let idx = self.entries.len();
        self.entries.push(entry);
        self.best.insert(entry.arc.last_orig, idx);
        self.queue.push(Reverse((NonNan::key(entry.weight), idx)));
    }

    fn chain(&self, mut idx: usize) -> Vec<PrepArc> {
        let mut chain = Vec::new();
        while idx != NO_PARENT {
            chain.push(self.entries[idx].arc);
            idx = self.entries[idx].parent;
        }
        chain.reverse();
        chain
    }
}

pub(super) struct EdgeContractor<'a, W: ?Sized> {
    weighting: &'a W,
    witness_search: EdgeWitnessSearch,
    hierarchy_depths: Vec<u32>,
    heuristic_settled_factor: f64,
    contraction_settled_factor: f64,
    mean_degree: f64,
}

impl<'a, W: Weighting + ?Sized> EdgeContractor<'a, W> {
    pub fn new(graph: &PreparationGraph, weighting: &'a W, params: &ContractionParams) -> Self {
        EdgeContractor {
            weighting,
            witness_search: EdgeWitnessSearch::new(graph.num_orig_keys()),
            hierarchy_depths: vec![0; graph.num_nodes()],
            heuristic_settled_factor: params.witness_settled_factor_heuristic,
            contraction_settled_factor: params.witness_settled_factor_contraction,
            mean_degree: 1.0,
        }
    }

    fn turn_weight(&self, in_key: EdgeKey, via: NodeId, out_key: EdgeKey) -> Weight {
        self.weighting.turn_weight(orig_edge(in_key), via, orig_edge(out_key))
    }

    /// Cheapest bridge paths from `from` (entered with `in_key`) through `node`, one per last original key.
    fn find_bridges(&self, graph: &PreparationGraph, from: NodeId, in_key: EdgeKey, node: NodeId) -> Vec<Bridge> {
        let mut search = BridgeSearch::default();
        for &arc in graph.out_arcs(from).iter().filter(|arc| arc.other == node) {
            search.push(BridgeEntry {
                weight: self.turn_weight(in_key, from, arc.first_orig) + arc.weight,
                arc,
                parent: NO_PARENT,
            });
        }

        let mut settled = Vec::new();
        while let Some(Reverse((_, idx))) = search.queue.pop() {
            let entry = search.entries[idx];
            if search.best.get(&entry.arc.last_orig) != Some(&idx) {
                continue;
            }
            settled.push(idx);
            for &arc in graph.out_arcs(node).iter().filter(|arc| arc.other == node) {
                search.push(BridgeEntry {
                    weight: entry.weight + self.turn_weight(entry.arc.last_orig, node, arc.first_orig) + arc.weight,
                    arc,
                    parent: idx,
                });
            }
        }

        let mut exits: FxHashMap<EdgeKey, (Weight, usize, PrepArc)> = FxHashMap::default();
        for idx in settled {
            let entry = search.entries[idx];
            for &arc in graph.out_arcs(node).iter().filter(|arc| arc.other != node) {
                let weight = entry.weight + self.turn_weight(entry.arc.last_orig, node, arc.first_orig) + arc.weight;
                if weight < exits.get(&arc.last_orig).map_or(INFINITY, |exit| exit.0) {
                    exits.insert(arc.last_orig, (weight, idx, arc));
                }
            }
        }

        let mut bridges: Vec<Bridge> = exits
            .into_values()
            .map(|(weight, idx, exit)| {
                let mut chain = search.chain(idx);
                chain.push(exit);
                Bridge { weight, chain }
            })
            .collect();
        bridges.sort_by_key(|bridge| bridge.exit().last_orig);
        bridges
    }

    /// All bridge paths through `node` without a witness, with the node they start at.
    fn find_shortcuts(&mut self, graph: &PreparationGraph, node: NodeId, max_settled: usize) -> Vec<(NodeId, Bridge)> {
        let mut sources: Vec<NodeId> = graph.in_arcs(node).iter().map(|arc| arc.other).filter(|&other| other != node).collect();
        sources.sort_unstable();
        sources.dedup();

        let weighting = self.weighting;
        let mut needed = Vec::new();
        for from in sources {
            for in_key in graph.orig_in_keys(from).iter().copied().chain(std::iter::once(NO_KEY)) {
                let bridges = self.find_bridges(graph, from, in_key, node);
                let max_weight = bridges.iter().map(|bridge| bridge.weight).fold(0.0, Weight::max);
                if bridges.is_empty() {
                    continue;
                }
                self.witness_search.run(graph, weighting, from, in_key, node, max_weight, max_settled);
                for bridge in bridges {
                    let exit = bridge.exit();
                    // arriving where we started, with the same edge, for free
                    if exit.other == from && in_key != NO_KEY && exit.last_orig == in_key {
                        continue;
                    }
                    if self.witness_search.weight(exit.last_orig) <= bridge.weight {
                        continue;
                    }
                    needed.push((from, bridge));
                }
            }
        }
        needed
    }

    /// The shortcuts for a bridge path: nested ones ending at `node` for each loop, then the one to the exit.
    fn candidates(&self, from: NodeId, node: NodeId, bridge: &Bridge) -> Vec<ShortcutCandidate> {
        let first = bridge.chain[0];
        let mut current = (first.key, first.weight, first.last_orig, first.orig_edge_count);
        let mut candidates = Vec::with_capacity(bridge.chain.len() - 1);
        for arc in &bridge.chain[1..] {
            let (key, weight, last_orig, orig_edge_count) = current;
            let candidate = ShortcutCandidate {
                from,
                to: arc.other,
                weight: weight + self.turn_weight(last_orig, node, arc.first_orig) + arc.weight,
                skip1: key,
                skip2: arc.key,
                first_orig: first.first_orig,
                last_orig: arc.last_orig,
                orig_edge_count: orig_edge_count + arc.orig_edge_count,
            };
            candidates.push(candidate);
            // the key is filled in once the nested shortcut is recorded
            current = (NO_KEY, candidate.weight, candidate.last_orig, candidate.orig_edge_count);
        }
        candidates
    }

    fn add_shortcuts(&self, graph: &mut PreparationGraph, from: NodeId, node: NodeId, bridge: &Bridge) {
        let mut candidates = self.candidates(from, node, bridge);
        let last = candidates.pop().expect("bridge paths consist of at least two arcs");
        if graph.has_shortcut_as_good(&last) {
            return;
        }
        let mut skip = None;
        for mut candidate in candidates {
            if let Some(key) = skip {
                candidate.skip1 = key;
            }
            assert_eq!(candidate.to, node, "nested shortcuts end at the contracted node");
            skip = Some(graph.add_nested_shortcut(candidate));
        }
        let last = match skip {
            Some(key) => ShortcutCandidate { skip1: key, ..last },
            None => last,
        };
        graph.add_or_update_shortcut(last);
    }
}

impl<'a, W: Weighting + ?Sized> Contractor for EdgeContractor<'a, W> {
    /// `100 * edge quotient + 100 * original edge quotient + 20 * hierarchy depth`
    fn priority(&mut self, graph: &PreparationGraph, node: NodeId) -> Weight {
        let degree = graph.degree(node);
        if degree == 0 {
            return -INFINITY;
        }
        let max_settled = settled_limit(self.heuristic_settled_factor, self.mean_degree);
        let mut shortcuts: FxHashMap<(NodeId, NodeId, EdgeKey, EdgeKey), u32> = FxHashMap::default();
        for (from, bridge) in self.find_shortcuts(graph, node, max_settled) {
            if let Some(candidate) = self.candidates(from, node, &bridge).pop() {
                if !graph.has_shortcut_as_good(&candidate) {
                    shortcuts.insert((candidate.from, candidate.to, candidate.first_orig, candidate.last_orig), candidate.orig_edge_count);
                }
            }
        }
        let prev_orig_edges: u32 = graph.in_arcs(node).iter().chain(graph.out_arcs(node)).map(|arc| arc.orig_edge_count).sum();
        let orig_edges: u32 = shortcuts.values().sum();
        let edge_quotient = shortcuts.len() as Weight / degree as Weight;
        let orig_edge_quotient = orig_edges as Weight / prev_orig_edges as Weight;
        100.0 * edge_quotient + 100.0 * orig_edge_quotient + 20.0 * self.hierarchy_depths[node as usize] as Weight
    }

    fn contract(&mut self, graph: &mut PreparationGraph, node: NodeId) -> Vec<NodeId> {
        let max_settled = settled_limit(self.contraction_settled_factor, self.mean_degree);
        for (from, bridge) in self.find_shortcuts(graph, node, max_settled) {
            self.add_shortcuts(graph, from, node, &bridge);
        }
        let neighbors = graph.disconnect(node);
        let depth = self.hierarchy_depths[node as usize] + 1;
        for &neighbor in &neighbors {
            let neighbor_depth = &mut self.hierarchy_depths[neighbor as usize];
            *neighbor_depth = (*neighbor_depth).max(depth);
        }
        neighbors
    }

    fn set_mean_degree(&mut self, mean_degree: f64) {
        self.mean_degree = mean_degree;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastr::graph::base_graph::*;
    use crate::datastr::graph::TurnCostStorage;
    use crate::weighting::{ShortestWeighting, TurnCostProvider};
    use std::sync::Arc;

    //   3
    //   |
    // 0 - 1 - 2
    // loop at 1 (edge 3)
    fn junction(turn_costs: TurnCostStorage) -> (BaseGraph, ShortestWeighting) {
        let mut builder = GraphBuilder::new();
        for i in 0..4 {
            builder.add_node(50.0 + if i == 3 { 0.001 } else { 0.0 }, 8.0 + (i % 3) as f64 * 0.001);
        }
        builder.add_edge(0, 1, 1.0, EdgeFlags::both_directions(50.0));
        builder.add_edge(1, 2, 1.0, EdgeFlags::both_directions(50.0));
        builder.add_edge(1, 3, 1.0, EdgeFlags::both_directions(50.0));
        builder.add_edge(1, 1, 2.0, EdgeFlags::one_way(50.0));
        let weighting = ShortestWeighting::new().with_turn_costs(TurnCostProvider::new(Arc::new(turn_costs)));
        (builder.freeze(), weighting)
    }

    fn shortcuts_from(graph: &PreparationGraph, from: NodeId) -> Vec<PrepArc> {
        graph.out_arcs(from).iter().filter(|arc| arc.key >= 8).copied().collect()
    }

    #[test]
    fn shortcuts_connect_all_neighbors_without_turn_costs() {
        let (graph, weighting) = junction(TurnCostStorage::new());
        let mut prep = PreparationGraph::new(&graph, &weighting, true);
        let mut contractor = EdgeContractor::new(&prep, &weighting, &ContractionParams::edge_based());
        assert_eq!(contractor.contract(&mut prep, 1), vec![0, 2, 3]);
        // paths starting at a neighbor may also turn around through the loop
        for from in [0, 2, 3] {
            let mut targets: Vec<NodeId> = shortcuts_from(&prep, from).iter().map(|arc| arc.other).collect();
            targets.sort_unstable();
            assert_eq!(targets, vec![0, 2, 3]);
        }
        for arc in shortcuts_from(&prep, 0) {
            if arc.other == 0 {
                assert_eq!((arc.weight, arc.orig_edge_count), (4.0, 3));
            } else {
                assert_eq!((arc.weight, arc.orig_edge_count), (2.0, 2));
            }
        }
    }

    #[test]
    fn restricted_turns_go_through_the_loop() {
        let mut turn_costs = TurnCostStorage::new();
        // straight on from 0 to 2 is forbidden
        turn_costs.restrict(1, 0, 1);
        let (graph, weighting) = junction(turn_costs);
        let mut prep = PreparationGraph::new(&graph, &weighting, true);
        let mut contractor = EdgeContractor::new(&prep, &weighting, &ContractionParams::edge_based());
        contractor.contract(&mut prep, 1);
        let to_two: Vec<PrepArc> = shortcuts_from(&prep, 0).into_iter().filter(|arc| arc.other == 2).collect();
        assert_eq!(to_two.len(), 1);
        // 0 -> 1, loop, 1 -> 2
        assert_eq!(to_two[0].weight, 4.0);
        assert_eq!(to_two[0].orig_edge_count, 3);
        assert_eq!(to_two[0].first_orig, edge_key(0, false));
        assert_eq!(to_two[0].last_orig, edge_key(1, false));
        // nested shortcuts over the loop are recorded without arcs
        assert_eq!(prep.num_shortcuts(), 13);
        assert_eq!(prep.in_arcs(2).iter().filter(|arc| arc.key >= 8).count(), 3);
    }
}
