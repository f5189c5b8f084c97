//! Local searches looking for paths which make a shortcut unnecessary.
//!
//! Both searches ignore the node being contracted and give up after a number of settled states.
//! Giving up early only costs superfluous shortcuts, never correctness.

use super::preparation_graph::*;
use super::*;
use crate::algo::dijkstra::State;
use crate::datastr::{index_heap::*, timestamped_vector::*};
use crate::util::NonNan;
use crate::weighting::Weighting;

/// Never settle fewer states than this, even in sparse graphs.
pub(super) const MIN_SETTLED_LIMIT: usize = 10;

pub(super) fn settled_limit(factor: f64, mean_degree: f64) -> usize {
    ((factor * mean_degree) as usize).max(MIN_SETTLED_LIMIT)
}

/// Node based: one to many from an in-neighbor of the contracted node.
#[derive(Debug)]
pub(super) struct NodeWitnessSearch {
    weights: TimestampedVector<Weight>,
    queue: IndexdMinHeap<State>,
}

impl NodeWitnessSearch {
    pub fn new(num_nodes: usize) -> Self {
        NodeWitnessSearch {
            weights: TimestampedVector::new(num_nodes, INFINITY),
            queue: IndexdMinHeap::new(num_nodes),
        }
    }

    pub fn run(&mut self, graph: &PreparationGraph, source: NodeId, avoid: NodeId, max_weight: Weight, max_settled: usize) {
        self.weights.reset();
        self.queue.clear();
        self.weights.set(source as usize, 0.0);
        self.queue.push(State { key: NonNan::key(0.0), id: source });

        let mut settled = 0;
        while let Some(State { key, id: node }) = self.queue.pop() {
            if key.value() > max_weight || settled >= max_settled {
                break;
            }
            settled += 1;
            for arc in graph.out_arcs(node) {
                if arc.other == avoid {
                    continue;
                }
                let weight = key.value() + arc.weight;
                if weight < self.weights[arc.other as usize] {
                    self.weights.set(arc.other as usize, weight);
                    self.queue.push_or_decrease(State { key: NonNan::key(weight), id: arc.other });
                }
            }
        }
    }

    /// Best weight found to `node`, settled or not.
    pub fn weight(&self, node: NodeId) -> Weight {
        self.weights[node as usize]
    }
}

/// Edge based: states are the original keys the search arrived with.
/// Started at a node together with the key the node was entered by, so the first turn is priced.
#[derive(Debug)]
pub(super) struct EdgeWitnessSearch {
    weights: TimestampedVector<Weight>,
    // head node of each labeled key
    nodes: Vec<NodeId>,
    queue: IndexdMinHeap<State>,
}

impl EdgeWitnessSearch {
    pub fn new(num_keys: usize) -> Self {
        EdgeWitnessSearch {
            weights: TimestampedVector::new(num_keys, INFINITY),
            nodes: vec![NO_NODE; num_keys],
            queue: IndexdMinHeap::new(num_keys),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run<W: Weighting + ?Sized>(
        &mut self,
        graph: &PreparationGraph,
        weighting: &W,
        source: NodeId,
        in_key: EdgeKey,
        avoid: NodeId,
        max_weight: Weight,
        max_settled: usize,
    ) {
        self.weights.reset();
        self.queue.clear();
        self.expand(graph, weighting, source, in_key, 0.0, avoid, max_weight);

        let mut settled = 0;
        while let Some(State { key, id }) = self.queue.pop() {
            if key.value() > max_weight || settled >= max_settled {
                break;
            }
            settled += 1;
            let node = self.nodes[id as usize];
            self.expand(graph, weighting, node, id, key.value(), avoid, max_weight);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn expand<W: Weighting + ?Sized>(&mut self, graph: &PreparationGraph, weighting: &W, node: NodeId, in_key: EdgeKey, weight: Weight, avoid: NodeId, max_weight: Weight) {
        for arc in graph.out_arcs(node) {
            if arc.other == avoid {
                continue;
            }
            let turn = weighting.turn_weight(orig_edge(in_key), node, orig_edge(arc.first_orig));
            let next = weight + turn + arc.weight;
            if next <= max_weight && next < self.weights[arc.last_orig as usize] {
                self.weights.set(arc.last_orig as usize, next);
                self.nodes[arc.last_orig as usize] = arc.other;
                self.queue.push_or_decrease(State { key: NonNan::key(next), id: arc.last_orig });
            }
        }
    }

    /// Best weight found arriving with `key`, settled or not.
    pub fn weight(&self, key: EdgeKey) -> Weight {
        self.weights[key as usize]
    }
}
