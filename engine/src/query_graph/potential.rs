//! Goal directed search on query graphs.

use super::*;
use crate::algo::a_star::Potential;

/// Lifts a potential of the wrapped graph to a query graph.
///
/// A virtual target is anchored at the real end points of its split edge: the bound at a real node is the
/// smallest bound towards an end point plus the exact weight from there along the edge to the target.
/// Virtual nodes get the smallest sum of the weight along their edge to an end point and the bound there,
/// or the weight along the edge to the target if both lie on the same edge.
///
/// With `reversed` the wrapped potential has to bound weights from its target, as for backward searches.
pub struct VirtualNodePotential<'q, 'a, G, W: ?Sized, P> {
    query_graph: &'q QueryGraph<'a, G>,
    weighting: &'q W,
    prototype: P,
    reversed: bool,
    anchors: Vec<(P, Weight)>,
    target: NodeId,
}

impl<'q, 'a, G: RoadGraph, W: Weighting + ?Sized, P: Potential + Clone> VirtualNodePotential<'q, 'a, G, W, P> {
    pub fn new(query_graph: &'q QueryGraph<'a, G>, weighting: &'q W, potential: P) -> Self {
        VirtualNodePotential {
            query_graph,
            weighting,
            prototype: potential,
            reversed: false,
            anchors: Vec::new(),
            target: NO_NODE,
        }
    }

    pub fn reversed(query_graph: &'q QueryGraph<'a, G>, weighting: &'q W, potential: P) -> Self {
        VirtualNodePotential {
            reversed: true,
            ..Self::new(query_graph, weighting, potential)
        }
    }

    /// Weight between two positions of a split edge in search direction.
    fn along(&self, split: &SplitEdge, node_position: usize, target_position: usize) -> Weight {
        if self.reversed {
            self.query_graph.weight_along(self.weighting, split, target_position, node_position)
        } else {
            self.query_graph.weight_along(self.weighting, split, node_position, target_position)
        }
    }

    /// Some real node on the split edge of `node`, or `node` itself.
    fn real_node(&self, node: NodeId) -> NodeId {
        match self.query_graph.split_of(node) {
            Some((split, _)) => split.node_at(0),
            None => node,
        }
    }

    fn real_potential(&mut self, node: NodeId) -> Option<Weight> {
        let mut best: Option<Weight> = None;
        for (potential, offset) in &mut self.anchors {
            if let Some(pot) = potential.potential(node) {
                let pot = pot + *offset;
                best = Some(best.map_or(pot, |best| best.min(pot)));
            }
        }
        best
    }
}

impl<'q, 'a, G: RoadGraph, W: Weighting + ?Sized, P: Potential + Clone> Potential for VirtualNodePotential<'q, 'a, G, W, P> {
    fn init(&mut self, source: NodeId, target: NodeId) {
        self.target = target;
        self.anchors.clear();
        let source = self.real_node(source);
        let query_graph = self.query_graph;
        match query_graph.split_of(target) {
            None => {
                let mut potential = self.prototype.clone();
                potential.init(source, target);
                self.anchors.push((potential, 0.0));
            }
            Some((split, position)) => {
                for end in [0, split.num_positions() - 1] {
                    let offset = self.along(split, end, position);
                    if offset < INFINITY {
                        let mut potential = self.prototype.clone();
                        potential.init(source, split.node_at(end));
                        self.anchors.push((potential, offset));
                    }
                }
            }
        }
    }

    fn potential(&mut self, node: NodeId) -> Option<Weight> {
        let query_graph = self.query_graph;
        let (split, position) = match query_graph.split_of(node) {
            Some(split) => split,
            None => return self.real_potential(node),
        };
        let mut best: Option<Weight> = None;
        let mut consider = |weight: Weight| {
            if weight < INFINITY {
                best = Some(best.map_or(weight, |best: Weight| best.min(weight)));
            }
        };
        if let Some((target_split, target_position)) = query_graph.split_of(self.target) {
            if target_split.edge() == split.edge() {
                consider(self.along(split, position, target_position));
            }
        }
        for end in [0, split.num_positions() - 1] {
            let to_end = self.along(split, position, end);
            if to_end < INFINITY {
                if let Some(pot) = self.real_potential(split.node_at(end)) {
                    consider(to_end + pot);
                }
            }
        }
        best
    }
}
