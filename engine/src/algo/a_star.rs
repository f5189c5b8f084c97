//! Potentials for goal directed search.
//!
//! A potential is a lower bound of the weight from a node to the target.
//! Searches only need feasible potentials, that is `potential(u) <= w(u, v) + potential(v)` for every edge.
//! `None` means the target cannot be reached from the node, such nodes are pruned.

use super::dijkstra::{one_to_all, DijkstraData};
use super::*;
use crate::weighting::Weighting;

pub trait Potential {
    fn init(&mut self, source: NodeId, target: NodeId);
    fn potential(&mut self, node: NodeId) -> Option<Weight>;
}

impl<P: Potential + ?Sized> Potential for Box<P> {
    fn init(&mut self, source: NodeId, target: NodeId) {
        (**self).init(source, target)
    }
    fn potential(&mut self, node: NodeId) -> Option<Weight> {
        (**self).potential(node)
    }
}

/// Plain Dijkstra.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroPotential();

impl Potential for ZeroPotential {
    fn init(&mut self, _source: NodeId, _target: NodeId) {}
    fn potential(&mut self, _node: NodeId) -> Option<Weight> {
        Some(0.0)
    }
}

/// Combines a potential towards the target and one from the source
/// into one consistent pair for a bidirectional search:
/// `p_f = (pi_t - pi_s) / 2` forward and `-p_f` backward.
/// With these the usual stopping criterion (sum of queue minima exceeds the best path) stays valid.
#[derive(Debug, Clone)]
pub struct AveragePotential<P> {
    forward_potential: P,
    backward_potential: P,
}

impl<P: Potential> AveragePotential<P> {
    pub fn new(forward_potential: P, backward_potential: P) -> Self {
        AveragePotential {
            forward_potential,
            backward_potential,
        }
    }

    pub fn init(&mut self, source: NodeId, target: NodeId) {
        self.forward_potential.init(source, target);
        self.backward_potential.init(target, source);
    }

    fn average(&mut self, node: NodeId) -> Option<Weight> {
        let to_target = self.forward_potential.potential(node)?;
        let from_source = self.backward_potential.potential(node)?;
        Some((to_target - from_source) / 2.0)
    }

    pub fn forward(&mut self, node: NodeId) -> Option<Weight> {
        self.average(node)
    }

    pub fn backward(&mut self, node: NodeId) -> Option<Weight> {
        self.average(node).map(|p| -p)
    }
}

/// Great circle distance to the target times the minimal weight per meter.
/// Feasible as long as no edge is shorter than the beeline between its end points.
pub struct BeelinePotential<'a, G> {
    graph: &'a G,
    weight_per_meter: f64,
    target: Coordinate,
}

impl<'a, G: RoadGraph> BeelinePotential<'a, G> {
    pub fn new<W: Weighting + ?Sized>(graph: &'a G, weighting: &W) -> Self {
        BeelinePotential {
            graph,
            weight_per_meter: weighting.min_weight_per_distance(),
            target: Coordinate::default(),
        }
    }
}

impl<'a, G: RoadGraph> Potential for BeelinePotential<'a, G> {
    fn init(&mut self, _source: NodeId, target: NodeId) {
        self.target = self.graph.coordinate(target);
    }

    fn potential(&mut self, node: NodeId) -> Option<Weight> {
        Some(self.graph.coordinate(node).distance_to(&self.target) * self.weight_per_meter)
    }
}

/// Exact node based distances to the target from a full backward Dijkstra on every `init`.
/// Far too expensive for real queries, useful as an oracle in tests.
pub struct PerfectPotential<'a, G, W: ?Sized> {
    graph: &'a G,
    weighting: &'a W,
    reversed: bool,
    data: DijkstraData,
}

impl<'a, G: RoadGraph, W: Weighting + ?Sized> PerfectPotential<'a, G, W> {
    pub fn new(graph: &'a G, weighting: &'a W) -> Self {
        PerfectPotential {
            graph,
            weighting,
            reversed: false,
            data: DijkstraData::new(graph.num_nodes()),
        }
    }

    /// Distances from the target instead, for the backward side of bidirectional searches.
    pub fn reversed(graph: &'a G, weighting: &'a W) -> Self {
        PerfectPotential {
            reversed: true,
            ..Self::new(graph, weighting)
        }
    }
}

impl<'a, G, W: ?Sized> Clone for PerfectPotential<'a, G, W> {
    fn clone(&self) -> Self {
        PerfectPotential {
            graph: self.graph,
            weighting: self.weighting,
            reversed: self.reversed,
            data: self.data.clone(),
        }
    }
}

impl<'a, G: RoadGraph, W: Weighting + ?Sized> Potential for PerfectPotential<'a, G, W> {
    fn init(&mut self, _source: NodeId, target: NodeId) {
        one_to_all(self.graph, self.weighting, target, !self.reversed, INFINITY, &mut self.data);
    }

    fn potential(&mut self, node: NodeId) -> Option<Weight> {
        let weight = self.data.weight(node);
        if weight < INFINITY {
            Some(weight)
        } else {
            None
        }
    }
}
