//! Cost models.
//!
//! A `Weighting` turns edge states and turns into weights. Weights are non negative,
//! `INFINITY` marks edges or turns which cannot be used.

use crate::datastr::graph::*;
use std::sync::Arc;

pub trait Weighting: Send + Sync {
    /// Weight of traversing `edge` from base to adj, or from adj to base if `reverse` is set.
    fn edge_weight(&self, edge: &EdgeState, reverse: bool) -> Weight;

    /// Travel time in milliseconds. Only meaningful for accessible directions.
    fn edge_millis(&self, edge: &EdgeState, reverse: bool) -> u64;

    /// Weight of turning from `in_edge` into `out_edge` at `via`.
    /// Zero whenever one of the edges is a sentinel, i.e. at the start or end of a path.
    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> Weight;

    fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64;

    /// Lower bound of weight per meter, used to turn beeline distances into potentials.
    fn min_weight_per_distance(&self) -> f64;

    fn has_turn_costs(&self) -> bool;

    fn name(&self) -> &str;
}

impl<W: Weighting + ?Sized> Weighting for &W {
    fn edge_weight(&self, edge: &EdgeState, reverse: bool) -> Weight {
        (**self).edge_weight(edge, reverse)
    }
    fn edge_millis(&self, edge: &EdgeState, reverse: bool) -> u64 {
        (**self).edge_millis(edge, reverse)
    }
    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> Weight {
        (**self).turn_weight(in_edge, via, out_edge)
    }
    fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64 {
        (**self).turn_millis(in_edge, via, out_edge)
    }
    fn min_weight_per_distance(&self) -> f64 {
        (**self).min_weight_per_distance()
    }
    fn has_turn_costs(&self) -> bool {
        (**self).has_turn_costs()
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<W: Weighting + ?Sized> Weighting for Box<W> {
    fn edge_weight(&self, edge: &EdgeState, reverse: bool) -> Weight {
        (**self).edge_weight(edge, reverse)
    }
    fn edge_millis(&self, edge: &EdgeState, reverse: bool) -> u64 {
        (**self).edge_millis(edge, reverse)
    }
    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> Weight {
        (**self).turn_weight(in_edge, via, out_edge)
    }
    fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64 {
        (**self).turn_millis(in_edge, via, out_edge)
    }
    fn min_weight_per_distance(&self) -> f64 {
        (**self).min_weight_per_distance()
    }
    fn has_turn_costs(&self) -> bool {
        (**self).has_turn_costs()
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Turn costs from a `TurnCostStorage` plus a fixed cost for u-turns.
/// Turn costs are in seconds. U-turns are forbidden unless a finite cost is set.
#[derive(Debug, Clone)]
pub struct TurnCostProvider {
    storage: Option<Arc<TurnCostStorage>>,
    u_turn_costs: Weight,
}

impl Default for TurnCostProvider {
    fn default() -> Self {
        Self::none()
    }
}

impl TurnCostProvider {
    /// All turns are free, including u-turns.
    pub fn none() -> Self {
        TurnCostProvider {
            storage: None,
            u_turn_costs: 0.0,
        }
    }

    pub fn new(storage: Arc<TurnCostStorage>) -> Self {
        TurnCostProvider {
            storage: Some(storage),
            u_turn_costs: INFINITY,
        }
    }

    pub fn with_u_turn_costs(mut self, u_turn_costs: Weight) -> Self {
        assert!(u_turn_costs >= 0.0, "invalid u-turn costs {}", u_turn_costs);
        self.u_turn_costs = u_turn_costs;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    pub fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> Weight {
        if !is_valid_edge(in_edge) || !is_valid_edge(out_edge) {
            return 0.0;
        }
        match &self.storage {
            None => 0.0,
            // u-turn costs take precedence over stored entries
            Some(_) if in_edge == out_edge => self.u_turn_costs,
            Some(storage) => storage.get(via, in_edge, out_edge),
        }
    }

    pub fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64 {
        let weight = self.turn_weight(in_edge, via, out_edge);
        if weight.is_finite() {
            (weight * 1000.0).round() as u64
        } else {
            0
        }
    }
}

fn millis(distance: f64, speed_kmh: f64) -> u64 {
    debug_assert!(speed_kmh > 0.0, "travel time on edge without speed");
    (distance * 3600.0 / speed_kmh).round() as u64
}

/// Weight is the time in seconds needed to traverse an edge at its speed.
#[derive(Debug, Clone)]
pub struct FastestWeighting {
    max_speed: f64,
    turn_costs: TurnCostProvider,
}

impl FastestWeighting {
    /// `max_speed` in km/h must bound the speeds of all edges, it scales beeline potentials.
    pub fn new(max_speed: f64) -> Self {
        assert!(max_speed > 0.0 && max_speed.is_finite(), "invalid max speed {}", max_speed);
        FastestWeighting {
            max_speed,
            turn_costs: TurnCostProvider::none(),
        }
    }

    pub fn with_turn_costs(mut self, turn_costs: TurnCostProvider) -> Self {
        self.turn_costs = turn_costs;
        self
    }
}

impl Weighting for FastestWeighting {
    fn edge_weight(&self, edge: &EdgeState, reverse: bool) -> Weight {
        let speed = edge.speed(reverse);
        if !edge.access(reverse) || speed <= 0.0 {
            return INFINITY;
        }
        edge.distance * 3.6 / speed
    }

    fn edge_millis(&self, edge: &EdgeState, reverse: bool) -> u64 {
        millis(edge.distance, edge.speed(reverse))
    }

    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> Weight {
        self.turn_costs.turn_weight(in_edge, via, out_edge)
    }

    fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64 {
        self.turn_costs.turn_millis(in_edge, via, out_edge)
    }

    fn min_weight_per_distance(&self) -> f64 {
        3.6 / self.max_speed
    }

    fn has_turn_costs(&self) -> bool {
        self.turn_costs.is_enabled()
    }

    fn name(&self) -> &str {
        "fastest"
    }
}

/// Weight is the distance in meters. Travel times still follow the edge speeds.
#[derive(Debug, Clone, Default)]
pub struct ShortestWeighting {
    turn_costs: TurnCostProvider,
}

impl ShortestWeighting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn_costs(mut self, turn_costs: TurnCostProvider) -> Self {
        self.turn_costs = turn_costs;
        self
    }
}

impl Weighting for ShortestWeighting {
    fn edge_weight(&self, edge: &EdgeState, reverse: bool) -> Weight {
        if !edge.access(reverse) {
            return INFINITY;
        }
        edge.distance
    }

    fn edge_millis(&self, edge: &EdgeState, reverse: bool) -> u64 {
        millis(edge.distance, edge.speed(reverse))
    }

    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> Weight {
        self.turn_costs.turn_weight(in_edge, via, out_edge)
    }

    fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64 {
        self.turn_costs.turn_millis(in_edge, via, out_edge)
    }

    fn min_weight_per_distance(&self) -> f64 {
        1.0
    }

    fn has_turn_costs(&self) -> bool {
        self.turn_costs.is_enabled()
    }

    fn name(&self) -> &str {
        "shortest"
    }
}
