//! Routing algorithms.

use crate::datastr::graph::*;
use serde::{Deserialize, Serialize};

pub mod a_star;
pub mod alt;
pub mod contraction_hierarchy;
pub mod dijkstra;
pub mod path;
pub mod subnetworks;

pub use self::path::Path;

/// Node based searches ignore turn costs, edge based searches keep track of the edge a node was reached by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalMode {
    NodeBased,
    EdgeBased,
}

impl TraversalMode {
    pub fn is_edge_based(self) -> bool {
        self == TraversalMode::EdgeBased
    }

    /// Size of the search state space: nodes or directed edge keys.
    pub fn num_states<G: RoadGraph>(self, graph: &G) -> usize {
        match self {
            TraversalMode::NodeBased => graph.num_nodes(),
            TraversalMode::EdgeBased => graph.num_keys(),
        }
    }
}

/// A source-target pair, optionally constrained to leave the source by `from_out_edge`
/// and to reach the target by `to_in_edge`.
/// Constraints are only supported by edge based searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub from: NodeId,
    pub to: NodeId,
    pub from_out_edge: EdgeId,
    pub to_in_edge: EdgeId,
}

impl Query {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self::directed(from, to, ANY_EDGE, ANY_EDGE)
    }

    pub fn directed(from: NodeId, to: NodeId, from_out_edge: EdgeId, to_in_edge: EdgeId) -> Self {
        Query {
            from,
            to,
            from_out_edge,
            to_in_edge,
        }
    }

    pub fn is_constrained(&self) -> bool {
        self.from_out_edge != ANY_EDGE || self.to_in_edge != ANY_EDGE
    }

    /// Queries with a `NO_EDGE` constraint cannot have a result.
    pub fn is_unsatisfiable(&self) -> bool {
        self.from_out_edge == NO_EDGE || self.to_in_edge == NO_EDGE
    }

    pub fn accepts_first_edge(&self, edge: EdgeId) -> bool {
        self.from_out_edge == ANY_EDGE || self.from_out_edge == edge
    }

    pub fn accepts_last_edge(&self, edge: EdgeId) -> bool {
        self.to_in_edge == ANY_EDGE || self.to_in_edge == edge
    }
}

/// Per query limits and switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Searches give up (path not found) after settling more states.
    pub max_visited_nodes: usize,
    /// States with a larger weight are not explored, paths above it are not found.
    pub max_weight: Weight,
    /// Only used by node based CH queries without potentials.
    pub stall_on_demand: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            max_visited_nodes: usize::MAX,
            max_weight: INFINITY,
            stall_on_demand: true,
        }
    }
}

/// Common interface of all point to point searches.
/// Each server owns its search state, so one server answers one query at a time.
pub trait QueryServer {
    fn query(&mut self, query: Query) -> Path;

    fn calc_path(&mut self, from: NodeId, to: NodeId) -> Path {
        self.query(Query::new(from, to))
    }

    /// `ANY_EDGE` leaves a side unconstrained, `NO_EDGE` means no path can be found.
    fn calc_path_directed(&mut self, from: NodeId, to: NodeId, from_out_edge: EdgeId, to_in_edge: EdgeId) -> Path {
        self.query(Query::directed(from, to, from_out_edge, to_in_edge))
    }

    /// States settled by the last query.
    fn visited_nodes(&self) -> usize;

    fn name(&self) -> &'static str;
}
