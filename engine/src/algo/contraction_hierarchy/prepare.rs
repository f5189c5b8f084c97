//! Preparation driver: contraction order by priority queue, or a fixed order.

use super::edge_contractor::EdgeContractor;
use super::node_contractor::NodeContractor;
use super::preparation_graph::PreparationGraph;
use super::*;
use crate::algo::dijkstra::State;
use crate::datastr::index_heap::*;
use crate::error::RoutingError;
use crate::report::*;
use crate::util::NonNan;
use crate::weighting::Weighting;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Tuning knobs of the contraction. They change preparation speed and the number of shortcuts, never query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractionParams {
    /// Recompute all priorities whenever this percentage of the nodes has been contracted.
    /// 0 disables periodic updates.
    pub periodic_updates: u32,
    /// Once fewer than this percentage of the nodes is left, the priority of every polled node is recomputed
    /// and the node is put back if it is no longer the minimum.
    pub lazy_updates: u32,
    /// Chance in percent to recompute the priority of each neighbor of a contracted node.
    pub neighbor_updates: u32,
    /// Log progress every this percentage of contracted nodes, 0 disables logging.
    pub log_messages: u32,
    /// Witness searches for priorities settle at most this many states per mean degree.
    pub witness_settled_factor_heuristic: f64,
    /// Witness searches for actual contractions settle at most this many states per mean degree.
    pub witness_settled_factor_contraction: f64,
}

impl ContractionParams {
    pub fn node_based() -> Self {
        ContractionParams {
            periodic_updates: 20,
            lazy_updates: 10,
            neighbor_updates: 20,
            log_messages: 20,
            witness_settled_factor_heuristic: 5.0,
            witness_settled_factor_contraction: 200.0,
        }
    }

    pub fn edge_based() -> Self {
        ContractionParams {
            periodic_updates: 0,
            lazy_updates: 100,
            neighbor_updates: 0,
            log_messages: 5,
            ..Self::node_based()
        }
    }

    pub fn validate(&self) -> Result<(), RoutingError> {
        for (name, value) in [
            ("periodic_updates", self.periodic_updates),
            ("lazy_updates", self.lazy_updates),
            ("neighbor_updates", self.neighbor_updates),
            ("log_messages", self.log_messages),
        ] {
            if value > 100 {
                return Err(RoutingError::InvalidPercentage { name, value });
            }
        }
        for factor in [self.witness_settled_factor_heuristic, self.witness_settled_factor_contraction] {
            if !(factor > 0.0 && factor.is_finite()) {
                return Err(RoutingError::InvalidContractionParams("witness settled factors must be positive"));
            }
        }
        Ok(())
    }
}

impl Default for ContractionParams {
    fn default() -> Self {
        Self::node_based()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChConfig {
    pub edge_based: bool,
    pub params: ContractionParams,
    /// Contract exactly in this order instead of computing one.
    #[serde(skip)]
    pub fixed_order: Option<NodeOrder>,
}

impl ChConfig {
    pub fn node_based() -> Self {
        Self::default()
    }

    pub fn edge_based() -> Self {
        ChConfig {
            edge_based: true,
            params: ContractionParams::edge_based(),
            fixed_order: None,
        }
    }

    pub fn with_fixed_order(mut self, order: NodeOrder) -> Self {
        self.fixed_order = Some(order);
        self
    }
}

/// What the preparation loop needs from node or edge based contraction.
pub(super) trait Contractor {
    /// Lower is contracted earlier.
    fn priority(&mut self, graph: &PreparationGraph, node: NodeId) -> Weight;
    /// Adds the necessary shortcuts, removes the node and returns its former neighbors.
    fn contract(&mut self, graph: &mut PreparationGraph, node: NodeId) -> Vec<NodeId>;
    fn set_mean_degree(&mut self, mean_degree: f64);
}

/// Builds a contraction hierarchy.
///
/// Node based preparation refuses weightings with turn costs, they would silently be ignored.
pub fn prepare_ch<G: RoadGraph, W: Weighting + ?Sized>(graph: &G, weighting: &W, config: ChConfig) -> Result<ContractionHierarchy, RoutingError> {
    config.params.validate()?;
    if !config.edge_based && weighting.has_turn_costs() {
        return Err(RoutingError::TurnCostsRequireEdgeBased {
            weighting: weighting.name().to_string(),
        });
    }
    let n = graph.num_nodes();
    if let Some(order) = &config.fixed_order {
        if order.len() != n {
            return Err(RoutingError::NodeOrderMismatch { given: order.len(), expected: n });
        }
    }

    let _ch_ctxt = push_context("contraction".to_string());
    report!("num_nodes", n);
    report!("num_edges", graph.num_edges());
    report!("edge_based", config.edge_based);
    report!("weighting", weighting.name());
    report!("fixed_order", config.fixed_order.is_some());

    let mut prep = PreparationGraph::new(graph, weighting, config.edge_based);
    let order = report_time("contraction", || {
        if config.edge_based {
            let mut contractor = EdgeContractor::new(&prep, weighting, &config.params);
            contract_all(&mut prep, &mut contractor, &config.params, config.fixed_order.as_ref())
        } else {
            let mut contractor = NodeContractor::new(n, &config.params);
            contract_all(&mut prep, &mut contractor, &config.params, config.fixed_order.as_ref())
        }
    })?;

    report!("num_shortcuts", prep.num_shortcuts());
    Ok(prep.into_hierarchy(order))
}

fn mean_degree(graph: &PreparationGraph, remaining: usize) -> f64 {
    if remaining == 0 {
        0.0
    } else {
        graph.num_arcs() as f64 / remaining as f64
    }
}

fn update_priority(queue: &mut IndexdMinHeap<State>, node: NodeId, priority: Weight) {
    let updated = State { key: NonNan::key(priority), id: node };
    match queue.get(node as usize).copied() {
        Some(current) if updated < current => queue.decrease_key(updated),
        Some(_) => queue.increase_key(updated),
        None => queue.push(updated),
    }
}

fn contract_all<C: Contractor>(graph: &mut PreparationGraph, contractor: &mut C, params: &ContractionParams, fixed_order: Option<&NodeOrder>) -> Result<NodeOrder, RoutingError> {
    let n = graph.num_nodes();
    contractor.set_mean_degree(mean_degree(graph, n));

    if let Some(order) = fixed_order {
        for &node in order.order() {
            contractor.contract(graph, node);
        }
        return Ok(order.clone());
    }

    let mut queue = IndexdMinHeap::new(n);
    for node in 0..n as NodeId {
        let priority = contractor.priority(graph, node);
        queue.push(State { key: NonNan::key(priority), id: node });
    }

    let periodic_interval = if params.periodic_updates == 0 {
        None
    } else {
        Some((n * params.periodic_updates as usize / 100).max(10))
    };
    let lazy_threshold = n * params.lazy_updates as usize / 100;
    let log_interval = if params.log_messages == 0 {
        None
    } else {
        Some((n * params.log_messages as usize / 100).max(1))
    };
    let mut rng = StdRng::seed_from_u64(123);
    let mut order = Vec::with_capacity(n);
    let (mut periodic_updates, mut lazy_updates, mut neighbor_updates) = (0usize, 0usize, 0usize);
    let timer = Timer::new();

    while let Some(State { id: node, .. }) = queue.pop() {
        if !queue.is_empty() && queue.len() < lazy_threshold {
            lazy_updates += 1;
            let priority = NonNan::key(contractor.priority(graph, node));
            if queue.peek().map_or(false, |min| priority > min.key) {
                queue.push(State { key: priority, id: node });
                continue;
            }
        }

        let neighbors = contractor.contract(graph, node);
        order.push(node);

        if params.neighbor_updates > 0 {
            for neighbor in neighbors {
                if queue.contains_index(neighbor as usize) && rng.gen_range(0..100) < params.neighbor_updates {
                    neighbor_updates += 1;
                    let priority = contractor.priority(graph, neighbor);
                    update_priority(&mut queue, neighbor, priority);
                }
            }
        }

        if let Some(interval) = periodic_interval {
            if order.len() % interval == 0 && !queue.is_empty() {
                periodic_updates += 1;
                contractor.set_mean_degree(mean_degree(graph, queue.len()));
                for node in 0..n as NodeId {
                    if queue.contains_index(node as usize) {
                        let priority = contractor.priority(graph, node);
                        update_priority(&mut queue, node, priority);
                    }
                }
            }
        }

        if let Some(interval) = log_interval {
            if order.len() % interval == 0 {
                eprintln!(
                    "contracted {}/{} nodes, {} shortcuts, {} remaining arcs, {}ms",
                    order.len(),
                    n,
                    graph.num_shortcuts(),
                    graph.num_arcs(),
                    timer.get_passed_ms()
                );
            }
        }
    }

    report!("periodic_updates", periodic_updates);
    report!("lazy_updates", lazy_updates);
    report!("neighbor_updates", neighbor_updates);
    NodeOrder::from_node_order(order)
}
