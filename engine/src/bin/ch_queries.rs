// Runs random queries on a hierarchy written by ch_preprocessing and compares them against Dijkstra.
// Usage: ch_queries <graph dir> <ch dir> [num queries] [fastest|shortest]

#[macro_use]
extern crate routing_engine;

use rand::prelude::*;
use rayon::prelude::*;
use routing_engine::{
    algo::{contraction_hierarchy::*, dijkstra::*, *},
    cli::*,
    datastr::graph::*,
    io::*,
    report::*,
    util::weights_equal,
    weighting::*,
};
use std::{error::Error, time::Duration};

const DEFAULT_NUM_QUERIES: usize = 1000;

struct QueryResult {
    from: NodeId,
    to: NodeId,
    ch_weight: Weight,
    ch_visited: usize,
    ch_time: Duration,
    dijkstra_weight: Weight,
    dijkstra_visited: usize,
    dijkstra_time: Duration,
}

fn main() -> Result<(), Box<dyn Error>> {
    let _reporter = enable_reporting("ch_queries");
    let mut args = Args::from_env();
    let graph_dir = args.required("graph dir")?;
    let ch_dir = args.required("ch dir")?;
    let num_queries = args.number("num queries", DEFAULT_NUM_QUERIES)?;
    let weighting_name = args.weighting_name();

    let graph = BaseGraph::reconstruct_from(&graph_dir)?;
    let ch = ContractionHierarchy::reconstruct_from(&ch_dir)?;
    if ch.num_nodes() != graph.num_nodes() || ch.num_edges() != graph.num_edges() {
        return Err(Box::new(CliErr::GraphMismatch {
            ch_nodes: ch.num_nodes(),
            ch_edges: ch.num_edges(),
            graph_nodes: graph.num_nodes(),
            graph_edges: graph.num_edges(),
        }));
    }
    report!("graph", { "num_nodes": graph.num_nodes(), "num_edges": graph.num_edges() });
    report!("num_shortcuts", ch.num_shortcuts());
    report!("edge_based", ch.is_edge_based());

    let turn_costs = if ch.is_edge_based() {
        turn_cost_provider(load_turn_costs(&graph_dir)?)
    } else {
        TurnCostProvider::none()
    };
    let weighting = weighting_by_name(&weighting_name, turn_costs)?;

    let seed = 42;
    report!("seed", seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let n = graph.num_nodes() as NodeId;
    let queries: Vec<(NodeId, NodeId)> = (0..num_queries).map(|_| (rng.gen_range(0..n), rng.gen_range(0..n))).collect();

    let mode = if ch.is_edge_based() { TraversalMode::EdgeBased } else { TraversalMode::NodeBased };
    let results: Vec<QueryResult> = queries
        .par_iter()
        .map_init(
            || {
                let ch_server: Box<dyn QueryServer + '_> = if ch.is_edge_based() {
                    Box::new(EdgeChQuery::new(&graph, &ch, &weighting))
                } else {
                    Box::new(ChQuery::new(&graph, &ch, &weighting))
                };
                (ch_server, Dijkstra::new(&graph, &weighting, mode))
            },
            |(ch_server, dijkstra), &(from, to)| {
                let (ch_path, ch_time) = measure(|| ch_server.calc_path(from, to));
                let (dijkstra_path, dijkstra_time) = measure(|| dijkstra.calc_path(from, to));
                QueryResult {
                    from,
                    to,
                    ch_weight: ch_path.weight(),
                    ch_visited: ch_path.visited_nodes(),
                    ch_time,
                    dijkstra_weight: dijkstra_path.weight(),
                    dijkstra_visited: dijkstra_path.visited_nodes(),
                    dijkstra_time,
                }
            },
        )
        .collect();

    let mut mismatches = 0;
    let mut queries_ctxt = push_collection_context("queries".to_string());
    for result in &results {
        let _query = queries_ctxt.push_collection_item();
        report!("from", result.from);
        report!("to", result.to);
        report!("ch_weight", result.ch_weight);
        report!("ch_visited_nodes", result.ch_visited);
        report!("ch_running_time_ms", result.ch_time.as_secs_f64() * 1000.0);
        report!("dijkstra_weight", result.dijkstra_weight);
        report!("dijkstra_visited_nodes", result.dijkstra_visited);
        report!("dijkstra_running_time_ms", result.dijkstra_time.as_secs_f64() * 1000.0);
        if !weights_equal(result.ch_weight, result.dijkstra_weight, 1e-2) {
            mismatches += 1;
            eprintln!("mismatch {} -> {}: ch {} dijkstra {}", result.from, result.to, result.ch_weight, result.dijkstra_weight);
        }
    }
    drop(queries_ctxt);

    let total_ch: Duration = results.iter().map(|result| result.ch_time).sum();
    let total_dijkstra: Duration = results.iter().map(|result| result.dijkstra_time).sum();
    report!("num_queries", results.len());
    report!("num_mismatches", mismatches);
    report!("avg_ch_time_ms", total_ch.as_secs_f64() * 1000.0 / results.len().max(1) as f64);
    report!("avg_dijkstra_time_ms", total_dijkstra.as_secs_f64() * 1000.0 / results.len().max(1) as f64);

    if mismatches > 0 {
        return Err(Box::new(CliErr::Mismatches(mismatches)));
    }
    Ok(())
}
