// Contracts a graph directory and writes the hierarchy into a second directory.
// Usage: ch_preprocessing <graph dir> <output dir> [node|edge] [fastest|shortest]
// Turn costs are loaded from the graph directory if it contains them, they require edge based contraction.

#[macro_use]
extern crate routing_engine;

use routing_engine::{
    algo::contraction_hierarchy::*,
    cli::*,
    datastr::graph::*,
    io::*,
    report::*,
    weighting::*,
};
use std::{error::Error, fs};

fn main() -> Result<(), Box<dyn Error>> {
    let _reporter = enable_reporting("ch_preprocessing");
    let mut args = Args::from_env();
    let graph_dir = args.required("graph dir")?;
    let out_dir = args.required("output dir")?;
    let edge_based = args.edge_based()?;
    let weighting_name = args.weighting_name();

    let graph = BaseGraph::reconstruct_from(&graph_dir)?;
    report!("graph", { "num_nodes": graph.num_nodes(), "num_edges": graph.num_edges() });

    let turn_costs = load_turn_costs(&graph_dir)?;
    if let Some(storage) = &turn_costs {
        report!("num_turn_cost_entries", storage.len());
    }
    let turn_costs = if edge_based { turn_cost_provider(turn_costs) } else { TurnCostProvider::none() };
    let weighting = weighting_by_name(&weighting_name, turn_costs)?;
    report!("weighting", weighting.name());

    let config = if edge_based { ChConfig::edge_based() } else { ChConfig::node_based() };
    report!("config", serde_json::to_value(&config)?);
    let ch = prepare_ch(&graph, &weighting, config)?;

    fs::create_dir_all(&out_dir)?;
    report_time("storing hierarchy", || ch.deconstruct_to(&out_dir))?;

    Ok(())
}
