mod common;

use common::*;
use common::MAX_SPEED;
use routing_engine::{
    algo::{
        a_star::BeelinePotential,
        contraction_hierarchy::*,
        dijkstra::{BidirectionalDijkstra, Dijkstra},
        *,
    },
    datastr::graph::*,
    weighting::*,
    RoutingError,
};
use std::sync::Arc;

fn shortest_path_servers<'a>(graph: &'a BaseGraph, weighting: &'a ShortestWeighting, ch: &'a ContractionHierarchy) -> Vec<Box<dyn QueryServer + 'a>> {
    vec![
        Box::new(Dijkstra::new(graph, weighting, TraversalMode::NodeBased)),
        Box::new(Dijkstra::new(graph, weighting, TraversalMode::EdgeBased)),
        Box::new(BidirectionalDijkstra::new(graph, weighting, TraversalMode::NodeBased)),
        Box::new(BidirectionalDijkstra::new(graph, weighting, TraversalMode::EdgeBased)),
        Box::new(Dijkstra::with_potential(graph, weighting, TraversalMode::NodeBased, BeelinePotential::new(graph, weighting))),
        Box::new(ChQuery::new(graph, ch, weighting)),
    ]
}

#[test]
fn shortest_path_on_the_eight_node_fixture() {
    let graph = eight_nodes();
    let weighting = ShortestWeighting::new();
    let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
    for mut server in shortest_path_servers(&graph, &weighting, &ch) {
        let path = server.calc_path(0, 7);
        assert!(path.is_found(), "{}", server.name());
        assert_eq!(path.nodes(), &[0, 4, 5, 7], "{}", server.name());
        assert_eq!(path.edge_count(), 3);
        assert!((path.distance() - 62.06).abs() < 0.1, "{}: {}", server.name(), path.distance());
        assert!((path.weight() - path.distance()).abs() < 1e-9);
    }
}

#[test]
fn directed_edges_are_only_followed_forward() {
    // 0 -> 1 -> 2 -> 3 and 1 <-(4)-> 3
    let graph = small_graph(4, &[(0, 1, 1.0, false), (1, 2, 1.0, false), (2, 3, 1.0, false), (3, 1, 4.0, true)]);
    let weighting = ShortestWeighting::new();
    let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
    for mut server in shortest_path_servers(&graph, &weighting, &ch) {
        let path = server.calc_path(0, 3);
        assert_eq!(path.nodes(), &[0, 1, 2, 3], "{}", server.name());
        assert!((path.distance() - 3.0).abs() < 1e-9);
        assert!(!server.calc_path(3, 0).is_found(), "{}", server.name());
        assert_eq!(server.calc_path(3, 2).nodes(), &[3, 1, 2], "{}", server.name());
    }
}

#[test]
fn disconnected_nodes_have_no_path() {
    let graph = small_graph(4, &[(0, 1, 1.0, false), (2, 3, 1.0, false)]);
    let weighting = ShortestWeighting::new();
    let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
    let edge_ch = prepare_ch(&graph, &weighting, ChConfig::edge_based()).unwrap();
    let mut servers = shortest_path_servers(&graph, &weighting, &ch);
    servers.push(Box::new(EdgeChQuery::new(&graph, &edge_ch, &weighting)));
    for mut server in servers {
        let path = server.calc_path(0, 3);
        assert!(!path.is_found(), "{}", server.name());
        assert_eq!(path.distance(), 0.0);
        assert_eq!(path.time(), 0);
        assert_eq!(path.weight(), INFINITY);
        assert!(path.nodes().is_empty());
    }
}

#[test]
fn path_to_the_source_itself_is_empty() {
    let graph = eight_nodes();
    let weighting = ShortestWeighting::new();
    let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
    let edge_ch = prepare_ch(&graph, &weighting, ChConfig::edge_based()).unwrap();
    let mut servers = shortest_path_servers(&graph, &weighting, &ch);
    servers.push(Box::new(EdgeChQuery::new(&graph, &edge_ch, &weighting)));
    for mut server in servers {
        let path = server.calc_path(5, 5);
        assert!(path.is_found(), "{}", server.name());
        assert_eq!(path.edge_count(), 0);
        assert_eq!(path.distance(), 0.0);
        assert_eq!(path.time(), 0);
        assert_eq!(path.weight(), 0.0);
    }
}

#[test]
fn travel_time_follows_the_edge_speeds() {
    let mut builder = GraphBuilder::new();
    for i in 0..3 {
        builder.add_node(50.0, 8.0 + i as f64 * 0.01);
    }
    builder.add_edge(0, 1, 1000.0, EdgeFlags::new(true, true, 36.0, 72.0));
    builder.add_edge(1, 2, 500.0, EdgeFlags::both_directions(18.0));
    let graph = builder.freeze();
    let weighting = FastestWeighting::new(MAX_SPEED);
    let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
    let mut query = ChQuery::new(&graph, &ch, &weighting);

    let path = query.calc_path(0, 2);
    assert_eq!(path.time(), 100_000 + 100_000);
    assert!((path.weight() - 200.0).abs() < 1e-9);
    let path = query.calc_path(1, 0);
    assert_eq!(path.time(), 50_000);
    assert!((path.distance() - 1000.0).abs() < 1e-9);
}

// 0 -e0- 1 -e1- 2
//        |      |
//       e2     e3
//        |      |
//        3 -e4- 4
fn detour_graph() -> BaseGraph {
    small_graph(5, &[(0, 1, 10.0, true), (1, 2, 10.0, true), (1, 3, 5.0, true), (2, 4, 5.0, true), (3, 4, 10.0, true)])
}

#[test]
fn turn_restrictions_are_honored_until_removed() {
    let graph = detour_graph();
    let mut turn_costs = TurnCostStorage::new();
    turn_costs.restrict(1, 0, 1);
    let restricted = ShortestWeighting::new().with_turn_costs(TurnCostProvider::new(Arc::new(turn_costs.clone())));
    let ch = prepare_ch(&graph, &restricted, ChConfig::edge_based()).unwrap();

    let mut dijkstra = Dijkstra::new(&graph, &restricted, TraversalMode::EdgeBased);
    let mut query = EdgeChQuery::new(&graph, &ch, &restricted);
    for server in [&mut dijkstra as &mut dyn QueryServer, &mut query] {
        let path = server.calc_path(0, 2);
        assert_eq!(path.nodes(), &[0, 1, 3, 4, 2], "{}", server.name());
        assert!((path.weight() - 30.0).abs() < 1e-9);
        // the other way round is not restricted
        assert_eq!(server.calc_path(2, 0).nodes(), &[2, 1, 0], "{}", server.name());
    }

    assert_eq!(turn_costs.remove(1, 0, 1), Some(INFINITY));
    assert!(turn_costs.is_empty());
    let unrestricted = ShortestWeighting::new().with_turn_costs(TurnCostProvider::new(Arc::new(turn_costs)));
    let ch = prepare_ch(&graph, &unrestricted, ChConfig::edge_based()).unwrap();
    let mut dijkstra = Dijkstra::new(&graph, &unrestricted, TraversalMode::EdgeBased);
    let mut query = EdgeChQuery::new(&graph, &ch, &unrestricted);
    for server in [&mut dijkstra as &mut dyn QueryServer, &mut query] {
        let path = server.calc_path(0, 2);
        assert_eq!(path.nodes(), &[0, 1, 2], "{}", server.name());
        assert!((path.weight() - 20.0).abs() < 1e-9);
    }
}

#[test]
fn turn_costs_add_to_weight_and_time() {
    let graph = detour_graph();
    let mut turn_costs = TurnCostStorage::new();
    turn_costs.set(1, 0, 1, 3.0);
    let weighting = ShortestWeighting::new().with_turn_costs(TurnCostProvider::new(Arc::new(turn_costs)));
    let ch = prepare_ch(&graph, &weighting, ChConfig::edge_based()).unwrap();
    let plain = Dijkstra::new(&graph, &weighting, TraversalMode::EdgeBased).calc_path(0, 2);
    let path = EdgeChQuery::new(&graph, &ch, &weighting).calc_path(0, 2);
    assert_eq!(path.nodes(), &[0, 1, 2]);
    assert!((path.weight() - 23.0).abs() < 1e-9);
    assert_eq!(path.time(), plain.time());
    assert!((path.distance() - 20.0).abs() < 1e-9);
}

#[test]
fn edge_constraints_on_the_detour_graph() {
    let graph = detour_graph();
    let weighting = ShortestWeighting::new().with_turn_costs(TurnCostProvider::new(Arc::new(TurnCostStorage::new())));
    let ch = prepare_ch(&graph, &weighting, ChConfig::edge_based()).unwrap();
    let mut dijkstra = Dijkstra::new(&graph, &weighting, TraversalMode::EdgeBased);
    let mut query = EdgeChQuery::new(&graph, &ch, &weighting);
    for server in [&mut dijkstra as &mut dyn QueryServer, &mut query] {
        assert!((server.calc_path_directed(1, 4, ANY_EDGE, ANY_EDGE).weight() - 15.0).abs() < 1e-9, "{}", server.name());
        assert_eq!(server.calc_path_directed(1, 4, 2, ANY_EDGE).nodes(), &[1, 3, 4], "{}", server.name());
        assert_eq!(server.calc_path_directed(1, 4, ANY_EDGE, 4).nodes(), &[1, 3, 4], "{}", server.name());
        assert!(!server.calc_path_directed(1, 4, 1, 4).is_found(), "{}", server.name());
        assert!(!server.calc_path_directed(1, 4, NO_EDGE, ANY_EDGE).is_found(), "{}", server.name());
        let around = server.calc_path_directed(1, 1, 1, 2);
        assert_eq!(around.nodes(), &[1, 2, 4, 3, 1], "{}", server.name());
        assert!((around.weight() - 30.0).abs() < 1e-9);
    }
}

#[test]
fn node_based_preparation_rejects_turn_costs() {
    let graph = detour_graph();
    let weighting = FastestWeighting::new(MAX_SPEED).with_turn_costs(TurnCostProvider::new(Arc::new(TurnCostStorage::new())));
    assert!(matches!(
        prepare_ch(&graph, &weighting, ChConfig::node_based()),
        Err(RoutingError::TurnCostsRequireEdgeBased { .. })
    ));
}

#[test]
fn query_budgets_end_searches_early() {
    let graph = eight_nodes();
    let weighting = ShortestWeighting::new();
    let ch = prepare_ch(&graph, &weighting, ChConfig::node_based()).unwrap();
    let options = QueryOptions {
        max_visited_nodes: 1,
        ..QueryOptions::default()
    };
    let mut query = ChQuery::new(&graph, &ch, &weighting).with_options(options);
    let path = query.calc_path(0, 7);
    assert!(!path.is_found());
    assert!(path.visited_nodes() <= 1);

    let options = QueryOptions {
        max_weight: 50.0,
        ..QueryOptions::default()
    };
    let mut dijkstra = Dijkstra::new(&graph, &weighting, TraversalMode::NodeBased).with_options(options);
    assert!(!dijkstra.calc_path(0, 7).is_found());
    assert!(dijkstra.calc_path(0, 4).is_found());
}
