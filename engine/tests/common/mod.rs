#![allow(dead_code)]

use rand::prelude::*;
use routing_engine::datastr::graph::*;

pub const MAX_SPEED: f64 = 100.0;

/// Eight nodes with distances taken from their coordinates, only 6-7 is stretched five times.
/// The shortest path from 0 to 7 is 0-4-5-7 with about 62.06 meters.
pub fn eight_nodes() -> BaseGraph {
    let coords = [
        (0.0010, 0.00001),
        (0.0008, 0.0),
        (0.0005, 0.0001),
        (0.0006, 0.0002),
        (0.0009, 0.0001),
        (0.0007, 0.0001),
        (0.0009, 0.0002),
        (0.0008, 0.0003),
    ];
    let edges = [(0, 1), (0, 4), (1, 4), (1, 5), (1, 2), (2, 5), (2, 3), (3, 5), (3, 7), (4, 6), (4, 5), (5, 6), (5, 7), (6, 7)];

    let mut builder = GraphBuilder::new();
    for &(lat, lon) in &coords {
        builder.add_node(lat, lon);
    }
    for &(base, adj) in &edges {
        let (a, b) = (coords[base as usize], coords[adj as usize]);
        let mut distance = Coordinate::new(a.0, a.1).distance_to(&Coordinate::new(b.0, b.1));
        if (base, adj) == (6, 7) {
            distance *= 5.0;
        }
        builder.add_edge(base, adj, distance, EdgeFlags::both_directions(60.0));
    }
    builder.freeze()
}

/// Builds a graph on nodes a few millimeters apart from `(base, adj, distance, both_directions)` tuples.
pub fn small_graph(num_nodes: usize, edges: &[(NodeId, NodeId, f64, bool)]) -> BaseGraph {
    let mut builder = GraphBuilder::new();
    for node in 0..num_nodes {
        builder.add_node(50.0 + node as f64 * 1e-7, 8.0);
    }
    for &(base, adj, distance, both) in edges {
        let flags = if both { EdgeFlags::both_directions(50.0) } else { EdgeFlags::one_way(50.0) };
        builder.add_edge(base, adj, distance, flags);
    }
    builder.freeze()
}

/// A `size` x `size` grid with random detours, speeds and one way streets plus a few long diagonals.
/// Edge distances never drop below the beeline distance of their end points.
pub fn random_grid(size: usize, seed: u64) -> BaseGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = GraphBuilder::new();
    for row in 0..size {
        for col in 0..size {
            builder.add_node(50.0 + row as f64 * 0.001, 8.0 + col as f64 * 0.0015);
        }
    }
    let node = |row: usize, col: usize| (row * size + col) as NodeId;
    let add = |builder: &mut GraphBuilder, rng: &mut StdRng, base: NodeId, adj: NodeId, coords: &[Coordinate]| {
        let beeline = coords[base as usize].distance_to(&coords[adj as usize]);
        let distance = beeline * rng.gen_range(1.0..1.6);
        let speed = *[30.0, 50.0, 70.0, MAX_SPEED].choose(rng).unwrap_or(&50.0);
        let flags = if rng.gen_bool(0.1) {
            EdgeFlags::one_way(speed)
        } else {
            EdgeFlags::both_directions(speed)
        };
        builder.add_edge(base, adj, distance, flags);
    };

    let coords: Vec<Coordinate> = (0..size * size)
        .map(|i| Coordinate::new(50.0 + (i / size) as f64 * 0.001, 8.0 + (i % size) as f64 * 0.0015))
        .collect();
    for row in 0..size {
        for col in 0..size {
            if col + 1 < size {
                add(&mut builder, &mut rng, node(row, col), node(row, col + 1), &coords);
            }
            if row + 1 < size {
                add(&mut builder, &mut rng, node(row, col), node(row + 1, col), &coords);
            }
        }
    }
    for _ in 0..size {
        let (a, b) = (rng.gen_range(0..size * size) as NodeId, rng.gen_range(0..size * size) as NodeId);
        if a != b {
            add(&mut builder, &mut rng, a, b, &coords);
        }
    }
    builder.freeze()
}

/// Random turn costs and restrictions between edges sharing a node.
pub fn random_turn_costs<G: RoadGraph>(graph: &G, seed: u64) -> TurnCostStorage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut storage = TurnCostStorage::new();
    for via in 0..graph.num_nodes() as NodeId {
        let edges: Vec<EdgeId> = graph.link_iter(via).map(|state| state.edge).collect();
        for &in_edge in &edges {
            for &out_edge in &edges {
                if in_edge == out_edge || !rng.gen_bool(0.2) {
                    continue;
                }
                if rng.gen_bool(0.3) {
                    storage.restrict(via, in_edge, out_edge);
                } else {
                    storage.set(via, in_edge, out_edge, rng.gen_range(1.0..20.0));
                }
            }
        }
    }
    storage
}

pub fn random_pairs(num_nodes: usize, count: usize, seed: u64) -> Vec<(NodeId, NodeId)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (rng.gen_range(0..num_nodes) as NodeId, rng.gen_range(0..num_nodes) as NodeId))
        .collect()
}
