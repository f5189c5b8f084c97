//! Landmarks and the ALT potential (A*, landmarks, triangle inequality).
//!
//! For every strongly connected subnetwork with enough nodes, a fixed number of landmarks is selected
//! with the farthest point heuristic and the weights from and to each landmark are stored for all nodes
//! of the subnetwork. The triangle inequality then yields lower bounds between any two nodes.

use super::a_star::Potential;
use super::dijkstra::{one_to_all, DijkstraData};
use super::subnetworks::strongly_connected_components;
use super::*;
use crate::error::RoutingError;
use crate::io::*;
use crate::report::*;
use crate::weighting::Weighting;
use rand::prelude::*;
use std::collections::VecDeque;

/// Table value for nodes a landmark does not reach within the horizon.
pub const UNREACHABLE: Weight = INFINITY;
/// Subnetwork of nodes without landmarks.
pub const NO_SUBNETWORK: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    /// Landmarks per subnetwork.
    pub landmarks: usize,
    /// Landmarks used per query, the ones with the best bound between source and target.
    pub active_landmarks: usize,
    /// Subnetworks with fewer nodes get no landmarks.
    pub minimum_nodes: usize,
    /// Landmark searches stop at this weight.
    pub maximum_weight: Option<Weight>,
    /// Seed for picking the start node of the landmark selection.
    pub seed: u64,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        LandmarkConfig {
            landmarks: 16,
            active_landmarks: 4,
            minimum_nodes: 500,
            maximum_weight: None,
            seed: 0,
        }
    }
}

impl LandmarkConfig {
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.landmarks < 2 {
            return Err(RoutingError::InvalidLandmarkConfig("at least two landmarks are required"));
        }
        if self.active_landmarks == 0 || self.active_landmarks > self.landmarks {
            return Err(RoutingError::InvalidLandmarkConfig("active landmarks must be in [1, landmarks]"));
        }
        if let Some(max) = self.maximum_weight {
            if !(max > 0.0) {
                return Err(RoutingError::InvalidLandmarkConfig("maximum weight must be positive"));
            }
        }
        Ok(())
    }
}

/// Subnetworks, landmarks and their weight tables.
/// Table rows are landmark slots: slot `i` of a node refers to the `i`-th landmark of the node's subnetwork.
#[derive(Debug, Clone)]
pub struct LandmarkStorage {
    active_landmarks: usize,
    horizon: Weight,
    subnetworks: Vec<u32>,
    // per subnetwork, empty for NO_SUBNETWORK
    landmarks: Vec<Vec<NodeId>>,
    // landmark -> node
    from_weights: Vec<Vec<Weight>>,
    // node -> landmark
    to_weights: Vec<Vec<Weight>>,
}

pub fn prepare_landmarks<G: RoadGraph, W: Weighting + ?Sized>(graph: &G, weighting: &W, config: &LandmarkConfig) -> Result<LandmarkStorage, RoutingError> {
    config.validate()?;
    let n = graph.num_nodes();
    let count = config.landmarks;
    let horizon = config.maximum_weight.unwrap_or(INFINITY);

    let components = report_time_with_key("subnetwork detection", "subnetworks_running_time_ms", || strongly_connected_components(graph, weighting));

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut subnetworks = vec![NO_SUBNETWORK; n];
    let mut landmarks = vec![Vec::new()];
    let mut members = vec![Vec::new()];
    for component in components {
        if component.len() < config.minimum_nodes.max(count) {
            continue;
        }
        let id = landmarks.len() as u32;
        for &node in &component {
            subnetworks[node as usize] = id;
        }
        let start = component[rng.gen_range(0..component.len())];
        landmarks.push(farthest_landmarks(graph, weighting, &subnetworks, &component, start, count));
        members.push(component);
    }
    report!("num_subnetworks_with_landmarks", landmarks.len() - 1);
    report!("num_nodes_without_landmarks", subnetworks.iter().filter(|&&s| s == NO_SUBNETWORK).count());

    let mut from_weights = vec![vec![UNREACHABLE; n]; count];
    let mut to_weights = vec![vec![UNREACHABLE; n]; count];
    let mut data = DijkstraData::new(n);
    report_time_with_key("landmark weight tables", "landmark_tables_running_time_ms", || {
        for (subnetwork, nodes) in members.iter().enumerate().skip(1) {
            for slot in 0..count {
                let landmark = landmarks[subnetwork][slot];
                for (table, reverse) in [(&mut from_weights[slot], false), (&mut to_weights[slot], true)] {
                    one_to_all(graph, weighting, landmark, reverse, horizon, &mut data);
                    for &node in nodes {
                        table[node as usize] = data.weight(node);
                    }
                }
            }
        }
    });

    Ok(LandmarkStorage {
        active_landmarks: config.active_landmarks,
        horizon,
        subnetworks,
        landmarks,
        from_weights,
        to_weights,
    })
}

/// Farthest point heuristic by hop count within the component: each new landmark is the node
/// explored last by a breadth first search from all previous landmarks.
/// The first one is the node farthest from `start`.
fn farthest_landmarks<G: RoadGraph, W: Weighting + ?Sized>(graph: &G, weighting: &W, subnetworks: &[u32], component: &[NodeId], start: NodeId, count: usize) -> Vec<NodeId> {
    let subnetwork = subnetworks[start as usize];
    let mut landmarks: Vec<NodeId> = Vec::with_capacity(count);
    let mut visited = vec![false; graph.num_nodes()];
    let mut queue = VecDeque::new();
    let mut sources = vec![start];

    while landmarks.len() < count {
        for &node in component {
            visited[node as usize] = false;
        }
        queue.clear();
        for &source in &sources {
            visited[source as usize] = true;
            queue.push_back(source);
        }
        let mut last = start;
        while let Some(node) = queue.pop_front() {
            last = node;
            for state in graph.link_iter(node) {
                let usable = weighting.edge_weight(&state, false) < INFINITY || weighting.edge_weight(&state, true) < INFINITY;
                let adj = state.adj as usize;
                if usable && !visited[adj] && subnetworks[adj] == subnetwork {
                    visited[adj] = true;
                    queue.push_back(state.adj);
                }
            }
        }
        if landmarks.contains(&last) {
            // tiny components: everything is close to some landmark already
            last = match component.iter().find(|&&node| !landmarks.contains(&node)) {
                Some(&node) => node,
                None => break,
            };
        }
        landmarks.push(last);
        sources = landmarks.clone();
    }
    landmarks
}

impl LandmarkStorage {
    pub fn num_nodes(&self) -> usize {
        self.subnetworks.len()
    }

    pub fn landmark_count(&self) -> usize {
        self.from_weights.len()
    }

    pub fn active_landmarks(&self) -> usize {
        self.active_landmarks
    }

    pub fn subnetwork(&self, node: NodeId) -> u32 {
        self.subnetworks[node as usize]
    }

    /// Landmarks of a subnetwork, empty for `NO_SUBNETWORK`.
    pub fn landmarks(&self, subnetwork: u32) -> &[NodeId] {
        &self.landmarks[subnetwork as usize]
    }

    pub fn num_subnetworks(&self) -> usize {
        self.landmarks.len() - 1
    }

    /// Weight from the landmark in `slot` of the node's subnetwork to the node.
    pub fn from_weight(&self, slot: usize, node: NodeId) -> Weight {
        self.from_weights[slot][node as usize]
    }

    /// Weight from the node to the landmark in `slot` of its subnetwork.
    pub fn to_weight(&self, slot: usize, node: NodeId) -> Weight {
        self.to_weights[slot][node as usize]
    }

    /// Lower bound of the weight from `from` to `to` using a single landmark.
    /// Both nodes must belong to the same subnetwork.
    /// Table values beyond the horizon are only known to be at least the horizon.
    fn bound(&self, slot: usize, from: NodeId, to: NodeId) -> Weight {
        let via_to = self.difference(self.to_weight(slot, from), self.to_weight(slot, to));
        let via_from = self.difference(self.from_weight(slot, to), self.from_weight(slot, from));
        via_to.max(via_from).max(0.0)
    }

    // lower bound of `minuend` minus the exact `subtrahend`
    fn difference(&self, minuend: Weight, subtrahend: Weight) -> Weight {
        if subtrahend == UNREACHABLE {
            return 0.0;
        }
        let minuend = if minuend == UNREACHABLE { self.horizon } else { minuend };
        let diff = minuend - subtrahend;
        if diff.is_finite() {
            diff
        } else {
            0.0
        }
    }
}

/// Lower bounds from the landmark tables. `new` bounds the weight towards the target,
/// `reversed` the weight from the target (the source of the query) to a node.
/// Nodes outside the subnetwork of the target, and queries between different subnetworks, get 0.
#[derive(Debug, Clone)]
pub struct ALTPotential<'a> {
    storage: &'a LandmarkStorage,
    reversed: bool,
    target: NodeId,
    subnetwork: u32,
    active: Vec<usize>,
}

impl<'a> ALTPotential<'a> {
    pub fn new(storage: &'a LandmarkStorage) -> Self {
        ALTPotential {
            storage,
            reversed: false,
            target: NO_NODE,
            subnetwork: NO_SUBNETWORK,
            active: Vec::new(),
        }
    }

    pub fn reversed(storage: &'a LandmarkStorage) -> Self {
        ALTPotential { reversed: true, ..Self::new(storage) }
    }

    /// Landmark slots selected by the last `init`.
    pub fn active_landmarks(&self) -> &[usize] {
        &self.active
    }

    fn bound(&self, slot: usize, node: NodeId) -> Weight {
        if self.reversed {
            self.storage.bound(slot, self.target, node)
        } else {
            self.storage.bound(slot, node, self.target)
        }
    }
}

impl<'a> Potential for ALTPotential<'a> {
    fn init(&mut self, source: NodeId, target: NodeId) {
        self.target = target;
        self.subnetwork = NO_SUBNETWORK;
        self.active.clear();

        let subnetwork = self.storage.subnetwork(target);
        if subnetwork == NO_SUBNETWORK || subnetwork != self.storage.subnetwork(source) {
            return;
        }
        self.subnetwork = subnetwork;

        let (from, to) = if self.reversed { (target, source) } else { (source, target) };
        let mut slots: Vec<(usize, Weight)> = (0..self.storage.landmark_count()).map(|slot| (slot, self.storage.bound(slot, from, to))).collect();
        slots.sort_by(|(slot_a, bound_a), (slot_b, bound_b)| bound_b.total_cmp(bound_a).then(slot_a.cmp(slot_b)));
        self.active
            .extend(slots.into_iter().take(self.storage.active_landmarks()).map(|(slot, _)| slot));
    }

    fn potential(&mut self, node: NodeId) -> Option<Weight> {
        if self.subnetwork == NO_SUBNETWORK || self.storage.subnetwork(node) != self.subnetwork {
            return Some(0.0);
        }
        Some(self.active.iter().map(|&slot| self.bound(slot, node)).fold(0.0, Weight::max))
    }
}

impl Deconstruct for LandmarkStorage {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        let meta = vec![self.landmark_count() as u64, self.active_landmarks as u64, self.landmarks.len() as u64];
        store("landmark_meta", &meta)?;
        store("landmark_horizon", &vec![self.horizon])?;
        store("subnetwork", &self.subnetworks)?;
        store("landmark_nodes", &self.landmarks.concat())?;
        store("landmark_from", &self.from_weights.concat())?;
        store("landmark_to", &self.to_weights.concat())?;
        Ok(())
    }
}

impl Reconstruct for LandmarkStorage {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let meta: Vec<u64> = loader.load_vec("landmark_meta", 3)?;
        let (count, active_landmarks, num_subnetworks) = (meta[0] as usize, meta[1] as usize, meta[2] as usize);
        if num_subnetworks == 0 || active_landmarks == 0 || active_landmarks > count {
            return Err(RoutingError::InconsistentData("invalid landmark meta data".to_string()).into());
        }
        let horizon = loader.load_vec::<Weight, _>("landmark_horizon", 1)?[0];
        let subnetworks: Vec<u32> = loader.load("subnetwork")?;
        let n = subnetworks.len();
        if subnetworks.iter().any(|&s| s as usize >= num_subnetworks) {
            return Err(RoutingError::InconsistentData("subnetwork id out of range".to_string()).into());
        }
        let nodes: Vec<NodeId> = loader.load_vec("landmark_nodes", (num_subnetworks - 1) * count)?;
        if nodes.iter().any(|&node| node as usize >= n) {
            return Err(RoutingError::InconsistentData("landmark out of range".to_string()).into());
        }
        let from: Vec<Weight> = loader.load_vec("landmark_from", count * n)?;
        let to: Vec<Weight> = loader.load_vec("landmark_to", count * n)?;

        let mut landmarks = vec![Vec::new()];
        landmarks.extend(nodes.chunks(count.max(1)).map(<[NodeId]>::to_vec));
        let rows = |table: Vec<Weight>| -> Vec<Vec<Weight>> {
            if n == 0 {
                vec![Vec::new(); count]
            } else {
                table.chunks(n).map(<[Weight]>::to_vec).collect()
            }
        };
        Ok(LandmarkStorage {
            active_landmarks,
            horizon,
            subnetworks,
            landmarks,
            from_weights: rows(from),
            to_weights: rows(to),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastr::graph::base_graph::*;
    use crate::weighting::ShortestWeighting;

    // 5x5 grid with varying lengths, plus a one way strip of three nodes not reachable back
    fn grid() -> BaseGraph {
        let mut builder = GraphBuilder::new();
        for row in 0..5 {
            for col in 0..5 {
                builder.add_node(50.0 + row as f64 * 0.001, 8.0 + col as f64 * 0.001);
            }
        }
        let id = |row: u32, col: u32| row * 5 + col;
        for row in 0..5 {
            for col in 0..5 {
                if col < 4 {
                    builder.add_edge(id(row, col), id(row, col + 1), 10.0 + ((row * 7 + col * 3) % 5) as f64, EdgeFlags::both_directions(50.0));
                }
                if row < 4 {
                    let flags = if (row + col) % 3 == 0 { EdgeFlags::one_way(50.0) } else { EdgeFlags::both_directions(50.0) };
                    builder.add_edge(id(row, col), id(row + 1, col), 12.0 + ((row + col * 5) % 4) as f64, flags);
                }
            }
        }
        let a = builder.add_node(50.1, 8.1);
        let b = builder.add_node(50.1, 8.2);
        let c = builder.add_node(50.1, 8.3);
        builder.add_edge(a, b, 5.0, EdgeFlags::one_way(50.0));
        builder.add_edge(b, c, 5.0, EdgeFlags::one_way(50.0));
        builder.freeze()
    }

    fn config() -> LandmarkConfig {
        LandmarkConfig {
            landmarks: 4,
            active_landmarks: 2,
            minimum_nodes: 5,
            ..Default::default()
        }
    }

    #[test]
    fn small_subnetworks_get_no_landmarks() {
        let graph = grid();
        let storage = prepare_landmarks(&graph, &ShortestWeighting::new(), &config()).unwrap();
        assert_eq!(storage.num_subnetworks(), 1);
        assert_eq!(storage.subnetwork(25), NO_SUBNETWORK);
        assert_eq!(storage.subnetwork(0), 1);
        let landmarks = storage.landmarks(1);
        assert_eq!(landmarks.len(), 4);
        assert!(landmarks.iter().all(|&l| l < 25));
        for (i, l) in landmarks.iter().enumerate() {
            assert!(!landmarks[i + 1..].contains(l));
            assert_eq!(storage.from_weight(i, *l), 0.0);
            assert_eq!(storage.to_weight(i, *l), 0.0);
        }
    }

    #[test]
    fn bounds_are_feasible_lower_bounds() {
        let graph = grid();
        let weighting = ShortestWeighting::new();
        let storage = prepare_landmarks(&graph, &weighting, &config()).unwrap();
        let mut data = DijkstraData::new(graph.num_nodes());
        for target in [0, 7, 13, 24] {
            one_to_all(&graph, &weighting, target, true, INFINITY, &mut data);
            let mut potential = ALTPotential::new(&storage);
            potential.init(3, target);
            assert_eq!(potential.active_landmarks().len(), 2);
            for node in 0..graph.num_nodes() as NodeId {
                let pot = potential.potential(node).unwrap();
                assert!(pot <= data.weight(node) + 1e-9);
                for state in graph.link_iter(node) {
                    let w = weighting.edge_weight(&state, false);
                    if w < INFINITY {
                        assert!(pot <= w + potential.potential(state.adj).unwrap() + 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn reversed_bounds_weights_from_the_source() {
        let graph = grid();
        let weighting = ShortestWeighting::new();
        let storage = prepare_landmarks(&graph, &weighting, &config()).unwrap();
        let mut data = DijkstraData::new(graph.num_nodes());
        one_to_all(&graph, &weighting, 6, false, INFINITY, &mut data);
        let mut potential = ALTPotential::reversed(&storage);
        potential.init(18, 6);
        for node in 0..25 {
            assert!(potential.potential(node).unwrap() <= data.weight(node) + 1e-9);
        }
        assert_eq!(potential.potential(6), Some(0.0));
    }

    #[test]
    fn horizon_keeps_bounds_feasible() {
        let graph = grid();
        let weighting = ShortestWeighting::new();
        let storage = prepare_landmarks(&graph, &weighting, &LandmarkConfig { maximum_weight: Some(30.0), ..config() }).unwrap();
        let mut data = DijkstraData::new(graph.num_nodes());
        one_to_all(&graph, &weighting, 12, true, INFINITY, &mut data);
        let mut potential = ALTPotential::new(&storage);
        potential.init(0, 12);
        for node in 0..25 {
            let pot = potential.potential(node).unwrap();
            assert!(pot <= data.weight(node) + 1e-9);
            for state in graph.link_iter(node) {
                let w = weighting.edge_weight(&state, false);
                if w < INFINITY {
                    assert!(pot <= w + potential.potential(state.adj).unwrap() + 1e-9);
                }
            }
        }
    }

    #[test]
    fn other_subnetworks_fall_back_to_zero() {
        let graph = grid();
        let storage = prepare_landmarks(&graph, &ShortestWeighting::new(), &config()).unwrap();
        let mut potential = ALTPotential::new(&storage);
        potential.init(25, 3);
        assert_eq!(potential.potential(25), Some(0.0));
        assert_eq!(potential.potential(10), Some(0.0));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let graph = grid();
        let weighting = ShortestWeighting::new();
        for config in [
            LandmarkConfig { landmarks: 1, active_landmarks: 1, ..config() },
            LandmarkConfig { active_landmarks: 5, ..config() },
            LandmarkConfig { maximum_weight: Some(-1.0), ..config() },
        ] {
            assert!(matches!(prepare_landmarks(&graph, &weighting, &config), Err(RoutingError::InvalidLandmarkConfig(_))));
        }
    }

    #[test]
    fn storage_round_trip() {
        let graph = grid();
        let weighting = ShortestWeighting::new();
        let storage = prepare_landmarks(&graph, &weighting, &config()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        storage.deconstruct_to(&dir.path()).unwrap();
        let loaded = LandmarkStorage::reconstruct_from(&dir.path()).unwrap();
        assert_eq!(loaded.landmarks(1), storage.landmarks(1));
        assert_eq!(loaded.subnetwork(25), NO_SUBNETWORK);
        for node in 0..25 {
            assert_eq!(loaded.to_weight(3, node), storage.to_weight(3, node));
        }
        let (mut a, mut b) = (ALTPotential::new(&storage), ALTPotential::new(&loaded));
        a.init(0, 24);
        b.init(0, 24);
        assert_eq!(a.potential(5), b.potential(5));
    }
}
