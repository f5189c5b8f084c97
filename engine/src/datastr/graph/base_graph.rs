//! The immutable road graph and the builder creating it.

use super::*;
use crate::io::*;

/// Collects nodes and edges. `freeze` turns it into a `BaseGraph`.
/// Invalid input (unknown nodes, negative or NaN distances) panics right away.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    edge_base: Vec<NodeId>,
    edge_adj: Vec<NodeId>,
    distance: Vec<f64>,
    flags: Vec<EdgeFlags>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, lat: f64, lon: f64) -> NodeId {
        assert!(lat.is_finite() && lon.is_finite(), "invalid coordinate {} {}", lat, lon);
        assert!(self.latitude.len() < NO_NODE as usize, "too many nodes");
        self.latitude.push(lat);
        self.longitude.push(lon);
        (self.latitude.len() - 1) as NodeId
    }

    pub fn add_edge(&mut self, base: NodeId, adj: NodeId, distance: f64, flags: EdgeFlags) -> EdgeId {
        let n = self.num_nodes();
        assert!((base as usize) < n && (adj as usize) < n, "edge {}-{} references unknown node, {} nodes", base, adj, n);
        assert!(distance >= 0.0 && distance.is_finite(), "invalid edge distance {}", distance);
        assert!(self.edge_base.len() < (1 << 30), "too many edges");
        self.edge_base.push(base);
        self.edge_adj.push(adj);
        self.distance.push(distance);
        self.flags.push(flags);
        (self.edge_base.len() - 1) as EdgeId
    }

    pub fn num_nodes(&self) -> usize {
        self.latitude.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_base.len()
    }

    pub fn freeze(self) -> BaseGraph {
        BaseGraph::new(self.latitude, self.longitude, self.edge_base, self.edge_adj, self.distance, self.flags)
    }
}

/// Node coordinates, per edge attributes and for each node the keys of its incident edges in CSR layout.
#[derive(Debug, Clone)]
pub struct BaseGraph {
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    edge_base: Vec<NodeId>,
    edge_adj: Vec<NodeId>,
    distance: Vec<f64>,
    flags: Vec<EdgeFlags>,
    // keys of the states starting at a node, `first_out[node]..first_out[node + 1]`
    first_out: Vec<u32>,
    incident: Vec<EdgeKey>,
}

impl BaseGraph {
    fn new(latitude: Vec<f64>, longitude: Vec<f64>, edge_base: Vec<NodeId>, edge_adj: Vec<NodeId>, distance: Vec<f64>, flags: Vec<EdgeFlags>) -> Self {
        let n = latitude.len();
        let mut first_out = vec![0u32; n + 1];
        for (&base, &adj) in edge_base.iter().zip(edge_adj.iter()) {
            first_out[base as usize + 1] += 1;
            first_out[adj as usize + 1] += 1;
        }
        for node in 0..n {
            first_out[node + 1] += first_out[node];
        }

        let mut next = first_out.clone();
        let mut incident = vec![NO_KEY; 2 * edge_base.len()];
        for (edge, (&base, &adj)) in edge_base.iter().zip(edge_adj.iter()).enumerate() {
            incident[next[base as usize] as usize] = edge_key(edge as EdgeId, false);
            next[base as usize] += 1;
            incident[next[adj as usize] as usize] = edge_key(edge as EdgeId, true);
            next[adj as usize] += 1;
        }

        BaseGraph {
            latitude,
            longitude,
            edge_base,
            edge_adj,
            distance,
            flags,
            first_out,
            incident,
        }
    }

    pub fn edge_nodes(&self, edge: EdgeId) -> (NodeId, NodeId) {
        (self.edge_base[edge as usize], self.edge_adj[edge as usize])
    }

    pub fn distance(&self, edge: EdgeId) -> f64 {
        self.distance[edge as usize]
    }

    pub fn flags(&self, edge: EdgeId) -> EdgeFlags {
        self.flags[edge as usize]
    }
}

impl Graph for BaseGraph {
    fn num_nodes(&self) -> usize {
        self.latitude.len()
    }

    fn num_arcs(&self) -> usize {
        self.incident.len()
    }

    fn degree(&self, node: NodeId) -> usize {
        (self.first_out[node as usize + 1] - self.first_out[node as usize]) as usize
    }
}

/// Iterator over the edge states of a node in a `BaseGraph`.
#[derive(Debug, Clone)]
pub struct EdgeStateIter<'a> {
    graph: &'a BaseGraph,
    keys: std::slice::Iter<'a, EdgeKey>,
}

impl<'a> Iterator for EdgeStateIter<'a> {
    type Item = EdgeState;

    fn next(&mut self) -> Option<EdgeState> {
        self.keys.next().map(|&key| self.graph.edge_state_by_key(key))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl LinkIterable<EdgeState> for BaseGraph {
    type Iter<'a> = EdgeStateIter<'a>;

    fn link_iter(&self, node: NodeId) -> Self::Iter<'_> {
        let range = self.first_out[node as usize] as usize..self.first_out[node as usize + 1] as usize;
        EdgeStateIter {
            graph: self,
            keys: self.incident[range].iter(),
        }
    }
}

impl RoadGraph for BaseGraph {
    fn num_edges(&self) -> usize {
        self.edge_base.len()
    }

    fn edge_state(&self, edge: EdgeId, adj: NodeId) -> EdgeState {
        let (base_node, adj_node) = self.edge_nodes(edge);
        if adj_node == adj {
            self.edge_state_by_key(edge_key(edge, false))
        } else if base_node == adj {
            self.edge_state_by_key(edge_key(edge, true))
        } else {
            panic!("edge {} ({}-{}) does not end at node {}", edge, base_node, adj_node, adj)
        }
    }

    fn edge_state_by_key(&self, key: EdgeKey) -> EdgeState {
        let edge = key_edge(key);
        let reverse = key_is_reverse(key);
        let (base, adj) = self.edge_nodes(edge);
        let (base, adj) = if reverse { (adj, base) } else { (base, adj) };
        EdgeState {
            edge,
            base,
            adj,
            reverse,
            distance: self.distance[edge as usize],
            flags: self.flags[edge as usize],
            orig_edge: edge,
        }
    }

    fn coordinate(&self, node: NodeId) -> Coordinate {
        Coordinate::new(self.latitude[node as usize], self.longitude[node as usize])
    }
}

impl Deconstruct for BaseGraph {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        store("latitude", &self.latitude)?;
        store("longitude", &self.longitude)?;
        store("edge_base", &self.edge_base)?;
        store("edge_adj", &self.edge_adj)?;
        store("edge_distance", &self.distance)?;
        store("edge_flags", &self.flags)?;
        Ok(())
    }
}

impl Reconstruct for BaseGraph {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let latitude: Vec<f64> = loader.load("latitude")?;
        let n = latitude.len();
        let longitude = loader.load_vec("longitude", n)?;
        let edge_base: Vec<NodeId> = loader.load("edge_base")?;
        let m = edge_base.len();
        let edge_adj: Vec<NodeId> = loader.load_vec("edge_adj", m)?;
        let distance = loader.load_vec("edge_distance", m)?;
        let flags = loader.load_vec("edge_flags", m)?;

        if let Some(&node) = edge_base.iter().chain(edge_adj.iter()).find(|&&node| node as usize >= n) {
            return Err(crate::RoutingError::InconsistentData(format!("edge references node {} but there are only {} nodes", node, n)).into());
        }

        Ok(BaseGraph::new(latitude, longitude, edge_base, edge_adj, distance, flags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_with_loop() -> BaseGraph {
        let mut builder = GraphBuilder::new();
        for i in 0..3 {
            builder.add_node(50.0 + i as f64 * 0.01, 8.0);
        }
        builder.add_edge(0, 1, 10.0, EdgeFlags::both_directions(50.0));
        builder.add_edge(1, 2, 20.0, EdgeFlags::one_way(50.0));
        builder.add_edge(2, 0, 30.0, EdgeFlags::both_directions(30.0));
        builder.add_edge(1, 1, 5.0, EdgeFlags::both_directions(10.0));
        builder.freeze()
    }

    #[test]
    fn link_iter_yields_states_starting_at_node() {
        let graph = triangle_with_loop();
        assert_eq!(graph.num_edges(), 4);
        assert_eq!(graph.num_arcs(), 8);
        let states: Vec<EdgeState> = graph.link_iter(1).collect();
        assert_eq!(graph.degree(1), 4);
        assert!(states.iter().all(|state| state.base == 1));
        let keys: Vec<EdgeKey> = states.iter().map(EdgeState::key).collect();
        assert_eq!(keys, vec![1, 2, 6, 7]);
        assert!(states[0].access(false));
        assert!(!states[1].access(true));
    }

    #[test]
    fn edge_state_by_adjacent_node() {
        let graph = triangle_with_loop();
        let state = graph.edge_state(1, 1);
        assert_eq!((state.base, state.adj, state.reverse), (2, 1, true));
        assert!(!state.access(false));
        assert_eq!(graph.edge_state_by_key(3), state);
    }

    #[test]
    #[should_panic]
    fn unknown_nodes_are_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add_node(0.0, 0.0);
        builder.add_edge(0, 1, 1.0, EdgeFlags::both_directions(10.0));
    }

    #[test]
    #[should_panic]
    fn negative_distances_are_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add_node(0.0, 0.0);
        builder.add_edge(0, 0, -1.0, EdgeFlags::both_directions(10.0));
    }

    #[test]
    fn round_trip_through_directory() {
        let graph = triangle_with_loop();
        let dir = tempfile::tempdir().unwrap();
        graph.deconstruct_to(&dir.path()).unwrap();
        let loaded = BaseGraph::reconstruct_from(&dir.path()).unwrap();
        assert_eq!(loaded.num_nodes(), 3);
        for key in 0..graph.num_keys() as EdgeKey {
            assert_eq!(loaded.edge_state_by_key(key), graph.edge_state_by_key(key));
        }
        assert_eq!(loaded.coordinate(2), graph.coordinate(2));
    }
}
