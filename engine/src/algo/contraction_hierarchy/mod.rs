//! Contraction Hierarchies.
//!
//! Nodes are contracted one after another, adding shortcuts wherever removing a node would destroy a shortest path.
//! The result is split into an upward out and an upward in graph: every arc is stored at its lower end point.
//! Queries then run two searches which only ever go up and meet at the highest node of the shortest path.
//!
//! Arcs are identified by keys. Keys below `2 * num_edges` are the keys of the original edges,
//! shortcut `i` has key `2 * (num_edges + i)`. Edge based arcs additionally know the first and the last original key
//! of the path they represent, so turn costs can be applied between arcs.

use super::*;
use crate::datastr::node_order::*;
use crate::error::RoutingError;
use crate::io::*;

pub mod edge_query;
mod edge_contractor;
mod node_contractor;
mod preparation_graph;
pub mod prepare;
pub mod query;
pub mod unpacking;
mod witness_search;

pub use self::edge_query::EdgeChQuery;
pub use self::prepare::{prepare_ch, ChConfig, ContractionParams};
pub use self::query::ChQuery;

/// An arc of the upward graphs.
/// In `upward_out(v)` `adj` is the head, in `upward_in(v)` it is the tail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChArc {
    pub key: EdgeKey,
    pub adj: NodeId,
    pub weight: Weight,
    /// First original edge key of the represented path.
    pub first_orig: EdgeKey,
    /// Last original edge key of the represented path.
    pub last_orig: EdgeKey,
}

/// What an arc key stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChEdge {
    Original(EdgeKey),
    /// The two skipped arcs, in travel order.
    Shortcut(EdgeKey, EdgeKey),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shortcut {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: Weight,
    pub skip1: EdgeKey,
    pub skip2: EdgeKey,
    pub first_orig: EdgeKey,
    pub last_orig: EdgeKey,
}

/// Read access to a hierarchy, for queries and unpacking.
pub trait ChGraph: Sync {
    fn num_nodes(&self) -> usize;
    fn level(&self, node: NodeId) -> Level;
    /// Arcs leaving `node` towards higher levels.
    fn upward_out(&self, node: NodeId) -> &[ChArc];
    /// Arcs arriving at `node` from higher levels, `adj` is their tail.
    fn upward_in(&self, node: NodeId) -> &[ChArc];
    fn is_edge_based(&self) -> bool;
    fn expand(&self, key: EdgeKey) -> ChEdge;
}

/// A finished hierarchy. Immutable, queries only borrow it.
#[derive(Debug, Clone)]
pub struct ContractionHierarchy {
    edge_based: bool,
    num_edges: usize,
    order: NodeOrder,
    up_out_first: Vec<u32>,
    up_out: Vec<ChArc>,
    up_in_first: Vec<u32>,
    up_in: Vec<ChArc>,
    shortcuts: Vec<Shortcut>,
}

fn flatten(lists: Vec<Vec<ChArc>>) -> (Vec<u32>, Vec<ChArc>) {
    let mut first = Vec::with_capacity(lists.len() + 1);
    first.push(0);
    let mut arcs = Vec::with_capacity(lists.iter().map(Vec::len).sum());
    for list in lists {
        arcs.extend(list);
        first.push(arcs.len() as u32);
    }
    (first, arcs)
}

impl ContractionHierarchy {
    pub(crate) fn new(edge_based: bool, num_edges: usize, order: NodeOrder, up_out: Vec<Vec<ChArc>>, up_in: Vec<Vec<ChArc>>, shortcuts: Vec<Shortcut>) -> Self {
        assert_eq!(order.len(), up_out.len());
        assert_eq!(order.len(), up_in.len());
        let (up_out_first, up_out) = flatten(up_out);
        let (up_in_first, up_in) = flatten(up_in);
        ContractionHierarchy {
            edge_based,
            num_edges,
            order,
            up_out_first,
            up_out,
            up_in_first,
            up_in,
            shortcuts,
        }
    }

    /// The contraction order, for contracting again with another weighting.
    pub fn node_order(&self) -> &NodeOrder {
        &self.order
    }

    /// Number of edges of the graph the hierarchy was built on.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn num_shortcuts(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn shortcut(&self, key: EdgeKey) -> Option<&Shortcut> {
        if self.is_shortcut(key) {
            self.shortcuts.get(key as usize / 2 - self.num_edges)
        } else {
            None
        }
    }

    pub fn is_shortcut(&self, key: EdgeKey) -> bool {
        key as usize >= 2 * self.num_edges
    }

    /// Size of the arc key space.
    pub fn num_keys(&self) -> usize {
        2 * (self.num_edges + self.shortcuts.len())
    }
}

impl ChGraph for ContractionHierarchy {
    fn num_nodes(&self) -> usize {
        self.order.len()
    }

    fn level(&self, node: NodeId) -> Level {
        self.order.level(node)
    }

    fn upward_out(&self, node: NodeId) -> &[ChArc] {
        let node = node as usize;
        &self.up_out[self.up_out_first[node] as usize..self.up_out_first[node + 1] as usize]
    }

    fn upward_in(&self, node: NodeId) -> &[ChArc] {
        let node = node as usize;
        &self.up_in[self.up_in_first[node] as usize..self.up_in_first[node + 1] as usize]
    }

    fn is_edge_based(&self) -> bool {
        self.edge_based
    }

    fn expand(&self, key: EdgeKey) -> ChEdge {
        match self.shortcut(key) {
            Some(shortcut) => ChEdge::Shortcut(shortcut.skip1, shortcut.skip2),
            None => ChEdge::Original(key),
        }
    }
}

impl<C: ChGraph> ChGraph for &C {
    fn num_nodes(&self) -> usize {
        (**self).num_nodes()
    }
    fn level(&self, node: NodeId) -> Level {
        (**self).level(node)
    }
    fn upward_out(&self, node: NodeId) -> &[ChArc] {
        (**self).upward_out(node)
    }
    fn upward_in(&self, node: NodeId) -> &[ChArc] {
        (**self).upward_in(node)
    }
    fn is_edge_based(&self) -> bool {
        (**self).is_edge_based()
    }
    fn expand(&self, key: EdgeKey) -> ChEdge {
        (**self).expand(key)
    }
}

fn store_arcs(prefix: &str, first: &Vec<u32>, arcs: &[ChArc], store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
    store(&format!("{}_first_out", prefix), first)?;
    store(&format!("{}_key", prefix), &arcs.iter().map(|arc| arc.key).collect::<Vec<_>>())?;
    store(&format!("{}_adj", prefix), &arcs.iter().map(|arc| arc.adj).collect::<Vec<_>>())?;
    store(&format!("{}_weight", prefix), &arcs.iter().map(|arc| arc.weight).collect::<Vec<_>>())?;
    store(&format!("{}_first_orig", prefix), &arcs.iter().map(|arc| arc.first_orig).collect::<Vec<_>>())?;
    store(&format!("{}_last_orig", prefix), &arcs.iter().map(|arc| arc.last_orig).collect::<Vec<_>>())?;
    Ok(())
}

fn load_arcs(prefix: &str, n: usize, num_keys: usize, loader: &Loader) -> std::io::Result<(Vec<u32>, Vec<ChArc>)> {
    let first: Vec<u32> = loader.load_vec(format!("{}_first_out", prefix), n + 1)?;
    let m = first[n] as usize;
    if first[0] != 0 || first.windows(2).any(|w| w[0] > w[1]) {
        return Err(RoutingError::InconsistentData(format!("{}_first_out is not monotone", prefix)).into());
    }
    let keys: Vec<EdgeKey> = loader.load_vec(format!("{}_key", prefix), m)?;
    let adj: Vec<NodeId> = loader.load_vec(format!("{}_adj", prefix), m)?;
    let weights: Vec<Weight> = loader.load_vec(format!("{}_weight", prefix), m)?;
    let first_orig: Vec<EdgeKey> = loader.load_vec(format!("{}_first_orig", prefix), m)?;
    let last_orig: Vec<EdgeKey> = loader.load_vec(format!("{}_last_orig", prefix), m)?;
    if keys.iter().any(|&key| key as usize >= num_keys) || adj.iter().any(|&node| node as usize >= n) {
        return Err(RoutingError::InconsistentData(format!("{} arc out of range", prefix)).into());
    }
    let arcs = (0..m)
        .map(|i| ChArc {
            key: keys[i],
            adj: adj[i],
            weight: weights[i],
            first_orig: first_orig[i],
            last_orig: last_orig[i],
        })
        .collect();
    Ok((first, arcs))
}

impl Deconstruct for ContractionHierarchy {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        store("ch_meta", &vec![self.edge_based as u64, self.num_edges as u64])?;
        store("level", &self.order.levels().to_vec())?;
        store_arcs("up_out", &self.up_out_first, &self.up_out, store)?;
        store_arcs("up_in", &self.up_in_first, &self.up_in, store)?;
        let field = |f: fn(&Shortcut) -> u32| self.shortcuts.iter().map(f).collect::<Vec<u32>>();
        store("shortcut_from", &field(|s| s.from))?;
        store("shortcut_to", &field(|s| s.to))?;
        store("shortcut_weight", &self.shortcuts.iter().map(|s| s.weight).collect::<Vec<_>>())?;
        store("shortcut_skip1", &field(|s| s.skip1))?;
        store("shortcut_skip2", &field(|s| s.skip2))?;
        store("shortcut_first_orig", &field(|s| s.first_orig))?;
        store("shortcut_last_orig", &field(|s| s.last_orig))?;
        Ok(())
    }
}

impl Reconstruct for ContractionHierarchy {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let meta: Vec<u64> = loader.load_vec("ch_meta", 2)?;
        let edge_based = meta[0] != 0;
        let num_edges = meta[1] as usize;
        let order = NodeOrder::from_levels(loader.load("level")?)?;
        let n = order.len();

        let from: Vec<NodeId> = loader.load("shortcut_from")?;
        let s = from.len();
        let to: Vec<NodeId> = loader.load_vec("shortcut_to", s)?;
        let weight: Vec<Weight> = loader.load_vec("shortcut_weight", s)?;
        let skip1: Vec<EdgeKey> = loader.load_vec("shortcut_skip1", s)?;
        let skip2: Vec<EdgeKey> = loader.load_vec("shortcut_skip2", s)?;
        let first_orig: Vec<EdgeKey> = loader.load_vec("shortcut_first_orig", s)?;
        let last_orig: Vec<EdgeKey> = loader.load_vec("shortcut_last_orig", s)?;
        let num_keys = 2 * (num_edges + s);
        let shortcuts: Vec<Shortcut> = (0..s)
            .map(|i| Shortcut {
                from: from[i],
                to: to[i],
                weight: weight[i],
                skip1: skip1[i],
                skip2: skip2[i],
                first_orig: first_orig[i],
                last_orig: last_orig[i],
            })
            .collect();
        // preparation only records shortcuts skipping smaller keys, anything else cannot be unpacked
        for (i, shortcut) in shortcuts.iter().enumerate() {
            let key = 2 * (num_edges + i);
            if shortcut.from as usize >= n || shortcut.to as usize >= n || shortcut.skip1 as usize >= key || shortcut.skip2 as usize >= key {
                return Err(RoutingError::InconsistentData(format!("broken shortcut {}", i)).into());
            }
        }

        let (up_out_first, up_out) = load_arcs("up_out", n, num_keys, &loader)?;
        let (up_in_first, up_in) = load_arcs("up_in", n, num_keys, &loader)?;
        Ok(ContractionHierarchy {
            edge_based,
            num_edges,
            order,
            up_out_first,
            up_out,
            up_in_first,
            up_in,
            shortcuts,
        })
    }
}

/// The edge of an original key, `NO_EDGE` for `NO_KEY`.
#[inline]
pub(crate) fn orig_edge(key: EdgeKey) -> EdgeId {
    if key == NO_KEY {
        NO_EDGE
    } else {
        key_edge(key)
    }
}
