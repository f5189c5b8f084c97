use crate::datastr::graph::*;
use crate::error::RoutingError;
use crate::io::*;

/// Contraction level of a node: 0 is contracted first.
pub type Level = u32;

/// A contraction order, mapping both ways between nodes and their levels.
/// Keeping both directions in one type makes it clear which mapping is meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOrder {
    // nodes ordered by level, ascending in importance
    node_order: Vec<NodeId>,
    // level of each node
    levels: Vec<Level>,
}

impl NodeOrder {
    /// Level equals the node id.
    pub fn identity(n: usize) -> NodeOrder {
        NodeOrder {
            node_order: (0..n as NodeId).collect(),
            levels: (0..n as Level).collect(),
        }
    }

    /// Creates an order from the list of nodes in contraction order.
    /// Fails if the list is not a permutation of `0..node_order.len()`.
    pub fn from_node_order(node_order: Vec<NodeId>) -> Result<NodeOrder, RoutingError> {
        let n = node_order.len();
        let mut levels = vec![NO_NODE; n];
        for (level, &node) in node_order.iter().enumerate() {
            match levels.get_mut(node as usize) {
                Some(slot) if *slot == NO_NODE => *slot = level as Level,
                _ => return Err(RoutingError::InvalidNodeOrder(node)),
            }
        }
        Ok(NodeOrder { node_order, levels })
    }

    /// Creates an order from the level of each node.
    /// Fails if the levels are not a permutation of `0..levels.len()`.
    pub fn from_levels(levels: Vec<Level>) -> Result<NodeOrder, RoutingError> {
        let n = levels.len();
        let mut node_order = vec![NO_NODE; n];
        for (node, &level) in levels.iter().enumerate() {
            match node_order.get_mut(level as usize) {
                Some(slot) if *slot == NO_NODE => *slot = node as NodeId,
                _ => return Err(RoutingError::InvalidNodeOrder(node as NodeId)),
            }
        }
        Ok(NodeOrder { node_order, levels })
    }

    /// Nodes in contraction order
    pub fn order(&self) -> &[NodeId] {
        &self.node_order
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, node: NodeId) -> Level {
        self.levels[node as usize]
    }

    pub fn node(&self, level: Level) -> NodeId {
        self.node_order[level as usize]
    }

    pub fn len(&self) -> usize {
        self.node_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Deconstruct for NodeOrder {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        store("level", &self.levels)
    }
}

impl Reconstruct for NodeOrder {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        Ok(Self::from_levels(loader.load("level")?)?)
    }
}
