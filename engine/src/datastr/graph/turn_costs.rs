//! Costs for turning from one edge into another at a node.

use super::*;
use crate::io::*;
use rustc_hash::FxHashMap;

/// A single turn cost. `cost == INFINITY` is a turn restriction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnCostEntry {
    pub via: NodeId,
    pub in_edge: EdgeId,
    pub out_edge: EdgeId,
    pub cost: Weight,
}

/// Sparse turn cost table keyed by (via node, incoming edge, outgoing edge).
/// Unlisted turns cost nothing. Entries are directional: a symmetric cost needs two entries.
#[derive(Debug, Clone, Default)]
pub struct TurnCostStorage {
    costs: FxHashMap<(NodeId, EdgeId, EdgeId), Weight>,
    entries_per_node: FxHashMap<NodeId, u32>,
}

impl TurnCostStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or overwrites the cost of a turn. Panics on negative or NaN costs.
    pub fn set(&mut self, via: NodeId, in_edge: EdgeId, out_edge: EdgeId, cost: Weight) {
        assert!(cost >= 0.0, "invalid turn cost {}", cost);
        assert!(is_valid_edge(in_edge) && is_valid_edge(out_edge), "turn costs need actual edges");
        if self.costs.insert((via, in_edge, out_edge), cost).is_none() {
            *self.entries_per_node.entry(via).or_insert(0) += 1;
        }
    }

    /// Forbids a turn.
    pub fn restrict(&mut self, via: NodeId, in_edge: EdgeId, out_edge: EdgeId) {
        self.set(via, in_edge, out_edge, INFINITY)
    }

    pub fn get(&self, via: NodeId, in_edge: EdgeId, out_edge: EdgeId) -> Weight {
        self.costs.get(&(via, in_edge, out_edge)).copied().unwrap_or(0.0)
    }

    /// Removes a turn cost, returning it if there was one.
    pub fn remove(&mut self, via: NodeId, in_edge: EdgeId, out_edge: EdgeId) -> Option<Weight> {
        let removed = self.costs.remove(&(via, in_edge, out_edge));
        if removed.is_some() {
            if let Some(count) = self.entries_per_node.get_mut(&via) {
                *count -= 1;
                if *count == 0 {
                    self.entries_per_node.remove(&via);
                }
            }
        }
        removed
    }

    /// Does any turn cost entry use this node as via node?
    pub fn has_entries_at(&self, node: NodeId) -> bool {
        self.entries_per_node.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// All entries sorted by (via, in, out).
    pub fn entries(&self) -> Vec<TurnCostEntry> {
        let mut entries: Vec<TurnCostEntry> = self
            .costs
            .iter()
            .map(|(&(via, in_edge, out_edge), &cost)| TurnCostEntry { via, in_edge, out_edge, cost })
            .collect();
        entries.sort_by_key(|entry| (entry.via, entry.in_edge, entry.out_edge));
        entries
    }
}

impl Deconstruct for TurnCostStorage {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        let entries = self.entries();
        store("turn_via", &entries.iter().map(|e| e.via).collect::<Vec<_>>())?;
        store("turn_in_edge", &entries.iter().map(|e| e.in_edge).collect::<Vec<_>>())?;
        store("turn_out_edge", &entries.iter().map(|e| e.out_edge).collect::<Vec<_>>())?;
        store("turn_cost", &entries.iter().map(|e| e.cost).collect::<Vec<_>>())?;
        Ok(())
    }
}

impl Reconstruct for TurnCostStorage {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let via: Vec<NodeId> = loader.load("turn_via")?;
        let in_edge: Vec<EdgeId> = loader.load_vec("turn_in_edge", via.len())?;
        let out_edge: Vec<EdgeId> = loader.load_vec("turn_out_edge", via.len())?;
        let cost: Vec<Weight> = loader.load_vec("turn_cost", via.len())?;

        let mut storage = TurnCostStorage::new();
        for i in 0..via.len() {
            if !(cost[i] >= 0.0) {
                return Err(crate::RoutingError::InconsistentData(format!("invalid turn cost {}", cost[i])).into());
            }
            storage.set(via[i], in_edge[i], out_edge[i], cost[i]);
        }
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlisted_turns_are_free() {
        let mut storage = TurnCostStorage::new();
        storage.set(3, 1, 2, 5.0);
        assert_eq!(storage.get(3, 1, 2), 5.0);
        assert_eq!(storage.get(3, 2, 1), 0.0);
        assert_eq!(storage.get(4, 1, 2), 0.0);
    }

    #[test]
    fn node_entry_counts_follow_set_and_remove() {
        let mut storage = TurnCostStorage::new();
        storage.restrict(3, 1, 2);
        storage.set(3, 1, 2, 4.0);
        storage.set(3, 2, 1, 1.0);
        assert_eq!(storage.len(), 2);
        assert!(storage.has_entries_at(3));
        assert_eq!(storage.remove(3, 1, 2), Some(4.0));
        assert!(storage.has_entries_at(3));
        assert_eq!(storage.remove(3, 2, 1), Some(1.0));
        assert_eq!(storage.remove(3, 2, 1), None);
        assert!(!storage.has_entries_at(3));
        assert!(storage.is_empty());
    }

    #[test]
    fn round_trip_through_directory() {
        let mut storage = TurnCostStorage::new();
        storage.restrict(0, 0, 1);
        storage.set(2, 3, 4, 7.5);
        let dir = tempfile::tempdir().unwrap();
        storage.deconstruct_to(&dir.path()).unwrap();
        let loaded = TurnCostStorage::reconstruct_from(&dir.path()).unwrap();
        assert_eq!(loaded.entries(), storage.entries());
        assert!(loaded.has_entries_at(2));
    }
}
