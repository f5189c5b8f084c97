//! Expanding shortcuts back into original edges.

use super::*;

/// Appends the original keys `key` stands for, in travel order.
pub fn unpack_key<C: ChGraph + ?Sized>(ch: &C, key: EdgeKey, keys: &mut Vec<EdgeKey>) {
    let mut stack = vec![key];
    while let Some(key) = stack.pop() {
        match ch.expand(key) {
            ChEdge::Original(key) => keys.push(key),
            ChEdge::Shortcut(skip1, skip2) => {
                stack.push(skip2);
                stack.push(skip1);
            }
        }
    }
}

/// Edge states of the original edges behind a sequence of arcs.
pub fn unpack_arcs<G: RoadGraph, C: ChGraph + ?Sized>(graph: &G, ch: &C, arcs: &[EdgeKey]) -> Vec<EdgeState> {
    let mut keys = Vec::with_capacity(arcs.len());
    for &arc in arcs {
        unpack_key(ch, arc, &mut keys);
    }
    keys.into_iter().map(|key| graph.edge_state_by_key(key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastr::graph::base_graph::*;
    use crate::weighting::ShortestWeighting;

    #[test]
    fn nested_shortcuts_unpack_in_order() {
        let mut builder = GraphBuilder::new();
        for i in 0..5 {
            builder.add_node(50.0, 8.0 + i as f64 * 0.001);
        }
        for i in 1..5 {
            builder.add_edge(i - 1, i, i as f64, EdgeFlags::one_way(50.0));
        }
        let graph = builder.freeze();
        // contract the middle nodes first, so 0 -> 4 becomes one shortcut over shortcuts
        let order = NodeOrder::from_node_order(vec![2, 1, 3, 0, 4]).unwrap();
        let ch = prepare::prepare_ch(&graph, &ShortestWeighting::new(), ChConfig::node_based().with_fixed_order(order)).unwrap();
        let top = ch.upward_out(0).iter().find(|arc| arc.adj == 4).copied().unwrap();
        assert!(ch.is_shortcut(top.key));
        assert_eq!(top.weight, 10.0);
        let edges = unpack_arcs(&graph, &ch, &[top.key]);
        assert_eq!(edges.iter().map(|state| state.edge).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert!(edges.windows(2).all(|pair| pair[0].adj == pair[1].base));
    }
}
