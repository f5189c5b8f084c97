//! Strongly connected components of the accessible road network (Tarjan's algorithm).

use super::*;
use crate::weighting::Weighting;

const UNVISITED: u32 = u32::MAX;

/// Returns the strongly connected components of the graph induced by the edge directions
/// with finite weight. Nodes within a component are sorted by id.
/// Turn costs are ignored.
pub fn strongly_connected_components<G: RoadGraph, W: Weighting + ?Sized>(graph: &G, weighting: &W) -> Vec<Vec<NodeId>> {
    let n = graph.num_nodes();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![UNVISITED; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<NodeId> = Vec::new();
    let mut components = Vec::new();
    let mut next_index = 0;
    // explicit recursion stack, road networks are far too deep for the call stack
    let mut call_stack: Vec<(NodeId, G::Iter<'_>)> = Vec::new();

    for root in 0..n as NodeId {
        if index[root as usize] != UNVISITED {
            continue;
        }
        index[root as usize] = next_index;
        lowlink[root as usize] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root as usize] = true;
        call_stack.push((root, graph.link_iter(root)));

        while let Some((node, successors)) = call_stack.last_mut() {
            let node = *node;
            let next = successors.find(|state| weighting.edge_weight(state, false) < INFINITY).map(|state| state.adj);

            match next {
                Some(next) if index[next as usize] == UNVISITED => {
                    index[next as usize] = next_index;
                    lowlink[next as usize] = next_index;
                    next_index += 1;
                    stack.push(next);
                    on_stack[next as usize] = true;
                    call_stack.push((next, graph.link_iter(next)));
                }
                Some(next) => {
                    if on_stack[next as usize] {
                        lowlink[node as usize] = lowlink[node as usize].min(index[next as usize]);
                    }
                }
                None => {
                    call_stack.pop();
                    if let Some((parent, _)) = call_stack.last() {
                        lowlink[*parent as usize] = lowlink[*parent as usize].min(lowlink[node as usize]);
                    }
                    if lowlink[node as usize] == index[node as usize] {
                        let mut component = Vec::new();
                        while let Some(member) = stack.pop() {
                            on_stack[member as usize] = false;
                            component.push(member);
                            if member == node {
                                break;
                            }
                        }
                        component.sort_unstable();
                        components.push(component);
                    }
                }
            }
        }
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighting::ShortestWeighting;

    #[test]
    fn one_way_edges_split_components() {
        let mut builder = GraphBuilder::new();
        for _ in 0..6 {
            builder.add_node(0.0, 0.0);
        }
        // 0 <-> 1 <-> 2 is strongly connected, 3 -> 4 -> 5 -> 3 is a directed cycle, 2 -> 3 a one way link
        builder.add_edge(0, 1, 1.0, EdgeFlags::both_directions(10.0));
        builder.add_edge(1, 2, 1.0, EdgeFlags::both_directions(10.0));
        builder.add_edge(2, 3, 1.0, EdgeFlags::one_way(10.0));
        builder.add_edge(3, 4, 1.0, EdgeFlags::one_way(10.0));
        builder.add_edge(4, 5, 1.0, EdgeFlags::one_way(10.0));
        builder.add_edge(5, 3, 1.0, EdgeFlags::one_way(10.0));
        let graph = builder.freeze();

        let mut components = strongly_connected_components(&graph, &ShortestWeighting::new());
        components.sort();
        assert_eq!(components, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn isolated_nodes_are_singletons() {
        let mut builder = GraphBuilder::new();
        builder.add_node(0.0, 0.0);
        builder.add_node(0.0, 0.0);
        builder.add_edge(0, 1, 1.0, EdgeFlags::one_way(10.0));
        let graph = builder.freeze();
        let mut components = strongly_connected_components(&graph, &ShortestWeighting::new());
        components.sort();
        assert_eq!(components, vec![vec![0], vec![1]]);
    }
}
