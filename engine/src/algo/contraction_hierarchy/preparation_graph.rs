//! The mutable graph nodes are contracted in.
//!
//! Every node keeps its remaining outgoing and incoming arcs. Contracting a node moves all its arcs
//! into the upward graphs, since all remaining neighbors will end up higher in the hierarchy.

use super::*;
use crate::weighting::Weighting;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PrepArc {
    pub key: EdgeKey,
    /// head of outgoing, tail of incoming arcs
    pub other: NodeId,
    pub weight: Weight,
    pub first_orig: EdgeKey,
    pub last_orig: EdgeKey,
    /// number of original edges this arc represents
    pub orig_edge_count: u32,
}

impl PrepArc {
    fn ch_arc(&self) -> ChArc {
        ChArc {
            key: self.key,
            adj: self.other,
            weight: self.weight,
            first_orig: self.first_orig,
            last_orig: self.last_orig,
        }
    }
}

/// A shortcut about to be created: the concatenation of two arcs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct ShortcutCandidate {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: Weight,
    pub skip1: EdgeKey,
    pub skip2: EdgeKey,
    pub first_orig: EdgeKey,
    pub last_orig: EdgeKey,
    pub orig_edge_count: u32,
}

#[derive(Debug)]
pub(super) struct PreparationGraph {
    edge_based: bool,
    num_edges: usize,
    out_arcs: Vec<Vec<PrepArc>>,
    in_arcs: Vec<Vec<PrepArc>>,
    // original keys arriving at each node, only collected for edge based contraction
    orig_in_keys: Vec<Vec<EdgeKey>>,
    num_arcs: usize,
    shortcuts: Vec<Shortcut>,
    up_out: Vec<Vec<ChArc>>,
    up_in: Vec<Vec<ChArc>>,
}

impl PreparationGraph {
    /// Every direction of an edge with finite weight becomes an arc.
    /// Node based contraction drops loops, they never lie on shortest paths.
    pub fn new<G: RoadGraph, W: Weighting + ?Sized>(graph: &G, weighting: &W, edge_based: bool) -> Self {
        let n = graph.num_nodes();
        let mut out_arcs = vec![Vec::new(); n];
        let mut in_arcs = vec![Vec::new(); n];
        let mut orig_in_keys = vec![Vec::new(); if edge_based { n } else { 0 }];
        let mut num_arcs = 0;

        for node in 0..n as NodeId {
            for state in graph.link_iter(node) {
                let weight = weighting.edge_weight(&state, false);
                if weight == INFINITY || (!edge_based && state.is_loop()) {
                    continue;
                }
                assert!(weight >= 0.0, "negative edge weight {} for edge {}", weight, state.edge);
                let key = state.key();
                let arc = PrepArc {
                    key,
                    other: state.adj,
                    weight,
                    first_orig: key,
                    last_orig: key,
                    orig_edge_count: 1,
                };
                out_arcs[state.base as usize].push(arc);
                in_arcs[state.adj as usize].push(PrepArc { other: state.base, ..arc });
                if edge_based {
                    orig_in_keys[state.adj as usize].push(key);
                }
                num_arcs += 1;
            }
        }

        PreparationGraph {
            edge_based,
            num_edges: graph.num_edges(),
            out_arcs,
            in_arcs,
            orig_in_keys,
            num_arcs,
            shortcuts: Vec::new(),
            up_out: vec![Vec::new(); n],
            up_in: vec![Vec::new(); n],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.out_arcs.len()
    }

    /// Number of remaining arcs.
    pub fn num_arcs(&self) -> usize {
        self.num_arcs
    }

    pub fn num_orig_keys(&self) -> usize {
        2 * self.num_edges
    }

    pub fn num_shortcuts(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn out_arcs(&self, node: NodeId) -> &[PrepArc] {
        &self.out_arcs[node as usize]
    }

    pub fn in_arcs(&self, node: NodeId) -> &[PrepArc] {
        &self.in_arcs[node as usize]
    }

    /// Original keys arriving at `node`, including those from already contracted nodes.
    pub fn orig_in_keys(&self, node: NodeId) -> &[EdgeKey] {
        &self.orig_in_keys[node as usize]
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.out_arcs[node as usize].len() + self.in_arcs[node as usize].len()
    }

    fn is_shortcut(&self, key: EdgeKey) -> bool {
        key as usize >= 2 * self.num_edges
    }

    fn next_key(&self) -> EdgeKey {
        (2 * (self.num_edges + self.shortcuts.len())) as EdgeKey
    }

    // node based shortcuts are identified by their end points, edge based ones also by their first and last original edge
    fn same_shortcut(&self, arc: &PrepArc, candidate: &ShortcutCandidate) -> bool {
        self.is_shortcut(arc.key)
            && arc.other == candidate.to
            && (!self.edge_based || (arc.first_orig == candidate.first_orig && arc.last_orig == candidate.last_orig))
    }

    /// Is there already a shortcut for the same connection at least as good as `candidate`?
    pub fn has_shortcut_as_good(&self, candidate: &ShortcutCandidate) -> bool {
        self.out_arcs[candidate.from as usize]
            .iter()
            .any(|arc| self.same_shortcut(arc, candidate) && arc.weight <= candidate.weight)
    }

    fn record(&mut self, candidate: &ShortcutCandidate) -> EdgeKey {
        let key = self.next_key();
        assert!(candidate.skip1 < key && candidate.skip2 < key, "shortcut skips unknown arcs");
        assert!(candidate.weight >= 0.0 && candidate.weight < INFINITY, "invalid shortcut weight {}", candidate.weight);
        self.shortcuts.push(Shortcut {
            from: candidate.from,
            to: candidate.to,
            weight: candidate.weight,
            skip1: candidate.skip1,
            skip2: candidate.skip2,
            first_orig: candidate.first_orig,
            last_orig: candidate.last_orig,
        });
        key
    }

    /// Adds the shortcut, or improves an existing one for the same connection.
    /// An improvement which skips arcs recorded after the existing shortcut gets a fresh key,
    /// so every shortcut only skips smaller keys.
    /// Returns the key of the inserted or updated shortcut, `None` if an existing one is at least as good.
    pub fn add_or_update_shortcut(&mut self, candidate: ShortcutCandidate) -> Option<EdgeKey> {
        let position = self.out_arcs[candidate.from as usize].iter().position(|arc| self.same_shortcut(arc, &candidate));
        if let Some(position) = position {
            let existing = self.out_arcs[candidate.from as usize][position];
            if existing.weight <= candidate.weight {
                return None;
            }
            let key = if candidate.skip1 < existing.key && candidate.skip2 < existing.key {
                let shortcut = &mut self.shortcuts[existing.key as usize / 2 - self.num_edges];
                assert_eq!((shortcut.from, shortcut.to), (candidate.from, candidate.to));
                shortcut.weight = candidate.weight;
                shortcut.skip1 = candidate.skip1;
                shortcut.skip2 = candidate.skip2;
                existing.key
            } else {
                // the old shortcut may still be skipped by others and stays recorded
                self.record(&candidate)
            };
            self.out_arcs[candidate.from as usize][position] = PrepArc {
                key,
                weight: candidate.weight,
                orig_edge_count: candidate.orig_edge_count,
                ..existing
            };
            let in_arc = self.in_arcs[candidate.to as usize]
                .iter_mut()
                .find(|arc| arc.key == existing.key)
                .expect("shortcut missing in the incoming arcs of its head");
            in_arc.key = key;
            in_arc.weight = candidate.weight;
            in_arc.orig_edge_count = candidate.orig_edge_count;
            return Some(key);
        }

        let key = self.record(&candidate);
        let arc = PrepArc {
            key,
            other: candidate.to,
            weight: candidate.weight,
            first_orig: candidate.first_orig,
            last_orig: candidate.last_orig,
            orig_edge_count: candidate.orig_edge_count,
        };
        self.out_arcs[candidate.from as usize].push(arc);
        self.in_arcs[candidate.to as usize].push(PrepArc { other: candidate.from, ..arc });
        self.num_arcs += 1;
        Some(key)
    }

    /// Records a shortcut which only exists as a part of other shortcuts and never gets an arc.
    pub fn add_nested_shortcut(&mut self, candidate: ShortcutCandidate) -> EdgeKey {
        self.record(&candidate)
    }

    /// Moves all remaining arcs of `node` into the upward graphs and removes them from its neighbors.
    /// Returns the distinct neighbors.
    pub fn disconnect(&mut self, node: NodeId) -> Vec<NodeId> {
        let out_arcs = std::mem::take(&mut self.out_arcs[node as usize]);
        let in_arcs = std::mem::take(&mut self.in_arcs[node as usize]);
        let mut neighbors = Vec::new();

        for arc in &out_arcs {
            self.up_out[node as usize].push(arc.ch_arc());
            self.num_arcs -= 1;
            if arc.other != node {
                self.in_arcs[arc.other as usize].retain(|other| other.key != arc.key);
                neighbors.push(arc.other);
            }
        }
        for arc in &in_arcs {
            self.up_in[node as usize].push(arc.ch_arc());
            if arc.other != node {
                self.out_arcs[arc.other as usize].retain(|other| other.key != arc.key);
                self.num_arcs -= 1;
                neighbors.push(arc.other);
            }
        }

        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    pub fn into_hierarchy(self, order: NodeOrder) -> ContractionHierarchy {
        debug_assert!(self.out_arcs.iter().chain(self.in_arcs.iter()).all(Vec::is_empty), "uncontracted nodes left");
        ContractionHierarchy::new(self.edge_based, self.num_edges, order, self.up_out, self.up_in, self.shortcuts)
    }
}
