//! In-memory topology graph backed by petgraph with a handle arena.
//!
//! Uses `StableDiGraph` so node and edge removal (orphan cleanup, edge
//! pruning, deduplication) never invalidates the indices of surviving
//! nodes, and a `BTreeMap` arena so iteration order is deterministic —
//! consolidation results are reproducible for a fixed seed.

use std::collections::BTreeMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;

use crate::waypoint::Waypoint;

use super::{EdgeBelief, NodeHandle};

#[derive(Debug)]
struct NodeRecord {
    waypoint: Waypoint,
    index: NodeIndex,
}

/// The directed, weighted graph of confirmed place nodes.
///
/// Single source of truth for map topology. Nodes are addressed by
/// [`NodeHandle`]; handles are never reused, so a stale handle fails
/// lookups instead of aliasing a different node.
pub struct TopologyGraph {
    graph: StableDiGraph<NodeHandle, EdgeBelief>,
    nodes: BTreeMap<NodeHandle, NodeRecord>,
    next_handle: u64,
}

impl TopologyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            nodes: BTreeMap::new(),
            next_handle: 1,
        }
    }

    /// Promote a waypoint to a node, returning its fresh handle.
    pub fn add_node(&mut self, waypoint: Waypoint) -> NodeHandle {
        let handle = NodeHandle::new(self.next_handle).expect("handle counter overflowed");
        self.next_handle += 1;
        let index = self.graph.add_node(handle);
        self.nodes.insert(handle, NodeRecord { waypoint, index });
        handle
    }

    /// Insert a node under an explicit handle (snapshot load / resume).
    ///
    /// Returns `false` if the handle is already occupied. Bumps the
    /// internal handle counter past `handle` so later admissions never
    /// collide with restored nodes.
    pub fn insert_node(&mut self, handle: NodeHandle, waypoint: Waypoint) -> bool {
        if self.nodes.contains_key(&handle) {
            return false;
        }
        let index = self.graph.add_node(handle);
        self.nodes.insert(handle, NodeRecord { waypoint, index });
        self.next_handle = self.next_handle.max(handle.get() + 1);
        true
    }

    /// Remove a node and every edge touching it, returning its payload.
    pub fn remove_node(&mut self, handle: NodeHandle) -> Option<Waypoint> {
        let record = self.nodes.remove(&handle)?;
        self.graph.remove_node(record.index);
        Some(record.waypoint)
    }

    /// Payload of a node.
    pub fn waypoint(&self, handle: NodeHandle) -> Option<&Waypoint> {
        self.nodes.get(&handle).map(|r| &r.waypoint)
    }

    /// Whether a handle refers to a live node.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(&handle)
    }

    /// Insert or replace the directed edge `from -> to`.
    ///
    /// Panics if either endpoint is missing — an edge referencing a
    /// dead node is a caller bug, not a runtime condition.
    pub fn add_edge(&mut self, from: NodeHandle, to: NodeHandle, belief: EdgeBelief) {
        let from_ix = self.index_of(from).expect("edge source must be a live node");
        let to_ix = self.index_of(to).expect("edge target must be a live node");
        self.graph.update_edge(from_ix, to_ix, belief);
    }

    /// Insert a reciprocal edge pair with identical belief state.
    pub fn add_edge_pair(&mut self, a: NodeHandle, b: NodeHandle, belief: EdgeBelief) {
        self.add_edge(a, b, belief.clone());
        self.add_edge(b, a, belief);
    }

    /// Remove the directed edge `from -> to`. Returns whether it existed.
    pub fn remove_edge(&mut self, from: NodeHandle, to: NodeHandle) -> bool {
        match self.edge_index(from, to) {
            Some(ix) => self.graph.remove_edge(ix).is_some(),
            None => false,
        }
    }

    /// Remove both directions between `a` and `b`. Returns whether any
    /// direction existed.
    pub fn remove_edge_pair(&mut self, a: NodeHandle, b: NodeHandle) -> bool {
        let ab = self.remove_edge(a, b);
        let ba = self.remove_edge(b, a);
        ab || ba
    }

    /// Belief state of the directed edge `from -> to`.
    pub fn edge(&self, from: NodeHandle, to: NodeHandle) -> Option<&EdgeBelief> {
        self.edge_index(from, to)
            .and_then(|ix| self.graph.edge_weight(ix))
    }

    /// Mutate the directed edge `from -> to` in place. Returns whether
    /// the edge existed.
    pub fn update_edge(
        &mut self,
        from: NodeHandle,
        to: NodeHandle,
        f: impl FnOnce(&mut EdgeBelief),
    ) -> bool {
        match self
            .edge_index(from, to)
            .and_then(|ix| self.graph.edge_weight_mut(ix))
        {
            Some(belief) => {
                f(belief);
                true
            }
            None => false,
        }
    }

    /// Whether the directed edge `from -> to` exists.
    pub fn has_edge(&self, from: NodeHandle, to: NodeHandle) -> bool {
        self.edge_index(from, to).is_some()
    }

    /// Combined in- and out-degree of a node. Missing nodes report 0.
    pub fn degree(&self, handle: NodeHandle) -> usize {
        match self.index_of(handle) {
            Some(ix) => {
                self.graph.neighbors_directed(ix, Direction::Outgoing).count()
                    + self.graph.neighbors_directed(ix, Direction::Incoming).count()
            }
            None => 0,
        }
    }

    /// Out-neighbors of a node, in unspecified order.
    pub fn out_neighbors(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        match self.index_of(handle) {
            Some(ix) => self
                .graph
                .neighbors_directed(ix, Direction::Outgoing)
                .filter_map(|n| self.graph.node_weight(n).copied())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Iterate live nodes in handle order (admission order).
    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &Waypoint)> {
        self.nodes.iter().map(|(h, r)| (*h, &r.waypoint))
    }

    /// Handles of all live nodes, in admission order.
    pub fn handles(&self) -> Vec<NodeHandle> {
        self.nodes.keys().copied().collect()
    }

    /// Iterate all directed edges as `(from, to, belief)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeHandle, NodeHandle, &EdgeBelief)> {
        self.graph.edge_references().filter_map(|e| {
            let from = *self.graph.node_weight(e.source())?;
            let to = *self.graph.node_weight(e.target())?;
            Some((from, to, e.weight()))
        })
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub(crate) fn index_of(&self, handle: NodeHandle) -> Option<NodeIndex> {
        self.nodes.get(&handle).map(|r| r.index)
    }

    pub(crate) fn petgraph(&self) -> &StableDiGraph<NodeHandle, EdgeBelief> {
        &self.graph
    }

    fn edge_index(&self, from: NodeHandle, to: NodeHandle) -> Option<petgraph::stable_graph::EdgeIndex> {
        let from_ix = self.index_of(from)?;
        let to_ix = self.index_of(to)?;
        self.graph.find_edge(from_ix, to_ix)
    }
}

impl Default for TopologyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TopologyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyGraph")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(sequence: u64) -> Waypoint {
        Waypoint::new(sequence, [sequence as f64, 0.0], vec![], vec![])
    }

    fn belief() -> EdgeBelief {
        EdgeBelief::new(0.5, 0.015, 0.5, 0.8)
    }

    #[test]
    fn add_and_lookup_nodes() {
        let mut g = TopologyGraph::new();
        let a = g.add_node(wp(0));
        let b = g.add_node(wp(1));

        assert_ne!(a, b);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.waypoint(a).unwrap().sequence, 0);
        assert!(g.contains(b));
    }

    #[test]
    fn remove_node_cascades_edges() {
        let mut g = TopologyGraph::new();
        let a = g.add_node(wp(0));
        let b = g.add_node(wp(1));
        let c = g.add_node(wp(2));
        g.add_edge_pair(a, b, belief());
        g.add_edge_pair(b, c, belief());
        assert_eq!(g.edge_count(), 4);

        let removed = g.remove_node(b).unwrap();
        assert_eq!(removed.sequence, 1);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.degree(a), 0);
        assert_eq!(g.degree(c), 0);
    }

    #[test]
    fn stale_handles_do_not_alias() {
        let mut g = TopologyGraph::new();
        let a = g.add_node(wp(0));
        g.remove_node(a);
        let b = g.add_node(wp(1));

        assert_ne!(a, b);
        assert!(!g.contains(a));
        assert!(g.waypoint(a).is_none());
    }

    #[test]
    fn edge_pair_is_reciprocal_and_replacing() {
        let mut g = TopologyGraph::new();
        let a = g.add_node(wp(0));
        let b = g.add_node(wp(1));

        g.add_edge_pair(a, b, belief());
        assert!(g.has_edge(a, b));
        assert!(g.has_edge(b, a));
        assert_eq!(g.edge_count(), 2);

        // Re-adding replaces in place instead of stacking parallel edges.
        g.add_edge_pair(a, b, EdgeBelief::new(0.6, 0.015, 0.6, 0.9));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.edge(a, b).unwrap().mu, 0.6);
    }

    #[test]
    fn update_edge_mutates_one_direction() {
        let mut g = TopologyGraph::new();
        let a = g.add_node(wp(0));
        let b = g.add_node(wp(1));
        g.add_edge_pair(a, b, belief());

        assert!(g.update_edge(a, b, |e| e.connectivity_probability = 0.4));
        assert_eq!(g.edge(a, b).unwrap().connectivity_probability, 0.4);
        assert_eq!(g.edge(b, a).unwrap().connectivity_probability, 0.8);

        assert!(!g.update_edge(b, NodeHandle::new(99).unwrap(), |_| {}));
    }

    #[test]
    fn insert_node_respects_existing_handles() {
        let mut g = TopologyGraph::new();
        let restored = NodeHandle::new(5).unwrap();
        assert!(g.insert_node(restored, wp(0)));
        assert!(!g.insert_node(restored, wp(1)));

        // Fresh admissions continue past the restored handle.
        let fresh = g.add_node(wp(2));
        assert!(fresh.get() > 5);
    }

    #[test]
    fn out_neighbors_and_degree() {
        let mut g = TopologyGraph::new();
        let a = g.add_node(wp(0));
        let b = g.add_node(wp(1));
        let c = g.add_node(wp(2));
        g.add_edge(a, b, belief());
        g.add_edge(c, a, belief());

        assert_eq!(g.out_neighbors(a), vec![b]);
        assert_eq!(g.degree(a), 2); // one out, one in
    }
}
