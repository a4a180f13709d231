//! Weighted shortest-path queries over the topology graph.
//!
//! A thin wrapper around petgraph's search: Dijkstra expressed as
//! A* with a zero heuristic, using each edge's stored distance draw as
//! its cost. "No path" is an expected, frequent outcome on a sparse
//! asymmetric map and is reported as `None`, never as an error.

use petgraph::algo::astar;

use super::topology::TopologyGraph;
use super::NodeHandle;

/// Find the cheapest path from `source` to `target`.
///
/// Returns the node sequence including both endpoints, or `None` when
/// no path exists or either handle is stale. `find_path(x, x)` returns
/// `Some([x])` for a live node.
pub fn find_path(
    graph: &TopologyGraph,
    source: NodeHandle,
    target: NodeHandle,
) -> Option<Vec<NodeHandle>> {
    let start = graph.index_of(source)?;
    let goal = graph.index_of(target)?;

    let (_cost, path) = astar(
        graph.petgraph(),
        start,
        |n| n == goal,
        |e| e.weight().weight,
        |_| 0.0,
    )?;

    Some(
        path.into_iter()
            .filter_map(|ix| graph.petgraph().node_weight(ix).copied())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeBelief;
    use crate::waypoint::Waypoint;

    fn wp(sequence: u64) -> Waypoint {
        Waypoint::new(sequence, [sequence as f64, 0.0], vec![], vec![])
    }

    fn belief(weight: f64) -> EdgeBelief {
        EdgeBelief::new(weight, 0.015, weight, 0.8)
    }

    fn chain() -> (TopologyGraph, NodeHandle, NodeHandle, NodeHandle) {
        let mut g = TopologyGraph::new();
        let a = g.add_node(wp(0));
        let b = g.add_node(wp(1));
        let c = g.add_node(wp(2));
        g.add_edge(a, b, belief(1.0));
        g.add_edge(b, c, belief(1.0));
        (g, a, b, c)
    }

    #[test]
    fn path_exists_through_chain() {
        let (g, a, b, c) = chain();
        assert_eq!(find_path(&g, a, c).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn removing_an_edge_breaks_the_path() {
        let (mut g, a, b, c) = chain();
        assert_eq!(find_path(&g, a, c).unwrap(), vec![a, b, c]);
        g.remove_edge(b, c);
        assert!(find_path(&g, a, c).is_none());
    }

    #[test]
    fn direction_matters() {
        let (g, a, _b, c) = chain();
        // Edges run a -> b -> c only; the reverse trip has no route.
        assert!(find_path(&g, c, a).is_none());
    }

    #[test]
    fn cheaper_detour_wins() {
        let mut g = TopologyGraph::new();
        let a = g.add_node(wp(0));
        let b = g.add_node(wp(1));
        let c = g.add_node(wp(2));
        g.add_edge(a, c, belief(5.0));
        g.add_edge(a, b, belief(1.0));
        g.add_edge(b, c, belief(1.0));

        assert_eq!(find_path(&g, a, c).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn trivial_and_stale_queries() {
        let (g, a, _, _) = chain();
        assert_eq!(find_path(&g, a, a).unwrap(), vec![a]);

        let stale = NodeHandle::new(99).unwrap();
        assert!(find_path(&g, a, stale).is_none());
    }
}
