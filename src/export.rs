//! Export types for serializing map state.
//!
//! Flattened, JSON-friendly representations of nodes and edges for
//! external tooling — plotting, inspection, offline analysis. The
//! export is a read-only view; it carries positions and belief
//! parameters but not observation payloads, which keeps dumps small.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::graph::topology::TopologyGraph;

/// Exported node with its position and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExport {
    /// Stable node handle.
    pub handle: u64,
    /// Creation order of the underlying waypoint.
    pub sequence: u64,
    /// Planar position.
    pub position: [f64; 2],
}

/// Exported directed edge with full belief state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeExport {
    /// Source node handle.
    pub from: u64,
    /// Target node handle.
    pub to: u64,
    /// Mean of the distance estimate.
    pub mu: f64,
    /// Uncertainty of the distance estimate.
    pub sigma: f64,
    /// Stored distance draw (path-search cost).
    pub weight: f64,
    /// Connectivity belief.
    pub connectivity_probability: f64,
}

/// Complete flattened map state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapExport {
    /// All live nodes, in admission order.
    pub nodes: Vec<NodeExport>,
    /// All directed edges.
    pub edges: Vec<EdgeExport>,
}

impl MapExport {
    /// Flatten a topology graph into export form.
    pub fn from_graph(graph: &TopologyGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|(handle, waypoint)| NodeExport {
                handle: handle.get(),
                sequence: waypoint.sequence,
                position: waypoint.position,
            })
            .collect();
        let edges = graph
            .edges()
            .map(|(from, to, belief)| EdgeExport {
                from: from.get(),
                to: to.get(),
                mu: belief.mu,
                sigma: belief.sigma,
                weight: belief.weight,
                connectivity_probability: belief.connectivity_probability,
            })
            .collect();
        Self { nodes, edges }
    }

    /// Serialize to a JSON string.
    pub fn to_json_string(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization {
            message: format!("failed to serialize map export: {e}"),
        })
    }
}
