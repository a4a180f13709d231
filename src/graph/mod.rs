//! The topology graph: confirmed place nodes and probabilistic edges.
//!
//! - [`topology::TopologyGraph`] — arena of nodes with stable handles
//!   over a petgraph stable directed graph
//! - [`path`] — weighted shortest-path queries
//!
//! Nodes are identified by [`NodeHandle`], stable for the node's
//! lifetime and reused nowhere else. Edges carry an [`EdgeBelief`]: a
//! Gaussian distance estimate plus a connectivity probability, the two
//! quantities the lifelong updater revises independently.

pub mod path;
pub mod topology;

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Unique, niche-optimized identifier for a confirmed graph node.
///
/// Uses `NonZeroU64` so that `Option<NodeHandle>` is the same size as
/// `NodeHandle` (the niche optimization lets the compiler use 0 as the
/// `None` discriminant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeHandle(NonZeroU64);

impl NodeHandle {
    /// Create a `NodeHandle` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(NodeHandle)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// Belief state carried by one directed edge.
///
/// The distance estimate is a Gaussian `(mu, sigma)`; `weight` is the
/// stored draw used by path search, resampled on every distance update
/// rather than pinned to the mean. `connectivity_probability` is the
/// belief that the edge is a genuinely traversable connection — the map
/// tolerates a temporarily wrong distance but removes unreliable
/// connectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeBelief {
    /// Mean of the distance estimate.
    pub mu: f64,
    /// Uncertainty of the distance estimate. Always positive.
    pub sigma: f64,
    /// Stored distance draw, used as the path-search cost. Non-negative.
    pub weight: f64,
    /// Belief that this edge is truly traversable, in `[0, 1]`.
    pub connectivity_probability: f64,
}

impl EdgeBelief {
    /// Create an edge belief, asserting the structural invariants.
    ///
    /// Panics on `sigma <= 0` or a probability outside `[0, 1]` — these
    /// indicate a bug in the caller, not a runtime condition.
    pub fn new(mu: f64, sigma: f64, weight: f64, connectivity_probability: f64) -> Self {
        assert!(sigma > 0.0, "edge sigma must be positive, got {sigma}");
        assert!(
            (0.0..=1.0).contains(&connectivity_probability),
            "connectivity probability must be in [0, 1], got {connectivity_probability}"
        );
        Self {
            mu,
            sigma,
            weight: weight.max(0.0),
            connectivity_probability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_rejects_zero() {
        assert!(NodeHandle::new(0).is_none());
        assert_eq!(NodeHandle::new(7).unwrap().get(), 7);
    }

    #[test]
    fn option_handle_is_niche_optimized() {
        assert_eq!(
            std::mem::size_of::<Option<NodeHandle>>(),
            std::mem::size_of::<NodeHandle>()
        );
    }

    #[test]
    fn belief_clamps_weight_to_non_negative() {
        let belief = EdgeBelief::new(0.5, 0.015, -0.02, 0.8);
        assert_eq!(belief.weight, 0.0);
    }

    #[test]
    #[should_panic(expected = "sigma must be positive")]
    fn belief_rejects_non_positive_sigma() {
        EdgeBelief::new(0.5, 0.0, 0.5, 0.8);
    }

    #[test]
    #[should_panic(expected = "connectivity probability")]
    fn belief_rejects_out_of_range_probability() {
        EdgeBelief::new(0.5, 0.015, 0.5, 1.2);
    }
}
