//! Distance-based reachability: two places connect if they are close.
//!
//! The cheapest oracle and the usual baseline. The score is the raw
//! Euclidean distance between positions, so *lower* is better and
//! `pass_threshold` inverts accordingly.

use crate::waypoint::Waypoint;

use super::{OracleResult, ReachabilityOracle};

/// Judges reachability by Euclidean distance between waypoint positions.
#[derive(Debug, Clone)]
pub struct DistanceOracle {
    threshold_same: f64,
    threshold_reachable: f64,
}

impl DistanceOracle {
    /// Create a distance oracle with explicit thresholds.
    pub fn new(threshold_same: f64, threshold_reachable: f64) -> Self {
        Self {
            threshold_same,
            threshold_reachable,
        }
    }
}

impl Default for DistanceOracle {
    fn default() -> Self {
        Self::new(0.4, 0.75)
    }
}

impl ReachabilityOracle for DistanceOracle {
    fn predict_reachability(&self, start: &Waypoint, goal: &Waypoint) -> OracleResult<f64> {
        Ok(start.distance_to(goal))
    }

    /// Two places are reachable if the distance is less than the threshold.
    fn pass_threshold(&self, score: f64, threshold: f64) -> bool {
        score < threshold
    }

    fn threshold_same(&self) -> f64 {
        self.threshold_same
    }

    fn threshold_reachable(&self) -> f64 {
        self.threshold_reachable
    }

    /// Distances are not probabilities; map "closer" to "more likely
    /// connected" linearly within the reachable radius.
    fn connectivity_probability(&self, score: f64) -> f64 {
        (1.0 - score / self.threshold_reachable).clamp(0.0, 1.0)
    }
}
