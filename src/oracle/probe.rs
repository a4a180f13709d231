//! Probe-based reachability: actually try to get there.
//!
//! The most expensive and most faithful oracle. A [`NavigationProbe`]
//! collaborator (typically a physics simulation driving the real local
//! controller) attempts the traversal and reports whether the goal was
//! genuinely reached. Scores collapse to 1.0 / 0.0, and both thresholds
//! sit at 1.0: only a confirmed arrival counts.

use crate::waypoint::Waypoint;

use super::{OracleResult, ReachabilityOracle};

/// A collaborator that can attempt a traversal between two waypoints.
///
/// Implementations are expected to be expensive and fallible: a crashed
/// simulation surfaces as an `Err`, which callers treat as a skipped
/// pair rather than a poisoned map.
pub trait NavigationProbe: Send + Sync {
    /// Attempt to navigate from `start` to `goal`; report whether the
    /// goal was genuinely reached (not merely approached).
    fn attempt(&self, start: &Waypoint, goal: &Waypoint) -> OracleResult<bool>;
}

/// Judges reachability by running a navigation attempt.
#[derive(Debug)]
pub struct ProbeOracle<P> {
    probe: P,
}

impl<P: NavigationProbe> ProbeOracle<P> {
    /// Wrap a navigation probe.
    pub fn new(probe: P) -> Self {
        Self { probe }
    }
}

impl<P: NavigationProbe> ReachabilityOracle for ProbeOracle<P> {
    fn predict_reachability(&self, start: &Waypoint, goal: &Waypoint) -> OracleResult<f64> {
        Ok(if self.probe.attempt(start, goal)? {
            1.0
        } else {
            0.0
        })
    }

    fn pass_threshold(&self, score: f64, threshold: f64) -> bool {
        score >= threshold
    }

    fn threshold_same(&self) -> f64 {
        1.0
    }

    fn threshold_reachable(&self) -> f64 {
        1.0
    }
}
