//! View-overlap reachability: two places connect if they can see the
//! same part of the world.
//!
//! The overlap computation needs environment geometry (walls, occlusion)
//! that this crate does not model, so it is injected as a function
//! returning the overlap ratio in each direction; the score averages
//! the two.

use crate::waypoint::Waypoint;

use super::{OracleResult, ReachabilityOracle};

/// Field-of-view overlap function supplied by the embedding application.
///
/// Returns `(start_to_goal, goal_to_start)` overlap ratios in `[0, 1]`.
pub type OverlapFn = dyn Fn(&Waypoint, &Waypoint) -> OracleResult<(f64, f64)> + Send + Sync;

/// Judges reachability by mutual field-of-view overlap.
pub struct ViewOverlapOracle {
    overlap: Box<OverlapFn>,
    threshold_same: f64,
    threshold_reachable: f64,
}

impl ViewOverlapOracle {
    /// Wrap an overlap function with the standard thresholds.
    pub fn new(overlap: Box<OverlapFn>) -> Self {
        Self {
            overlap,
            threshold_same: 0.4,
            threshold_reachable: 0.3,
        }
    }
}

impl std::fmt::Debug for ViewOverlapOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewOverlapOracle")
            .field("threshold_same", &self.threshold_same)
            .field("threshold_reachable", &self.threshold_reachable)
            .finish()
    }
}

impl ReachabilityOracle for ViewOverlapOracle {
    fn predict_reachability(&self, start: &Waypoint, goal: &Waypoint) -> OracleResult<f64> {
        let (forward, backward) = (self.overlap)(start, goal)?;
        Ok((forward + backward) / 2.0)
    }

    fn pass_threshold(&self, score: f64, threshold: f64) -> bool {
        score > threshold
    }

    fn threshold_same(&self) -> f64 {
        self.threshold_same
    }

    fn threshold_reachable(&self) -> f64 {
        self.threshold_reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(sequence: u64, x: f64) -> Waypoint {
        Waypoint::new(sequence, [x, 0.0], vec![], vec![])
    }

    #[test]
    fn score_averages_both_directions() {
        let oracle = ViewOverlapOracle::new(Box::new(|_, _| Ok((0.8, 0.4))));
        let score = oracle.predict_reachability(&wp(0, 0.0), &wp(1, 1.0)).unwrap();
        assert!((score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn reachable_above_threshold() {
        let oracle = ViewOverlapOracle::new(Box::new(|_, _| Ok((0.35, 0.35))));
        assert!(oracle.get_reachability(&wp(0, 0.0), &wp(1, 1.0)).unwrap().0);

        let oracle = ViewOverlapOracle::new(Box::new(|_, _| Ok((0.1, 0.1))));
        assert!(!oracle.get_reachability(&wp(0, 0.0), &wp(1, 1.0)).unwrap().0);
    }
}
