//! Classifier-backed reachability: a trained pairwise scorer.
//!
//! The network itself (weights, inference runtime) lives outside this
//! crate; it is injected as a scorer closure over the two waypoints'
//! observation bundles and signatures. Scores are confidences in
//! `[0, 1]`, so *higher* is better.

use crate::waypoint::Waypoint;

use super::{OracleResult, ReachabilityOracle};

/// Pairwise scoring function supplied by the embedding application.
pub type PairScorer = dyn Fn(&Waypoint, &Waypoint) -> OracleResult<f64> + Send + Sync;

/// Judges reachability with an externally trained classifier.
pub struct ClassifierOracle {
    scorer: Box<PairScorer>,
    threshold_same: f64,
    threshold_reachable: f64,
}

impl ClassifierOracle {
    /// Wrap a scorer with the standard classifier thresholds.
    pub fn new(scorer: Box<PairScorer>) -> Self {
        Self::with_thresholds(scorer, 0.933, 0.4)
    }

    /// Wrap a scorer with explicit thresholds.
    pub fn with_thresholds(
        scorer: Box<PairScorer>,
        threshold_same: f64,
        threshold_reachable: f64,
    ) -> Self {
        Self {
            scorer,
            threshold_same,
            threshold_reachable,
        }
    }
}

impl std::fmt::Debug for ClassifierOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierOracle")
            .field("threshold_same", &self.threshold_same)
            .field("threshold_reachable", &self.threshold_reachable)
            .finish()
    }
}

impl ReachabilityOracle for ClassifierOracle {
    fn predict_reachability(&self, start: &Waypoint, goal: &Waypoint) -> OracleResult<f64> {
        (self.scorer)(start, goal)
    }

    /// Two places are reachable if the classifier confidence exceeds the
    /// threshold.
    fn pass_threshold(&self, score: f64, threshold: f64) -> bool {
        score > threshold
    }

    fn threshold_same(&self) -> f64 {
        self.threshold_same
    }

    fn threshold_reachable(&self) -> f64 {
        self.threshold_reachable
    }

    /// Confidence-to-belief mapping tuned against the reachable
    /// threshold `t`: `min(1, max((t - score * 0.3) / t, 0.1))`.
    fn connectivity_probability(&self, score: f64) -> f64 {
        let t = self.threshold_reachable;
        ((t - score * 0.3) / t).max(0.1).min(1.0)
    }
}
