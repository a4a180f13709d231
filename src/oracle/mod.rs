//! Reachability oracles: pluggable strategies for scoring whether one
//! place connects to another.
//!
//! Every oracle answers the same four questions — a raw reachability
//! score, whether a score passes a threshold, whether two waypoints are
//! the same place, and how a score maps to a connectivity belief — so
//! the graph builder and edge updater are written once against
//! [`ReachabilityOracle`] and never against a concrete variant.
//!
//! - [`distance::DistanceOracle`] — Euclidean distance between positions
//! - [`classifier::ClassifierOracle`] — externally trained pairwise scorer
//! - [`probe::ProbeOracle`] — live navigation attempt via [`probe::NavigationProbe`]
//! - [`overlap::ViewOverlapOracle`] — field-of-view overlap
//! - [`shortcut::ShortcutOracle`] — position-gated signature similarity

pub mod classifier;
pub mod distance;
pub mod overlap;
pub mod probe;
pub mod shortcut;

use crate::error::OracleError;
use crate::waypoint::Waypoint;

/// Result type for oracle operations.
pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// Capability interface for reachability estimation.
///
/// `pass_threshold` encodes the variant's score polarity: a distance
/// oracle passes when the score is *below* the threshold, a classifier
/// when it is *above*. Callers never compare scores directly.
pub trait ReachabilityOracle {
    /// Raw reachability score between two locations.
    ///
    /// Fallible: a backing classifier or simulation may crash. Callers
    /// treat a probe failure as local — skip the pair, keep going.
    fn predict_reachability(&self, start: &Waypoint, goal: &Waypoint) -> OracleResult<f64>;

    /// Whether a score passes a threshold under this variant's polarity.
    fn pass_threshold(&self, score: f64, threshold: f64) -> bool;

    /// Threshold at which two waypoints count as the same place.
    fn threshold_same(&self) -> f64;

    /// Threshold at which two waypoints count as reachable.
    fn threshold_reachable(&self) -> f64;

    /// Score a pair and apply the reachable threshold.
    fn get_reachability(&self, start: &Waypoint, goal: &Waypoint) -> OracleResult<(bool, f64)> {
        let score = self.predict_reachability(start, goal)?;
        Ok((self.pass_threshold(score, self.threshold_reachable()), score))
    }

    /// Whether two waypoints are close enough to be considered one place.
    fn is_same(&self, p: &Waypoint, q: &Waypoint) -> OracleResult<bool> {
        let score = self.predict_reachability(p, q)?;
        Ok(self.pass_threshold(score, self.threshold_same()))
    }

    /// Map a raw score to an initial connectivity belief in `[0, 1]`.
    ///
    /// The default treats the score itself as the belief, clamped into
    /// range; variants with non-probabilistic scores override this.
    fn connectivity_probability(&self, score: f64) -> f64 {
        score.clamp(0.0, 1.0)
    }
}
