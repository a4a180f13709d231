//! Shortcut detection: nearby places with similar encodings.
//!
//! Gates on raw position distance first, then scores the encoding
//! signatures: `max(0, 1 - ||sig_a - sig_b|| / alpha)`. Pairs beyond
//! the gate score zero outright, which keeps the oracle cheap over
//! large candidate sets.

use crate::error::OracleError;
use crate::waypoint::Waypoint;

use super::{OracleResult, ReachabilityOracle};

/// Judges reachability by signature similarity within a distance gate.
#[derive(Debug, Clone)]
pub struct ShortcutOracle {
    threshold_same: f64,
    threshold_reachable: f64,
    gate_distance: f64,
    alpha: f64,
}

impl ShortcutOracle {
    /// Create a shortcut oracle with explicit parameters.
    pub fn new(threshold_same: f64, threshold_reachable: f64, gate_distance: f64) -> Self {
        Self {
            threshold_same,
            threshold_reachable,
            gate_distance,
            alpha: 15.0,
        }
    }
}

impl Default for ShortcutOracle {
    fn default() -> Self {
        Self::new(0.4, 0.75, 2.0)
    }
}

impl ReachabilityOracle for ShortcutOracle {
    fn predict_reachability(&self, start: &Waypoint, goal: &Waypoint) -> OracleResult<f64> {
        if start.distance_to(goal) >= self.gate_distance {
            return Ok(0.0);
        }
        if start.signature.len() != goal.signature.len() {
            return Err(OracleError::SignatureMismatch {
                left: start.signature.len(),
                right: goal.signature.len(),
            });
        }
        let dist: f64 = start
            .signature
            .iter()
            .zip(&goal.signature)
            .map(|(a, b)| {
                let d = (a - b) as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt();
        Ok((1.0 - dist / self.alpha).max(0.0))
    }

    fn pass_threshold(&self, score: f64, threshold: f64) -> bool {
        score >= threshold
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

    fn wp(sequence: u64, x: f64, signature: Vec<f32>) -> Waypoint {
        Waypoint::new(sequence, [x, 0.0], vec![], signature)
    }

    #[test]
    fn identical_signatures_within_gate_score_one() {
        let oracle = ShortcutOracle::default();
        let a = wp(0, 0.0, vec![1.0, 2.0, 3.0]);
        let b = wp(1, 1.0, vec![1.0, 2.0, 3.0]);
        let score = oracle.predict_reachability(&a, &b).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
        assert!(oracle.is_same(&a, &b).unwrap());
    }

    #[test]
    fn beyond_gate_scores_zero() {
        let oracle = ShortcutOracle::default();
        let a = wp(0, 0.0, vec![1.0; 3]);
        let b = wp(1, 5.0, vec![1.0; 3]);
        assert_eq!(oracle.predict_reachability(&a, &b).unwrap(), 0.0);
        assert!(!oracle.get_reachability(&a, &b).unwrap().0);
    }

    #[test]
    fn dissimilar_signatures_score_lower() {
        let oracle = ShortcutOracle::default();
        let a = wp(0, 0.0, vec![0.0; 4]);
        let close = wp(1, 1.0, vec![0.5; 4]);
        let far = wp(2, 1.0, vec![5.0; 4]);
        let s_close = oracle.predict_reachability(&a, &close).unwrap();
        let s_far = oracle.predict_reachability(&a, &far).unwrap();
        assert!(s_close > s_far);
    }

    #[test]
    fn signature_length_mismatch_is_an_error() {
        let oracle = ShortcutOracle::default();
        let a = wp(0, 0.0, vec![1.0; 3]);
        let b = wp(1, 1.0, vec![1.0; 4]);
        assert!(matches!(
            oracle.predict_reachability(&a, &b),
            Err(OracleError::SignatureMismatch { left: 3, right: 4 })
        ));
    }
}
