//! Batch consolidation: turning collected waypoints into graph structure.
//!
//! Consolidation drains the pending store and admits waypoints one at a
//! time, fully connecting each admission into the existing graph before
//! moving on. The outer loop pops in collection order; the inner loop is
//! a fixed-point iteration over the remaining batch, re-ordered each
//! pass so spatially central candidates are tried first. "Same place"
//! always takes priority over "reachable": a candidate folded into an
//! existing node never becomes a node of its own.
//!
//! Reachability probes within one pass are mutually independent and fan
//! out on the rayon pool; all graph mutation stays on the caller's
//! thread. Progress is checkpointed after every admission so an
//! interrupted run loses at most one node's worth of work.

use std::cmp::Ordering;
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use crate::error::StoreError;
use crate::graph::topology::TopologyGraph;
use crate::graph::{EdgeBelief, NodeHandle};
use crate::oracle::ReachabilityOracle;
use crate::store::WaypointStore;
use crate::waypoint::Waypoint;

/// Receiver for per-admission consolidation checkpoints.
///
/// A checkpoint failure never aborts consolidation; the builder logs it,
/// counts it in the report, and continues in memory.
pub trait CheckpointSink {
    /// Persist the current graph plus the not-yet-consolidated remainder
    /// of the batch.
    fn checkpoint(
        &mut self,
        graph: &TopologyGraph,
        pending: &[Waypoint],
    ) -> Result<(), StoreError>;
}

/// Checkpoint sink that drops every checkpoint (memory-only operation).
#[derive(Debug, Default)]
pub struct NullCheckpoint;

impl CheckpointSink for NullCheckpoint {
    fn checkpoint(&mut self, _: &TopologyGraph, _: &[Waypoint]) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Tuning knobs for consolidation.
#[derive(Debug, Clone)]
pub struct ConsolidationConfig {
    /// Fixed prior stddev for freshly created edge distance estimates.
    pub sigma: f64,
    /// Emit per-admission progress events (node count, percentage).
    pub log_progress: bool,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            sigma: 0.015,
            log_progress: false,
        }
    }
}

/// Accounting for one consolidation run.
///
/// Every drained waypoint ends in exactly one bucket: admitted-and-kept,
/// merged into an existing node, or demoted back to pending. Nothing is
/// silently dropped.
#[derive(Debug, Clone, Default)]
pub struct ConsolidationReport {
    /// Waypoints promoted to nodes (including any later demoted).
    pub admitted: usize,
    /// Waypoints folded into an existing node without a new node.
    pub merged: usize,
    /// Reciprocal edge pairs created.
    pub edge_pairs_created: usize,
    /// Sequences of waypoints demoted back to pending because they ended
    /// the run with no edges. The terminal "unconnected waypoints" record.
    pub demoted: Vec<u64>,
    /// Oracle probes that failed and were skipped.
    pub probe_failures: usize,
    /// Checkpoints that failed to persist (run continued in memory).
    pub checkpoint_failures: usize,
}

enum Placement {
    Merged,
    Connected,
    Deferred(Waypoint),
}

/// Consolidation policy: drains the pending store into the graph.
pub struct GraphBuilder {
    config: ConsolidationConfig,
    rng: StdRng,
}

impl GraphBuilder {
    /// Create a builder with entropy-seeded edge-weight sampling.
    pub fn new(config: ConsolidationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a builder with a fixed seed for reproducible runs.
    pub fn with_seed(config: ConsolidationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ConsolidationConfig, rng: StdRng) -> Self {
        assert!(config.sigma > 0.0, "consolidation sigma must be positive");
        Self { config, rng }
    }

    /// Drain the pending store and fold every waypoint into the graph.
    ///
    /// Waypoints that end the run with zero edges are demoted back into
    /// `pending` for retry against a larger graph, and reported.
    pub fn consolidate<O>(
        &mut self,
        oracle: &O,
        graph: &mut TopologyGraph,
        pending: &mut WaypointStore,
        sink: &mut dyn CheckpointSink,
    ) -> ConsolidationReport
    where
        O: ReachabilityOracle + Sync + ?Sized,
    {
        let mut batch: VecDeque<Waypoint> = pending.drain_all().into();
        let total = batch.len();
        let mut report = ConsolidationReport::default();

        while let Some(waypoint) = batch.pop_front() {
            let sequence = waypoint.sequence;
            let handle = graph.add_node(waypoint);
            report.admitted += 1;

            // Fixed point: keep sweeping the remainder until a full pass
            // admits nothing and creates no edges.
            loop {
                let mut changed = false;
                let mut candidates: Vec<Waypoint> = batch.drain(..).collect();
                order_by_centroid(&mut candidates);

                let mut remaining = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    match self.place_candidate(oracle, graph, candidate, &mut report) {
                        Placement::Merged => report.merged += 1,
                        Placement::Connected => {
                            report.admitted += 1;
                            changed = true;
                        }
                        Placement::Deferred(candidate) => remaining.push(candidate),
                    }
                }
                batch = remaining.into();

                if !changed {
                    break;
                }
            }

            if self.config.log_progress {
                let consumed = total - batch.len();
                tracing::info!(
                    waypoint = sequence,
                    node = %handle,
                    nodes = graph.node_count(),
                    progress_pct = consumed * 100 / total.max(1),
                    "consolidated waypoint"
                );
            }

            if let Err(e) = sink.checkpoint(graph, batch.make_contiguous()) {
                tracing::warn!(error = %e, "checkpoint failed, continuing in memory");
                report.checkpoint_failures += 1;
            }
        }

        // Orphan cleanup: isolated nodes go back to pending for retry,
        // never silently away.
        for handle in graph.handles() {
            if graph.degree(handle) == 0 {
                if let Some(waypoint) = graph.remove_node(handle) {
                    tracing::debug!(waypoint = waypoint.sequence, %handle, "demoting isolated node");
                    report.demoted.push(waypoint.sequence);
                    pending.append(waypoint);
                }
            }
        }

        report
    }

    /// Try to place one candidate against the current graph.
    ///
    /// Merge wins over connect; a candidate with at least one reachable
    /// partner is promoted and wired to every reachable partner in the
    /// same step; otherwise it is deferred to a later pass.
    fn place_candidate<O>(
        &mut self,
        oracle: &O,
        graph: &mut TopologyGraph,
        candidate: Waypoint,
        report: &mut ConsolidationReport,
    ) -> Placement
    where
        O: ReachabilityOracle + Sync + ?Sized,
    {
        for (handle, existing) in graph.nodes() {
            match oracle.is_same(&candidate, existing) {
                Ok(true) => {
                    tracing::debug!(
                        waypoint = candidate.sequence,
                        into = %handle,
                        "merging waypoint into existing node"
                    );
                    return Placement::Merged;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "is_same probe failed, skipping pair");
                    report.probe_failures += 1;
                }
            }
        }

        // Probes against distinct existing nodes are independent; fan
        // them out. Insertion below stays serialized.
        let mut partners: Vec<(NodeHandle, f64)> = Vec::new();
        {
            let nodes: Vec<(NodeHandle, &Waypoint)> = graph.nodes().collect();
            let probes: Vec<_> = nodes
                .par_iter()
                .map(|(handle, existing)| (*handle, oracle.get_reachability(&candidate, existing)))
                .collect();
            for (handle, probed) in probes {
                match probed {
                    Ok((true, score)) => partners.push((handle, score)),
                    Ok((false, _)) => {}
                    Err(e) => {
                        tracing::debug!(error = %e, "reachability probe failed, skipping pair");
                        report.probe_failures += 1;
                    }
                }
            }
        }

        if partners.is_empty() {
            return Placement::Deferred(candidate);
        }

        let handle = graph.add_node(candidate);
        for (partner, score) in partners {
            let belief = self.initial_belief(oracle, score);
            graph.add_edge_pair(handle, partner, belief);
            report.edge_pairs_created += 1;
        }
        Placement::Connected
    }

    /// Initial belief for a fresh edge pair: distance draw around the raw
    /// score, connectivity from the oracle's score mapping. Both
    /// directions share one draw (creation-time symmetrization).
    fn initial_belief<O>(&mut self, oracle: &O, score: f64) -> EdgeBelief
    where
        O: ReachabilityOracle + ?Sized,
    {
        let draw = Normal::new(score, self.config.sigma)
            .expect("sigma is validated positive")
            .sample(&mut self.rng);
        EdgeBelief::new(score, self.config.sigma, draw, oracle.connectivity_probability(score))
    }
}

/// Order candidates by ascending distance from the centroid of all
/// remaining candidates' positions. Central, representative candidates
/// consolidate first, which shortens pathological chains. Ties keep
/// batch order (stable sort).
fn order_by_centroid(candidates: &mut [Waypoint]) {
    if candidates.len() < 2 {
        return;
    }
    let n = candidates.len() as f64;
    let cx = candidates.iter().map(|w| w.position[0]).sum::<f64>() / n;
    let cy = candidates.iter().map(|w| w.position[1]).sum::<f64>() / n;
    candidates.sort_by(|a, b| {
        let da = (a.position[0] - cx).powi(2) + (a.position[1] - cy).powi(2);
        let db = (b.position[0] - cx).powi(2) + (b.position[1] - cy).powi(2);
        da.partial_cmp(&db).unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::graph::path::find_path;
    use crate::oracle::distance::DistanceOracle;
    use crate::oracle::OracleResult;

    fn wp(sequence: u64, x: f64, y: f64) -> Waypoint {
        Waypoint::new(sequence, [x, y], vec![], vec![])
    }

    fn builder() -> GraphBuilder {
        GraphBuilder::with_seed(ConsolidationConfig::default(), 42)
    }

    fn consolidate_batch(
        oracle: &(impl ReachabilityOracle + Sync),
        waypoints: Vec<Waypoint>,
    ) -> (TopologyGraph, WaypointStore, ConsolidationReport) {
        let mut graph = TopologyGraph::new();
        let mut pending = WaypointStore::new();
        for w in waypoints {
            pending.append(w);
        }
        let report = builder().consolidate(oracle, &mut graph, &mut pending, &mut NullCheckpoint);
        (graph, pending, report)
    }

    #[test]
    fn nearby_waypoints_connect() {
        let oracle = DistanceOracle::default();
        let (graph, pending, report) =
            consolidate_batch(&oracle, vec![wp(0, 0.0, 0.0), wp(1, 0.6, 0.0)]);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(report.admitted, 2);
        assert_eq!(report.edge_pairs_created, 1);
        assert!(report.demoted.is_empty());
        assert!(pending.is_empty());

        let handles = graph.handles();
        let belief = graph.edge(handles[0], handles[1]).unwrap();
        assert!((belief.mu - 0.6).abs() < 1e-12);
        assert!((belief.sigma - 0.015).abs() < 1e-12);
        // Reciprocal twin carries identical parameters from birth.
        assert_eq!(graph.edge(handles[1], handles[0]).unwrap(), belief);
    }

    #[test]
    fn same_place_folds_instead_of_growing() {
        let oracle = DistanceOracle::default();
        // Second waypoint is within the "same" radius (0.4) of the first.
        let (graph, pending, report) =
            consolidate_batch(&oracle, vec![wp(0, 0.0, 0.0), wp(1, 0.2, 0.0)]);

        assert_eq!(report.merged, 1);
        assert_eq!(report.admitted, 1);
        // The merged waypoint never became a node; the lone survivor is
        // isolated and therefore demoted back to pending — never lost.
        assert_eq!(graph.node_count(), 0);
        assert_eq!(report.demoted.len(), 1);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn fixed_point_reaches_chained_candidates() {
        let oracle = DistanceOracle::default();
        // C is unreachable from A directly but reachable through B, and
        // B arrives last in collection order — the inner loop must run
        // more than one pass.
        let (graph, pending, report) = consolidate_batch(
            &oracle,
            vec![wp(0, 0.0, 0.0), wp(1, 1.2, 0.0), wp(2, 0.6, 0.0)],
        );

        assert!(pending.is_empty());
        assert_eq!(graph.node_count(), 3);
        assert_eq!(report.edge_pairs_created, 2);

        // Admission order: A first, then B (the bridge), then C.
        let handles = graph.handles();
        let (a, c) = (handles[0], handles[2]);
        let path = find_path(&graph, a, c).unwrap();
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn isolated_waypoints_are_demoted_not_lost() {
        let oracle = DistanceOracle::default();
        let (graph, pending, report) =
            consolidate_batch(&oracle, vec![wp(0, 0.0, 0.0), wp(1, 50.0, 50.0)]);

        // Both were admitted (FIFO pops unconditionally) but neither
        // found a partner, so both were demoted back to pending.
        assert_eq!(report.admitted, 2);
        assert_eq!(report.demoted.len(), 2);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn every_waypoint_is_accounted_for() {
        let oracle = DistanceOracle::default();
        let batch = vec![
            wp(0, 0.0, 0.0),
            wp(1, 0.1, 0.0),  // same as 0
            wp(2, 0.5, 0.0),  // reachable from 0
            wp(3, 20.0, 0.0), // isolated
            wp(4, 0.9, 0.0),  // reachable from 2
        ];
        let total = batch.len();
        let (graph, pending, report) = consolidate_batch(&oracle, batch);

        let connected = graph.node_count();
        assert_eq!(report.merged + connected + report.demoted.len(), total);
        assert_eq!(pending.len(), report.demoted.len());
    }

    #[test]
    fn demoted_waypoints_retry_on_next_run() {
        let oracle = DistanceOracle::default();
        let (mut graph, mut pending, report) =
            consolidate_batch(&oracle, vec![wp(0, 0.0, 0.0), wp(1, 5.0, 0.0)]);
        assert_eq!(report.demoted.len(), 2);

        // A bridging waypoint arrives; the retried pair now connects.
        pending.append(wp(2, 2.5, 0.0));
        let report = builder().consolidate(
            &oracle,
            &mut graph,
            &mut pending,
            &mut NullCheckpoint,
        );
        // 0 and 5 are still too far from 2.5 (> 0.75); everything is
        // demoted again — but the retry happened and nothing vanished.
        assert_eq!(report.admitted, 3);
        assert_eq!(pending.len() + graph.node_count(), 3);
    }

    struct FlakyOracle {
        inner: DistanceOracle,
        poison: u64,
    }

    impl ReachabilityOracle for FlakyOracle {
        fn predict_reachability(&self, start: &Waypoint, goal: &Waypoint) -> OracleResult<f64> {
            if start.sequence == self.poison || goal.sequence == self.poison {
                return Err(OracleError::ProbeFailed {
                    message: "simulation crashed".into(),
                });
            }
            self.inner.predict_reachability(start, goal)
        }
        fn pass_threshold(&self, score: f64, threshold: f64) -> bool {
            self.inner.pass_threshold(score, threshold)
        }
        fn threshold_same(&self) -> f64 {
            self.inner.threshold_same()
        }
        fn threshold_reachable(&self) -> f64 {
            self.inner.threshold_reachable()
        }
    }

    #[test]
    fn probe_failures_skip_the_pair_and_continue() {
        let oracle = FlakyOracle {
            inner: DistanceOracle::default(),
            poison: 1,
        };
        let (graph, pending, report) = consolidate_batch(
            &oracle,
            vec![wp(0, 0.0, 0.0), wp(1, 0.5, 0.0), wp(2, 0.6, 0.0)],
        );

        // Waypoint 1's probes all fail: it is demoted, not lost, and the
        // rest of the batch still consolidates normally.
        assert!(report.probe_failures > 0);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.iter().next().unwrap().sequence, 1);
    }

    struct CountingSink {
        calls: usize,
        fail: bool,
    }

    impl CheckpointSink for CountingSink {
        fn checkpoint(
            &mut self,
            _: &TopologyGraph,
            _: &[Waypoint],
        ) -> Result<(), StoreError> {
            self.calls += 1;
            if self.fail {
                Err(StoreError::Redb {
                    message: "disk full".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn checkpoints_once_per_outer_admission() {
        let oracle = DistanceOracle::default();
        let mut graph = TopologyGraph::new();
        let mut pending = WaypointStore::new();
        // Chain where only waypoint 0 is popped by the outer loop; 1 and
        // 2 are absorbed by its inner fixed point.
        for w in [wp(0, 0.0, 0.0), wp(1, 0.6, 0.0), wp(2, 1.2, 0.0)] {
            pending.append(w);
        }
        let mut sink = CountingSink {
            calls: 0,
            fail: false,
        };
        builder().consolidate(&oracle, &mut graph, &mut pending, &mut sink);
        assert_eq!(sink.calls, 1);
    }

    #[test]
    fn checkpoint_failure_degrades_to_memory() {
        let oracle = DistanceOracle::default();
        let mut graph = TopologyGraph::new();
        let mut pending = WaypointStore::new();
        for w in [wp(0, 0.0, 0.0), wp(1, 0.6, 0.0)] {
            pending.append(w);
        }
        let mut sink = CountingSink {
            calls: 0,
            fail: true,
        };
        let report = builder().consolidate(&oracle, &mut graph, &mut pending, &mut sink);

        assert_eq!(report.checkpoint_failures, sink.calls);
        assert!(report.checkpoint_failures > 0);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn centroid_order_puts_central_candidates_first() {
        let mut candidates = vec![wp(0, 10.0, 0.0), wp(1, 0.0, 0.0), wp(2, 4.0, 0.0)];
        order_by_centroid(&mut candidates);
        // Centroid x ≈ 4.67; candidate 2 sits closest, then 1, then 0.
        assert_eq!(candidates[0].sequence, 2);
        assert_eq!(candidates[1].sequence, 1);
        assert_eq!(candidates[2].sequence, 0);
    }
}
