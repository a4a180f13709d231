//! Engine facade: top-level API for the waymark mapping system.
//!
//! The `Engine` owns all subsystems — oracle, topology graph, pending
//! waypoint buffer, consolidation builder, lifelong updater, and the
//! optional snapshot store — and provides the public interface for
//! observing waypoints, consolidating, planning, and folding navigation
//! outcomes back into the map.

use std::path::PathBuf;

use crate::builder::{ConsolidationConfig, ConsolidationReport, GraphBuilder, NullCheckpoint};
use crate::error::{EngineError, WaymarkResult};
use crate::export::MapExport;
use crate::graph::path::find_path;
use crate::graph::topology::TopologyGraph;
use crate::graph::NodeHandle;
use crate::oracle::ReachabilityOracle;
use crate::persist::SnapshotStore;
use crate::store::WaypointStore;
use crate::updater::{EdgeOutcome, EdgeUpdater, LifelongConfig, NavigationOutcome};
use crate::waypoint::{ObservationFrame, Waypoint};

/// Configuration for the waymark engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Consolidation (exploration wrap-up) tuning.
    pub consolidation: ConsolidationConfig,
    /// Lifelong update (navigation-time) tuning.
    pub lifelong: LifelongConfig,
    /// Data directory for snapshots. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Fixed RNG seed for reproducible edge-weight draws.
    pub seed: Option<u64>,
}

/// The waymark topological mapping engine.
///
/// Owns all subsystems. Construction with a data directory restores the
/// persisted snapshot, including a consolidation interrupted mid-batch:
/// the restored pending buffer picks up exactly where the last
/// checkpoint left off.
pub struct Engine<O> {
    oracle: O,
    graph: TopologyGraph,
    pending: WaypointStore,
    builder: GraphBuilder,
    updater: EdgeUpdater,
    snapshot: Option<SnapshotStore>,
    next_sequence: u64,
}

impl<O: ReachabilityOracle + Sync> Engine<O> {
    /// Create a new engine with the given oracle and configuration.
    pub fn new(oracle: O, config: EngineConfig) -> WaymarkResult<Self> {
        if config.consolidation.sigma <= 0.0 || config.lifelong.sigma <= 0.0 {
            return Err(EngineError::InvalidConfig {
                message: "sigma must be > 0".into(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&config.lifelong.removal_threshold) {
            return Err(EngineError::InvalidConfig {
                message: "removal_threshold must be in [0, 1]".into(),
            }
            .into());
        }

        let (builder, updater) = match config.seed {
            Some(seed) => (
                GraphBuilder::with_seed(config.consolidation.clone(), seed),
                EdgeUpdater::with_seed(config.lifelong.clone(), seed.wrapping_add(1)),
            ),
            None => (
                GraphBuilder::new(config.consolidation.clone()),
                EdgeUpdater::new(config.lifelong.clone()),
            ),
        };

        let mut graph = TopologyGraph::new();
        let mut pending = WaypointStore::new();
        let snapshot = match &config.data_dir {
            Some(dir) => {
                let store = SnapshotStore::open(dir).map_err(|e| {
                    tracing::error!(error = %e, "failed to open snapshot store");
                    EngineError::DataDir {
                        path: dir.display().to_string(),
                    }
                })?;
                if let Some(restored) = store.load()? {
                    graph = restored.graph;
                    for waypoint in restored.pending {
                        pending.append(waypoint);
                    }
                }
                Some(store)
            }
            None => None,
        };

        let next_sequence = graph
            .nodes()
            .map(|(_, w)| w.sequence)
            .chain(pending.iter().map(|w| w.sequence))
            .max()
            .map_or(0, |s| s + 1);

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            pending = pending.len(),
            persistent = snapshot.is_some(),
            "initializing waymark engine"
        );

        Ok(Self {
            oracle,
            graph,
            pending,
            builder,
            updater,
            snapshot,
            next_sequence,
        })
    }

    /// Record a candidate waypoint observed during exploration.
    ///
    /// Returns the waypoint's creation sequence. The waypoint stays in
    /// the pending buffer until the next [`Engine::consolidate`] call.
    pub fn observe(
        &mut self,
        position: [f64; 2],
        observations: Vec<ObservationFrame>,
        signature: Vec<f32>,
    ) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending
            .append(Waypoint::new(sequence, position, observations, signature));
        sequence
    }

    /// Consolidate all pending waypoints into the graph.
    ///
    /// With a data directory configured, progress is checkpointed after
    /// every admission; checkpoint failures degrade to memory-only and
    /// are counted in the report.
    pub fn consolidate(&mut self) -> ConsolidationReport {
        let report = match &mut self.snapshot {
            Some(store) => {
                self.builder
                    .consolidate(&self.oracle, &mut self.graph, &mut self.pending, store)
            }
            None => self.builder.consolidate(
                &self.oracle,
                &mut self.graph,
                &mut self.pending,
                &mut NullCheckpoint,
            ),
        };

        // Orphan demotion runs after the last per-admission checkpoint;
        // bring the snapshot back in line with memory.
        if let Some(store) = &self.snapshot {
            if let Err(e) = store.save(&self.graph, self.pending.as_slice()) {
                tracing::warn!(error = %e, "post-consolidation save failed, continuing in memory");
            }
        }
        report
    }

    /// Cheapest path between two nodes, or `None` if disconnected.
    pub fn find_path(&self, from: NodeHandle, to: NodeHandle) -> Option<Vec<NodeHandle>> {
        find_path(&self.graph, from, to)
    }

    /// Fold one navigation attempt's outcome into the map.
    pub fn record_navigation(
        &mut self,
        from: NodeHandle,
        to: NodeHandle,
        observation: &Waypoint,
        outcome: NavigationOutcome,
    ) -> WaymarkResult<EdgeOutcome> {
        self.updater
            .record_navigation(&self.oracle, &mut self.graph, from, to, observation, outcome)
    }

    /// Post-process after a full topological navigation cycle: merge
    /// nodes that have become duplicates. Returns removed handles.
    pub fn finish_navigation_cycle(&mut self) -> Vec<NodeHandle> {
        self.updater.deduplicate_nodes(&mut self.graph)
    }

    /// Persist the full map state now.
    ///
    /// No-op in memory-only mode. A failed save leaves the in-memory map
    /// untouched and usable.
    pub fn save(&self) -> WaymarkResult<()> {
        if let Some(store) = &self.snapshot {
            store.save(&self.graph, self.pending.as_slice())?;
        }
        Ok(())
    }

    /// Flattened export of the current map.
    pub fn export(&self) -> MapExport {
        MapExport::from_graph(&self.graph)
    }

    /// The topology graph (read-only).
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// The pending waypoint buffer (read-only).
    pub fn pending(&self) -> &WaypointStore {
        &self.pending
    }

    /// The reachability oracle in use.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}

impl<O> std::fmt::Debug for Engine<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("pending", &self.pending.len())
            .finish()
    }
}
