//! # waymark
//!
//! A lifelong topological mapping engine: builds and maintains a graph of
//! locally-distinctive places over a continuous environment explored by a
//! mobile agent, with probabilistic reachability edges that keep learning
//! from live navigation outcomes.
//!
//! ## Architecture
//!
//! - **Waypoints** (`waypoint`, `store`): candidate places collected during
//!   exploration, buffered until consolidation
//! - **Oracles** (`oracle`): pluggable reachability strategies — distance,
//!   trained classifier, simulation probe, view overlap, shortcut
//! - **Topology graph** (`graph`): handle-addressed place nodes with
//!   Gaussian distance estimates and connectivity beliefs on every edge
//! - **Consolidation** (`builder`): batch admission with merge-vs-promote
//!   policy, fixed-point connection sweeps, and orphan demotion
//! - **Lifelong updates** (`updater`): Bayesian edge revision from
//!   navigation outcomes, collapse-triggered pruning, node deduplication
//! - **Persistence** (`persist`): redb-backed snapshots and per-admission
//!   consolidation checkpoints
//!
//! ## Library usage
//!
//! ```no_run
//! use waymark::engine::{Engine, EngineConfig};
//! use waymark::oracle::distance::DistanceOracle;
//! use waymark::updater::NavigationOutcome;
//!
//! let mut engine = Engine::new(DistanceOracle::default(), EngineConfig::default()).unwrap();
//! engine.observe([0.0, 0.0], vec![], vec![]);
//! engine.observe([0.5, 0.0], vec![], vec![]);
//! let report = engine.consolidate();
//! println!("admitted {} waypoints", report.admitted);
//! ```

pub mod builder;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod oracle;
pub mod persist;
pub mod store;
pub mod updater;
pub mod waypoint;
