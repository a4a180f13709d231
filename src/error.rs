//! Rich diagnostic error types for the waymark engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the waymark engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum WaymarkError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Oracle errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OracleError {
    #[error("reachability probe failed: {message}")]
    #[diagnostic(
        code(waymark::oracle::probe_failed),
        help(
            "The underlying reachability backend (classifier, simulation, \
             overlap function) reported a failure for this pair of waypoints. \
             The pair is skipped; consolidation and edge updates continue."
        )
    )]
    ProbeFailed { message: String },

    #[error("signature length mismatch: {left} vs {right}")]
    #[diagnostic(
        code(waymark::oracle::signature_mismatch),
        help(
            "Both waypoints in a comparison must carry encoding signatures \
             of the same length. Check that all waypoints were produced by \
             the same encoder configuration."
        )
    )]
    SignatureMismatch { left: usize, right: usize },

    #[error("observation bundle is empty for waypoint {sequence}")]
    #[diagnostic(
        code(waymark::oracle::empty_observations),
        help(
            "Observation-based oracles need at least one sensor frame per \
             waypoint. Collect frames during exploration before scoring."
        )
    )]
    EmptyObservations { sequence: u64 },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("node not found: {handle}")]
    #[diagnostic(
        code(waymark::graph::node_not_found),
        help(
            "The handle does not refer to a live node. It may have been \
             removed by orphan cleanup or deduplication; re-query the graph \
             before navigating."
        )
    )]
    NodeNotFound { handle: u64 },

    #[error("edge not found: {from} -> {to}")]
    #[diagnostic(
        code(waymark::graph::edge_not_found),
        help(
            "No directed edge exists between these nodes. Edges are removed \
             when their connectivity belief collapses; replan the route."
        )
    )]
    EdgeNotFound { from: u64, to: u64 },

    #[error("handle already occupied: {handle}")]
    #[diagnostic(
        code(waymark::graph::handle_occupied),
        help(
            "Explicit-handle insertion collided with a live node. This \
             usually means a snapshot was loaded into a non-empty graph."
        )
    )]
    HandleOccupied { handle: u64 },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(waymark::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(waymark::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption — try a fresh data directory. \
             The in-memory map remains usable."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(waymark::store::serde),
        help(
            "Failed to serialize or deserialize map data. This usually means \
             the stored format has changed between versions. Re-explore or \
             migrate the snapshot."
        )
    )]
    Serialization { message: String },

    #[error("snapshot is inconsistent: {message}")]
    #[diagnostic(
        code(waymark::store::corrupt_snapshot),
        help(
            "The snapshot references nodes or edges that do not exist. \
             The snapshot cannot be loaded; start from an empty map."
        )
    )]
    CorruptSnapshot { message: String },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(waymark::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("data directory error: {path}")]
    #[diagnostic(
        code(waymark::engine::data_dir),
        help(
            "The data directory could not be accessed. \
             Ensure the path exists and has read/write permissions."
        )
    )]
    DataDir { path: String },
}

/// Convenience alias for functions returning waymark results.
pub type WaymarkResult<T> = std::result::Result<T, WaymarkError>;
