//! Waypoint types: candidate places observed during exploration.
//!
//! A [`Waypoint`] is a snapshot of the agent's situation at a locally
//! distinctive location: where it was, what it saw, and how the encoder
//! summarized the place. Waypoints are immutable once created and are
//! consumed exactly once by consolidation — merged into an existing node
//! or promoted to one.
//!
//! Two waypoints are never compared by raw field equality; "the same
//! place" is decided by the reachability oracle's `is_same` alone.

use serde::{Deserialize, Serialize};

/// One sensor frame captured at a waypoint.
///
/// The engine treats frame contents as opaque; only oracle implementations
/// interpret them (e.g. a learned classifier scoring image pairs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationFrame {
    /// Flattened sensor data (pixels, depth, or any fixed layout).
    pub data: Vec<f32>,
}

impl ObservationFrame {
    /// Create a frame from raw sensor data.
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }
}

/// A candidate place node awaiting graph admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    /// Monotonic creation index; orders the pending buffer and identifies
    /// the waypoint in logs and reports.
    pub sequence: u64,
    /// Planar position at the moment of creation.
    pub position: [f64; 2],
    /// Time-ordered bundle of sensor frames (fixed length per encoder).
    pub observations: Vec<ObservationFrame>,
    /// Opaque encoding signature (e.g. grid-cell firing pattern).
    pub signature: Vec<f32>,
}

impl Waypoint {
    /// Create a new waypoint.
    pub fn new(
        sequence: u64,
        position: [f64; 2],
        observations: Vec<ObservationFrame>,
        signature: Vec<f32>,
    ) -> Self {
        Self {
            sequence,
            position,
            observations,
            signature,
        }
    }

    /// Euclidean distance between this waypoint's position and another's.
    pub fn distance_to(&self, other: &Waypoint) -> f64 {
        let dx = self.position[0] - other.position[0];
        let dy = self.position[1] - other.position[1];
        (dx * dx + dy * dy).sqrt()
    }

    /// The most recent sensor frame, if any frames were captured.
    pub fn latest_observation(&self) -> Option<&ObservationFrame> {
        self.observations.last()
    }

    /// The earliest sensor frame, if any frames were captured.
    pub fn first_observation(&self) -> Option<&ObservationFrame> {
        self.observations.first()
    }
}
