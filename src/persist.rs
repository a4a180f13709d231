//! Durable map snapshots backed by redb.
//!
//! One snapshot holds the full map state: confirmed nodes with their
//! waypoint payloads, directed edges with belief parameters, and the
//! pending waypoint buffer. Saves are single write transactions, so a
//! snapshot on disk is always internally consistent; the same path
//! doubles as the per-admission consolidation checkpoint, which makes
//! an interrupted consolidation resumable from the last admitted node.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::builder::CheckpointSink;
use crate::error::StoreError;
use crate::graph::topology::TopologyGraph;
use crate::graph::{EdgeBelief, NodeHandle};
use crate::waypoint::Waypoint;

/// Node table: handle → bincode waypoint payload.
const NODE_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");
/// Edge table: (from handle, to handle) → bincode edge belief.
const EDGE_TABLE: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("edges");
/// Pending table: buffer position → bincode waypoint.
const PENDING_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("pending");
/// Snapshot metadata (format version).
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const FORMAT_VERSION: u64 = 1;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A loaded snapshot: the reconstructed graph plus the pending buffer.
#[derive(Debug)]
pub struct MapSnapshot {
    /// The reconstructed topology graph.
    pub graph: TopologyGraph,
    /// Pending waypoints, in their persisted buffer order.
    pub pending: Vec<Waypoint>,
}

/// Durable snapshot store using redb.
///
/// All writes go through transactions. A failed save leaves the
/// previous snapshot intact and the in-memory map untouched.
pub struct SnapshotStore {
    db: Arc<Database>,
}

impl SnapshotStore {
    /// Open or create a snapshot store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join("waymark.redb");
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Persist the full map state, replacing any previous snapshot.
    pub fn save(&self, graph: &TopologyGraph, pending: &[Waypoint]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            // Drop stale contents; a snapshot is a full rewrite.
            let _ = txn.delete_table(NODE_TABLE);
            let _ = txn.delete_table(EDGE_TABLE);
            let _ = txn.delete_table(PENDING_TABLE);

            let mut nodes = txn.open_table(NODE_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            for (handle, waypoint) in graph.nodes() {
                let payload = encode(waypoint)?;
                nodes
                    .insert(handle.get(), payload.as_slice())
                    .map_err(|e| StoreError::Redb {
                        message: format!("insert node failed: {e}"),
                    })?;
            }

            let mut edges = txn.open_table(EDGE_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            for (from, to, belief) in graph.edges() {
                let payload = encode(belief)?;
                edges
                    .insert((from.get(), to.get()), payload.as_slice())
                    .map_err(|e| StoreError::Redb {
                        message: format!("insert edge failed: {e}"),
                    })?;
            }

            let mut buffer = txn.open_table(PENDING_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            for (position, waypoint) in pending.iter().enumerate() {
                let payload = encode(waypoint)?;
                buffer
                    .insert(position as u64, payload.as_slice())
                    .map_err(|e| StoreError::Redb {
                        message: format!("insert pending failed: {e}"),
                    })?;
            }

            let mut meta = txn.open_table(META_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            meta.insert("format_version", FORMAT_VERSION)
                .map_err(|e| StoreError::Redb {
                    message: format!("insert meta failed: {e}"),
                })?;
        }
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(())
    }

    /// Load the snapshot, if one has ever been saved.
    ///
    /// Returns `Ok(None)` on a fresh store. A snapshot whose edges
    /// reference missing nodes or carry invalid belief parameters is
    /// rejected as corrupt rather than loaded partially.
    pub fn load(&self) -> StoreResult<Option<MapSnapshot>> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;

        let meta = match txn.open_table(META_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => {
                return Err(StoreError::Redb {
                    message: format!("open_table failed: {e}"),
                });
            }
        };
        let version = meta
            .get("format_version")
            .map_err(|e| StoreError::Redb {
                message: format!("get meta failed: {e}"),
            })?
            .map(|guard| guard.value());
        if version != Some(FORMAT_VERSION) {
            return Err(StoreError::CorruptSnapshot {
                message: format!("unsupported format version {version:?}"),
            });
        }

        let mut graph = TopologyGraph::new();

        let nodes = txn.open_table(NODE_TABLE).map_err(|e| StoreError::Redb {
            message: format!("open_table failed: {e}"),
        })?;
        for entry in nodes.iter().map_err(|e| StoreError::Redb {
            message: format!("iter nodes failed: {e}"),
        })? {
            let (key, value) = entry.map_err(|e| StoreError::Redb {
                message: format!("read node failed: {e}"),
            })?;
            let handle = NodeHandle::new(key.value()).ok_or_else(|| StoreError::CorruptSnapshot {
                message: "node handle 0 in snapshot".into(),
            })?;
            let waypoint: Waypoint = decode(value.value())?;
            if !graph.insert_node(handle, waypoint) {
                return Err(StoreError::CorruptSnapshot {
                    message: format!("duplicate node handle {handle}"),
                });
            }
        }

        let edges = txn.open_table(EDGE_TABLE).map_err(|e| StoreError::Redb {
            message: format!("open_table failed: {e}"),
        })?;
        for entry in edges.iter().map_err(|e| StoreError::Redb {
            message: format!("iter edges failed: {e}"),
        })? {
            let (key, value) = entry.map_err(|e| StoreError::Redb {
                message: format!("read edge failed: {e}"),
            })?;
            let (from_raw, to_raw) = key.value();
            let belief: EdgeBelief = decode(value.value())?;
            let (from, to) = match (NodeHandle::new(from_raw), NodeHandle::new(to_raw)) {
                (Some(f), Some(t)) => (f, t),
                _ => {
                    return Err(StoreError::CorruptSnapshot {
                        message: "edge handle 0 in snapshot".into(),
                    });
                }
            };
            if !graph.contains(from) || !graph.contains(to) {
                return Err(StoreError::CorruptSnapshot {
                    message: format!("edge {from} -> {to} references a missing node"),
                });
            }
            if belief.sigma <= 0.0 || !(0.0..=1.0).contains(&belief.connectivity_probability) {
                return Err(StoreError::CorruptSnapshot {
                    message: format!("edge {from} -> {to} carries invalid belief parameters"),
                });
            }
            graph.add_edge(from, to, belief);
        }

        let buffer = txn.open_table(PENDING_TABLE).map_err(|e| StoreError::Redb {
            message: format!("open_table failed: {e}"),
        })?;
        let mut pending: Vec<(u64, Waypoint)> = Vec::new();
        for entry in buffer.iter().map_err(|e| StoreError::Redb {
            message: format!("iter pending failed: {e}"),
        })? {
            let (key, value) = entry.map_err(|e| StoreError::Redb {
                message: format!("read pending failed: {e}"),
            })?;
            pending.push((key.value(), decode(value.value())?));
        }
        pending.sort_by_key(|(position, _)| *position);

        Ok(Some(MapSnapshot {
            graph,
            pending: pending.into_iter().map(|(_, w)| w).collect(),
        }))
    }
}

impl CheckpointSink for SnapshotStore {
    fn checkpoint(&mut self, graph: &TopologyGraph, pending: &[Waypoint]) -> StoreResult<()> {
        self.save(graph, pending)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").finish()
    }
}

fn encode<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization {
        message: format!("failed to serialize snapshot record: {e}"),
    })
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("failed to deserialize snapshot record: {e}"),
    })
}
