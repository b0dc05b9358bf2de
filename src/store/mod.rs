//! # Store Seam
//!
//! This is THE contract between the engine and any backing property-graph
//! store. The engine itself is stateless: every operation opens one
//! transaction, stages its writes, and commits — or returns an error with
//! nothing applied.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory reference store for testing/embedding |
//!
//! A client for an external store (a Bolt-speaking graph database, say)
//! implements the same trait; the engine never learns the difference.
//!
//! ## Transaction contract
//!
//! - Mutating methods stage work against the transaction; nothing is visible
//!   to other transactions until `commit`.
//! - `commit` validates every staged write against the registered
//!   constraints and against current committed state, then applies all of
//!   them or none. A violated constraint surfaces as
//!   `Error::ConstraintViolation`; a staged edge whose endpoint has vanished
//!   surfaces as `Error::NotFound`.
//! - A transaction dropped without `commit` is discarded.
//! - Staged deletes of rows that are already gone are no-ops, so two racing
//!   removals both succeed rather than deadlocking over tombstones.
//! - Every method may fail with `Error::StoreUnavailable` once the store has
//!   been shut down.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Direction, Edge, EdgeId, Node, NodeId, PropertyMap};
use crate::Result;

pub use memory::MemoryStore;

// ============================================================================
// Transactions
// ============================================================================

/// Transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Opaque transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

/// Transaction handle that all stores must provide.
pub trait Transaction: Send + Sync {
    fn mode(&self) -> TxMode;
    fn id(&self) -> TxId;
}

// ============================================================================
// GraphStore Trait
// ============================================================================

/// The universal store contract.
///
/// The trait is scoped to what a relation-consistency engine needs: labeled
/// nodes, directed kinded edges, pattern lookups, cascading node deletion,
/// and conditional writes. Uniqueness is enforced by the store inside
/// `commit`, never by an engine-side read-then-write pair, so two racing
/// writers resolve to exactly one success.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    /// The transaction type for this store.
    type Tx: Transaction;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Shut down the store, releasing its resources. Later calls fail with
    /// `Error::StoreUnavailable`.
    async fn shutdown(&self) -> Result<()>;

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Begin a new transaction.
    async fn begin(&self, mode: TxMode) -> Result<Self::Tx>;

    /// Validate and apply every staged write atomically.
    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    /// Discard the transaction's staged writes.
    async fn rollback(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Constraints (registered once, at engine startup)
    // ========================================================================

    /// Require the property tuple to be unique among nodes with this label.
    /// Idempotent.
    async fn ensure_node_key(&self, label: &str, properties: &[&str]) -> Result<()>;

    /// Require the property value to be unique among edges of this kind
    /// between a given ordered endpoint pair. Idempotent.
    async fn ensure_edge_key(&self, kind: &str, property: &str) -> Result<()>;

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Stage a node with the given label and properties. The id is handed
    /// out immediately; node-key constraints are checked at commit.
    async fn create_node(
        &self,
        tx: &mut Self::Tx,
        label: &str,
        props: PropertyMap,
    ) -> Result<NodeId>;

    /// Get a node by id. Returns None if not found.
    async fn get_node(&self, tx: &Self::Tx, id: NodeId) -> Result<Option<Node>>;

    /// Find the node carrying this label whose properties contain every
    /// (key, value) pair of `pattern`.
    async fn find_node(
        &self,
        tx: &Self::Tx,
        label: &str,
        pattern: &PropertyMap,
    ) -> Result<Option<Node>>;

    /// All nodes with a given label.
    async fn nodes_by_label(&self, tx: &Self::Tx, label: &str) -> Result<Vec<Node>>;

    /// Stage the removal of a node together with every edge incident to it.
    /// The two never apply separately.
    async fn detach_delete_node(&self, tx: &mut Self::Tx, id: NodeId) -> Result<()>;

    // ========================================================================
    // Edges
    // ========================================================================

    /// Stage a directed edge between two nodes. Endpoint existence and
    /// edge-key constraints are checked at commit.
    async fn create_edge(
        &self,
        tx: &mut Self::Tx,
        src: NodeId,
        dst: NodeId,
        kind: &str,
        props: PropertyMap,
    ) -> Result<EdgeId>;

    /// All edges of a node, filtered by direction and optionally by kind.
    async fn edges_of(
        &self,
        tx: &Self::Tx,
        node: NodeId,
        dir: Direction,
        kind: Option<&str>,
    ) -> Result<Vec<Edge>>;

    /// All directed edges `src -> dst`, optionally filtered by kind.
    async fn edges_between(
        &self,
        tx: &Self::Tx,
        src: NodeId,
        dst: NodeId,
        kind: Option<&str>,
    ) -> Result<Vec<Edge>>;

    /// Stage the removal of an edge.
    async fn delete_edge(&self, tx: &mut Self::Tx, id: EdgeId) -> Result<()>;

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Total number of committed nodes.
    async fn node_count(&self, tx: &Self::Tx) -> Result<u64>;

    /// Total number of committed edges.
    async fn edge_count(&self, tx: &Self::Tx) -> Result<u64>;
}
