//! In-memory store.
//!
//! This is the reference implementation of `GraphStore`, and the one the
//! test suites run against. Unlike a toy map-per-collection design, writes
//! here are genuinely transactional:
//!
//! - Mutations stage into the `MemoryTx` and stay invisible until commit.
//! - `commit` takes one write lock over the whole graph, replays the staged
//!   operations against a scratch copy (re-validating key constraints and
//!   endpoint existence as it goes), and swaps the copy in only if every
//!   operation passed. A failed commit leaves committed state untouched.
//!
//! Two transactions racing to create the same keyed node or edge therefore
//! resolve to exactly one success and one `ConstraintViolation`, with no
//! interleaving that leaves half a write behind.
//!
//! Reads see committed state only (no read-your-own-writes); the engine
//! always reads before it stages, so nothing here needs it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::trace;

use crate::model::{Direction, Edge, EdgeId, Node, NodeId, PropertyMap};
use crate::{Error, Result};
use super::{GraphStore, Transaction, TxId, TxMode};

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory property graph storage with staged-write transactions.
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// One lock over the whole graph. Commit holds it exclusively, which is
    /// what makes multi-statement writes atomic.
    state: RwLock<GraphState>,
    constraints: RwLock<Constraints>,
    closed: AtomicBool,
    next_node_id: AtomicU64,
    next_edge_id: AtomicU64,
    next_tx_id: AtomicU64,
}

#[derive(Clone, Default)]
struct GraphState {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    /// node id → ids of every edge touching it (either endpoint)
    adjacency: HashMap<NodeId, SmallVec<[EdgeId; 4]>>,
}

#[derive(Clone, Default)]
struct Constraints {
    node_keys: Vec<NodeKey>,
    edge_keys: Vec<EdgeKey>,
}

/// Unique property tuple per label.
#[derive(Clone, PartialEq, Eq)]
struct NodeKey {
    label: String,
    properties: Vec<String>,
}

/// Unique property value per (src, dst, kind).
#[derive(Clone, PartialEq, Eq)]
struct EdgeKey {
    kind: String,
    property: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(GraphState::default()),
                constraints: RwLock::new(Constraints::default()),
                closed: AtomicBool::new(false),
                next_node_id: AtomicU64::new(1),
                next_edge_id: AtomicU64::new(1),
                next_tx_id: AtomicU64::new(1),
            }),
        }
    }

    fn guard(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(Error::StoreUnavailable("store has been shut down".into()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemoryTx
// ============================================================================

/// A staged-write transaction over the in-memory graph.
#[derive(Debug)]
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
    staged: Vec<StagedOp>,
}

#[derive(Debug)]
enum StagedOp {
    CreateNode(Node),
    CreateEdge(Edge),
    DeleteEdge(EdgeId),
    DetachDeleteNode(NodeId),
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode {
        self.mode
    }
    fn id(&self) -> TxId {
        self.id
    }
}

fn require_write(tx: &MemoryTx) -> Result<()> {
    if tx.mode != TxMode::ReadWrite {
        return Err(Error::TxError("write staged on a read-only transaction".into()));
    }
    Ok(())
}

// ============================================================================
// Commit-time replay
// ============================================================================

/// Apply one staged operation to the scratch state, enforcing constraints
/// against everything already there (committed rows plus earlier staged ops).
fn apply_op(state: &mut GraphState, cons: &Constraints, op: StagedOp) -> Result<()> {
    match op {
        StagedOp::CreateNode(node) => {
            for key in &cons.node_keys {
                if !node.has_label(&key.label) {
                    continue;
                }
                let clash = state.nodes.values().any(|n| {
                    n.has_label(&key.label)
                        && key
                            .properties
                            .iter()
                            .all(|p| n.get(p).is_some() && n.get(p) == node.get(p))
                });
                if clash {
                    return Err(Error::ConstraintViolation(format!(
                        "node key ({}) duplicated on label {}",
                        key.properties.join(", "),
                        key.label,
                    )));
                }
            }
            state.adjacency.entry(node.id).or_default();
            state.nodes.insert(node.id, node);
            Ok(())
        }

        StagedOp::CreateEdge(edge) => {
            if !state.nodes.contains_key(&edge.src) {
                return Err(Error::NotFound(format!("source node {}", edge.src)));
            }
            if !state.nodes.contains_key(&edge.dst) {
                return Err(Error::NotFound(format!("target node {}", edge.dst)));
            }
            for key in &cons.edge_keys {
                if key.kind != edge.kind {
                    continue;
                }
                let val = edge.get(&key.property);
                let clash = state.edges.values().any(|e| {
                    e.kind == edge.kind
                        && e.src == edge.src
                        && e.dst == edge.dst
                        && e.get(&key.property) == val
                });
                if clash {
                    return Err(Error::ConstraintViolation(format!(
                        "edge key {} duplicated on {} edge {} -> {}",
                        key.property, edge.kind, edge.src, edge.dst,
                    )));
                }
            }
            let (id, src, dst) = (edge.id, edge.src, edge.dst);
            state.edges.insert(id, edge);
            state.adjacency.entry(src).or_default().push(id);
            if src != dst {
                state.adjacency.entry(dst).or_default().push(id);
            }
            Ok(())
        }

        // Deleting a row that is already gone is a no-op.
        StagedOp::DeleteEdge(id) => {
            if let Some(edge) = state.edges.remove(&id) {
                unlink(state, &edge);
            }
            Ok(())
        }

        StagedOp::DetachDeleteNode(id) => {
            if state.nodes.remove(&id).is_none() {
                return Ok(());
            }
            let incident = state.adjacency.remove(&id).unwrap_or_default();
            for eid in incident {
                if let Some(edge) = state.edges.remove(&eid) {
                    let other = if edge.src == id { edge.dst } else { edge.src };
                    if let Some(list) = state.adjacency.get_mut(&other) {
                        list.retain(|e| *e != eid);
                    }
                }
            }
            Ok(())
        }
    }
}

fn unlink(state: &mut GraphState, edge: &Edge) {
    if let Some(list) = state.adjacency.get_mut(&edge.src) {
        list.retain(|e| *e != edge.id);
    }
    if edge.src != edge.dst {
        if let Some(list) = state.adjacency.get_mut(&edge.dst) {
            list.retain(|e| *e != edge.id);
        }
    }
}

// ============================================================================
// GraphStore impl
// ============================================================================

#[async_trait]
impl GraphStore for MemoryStore {
    type Tx = MemoryTx;

    async fn shutdown(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }

    async fn begin(&self, mode: TxMode) -> Result<MemoryTx> {
        self.guard()?;
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        Ok(MemoryTx { id, mode, staged: Vec::new() })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<()> {
        self.guard()?;
        if tx.staged.is_empty() {
            return Ok(());
        }

        let cons = self.inner.constraints.read().clone();
        let mut state = self.inner.state.write();

        // Replay against a scratch copy; only a fully valid batch lands.
        let mut next = state.clone();
        let count = tx.staged.len();
        for op in tx.staged {
            apply_op(&mut next, &cons, op)?;
        }
        *state = next;

        trace!(tx = tx.id.0, ops = count, "transaction committed");
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<()> {
        trace!(tx = tx.id.0, ops = tx.staged.len(), "transaction rolled back");
        Ok(())
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    async fn ensure_node_key(&self, label: &str, properties: &[&str]) -> Result<()> {
        self.guard()?;
        let key = NodeKey {
            label: label.to_owned(),
            properties: properties.iter().map(|p| (*p).to_owned()).collect(),
        };
        let mut cons = self.inner.constraints.write();
        if !cons.node_keys.contains(&key) {
            cons.node_keys.push(key);
        }
        Ok(())
    }

    async fn ensure_edge_key(&self, kind: &str, property: &str) -> Result<()> {
        self.guard()?;
        let key = EdgeKey { kind: kind.to_owned(), property: property.to_owned() };
        let mut cons = self.inner.constraints.write();
        if !cons.edge_keys.contains(&key) {
            cons.edge_keys.push(key);
        }
        Ok(())
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    async fn create_node(
        &self,
        tx: &mut MemoryTx,
        label: &str,
        props: PropertyMap,
    ) -> Result<NodeId> {
        self.guard()?;
        require_write(tx)?;
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        let node = Node { id, labels: vec![label.to_owned()], properties: props };
        tx.staged.push(StagedOp::CreateNode(node));
        Ok(id)
    }

    async fn get_node(&self, _tx: &MemoryTx, id: NodeId) -> Result<Option<Node>> {
        self.guard()?;
        Ok(self.inner.state.read().nodes.get(&id).cloned())
    }

    async fn find_node(
        &self,
        _tx: &MemoryTx,
        label: &str,
        pattern: &PropertyMap,
    ) -> Result<Option<Node>> {
        self.guard()?;
        let state = self.inner.state.read();
        Ok(state
            .nodes
            .values()
            .filter(|n| n.has_label(label) && n.matches(pattern))
            .min_by_key(|n| n.id.0)
            .cloned())
    }

    async fn nodes_by_label(&self, _tx: &MemoryTx, label: &str) -> Result<Vec<Node>> {
        self.guard()?;
        let state = self.inner.state.read();
        let mut nodes: Vec<Node> =
            state.nodes.values().filter(|n| n.has_label(label)).cloned().collect();
        nodes.sort_by_key(|n| n.id.0);
        Ok(nodes)
    }

    async fn detach_delete_node(&self, tx: &mut MemoryTx, id: NodeId) -> Result<()> {
        self.guard()?;
        require_write(tx)?;
        tx.staged.push(StagedOp::DetachDeleteNode(id));
        Ok(())
    }

    // ========================================================================
    // Edges
    // ========================================================================

    async fn create_edge(
        &self,
        tx: &mut MemoryTx,
        src: NodeId,
        dst: NodeId,
        kind: &str,
        props: PropertyMap,
    ) -> Result<EdgeId> {
        self.guard()?;
        require_write(tx)?;
        let id = EdgeId(self.inner.next_edge_id.fetch_add(1, Ordering::Relaxed));
        let edge = Edge { id, src, dst, kind: kind.to_owned(), properties: props };
        tx.staged.push(StagedOp::CreateEdge(edge));
        Ok(id)
    }

    async fn edges_of(
        &self,
        _tx: &MemoryTx,
        node: NodeId,
        dir: Direction,
        kind: Option<&str>,
    ) -> Result<Vec<Edge>> {
        self.guard()?;
        let state = self.inner.state.read();
        let ids = state.adjacency.get(&node).cloned().unwrap_or_default();
        let mut out = Vec::new();
        for eid in ids {
            if let Some(edge) = state.edges.get(&eid) {
                if edge.touches(node, dir) && kind.is_none_or(|k| edge.kind == k) {
                    out.push(edge.clone());
                }
            }
        }
        out.sort_by_key(|e| e.id.0);
        Ok(out)
    }

    async fn edges_between(
        &self,
        _tx: &MemoryTx,
        src: NodeId,
        dst: NodeId,
        kind: Option<&str>,
    ) -> Result<Vec<Edge>> {
        self.guard()?;
        let state = self.inner.state.read();
        let ids = state.adjacency.get(&src).cloned().unwrap_or_default();
        let mut out = Vec::new();
        for eid in ids {
            if let Some(edge) = state.edges.get(&eid) {
                if edge.src == src && edge.dst == dst && kind.is_none_or(|k| edge.kind == k) {
                    out.push(edge.clone());
                }
            }
        }
        out.sort_by_key(|e| e.id.0);
        Ok(out)
    }

    async fn delete_edge(&self, tx: &mut MemoryTx, id: EdgeId) -> Result<()> {
        self.guard()?;
        require_write(tx)?;
        tx.staged.push(StagedOp::DeleteEdge(id));
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn node_count(&self, _tx: &MemoryTx) -> Result<u64> {
        self.guard()?;
        Ok(self.inner.state.read().nodes.len() as u64)
    }

    async fn edge_count(&self, _tx: &MemoryTx) -> Result<u64> {
        self.guard()?;
        Ok(self.inner.state.read().edges.len() as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================
