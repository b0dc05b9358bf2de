//! # kindred — Family-Relationship Graph Engine
//!
//! A consistency engine for family graphs: people connected by typed,
//! directional relationship edges where every edge is paired with its
//! reciprocal (`parent` ↔ `child`, `spouse` ↔ `spouse`, ...). The engine
//! guarantees that the two halves of a relationship are created and removed
//! together, that duplicate and self-directed relationships are rejected,
//! and that removing a person atomically removes every edge touching them.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore` is the contract between the engine and
//!    whatever transactional property-graph store backs it
//! 2. **Clean DTOs**: `Person`, `PersonKey`, `RelationType` cross all boundaries
//! 3. **Closed vocabulary**: `RelationType` is a tagged enum with a total,
//!    involutive `mirror()` — an unknown type is unrepresentable past the parse
//! 4. **No check-then-act**: duplicate detection rides on store constraints
//!    validated inside the commit, not on read-then-write query pairs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kindred::{FamilyGraph, PersonKey};
//!
//! # async fn example() -> kindred::Result<()> {
//! let graph = FamilyGraph::open_memory().await?;
//!
//! let people = graph.identity();
//! people.admit("Ada Lovelace", "1815-12-10", Some("1852-11-27"), Some("female")).await?;
//! people.admit("Anne Isabella Byron", "1792-05-17", None, None).await?;
//!
//! let relations = graph.relations();
//! relations.assert_relation(
//!     &PersonKey::parse("Anne Isabella Byron", "1792-05-17")?,
//!     &PersonKey::parse("Ada Lovelace", "1815-12-10")?,
//!     "parent",
//! ).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Components
//!
//! | Component | Module | Responsibility |
//! |-----------|--------|----------------|
//! | Identity resolver | `identity` | admit/remove/list people keyed by `(full_name, birth_date)` |
//! | Relation engine | `engine` | paired-edge create/delete, duplicate and self-relation guards, read paths |
//! | Store seam | `store` | `GraphStore` trait + in-memory reference implementation |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod store;
pub mod identity;
pub mod engine;
pub mod export;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Person, PersonKey, RelationType, RelationRecord,
    Node, NodeId, Edge, EdgeId, Direction, Value, PropertyMap,
};

// ============================================================================
// Re-exports: Store
// ============================================================================

pub use store::{GraphStore, MemoryStore, Transaction, TxMode, TxId};

// ============================================================================
// Re-exports: Components
// ============================================================================

pub use identity::IdentityResolver;
pub use engine::RelationEngine;
pub use export::GraphSnapshot;

use tracing::info;

// ============================================================================
// Top-level FamilyGraph handle
// ============================================================================

/// The primary entry point. A `FamilyGraph` owns an injected store client
/// and hands out the two engine components that operate through it.
///
/// `open()` registers the identity-key and relation-key constraints with the
/// store and verifies the reciprocal mapping once, so every later operation
/// can lean on them. `close()` releases the store; there is no ambient
/// connection state anywhere else in the crate.
pub struct FamilyGraph<S: GraphStore> {
    store: S,
}

impl<S: GraphStore> FamilyGraph<S> {
    /// Open the engine over an injected store client.
    pub async fn open(store: S) -> Result<Self> {
        RelationType::verify_involution()?;
        store
            .ensure_node_key(model::PERSON_LABEL, &[model::PROP_FULL_NAME, model::PROP_BIRTH_DATE])
            .await?;
        store.ensure_edge_key(model::RELATED_KIND, model::PROP_REL_TYPE).await?;
        info!("family graph opened");
        Ok(Self { store })
    }

    /// The identity resolver: admission, removal, and listing of people.
    pub fn identity(&self) -> IdentityResolver<'_, S> {
        IdentityResolver::new(&self.store)
    }

    /// The relation consistency engine: paired-edge writes and relation reads.
    pub fn relations(&self) -> RelationEngine<'_, S> {
        RelationEngine::new(&self.store)
    }

    /// Access the underlying store (for advanced use).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Shut the store down, ending the engine's lifecycle.
    pub async fn close(self) -> Result<()> {
        info!("family graph closing");
        self.store.shutdown().await
    }
}

impl<S: GraphStore> std::fmt::Debug for FamilyGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyGraph").finish_non_exhaustive()
    }
}

/// In-memory graph for testing and embedding.
impl FamilyGraph<MemoryStore> {
    pub async fn open_memory() -> Result<Self> {
        Self::open(MemoryStore::new()).await
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or contradictory input, detected before touching the store.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("person already exists: {0}")]
    DuplicateIdentity(String),

    #[error("relation already exists: {0}")]
    DuplicateRelation(String),

    #[error("invalid relation type: {0}")]
    InvalidRelationType(String),

    #[error("cannot relate {0} to themselves")]
    SelfRelation(String),

    #[error("unknown person: {0}")]
    UnknownPerson(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store cannot be reached (or has been shut down).
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A store constraint rejected a staged write at commit.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("transaction error: {0}")]
    TxError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
