//! # Family Graph Model
//!
//! Clean DTOs shared by the engine components and the store seam.
//! This module is pure data — no I/O, no state, no async.
//!
//! Two layers live here:
//!
//! - **Domain**: `Person`, `PersonKey`, `RelationType`, `RelationRecord` —
//!   what callers see.
//! - **Store**: `Node`, `Edge`, `Value`, `PropertyMap` — how the domain is
//!   laid out in the backing property graph.

pub mod node;
pub mod edge;
pub mod value;
pub mod property_map;
pub mod person;
pub mod relation;

pub use node::{Node, NodeId};
pub use edge::{Edge, EdgeId, Direction};
pub use value::Value;
pub use property_map::{props, PropertyMap};
pub use person::{Person, PersonKey};
pub use relation::{RelationType, RelationRecord};

// ============================================================================
// Persisted layout
// ============================================================================

/// Node label carrying the person attributes.
pub const PERSON_LABEL: &str = "Person";

/// The single edge kind; the relation type rides on a `type` property.
pub const RELATED_KIND: &str = "RELATED";

pub const PROP_FULL_NAME: &str = "full_name";
pub const PROP_BIRTH_DATE: &str = "birth_date";
pub const PROP_DEATH_DATE: &str = "death_date";
pub const PROP_GENDER: &str = "gender";
pub const PROP_REL_TYPE: &str = "type";
