//! The closed relation vocabulary and its reciprocal mapping.
//!
//! Every relation type has exactly one mirror; asserting `A -[t]-> B`
//! always materializes `B -[mirror(t)]-> A` alongside it. The mapping is a
//! total function over the enum, so it cannot silently drift into a
//! non-involutive state the way an editable lookup table can. It is still
//! verified once at engine startup and under test.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use super::PersonKey;

/// The relation types a family graph records.
///
/// Directional reading: an edge `A -[Parent]-> B` states that A *is the
/// parent of* B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Child,
    Parent,
    Spouse,
    Sibling,
    Grandparent,
    Grandchild,
    GreatGrandparent,
    GreatGrandchild,
    AuntUncle,
    NieceNephew,
    Cousin,
    ParentInLaw,
    ChildInLaw,
    SiblingInLaw,
}

impl RelationType {
    /// Every variant, in declaration order.
    pub const ALL: [RelationType; 14] = [
        RelationType::Child,
        RelationType::Parent,
        RelationType::Spouse,
        RelationType::Sibling,
        RelationType::Grandparent,
        RelationType::Grandchild,
        RelationType::GreatGrandparent,
        RelationType::GreatGrandchild,
        RelationType::AuntUncle,
        RelationType::NieceNephew,
        RelationType::Cousin,
        RelationType::ParentInLaw,
        RelationType::ChildInLaw,
        RelationType::SiblingInLaw,
    ];

    /// The reciprocal type that must exist on the reverse-direction edge.
    pub fn mirror(self) -> RelationType {
        match self {
            RelationType::Child => RelationType::Parent,
            RelationType::Parent => RelationType::Child,
            RelationType::Spouse => RelationType::Spouse,
            RelationType::Sibling => RelationType::Sibling,
            RelationType::Grandparent => RelationType::Grandchild,
            RelationType::Grandchild => RelationType::Grandparent,
            RelationType::GreatGrandparent => RelationType::GreatGrandchild,
            RelationType::GreatGrandchild => RelationType::GreatGrandparent,
            RelationType::AuntUncle => RelationType::NieceNephew,
            RelationType::NieceNephew => RelationType::AuntUncle,
            RelationType::Cousin => RelationType::Cousin,
            RelationType::ParentInLaw => RelationType::ChildInLaw,
            RelationType::ChildInLaw => RelationType::ParentInLaw,
            RelationType::SiblingInLaw => RelationType::SiblingInLaw,
        }
    }

    /// A type is symmetric when it is its own mirror (spouse, sibling, ...).
    pub fn is_symmetric(self) -> bool {
        self.mirror() == self
    }

    /// The snake_case wire name, identical to the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::Child => "child",
            RelationType::Parent => "parent",
            RelationType::Spouse => "spouse",
            RelationType::Sibling => "sibling",
            RelationType::Grandparent => "grandparent",
            RelationType::Grandchild => "grandchild",
            RelationType::GreatGrandparent => "great_grandparent",
            RelationType::GreatGrandchild => "great_grandchild",
            RelationType::AuntUncle => "aunt_uncle",
            RelationType::NieceNephew => "niece_nephew",
            RelationType::Cousin => "cousin",
            RelationType::ParentInLaw => "parent_in_law",
            RelationType::ChildInLaw => "child_in_law",
            RelationType::SiblingInLaw => "sibling_in_law",
        }
    }

    /// Parse a wire name. Anything outside the closed vocabulary is an
    /// `InvalidRelationType` error.
    pub fn parse(raw: &str) -> Result<RelationType> {
        RelationType::ALL
            .into_iter()
            .find(|t| t.as_str() == raw)
            .ok_or_else(|| Error::InvalidRelationType(raw.to_owned()))
    }

    /// Check `mirror(mirror(t)) == t` for the whole vocabulary.
    ///
    /// The match in `mirror()` makes a hole impossible to compile, but the
    /// pairing itself is data that a refactor could break; engine startup
    /// runs this once so a bad pairing fails loudly instead of corrupting
    /// reciprocal edges.
    pub fn verify_involution() -> Result<()> {
        for t in RelationType::ALL {
            if t.mirror().mirror() != t {
                return Err(Error::Validation(format!(
                    "reciprocal mapping is not involutive at {t}"
                )));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for RelationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RelationType::parse(s)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RelationRecord — one directed fact, as listings report it
// ============================================================================

/// A single directed relation fact: `from -[rel_type]-> to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub from: PersonKey,
    pub rel_type: RelationType,
    pub to: PersonKey,
}

impl std::fmt::Display for RelationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.from, self.rel_type, self.to)
    }
}
