//! Person records and the composite identity key.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use super::{props, Node, PropertyMap, PROP_BIRTH_DATE, PROP_DEATH_DATE, PROP_FULL_NAME, PROP_GENDER};

/// The composite key `(full_name, birth_date)` that addresses a person
/// everywhere in the system. There is no surrogate id at this layer.
///
/// Ordering is name-then-birth-date, which is the ordering every listing
/// in the crate uses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonKey {
    pub full_name: String,
    pub birth_date: NaiveDate,
}

impl PersonKey {
    pub fn new(full_name: impl Into<String>, birth_date: NaiveDate) -> Self {
        Self { full_name: full_name.into(), birth_date }
    }

    /// Build a key from wire strings. Rejects an empty name and a date that
    /// is not `YYYY-MM-DD`; the semantic rules (no future dates, death after
    /// birth) belong to the identity resolver, not to key construction.
    pub fn parse(full_name: &str, birth_date: &str) -> Result<Self> {
        if full_name.is_empty() {
            return Err(Error::Validation("full name must not be empty".into()));
        }
        Ok(Self::new(full_name, parse_date("birth date", birth_date)?))
    }

    /// The property pattern that matches exactly this person's node.
    pub(crate) fn match_props(&self) -> PropertyMap {
        props([
            (PROP_FULL_NAME, super::Value::from(self.full_name.clone())),
            (PROP_BIRTH_DATE, super::Value::from(self.birth_date)),
        ])
    }
}

impl std::fmt::Display for PersonKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (b. {})", self.full_name, self.birth_date)
    }
}

/// A person as admitted into the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(flatten)]
    pub key: PersonKey,
    pub death_date: Option<NaiveDate>,
    pub gender: Option<String>,
}

impl Person {
    /// The persisted property layout of this person's node.
    pub(crate) fn to_props(&self) -> PropertyMap {
        let mut out = self.key.match_props();
        if let Some(d) = self.death_date {
            out.insert(PROP_DEATH_DATE.into(), d.into());
        }
        if let Some(g) = &self.gender {
            out.insert(PROP_GENDER.into(), g.clone().into());
        }
        out
    }

    /// Read a person back out of a store node. A node that lost one of its
    /// key properties is corrupt, not absent.
    pub(crate) fn from_node(node: &Node) -> Result<Self> {
        let full_name = node
            .get(PROP_FULL_NAME)
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::StorageError(format!("person node {} has no full_name", node.id)))?;
        let birth_date = node
            .get(PROP_BIRTH_DATE)
            .and_then(|v| v.as_date())
            .ok_or_else(|| Error::StorageError(format!("person node {} has no birth_date", node.id)))?;
        Ok(Self {
            key: PersonKey::new(full_name, birth_date),
            death_date: node.get(PROP_DEATH_DATE).and_then(|v| v.as_date()),
            gender: node.get(PROP_GENDER).and_then(|v| v.as_str()).map(str::to_owned),
        })
    }
}

/// Parse a `YYYY-MM-DD` wire date, naming the offending field on failure.
pub(crate) fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("{field} {raw:?} is not a valid YYYY-MM-DD date")))
}
