//! Edge (directed, typed) in the property graph.

use serde::{Deserialize, Serialize};
use super::{NodeId, PropertyMap, Value};

/// Opaque edge identifier, allocated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traversal direction relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// A directed edge in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub src: NodeId,
    pub dst: NodeId,
    pub kind: String,
    pub properties: PropertyMap,
}

impl Edge {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Whether this edge touches the given node on the given side.
    pub fn touches(&self, node: NodeId, dir: Direction) -> bool {
        match dir {
            Direction::Outgoing => self.src == node,
            Direction::Incoming => self.dst == node,
            Direction::Both => self.src == node || self.dst == node,
        }
    }
}
