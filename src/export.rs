//! Graph snapshot export.
//!
//! Serializes the whole family graph (people plus directed relation facts,
//! both in listing order) as JSON for the surrounding transport or tooling
//! to consume.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::model::{Person, RelationRecord};
use crate::store::GraphStore;
use crate::{FamilyGraph, Result};

/// Everything the graph holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub people: Vec<Person>,
    pub relations: Vec<RelationRecord>,
}

/// Capture the current people and relations.
pub async fn snapshot<S: GraphStore>(graph: &FamilyGraph<S>) -> Result<GraphSnapshot> {
    Ok(GraphSnapshot {
        people: graph.identity().list_all().await?,
        relations: graph.relations().list_relations().await?,
    })
}

/// Write the current snapshot as pretty-printed JSON.
pub async fn export_json<S: GraphStore>(
    graph: &FamilyGraph<S>,
    writer: &mut dyn Write,
) -> Result<()> {
    let snap = snapshot(graph).await?;
    serde_json::to_writer_pretty(&mut *writer, &snap).map_err(std::io::Error::from)?;
    writeln!(writer)?;
    Ok(())
}
