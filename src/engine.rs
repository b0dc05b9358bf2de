//! Relation consistency engine.
//!
//! Every relationship is two directed facts: the asserted edge and its
//! reciprocal, joined by `RelationType::mirror()`. This module is the only
//! writer of `RELATED` edges, and it only ever writes or deletes the pair
//! inside a single store transaction. The guards live here too:
//! self-relations and duplicate assertions are rejected, and retraction
//! refuses to run unless both directed halves are present.
//!
//! Reads run at whatever isolation the store gives a read-only transaction;
//! callers tolerate staleness against concurrent writers.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::model::{
    props, Direction, Edge, Node, NodeId, Person, PersonKey, PropertyMap, RelationRecord,
    RelationType, PERSON_LABEL, PROP_REL_TYPE, RELATED_KIND,
};
use crate::store::{GraphStore, TxMode};
use crate::{Error, Result};

/// Paired-edge writes and relation reads, over an injected store client.
pub struct RelationEngine<'g, S: GraphStore> {
    store: &'g S,
}

impl<'g, S: GraphStore> RelationEngine<'g, S> {
    pub fn new(store: &'g S) -> Self {
        Self { store }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Record `a -[rel_type]-> b` together with its reciprocal
    /// `b -[mirror]-> a`. The two edges commit atomically; a rejected commit
    /// leaves neither behind.
    pub async fn assert_relation(&self, a: &PersonKey, b: &PersonKey, rel_type: &str) -> Result<()> {
        let rel = RelationType::parse(rel_type)?;
        if a == b {
            return Err(Error::SelfRelation(a.to_string()));
        }

        let mut tx = self.store.begin(TxMode::ReadWrite).await?;
        let src = self.person_node(&tx, a).await?.ok_or_else(|| Error::UnknownPerson(a.to_string()))?;
        let dst = self.person_node(&tx, b).await?.ok_or_else(|| Error::UnknownPerson(b.to_string()))?;

        self.store.create_edge(&mut tx, src.id, dst.id, RELATED_KIND, rel_props(rel)).await?;
        self.store.create_edge(&mut tx, dst.id, src.id, RELATED_KIND, rel_props(rel.mirror())).await?;
        self.store.commit(tx).await.map_err(|e| match e {
            // the per-pair relation-type key: this assertion already exists
            Error::ConstraintViolation(_) => {
                Error::DuplicateRelation(format!("{a} -[{rel}]-> {b}"))
            }
            // an endpoint was removed between resolution and commit
            Error::NotFound(_) => Error::UnknownPerson(format!("{a} or {b}")),
            other => other,
        })?;

        debug!(from = %a, to = %b, rel = %rel, mirror = %rel.mirror(), "relation asserted");
        Ok(())
    }

    /// Remove `a -[rel_type]-> b` together with its reciprocal.
    ///
    /// Both directed halves must be present. A lone half means the pairing
    /// invariant is already broken; retraction reports it instead of
    /// silently tidying up.
    pub async fn retract_relation(&self, a: &PersonKey, b: &PersonKey, rel_type: &str) -> Result<()> {
        let rel = RelationType::parse(rel_type)?;
        let missing = || Error::NotFound(format!("relation {rel} between {a} and {b}"));

        let mut tx = self.store.begin(TxMode::ReadWrite).await?;
        let src = self.person_node(&tx, a).await?.ok_or_else(missing)?;
        let dst = self.person_node(&tx, b).await?.ok_or_else(missing)?;

        let forward = self.directed_edge(&tx, src.id, dst.id, rel).await?.ok_or_else(missing)?;
        let reverse = self
            .directed_edge(&tx, dst.id, src.id, rel.mirror())
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "reciprocal {} half of relation {rel} between {a} and {b}",
                    rel.mirror(),
                ))
            })?;

        self.store.delete_edge(&mut tx, forward.id).await?;
        self.store.delete_edge(&mut tx, reverse.id).await?;
        self.store.commit(tx).await?;

        debug!(from = %a, to = %b, rel = %rel, "relation retracted");
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// A person's outgoing relations, grouped by the edge's own type, each
    /// group ordered by name then birth date.
    ///
    /// A person the graph does not know is `UnknownPerson`; a known person
    /// with nothing recorded is `NotFound`. The two cases are deliberately
    /// distinct.
    pub async fn relations_of(&self, person: &PersonKey) -> Result<BTreeMap<RelationType, Vec<PersonKey>>> {
        let tx = self.store.begin(TxMode::ReadOnly).await?;
        let node = self
            .person_node(&tx, person)
            .await?
            .ok_or_else(|| Error::UnknownPerson(person.to_string()))?;

        let edges = self.store.edges_of(&tx, node.id, Direction::Outgoing, Some(RELATED_KIND)).await?;
        if edges.is_empty() {
            return Err(Error::NotFound(format!("no relations recorded for {person}")));
        }

        let mut grouped: BTreeMap<RelationType, Vec<PersonKey>> = BTreeMap::new();
        for edge in &edges {
            let rel = edge_rel_type(edge)?;
            let other = self
                .store
                .get_node(&tx, edge.dst)
                .await?
                .ok_or_else(|| Error::StorageError(format!("edge {} points at a missing node", edge.id)))?;
            grouped.entry(rel).or_default().push(Person::from_node(&other)?.key);
        }
        self.store.commit(tx).await?;

        for keys in grouped.values_mut() {
            keys.sort();
        }
        Ok(grouped)
    }

    /// The deduplicated union of relation types recorded between the
    /// unordered pair `{a, b}`, in vocabulary order.
    pub async fn relation_between(&self, a: &PersonKey, b: &PersonKey) -> Result<Vec<RelationType>> {
        let missing = || Error::NotFound(format!("no relation recorded between {a} and {b}"));

        let tx = self.store.begin(TxMode::ReadOnly).await?;
        let Some(src) = self.person_node(&tx, a).await? else { return Err(missing()) };
        let Some(dst) = self.person_node(&tx, b).await? else { return Err(missing()) };

        let mut types = BTreeSet::new();
        for edge in self.store.edges_between(&tx, src.id, dst.id, Some(RELATED_KIND)).await? {
            types.insert(edge_rel_type(&edge)?);
        }
        for edge in self.store.edges_between(&tx, dst.id, src.id, Some(RELATED_KIND)).await? {
            types.insert(edge_rel_type(&edge)?);
        }
        self.store.commit(tx).await?;

        if types.is_empty() {
            return Err(missing());
        }
        Ok(types.into_iter().collect())
    }

    /// Every directed relation fact in the graph, ordered by from-person,
    /// then to-person, then type.
    pub async fn list_relations(&self) -> Result<Vec<RelationRecord>> {
        let tx = self.store.begin(TxMode::ReadOnly).await?;
        let nodes = self.store.nodes_by_label(&tx, PERSON_LABEL).await?;

        let mut key_of: HashMap<NodeId, PersonKey> = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            key_of.insert(node.id, Person::from_node(node)?.key);
        }

        let mut records = Vec::new();
        for node in &nodes {
            let from = &key_of[&node.id];
            for edge in self.store.edges_of(&tx, node.id, Direction::Outgoing, Some(RELATED_KIND)).await? {
                let to = key_of
                    .get(&edge.dst)
                    .ok_or_else(|| Error::StorageError(format!("edge {} points at a missing node", edge.id)))?
                    .clone();
                records.push(RelationRecord {
                    from: from.clone(),
                    rel_type: edge_rel_type(&edge)?,
                    to,
                });
            }
        }
        self.store.commit(tx).await?;

        records.sort_by(|x, y| {
            (&x.from, &x.to, x.rel_type).cmp(&(&y.from, &y.to, y.rel_type))
        });
        Ok(records)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn person_node(&self, tx: &S::Tx, key: &PersonKey) -> Result<Option<Node>> {
        self.store.find_node(tx, PERSON_LABEL, &key.match_props()).await
    }

    async fn directed_edge(
        &self,
        tx: &S::Tx,
        src: NodeId,
        dst: NodeId,
        rel: RelationType,
    ) -> Result<Option<Edge>> {
        let edges = self.store.edges_between(tx, src, dst, Some(RELATED_KIND)).await?;
        Ok(edges
            .into_iter()
            .find(|e| e.get(PROP_REL_TYPE).and_then(|v| v.as_str()) == Some(rel.as_str())))
    }
}

fn rel_props(rel: RelationType) -> PropertyMap {
    props([(PROP_REL_TYPE, rel.as_str())])
}

/// The relation type an edge carries. An edge without one, or with a name
/// outside the vocabulary, is corrupt state rather than bad input.
fn edge_rel_type(edge: &Edge) -> Result<RelationType> {
    let raw = edge
        .get(PROP_REL_TYPE)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::StorageError(format!("edge {} carries no relation type", edge.id)))?;
    RelationType::parse(raw)
        .map_err(|_| Error::StorageError(format!("edge {} carries unknown relation type {raw:?}", edge.id)))
}
