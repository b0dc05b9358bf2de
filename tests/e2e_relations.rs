//! End-to-end tests for the relation consistency engine: paired assertion,
//! guards, retraction, and the read paths.

use std::collections::BTreeMap;

use kindred::{Error, FamilyGraph, GraphStore, MemoryStore, PersonKey, RelationType, TxMode};
use pretty_assertions::assert_eq;

async fn graph() -> FamilyGraph<MemoryStore> {
    FamilyGraph::open_memory().await.unwrap()
}

async fn admit(graph: &FamilyGraph<MemoryStore>, name: &str, birth: &str) -> PersonKey {
    graph.identity().admit(name, birth, None, None).await.unwrap().key
}

async fn edge_count(graph: &FamilyGraph<MemoryStore>) -> u64 {
    let store = graph.store();
    let tx = store.begin(TxMode::ReadOnly).await.unwrap();
    store.edge_count(&tx).await.unwrap()
}

// ============================================================================
// 1. Paired assertion
// ============================================================================

#[tokio::test]
async fn test_assert_creates_both_halves() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;

    // Bob is the parent of Alice.
    graph.relations().assert_relation(&bob, &alice, "parent").await.unwrap();
    assert_eq!(edge_count(&graph).await, 2);

    let of_bob = graph.relations().relations_of(&bob).await.unwrap();
    assert_eq!(of_bob, BTreeMap::from([(RelationType::Parent, vec![alice.clone()])]));
    assert_eq!(of_bob[&RelationType::Parent][0].to_string(), "Alice (b. 1990-01-01)");

    let of_alice = graph.relations().relations_of(&alice).await.unwrap();
    assert_eq!(of_alice, BTreeMap::from([(RelationType::Child, vec![bob.clone()])]));

    let between = graph.relations().relation_between(&bob, &alice).await.unwrap();
    assert_eq!(between, vec![RelationType::Child, RelationType::Parent]);
}

#[tokio::test]
async fn test_symmetric_relation_reads_as_one_type() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let carol = admit(&graph, "Carol", "1992-07-20").await;

    graph.relations().assert_relation(&alice, &carol, "spouse").await.unwrap();

    // two directed edges, one type either way round
    assert_eq!(edge_count(&graph).await, 2);
    assert_eq!(
        graph.relations().relation_between(&alice, &carol).await.unwrap(),
        vec![RelationType::Spouse],
    );
    assert_eq!(
        graph.relations().relation_between(&carol, &alice).await.unwrap(),
        vec![RelationType::Spouse],
    );
}

#[tokio::test]
async fn test_distinct_types_may_coexist_between_a_pair() {
    let graph = graph().await;
    let a = admit(&graph, "Albert", "1900-05-01").await;
    let b = admit(&graph, "Elsa", "1896-01-18").await;

    graph.relations().assert_relation(&a, &b, "spouse").await.unwrap();
    graph.relations().assert_relation(&a, &b, "cousin").await.unwrap();

    assert_eq!(edge_count(&graph).await, 4);
    assert_eq!(
        graph.relations().relation_between(&a, &b).await.unwrap(),
        vec![RelationType::Spouse, RelationType::Cousin],
    );
}

// ============================================================================
// 2. Guards
// ============================================================================

#[tokio::test]
async fn test_invalid_relation_type_creates_nothing() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;

    let err = graph.relations().assert_relation(&bob, &alice, "unknown").await.unwrap_err();
    assert!(matches!(err, Error::InvalidRelationType(_)));
    assert_eq!(edge_count(&graph).await, 0);
}

#[tokio::test]
async fn test_self_relation_rejected() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;

    let err = graph.relations().assert_relation(&alice, &alice, "sibling").await.unwrap_err();
    assert!(matches!(err, Error::SelfRelation(_)));
    assert_eq!(edge_count(&graph).await, 0);
}

#[tokio::test]
async fn test_unknown_person_rejected() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let ghost = PersonKey::parse("Ghost", "1900-01-01").unwrap();

    let err = graph.relations().assert_relation(&alice, &ghost, "sibling").await.unwrap_err();
    assert!(matches!(err, Error::UnknownPerson(_)));
    let err = graph.relations().assert_relation(&ghost, &alice, "sibling").await.unwrap_err();
    assert!(matches!(err, Error::UnknownPerson(_)));
    assert_eq!(edge_count(&graph).await, 0);
}

#[tokio::test]
async fn test_duplicate_assertion_rejected() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;

    graph.relations().assert_relation(&bob, &alice, "parent").await.unwrap();
    let err = graph.relations().assert_relation(&bob, &alice, "parent").await.unwrap_err();
    assert!(matches!(err, Error::DuplicateRelation(_)));

    // still exactly one pair
    assert_eq!(edge_count(&graph).await, 2);
    let of_bob = graph.relations().relations_of(&bob).await.unwrap();
    assert_eq!(of_bob[&RelationType::Parent].len(), 1);
}

#[tokio::test]
async fn test_symmetric_duplicate_caught_from_either_side() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let carol = admit(&graph, "Carol", "1992-07-20").await;

    graph.relations().assert_relation(&alice, &carol, "spouse").await.unwrap();
    // the reciprocal edge already says carol -[spouse]-> alice
    let err = graph.relations().assert_relation(&carol, &alice, "spouse").await.unwrap_err();
    assert!(matches!(err, Error::DuplicateRelation(_)));
    assert_eq!(edge_count(&graph).await, 2);
}

#[tokio::test]
async fn test_racing_assertions_settle_to_one_winner() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let carol = admit(&graph, "Carol", "1992-07-20").await;

    let relations = graph.relations();
    let (r1, r2) = tokio::join!(
        relations.assert_relation(&alice, &carol, "spouse"),
        relations.assert_relation(&alice, &carol, "spouse"),
    );

    assert!(r1.is_ok() != r2.is_ok(), "exactly one assertion must win");
    let err = if r1.is_ok() { r2.unwrap_err() } else { r1.unwrap_err() };
    assert!(matches!(err, Error::DuplicateRelation(_)));
    assert_eq!(edge_count(&graph).await, 2);
}

// ============================================================================
// 3. Retraction
// ============================================================================

#[tokio::test]
async fn test_retract_removes_both_halves() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;

    graph.relations().assert_relation(&bob, &alice, "parent").await.unwrap();
    graph.relations().retract_relation(&bob, &alice, "parent").await.unwrap();

    assert_eq!(edge_count(&graph).await, 0);
    let err = graph.relations().relation_between(&bob, &alice).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_retract_missing_relation() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;

    let err = graph.relations().retract_relation(&bob, &alice, "parent").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // a different type than the recorded one is also a miss
    graph.relations().assert_relation(&bob, &alice, "parent").await.unwrap();
    let err = graph.relations().retract_relation(&bob, &alice, "sibling").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(edge_count(&graph).await, 2);
}

#[tokio::test]
async fn test_retract_validates_type_first() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;

    let err = graph.relations().retract_relation(&bob, &alice, "nemesis").await.unwrap_err();
    assert!(matches!(err, Error::InvalidRelationType(_)));
}

#[tokio::test]
async fn test_retract_only_touches_the_named_type() {
    let graph = graph().await;
    let a = admit(&graph, "Albert", "1900-05-01").await;
    let b = admit(&graph, "Elsa", "1896-01-18").await;

    graph.relations().assert_relation(&a, &b, "spouse").await.unwrap();
    graph.relations().assert_relation(&a, &b, "cousin").await.unwrap();
    graph.relations().retract_relation(&a, &b, "spouse").await.unwrap();

    assert_eq!(
        graph.relations().relation_between(&a, &b).await.unwrap(),
        vec![RelationType::Cousin],
    );
    assert_eq!(edge_count(&graph).await, 2);
}

// ============================================================================
// 4. Read paths
// ============================================================================

#[tokio::test]
async fn test_relations_of_groups_and_orders() {
    let graph = graph().await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;
    let zoe = admit(&graph, "Zoe", "1993-02-11").await;
    let alice_younger = admit(&graph, "Alice", "1990-01-01").await;
    let alice_elder = admit(&graph, "Alice", "1988-03-05").await;
    let carol = admit(&graph, "Carol", "1962-09-30").await;

    let relations = graph.relations();
    relations.assert_relation(&bob, &zoe, "parent").await.unwrap();
    relations.assert_relation(&bob, &alice_younger, "parent").await.unwrap();
    relations.assert_relation(&bob, &alice_elder, "parent").await.unwrap();
    relations.assert_relation(&bob, &carol, "spouse").await.unwrap();

    let of_bob = relations.relations_of(&bob).await.unwrap();
    assert_eq!(
        of_bob,
        BTreeMap::from([
            (RelationType::Parent, vec![alice_elder, alice_younger, zoe]),
            (RelationType::Spouse, vec![carol]),
        ]),
    );
}

#[tokio::test]
async fn test_relations_of_distinguishes_unknown_from_empty() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let ghost = PersonKey::parse("Ghost", "1900-01-01").unwrap();

    let err = graph.relations().relations_of(&ghost).await.unwrap_err();
    assert!(matches!(err, Error::UnknownPerson(_)));

    let err = graph.relations().relations_of(&alice).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_relation_between_unrelated_people() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;

    let err = graph.relations().relation_between(&alice, &bob).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_list_relations_orders_by_person() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;
    let carol = admit(&graph, "Carol", "1962-09-30").await;

    let relations = graph.relations();
    relations.assert_relation(&carol, &alice, "parent").await.unwrap();
    relations.assert_relation(&bob, &carol, "spouse").await.unwrap();

    let records = relations.list_relations().await.unwrap();
    // two logical relations, four directed facts
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].from, alice);
    assert_eq!(records[0].rel_type, RelationType::Child);
    assert_eq!(records[0].to, carol);
    assert_eq!(records[1].from, bob);
    assert_eq!(records[2].from, carol);
    assert_eq!(records[3].from, carol);

    let displayed = records[0].to_string();
    assert_eq!(displayed, "Alice (b. 1990-01-01) -[child]-> Carol (b. 1962-09-30)");
}
