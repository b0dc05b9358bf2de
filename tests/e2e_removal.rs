//! End-to-end tests for cascading person removal: the person and every edge
//! incident to them vanish together, and nobody else's relation set keeps a
//! dangling reference.

use kindred::{Error, FamilyGraph, GraphStore, MemoryStore, PersonKey, TxMode};
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

#[tokio::test]
async fn test_remove_spouse_clears_both_sides() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let carol = admit(&graph, "Carol", "1992-07-20").await;

    graph.relations().assert_relation(&alice, &carol, "spouse").await.unwrap();
    graph.identity().remove("Alice", "1990-01-01").await.unwrap();

    let err = graph.relations().relation_between(&alice, &carol).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Carol still exists but her relation set no longer references Alice;
    // she simply has no relations recorded any more.
    let err = graph.relations().relations_of(&carol).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let all = graph.identity().list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].key, carol);
    assert_eq!(edge_count(&graph).await, 0);
}

#[tokio::test]
async fn test_remove_hub_person_leaves_no_edges_behind() {
    let graph = graph().await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let carol = admit(&graph, "Carol", "1962-09-30").await;
    let dave = admit(&graph, "Dave", "1958-12-24").await;

    let relations = graph.relations();
    relations.assert_relation(&bob, &alice, "parent").await.unwrap();
    relations.assert_relation(&bob, &carol, "spouse").await.unwrap();
    relations.assert_relation(&bob, &dave, "sibling").await.unwrap();
    assert_eq!(edge_count(&graph).await, 6);

    graph.identity().remove("Bob", "1960-01-01").await.unwrap();

    assert_eq!(edge_count(&graph).await, 0);
    assert!(relations.list_relations().await.unwrap().is_empty());
    for survivor in [&alice, &carol, &dave] {
        let err = relations.relations_of(survivor).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
    assert_eq!(graph.identity().list_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_remove_keeps_unrelated_edges() {
    let graph = graph().await;
    let bob = admit(&graph, "Bob", "1960-01-01").await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let carol = admit(&graph, "Carol", "1962-09-30").await;

    let relations = graph.relations();
    relations.assert_relation(&bob, &alice, "parent").await.unwrap();
    relations.assert_relation(&carol, &alice, "parent").await.unwrap();

    graph.identity().remove("Bob", "1960-01-01").await.unwrap();

    // Carol's parenthood of Alice is untouched
    assert_eq!(edge_count(&graph).await, 2);
    let of_alice = relations.relations_of(&alice).await.unwrap();
    assert_eq!(of_alice.len(), 1);
    assert_eq!(of_alice[&kindred::RelationType::Child], vec![carol]);
}

#[tokio::test]
async fn test_readmitted_identity_starts_with_no_relations() {
    let graph = graph().await;
    let alice = admit(&graph, "Alice", "1990-01-01").await;
    let carol = admit(&graph, "Carol", "1992-07-20").await;

    graph.relations().assert_relation(&alice, &carol, "sibling").await.unwrap();
    graph.identity().remove("Alice", "1990-01-01").await.unwrap();

    let alice_again = admit(&graph, "Alice", "1990-01-01").await;
    assert_eq!(alice_again, alice);
    let err = graph.relations().relations_of(&alice_again).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
