mod helpers;

use cortex::embedding::store::{backfill_embeddings, store_embedding};
use cortex::embedding::EmbeddingProvider;
use cortex::memory::relations::{get_graph, link_memories};
use cortex::memory::search::{search, SearchMode, SearchRequest};
use cortex::memory::store::{
    delete_memory, get_memory, update_memory, TagUpdate, UpdateMemoryParams,
};
use cortex::memory::types::RelationshipType;
use helpers::{insert_memory, insert_memory_full, test_db, TopicProvider};

// One memory from capture through retrieval, relinking, and removal.
#[test]
fn remember_recall_link_forget() {
    let mut conn = test_db();
    let provider = TopicProvider;

    let fix = insert_memory_full(
        &mut conn,
        "Fix timeout by increasing the sqlite busy handler budget",
        None,
        80.0,
        None,
    );
    insert_memory(&mut conn, "unrelated note about standup times", &[]);

    // Keyword recall finds it first
    let results = search(
        &conn,
        None,
        &SearchRequest::new("timeout busy handler", SearchMode::Keyword),
    )
    .unwrap();
    assert_eq!(results[0].memory.id, fix.id);

    // Tag it, then confirm the tag took
    update_memory(
        &mut conn,
        &fix.id,
        UpdateMemoryParams {
            tags: Some(TagUpdate::Add(vec!["sqlite".into()])),
            ..Default::default()
        },
    )
    .unwrap()
    .unwrap();
    assert_eq!(get_memory(&conn, &fix.id).unwrap().unwrap().tags, vec!["sqlite"]);

    // Wire it into the graph and give it a vector
    let context = insert_memory(&mut conn, "sqlite lock contention background", &["sqlite"]);
    link_memories(&conn, &fix.id, &context.id, RelationshipType::DerivedFrom, None).unwrap();
    let v = provider.embed("sqlite").unwrap();
    store_embedding(&mut conn, &fix.id, &v, "topic-test").unwrap();

    let graph = get_graph(&conn, Some(&fix.id), 2).unwrap();
    assert_eq!(graph.nodes.len(), 2);

    // Forgetting it removes the row, its vector, and its edges in one go
    assert!(delete_memory(&mut conn, &fix.id).unwrap());
    let (edges, vectors): (i64, i64) = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM memory_relationships),
                    (SELECT COUNT(*) FROM embeddings)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(edges, 0);
    assert_eq!(vectors, 0);

    for mode in [SearchMode::Keyword, SearchMode::Hybrid] {
        let gone = search(&conn, None, &SearchRequest::new("busy handler", mode)).unwrap();
        assert!(gone.is_empty());
    }
}

// A store captured without vectors gets them all through one backfill pass,
// after which semantic recall works.
#[test]
fn backfill_enables_semantic_recall() {
    let mut conn = test_db();
    let provider = TopicProvider;

    let target = insert_memory(&mut conn, "journal checkpointing notes for sqlite", &[]);
    insert_memory(&mut conn, "tokio task budget notes", &[]);
    insert_memory(&mut conn, "deploy runbook pointers", &[]);

    let result = backfill_embeddings(&mut conn, &provider, 2, 0).unwrap();
    assert_eq!(result.embedded, 3);
    assert_eq!(result.remaining, 0);

    let results = search(
        &conn,
        Some(&provider),
        &SearchRequest::new("sqlite", SearchMode::Semantic),
    )
    .unwrap();
    assert_eq!(results[0].memory.id, target.id);
}
