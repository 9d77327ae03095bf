mod helpers;

use cortex::memory::review::{bulk_update_status, find_review_candidates, mark_for_review};
use cortex::memory::stats::{list_tags, memory_stats};
use cortex::memory::store::{
    create_memory, get_memory, list_memories, update_memory, CreateMemoryParams, ListOptions,
    TagUpdate, UpdateMemoryParams,
};
use cortex::memory::types::{MemoryStatus, MemoryType};
use helpers::{insert_memory, insert_memory_full, test_db};

#[test]
fn full_memory_lifecycle() {
    let mut conn = test_db();

    let created = create_memory(
        &mut conn,
        CreateMemoryParams {
            content: "Use connection pooling for the API service".into(),
            context: Some("came up during the latency incident".into()),
            importance_score: Some(70.0),
            tags: vec!["api".into(), "performance".into()],
            ..Default::default()
        },
    )
    .unwrap();
    assert!(created.id.starts_with("mem_"));
    assert_eq!(created.status, MemoryStatus::Fresh);

    let updated = update_memory(
        &mut conn,
        &created.id,
        UpdateMemoryParams {
            importance_score: Some(90.0),
            tags: Some(TagUpdate::Add(vec!["incident".into(), "api".into()])),
            ..Default::default()
        },
    )
    .unwrap()
    .unwrap();
    assert_eq!(updated.importance_score, 90.0);
    assert_eq!(updated.tags, vec!["api", "performance", "incident"]);

    // Soft delete keeps the row but hides it from default listings
    update_memory(
        &mut conn,
        &created.id,
        UpdateMemoryParams {
            status: Some(MemoryStatus::Archived),
            ..Default::default()
        },
    )
    .unwrap()
    .unwrap();
    assert!(get_memory(&conn, &created.id).unwrap().is_some());

    let archived = list_memories(
        &conn,
        &ListOptions {
            status: Some(MemoryStatus::Archived),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(archived.total_count, 1);

    cortex::memory::store::delete_memory(&mut conn, &created.id).unwrap();
    assert!(get_memory(&conn, &created.id).unwrap().is_none());
}

#[test]
fn listing_pages_and_filters_by_type() {
    let mut conn = test_db();
    for i in 0..7 {
        insert_memory(&mut conn, &format!("general note {i}"), &[]);
    }
    insert_memory_full(
        &mut conn,
        "always pin dependency versions",
        Some(MemoryType::Tip),
        60.0,
        None,
    );

    let page = list_memories(
        &conn,
        &ListOptions {
            limit: 3,
            offset: 6,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(page.memories.len(), 2);
    assert_eq!(page.total_count, 8);

    let tips = list_memories(
        &conn,
        &ListOptions {
            memory_type: Some(MemoryType::Tip),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(tips.total_count, 1);
    assert!(tips.memories[0].content.contains("pin dependency"));
}

#[test]
fn review_workflow_marks_and_resolves() {
    let mut conn = test_db();
    let stale = insert_memory(&mut conn, "old build instructions", &[]);
    insert_memory(&mut conn, "current build instructions", &[]);

    // Age one memory past the review cutoff
    let old = (chrono::Utc::now() - chrono::Duration::days(120)).to_rfc3339();
    conn.execute(
        "UPDATE memories SET last_accessed = ?1 WHERE id = ?2",
        rusqlite::params![old, stale.id],
    )
    .unwrap();

    let marked = mark_for_review(&mut conn, 90).unwrap();
    assert_eq!(marked, 1);

    let candidates = find_review_candidates(&conn, 0).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, stale.id);
    assert_eq!(candidates[0].status, MemoryStatus::NeedsReview);

    let resolved = bulk_update_status(
        &mut conn,
        &[stale.id.clone(), "mem_not_there".into()],
        MemoryStatus::Outdated,
    )
    .unwrap();
    assert_eq!(resolved, 1);
    assert!(find_review_candidates(&conn, 0).unwrap().is_empty());
}

#[test]
fn stats_and_tags_reflect_contents() {
    let mut conn = test_db();
    insert_memory(&mut conn, "first", &["rust", "db"]);
    insert_memory(&mut conn, "second", &["rust"]);
    insert_memory_full(&mut conn, "WARNING: flag day ahead", Some(MemoryType::Warning), 80.0, None);

    let stats = memory_stats(&conn, None).unwrap();
    assert_eq!(stats.total_memories, 3);
    assert_eq!(stats.by_type.get("warning"), Some(&1));
    assert_eq!(stats.by_type.get("general"), Some(&2));
    assert_eq!(stats.with_embeddings, 0);

    let tags = list_tags(&conn).unwrap();
    assert_eq!(tags[0].tag, "rust");
    assert_eq!(tags[0].count, 2);
    assert_eq!(tags[1].tag, "db");
}
