//! Store statistics and tag usage.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

/// Response from [`memory_stats`].
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_memories: u64,
    pub by_type: HashMap<String, u64>,
    pub by_status: HashMap<String, u64>,
    pub with_embeddings: u64,
    pub total_relationships: u64,
    pub total_activities: u64,
    pub total_sessions: u64,
    pub avg_importance: f64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
}

/// One tag with its usage count.
#[derive(Debug, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Compute store-wide statistics.
///
/// `db_path` feeds the file size field; pass `None` for in-memory databases.
pub fn memory_stats(conn: &Connection, db_path: Option<&Path>) -> Result<StatsResponse> {
    let total_memories: u64 =
        conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
    let with_embeddings: u64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE has_embedding = 1",
        [],
        |row| row.get(0),
    )?;
    let total_relationships: u64 = conn.query_row(
        "SELECT COUNT(*) FROM memory_relationships",
        [],
        |row| row.get(0),
    )?;
    let total_activities: u64 =
        conn.query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?;
    let total_sessions: u64 =
        conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
    let avg_importance: f64 = conn.query_row(
        "SELECT COALESCE(AVG(importance_score), 0) FROM memories",
        [],
        |row| row.get(0),
    )?;
    let (oldest_memory, newest_memory): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM memories",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let by_type = count_grouped(conn, "type")?;
    let by_status = count_grouped(conn, "status")?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsResponse {
        total_memories,
        by_type,
        by_status,
        with_embeddings,
        total_relationships,
        total_activities,
        total_sessions,
        avg_importance,
        db_size_bytes,
        oldest_memory,
        newest_memory,
    })
}

/// Every distinct tag across all memories with its usage count, most used
/// first, ties alphabetical.
pub fn list_tags(conn: &Connection) -> Result<Vec<TagCount>> {
    let mut stmt = conn.prepare("SELECT tags FROM memories")?;
    let tag_lists = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut counts: HashMap<String, u64> = HashMap::new();
    for tags_json in tag_lists {
        let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
        for tag in tags {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }

    let mut out: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    Ok(out)
}

fn count_grouped(conn: &Connection, column: &str) -> Result<HashMap<String, u64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT(*) FROM memories GROUP BY {column}"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::memory::store::{create_memory, CreateMemoryParams};
    use crate::memory::types::MemoryType;

    #[test]
    fn stats_reflect_contents() {
        let mut conn = open_memory_database().unwrap();
        create_memory(
            &mut conn,
            CreateMemoryParams {
                content: "a".into(),
                memory_type: Some(MemoryType::Tip),
                importance_score: Some(40.0),
                ..Default::default()
            },
        )
        .unwrap();
        create_memory(
            &mut conn,
            CreateMemoryParams {
                content: "b".into(),
                memory_type: Some(MemoryType::Tip),
                importance_score: Some(60.0),
                ..Default::default()
            },
        )
        .unwrap();

        let stats = memory_stats(&conn, None).unwrap();
        assert_eq!(stats.total_memories, 2);
        assert_eq!(stats.by_type.get("tip"), Some(&2));
        assert_eq!(stats.by_status.get("fresh"), Some(&2));
        assert_eq!(stats.with_embeddings, 0);
        assert_eq!(stats.avg_importance, 50.0);
        assert!(stats.oldest_memory.is_some());
    }

    #[test]
    fn empty_store_has_zeroed_stats() {
        let conn = open_memory_database().unwrap();
        let stats = memory_stats(&conn, None).unwrap();
        assert_eq!(stats.total_memories, 0);
        assert_eq!(stats.avg_importance, 0.0);
        assert!(stats.oldest_memory.is_none());
    }

    #[test]
    fn tags_are_counted_and_ordered() {
        let mut conn = open_memory_database().unwrap();
        for tags in [
            vec!["rust", "sqlite"],
            vec!["rust"],
            vec!["async"],
        ] {
            create_memory(
                &mut conn,
                CreateMemoryParams {
                    content: "x".into(),
                    tags: tags.into_iter().map(String::from).collect(),
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let tags = list_tags(&conn).unwrap();
        assert_eq!(tags[0].tag, "rust");
        assert_eq!(tags[0].count, 2);
        // Ties break alphabetically
        assert_eq!(tags[1].tag, "async");
        assert_eq!(tags[2].tag, "sqlite");
    }
}
