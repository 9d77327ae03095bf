#![allow(dead_code)]

use cortex::db;
use cortex::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use cortex::memory::store::{create_memory, CreateMemoryParams};
use cortex::memory::types::{Memory, MemoryType};
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::migrations::migrate(&mut conn).unwrap();
    conn
}

/// Generate a deterministic 384-dim embedding with a spike at position `seed`.
/// Each seed produces a distinct, orthogonal vector.
pub fn test_embedding(seed: u8) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed as usize % EMBEDDING_DIM] = 1.0;
    v
}

/// Insert a memory with the given content and tags. Returns the full record.
pub fn insert_memory(conn: &mut Connection, content: &str, tags: &[&str]) -> Memory {
    create_memory(
        conn,
        CreateMemoryParams {
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        },
    )
    .unwrap()
}

/// Insert a memory with full control over type, importance, and session.
pub fn insert_memory_full(
    conn: &mut Connection,
    content: &str,
    memory_type: Option<MemoryType>,
    importance: f64,
    session_id: Option<&str>,
) -> Memory {
    create_memory(
        conn,
        CreateMemoryParams {
            content: content.to_string(),
            memory_type,
            importance_score: Some(importance),
            source_session_id: session_id.map(String::from),
            ..Default::default()
        },
    )
    .unwrap()
}

/// Deterministic embedding provider keyed on topic words. Texts sharing a
/// topic embed to the same axis and are maximally similar.
pub struct TopicProvider;

impl TopicProvider {
    const TOPICS: &'static [&'static str] = &["sqlite", "tokio", "network", "deploy"];
}

impl EmbeddingProvider for TopicProvider {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let axis = Self::TOPICS
            .iter()
            .position(|topic| lower.contains(topic))
            .unwrap_or(Self::TOPICS.len());
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        v[axis] = 1.0;
        Ok(v)
    }

    fn model_name(&self) -> &str {
        "topic-test"
    }
}
