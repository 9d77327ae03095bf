//! Persistence for embedding vectors.
//!
//! One vector per memory, upserted. The `memories.has_embedding` flag is kept
//! in lockstep with the `embeddings` table inside the same transaction, and
//! doubles as the work queue for [`backfill_embeddings`].

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::{vector_to_blob, EmbeddingProvider};

/// Result of a backfill run.
#[derive(Debug, Serialize)]
pub struct BackfillResult {
    /// Memories that received a vector in this run.
    pub embedded: usize,
    /// Memories still lacking a vector (0 unless the run was limited).
    pub remaining: u64,
}

/// Store (or replace) the vector for a memory and set its flag.
pub fn store_embedding(
    conn: &mut Connection,
    memory_id: &str,
    vector: &[f32],
    model_name: &str,
) -> Result<()> {
    let blob = vector_to_blob(vector);
    let now = chrono::Utc::now().to_rfc3339();
    let id = format!("emb_{}", uuid::Uuid::now_v7());

    let tx = conn.transaction()?;
    // memory_id is UNIQUE, so a re-embed replaces the old row
    tx.execute(
        "INSERT OR REPLACE INTO embeddings (id, memory_id, model_name, vector, dimensions, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, memory_id, model_name, blob, vector.len() as i64, now],
    )
    .with_context(|| format!("storing embedding for {memory_id}"))?;
    tx.execute(
        "UPDATE memories SET has_embedding = 1 WHERE id = ?1",
        params![memory_id],
    )?;
    tx.commit()?;
    Ok(())
}

/// Fetch the stored vector for a memory, if any.
pub fn get_embedding(conn: &Connection, memory_id: &str) -> Result<Option<Vec<f32>>> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT vector FROM embeddings WHERE memory_id = ?1",
            params![memory_id],
            |row| row.get(0),
        )
        .optional()?;
    blob.map(|b| super::blob_to_vector(&b)).transpose()
}

/// Drop a memory's vector and clear its flag. Returns `false` if there was
/// no vector to drop.
pub fn delete_embedding(conn: &mut Connection, memory_id: &str) -> Result<bool> {
    let tx = conn.transaction()?;
    let deleted = tx.execute(
        "DELETE FROM embeddings WHERE memory_id = ?1",
        params![memory_id],
    )?;
    tx.execute(
        "UPDATE memories SET has_embedding = 0 WHERE id = ?1",
        params![memory_id],
    )?;
    tx.commit()?;
    Ok(deleted > 0)
}

/// Embed every memory that does not have a vector yet, in batches.
///
/// `limit` of 0 means no cap. Resumable by construction: each stored vector
/// flips `has_embedding`, so an interrupted run picks up where it stopped.
pub fn backfill_embeddings(
    conn: &mut Connection,
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
    limit: usize,
) -> Result<BackfillResult> {
    let batch_size = batch_size.max(1);
    let mut embedded = 0usize;

    loop {
        if limit > 0 && embedded >= limit {
            break;
        }
        let take = if limit > 0 {
            batch_size.min(limit - embedded)
        } else {
            batch_size
        };

        let batch: Vec<(String, String, Option<String>)> = {
            let mut stmt = conn.prepare(
                "SELECT id, content, context FROM memories
                 WHERE has_embedding = 0 ORDER BY created_at LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![take as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        if batch.is_empty() {
            break;
        }

        let inputs: Vec<String> = batch
            .iter()
            .map(|(_, content, context)| embedding_input(content, context.as_deref()))
            .collect();
        let input_refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
        let vectors = provider
            .embed_batch(&input_refs)
            .context("batch embedding failed")?;

        for ((memory_id, _, _), vector) in batch.iter().zip(vectors.iter()) {
            store_embedding(conn, memory_id, vector, provider.model_name())?;
            embedded += 1;
        }
        tracing::info!(embedded, "backfill progress");
    }

    let remaining: u64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE has_embedding = 0",
        [],
        |row| row.get(0),
    )?;

    Ok(BackfillResult {
        embedded,
        remaining,
    })
}

/// The text a memory is embedded from: content plus its context, if present.
pub fn embedding_input(content: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) if !ctx.is_empty() => format!("{content}\n\nContext: {ctx}"),
        _ => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::embedding::EMBEDDING_DIM;
    use crate::memory::store::{create_memory, get_memory, CreateMemoryParams};

    struct SpikeProvider;

    impl EmbeddingProvider for SpikeProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; EMBEDDING_DIM];
            v[text.len() % EMBEDDING_DIM] = 1.0;
            Ok(v)
        }

        fn model_name(&self) -> &str {
            "spike"
        }
    }

    fn insert(conn: &mut Connection, content: &str) -> String {
        create_memory(
            conn,
            CreateMemoryParams {
                content: content.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn store_sets_flag_and_upserts() {
        let mut conn = open_memory_database().unwrap();
        let id = insert(&mut conn, "memory");

        store_embedding(&mut conn, &id, &[1.0, 2.0, 3.0], "spike").unwrap();
        assert!(get_memory(&conn, &id).unwrap().unwrap().has_embedding);
        assert_eq!(
            get_embedding(&conn, &id).unwrap().unwrap(),
            vec![1.0, 2.0, 3.0]
        );

        // Re-embedding replaces, never duplicates
        store_embedding(&mut conn, &id, &[9.0, 9.0], "spike-v2").unwrap();
        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM embeddings WHERE memory_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(get_embedding(&conn, &id).unwrap().unwrap(), vec![9.0, 9.0]);
    }

    #[test]
    fn delete_clears_flag() {
        let mut conn = open_memory_database().unwrap();
        let id = insert(&mut conn, "memory");
        store_embedding(&mut conn, &id, &[1.0], "spike").unwrap();

        assert!(delete_embedding(&mut conn, &id).unwrap());
        assert!(!get_memory(&conn, &id).unwrap().unwrap().has_embedding);
        assert!(get_embedding(&conn, &id).unwrap().is_none());
        assert!(!delete_embedding(&mut conn, &id).unwrap());
    }

    #[test]
    fn embedding_rows_die_with_their_memory() {
        let mut conn = open_memory_database().unwrap();
        let id = insert(&mut conn, "memory");
        store_embedding(&mut conn, &id, &[1.0], "spike").unwrap();

        crate::memory::store::delete_memory(&mut conn, &id).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn backfill_covers_all_unembedded() {
        let mut conn = open_memory_database().unwrap();
        for i in 0..5 {
            insert(&mut conn, &format!("memory number {i}"));
        }
        let pre_embedded = insert(&mut conn, "already embedded");
        store_embedding(&mut conn, &pre_embedded, &[1.0], "spike").unwrap();

        let result = backfill_embeddings(&mut conn, &SpikeProvider, 2, 0).unwrap();
        assert_eq!(result.embedded, 5);
        assert_eq!(result.remaining, 0);

        let flagged: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories WHERE has_embedding = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(flagged, 6);
    }

    #[test]
    fn backfill_honors_limit_and_is_resumable() {
        let mut conn = open_memory_database().unwrap();
        for i in 0..4 {
            insert(&mut conn, &format!("memory {i}"));
        }

        let first = backfill_embeddings(&mut conn, &SpikeProvider, 10, 3).unwrap();
        assert_eq!(first.embedded, 3);
        assert_eq!(first.remaining, 1);

        let second = backfill_embeddings(&mut conn, &SpikeProvider, 10, 0).unwrap();
        assert_eq!(second.embedded, 1);
        assert_eq!(second.remaining, 0);
    }

    #[test]
    fn embedding_input_appends_context() {
        assert_eq!(embedding_input("a", None), "a");
        assert_eq!(embedding_input("a", Some("")), "a");
        assert_eq!(embedding_input("a", Some("b")), "a\n\nContext: b");
    }
}
