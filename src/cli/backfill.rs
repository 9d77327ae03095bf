//! CLI `backfill` command — embed every memory that lacks a vector.

use anyhow::{Context, Result};

use crate::config::CortexConfig;
use crate::embedding::store::backfill_embeddings;

const BATCH_SIZE: usize = 32;

/// Embed all memories with `has_embedding = 0`. Resumable: interrupting and
/// rerunning picks up where it left off.
pub async fn backfill(config: &CortexConfig, limit: usize) -> Result<()> {
    let db_path = config.resolved_db_path();

    let provider = crate::embedding::create_provider(&config.embedding)
        .context("embedding provider required for backfill")?;

    // Inference is CPU-bound; keep it off the async runtime.
    let config_model = config.embedding.model.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut conn = crate::db::open_database(&db_path)?;
        backfill_embeddings(&mut conn, provider.as_ref(), BATCH_SIZE, limit)
    })
    .await??;

    println!(
        "Embedded {} memories with '{config_model}' ({} remaining).",
        result.embedded, result.remaining
    );
    Ok(())
}
