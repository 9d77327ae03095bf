use anyhow::Result;

use crate::config::CortexConfig;
use crate::embedding::store::{embedding_input, store_embedding};
use crate::memory::store::{create_memory, CreateMemoryParams};
use crate::memory::types::MemoryType;

/// Store a new memory, embedding it right away when the model is available.
#[allow(clippy::too_many_arguments)]
pub fn remember(
    config: &CortexConfig,
    content: &str,
    context: Option<&str>,
    memory_type: Option<MemoryType>,
    tags: Vec<String>,
    importance: Option<f64>,
    session_id: Option<&str>,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = crate::db::open_database(&db_path)?;

    let project_path = config
        .resolved_project_dir()
        .ok()
        .map(|p| p.to_string_lossy().into_owned());

    let memory = create_memory(
        &mut conn,
        CreateMemoryParams {
            content: content.to_string(),
            context: context.map(String::from),
            memory_type,
            tags,
            importance_score: importance,
            source_session_id: session_id.map(String::from),
            project_path,
        },
    )?;

    let mut embedded = false;
    if let Some(provider) = super::optional_provider(config) {
        let input = embedding_input(&memory.content, memory.context.as_deref());
        match provider.embed(&input) {
            Ok(vector) => {
                store_embedding(&mut conn, &memory.id, &vector, provider.model_name())?;
                embedded = true;
            }
            Err(err) => tracing::warn!(error = %err, "skipping embedding for new memory"),
        }
    }

    println!(
        "Stored {} [{}] (importance {:.0}{})",
        memory.id,
        memory.memory_type,
        memory.importance_score,
        if embedded { ", embedded" } else { "" }
    );
    Ok(())
}
