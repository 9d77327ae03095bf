use anyhow::Result;

use crate::config::CortexConfig;
use crate::memory::search::{search, SearchFilter, SearchMode, SearchRequest};
use crate::memory::types::MemoryType;

/// Search memories from the terminal.
pub fn recall(
    config: &CortexConfig,
    query: &str,
    mode: SearchMode,
    memory_type: Option<MemoryType>,
    tags: Vec<String>,
    min_importance: Option<f64>,
    include_archived: bool,
    limit: Option<u32>,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;
    let provider = super::optional_provider(config);

    let request = SearchRequest {
        query: query.to_string(),
        mode,
        filter: SearchFilter {
            memory_type,
            tags,
            min_importance,
            include_archived,
            project_path: None,
        },
        weights: config.search.weights(),
        limit: limit.unwrap_or(config.search.default_limit),
    };

    let results = search(&conn, provider.as_deref(), &request)?;
    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());
    for (i, result) in results.iter().enumerate() {
        let preview: String = result.memory.content.chars().take(120).collect();
        let ellipsis = if result.memory.content.chars().count() > 120 {
            "..."
        } else {
            ""
        };
        println!(
            "  {}. [{}] {} (score: {:.4}, importance: {:.0})",
            i + 1,
            result.memory.memory_type,
            result.memory.id,
            result.score,
            result.memory.importance_score,
        );
        println!("     {preview}{ellipsis}");
        if !result.memory.tags.is_empty() {
            println!("     tags: {}", result.memory.tags.join(", "));
        }
        println!();
    }

    Ok(())
}
