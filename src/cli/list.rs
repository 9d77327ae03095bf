use anyhow::Result;

use crate::config::CortexConfig;
use crate::memory::store::{list_memories, ListOptions};
use crate::memory::types::{MemoryStatus, MemoryType};

/// List memories with filters and pagination.
pub fn list(
    config: &CortexConfig,
    memory_type: Option<MemoryType>,
    status: Option<MemoryStatus>,
    tag: Option<String>,
    sort_by: Option<String>,
    limit: u32,
    offset: u32,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let result = list_memories(
        &conn,
        &ListOptions {
            memory_type,
            status,
            tag,
            project_path: None,
            sort_by,
            ascending: false,
            limit,
            offset,
        },
    )?;

    if result.memories.is_empty() {
        println!("No memories match.");
        return Ok(());
    }

    println!(
        "Showing {} of {} memories\n",
        result.memories.len(),
        result.total_count
    );
    for memory in &result.memories {
        let preview: String = memory.content.chars().take(100).collect();
        println!(
            "  {} [{}/{}] imp {:.0}, accessed {}x",
            memory.id, memory.memory_type, memory.status, memory.importance_score, memory.access_count
        );
        println!("     {preview}");
    }
    Ok(())
}
