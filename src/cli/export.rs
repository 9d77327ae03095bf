use anyhow::Result;
use serde::Serialize;

use crate::config::CortexConfig;
use crate::memory::relations::all_relationships;
use crate::memory::store::{memory_from_row, MEMORY_COLUMNS};
use crate::memory::types::{Memory, MemoryRelationship};

/// Export format — all memories plus the relationship graph.
#[derive(Debug, Serialize)]
struct ExportData {
    memories: Vec<Memory>,
    relationships: Vec<MemoryRelationship>,
}

/// Export the memory store as JSON to stdout.
pub fn export(config: &CortexConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {MEMORY_COLUMNS} FROM memories ORDER BY created_at"
    ))?;
    let memories: Vec<Memory> = stmt
        .query_map([], memory_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let relationships: Vec<MemoryRelationship> = all_relationships(&conn)?;

    let data = ExportData {
        memories,
        relationships,
    };

    println!("{}", serde_json::to_string_pretty(&data)?);
    eprintln!(
        "Exported {} memories and {} relationships.",
        data.memories.len(),
        data.relationships.len()
    );
    Ok(())
}
