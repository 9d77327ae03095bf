use anyhow::Result;

use crate::config::CortexConfig;
use crate::memory::relations::{get_graph, get_relationships, link_memories, Direction};
use crate::memory::types::RelationshipType;

/// Create an edge between two memories.
pub fn link(
    config: &CortexConfig,
    source_id: &str,
    target_id: &str,
    relationship_type: RelationshipType,
    strength: Option<f64>,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let result = link_memories(&conn, source_id, target_id, relationship_type, strength)?;
    if result.deduplicated {
        println!("Edge already exists: {}", result.relationship.id);
    } else {
        println!(
            "Linked {} -[{}]-> {} ({})",
            source_id, relationship_type, target_id, result.relationship.id
        );
    }
    Ok(())
}

/// Show all edges touching a memory.
pub fn show(config: &CortexConfig, memory_id: &str) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let edges = get_relationships(&conn, memory_id, Direction::Both)?;
    if edges.is_empty() {
        println!("No relationships for {memory_id}.");
        return Ok(());
    }
    for edge in &edges {
        println!(
            "  {} -[{} {:.2}]-> {}",
            edge.source_id, edge.relationship_type, edge.strength, edge.target_id
        );
    }
    Ok(())
}

/// Print the neighborhood graph around a memory, or the whole graph, as JSON.
pub fn graph(config: &CortexConfig, center_id: Option<&str>, depth: u32) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let graph = get_graph(&conn, center_id, depth)?;
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}
