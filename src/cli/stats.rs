use anyhow::Result;

use crate::config::CortexConfig;
use crate::memory::stats::{list_tags, memory_stats};

/// Print store statistics as JSON.
pub fn stats(config: &CortexConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let response = memory_stats(&conn, Some(&db_path))?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Print every tag with its usage count, most used first.
pub fn tags(config: &CortexConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let tags = list_tags(&conn)?;
    if tags.is_empty() {
        println!("No tags in use.");
        return Ok(());
    }
    for entry in &tags {
        println!("  {:>5}  {}", entry.count, entry.tag);
    }
    Ok(())
}
