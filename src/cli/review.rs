use anyhow::Result;

use crate::config::CortexConfig;
use crate::memory::review::{bulk_update_status, find_review_candidates, mark_for_review};
use crate::memory::types::MemoryStatus;

/// Flag stale fresh memories as needing review.
pub fn mark(config: &CortexConfig, days: Option<u32>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = crate::db::open_database(&db_path)?;

    let days = days.unwrap_or(config.activity.review_age_days);
    let flagged = mark_for_review(&mut conn, days)?;
    println!("Flagged {flagged} memories untouched for {days}+ days.");
    Ok(())
}

/// Show memories waiting for review.
pub fn pending(config: &CortexConfig, limit: u32) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let candidates = find_review_candidates(&conn, limit)?;
    if candidates.is_empty() {
        println!("Nothing waiting for review.");
        return Ok(());
    }
    for memory in &candidates {
        let preview: String = memory.content.chars().take(100).collect();
        println!("  {} (last accessed {})", memory.id, memory.last_accessed);
        println!("     {preview}");
    }
    Ok(())
}

/// Resolve a batch of reviewed memories to a new status.
pub fn resolve(config: &CortexConfig, ids: Vec<String>, status: MemoryStatus) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = crate::db::open_database(&db_path)?;

    let updated = bulk_update_status(&mut conn, &ids, status)?;
    println!("Updated {updated} of {} memories to {status}.", ids.len());
    Ok(())
}
