//! Freshness review workflow.
//!
//! Memories go stale. [`mark_for_review`] flags fresh memories that have not
//! been touched in a while, [`find_review_candidates`] lists what is waiting,
//! and [`bulk_update_status`] resolves a batch in one transaction.

use anyhow::{bail, Result};
use rusqlite::{params, Connection};

use crate::memory::store::{memory_from_row, MEMORY_COLUMNS};
use crate::memory::types::{Memory, MemoryStatus};

/// Flag fresh memories whose `last_accessed` is older than `days` as
/// `needs_review`. Returns how many were flagged.
pub fn mark_for_review(conn: &mut Connection, days: u32) -> Result<usize> {
    if days == 0 {
        bail!("review age must be at least one day");
    }
    let cutoff = (chrono::Utc::now() - chrono::Duration::days(days as i64)).to_rfc3339();

    let tx = conn.transaction()?;
    let flagged = tx.execute(
        "UPDATE memories SET status = 'needs_review'
         WHERE status = 'fresh' AND last_accessed < ?1",
        params![cutoff],
    )?;
    tx.commit()?;

    if flagged > 0 {
        tracing::info!(flagged, days, "memories flagged for review");
    }
    Ok(flagged)
}

/// Memories currently waiting for review, oldest access first.
pub fn find_review_candidates(conn: &Connection, limit: u32) -> Result<Vec<Memory>> {
    let limit = if limit == 0 { 50 } else { limit };
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEMORY_COLUMNS} FROM memories
         WHERE status = 'needs_review'
         ORDER BY last_accessed ASC LIMIT {limit}"
    ))?;
    let memories = stmt
        .query_map([], memory_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(memories)
}

/// Set the status of every listed memory in one transaction. IDs that do not
/// exist are counted as skipped rather than failing the batch.
pub fn bulk_update_status(
    conn: &mut Connection,
    ids: &[String],
    status: MemoryStatus,
) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut updated = 0;
    {
        let mut stmt = tx.prepare("UPDATE memories SET status = ?1 WHERE id = ?2")?;
        for id in ids {
            updated += stmt.execute(params![status.as_str(), id])?;
        }
    }
    tx.commit()?;

    tracing::debug!(updated, skipped = ids.len() - updated, status = %status, "bulk status update");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::memory::store::{create_memory, get_memory, CreateMemoryParams};

    fn insert_aged(conn: &mut Connection, content: &str, days_old: i64) -> String {
        let id = create_memory(
            conn,
            CreateMemoryParams {
                content: content.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .id;
        let stamp = (chrono::Utc::now() - chrono::Duration::days(days_old)).to_rfc3339();
        conn.execute(
            "UPDATE memories SET last_accessed = ?1 WHERE id = ?2",
            params![stamp, id],
        )
        .unwrap();
        id
    }

    #[test]
    fn mark_flags_only_stale_fresh_memories() {
        let mut conn = open_memory_database().unwrap();
        let stale = insert_aged(&mut conn, "stale", 120);
        let recent = insert_aged(&mut conn, "recent", 3);
        let archived = insert_aged(&mut conn, "archived", 120);
        conn.execute(
            "UPDATE memories SET status = 'archived' WHERE id = ?1",
            params![archived],
        )
        .unwrap();

        let flagged = mark_for_review(&mut conn, 90).unwrap();
        assert_eq!(flagged, 1);

        assert_eq!(
            get_memory(&conn, &stale).unwrap().unwrap().status,
            MemoryStatus::NeedsReview
        );
        assert_eq!(
            get_memory(&conn, &recent).unwrap().unwrap().status,
            MemoryStatus::Fresh
        );
        assert_eq!(
            get_memory(&conn, &archived).unwrap().unwrap().status,
            MemoryStatus::Archived
        );
    }

    #[test]
    fn mark_rejects_zero_days() {
        let mut conn = open_memory_database().unwrap();
        assert!(mark_for_review(&mut conn, 0).is_err());
    }

    #[test]
    fn candidates_are_oldest_first() {
        let mut conn = open_memory_database().unwrap();
        insert_aged(&mut conn, "older", 200);
        insert_aged(&mut conn, "newer", 100);
        mark_for_review(&mut conn, 90).unwrap();

        let candidates = find_review_candidates(&conn, 10).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].content, "older");
    }

    #[test]
    fn bulk_update_skips_missing_ids() {
        let mut conn = open_memory_database().unwrap();
        let a = insert_aged(&mut conn, "a", 120);
        let b = insert_aged(&mut conn, "b", 120);
        mark_for_review(&mut conn, 90).unwrap();

        let updated = bulk_update_status(
            &mut conn,
            &[a.clone(), b.clone(), "mem_missing".to_string()],
            MemoryStatus::Outdated,
        )
        .unwrap();
        assert_eq!(updated, 2);
        assert_eq!(
            get_memory(&conn, &a).unwrap().unwrap().status,
            MemoryStatus::Outdated
        );
    }
}
