//! Session lifecycle.
//!
//! A session groups the activities and memories of one stretch of work on a
//! project. Starting a session reuses the current one when the marker file is
//! still warm; ending it freezes a summary into the `sessions` row exactly
//! once. For a session that is still open, [`get_session_summary`] computes a
//! live snapshot without persisting anything.

pub mod marker;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::activity::{query_activities, Activity, ActivityFilter};
use crate::memory::store::{memory_from_row, MEMORY_COLUMNS};
use crate::memory::types::Memory;
use marker::SessionMarker;

/// A session row. Aggregate fields are zero / empty until the session ends.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub project_path: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub summary: Option<String>,
    pub key_learnings: Option<String>,
    pub total_activities: u64,
    pub total_memories_created: u64,
    /// Tool name to invocation count.
    pub tools_used: HashMap<String, u64>,
    pub files_modified: Vec<String>,
    pub key_errors: Vec<String>,
}

/// Aggregates derived from the activity log and memory store.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub total_activities: u64,
    pub total_memories_created: u64,
    pub tools_used: HashMap<String, u64>,
    pub files_modified: Vec<String>,
    pub key_errors: Vec<String>,
    /// `false` while the session is open and the numbers are a live snapshot.
    pub frozen: bool,
}

/// Recent history for injecting into an agent's context.
#[derive(Debug, Serialize)]
pub struct SessionContext {
    pub session: Session,
    pub recent_activities: Vec<Activity>,
    pub memories_created: Vec<Memory>,
}

/// Start a session for `project_dir`, reusing the current one when the marker
/// is still within `timeout_secs` of its last activity. An explicit id (from
/// a caller that owns session identity) is honored: if that session is open
/// it is resumed directly, and a new row takes the given id. Returns the
/// session and whether it was resumed.
pub fn start_session(
    conn: &mut Connection,
    project_dir: &Path,
    explicit_id: Option<&str>,
    timeout_secs: i64,
) -> Result<(Session, bool)> {
    let project_path = project_dir.to_string_lossy().into_owned();

    if let Some(wanted) = explicit_id {
        if let Some(session) = get_session(conn, wanted)? {
            if session.ended_at.is_some() {
                bail!("session already ended, cannot reopen: {wanted}");
            }
            let mut marker = SessionMarker::new(wanted, &project_path);
            marker.touch();
            marker.save(project_dir)?;
            tracing::debug!(session_id = %wanted, "resumed session by id");
            return Ok((session, true));
        }
    } else if let Some(mut existing) = SessionMarker::load(project_dir)? {
        if !existing.is_expired(timeout_secs) {
            if let Some(session) = get_session(conn, &existing.session_id)? {
                if session.ended_at.is_none() {
                    existing.touch();
                    existing.save(project_dir)?;
                    tracing::debug!(session_id = %session.id, "resumed session");
                    return Ok((session, true));
                }
            }
        }
    }

    let id = match explicit_id {
        Some(wanted) => wanted.to_string(),
        None => format!("sess_{}", uuid::Uuid::now_v7()),
    };
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO sessions (id, project_path, started_at) VALUES (?1, ?2, ?3)",
        params![id, project_path, now],
    )
    .context("inserting session")?;

    SessionMarker::new(&id, &project_path).save(project_dir)?;
    tracing::info!(session_id = %id, project = %project_path, "session started");

    let session = get_session(conn, &id)?.context("session vanished after insert")?;
    Ok((session, false))
}

/// Refresh the marker's activity timestamp. No-op when there is no marker.
pub fn touch_session(project_dir: &Path) -> Result<()> {
    if let Some(mut existing) = SessionMarker::load(project_dir)? {
        existing.touch();
        existing.save(project_dir)?;
    }
    Ok(())
}

/// End a session, freezing its summary. Returns `Ok(None)` when the session
/// does not exist and an error when it was already ended.
pub fn end_session(
    conn: &mut Connection,
    session_id: &str,
    summary: Option<&str>,
    key_learnings: Option<&str>,
) -> Result<Option<Session>> {
    let Some(session) = get_session(conn, session_id)? else {
        return Ok(None);
    };
    if session.ended_at.is_some() {
        bail!("session already ended: {session_id}");
    }

    let stats = compute_summary(conn, session_id)?;
    let now = chrono::Utc::now().to_rfc3339();

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE sessions SET ended_at = ?1, summary = ?2, key_learnings = ?3,
                             total_activities = ?4, total_memories_created = ?5,
                             tools_used = ?6, files_modified = ?7, key_errors = ?8
         WHERE id = ?9",
        params![
            now,
            summary,
            key_learnings,
            stats.total_activities as i64,
            stats.total_memories_created as i64,
            serde_json::to_string(&stats.tools_used)?,
            serde_json::to_string(&stats.files_modified)?,
            serde_json::to_string(&stats.key_errors)?,
            session_id,
        ],
    )?;
    tx.commit()?;

    SessionMarker::clear_if_matches(Path::new(&session.project_path), session_id)?;
    tracing::info!(%session_id, activities = stats.total_activities, "session ended");

    get_session(conn, session_id)
}

/// Fetch one session by ID.
pub fn get_session(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
    conn.query_row(
        "SELECT id, project_path, started_at, ended_at, summary, key_learnings,
                total_activities, total_memories_created, tools_used, files_modified, key_errors
         FROM sessions WHERE id = ?1",
        params![session_id],
        session_from_row,
    )
    .optional()
    .context("fetching session")
}

/// Most recently started sessions, optionally scoped to one project.
pub fn get_recent_sessions(
    conn: &Connection,
    project_path: Option<&str>,
    limit: u32,
) -> Result<Vec<Session>> {
    let limit = if limit == 0 { 10 } else { limit };
    let base = "SELECT id, project_path, started_at, ended_at, summary, key_learnings,
                       total_activities, total_memories_created, tools_used, files_modified, key_errors
                FROM sessions";

    let sessions = match project_path {
        Some(project) => {
            let mut stmt = conn.prepare(&format!(
                "{base} WHERE project_path = ?1 ORDER BY started_at DESC LIMIT {limit}"
            ))?;
            let rows = stmt
                .query_map(params![project], session_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("{base} ORDER BY started_at DESC LIMIT {limit}"))?;
            let rows = stmt
                .query_map([], session_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(sessions)
}

/// Summary for a session: the frozen snapshot once ended, a live computation
/// while still open.
pub fn get_session_summary(conn: &Connection, session_id: &str) -> Result<Option<SessionSummary>> {
    let Some(session) = get_session(conn, session_id)? else {
        return Ok(None);
    };

    let summary = if session.ended_at.is_some() {
        SessionSummary {
            session_id: session.id,
            started_at: session.started_at,
            ended_at: session.ended_at,
            total_activities: session.total_activities,
            total_memories_created: session.total_memories_created,
            tools_used: session.tools_used,
            files_modified: session.files_modified,
            key_errors: session.key_errors,
            frozen: true,
        }
    } else {
        let stats = compute_summary(conn, session_id)?;
        SessionSummary {
            session_id: session.id,
            started_at: session.started_at,
            ended_at: None,
            total_activities: stats.total_activities,
            total_memories_created: stats.total_memories_created,
            tools_used: stats.tools_used,
            files_modified: stats.files_modified,
            key_errors: stats.key_errors,
            frozen: false,
        }
    };
    Ok(Some(summary))
}

/// Recent activities and memories for context injection at session start.
pub fn get_session_context(
    conn: &Connection,
    session_id: &str,
    activity_limit: u32,
) -> Result<Option<SessionContext>> {
    let Some(session) = get_session(conn, session_id)? else {
        return Ok(None);
    };

    let page = query_activities(
        conn,
        &ActivityFilter {
            session_id: Some(session_id.to_string()),
            limit: if activity_limit == 0 { 20 } else { activity_limit },
            ..Default::default()
        },
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {MEMORY_COLUMNS} FROM memories
         WHERE source_session_id = ?1 ORDER BY created_at DESC"
    ))?;
    let memories = stmt
        .query_map(params![session_id], memory_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(SessionContext {
        session,
        recent_activities: page.activities,
        memories_created: memories,
    }))
}

/// Continuity text for the start of a new session: the summaries (and
/// optionally learnings) of the most recently ended sessions, newest first.
/// Open sessions are skipped; they have nothing frozen to report.
pub fn get_context(
    conn: &Connection,
    project_path: Option<&str>,
    session_count: u32,
    include_learnings: bool,
) -> Result<String> {
    let session_count = if session_count == 0 { 3 } else { session_count };
    let ended: Vec<Session> = get_recent_sessions(conn, project_path, session_count * 4)?
        .into_iter()
        .filter(|s| s.ended_at.is_some())
        .take(session_count as usize)
        .collect();

    if ended.is_empty() {
        return Ok("No previous sessions recorded.".to_string());
    }

    let mut out = String::from("# Previous sessions\n");
    for session in &ended {
        out.push_str(&format!(
            "\n## {} ({} activities, {} memories)\n",
            &session.started_at[..session.started_at.len().min(10)],
            session.total_activities,
            session.total_memories_created,
        ));
        match &session.summary {
            Some(summary) => out.push_str(&format!("{summary}\n")),
            None => out.push_str("(no summary recorded)\n"),
        }
        if include_learnings {
            if let Some(learnings) = &session.key_learnings {
                out.push_str(&format!("Learnings: {learnings}\n"));
            }
        }
    }
    Ok(out)
}

struct ComputedStats {
    total_activities: u64,
    total_memories_created: u64,
    tools_used: HashMap<String, u64>,
    files_modified: Vec<String>,
    key_errors: Vec<String>,
}

fn compute_summary(conn: &Connection, session_id: &str) -> Result<ComputedStats> {
    let total_activities: u64 = conn.query_row(
        "SELECT COUNT(*) FROM activities WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;
    let total_memories_created: u64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE source_session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT tool_name, COUNT(*) FROM activities
         WHERE session_id = ?1 AND tool_name IS NOT NULL GROUP BY tool_name",
    )?;
    let tools_used: HashMap<String, u64> = stmt
        .query_map(params![session_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT DISTINCT file_path FROM activities
         WHERE session_id = ?1 AND file_path IS NOT NULL ORDER BY file_path",
    )?;
    let files_modified: Vec<String> = stmt
        .query_map(params![session_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT error_message FROM activities
         WHERE session_id = ?1 AND success = 0 AND error_message IS NOT NULL
         ORDER BY timestamp LIMIT 20",
    )?;
    let key_errors: Vec<String> = stmt
        .query_map(params![session_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ComputedStats {
        total_activities,
        total_memories_created,
        tools_used,
        files_modified,
        key_errors,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let tools_json: Option<String> = row.get(8)?;
    let files_json: Option<String> = row.get(9)?;
    let errors_json: Option<String> = row.get(10)?;
    Ok(Session {
        id: row.get(0)?,
        project_path: row.get(1)?,
        started_at: row.get(2)?,
        ended_at: row.get(3)?,
        summary: row.get(4)?,
        key_learnings: row.get(5)?,
        total_activities: row.get(6)?,
        total_memories_created: row.get(7)?,
        tools_used: tools_json
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        files_modified: files_json
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        key_errors: errors_json
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
    })
}
