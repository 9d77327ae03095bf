//! Append-only activity log.
//!
//! Every tool call, decision, and observation an agent makes can be recorded
//! here. Logging is best-effort by contract: [`log_activity`] never fails the
//! caller's work, it logs a warning and moves on. [`try_log_activity`] is the
//! strict variant underneath it.
//!
//! Activity rows are immutable once written. There is no update path.

pub mod redact;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// What kind of event an activity row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PreToolUse,
    PostToolUse,
    Decision,
    Observation,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreToolUse => "pre_tool_use",
            Self::PostToolUse => "post_tool_use",
            Self::Decision => "decision",
            Self::Observation => "observation",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre_tool_use" => Ok(Self::PreToolUse),
            "post_tool_use" => Ok(Self::PostToolUse),
            "decision" => Ok(Self::Decision),
            "observation" => Ok(Self::Observation),
            _ => Err(format!("unknown event type: {s}")),
        }
    }
}

/// A stored activity row. Payload columns hold sanitized JSON text.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: String,
    pub session_id: Option<String>,
    pub agent_id: String,
    pub timestamp: String,
    pub event_type: EventType,
    pub tool_name: Option<String>,
    pub tool_input: Option<String>,
    pub tool_output: Option<String>,
    pub duration_ms: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub project_path: Option<String>,
    pub file_path: Option<String>,
    pub summary: Option<String>,
    pub summary_detail: Option<String>,
}

/// Parameters for logging one activity.
#[derive(Debug, Clone)]
pub struct LogParams {
    pub event_type: EventType,
    pub session_id: Option<String>,
    /// Defaults to `"main"` when empty.
    pub agent_id: Option<String>,
    pub tool_name: Option<String>,
    /// Raw payloads; redacted and truncated before storage.
    pub tool_input: Option<serde_json::Value>,
    pub tool_output: Option<serde_json::Value>,
    pub duration_ms: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub project_path: Option<String>,
    pub file_path: Option<String>,
    pub summary: Option<String>,
    pub summary_detail: Option<String>,
}

impl LogParams {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            session_id: None,
            agent_id: None,
            tool_name: None,
            tool_input: None,
            tool_output: None,
            duration_ms: None,
            success: true,
            error_message: None,
            project_path: None,
            file_path: None,
            summary: None,
            summary_detail: None,
        }
    }
}

/// Filters for [`query_activities`].
#[derive(Debug, Default, Clone)]
pub struct ActivityFilter {
    pub session_id: Option<String>,
    pub agent_id: Option<String>,
    pub event_type: Option<EventType>,
    pub tool_name: Option<String>,
    pub success: Option<bool>,
    /// RFC 3339 bounds on `timestamp`, inclusive.
    pub since: Option<String>,
    pub until: Option<String>,
    pub project_path: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// A page of activities plus the total matching the filters.
#[derive(Debug)]
pub struct ActivityPage {
    pub activities: Vec<Activity>,
    pub total_count: u64,
}

/// Best-effort logging: failures are demoted to a warning so an audit problem
/// can never break the work being audited.
pub fn log_activity(conn: &mut Connection, params: LogParams) -> Option<Activity> {
    match try_log_activity(conn, params) {
        Ok(activity) => Some(activity),
        Err(err) => {
            tracing::warn!(error = %err, "failed to log activity");
            None
        }
    }
}

/// Strict logging path. Upserts the agent row first so the activity's foreign
/// key holds, then inserts the activity, all in one transaction.
pub fn try_log_activity(conn: &mut Connection, params_in: LogParams) -> Result<Activity> {
    let id = format!("act_{}", uuid::Uuid::now_v7());
    let now = chrono::Utc::now().to_rfc3339();
    let agent_id = params_in
        .agent_id
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "main".to_string());

    let tool_input = params_in.tool_input.as_ref().map(redact::sanitize_payload);
    let tool_output = params_in.tool_output.as_ref().map(redact::sanitize_payload);

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO agents (id, type, first_seen, last_seen, total_activities)
         VALUES (?1, 'main', ?2, ?2, 1)
         ON CONFLICT(id) DO UPDATE SET last_seen = ?2, total_activities = total_activities + 1",
        params![agent_id, now],
    )
    .context("upserting agent")?;

    tx.execute(
        "INSERT INTO activities (id, session_id, agent_id, timestamp, event_type, tool_name,
                                 tool_input, tool_output, duration_ms, success, error_message,
                                 project_path, file_path, summary, summary_detail)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            id,
            params_in.session_id,
            agent_id,
            now,
            params_in.event_type.as_str(),
            params_in.tool_name,
            tool_input,
            tool_output,
            params_in.duration_ms,
            params_in.success as i64,
            params_in.error_message,
            params_in.project_path,
            params_in.file_path,
            params_in.summary,
            params_in.summary_detail,
        ],
    )
    .context("inserting activity")?;
    tx.commit()?;

    Ok(Activity {
        id,
        session_id: params_in.session_id,
        agent_id,
        timestamp: now,
        event_type: params_in.event_type,
        tool_name: params_in.tool_name,
        tool_input,
        tool_output,
        duration_ms: params_in.duration_ms,
        success: params_in.success,
        error_message: params_in.error_message,
        project_path: params_in.project_path,
        file_path: params_in.file_path,
        summary: params_in.summary,
        summary_detail: params_in.summary_detail,
    })
}

/// Query the log newest-first. `total_count` covers all matches, not just the
/// returned page.
pub fn query_activities(conn: &Connection, filter: &ActivityFilter) -> Result<ActivityPage> {
    let mut conditions: Vec<String> = Vec::new();
    let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(session_id) = &filter.session_id {
        bound.push(Box::new(session_id.clone()));
        conditions.push(format!("session_id = ?{}", bound.len()));
    }
    if let Some(agent_id) = &filter.agent_id {
        bound.push(Box::new(agent_id.clone()));
        conditions.push(format!("agent_id = ?{}", bound.len()));
    }
    if let Some(event_type) = filter.event_type {
        bound.push(Box::new(event_type.as_str().to_string()));
        conditions.push(format!("event_type = ?{}", bound.len()));
    }
    if let Some(tool_name) = &filter.tool_name {
        bound.push(Box::new(tool_name.clone()));
        conditions.push(format!("tool_name = ?{}", bound.len()));
    }
    if let Some(success) = filter.success {
        bound.push(Box::new(success as i64));
        conditions.push(format!("success = ?{}", bound.len()));
    }
    if let Some(since) = &filter.since {
        bound.push(Box::new(since.clone()));
        conditions.push(format!("timestamp >= ?{}", bound.len()));
    }
    if let Some(until) = &filter.until {
        bound.push(Box::new(until.clone()));
        conditions.push(format!("timestamp <= ?{}", bound.len()));
    }
    if let Some(project) = &filter.project_path {
        bound.push(Box::new(project.clone()));
        conditions.push(format!("project_path = ?{}", bound.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let total_count: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM activities {where_clause}"),
        rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
        |row| row.get(0),
    )?;

    let limit = if filter.limit == 0 { 50 } else { filter.limit };
    let sql = format!(
        "SELECT id, session_id, agent_id, timestamp, event_type, tool_name, tool_input,
                tool_output, duration_ms, success, error_message, project_path, file_path,
                summary, summary_detail
         FROM activities {where_clause}
         ORDER BY timestamp DESC LIMIT {limit} OFFSET {}",
        filter.offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let activities = stmt
        .query_map(
            rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
            activity_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ActivityPage {
        activities,
        total_count,
    })
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    let event_str: String = row.get(4)?;
    let event_type = event_str.parse::<EventType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(Activity {
        id: row.get(0)?,
        session_id: row.get(1)?,
        agent_id: row.get(2)?,
        timestamp: row.get(3)?,
        event_type,
        tool_name: row.get(5)?,
        tool_input: row.get(6)?,
        tool_output: row.get(7)?,
        duration_ms: row.get(8)?,
        success: row.get::<_, i64>(9)? != 0,
        error_message: row.get(10)?,
        project_path: row.get(11)?,
        file_path: row.get(12)?,
        summary: row.get(13)?,
        summary_detail: row.get(14)?,
    })
}
