//! Memory write path — creation, retrieval, update, deletion, and listing.
//!
//! [`create_memory`] is the single entry point for new records. It validates
//! inputs, auto-categorizes untyped content, and inserts inside a transaction.
//! The FTS5 index stays in sync through the schema triggers, so no code here
//! touches `memories_fts` directly.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::memory::types::{Memory, MemoryStatus, MemoryType};

/// Column list shared by every memory SELECT, in [`memory_from_row`] order.
pub(crate) const MEMORY_COLUMNS: &str = "id, content, context, type, status, importance_score, \
     tags, access_count, created_at, last_accessed, has_embedding, source_session_id, project_path";

/// Parameters for [`create_memory`]. Everything except `content` is optional.
#[derive(Debug, Default, Clone)]
pub struct CreateMemoryParams {
    pub content: String,
    pub context: Option<String>,
    /// Explicit category. `None` auto-categorizes from content.
    pub memory_type: Option<MemoryType>,
    pub tags: Vec<String>,
    /// Importance in `[1.0, 100.0]`. `None` defaults to 50.
    pub importance_score: Option<f64>,
    pub source_session_id: Option<String>,
    pub project_path: Option<String>,
}

/// How to change a memory's tag set in [`update_memory`].
#[derive(Debug, Clone)]
pub enum TagUpdate {
    /// Discard the old set entirely.
    Replace(Vec<String>),
    /// Union with the old set, preserving order, skipping duplicates.
    Add(Vec<String>),
    /// Remove any of the named tags; unknown names are ignored.
    Remove(Vec<String>),
}

/// Partial update for [`update_memory`]. `None` fields are left unchanged.
#[derive(Debug, Default, Clone)]
pub struct UpdateMemoryParams {
    pub content: Option<String>,
    pub context: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub status: Option<MemoryStatus>,
    pub importance_score: Option<f64>,
    pub tags: Option<TagUpdate>,
}

/// Filters and ordering for [`list_memories`].
#[derive(Debug, Default, Clone)]
pub struct ListOptions {
    pub memory_type: Option<MemoryType>,
    pub status: Option<MemoryStatus>,
    pub tag: Option<String>,
    pub project_path: Option<String>,
    /// Column to sort by; must be one of the allow-listed names.
    pub sort_by: Option<String>,
    pub ascending: bool,
    pub limit: u32,
    pub offset: u32,
}

/// A page of memories plus the total matching the filters regardless of page.
#[derive(Debug)]
pub struct ListResult {
    pub memories: Vec<Memory>,
    pub total_count: u64,
}

/// Columns `list_memories` accepts for ordering. Anything else is rejected
/// before it reaches SQL.
const SORT_COLUMNS: &[&str] = &[
    "created_at",
    "last_accessed",
    "importance_score",
    "access_count",
    "type",
    "status",
];

/// Create a new memory. Returns the full stored record.
pub fn create_memory(conn: &mut Connection, params_in: CreateMemoryParams) -> Result<Memory> {
    if params_in.content.trim().is_empty() {
        bail!("memory content must not be empty");
    }
    let importance = params_in.importance_score.unwrap_or(50.0);
    if !(1.0..=100.0).contains(&importance) {
        bail!("importance_score must be between 1 and 100, got {importance}");
    }

    let memory_type = params_in
        .memory_type
        .unwrap_or_else(|| categorize(&params_in.content));

    let id = format!("mem_{}", uuid::Uuid::now_v7());
    let now = chrono::Utc::now().to_rfc3339();
    let tags = dedup_tags(params_in.tags);
    let tags_json = serde_json::to_string(&tags)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO memories (id, content, context, type, status, importance_score, tags,
                               access_count, created_at, last_accessed, has_embedding,
                               source_session_id, project_path)
         VALUES (?1, ?2, ?3, ?4, 'fresh', ?5, ?6, 0, ?7, ?7, 0, ?8, ?9)",
        params![
            id,
            params_in.content,
            params_in.context,
            memory_type.as_str(),
            importance,
            tags_json,
            now,
            params_in.source_session_id,
            params_in.project_path,
        ],
    )
    .context("inserting memory")?;
    tx.commit()?;

    tracing::debug!(%id, memory_type = %memory_type, "memory created");

    Ok(Memory {
        id,
        content: params_in.content,
        context: params_in.context,
        memory_type,
        status: MemoryStatus::Fresh,
        importance_score: importance,
        tags,
        access_count: 0,
        created_at: now.clone(),
        last_accessed: now,
        has_embedding: false,
        source_session_id: params_in.source_session_id,
        project_path: params_in.project_path,
    })
}

/// Fetch one memory by ID. Does not touch access tracking.
pub fn get_memory(conn: &Connection, id: &str) -> Result<Option<Memory>> {
    conn.query_row(
        &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
        params![id],
        memory_from_row,
    )
    .optional()
    .context("fetching memory")
}

/// Apply a partial update. Returns the updated record, or `None` if no such
/// memory exists.
pub fn update_memory(
    conn: &mut Connection,
    id: &str,
    changes: UpdateMemoryParams,
) -> Result<Option<Memory>> {
    if let Some(importance) = changes.importance_score {
        if !(1.0..=100.0).contains(&importance) {
            bail!("importance_score must be between 1 and 100, got {importance}");
        }
    }

    let tx = conn.transaction()?;

    let Some(mut memory) = tx
        .query_row(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
            params![id],
            memory_from_row,
        )
        .optional()?
    else {
        return Ok(None);
    };

    if let Some(content) = changes.content {
        if content.trim().is_empty() {
            bail!("memory content must not be empty");
        }
        memory.content = content;
    }
    if let Some(context) = changes.context {
        memory.context = Some(context);
    }
    if let Some(memory_type) = changes.memory_type {
        memory.memory_type = memory_type;
    }
    if let Some(status) = changes.status {
        memory.status = status;
    }
    if let Some(importance) = changes.importance_score {
        memory.importance_score = importance;
    }
    match changes.tags {
        Some(TagUpdate::Replace(tags)) => memory.tags = dedup_tags(tags),
        Some(TagUpdate::Add(tags)) => {
            for tag in tags {
                if !memory.tags.contains(&tag) {
                    memory.tags.push(tag);
                }
            }
        }
        Some(TagUpdate::Remove(tags)) => memory.tags.retain(|t| !tags.contains(t)),
        None => {}
    }

    let tags_json = serde_json::to_string(&memory.tags)?;
    tx.execute(
        "UPDATE memories SET content = ?1, context = ?2, type = ?3, status = ?4,
                             importance_score = ?5, tags = ?6
         WHERE id = ?7",
        params![
            memory.content,
            memory.context,
            memory.memory_type.as_str(),
            memory.status.as_str(),
            memory.importance_score,
            tags_json,
            id,
        ],
    )
    .context("updating memory")?;
    tx.commit()?;

    Ok(Some(memory))
}

/// Hard-delete a memory. Embeddings and relationship edges go with it via
/// foreign key cascades. Returns `false` if no such memory existed.
pub fn delete_memory(conn: &mut Connection, id: &str) -> Result<bool> {
    let tx = conn.transaction()?;
    let deleted = tx.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
    tx.commit()?;

    if deleted > 0 {
        tracing::debug!(%id, "memory deleted");
    }
    Ok(deleted > 0)
}

/// List memories with filters, ordering, and pagination. `total_count` counts
/// every match, not just the returned page.
pub fn list_memories(conn: &Connection, opts: &ListOptions) -> Result<ListResult> {
    let sort_by = match &opts.sort_by {
        Some(column) => {
            if !SORT_COLUMNS.contains(&column.as_str()) {
                bail!("unsupported sort column: {column}");
            }
            column.as_str()
        }
        None => "created_at",
    };
    let direction = if opts.ascending { "ASC" } else { "DESC" };

    let mut conditions: Vec<String> = Vec::new();
    let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(memory_type) = opts.memory_type {
        bound.push(Box::new(memory_type.as_str().to_string()));
        conditions.push(format!("type = ?{}", bound.len()));
    }
    if let Some(status) = opts.status {
        bound.push(Box::new(status.as_str().to_string()));
        conditions.push(format!("status = ?{}", bound.len()));
    }
    if let Some(tag) = &opts.tag {
        // Tags are stored as a JSON array of strings
        bound.push(Box::new(tag_like_pattern(tag)));
        conditions.push(format!("tags LIKE ?{} ESCAPE '\\'", bound.len()));
    }
    if let Some(project) = &opts.project_path {
        bound.push(Box::new(project.clone()));
        conditions.push(format!("project_path = ?{}", bound.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let total_count: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM memories {where_clause}"),
        rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
        |row| row.get(0),
    )?;

    let limit = if opts.limit == 0 { 20 } else { opts.limit };
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories {where_clause}
         ORDER BY {sort_by} {direction} LIMIT {limit} OFFSET {}",
        opts.offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let memories = stmt
        .query_map(
            rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
            memory_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ListResult {
        memories,
        total_count,
    })
}

/// Guess a category from content when the caller did not supply one.
///
/// Cue lists are checked in a fixed priority order and the first hit wins, so
/// "WARNING: never run this in prod" lands on `warning`, not `command`.
pub fn categorize(content: &str) -> MemoryType {
    let lower = content.to_lowercase();
    let contains_any = |cues: &[&str]| cues.iter().any(|cue| lower.contains(cue));

    if contains_any(&["warning", "avoid", "never "]) {
        MemoryType::Warning
    } else if lower.trim_start().starts_with('$') || contains_any(&["run ", "execute ", "command"])
    {
        MemoryType::Command
    } else if contains_any(&["error", "exception", "failed", "traceback"]) {
        MemoryType::Error
    } else if contains_any(&["fixed", "solved", "resolved", "solution", "workaround", "fix "]) {
        MemoryType::Solution
    } else if contains_any(&["config", "setting", "environment variable", ".env"]) {
        MemoryType::Config
    } else if contains_any(&["troubleshoot", "debug", "diagnos"]) {
        MemoryType::Troubleshooting
    } else if contains_any(&["function", "class ", "def ", "fn ", "snippet", "```"]) {
        MemoryType::Code
    } else if contains_any(&["concept", "architecture", "works by", "pattern"]) {
        MemoryType::Concept
    } else if contains_any(&["decided", "decision", "chose", "we will"]) {
        MemoryType::Decision
    } else if contains_any(&["tip", "recommend", "best practice", "prefer", "should"]) {
        MemoryType::Tip
    } else {
        MemoryType::General
    }
}

/// Map a row selected with [`MEMORY_COLUMNS`] into a [`Memory`].
pub(crate) fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let type_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let tags_json: String = row.get(6)?;

    let memory_type = type_str.parse::<MemoryType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;
    let status = status_str.parse::<MemoryStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        context: row.get(2)?,
        memory_type,
        status,
        importance_score: row.get(5)?,
        tags,
        access_count: row.get(7)?,
        created_at: row.get(8)?,
        last_accessed: row.get(9)?,
        has_embedding: row.get::<_, i64>(10)? != 0,
        source_session_id: row.get(11)?,
        project_path: row.get(12)?,
    })
}

/// LIKE pattern matching one JSON-encoded tag element. LIKE wildcards inside
/// the tag are escaped; pair with `ESCAPE '\'` in the query.
pub(crate) fn tag_like_pattern(tag: &str) -> String {
    let mut escaped = String::with_capacity(tag.len());
    for c in tag.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%\"{escaped}\"%")
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
