//! SQL DDL for all Cortex tables.
//!
//! Defines the `memories`, `memories_fts` (FTS5), `activities`, `agents`,
//! `sessions`, `memory_relationships`, `embeddings`, and `schema_migrations`
//! tables. All DDL uses `IF NOT EXISTS` for idempotent initialization.
//!
//! The FTS index is kept in sync with `memories` by the `memories_ai` /
//! `memories_ad` / `memories_au` triggers — writers never touch the index
//! directly. Any migration that rebuilds the memories table must re-create
//! these triggers.

/// All baseline DDL statements for Cortex's core tables.
pub const SCHEMA_SQL: &str = r#"
-- Work sessions
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    project_path TEXT NOT NULL,
    started_at TEXT NOT NULL,
    ended_at TEXT,
    summary TEXT,
    key_learnings TEXT,
    total_activities INTEGER NOT NULL DEFAULT 0,
    total_memories_created INTEGER NOT NULL DEFAULT 0,
    tools_used TEXT,
    files_modified TEXT,
    key_errors TEXT
);

CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at DESC);
CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project_path);

-- Agents observed in the activity stream
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL DEFAULT 'main',
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    total_activities INTEGER NOT NULL DEFAULT 0
);

-- Append-only audit trail
CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    session_id TEXT,
    agent_id TEXT REFERENCES agents(id),
    timestamp TEXT NOT NULL,
    event_type TEXT NOT NULL CHECK(event_type IN ('pre_tool_use','post_tool_use','decision','observation')),
    tool_name TEXT,
    tool_input TEXT,
    tool_output TEXT,
    duration_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1,
    error_message TEXT,
    project_path TEXT,
    file_path TEXT,
    summary TEXT,
    summary_detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_activities_timestamp ON activities(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_activities_session ON activities(session_id);
CREATE INDEX IF NOT EXISTS idx_activities_tool ON activities(tool_name);
CREATE INDEX IF NOT EXISTS idx_activities_event ON activities(event_type);

-- Curated knowledge records
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    context TEXT,
    type TEXT NOT NULL DEFAULT 'general' CHECK(type IN (
        'general','warning','tip','config','troubleshooting','code',
        'error','solution','command','concept','decision')),
    status TEXT NOT NULL DEFAULT 'fresh' CHECK(status IN ('fresh','needs_review','outdated','archived')),
    importance_score REAL NOT NULL DEFAULT 50 CHECK(importance_score >= 1 AND importance_score <= 100),
    tags TEXT NOT NULL DEFAULT '[]',
    access_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    has_embedding INTEGER NOT NULL DEFAULT 0,
    source_session_id TEXT,
    project_path TEXT
);

CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(type);
CREATE INDEX IF NOT EXISTS idx_memories_status ON memories(status);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_memories_accessed ON memories(last_accessed DESC);
CREATE INDEX IF NOT EXISTS idx_memories_importance ON memories(importance_score);
CREATE INDEX IF NOT EXISTS idx_memories_embedding ON memories(has_embedding);
CREATE INDEX IF NOT EXISTS idx_memories_session ON memories(source_session_id);

-- Full-text search (BM25) over content and context
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    content,
    context,
    content='memories',
    content_rowid='rowid'
);

-- Keep the FTS index synchronized with the memories table
CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(rowid, content, context)
    VALUES (new.rowid, new.content, new.context);
END;

CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, content, context)
    VALUES ('delete', old.rowid, old.content, old.context);
END;

CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, content, context)
    VALUES ('delete', old.rowid, old.content, old.context);
    INSERT INTO memories_fts(rowid, content, context)
    VALUES (new.rowid, new.content, new.context);
END;

-- Typed, weighted edges between memories
CREATE TABLE IF NOT EXISTS memory_relationships (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    relationship_type TEXT NOT NULL CHECK(relationship_type IN ('related_to','supersedes','derived_from','contradicts')),
    strength REAL NOT NULL DEFAULT 1.0 CHECK(strength >= 0.0 AND strength <= 1.0),
    created_at TEXT NOT NULL,
    UNIQUE(source_id, target_id, relationship_type)
);

CREATE INDEX IF NOT EXISTS idx_relationships_source ON memory_relationships(source_id);
CREATE INDEX IF NOT EXISTS idx_relationships_target ON memory_relationships(target_id);

-- One vector per memory
CREATE TABLE IF NOT EXISTS embeddings (
    id TEXT PRIMARY KEY,
    memory_id TEXT NOT NULL UNIQUE REFERENCES memories(id) ON DELETE CASCADE,
    model_name TEXT NOT NULL,
    vector BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Append-only migration ledger
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;
