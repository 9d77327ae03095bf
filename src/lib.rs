//! Persistent memory for AI coding agents.
//!
//! Cortex is a local, single-file knowledge store: an append-only activity
//! log, a curated memory store with hybrid retrieval, a relationship graph,
//! and a session lifecycle tying them together. Everything lives in one
//! SQLite database.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with FTS5 for keyword search; embedding vectors are
//!   rows in the `embeddings` table, scanned in process for cosine similarity
//! - **Embeddings**: Local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions)
//! - **Search**: keyword (BM25), semantic (cosine), or a hybrid blend with
//!   importance, recency, and frequency factors
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`activity`] — Append-only activity log with write-time redaction
//! - [`memory`] — Memory store: write path, retrieval, relations, review, stats
//! - [`session`] — Session lifecycle and the current-session marker file
//! - [`embedding`] — Text-to-vector pipeline via ONNX Runtime
//! - [`cli`] — Terminal command implementations

pub mod activity;
pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod memory;
pub mod session;
