//! Retrieval — keyword (FTS5/BM25), semantic (cosine over stored vectors),
//! and hybrid multi-factor ranking.
//!
//! Every memory returned by a search counts as accessed: its `access_count`
//! is bumped and `last_accessed` refreshed in the same call, which feeds the
//! frequency and recency factors of future hybrid rankings.

use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::embedding::{blob_to_vector, cosine_similarity, EmbeddingProvider};
use crate::memory::store::{memory_from_row, tag_like_pattern, MEMORY_COLUMNS};
use crate::memory::types::{Memory, MemoryStatus, MemoryType};

/// How to interpret the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// FTS5 full-text match only.
    Keyword,
    /// Embedding cosine similarity only (falls back to keyword when no
    /// embedding provider is available).
    Semantic,
    /// Both, blended with importance, recency, and frequency.
    Hybrid,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keyword" => Ok(Self::Keyword),
            "semantic" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(format!("unknown search mode: {s}")),
        }
    }
}

/// Filters applied inside the SQL of both retrieval paths.
#[derive(Debug, Default, Clone)]
pub struct SearchFilter {
    pub memory_type: Option<MemoryType>,
    /// Every listed tag must be present on the memory.
    pub tags: Vec<String>,
    pub min_importance: Option<f64>,
    /// Archived memories are skipped unless this is set.
    pub include_archived: bool,
    pub project_path: Option<String>,
}

/// Blend weights for hybrid ranking. Each factor is normalized to `[0, 1]`
/// before weighting, so with the default weights the final score is too.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchWeights {
    pub keyword: f64,
    pub semantic: f64,
    pub importance: f64,
    pub recency: f64,
    pub frequency: f64,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            keyword: 0.35,
            semantic: 0.35,
            importance: 0.10,
            recency: 0.10,
            frequency: 0.10,
        }
    }
}

/// A search request. `limit` of 0 means the default page size.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub mode: SearchMode,
    pub filter: SearchFilter,
    pub weights: SearchWeights,
    pub limit: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            query: query.into(),
            mode,
            filter: SearchFilter::default(),
            weights: SearchWeights::default(),
            limit: 10,
        }
    }
}

/// One ranked result. Component scores are `None` when that path did not see
/// the memory (or did not run).
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub memory: Memory,
    pub keyword_score: Option<f64>,
    pub semantic_score: Option<f64>,
    /// Final ranking score; comparable only within a single response.
    pub score: f64,
}

/// Run a search. Returned memories have already had their access tracking
/// updated.
pub fn search(
    conn: &Connection,
    provider: Option<&dyn EmbeddingProvider>,
    request: &SearchRequest,
) -> Result<Vec<SearchResult>> {
    if request.query.trim().is_empty() {
        return Ok(Vec::new());
    }
    let limit = if request.limit == 0 { 10 } else { request.limit } as usize;
    // Over-fetch per path so the blend has candidates to reorder
    let pool = limit * 3;

    let mut results = match request.mode {
        SearchMode::Keyword => {
            let hits = keyword_search(conn, &request.query, &request.filter, limit)?;
            assemble(conn, &hits, &[], |_, kw, _| kw.unwrap_or(0.0))?
        }
        SearchMode::Semantic => match embed_query(provider, &request.query) {
            Some(query_vec) => {
                let hits = semantic_search(conn, &query_vec, &request.filter, limit)?;
                assemble(conn, &[], &hits, |_, _, sem| sem.unwrap_or(0.0))?
            }
            None => {
                tracing::warn!("no embedding provider available, falling back to keyword search");
                let hits = keyword_search(conn, &request.query, &request.filter, limit)?;
                assemble(conn, &hits, &[], |_, kw, _| kw.unwrap_or(0.0))?
            }
        },
        SearchMode::Hybrid => {
            let keyword_hits = keyword_search(conn, &request.query, &request.filter, pool)?;
            let semantic_hits = match embed_query(provider, &request.query) {
                Some(query_vec) => semantic_search(conn, &query_vec, &request.filter, pool)?,
                None => {
                    tracing::warn!(
                        "no embedding provider available, hybrid search is keyword-only"
                    );
                    Vec::new()
                }
            };
            let weights = request.weights;
            let now = chrono::Utc::now();
            assemble(conn, &keyword_hits, &semantic_hits, move |memory, kw, sem| {
                hybrid_score(memory, kw, sem, &weights, now)
            })?
        }
    };

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);

    let ids: Vec<&str> = results.iter().map(|r| r.memory.id.as_str()).collect();
    let now = update_access(conn, &ids)?;
    for result in &mut results {
        result.memory.access_count += 1;
        result.memory.last_accessed = now.clone();
    }

    Ok(results)
}

/// Multi-factor blend. Keyword and semantic components arrive already
/// normalized to `[0, 1]`; the metadata factors are derived here.
fn hybrid_score(
    memory: &Memory,
    keyword: Option<f64>,
    semantic: Option<f64>,
    weights: &SearchWeights,
    now: chrono::DateTime<chrono::Utc>,
) -> f64 {
    let importance = (memory.importance_score / 100.0).clamp(0.0, 1.0);

    // Exponential decay with a 30-day half-life on last access
    let age_days = chrono::DateTime::parse_from_rfc3339(&memory.last_accessed)
        .map(|t| (now - t.with_timezone(&chrono::Utc)).num_seconds().max(0) as f64 / 86_400.0)
        .unwrap_or(0.0);
    let recency = (-(age_days / 30.0) * std::f64::consts::LN_2).exp();

    let frequency = ((1.0 + memory.access_count as f64).ln() / (101.0f64).ln()).min(1.0);

    weights.keyword * keyword.unwrap_or(0.0)
        + weights.semantic * semantic.unwrap_or(0.0)
        + weights.importance * importance
        + weights.recency * recency
        + weights.frequency * frequency
}

/// Embed the query, degrading to `None` (not an error) when the provider is
/// missing or fails.
fn embed_query(provider: Option<&dyn EmbeddingProvider>, query: &str) -> Option<Vec<f32>> {
    match provider {
        Some(p) => match p.embed(query) {
            Ok(vec) => Some(vec),
            Err(err) => {
                tracing::warn!(error = %err, "query embedding failed");
                None
            }
        },
        None => None,
    }
}

/// FTS5 BM25 search with filters applied in SQL. Returns (id, score) with
/// scores normalized to `[0, 1]` by the per-query maximum. Rank ties are
/// broken by most recent access.
fn keyword_search(
    conn: &Connection,
    query: &str,
    filter: &SearchFilter,
    limit: usize,
) -> Result<Vec<(String, f64)>> {
    let escaped = escape_fts_query(query);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }

    let mut conditions = vec!["memories_fts MATCH ?1".to_string()];
    let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(escaped)];
    filter_conditions(filter, &mut conditions, &mut bound);

    let sql = format!(
        "SELECT m.id, rank FROM memories_fts
         JOIN memories m ON m.rowid = memories_fts.rowid
         WHERE {}
         ORDER BY rank ASC, m.last_accessed DESC LIMIT {limit}",
        conditions.join(" AND ")
    );
    let mut stmt = conn.prepare(&sql)?;
    // FTS5 rank is negative, more negative is better
    let hits: Vec<(String, f64)> = stmt
        .query_map(
            rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
            |row| Ok((row.get::<_, String>(0)?, -row.get::<_, f64>(1)?)),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(normalize_scores(hits))
}

/// Cosine similarity scan over stored vectors, filters applied when selecting
/// candidates. Cosine is already in `[-1, 1]`; negatives clamp to zero.
fn semantic_search(
    conn: &Connection,
    query_vec: &[f32],
    filter: &SearchFilter,
    limit: usize,
) -> Result<Vec<(String, f64)>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    filter_conditions(filter, &mut conditions, &mut bound);

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let sql = format!(
        "SELECT m.id, e.vector FROM embeddings e
         JOIN memories m ON m.id = e.memory_id {where_clause}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let candidates: Vec<(String, Vec<u8>)> = stmt
        .query_map(
            rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut scored: Vec<(String, f64)> = Vec::with_capacity(candidates.len());
    for (id, blob) in candidates {
        let vector = blob_to_vector(&blob)
            .with_context(|| format!("decoding stored vector for {id}"))?;
        let similarity = cosine_similarity(query_vec, &vector).max(0.0);
        scored.push((id, similarity as f64));
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    Ok(scored)
}

/// Shared filter SQL for both retrieval paths. Uses the `m` alias.
fn filter_conditions(
    filter: &SearchFilter,
    conditions: &mut Vec<String>,
    bound: &mut Vec<Box<dyn rusqlite::ToSql>>,
) {
    if !filter.include_archived {
        conditions.push(format!("m.status != '{}'", MemoryStatus::Archived.as_str()));
    }
    if let Some(memory_type) = filter.memory_type {
        bound.push(Box::new(memory_type.as_str().to_string()));
        conditions.push(format!("m.type = ?{}", bound.len()));
    }
    for tag in &filter.tags {
        bound.push(Box::new(tag_like_pattern(tag)));
        conditions.push(format!("m.tags LIKE ?{} ESCAPE '\\'", bound.len()));
    }
    if let Some(min) = filter.min_importance {
        bound.push(Box::new(min));
        conditions.push(format!("m.importance_score >= ?{}", bound.len()));
    }
    if let Some(project) = &filter.project_path {
        bound.push(Box::new(project.clone()));
        conditions.push(format!("m.project_path = ?{}", bound.len()));
    }
}

/// Scale scores so the best hit is 1.0. Keeps keyword and semantic components
/// comparable inside the hybrid blend.
fn normalize_scores(hits: Vec<(String, f64)>) -> Vec<(String, f64)> {
    let max = hits
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 || !max.is_finite() {
        return hits;
    }
    hits.into_iter().map(|(id, s)| (id, s / max)).collect()
}

/// Escape a user query for FTS5 MATCH syntax by quoting each word, so
/// operators and punctuation in the query cannot break the parser.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            let clean = word.replace('"', "");
            format!("\"{clean}\"")
        })
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join per-path hit lists into full results, scoring each memory with the
/// provided function.
fn assemble<F>(
    conn: &Connection,
    keyword_hits: &[(String, f64)],
    semantic_hits: &[(String, f64)],
    score: F,
) -> Result<Vec<SearchResult>>
where
    F: Fn(&Memory, Option<f64>, Option<f64>) -> f64,
{
    let keyword_map: HashMap<&str, f64> =
        keyword_hits.iter().map(|(id, s)| (id.as_str(), *s)).collect();
    let semantic_map: HashMap<&str, f64> =
        semantic_hits.iter().map(|(id, s)| (id.as_str(), *s)).collect();

    let mut ids: Vec<&str> = Vec::new();
    for (id, _) in keyword_hits.iter().chain(semantic_hits.iter()) {
        if !ids.contains(&id.as_str()) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories WHERE id IN ({})",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
    let memories = stmt
        .query_map(bound.as_slice(), memory_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(memories
        .into_iter()
        .map(|memory| {
            let keyword_score = keyword_map.get(memory.id.as_str()).copied();
            let semantic_score = semantic_map.get(memory.id.as_str()).copied();
            let final_score = score(&memory, keyword_score, semantic_score);
            SearchResult {
                memory,
                keyword_score,
                semantic_score,
                score: final_score,
            }
        })
        .collect())
}

/// Bump access tracking for every returned memory. Returns the timestamp used.
fn update_access(conn: &Connection, ids: &[&str]) -> Result<String> {
    let now = chrono::Utc::now().to_rfc3339();
    if ids.is_empty() {
        return Ok(now);
    }
    let mut stmt = conn.prepare(
        "UPDATE memories SET access_count = access_count + 1, last_accessed = ?1 WHERE id = ?2",
    )?;
    for id in ids {
        stmt.execute(params![now, id])?;
    }
    Ok(now)
}
