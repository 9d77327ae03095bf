//! Relationship graph between memories.
//!
//! Stores directed, typed, weighted edges with deduplication on the full
//! (source, target, type) triple. Edges ride on foreign key cascades, so
//! deleting a memory removes every edge touching it.

use std::collections::{HashSet, VecDeque};

use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::memory::types::{MemoryRelationship, RelationshipType};

/// Maximum BFS depth for [`get_graph`].
pub const MAX_GRAPH_DEPTH: u32 = 5;
/// Node cap for [`get_graph`] responses.
pub const MAX_GRAPH_NODES: usize = 200;

/// Result returned from [`link_memories`].
#[derive(Debug, Serialize)]
pub struct LinkResult {
    pub relationship: MemoryRelationship,
    /// `true` if this exact (source, target, type) edge already existed.
    pub deduplicated: bool,
}

/// Which edges [`get_relationships`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// A neighborhood subgraph.
#[derive(Debug, Serialize)]
pub struct Graph {
    /// Memory IDs reachable within the requested depth, center first.
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<MemoryRelationship>,
    /// `true` when the node cap cut traversal short.
    pub truncated: bool,
}

#[derive(Debug, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub content_preview: String,
    #[serde(rename = "type")]
    pub memory_type: String,
}

/// Create an edge between two memories.
///
/// Both endpoints must exist and differ. Relinking the same (source, target,
/// type) triple is idempotent and returns the existing edge.
pub fn link_memories(
    conn: &Connection,
    source_id: &str,
    target_id: &str,
    relationship_type: RelationshipType,
    strength: Option<f64>,
) -> Result<LinkResult> {
    if source_id == target_id {
        bail!("cannot link a memory to itself: {source_id}");
    }
    let strength = strength.unwrap_or(1.0);
    if !(0.0..=1.0).contains(&strength) {
        bail!("relationship strength must be between 0 and 1, got {strength}");
    }

    validate_endpoint(conn, source_id, "source")?;
    validate_endpoint(conn, target_id, "target")?;

    let existing: Option<MemoryRelationship> = conn
        .query_row(
            "SELECT id, source_id, target_id, relationship_type, strength, created_at
             FROM memory_relationships
             WHERE source_id = ?1 AND target_id = ?2 AND relationship_type = ?3",
            params![source_id, target_id, relationship_type.as_str()],
            relationship_from_row,
        )
        .optional()?;

    if let Some(relationship) = existing {
        return Ok(LinkResult {
            relationship,
            deduplicated: true,
        });
    }

    let id = format!("rel_{}", uuid::Uuid::now_v7());
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO memory_relationships
             (id, source_id, target_id, relationship_type, strength, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            source_id,
            target_id,
            relationship_type.as_str(),
            strength,
            now
        ],
    )?;

    Ok(LinkResult {
        relationship: MemoryRelationship {
            id,
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            relationship_type,
            strength,
            created_at: now,
        },
        deduplicated: false,
    })
}

/// All edges touching a memory, filtered by direction.
pub fn get_relationships(
    conn: &Connection,
    memory_id: &str,
    direction: Direction,
) -> Result<Vec<MemoryRelationship>> {
    let sql = match direction {
        Direction::Outgoing => {
            "SELECT id, source_id, target_id, relationship_type, strength, created_at
             FROM memory_relationships WHERE source_id = ?1 ORDER BY created_at"
        }
        Direction::Incoming => {
            "SELECT id, source_id, target_id, relationship_type, strength, created_at
             FROM memory_relationships WHERE target_id = ?1 ORDER BY created_at"
        }
        Direction::Both => {
            "SELECT id, source_id, target_id, relationship_type, strength, created_at
             FROM memory_relationships WHERE source_id = ?1 OR target_id = ?1
             ORDER BY created_at"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    let edges = stmt
        .query_map(params![memory_id], relationship_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(edges)
}

/// Every edge in the store, oldest first.
pub fn all_relationships(conn: &Connection) -> Result<Vec<MemoryRelationship>> {
    let mut stmt = conn.prepare(
        "SELECT id, source_id, target_id, relationship_type, strength, created_at
         FROM memory_relationships ORDER BY created_at",
    )?;
    let edges = stmt
        .query_map([], relationship_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(edges)
}

/// Delete one edge by ID. Returns `false` if it did not exist.
pub fn unlink(conn: &Connection, relationship_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM memory_relationships WHERE id = ?1",
        params![relationship_id],
    )?;
    Ok(deleted > 0)
}

/// Breadth-first neighborhood around `center_id`, following edges in both
/// directions, or the whole graph when no center is given. Depth is clamped
/// to [`MAX_GRAPH_DEPTH`] and the node count to [`MAX_GRAPH_NODES`].
pub fn get_graph(conn: &Connection, center_id: Option<&str>, depth: u32) -> Result<Graph> {
    let Some(center_id) = center_id else {
        return full_graph(conn);
    };
    validate_endpoint(conn, center_id, "center")?;
    let depth = depth.min(MAX_GRAPH_DEPTH);

    let mut visited: HashSet<String> = HashSet::new();
    let mut order: Vec<String> = Vec::new();
    let mut edges: Vec<MemoryRelationship> = Vec::new();
    let mut seen_edges: HashSet<String> = HashSet::new();
    let mut truncated = false;

    let mut queue: VecDeque<(String, u32)> = VecDeque::new();
    visited.insert(center_id.to_string());
    order.push(center_id.to_string());
    queue.push_back((center_id.to_string(), 0));

    while let Some((id, level)) = queue.pop_front() {
        if level >= depth {
            continue;
        }
        for edge in get_relationships(conn, &id, Direction::Both)? {
            let neighbor = if edge.source_id == id {
                edge.target_id.clone()
            } else {
                edge.source_id.clone()
            };
            if seen_edges.insert(edge.id.clone()) {
                edges.push(edge);
            }
            if visited.contains(&neighbor) {
                continue;
            }
            if order.len() >= MAX_GRAPH_NODES {
                truncated = true;
                continue;
            }
            visited.insert(neighbor.clone());
            order.push(neighbor.clone());
            queue.push_back((neighbor, level + 1));
        }
    }

    // Keep only edges whose endpoints both made it into the node set
    edges.retain(|e| visited.contains(&e.source_id) && visited.contains(&e.target_id));

    Ok(Graph {
        nodes: load_nodes(conn, &order)?,
        edges,
        truncated,
    })
}

/// The whole graph: every memory that participates in an edge, capped at
/// [`MAX_GRAPH_NODES`] oldest-first.
fn full_graph(conn: &Connection) -> Result<Graph> {
    let mut order: Vec<String> = Vec::new();
    let mut in_set: HashSet<String> = HashSet::new();
    let mut truncated = false;

    let mut edges = all_relationships(conn)?;
    for edge in &edges {
        for id in [&edge.source_id, &edge.target_id] {
            if in_set.contains(id.as_str()) {
                continue;
            }
            if order.len() >= MAX_GRAPH_NODES {
                truncated = true;
                continue;
            }
            in_set.insert(id.clone());
            order.push(id.clone());
        }
    }
    edges.retain(|e| in_set.contains(&e.source_id) && in_set.contains(&e.target_id));

    Ok(Graph {
        nodes: load_nodes(conn, &order)?,
        edges,
        truncated,
    })
}

fn load_nodes(conn: &Connection, ids: &[String]) -> Result<Vec<GraphNode>> {
    let mut nodes = Vec::with_capacity(ids.len());
    for id in ids {
        let (content, memory_type): (String, String) = conn.query_row(
            "SELECT content, type FROM memories WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        nodes.push(GraphNode {
            id: id.clone(),
            content_preview: preview(&content, 80),
            memory_type,
        });
    }
    Ok(nodes)
}

fn validate_endpoint(conn: &Connection, memory_id: &str, role: &str) -> Result<()> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT id FROM memories WHERE id = ?1",
            params![memory_id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        bail!("{role} memory not found: {memory_id}");
    }
    Ok(())
}

fn relationship_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRelationship> {
    let type_str: String = row.get(3)?;
    let relationship_type = type_str.parse::<RelationshipType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(MemoryRelationship {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relationship_type,
        strength: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let truncated: String = content.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::memory::store::{create_memory, delete_memory, CreateMemoryParams};

    fn insert(conn: &mut Connection, content: &str) -> String {
        create_memory(
            conn,
            CreateMemoryParams {
                content: content.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn link_validates_endpoints() {
        let mut conn = open_memory_database().unwrap();
        let a = insert(&mut conn, "a");

        assert!(link_memories(&conn, &a, "mem_missing", RelationshipType::RelatedTo, None).is_err());
        assert!(link_memories(&conn, "mem_missing", &a, RelationshipType::RelatedTo, None).is_err());
        assert!(link_memories(&conn, &a, &a, RelationshipType::RelatedTo, None).is_err());
    }

    #[test]
    fn link_rejects_out_of_range_strength() {
        let mut conn = open_memory_database().unwrap();
        let a = insert(&mut conn, "a");
        let b = insert(&mut conn, "b");

        assert!(link_memories(&conn, &a, &b, RelationshipType::RelatedTo, Some(1.5)).is_err());
        assert!(link_memories(&conn, &a, &b, RelationshipType::RelatedTo, Some(-0.1)).is_err());
    }

    #[test]
    fn relink_is_idempotent() {
        let mut conn = open_memory_database().unwrap();
        let a = insert(&mut conn, "a");
        let b = insert(&mut conn, "b");

        let first = link_memories(&conn, &a, &b, RelationshipType::Supersedes, Some(0.8)).unwrap();
        assert!(!first.deduplicated);

        let second = link_memories(&conn, &a, &b, RelationshipType::Supersedes, Some(0.3)).unwrap();
        assert!(second.deduplicated);
        assert_eq!(second.relationship.id, first.relationship.id);
        // Existing edge keeps its original strength
        assert_eq!(second.relationship.strength, 0.8);

        // Different type between the same pair is a distinct edge
        let third = link_memories(&conn, &a, &b, RelationshipType::RelatedTo, None).unwrap();
        assert!(!third.deduplicated);
    }

    #[test]
    fn direction_filters_edges() {
        let mut conn = open_memory_database().unwrap();
        let a = insert(&mut conn, "a");
        let b = insert(&mut conn, "b");
        let c = insert(&mut conn, "c");
        link_memories(&conn, &a, &b, RelationshipType::RelatedTo, None).unwrap();
        link_memories(&conn, &c, &a, RelationshipType::DerivedFrom, None).unwrap();

        assert_eq!(get_relationships(&conn, &a, Direction::Outgoing).unwrap().len(), 1);
        assert_eq!(get_relationships(&conn, &a, Direction::Incoming).unwrap().len(), 1);
        assert_eq!(get_relationships(&conn, &a, Direction::Both).unwrap().len(), 2);
    }

    #[test]
    fn deleting_memory_cascades_edges() {
        let mut conn = open_memory_database().unwrap();
        let a = insert(&mut conn, "a");
        let b = insert(&mut conn, "b");
        let c = insert(&mut conn, "c");
        link_memories(&conn, &a, &b, RelationshipType::RelatedTo, None).unwrap();
        link_memories(&conn, &c, &a, RelationshipType::Contradicts, None).unwrap();

        delete_memory(&mut conn, &a).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM memory_relationships", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn graph_bfs_respects_depth() {
        let mut conn = open_memory_database().unwrap();
        // Chain: a -> b -> c -> d
        let a = insert(&mut conn, "a");
        let b = insert(&mut conn, "b");
        let c = insert(&mut conn, "c");
        let d = insert(&mut conn, "d");
        link_memories(&conn, &a, &b, RelationshipType::RelatedTo, None).unwrap();
        link_memories(&conn, &b, &c, RelationshipType::RelatedTo, None).unwrap();
        link_memories(&conn, &c, &d, RelationshipType::RelatedTo, None).unwrap();

        let graph = get_graph(&conn, Some(&a), 1).unwrap();
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec![a.as_str(), b.as_str()]);
        assert_eq!(graph.edges.len(), 1);
        assert!(!graph.truncated);

        let graph = get_graph(&conn, Some(&a), 3).unwrap();
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 3);
    }

    #[test]
    fn no_center_returns_whole_graph() {
        let mut conn = open_memory_database().unwrap();
        let a = insert(&mut conn, "a");
        let b = insert(&mut conn, "b");
        let c = insert(&mut conn, "c");
        // d is isolated and stays out of the graph
        insert(&mut conn, "d");
        link_memories(&conn, &a, &b, RelationshipType::RelatedTo, None).unwrap();
        link_memories(&conn, &c, &b, RelationshipType::Contradicts, None).unwrap();

        let graph = get_graph(&conn, None, 1).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert!(!graph.truncated);
    }

    #[test]
    fn graph_follows_incoming_edges_too() {
        let mut conn = open_memory_database().unwrap();
        let a = insert(&mut conn, "a");
        let b = insert(&mut conn, "b");
        link_memories(&conn, &b, &a, RelationshipType::Supersedes, None).unwrap();

        let graph = get_graph(&conn, Some(&a), 1).unwrap();
        assert_eq!(graph.nodes.len(), 2);
    }

    #[test]
    fn unlink_removes_one_edge() {
        let mut conn = open_memory_database().unwrap();
        let a = insert(&mut conn, "a");
        let b = insert(&mut conn, "b");
        let link = link_memories(&conn, &a, &b, RelationshipType::RelatedTo, None).unwrap();

        assert!(unlink(&conn, &link.relationship.id).unwrap());
        assert!(!unlink(&conn, &link.relationship.id).unwrap());
        assert!(get_relationships(&conn, &a, Direction::Both).unwrap().is_empty());
    }
}
