//! Core memory type definitions.
//!
//! Defines [`MemoryType`] (the knowledge categories), [`MemoryStatus`] (the
//! lifecycle states), [`RelationshipType`] (graph edge kinds), [`Memory`]
//! (a full record), and [`MemoryRelationship`] (an edge between memories).

use serde::{Deserialize, Serialize};

/// Knowledge category of a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Uncategorized knowledge; the default.
    General,
    /// Pitfalls and things to avoid.
    Warning,
    /// Useful practices and recommendations.
    Tip,
    /// Configuration values and settings.
    Config,
    /// Diagnostic walkthroughs.
    Troubleshooting,
    /// Code snippets and implementation notes.
    Code,
    /// Observed failures and their messages.
    Error,
    /// Fixes that resolved a problem.
    Solution,
    /// Shell commands and invocations.
    Command,
    /// Explanations of how something works.
    Concept,
    /// Choices made and their rationale.
    Decision,
}

impl MemoryType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Warning => "warning",
            Self::Tip => "tip",
            Self::Config => "config",
            Self::Troubleshooting => "troubleshooting",
            Self::Code => "code",
            Self::Error => "error",
            Self::Solution => "solution",
            Self::Command => "command",
            Self::Concept => "concept",
            Self::Decision => "decision",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "warning" => Ok(Self::Warning),
            "tip" => Ok(Self::Tip),
            "config" => Ok(Self::Config),
            "troubleshooting" => Ok(Self::Troubleshooting),
            "code" => Ok(Self::Code),
            "error" => Ok(Self::Error),
            "solution" => Ok(Self::Solution),
            "command" => Ok(Self::Command),
            "concept" => Ok(Self::Concept),
            "decision" => Ok(Self::Decision),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// Lifecycle state of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    /// Newly created or recently confirmed.
    Fresh,
    /// Flagged for human review, usually due to age.
    NeedsReview,
    /// Known to be stale but kept for history.
    Outdated,
    /// Hidden from default retrieval.
    Archived,
}

impl MemoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::NeedsReview => "needs_review",
            Self::Outdated => "outdated",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for MemoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fresh" => Ok(Self::Fresh),
            "needs_review" => Ok(Self::NeedsReview),
            "outdated" => Ok(Self::Outdated),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("unknown memory status: {s}")),
        }
    }
}

/// Kind of a directed edge between two memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Loose topical association.
    RelatedTo,
    /// Source replaces the target as current knowledge.
    Supersedes,
    /// Source was distilled or concluded from the target.
    DerivedFrom,
    /// Source and target disagree; both are kept until resolved.
    Contradicts,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelatedTo => "related_to",
            Self::Supersedes => "supersedes",
            Self::DerivedFrom => "derived_from",
            Self::Contradicts => "contradicts",
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "related_to" => Ok(Self::RelatedTo),
            "supersedes" => Ok(Self::Supersedes),
            "derived_from" => Ok(Self::DerivedFrom),
            "contradicts" => Ok(Self::Contradicts),
            _ => Err(format!("unknown relationship type: {s}")),
        }
    }
}

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// `mem_`-prefixed UUID v7 (time-sortable) primary key.
    pub id: String,
    /// The full text content of the memory.
    pub content: String,
    /// Optional situational detail ("when working on X", "on macOS").
    pub context: Option<String>,
    /// Knowledge category.
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Lifecycle state.
    pub status: MemoryStatus,
    /// Importance in `[1.0, 100.0]`; feeds hybrid ranking.
    pub importance_score: f64,
    /// Free-form labels.
    pub tags: Vec<String>,
    /// Number of times this memory has been returned by retrieval.
    pub access_count: u32,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last retrieval (creation time if never).
    pub last_accessed: String,
    /// Whether an embedding row exists for this memory.
    pub has_embedding: bool,
    /// Session that produced this memory, if any.
    pub source_session_id: Option<String>,
    /// Project the memory belongs to, if scoped.
    pub project_path: Option<String>,
}

/// A directed, typed, weighted edge between two memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRelationship {
    /// `rel_`-prefixed UUID v7 primary key.
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: RelationshipType,
    /// Edge weight in `[0.0, 1.0]`.
    pub strength: f64,
    pub created_at: String,
}
