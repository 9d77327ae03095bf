//! The curated memory store: records, write path, retrieval, relationships,
//! review workflow, and statistics.

pub mod relations;
pub mod review;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;
