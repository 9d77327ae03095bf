//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, a local ONNX implementation
//! using all-MiniLM-L6-v2 (384 dimensions, L2-normalized), the blob codec
//! used to persist vectors in the `embeddings` table, and the cosine metric
//! used by semantic search.

pub mod local;
pub mod store;

use anyhow::{bail, Result};

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly [`EMBEDDING_DIM`]
/// dimensions. All methods are synchronous — callers in async contexts should
/// use `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for
    /// batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Model identifier recorded alongside stored vectors.
    fn model_name(&self) -> &str;

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"local"` is supported (ONNX Runtime + all-MiniLM-L6-v2).
/// Returns an error if model files are not found — run `cortex model download`
/// first.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => bail!("unknown embedding provider: {other}. Supported: local"),
    }
}

/// Serialize a vector to the little-endian f32 byte layout stored in the
/// `embeddings.vector` column.
pub fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Inverse of [`vector_to_blob`]. Rejects blobs whose length is not a
/// multiple of four bytes.
pub fn blob_to_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        bail!("vector blob length {} is not a multiple of 4", blob.len());
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Cosine similarity in `[-1, 1]`. Mismatched lengths and zero vectors score
/// zero rather than erroring, since stored vectors may predate a model change.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trip_is_bit_identical() {
        let vector = vec![0.1f32, -2.5, 3.25, f32::MIN_POSITIVE, 0.0];
        let blob = vector_to_blob(&vector);
        assert_eq!(blob.len(), vector.len() * 4);

        let decoded = blob_to_vector(&blob).unwrap();
        for (a, b) in vector.iter().zip(decoded.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn blob_with_bad_length_is_rejected() {
        assert!(blob_to_vector(&[1, 2, 3]).is_err());
        assert!(blob_to_vector(&[]).unwrap().is_empty());
    }

    #[test]
    fn cosine_basics() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &a), 1.0);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&a, &[-1.0, 0.0, 0.0]), -1.0);
    }

    #[test]
    fn cosine_degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
