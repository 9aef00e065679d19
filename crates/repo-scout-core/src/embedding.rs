//! Vector helpers for embedding-based similarity.
//!
//! The application stores one embedding per repository (not per chunk);
//! semantic candidates come from a brute-force cosine scan over the
//! stored vectors. This module holds the pure pieces: text composition,
//! similarity math, the scan itself, and the little-endian BLOB codec
//! the SQLite store uses.

use serde::{Deserialize, Serialize};

use crate::model::RepositoryRecord;

/// A stored-embedding match against the target, produced by
/// [`semantic_hits`] and consumed by the fusion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticHit {
    pub record: RepositoryRecord,
    /// Cosine similarity against the target embedding, clamped to `[0, 1]`.
    pub similarity: f64,
}

/// Compose the text that gets embedded for a repository.
///
/// Name, description, topics, and a bounded README excerpt, in a fixed
/// order so re-embedding the same record is a no-op upstream.
pub fn embedding_text(record: &RepositoryRecord) -> String {
    let mut parts = vec![record.full_name.clone()];
    if let Some(description) = &record.description {
        parts.push(description.clone());
    }
    if !record.topics.is_empty() {
        parts.push(record.topics.join(" "));
    }
    if let Some(readme) = &record.readme_excerpt {
        parts.push(readme.clone());
    }
    parts.join("\n")
}

/// Cosine similarity between two vectors, `0.0` for empty or
/// mismatched-length inputs.
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
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Scan stored `(full_name, vector)` pairs against the target
/// embedding.
///
/// Skips the target itself, drops similarities below `floor` (and
/// anything negative — opposite-direction vectors are noise here, not
/// signal), sorts descending, and truncates to `limit`. The caller
/// attaches repository records to the surviving names.
pub fn rank_embeddings(
    target_full_name: &str,
    target_vec: &[f32],
    stored: &[(String, Vec<f32>)],
    floor: f64,
    limit: usize,
) -> Vec<(String, f64)> {
    let mut hits: Vec<(String, f64)> = stored
        .iter()
        .filter(|(name, _)| name != target_full_name)
        .filter_map(|(name, vec)| {
            let similarity = cosine_similarity(target_vec, vec) as f64;
            if similarity >= floor && similarity > 0.0 {
                Some((name.clone(), similarity.min(1.0)))
            } else {
                None
            }
        })
        .collect();
    hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}

/// Encode a float vector as little-endian `f32` bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
