//! Semantic-vector helpers.
//!
//! The core never generates embeddings; an external collaborator produces
//! one dense vector per word and the store keeps it as an opaque blob.

/// Seam to whatever owns the precomputed vectors.
pub trait EmbeddingProvider {
    /// Vector for `word`, if one has been stored.
    fn get_embedding(&self, word: &str) -> Option<Vec<f32>>;

    /// Whether any vectors exist at all.
    fn has_embeddings(&self) -> bool;
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-norm inputs rather than
/// erroring; missing semantic data is a degraded mode, not a failure.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Encode a vector as little-endian f32 bytes for blob storage.
pub fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a blob written by [`vector_to_blob`].
///
/// Returns `None` when the blob length is not a multiple of four.
pub fn blob_to_vector(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }

    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
