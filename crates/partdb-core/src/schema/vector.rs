//! Embedding BLOB encoding.
//!
//! Vectors are stored as packed little-endian `f32`, four bytes per
//! component, with no header.

/// Encode an embedding as a BLOB.
#[must_use]
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        blob.extend_from_slice(&val.to_le_bytes());
    }
    blob
}

/// Decode a BLOB into an embedding.
///
/// Returns `None` if the length is not a multiple of four bytes.
#[must_use]
pub fn blob_to_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
