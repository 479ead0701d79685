//! Vector similarity.

/// Cosine similarity of two vectors, in `[-1, 1]`.
///
/// Returns `None` when the lengths differ. A zero vector has similarity 0
/// with everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a > 0.0 && norm_b > 0.0 {
        Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
    } else {
        Some(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_invariant() {
        let sim = cosine_similarity(&[1.0, 0.0], &[5.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn test_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), Some(0.0));
    }
}
