//! The embedder trait.

use crate::error::Result;

/// Maps text to fixed-dimension L2-normalized vectors.
///
/// Implementations make no threading or batching guarantees beyond being
/// callable from multiple request handlers; `encode_batch` defaults to
/// per-item encoding for models without a batched entry point.
pub trait Embedder: Send + Sync {
    /// Output dimensionality of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Encode one text into a unit vector.
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode a batch; each row is a unit vector.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

/// Scale `vector` to unit L2 norm in place.
///
/// Returns `false` when the vector is zero or non-finite and cannot be
/// normalized.
pub fn l2_normalize(vector: &mut [f32]) -> bool {
    let norm_sq: f32 = vector.iter().map(|x| x * x).sum();
    if !norm_sq.is_finite() || norm_sq == 0.0 {
        return false;
    }
    let norm = norm_sq.sqrt();
    for x in vector.iter_mut() {
        *x /= norm;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        assert!(l2_normalize(&mut v));
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_rejects_degenerate() {
        let mut zero = vec![0.0, 0.0];
        assert!(!l2_normalize(&mut zero));
        let mut nan = vec![f32::NAN, 1.0];
        assert!(!l2_normalize(&mut nan));
    }
}
