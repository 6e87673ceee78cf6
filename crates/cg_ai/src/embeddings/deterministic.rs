use cg_core::error::AppError;

use super::Embedder;

/// Deterministic byte-histogram embedder.
///
/// Not a semantic model: it exists so the pipeline runs (and tests run)
/// without an embedding service, with fully reproducible vectors.
/// Vectors are L2-normalized so inner product equals cosine similarity.
#[derive(Debug, Clone)]
pub struct DeterministicEmbedder {
    dims: usize,
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self { dims: 384 }
    }
}

impl DeterministicEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

impl Embedder for DeterministicEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut v = vec![0.0f32; self.dims];
        for (i, byte) in input.bytes().enumerate() {
            v[(i + byte as usize) % self.dims] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            v[0] = 1.0;
            return Ok(v);
        }
        for x in v.iter_mut() {
            *x /= norm;
        }
        Ok(v)
    }
}
