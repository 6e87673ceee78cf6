use cg_core::error::AppError;

/// Embedding computation seam. Implementations must be stateless per
/// call so chunk embedding can fan out across workers.
pub trait Embedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

pub mod deterministic;
pub mod ollama_embed;

pub use deterministic::DeterministicEmbedder;
pub use ollama_embed::OllamaEmbedder;
