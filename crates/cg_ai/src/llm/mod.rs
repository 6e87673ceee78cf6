mod ollama_llm;

pub use ollama_llm::OllamaLlm;

use cg_core::error::AppError;

/// Text generation seam. Production uses Ollama; tests substitute a
/// scripted implementation.
pub trait Llm {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError>;
}
