pub(crate) mod similarity;

use cg_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::corpus::{Chunk, CorpusStore};
use crate::embeddings::Embedder;
use crate::index::EmbeddingIndex;

pub use similarity::token_overlap;

const TOP_K_MIN: usize = 1;
const TOP_K_MAX: usize = 50;

/// One ranked piece of evidence handed to generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub source_id: String,
    pub score: f32,
}

/// Rank corpus chunks against a query and return the top evidence.
///
/// The ranking is fully deterministic: cosine score descending, then
/// chunk offset ascending, then chunk_id ascending. Near-duplicate
/// chunks of the same source (token overlap at or above
/// `dedup_threshold`) are collapsed to the highest-ranked one, so the
/// evidence set spans the corpus instead of repeating one passage.
/// An empty index yields an empty evidence set, not an error.
#[allow(clippy::too_many_arguments)]
pub fn retrieve(
    corpus: &CorpusStore,
    index: &EmbeddingIndex,
    embedder: &dyn Embedder,
    model: &str,
    query: &str,
    top_k: usize,
    source_filter: Option<&str>,
    dedup_threshold: f32,
) -> Result<Vec<RetrievedChunk>, AppError> {
    if query.trim().is_empty() {
        return Err(AppError::new(
            "RETRIEVAL_FAILED",
            "Query must not be empty",
        ));
    }
    if index.is_empty() {
        return Ok(Vec::new());
    }
    let top_k = top_k.clamp(TOP_K_MIN, TOP_K_MAX);

    let query_vec = embedder.embed(model, query).map_err(|e| {
        AppError::new("RETRIEVAL_FAILED", "Failed to embed query")
            .with_details(e.to_string())
            .with_retryable(e.retryable)
    })?;

    // Over-fetch so filtering and dedup still leave top_k candidates.
    let fetch = (top_k * 4).max(TOP_K_MAX);
    let hits = index.search(&query_vec, fetch)?;

    let mut candidates: Vec<RetrievedChunk> = Vec::new();
    for (chunk_id, score) in hits {
        let chunk = match corpus.get_chunk(&chunk_id) {
            Ok(c) => c,
            // Stale index entry; the chunk was re-windowed since the
            // index was built. Skip it rather than fail the query.
            Err(e) if e.code == "CHUNK_NOT_FOUND" => continue,
            Err(e) => return Err(e),
        };
        if let Some(filter) = source_filter {
            if chunk.source_id != filter {
                continue;
            }
        }
        let source_id = chunk.source_id.clone();
        candidates.push(RetrievedChunk { chunk, source_id, score });
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk.offset.cmp(&b.chunk.offset))
            .then(a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
    });

    let mut kept: Vec<RetrievedChunk> = Vec::new();
    for candidate in candidates {
        let duplicate = kept.iter().any(|k| {
            k.source_id == candidate.source_id
                && token_overlap(&k.chunk.text, &candidate.chunk.text) >= dedup_threshold
        });
        if duplicate {
            continue;
        }
        kept.push(candidate);
        if kept.len() == top_k {
            break;
        }
    }
    Ok(kept)
}
