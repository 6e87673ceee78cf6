use std::collections::BTreeMap;

use cg_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::corpus::CorpusStore;
use crate::embeddings::Embedder;
use crate::retrieve::similarity::{cosine_similarity, l2_norm};

/// Exact nearest-neighbor index over chunk embeddings.
///
/// Flat cosine scan: O(n) per query, which is fine at thesis-corpus
/// scale (a few thousand chunks). Insertion is incremental; the first
/// vector fixes the dimensionality. Build is exclusive (`&mut`),
/// queries are shared-read (`&self`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingIndex {
    dims: Option<u32>,
    vectors: BTreeMap<String, Vec<f32>>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dims(&self) -> Option<u32> {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.vectors.contains_key(chunk_id)
    }

    /// Insert or replace one chunk vector.
    pub fn add(&mut self, chunk_id: &str, vector: Vec<f32>) -> Result<(), AppError> {
        let this_dims = vector.len() as u32;
        match self.dims {
            Some(d) if d != this_dims => {
                return Err(AppError::new(
                    "INDEX_DIMS_MISMATCH",
                    "Vector dimension does not match the index",
                )
                .with_details(format!("expected={d}; got={this_dims}; chunk_id={chunk_id}")));
            }
            Some(_) => {}
            None => self.dims = Some(this_dims),
        }
        self.vectors.insert(chunk_id.to_string(), vector);
        Ok(())
    }

    /// Rank all stored vectors against the query by cosine similarity.
    ///
    /// Deterministic: score descending, chunk_id ascending on ties.
    /// An empty index returns an empty ranking.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>, AppError> {
        if self.vectors.is_empty() {
            return Ok(Vec::new());
        }
        let dims = self.dims.unwrap_or(0);
        if query.len() as u32 != dims {
            return Err(AppError::new(
                "INDEX_DIMS_MISMATCH",
                "Query embedding dimension does not match the index",
            )
            .with_details(format!("index_dims={dims}; query_dims={}", query.len())));
        }
        let qnorm = l2_norm(query);
        if qnorm == 0.0 {
            return Err(AppError::new(
                "INDEX_QUERY_INVALID",
                "Query embedding norm is zero",
            ));
        }

        let mut hits: Vec<(String, f32)> = Vec::new();
        for (chunk_id, v) in self.vectors.iter() {
            let vnorm = l2_norm(v);
            if vnorm == 0.0 {
                continue;
            }
            hits.push((chunk_id.clone(), cosine_similarity(query, v, qnorm, vnorm)));
        }
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Persistence collaborator contract: opaque blob out, same state in.
    pub fn save(&self) -> Result<String, AppError> {
        serde_json::to_string(self).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to encode embedding index")
                .with_details(e.to_string())
        })
    }

    pub fn load(blob: &str) -> Result<Self, AppError> {
        let index: EmbeddingIndex = serde_json::from_str(blob).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to decode embedding index")
                .with_details(e.to_string())
        })?;
        if let Some(d) = index.dims {
            for (chunk_id, v) in index.vectors.iter() {
                if v.len() as u32 != d {
                    return Err(AppError::new(
                        "INDEX_DIMS_MISMATCH",
                        "Stored vector dimension does not match the index",
                    )
                    .with_details(format!("chunk_id={chunk_id}; expected={d}; got={}", v.len())));
                }
            }
        }
        Ok(index)
    }
}

/// Embed every chunk of the corpus (or one source) into a fresh index.
///
/// Chunks are embedded in stable list order and inserted serially so
/// the resulting index is deterministic. Embedding itself is stateless
/// per chunk; callers may fan it out and serialize only the `add`s.
pub fn build_index(
    corpus: &CorpusStore,
    embedder: &dyn Embedder,
    model: &str,
    source_id: Option<&str>,
) -> Result<EmbeddingIndex, AppError> {
    let chunks = corpus.list_chunks(source_id)?;
    if chunks.is_empty() {
        return Err(AppError::new(
            "INDEX_NOT_READY",
            "No chunks available; chunk documents before building the index",
        ));
    }
    let mut index = EmbeddingIndex::new();
    for chunk in chunks.iter() {
        let v = embedder.embed(model, &chunk.text).map_err(|e| {
            AppError::new("EMBEDDINGS_FAILED", "Failed to compute chunk embedding")
                .with_details(format!("chunk_id={}; err={}", chunk.chunk_id, e))
                .with_retryable(e.retryable)
        })?;
        index.add(&chunk.chunk_id, v)?;
    }
    Ok(index)
}
