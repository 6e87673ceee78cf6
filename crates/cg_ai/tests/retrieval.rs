use cg_ai::corpus::CorpusStore;
use cg_ai::embeddings::Embedder;
use cg_ai::index::{build_index, EmbeddingIndex};
use cg_ai::retrieve::retrieve;
use cg_core::domain::SourceDocument;
use cg_core::error::AppError;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Counts two keyword axes so tests control cosine ranking exactly.
struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut v = vec![0.0f32, 0.0, 1.0];
        for word in input.split_whitespace() {
            match word {
                "alpha" => v[0] += 1.0,
                "beta" => v[1] += 1.0,
                _ => {}
            }
        }
        Ok(v)
    }
}

/// Maps every input to the same vector, forcing score ties.
struct ConstantEmbedder;

impl Embedder for ConstantEmbedder {
    fn embed(&self, _model: &str, _input: &str) -> Result<Vec<f32>, AppError> {
        Ok(vec![1.0, 0.0])
    }
}

fn corpus_with(docs: &[(&str, String)]) -> (TempDir, CorpusStore) {
    let dir = TempDir::new().expect("tempdir");
    let store = CorpusStore::open(dir.path().to_path_buf());
    for (id, text) in docs {
        store
            .add_document(&SourceDocument::new(*id, *id).with_text(text.clone()))
            .expect("ingest");
        store.chunk_document(id, 400, 50).expect("chunk");
    }
    (dir, store)
}

#[test]
fn query_keywords_rank_the_matching_source_first() {
    let (_dir, store) = corpus_with(&[
        ("src-a", "alpha ".repeat(30)),
        ("src-b", "beta ".repeat(30)),
    ]);
    let embedder = KeywordEmbedder;
    let index = build_index(&store, &embedder, "any", None).expect("build");

    let hits = retrieve(&store, &index, &embedder, "any", "alpha", 2, None, 0.6).expect("retrieve");
    assert_eq!(hits[0].source_id, "src-a");
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn tied_scores_fall_back_to_offset_order() {
    let (_dir, store) = corpus_with(&[("src-a", "word ".repeat(200))]);
    let embedder = ConstantEmbedder;
    let index = build_index(&store, &embedder, "any", None).expect("build");

    // Identical windows dedup to one; disable dedup to see the full order.
    let hits = retrieve(&store, &index, &embedder, "any", "word", 5, None, 1.1).expect("retrieve");
    assert!(hits.len() > 1);
    let offsets: Vec<u32> = hits.iter().map(|h| h.chunk.offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted);
}

#[test]
fn near_duplicate_chunks_of_one_source_collapse() {
    // The 10-char unit divides both window starts and ends for 400/50
    // windows, so every window carries the identical word set.
    let (_dir, store) = corpus_with(&[("src-a", "alpha bet ".repeat(100))]);
    let embedder = ConstantEmbedder;
    let index = build_index(&store, &embedder, "any", None).expect("build");
    assert!(index.len() > 1);

    let hits = retrieve(&store, &index, &embedder, "any", "alpha", 5, None, 0.6).expect("retrieve");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.offset, 0);
}

#[test]
fn source_filter_restricts_the_evidence() {
    let (_dir, store) = corpus_with(&[
        ("src-a", "alpha ".repeat(30)),
        ("src-b", "beta ".repeat(30)),
    ]);
    let embedder = ConstantEmbedder;
    let index = build_index(&store, &embedder, "any", None).expect("build");

    let hits =
        retrieve(&store, &index, &embedder, "any", "anything", 5, Some("src-b"), 0.6).expect("retrieve");
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.source_id == "src-b"));
}

#[test]
fn empty_index_yields_no_evidence() {
    let (_dir, store) = corpus_with(&[("src-a", "alpha ".repeat(30))]);
    let embedder = KeywordEmbedder;
    let index = EmbeddingIndex::new();

    let hits = retrieve(&store, &index, &embedder, "any", "alpha", 5, None, 0.6).expect("retrieve");
    assert!(hits.is_empty());
}

#[test]
fn blank_query_is_rejected() {
    let (_dir, store) = corpus_with(&[("src-a", "alpha ".repeat(30))]);
    let embedder = KeywordEmbedder;
    let index = build_index(&store, &embedder, "any", None).expect("build");

    let err = retrieve(&store, &index, &embedder, "any", "   ", 5, None, 0.6).expect_err("blank");
    assert_eq!(err.code, "RETRIEVAL_FAILED");
}

#[test]
fn retrieval_is_reproducible() {
    let (_dir, store) = corpus_with(&[
        ("src-a", "alpha beta ".repeat(40)),
        ("src-b", "beta alpha ".repeat(40)),
    ]);
    let embedder = KeywordEmbedder;
    let index = build_index(&store, &embedder, "any", None).expect("build");

    let first = retrieve(&store, &index, &embedder, "any", "alpha beta", 4, None, 0.6).expect("one");
    let second = retrieve(&store, &index, &embedder, "any", "alpha beta", 4, None, 0.6).expect("two");
    assert_eq!(first, second);
}
