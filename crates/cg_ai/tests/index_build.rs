use cg_ai::corpus::CorpusStore;
use cg_ai::embeddings::DeterministicEmbedder;
use cg_ai::index::{build_index, EmbeddingIndex};
use cg_core::domain::SourceDocument;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn first_vector_fixes_the_dimensionality() {
    let mut index = EmbeddingIndex::new();
    assert_eq!(index.dims(), None);
    index.add("c1", vec![1.0, 0.0, 0.0]).expect("add");
    assert_eq!(index.dims(), Some(3));

    let err = index.add("c2", vec![1.0, 0.0]).expect_err("mismatch");
    assert_eq!(err.code, "INDEX_DIMS_MISMATCH");
    assert_eq!(index.len(), 1);
}

#[test]
fn search_is_deterministic_with_tied_scores() {
    let mut index = EmbeddingIndex::new();
    index.add("c-b", vec![1.0, 0.0]).expect("add");
    index.add("c-a", vec![1.0, 0.0]).expect("add");
    index.add("c-c", vec![0.0, 1.0]).expect("add");

    let hits = index.search(&[1.0, 0.0], 3).expect("search");
    assert_eq!(hits[0].0, "c-a");
    assert_eq!(hits[1].0, "c-b");
    assert_eq!(hits[2].0, "c-c");
    assert!(hits[0].1 > hits[2].1);
}

#[test]
fn empty_index_returns_empty_ranking() {
    let index = EmbeddingIndex::new();
    let hits = index.search(&[1.0, 0.0], 5).expect("search");
    assert!(hits.is_empty());
}

#[test]
fn zero_norm_query_is_rejected() {
    let mut index = EmbeddingIndex::new();
    index.add("c1", vec![1.0, 0.0]).expect("add");
    let err = index.search(&[0.0, 0.0], 5).expect_err("zero query");
    assert_eq!(err.code, "INDEX_QUERY_INVALID");
}

#[test]
fn query_dims_must_match_the_index() {
    let mut index = EmbeddingIndex::new();
    index.add("c1", vec![1.0, 0.0, 0.0]).expect("add");
    let err = index.search(&[1.0, 0.0], 5).expect_err("dims");
    assert_eq!(err.code, "INDEX_DIMS_MISMATCH");
}

#[test]
fn save_load_round_trip_preserves_the_index() {
    let mut index = EmbeddingIndex::new();
    index.add("c1", vec![0.6, 0.8]).expect("add");
    index.add("c2", vec![0.8, 0.6]).expect("add");

    let blob = index.save().expect("save");
    let loaded = EmbeddingIndex::load(&blob).expect("load");
    assert_eq!(loaded, index);
    assert_eq!(
        loaded.search(&[1.0, 0.0], 2).expect("search"),
        index.search(&[1.0, 0.0], 2).expect("search"),
    );
}

#[test]
fn build_index_covers_every_chunk() {
    let dir = TempDir::new().expect("tempdir");
    let store = CorpusStore::open(dir.path().to_path_buf());
    store
        .add_document(&SourceDocument::new("src-a", "A").with_text("alpha beta ".repeat(50)))
        .expect("ingest");
    let chunks = store.chunk_document("src-a", 200, 40).expect("chunk");

    let embedder = DeterministicEmbedder::new(64);
    let index = build_index(&store, &embedder, "any", None).expect("build");
    assert_eq!(index.len(), chunks.len());
    assert_eq!(index.dims(), Some(64));
    for chunk in chunks.iter() {
        assert!(index.contains(&chunk.chunk_id));
    }
}

#[test]
fn build_index_without_chunks_fails() {
    let dir = TempDir::new().expect("tempdir");
    let store = CorpusStore::open(dir.path().to_path_buf());
    let embedder = DeterministicEmbedder::new(64);
    let err = build_index(&store, &embedder, "any", None).expect_err("no chunks");
    assert_eq!(err.code, "INDEX_NOT_READY");
}
