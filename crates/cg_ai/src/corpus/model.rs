use serde::{Deserialize, Serialize};

/// A bounded span of source text with provenance, the unit of embedding
/// and retrieval. Owned by exactly one source document; destroyed and
/// replaced when the document is re-chunked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_id: String,
    pub source_id: String,
    /// Byte offset of the window start within the document text.
    pub offset: u32,
    /// Page the window starts on, when the ingested text carries page
    /// breaks (form feeds); `None` otherwise.
    pub page: Option<u32>,
    pub text: String,
    pub text_sha256: String,
}

/// Corpus bookkeeping written after ingest/chunking passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusStatus {
    pub document_count: u32,
    pub chunk_count: u32,
    pub updated_at: Option<String>,
}
