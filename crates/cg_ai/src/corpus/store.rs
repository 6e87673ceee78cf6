use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cg_core::domain::{SourceCatalog, SourceDocument};
use cg_core::error::AppError;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::chunking::window_chunks;
use super::model::{Chunk, CorpusStatus};

/// Filesystem-backed store for ingested documents and their chunks.
///
/// Layout under the root: `catalog.json` (bibliographic metadata),
/// `sources/<id>.txt` (normalized full text), `chunks/<id>.json`,
/// `chunks_by_source.json`, `corpus_status.json`. All writes go through
/// a tmp file and rename.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    root: PathBuf,
}

impl CorpusStore {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn catalog_path(&self) -> PathBuf {
        self.root.join("catalog.json")
    }

    fn sources_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }

    fn chunks_by_source_path(&self) -> PathBuf {
        self.root.join("chunks_by_source.json")
    }

    fn status_path(&self) -> PathBuf {
        self.root.join("corpus_status.json")
    }

    fn chunk_path(&self, chunk_id: &str) -> PathBuf {
        self.chunks_dir().join(format!("{chunk_id}.json"))
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [self.root.clone(), self.sources_dir(), self.chunks_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                AppError::new("CORPUS_STORE_FAILED", "Failed to create corpus directory")
                    .with_details(format!("path={}; err={}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| {
            AppError::new("CORPUS_STORE_FAILED", "Failed to encode corpus record")
                .with_details(e.to_string())
        })?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json.as_bytes()).map_err(|e| {
            AppError::new("CORPUS_STORE_FAILED", "Failed to write corpus record")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            AppError::new("CORPUS_STORE_FAILED", "Failed to finalize corpus record write")
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
        })?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, AppError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path).map_err(|e| {
            AppError::new("CORPUS_STORE_FAILED", "Failed to read corpus record")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| {
                AppError::new("CORPUS_STORE_FAILED", "Failed to decode corpus record")
                    .with_details(format!("path={}; err={}", path.display(), e))
            })
    }

    pub fn catalog(&self) -> Result<SourceCatalog, AppError> {
        self.ensure_dirs()?;
        Ok(self
            .read_json::<SourceCatalog>(&self.catalog_path())?
            .unwrap_or_default())
    }

    fn read_chunks_by_source(&self) -> Result<BTreeMap<String, Vec<String>>, AppError> {
        Ok(self
            .read_json::<BTreeMap<String, Vec<String>>>(&self.chunks_by_source_path())?
            .unwrap_or_default())
    }

    pub fn status(&self) -> Result<CorpusStatus, AppError> {
        self.ensure_dirs()?;
        Ok(self
            .read_json::<CorpusStatus>(&self.status_path())?
            .unwrap_or(CorpusStatus {
                document_count: 0,
                chunk_count: 0,
                updated_at: None,
            }))
    }

    fn touch_status(&self) -> Result<(), AppError> {
        let catalog = self.catalog()?;
        let map = self.read_chunks_by_source()?;
        let chunk_count = map.values().map(|v| v.len() as u32).sum();
        let updated_at = OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
            AppError::new("CORPUS_STORE_FAILED", "Failed to format status timestamp")
                .with_details(e.to_string())
        })?;
        self.write_json(
            &self.status_path(),
            &CorpusStatus {
                document_count: catalog.len() as u32,
                chunk_count,
                updated_at: Some(updated_at),
            },
        )
    }

    /// Record one ingested document: catalog metadata plus normalized
    /// full text. The ingestion collaborator supplies `raw_text`; an
    /// empty text is refused rather than silently producing zero chunks.
    pub fn add_document(&self, doc: &SourceDocument) -> Result<(), AppError> {
        self.ensure_dirs()?;
        if doc.source_id.trim().is_empty() {
            return Err(AppError::new("INGEST_INVALID", "Document source_id is required"));
        }
        let text = doc.raw_text.as_deref().unwrap_or("");
        if text.trim().is_empty() {
            return Err(AppError::new("INGEST_EMPTY", "Document text is empty")
                .with_details(format!("source_id={}", doc.source_id)));
        }

        let normalized = normalize_text(text);
        let text_path = self.sources_dir().join(format!("{}.txt", doc.source_id));
        fs::write(&text_path, normalized.as_bytes()).map_err(|e| {
            AppError::new("CORPUS_STORE_FAILED", "Failed to write document text")
                .with_details(format!("path={}; err={}", text_path.display(), e))
        })?;

        let mut catalog = self.catalog()?;
        catalog.insert(doc.metadata_only());
        self.write_json(&self.catalog_path(), &catalog)?;
        self.touch_status()
    }

    fn read_document_text(&self, source_id: &str) -> Result<String, AppError> {
        let path = self.sources_dir().join(format!("{source_id}.txt"));
        fs::read_to_string(&path).map_err(|e| {
            AppError::new("INGEST_INVALID", "Document has not been ingested")
                .with_details(format!("source_id={source_id}; err={e}"))
        })
    }

    fn delete_chunks(&self, chunk_ids: &[String]) -> Result<(), AppError> {
        for id in chunk_ids {
            let path = self.chunk_path(id);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    AppError::new("CORPUS_STORE_FAILED", "Failed to delete chunk file")
                        .with_details(format!("path={}; err={}", path.display(), e))
                })?;
            }
        }
        Ok(())
    }

    /// Re-chunk one document into overlapping windows, replacing any
    /// chunks from a previous pass.
    pub fn chunk_document(
        &self,
        source_id: &str,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<Vec<Chunk>, AppError> {
        self.ensure_dirs()?;
        let text = self.read_document_text(source_id)?;
        let drafts = window_chunks(&text, chunk_size, overlap)?;

        let mut map = self.read_chunks_by_source()?;
        if let Some(old) = map.get(source_id) {
            self.delete_chunks(old)?;
        }

        let mut chunks = Vec::with_capacity(drafts.len());
        let mut chunk_ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let text_sha256 = sha256_hex(draft.text.as_bytes());
            let id_input = format!("v1|{}|{}|{}", source_id, draft.offset, text_sha256);
            let chunk = Chunk {
                chunk_id: sha256_hex(id_input.as_bytes()),
                source_id: source_id.to_string(),
                offset: draft.offset,
                page: draft.page,
                text: draft.text,
                text_sha256,
            };
            self.write_json(&self.chunk_path(&chunk.chunk_id), &chunk)?;
            chunk_ids.push(chunk.chunk_id.clone());
            chunks.push(chunk);
        }
        map.insert(source_id.to_string(), chunk_ids);
        self.write_json(&self.chunks_by_source_path(), &map)?;
        self.touch_status()?;
        Ok(chunks)
    }

    pub fn get_chunk(&self, chunk_id: &str) -> Result<Chunk, AppError> {
        self.ensure_dirs()?;
        let path = self.chunk_path(chunk_id);
        let raw = fs::read_to_string(&path).map_err(|e| {
            AppError::new("CHUNK_NOT_FOUND", "Chunk not found")
                .with_details(format!("chunk_id={chunk_id}; err={e}"))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::new("CORPUS_STORE_FAILED", "Failed to decode chunk")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    /// All chunks, or one source's chunks, in stable order:
    /// source_id asc, offset asc, chunk_id asc.
    pub fn list_chunks(&self, source_id: Option<&str>) -> Result<Vec<Chunk>, AppError> {
        self.ensure_dirs()?;
        let map = self.read_chunks_by_source()?;
        let source_ids: Vec<String> = match source_id {
            Some(id) => vec![id.to_string()],
            None => map.keys().cloned().collect(),
        };

        let mut out = Vec::new();
        for sid in source_ids {
            let Some(ids) = map.get(&sid) else {
                continue;
            };
            for cid in ids {
                out.push(self.get_chunk(cid)?);
            }
        }
        out.sort_by(|a, b| {
            a.source_id
                .cmp(&b.source_id)
                .then(a.offset.cmp(&b.offset))
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        Ok(out)
    }
}

pub(crate) fn normalize_text(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}
