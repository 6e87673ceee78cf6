use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Bibliographic identity of one ingested source. Immutable once ingested.
///
/// `container_title`, `volume` and `pages` support journal-style IEEE
/// entries; `raw_text` is the extracted full text supplied by the
/// ingestion collaborator and is dropped from the catalog after chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDocument {
    pub source_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub publisher: Option<String>,
    pub container_title: Option<String>,
    pub volume: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub raw_text: Option<String>,
}

impl SourceDocument {
    pub fn new(source_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            authors: Vec::new(),
            year: None,
            publisher: None,
            container_title: None,
            volume: None,
            pages: None,
            doi: None,
            raw_text: None,
        }
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = Some(text.into());
        self
    }

    /// Strip the full text, keeping only bibliographic metadata.
    pub fn metadata_only(&self) -> SourceDocument {
        let mut doc = self.clone();
        doc.raw_text = None;
        doc
    }
}

/// Lookup relation `source_id -> SourceDocument`.
///
/// Markers never hold live references to documents; resolution always
/// goes through this map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCatalog {
    documents: BTreeMap<String, SourceDocument>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc: SourceDocument) {
        self.documents.insert(doc.source_id.clone(), doc);
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceDocument> {
        self.documents.get(source_id)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.documents.contains_key(source_id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &String> {
        self.documents.keys()
    }

    pub fn save(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            AppError::new("CATALOG_STORE_FAILED", "Failed to encode source catalog")
                .with_details(e.to_string())
        })
    }

    pub fn load(blob: &str) -> Result<Self, AppError> {
        serde_json::from_str(blob).map_err(|e| {
            AppError::new("CATALOG_STORE_FAILED", "Failed to decode source catalog")
                .with_details(e.to_string())
        })
    }
}
