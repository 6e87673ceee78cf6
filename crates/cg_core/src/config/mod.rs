use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Pipeline-wide settings with sane defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Maximum characters per chunk window.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows so no sentence is
    /// fully orphaned at a boundary.
    pub chunk_overlap: usize,
    pub top_k: u32,
    /// Token-overlap (Jaccard) ratio at or above which two chunks of the
    /// same source count as the same evidence and are deduplicated
    /// during retrieval. 0.6 keeps adjacent overlapping windows apart
    /// while collapsing near-identical re-chunks.
    pub dedup_threshold: f32,
    pub embedding_model: String,
    pub generation_model: String,
    pub ollama_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            chunk_overlap: 100,
            top_k: 5,
            dedup_threshold: 0.6,
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "llama3".to_string(),
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.chunk_size == 0 {
            return Err(AppError::new("CONFIG_INVALID", "chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "chunk_overlap must be smaller than chunk_size",
            )
            .with_details(format!(
                "chunk_size={}; chunk_overlap={}",
                self.chunk_size, self.chunk_overlap
            )));
        }
        if !(0.0..=1.0).contains(&self.dedup_threshold) {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "dedup_threshold must be within 0.0..=1.0",
            )
            .with_details(format!("dedup_threshold={}", self.dedup_threshold)));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read settings file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let settings: Settings = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to decode settings file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            AppError::new("CONFIG_WRITE_FAILED", "Failed to encode settings")
                .with_details(e.to_string())
        })?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json.as_bytes()).map_err(|e| {
            AppError::new("CONFIG_WRITE_FAILED", "Failed to write settings file")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            AppError::new("CONFIG_WRITE_FAILED", "Failed to finalize settings write")
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
        })?;
        Ok(())
    }
}
