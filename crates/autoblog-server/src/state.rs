//! Highlight records held by the interactions service.
//!
//! Records are append-only. With a data file configured, the full record
//! list is rewritten after every append and read back at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use autoblog_engine::{Highlight, HighlightId};
use tokio::sync::RwLock;

use crate::error::StorageError;

#[derive(Debug, Default)]
pub struct InteractionStore {
    records: RwLock<Vec<Highlight>>,
    data_path: Option<PathBuf>,
}

impl InteractionStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Store backed by `data_path`. A missing file starts an empty store.
    pub async fn open(data_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_path = data_path.into();
        let records = match tokio::fs::read(&data_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
                path: data_path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(StorageError::Io {
                    path: data_path,
                    source,
                });
            }
        };

        log::info!(
            "loaded {} highlights from {}",
            records.len(),
            data_path.display()
        );
        Ok(Self {
            records: RwLock::new(records),
            data_path: Some(data_path),
        })
    }

    pub fn data_path(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }

    /// Highlights on `slug`, oldest first; ties keep insertion order.
    pub async fn list(&self, slug: &str) -> Vec<Highlight> {
        let records = self.records.read().await;
        let mut highlights: Vec<Highlight> = records
            .iter()
            .filter(|highlight| highlight.article_slug == slug)
            .cloned()
            .collect();
        highlights.sort_by_key(|highlight| highlight.created_at);
        highlights
    }

    /// Append a highlight and return it as stored.
    ///
    /// The caller's id is kept unless it is empty or already used on the
    /// same post, in which case a fresh one is assigned. If the data file
    /// cannot be written the record is dropped again.
    pub async fn append(&self, mut highlight: Highlight) -> Result<Highlight, StorageError> {
        let mut records = self.records.write().await;

        let taken = records.iter().any(|existing| {
            existing.article_slug == highlight.article_slug && existing.id == highlight.id
        });
        if highlight.id.is_empty() || taken {
            let assigned = HighlightId::generate();
            log::info!(
                "assigning id {assigned} to highlight on '{}' (client sent '{}')",
                highlight.article_slug,
                highlight.id
            );
            highlight.id = assigned;
        }

        records.push(highlight.clone());
        if let Err(err) = self.persist(&records).await {
            records.pop();
            return Err(err);
        }
        Ok(highlight)
    }

    async fn persist(&self, records: &[Highlight]) -> Result<(), StorageError> {
        let Some(path) = &self.data_path else {
            return Ok(());
        };
        let io_error = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(records).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await.map_err(io_error)?;
        tokio::fs::rename(&staging, path).await.map_err(io_error)?;
        Ok(())
    }
}

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<InteractionStore>,
}

impl AppState {
    pub fn new(store: InteractionStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(InteractionStore::in_memory())
    }
}
