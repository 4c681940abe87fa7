// src/storage/mod.rs
//! Corpus persistence boundary.
//!
//! The engine never touches storage. A run loads once, optionally
//! checkpoints the session while it works, and persists once at the end.

pub mod csv_store;
pub mod memory;

use std::path::PathBuf;

use thiserror::Error;

use crate::record::NoticeRecord;

pub use csv_store::CsvCorpusStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// What `load` found: the persisted corpus and, separately, the records an
/// interrupted run had checkpointed but never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedCorpus {
    pub persisted: Vec<NoticeRecord>,
    pub resumed: Vec<NoticeRecord>,
}

impl LoadedCorpus {
    pub fn len(&self) -> usize {
        self.persisted.len() + self.resumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persisted records followed by resumed ones.
    pub fn into_records(self) -> Vec<NoticeRecord> {
        let mut out = self.persisted;
        out.extend(self.resumed);
        out
    }
}

#[async_trait::async_trait]
pub trait CorpusStore: Send + Sync {
    async fn load(&self) -> Result<LoadedCorpus, StorageError>;

    /// Replace the checkpoint with `pending`: every record accepted since the
    /// last persist, resumed ones included.
    async fn checkpoint(&self, pending: &[NoticeRecord]) -> Result<(), StorageError>;

    /// Replace the stored corpus with `corpus` and drop any checkpoint.
    async fn persist(&self, corpus: &[NoticeRecord]) -> Result<(), StorageError>;
}
