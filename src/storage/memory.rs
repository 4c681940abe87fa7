// src/storage/memory.rs
// In-memory store for tests and dry runs.

use std::sync::Mutex;

use super::{CorpusStore, LoadedCorpus, StorageError};
use crate::record::NoticeRecord;

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub records: Mutex<Vec<NoticeRecord>>,
    /// Pending checkpoint, cleared by a successful persist.
    pub checkpoint: Mutex<Option<Vec<NoticeRecord>>>,
    /// Size of every checkpoint written, in order.
    pub checkpoint_calls: Mutex<Vec<usize>>,
    /// Number of `persist` attempts, failed ones included.
    pub persist_calls: Mutex<usize>,
    pub fail_persist: bool,
    pub fail_checkpoint: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<NoticeRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// A store whose `persist` always fails (checkpoints still succeed).
    pub fn failing_persist(records: Vec<NoticeRecord>) -> Self {
        Self {
            fail_persist: true,
            ..Self::with_records(records)
        }
    }

    /// A store whose `checkpoint` always fails.
    pub fn failing_checkpoint(records: Vec<NoticeRecord>) -> Self {
        Self {
            fail_checkpoint: true,
            ..Self::with_records(records)
        }
    }

    /// Same contents, persist failures switched off (the next run after an outage).
    pub fn recovered(self) -> Self {
        Self {
            fail_persist: false,
            fail_checkpoint: false,
            ..self
        }
    }

    pub fn snapshot(&self) -> Vec<NoticeRecord> {
        lock(&self.records).clone()
    }

    pub fn pending_checkpoint(&self) -> Option<Vec<NoticeRecord>> {
        lock(&self.checkpoint).clone()
    }

    pub fn checkpoint_sizes(&self) -> Vec<usize> {
        lock(&self.checkpoint_calls).clone()
    }

    pub fn persist_attempts(&self) -> usize {
        *lock(&self.persist_calls)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl CorpusStore for MemoryStore {
    async fn load(&self) -> Result<LoadedCorpus, StorageError> {
        Ok(LoadedCorpus {
            persisted: lock(&self.records).clone(),
            resumed: lock(&self.checkpoint).clone().unwrap_or_default(),
        })
    }

    async fn checkpoint(&self, pending: &[NoticeRecord]) -> Result<(), StorageError> {
        if self.fail_checkpoint {
            return Err(StorageError::Other("checkpoint disabled on this store".into()));
        }
        lock(&self.checkpoint_calls).push(pending.len());
        *lock(&self.checkpoint) = Some(pending.to_vec());
        Ok(())
    }

    async fn persist(&self, corpus: &[NoticeRecord]) -> Result<(), StorageError> {
        *lock(&self.persist_calls) += 1;
        if self.fail_persist {
            return Err(StorageError::Other("persist disabled on this store".into()));
        }
        *lock(&self.records) = corpus.to_vec();
        *lock(&self.checkpoint) = None;
        Ok(())
    }
}
