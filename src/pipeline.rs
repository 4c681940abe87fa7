// src/pipeline.rs
//! Run driver: load → merge → checkpoint → persist.
//!
//! Storage is touched only at the edges of the run (plus checkpoints);
//! candidate evaluation in between is plain synchronous code.

use serde::Serialize;
use tracing::{error, info};

use crate::config::DedupConfig;
use crate::engine::{DecisionEngine, EngineSettings};
use crate::merger::{CorpusMerger, MergeStats};
use crate::record::NoticeRecord;
use crate::storage::{CorpusStore, StorageError};

/// What one run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub persisted_before: usize,
    /// Records picked up from an interrupted run's checkpoint.
    pub resumed: usize,
    pub persisted_after: usize,
    pub checkpoints: usize,
    #[serde(flatten)]
    pub stats: MergeStats,
}

fn build_merger(persisted: Vec<NoticeRecord>, candidates: &[NoticeRecord], cfg: &DedupConfig) -> CorpusMerger {
    let titles = persisted
        .iter()
        .chain(candidates.iter())
        .map(|r| r.title.as_str());
    let engine = DecisionEngine::fit(EngineSettings::from(cfg), titles);
    CorpusMerger::new(engine, persisted, cfg.checkpoint_every)
}

/// Merge `candidates` into the stored corpus and write it back.
///
/// Any storage failure ends the run; the error log states how many accepted
/// session records were not saved. Records resumed from a checkpoint are
/// written into every later checkpoint until a persist succeeds.
pub async fn run_once<S>(
    store: &S,
    mut candidates: Vec<NoticeRecord>,
    cfg: &DedupConfig,
) -> Result<RunSummary, StorageError>
where
    S: CorpusStore + ?Sized,
{
    let loaded = store.load().await?;
    let persisted_before = loaded.len();
    let resumed = loaded.resumed.len();

    crate::merger::sort_batch(&mut candidates);
    let mut merger = build_merger(loaded.into_records(), &candidates, cfg);
    let mut checkpoints = 0usize;

    for candidate in candidates {
        merger.offer(candidate);
        if merger.checkpoint_due() {
            let pending = merger.pending_records(resumed);
            if let Err(e) = store.checkpoint(&pending).await {
                error!(
                    target: "dedup::pipeline",
                    error = %e,
                    unsaved = merger.session().len(),
                    "checkpoint failed; session records not saved"
                );
                return Err(e);
            }
            merger.mark_checkpointed();
            checkpoints += 1;
        }
    }

    let stats = merger.stats();
    let unsaved = merger.session().len();
    let corpus = merger.finish();
    if let Err(e) = store.persist(&corpus).await {
        error!(
            target: "dedup::pipeline",
            error = %e,
            unsaved,
            "persist failed; session records not saved"
        );
        return Err(e);
    }

    let summary = RunSummary {
        persisted_before,
        resumed,
        persisted_after: corpus.len(),
        checkpoints,
        stats,
    };
    info!(
        target: "dedup::pipeline",
        offered = stats.offered,
        accepted = stats.accepted,
        duplicates = stats.duplicates(),
        undated = stats.undated,
        corpus = summary.persisted_after,
        "dedup run finished"
    );
    Ok(summary)
}

/// One-shot dedup of a single record set against itself (empty history).
/// Returns the unique records in merge order.
pub fn dedup_records(records: Vec<NoticeRecord>, cfg: &DedupConfig) -> (Vec<NoticeRecord>, MergeStats) {
    let mut merger = build_merger(Vec::new(), &records, cfg);
    merger.offer_batch(records);
    let stats = merger.stats();
    (merger.finish(), stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn batch() -> Vec<NoticeRecord> {
        vec![
            NoticeRecord::new("2025 하계 공모전 안내", "2025-06-01"),
            NoticeRecord::new("2025 하계 공모전 안내!!", "2025-06-02"),
            NoticeRecord::new("장학금 신청 안내", "2025-05-01"),
        ]
    }

    #[test]
    fn dedup_records_drops_near_duplicate() {
        let (out, stats) = dedup_records(batch(), &DedupConfig::default());
        let titles: Vec<&str> = out.iter().map(|r| r.title.as_str()).collect();
        // merge order is newest first
        assert_eq!(titles, vec!["2025 하계 공모전 안내!!", "장학금 신청 안내"]);
        assert_eq!(stats.duplicates_by_similarity, 1);
    }

    #[tokio::test]
    async fn run_once_appends_and_clears_checkpoint() {
        let store = MemoryStore::with_records(vec![NoticeRecord::new("기존 공지", "2025.01.01")]);
        let cfg = DedupConfig {
            checkpoint_every: 1,
            ..DedupConfig::default()
        };
        let summary = run_once(&store, batch(), &cfg).await.unwrap();
        assert_eq!(summary.persisted_before, 1);
        assert_eq!(summary.persisted_after, 3);
        assert_eq!(summary.checkpoints, 2);
        assert_eq!(store.checkpoint_sizes(), vec![1, 2]);
        assert!(store.pending_checkpoint().is_none());
    }

    #[tokio::test]
    async fn persist_failure_is_returned() {
        let store = MemoryStore::failing_persist(vec![]);
        let err = run_once(&store, batch(), &DedupConfig::default()).await;
        assert!(matches!(err, Err(StorageError::Other(_))));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn checkpoint_failure_stops_before_persist() {
        let store = MemoryStore::failing_checkpoint(vec![NoticeRecord::new("기존 공지", "2025.01.01")]);
        let cfg = DedupConfig {
            checkpoint_every: 1,
            ..DedupConfig::default()
        };
        let err = run_once(&store, batch(), &cfg).await;
        assert!(matches!(err, Err(StorageError::Other(_))));
        assert_eq!(store.persist_attempts(), 0);
        assert_eq!(store.snapshot().len(), 1);
        assert!(store.pending_checkpoint().is_none());
    }

    #[tokio::test]
    async fn resumed_records_ride_along_in_later_checkpoints() {
        let store = MemoryStore::with_records(vec![NoticeRecord::new("기존 공지", "2025.01.01")]);
        *store.checkpoint.lock().unwrap() = Some(vec![NoticeRecord::new("이전 실행 공지", "2025.02.01")]);
        let cfg = DedupConfig {
            checkpoint_every: 1,
            ..DedupConfig::default()
        };
        let summary = run_once(&store, batch(), &cfg).await.unwrap();
        assert_eq!(summary.resumed, 1);
        assert_eq!(summary.persisted_before, 2);
        // resumed record plus one and then two session records
        assert_eq!(store.checkpoint_sizes(), vec![2, 3]);
        assert_eq!(store.snapshot().len(), 4);
    }
}
