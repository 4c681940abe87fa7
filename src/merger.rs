// src/merger.rs
//! # Corpus Merger
//! Owns `persisted` (loaded at run start) and `session` (accepted this run).
//! Every candidate is judged against both; unique ones join `session`.
//! The final corpus is `persisted` followed by `session`; nothing already
//! accepted is rewritten or removed.

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::engine::{ensure_metrics_described, Decision, DecisionEngine, MatchKind};
use crate::record::NoticeRecord;

/// Per-run tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub offered: usize,
    pub accepted: usize,
    pub duplicates_by_key: usize,
    pub duplicates_by_similarity: usize,
    pub undated: usize,
}

impl MergeStats {
    pub fn duplicates(&self) -> usize {
        self.duplicates_by_key + self.duplicates_by_similarity
    }
}

/// Stable sort into merge order: newest first, undated last.
pub fn sort_batch(records: &mut [NoticeRecord]) {
    // `Reverse(None)` sorts after every `Reverse(Some(_))`.
    records.sort_by_cached_key(|r| std::cmp::Reverse(r.published_date()));
}

pub struct CorpusMerger {
    engine: DecisionEngine,
    persisted: Corpus,
    session: Corpus,
    checkpoint_every: usize,
    since_checkpoint: usize,
    stats: MergeStats,
}

impl CorpusMerger {
    pub fn new(engine: DecisionEngine, persisted: Vec<NoticeRecord>, checkpoint_every: usize) -> Self {
        let persisted = engine.corpus_from(persisted);
        let session = engine.empty_corpus();
        Self {
            engine,
            persisted,
            session,
            checkpoint_every,
            since_checkpoint: 0,
            stats: MergeStats::default(),
        }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn persisted(&self) -> &Corpus {
        &self.persisted
    }

    pub fn session(&self) -> &Corpus {
        &self.session
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Judge one candidate; a `Unique` verdict appends it to the session.
    pub fn offer(&mut self, candidate: NoticeRecord) -> Decision {
        let entry = self.engine.prepare(candidate);
        let decision = self
            .engine
            .evaluate_entry(&entry, &self.session, &self.persisted);

        self.stats.offered += 1;
        if entry.date().is_none() {
            self.stats.undated += 1;
        }
        match decision.matched.as_ref().map(|m| m.kind) {
            Some(MatchKind::ExactKey) => self.stats.duplicates_by_key += 1,
            Some(MatchKind::Similar { .. }) => self.stats.duplicates_by_similarity += 1,
            None => {
                self.session.push(entry);
                self.stats.accepted += 1;
                self.since_checkpoint += 1;
            }
        }
        decision
    }

    /// Offer a batch in merge order (see [`sort_batch`]).
    pub fn offer_batch(&mut self, mut batch: Vec<NoticeRecord>) -> Vec<Decision> {
        sort_batch(&mut batch);
        batch.into_iter().map(|r| self.offer(r)).collect()
    }

    /// True once `checkpoint_every` records were accepted since the last checkpoint.
    pub fn checkpoint_due(&self) -> bool {
        self.checkpoint_every > 0 && self.since_checkpoint >= self.checkpoint_every
    }

    pub fn mark_checkpointed(&mut self) {
        ensure_metrics_described();
        counter!("dedup_checkpoints_total").increment(1);
        info!(
            target: "dedup::merger",
            session = self.session.len(),
            "session checkpointed"
        );
        self.since_checkpoint = 0;
    }

    /// Records accepted since the last persist: the trailing `resumed`
    /// persisted entries (carried over from an interrupted run) and the session.
    pub fn pending_records(&self, resumed: usize) -> Vec<NoticeRecord> {
        let skip = self.persisted.len().saturating_sub(resumed);
        self.persisted
            .records()
            .skip(skip)
            .chain(self.session.records())
            .cloned()
            .collect()
    }

    /// `persisted ∪ session`, persisted first.
    pub fn finish(self) -> Vec<NoticeRecord> {
        debug!(
            target: "dedup::merger",
            persisted = self.persisted.len(),
            session = self.session.len(),
            "merging corpora"
        );
        let mut out = self.persisted.into_records();
        out.extend(self.session.into_records());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineSettings, Verdict};

    fn merger(persisted: Vec<NoticeRecord>, batch: &[NoticeRecord], every: usize) -> CorpusMerger {
        let titles: Vec<&str> = persisted
            .iter()
            .chain(batch.iter())
            .map(|r| r.title.as_str())
            .collect();
        let engine = DecisionEngine::fit(EngineSettings::default(), titles);
        CorpusMerger::new(engine, persisted, every)
    }

    #[test]
    fn sort_batch_is_stable_and_puts_undated_last() {
        let mut v = vec![
            NoticeRecord::new("a", "2025.05.01"),
            NoticeRecord::new("b", "미정"),
            NoticeRecord::new("c", "2025.06.01"),
            NoticeRecord::new("d", "2025-05-01"),
        ];
        sort_batch(&mut v);
        let order: Vec<&str> = v.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn same_notice_from_two_collectors_is_accepted_once() {
        let batch = vec![
            NoticeRecord::new("학사 일정 변경 안내", "2025.06.03").with_link("https://a.example/1"),
            NoticeRecord::new("학사 일정 변경 안내", "2025.06.03").with_link("https://b.example/9"),
        ];
        let mut m = merger(vec![], &batch, 0);
        let decisions = m.offer_batch(batch);
        assert_eq!(decisions[0].verdict, Verdict::Unique);
        assert_eq!(decisions[1].verdict, Verdict::Duplicate);
        assert_eq!(m.stats().accepted, 1);
        assert_eq!(m.stats().duplicates_by_key, 1);
    }

    #[test]
    fn finish_keeps_persisted_first_and_untouched() {
        let persisted = vec![NoticeRecord::new("기존 공지", "2025.01.01").with_body("원문")];
        let batch = vec![NoticeRecord::new("새 공지", "2025.06.01")];
        let mut m = merger(persisted.clone(), &batch, 0);
        m.offer_batch(batch);
        let out = m.finish();
        assert_eq!(out[0], persisted[0]);
        assert_eq!(out[1].title, "새 공지");
    }

    #[test]
    fn checkpoint_due_counts_accepted_records_only() {
        let batch = vec![
            NoticeRecord::new("하나", "2025.06.03"),
            NoticeRecord::new("하나", "2025.06.03"),
            NoticeRecord::new("둘째 공지", "2025.06.02"),
        ];
        let mut m = merger(vec![], &batch, 2);
        m.offer(batch[0].clone());
        m.offer(batch[1].clone());
        assert!(!m.checkpoint_due());
        m.offer(batch[2].clone());
        assert!(m.checkpoint_due());
        m.mark_checkpointed();
        assert!(!m.checkpoint_due());
    }

    #[test]
    fn zero_disables_checkpoints() {
        let batch = vec![NoticeRecord::new("하나", "2025.06.03")];
        let mut m = merger(vec![], &batch, 0);
        m.offer_batch(batch);
        assert!(!m.checkpoint_due());
    }
}
