// src/engine.rs
//! # Decision Engine
//! Per-candidate verdict: `Duplicate` or `Unique`.
//!
//! 1. Identity key present in session or persisted corpus → `Duplicate`
//!    (no window, no thresholds).
//! 2. Pruned comparison set, session first, then persisted.
//! 3. Per pair: `seq` first; below `seq` threshold the pair is skipped
//!    without computing `cos`. Otherwise `cos`; both at or above their
//!    thresholds → `Duplicate`, stop.
//! 4. Nothing matched → `Unique`.
//!
//! No I/O. A cosine failure on a pair is logged and scored `0.0`.

use chrono::NaiveDate;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{DedupConfig, ThresholdProfile};
use crate::corpus::{Corpus, Entry};
use crate::normalize::NormalizationPolicy;
use crate::prune::{eligible, Origin, UndatedFallback};
use crate::record::NoticeRecord;
use crate::similarity::{PairScores, Scorer};

/// One-time metrics registration (so series show up once a recorder is installed).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("dedup_candidates_total", "Candidates evaluated.");
        describe_counter!(
            "dedup_duplicates_total",
            "Candidates rejected as duplicates, by reason (key/similarity)."
        );
        describe_counter!("dedup_unique_total", "Candidates judged unique.");
        describe_counter!("dedup_pairs_scored_total", "Candidate pairs scored.");
        describe_counter!(
            "dedup_cosine_skipped_total",
            "Pairs settled by the sequence ratio alone."
        );
        describe_counter!(
            "dedup_undated_total",
            "Candidates whose date could not be parsed."
        );
        describe_counter!("dedup_checkpoints_total", "Session checkpoints written.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Duplicate,
    Unique,
}

/// Why a candidate was judged duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    ExactKey,
    Similar { seq: f64, cos: f64 },
}

impl MatchKind {
    pub fn label(&self) -> &'static str {
        match self {
            MatchKind::ExactKey => "key",
            MatchKind::Similar { .. } => "similarity",
        }
    }
}

/// The accepted record a duplicate verdict points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub origin: Origin,
    pub title: String,
    pub published: String,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<Match>,
}

impl Decision {
    pub fn unique() -> Self {
        Self {
            verdict: Verdict::Unique,
            matched: None,
        }
    }

    pub fn duplicate(origin: Origin, against: &Entry, kind: MatchKind) -> Self {
        Self {
            verdict: Verdict::Duplicate,
            matched: Some(Match {
                origin,
                title: against.record().title.clone(),
                published: against.record().published.clone(),
                kind,
            }),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.verdict == Verdict::Duplicate
    }
}

/// Everything the engine needs besides the corpora.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub thresholds: ThresholdProfile,
    pub window_days: u32,
    pub undated_fallback: UndatedFallback,
    pub normalization: NormalizationPolicy,
}

impl From<&DedupConfig> for EngineSettings {
    fn from(cfg: &DedupConfig) -> Self {
        Self {
            thresholds: cfg.thresholds.clone(),
            window_days: cfg.window_days,
            undated_fallback: cfg.undated_fallback,
            normalization: cfg.normalization,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&DedupConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    settings: EngineSettings,
    scorer: Scorer,
}

impl DecisionEngine {
    pub fn new(settings: EngineSettings, scorer: Scorer) -> Self {
        Self { settings, scorer }
    }

    /// Fit the scorer over the similarity form of `titles` and build the engine.
    pub fn fit<'a, I>(settings: EngineSettings, titles: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let policy = settings.normalization;
        let scorer = Scorer::fit(titles.into_iter().map(|t| policy.similarity_title(t)));
        Self::new(settings, scorer)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// An empty corpus using this engine's normalization.
    pub fn empty_corpus(&self) -> Corpus {
        Corpus::new(self.settings.normalization)
    }

    pub fn corpus_from<I>(&self, records: I) -> Corpus
    where
        I: IntoIterator<Item = NoticeRecord>,
    {
        Corpus::from_records(records, self.settings.normalization)
    }

    pub fn prepare(&self, record: NoticeRecord) -> Entry {
        Entry::new(record, &self.settings.normalization)
    }

    /// `evaluate(candidate, session, persisted)` with this engine's profile and window.
    pub fn evaluate(&self, candidate: &NoticeRecord, session: &Corpus, persisted: &Corpus) -> Decision {
        let entry = self.prepare(candidate.clone());
        self.evaluate_entry(&entry, session, persisted)
    }

    pub fn evaluate_entry(&self, candidate: &Entry, session: &Corpus, persisted: &Corpus) -> Decision {
        ensure_metrics_described();
        debug_assert_eq!(session.policy(), &self.settings.normalization);
        debug_assert_eq!(persisted.policy(), &self.settings.normalization);
        counter!("dedup_candidates_total").increment(1);

        let decision = self.decide(candidate, session, persisted);
        match &decision.matched {
            Some(m) => {
                counter!("dedup_duplicates_total", "reason" => m.kind.label()).increment(1);
                debug!(
                    target: "dedup::engine",
                    title = %candidate.record().title,
                    against = %m.title,
                    origin = m.origin.as_str(),
                    reason = m.kind.label(),
                    "duplicate"
                );
            }
            None => counter!("dedup_unique_total").increment(1),
        }
        decision
    }

    fn decide(&self, candidate: &Entry, session: &Corpus, persisted: &Corpus) -> Decision {
        let corpora = [(Origin::Session, session), (Origin::Persisted, persisted)];

        // 1) Exact key, unrestricted by window
        for (origin, corpus) in corpora {
            if let Some(hit) = corpus.find_key(candidate.key()) {
                return Decision::duplicate(origin, hit, MatchKind::ExactKey);
            }
        }

        // 2) + 3) Pruned similarity scan
        let date = candidate.date();
        if date.is_none() {
            self.note_undated(candidate);
        }
        for (origin, corpus) in corpora {
            for other in self.comparison_set(corpus, origin, date) {
                if let Some(scores) = self.near_duplicate(candidate.title(), other.title()) {
                    return Decision::duplicate(
                        origin,
                        other,
                        MatchKind::Similar {
                            seq: scores.seq,
                            cos: scores.cos,
                        },
                    );
                }
            }
        }

        // 4)
        Decision::unique()
    }

    fn comparison_set<'c>(
        &self,
        corpus: &'c Corpus,
        origin: Origin,
        date: Option<NaiveDate>,
    ) -> impl Iterator<Item = &'c Entry> {
        eligible(
            corpus,
            origin,
            date,
            self.settings.window_days,
            self.settings.undated_fallback,
        )
    }

    fn note_undated(&self, candidate: &Entry) {
        counter!("dedup_undated_total").increment(1);
        warn!(
            target: "dedup::engine",
            title = %candidate.record().title,
            published = %candidate.record().published,
            fallback = ?self.settings.undated_fallback,
            "unparseable date; window pruning disabled for this candidate"
        );
    }

    /// Step 3 on one pair of normalized titles. `Some(scores)` when duplicate.
    pub fn near_duplicate(&self, a: &str, b: &str) -> Option<PairScores> {
        counter!("dedup_pairs_scored_total").increment(1);
        let thresholds = &self.settings.thresholds;

        let seq = self.scorer.seq(a, b);
        if seq < thresholds.seq() {
            counter!("dedup_cosine_skipped_total").increment(1);
            return None;
        }

        let cos = match self.scorer.cos(a, b) {
            Ok(c) => c,
            Err(e) => {
                warn!(target: "dedup::engine", error = %e, "cosine scoring failed; treating as 0");
                0.0
            }
        };

        thresholds
            .accepts(seq, cos)
            .then_some(PairScores { seq, cos })
    }
}
