// src/pairs.rs
//! Offline labeling workflow: candidate pairs → ambiguous sample → score sheet
//! → (operator labels) → [`crate::calibrate`].
//!
//! Pair files use the same BOM-prefixed CSV as the corpus, with the column
//! names operators already know (`제목1`, `제목2`, `seq_score`, ...).

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calibrate::{CalibrationError, Label, ScoredPair};
use crate::corpus::Corpus;
use crate::normalize::NormalizationPolicy;
use crate::record::NoticeRecord;
use crate::similarity::{jaccard, levenshtein_ratio, sequence_ratio, Scorer};

pub const DEFAULT_MIN_SEQ: f64 = 0.8;
pub const DEFAULT_SAMPLE_SIZE: usize = 400;
pub const DEFAULT_SAMPLE_SEED: u64 = 42;
/// Pairs at or above this ratio are trivially identical and not worth labeling.
pub const TRIVIAL_SEQ: f64 = 0.99999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePair {
    #[serde(rename = "제목1", alias = "title1")]
    pub title1: String,
    #[serde(rename = "제목2", alias = "title2")]
    pub title2: String,
    pub seq_score: f64,
}

/// Every pair within `window_days` (looking back from the newer record)
/// whose sequence ratio is at least `min_seq`. Undated records are skipped.
pub fn extract_candidates(
    records: Vec<NoticeRecord>,
    policy: NormalizationPolicy,
    window_days: u32,
    min_seq: f64,
) -> Vec<CandidatePair> {
    let corpus = Corpus::from_records(records, policy);
    let order: Vec<usize> = corpus
        .date_order()
        .iter()
        .copied()
        .filter(|&i| corpus.entry(i).date().is_some())
        .collect();

    let mut out = Vec::new();
    for (pos, &i) in order.iter().enumerate() {
        let newer = corpus.entry(i);
        let Some(base) = newer.date() else { continue };
        for &j in &order[pos + 1..] {
            let older = corpus.entry(j);
            let Some(d) = older.date() else { break };
            if (base - d).num_days() > i64::from(window_days) {
                break;
            }
            let seq = sequence_ratio(newer.title(), older.title());
            if seq >= min_seq {
                out.push(CandidatePair {
                    title1: newer.record().title.clone(),
                    title2: older.record().title.clone(),
                    seq_score: seq,
                });
            }
        }
    }
    info!(target: "dedup::pairs", dated = order.len(), pairs = out.len(), "extracted candidate pairs");
    out
}

/// Drop trivial matches and draw up to `size` pairs reproducibly.
/// The sample keeps the input order.
pub fn sample_ambiguous(pairs: Vec<CandidatePair>, size: usize, seed: u64) -> Vec<CandidatePair> {
    let ambiguous: Vec<CandidatePair> = pairs.into_iter().filter(|p| p.seq_score < TRIVIAL_SEQ).collect();
    let amount = size.min(ambiguous.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, ambiguous.len(), amount).into_vec();
    picked.sort_unstable();

    let mut slots: Vec<Option<CandidatePair>> = ambiguous.into_iter().map(Some).collect();
    picked
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

/// A sampled pair with every score filled in and an empty `label` for the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSheetRow {
    #[serde(rename = "제목1", alias = "title1")]
    pub title1: String,
    #[serde(rename = "제목2", alias = "title2")]
    pub title2: String,
    pub seq_score: f64,
    pub jac_score: f64,
    pub cos_score: f64,
    pub lev_score: f64,
    #[serde(default)]
    pub label: String,
}

/// Score sampled pairs. `reference` is the full title population the
/// vectorizer is fitted on.
pub fn score_sheet<'a, I>(pairs: &[CandidatePair], reference: I, policy: NormalizationPolicy) -> Vec<ScoreSheetRow>
where
    I: IntoIterator<Item = &'a str>,
{
    let scorer = Scorer::fit(reference.into_iter().map(|t| policy.similarity_title(t)));
    pairs
        .iter()
        .map(|p| {
            let a = policy.similarity_title(&p.title1);
            let b = policy.similarity_title(&p.title2);
            let scores = scorer.score(&a, &b);
            ScoreSheetRow {
                title1: p.title1.clone(),
                title2: p.title2.clone(),
                seq_score: scores.seq,
                jac_score: jaccard(&a, &b),
                cos_score: scores.cos,
                lev_score: levenshtein_ratio(&a, &b),
                label: String::new(),
            }
        })
        .collect()
}

/// The columns of a labeled sheet the calibrator reads; others are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LabeledRow {
    pub seq_score: f64,
    pub cos_score: f64,
    #[serde(default)]
    pub label: String,
}

impl TryFrom<LabeledRow> for ScoredPair {
    type Error = CalibrationError;

    fn try_from(row: LabeledRow) -> Result<Self, Self::Error> {
        let label: Label = row.label.parse()?;
        Ok(ScoredPair::new(row.seq_score, row.cos_score, label))
    }
}

/// Convert labeled rows, reporting the first unlabeled or mislabeled row (1-based).
pub fn labeled_pairs(rows: Vec<LabeledRow>) -> Result<Vec<ScoredPair>, (usize, CalibrationError)> {
    rows.into_iter()
        .enumerate()
        .map(|(i, r)| ScoredPair::try_from(r).map_err(|e| (i + 1, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str, seq: f64) -> CandidatePair {
        CandidatePair {
            title1: a.into(),
            title2: b.into(),
            seq_score: seq,
        }
    }

    #[test]
    fn candidates_respect_window_and_floor() {
        let records = vec![
            NoticeRecord::new("2025 하계 공모전 안내", "2025.06.05"),
            NoticeRecord::new("2025 하계 공모전 안내 (수정)", "2025.06.03"),
            NoticeRecord::new("2025 하계 공모전 안내", "2025.05.20"),
            NoticeRecord::new("장학금 신청 안내", "2025.06.04"),
            NoticeRecord::new("2025 하계 공모전 안내", "날짜 없음"),
        ];
        let got = extract_candidates(records, NormalizationPolicy::default(), 3, DEFAULT_MIN_SEQ);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].title1, "2025 하계 공모전 안내");
        assert_eq!(got[0].title2, "2025 하계 공모전 안내 (수정)");
        assert!(got[0].seq_score >= 0.8 && got[0].seq_score < 1.0);
    }

    #[test]
    fn sampling_drops_trivial_and_is_reproducible() {
        let pairs: Vec<CandidatePair> = (0..50)
            .map(|i| pair(&format!("a{i}"), &format!("b{i}"), if i % 10 == 0 { 1.0 } else { 0.85 }))
            .collect();
        let s1 = sample_ambiguous(pairs.clone(), 20, 42);
        let s2 = sample_ambiguous(pairs.clone(), 20, 42);
        assert_eq!(s1, s2);
        assert_eq!(s1.len(), 20);
        assert!(s1.iter().all(|p| p.seq_score < TRIVIAL_SEQ));

        let all = sample_ambiguous(pairs, 1000, 7);
        assert_eq!(all.len(), 45);
    }

    #[test]
    fn score_sheet_fills_every_column() {
        let reference = ["2025 하계 공모전 안내", "장학금 신청 안내", "도서관 휴관 안내"];
        let rows = score_sheet(
            &[pair("2025 하계 공모전 안내", "2025 하계 공모전 안내!!", 1.0)],
            reference,
            NormalizationPolicy::default(),
        );
        let r = &rows[0];
        assert_eq!(r.seq_score, 1.0);
        assert_eq!(r.jac_score, 1.0);
        assert!((r.cos_score - 1.0).abs() < 1e-9);
        assert_eq!(r.lev_score, 1.0);
        assert!(r.label.is_empty());
    }

    #[test]
    fn unlabeled_row_is_reported_with_position() {
        let rows = vec![
            LabeledRow {
                seq_score: 0.9,
                cos_score: 0.9,
                label: "duplication".into(),
            },
            LabeledRow {
                seq_score: 0.9,
                cos_score: 0.9,
                label: String::new(),
            },
        ];
        let (line, _) = labeled_pairs(rows).unwrap_err();
        assert_eq!(line, 2);
    }
}
