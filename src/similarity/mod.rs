// src/similarity/mod.rs
//! Pairwise title scoring.
//!
//! `seq` is cheap and needs nothing but the two strings; `cos` needs a
//! vectorizer fitted over the whole known title population. Callers score
//! `seq` first and only pay for `cos` when `seq` clears its threshold.

pub mod sequence;
pub mod tfidf;

use std::collections::BTreeSet;

use tracing::warn;

pub use sequence::sequence_ratio;
pub use tfidf::{TfidfVectorizer, VectorizeError};

/// Both similarity metrics for one pair of normalized titles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScores {
    pub seq: f64,
    pub cos: f64,
}

/// Holds the fitted vectorizer. A failed fit is kept as `None` and surfaces
/// as [`VectorizeError`] on every cosine request.
#[derive(Debug, Clone)]
pub struct Scorer {
    vectorizer: Option<TfidfVectorizer>,
}

impl Scorer {
    /// Fit over normalized reference titles.
    pub fn fit<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match TfidfVectorizer::fit(titles) {
            Ok(v) => Self {
                vectorizer: Some(v),
            },
            Err(e) => {
                warn!(target: "dedup::similarity", error = %e, "vectorizer fit failed; cosine scores will be 0");
                Self { vectorizer: None }
            }
        }
    }

    pub fn from_vectorizer(vectorizer: TfidfVectorizer) -> Self {
        Self {
            vectorizer: Some(vectorizer),
        }
    }

    pub fn vectorizer(&self) -> Option<&TfidfVectorizer> {
        self.vectorizer.as_ref()
    }

    pub fn seq(&self, a: &str, b: &str) -> f64 {
        sequence_ratio(a, b)
    }

    pub fn cos(&self, a: &str, b: &str) -> Result<f64, VectorizeError> {
        self.vectorizer
            .as_ref()
            .map(|v| v.cosine(a, b))
            .ok_or(VectorizeError::EmptyVocabulary)
    }

    /// Both scores unconditionally; a cosine failure scores `0.0`.
    pub fn score(&self, a: &str, b: &str) -> PairScores {
        PairScores {
            seq: self.seq(a, b),
            cos: self.cos(a, b).unwrap_or(0.0),
        }
    }
}

/// Word-set Jaccard index; `0.0` when both sides are empty.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let sa: BTreeSet<&str> = a.split_whitespace().collect();
    let sb: BTreeSet<&str> = b.split_whitespace().collect();
    let union = sa.union(&sb).count();
    if union == 0 {
        return 0.0;
    }
    sa.intersection(&sb).count() as f64 / union as f64
}

/// Normalized Levenshtein similarity. Diagnostic column in score sheets only.
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfitted_scorer_reports_error_and_scores_zero() {
        let s = Scorer::fit(Vec::<String>::new());
        assert!(s.vectorizer().is_none());
        assert_eq!(s.cos("공모전 안내", "공모전 안내"), Err(VectorizeError::EmptyVocabulary));
        let scores = s.score("공모전 안내", "공모전 안내");
        assert_eq!(scores.seq, 1.0);
        assert_eq!(scores.cos, 0.0);
    }

    #[test]
    fn jaccard_on_word_sets() {
        assert_eq!(jaccard("a b c", "b c d"), 0.5);
        assert_eq!(jaccard("", ""), 0.0);
        assert_eq!(jaccard("같은 제목", "같은 제목"), 1.0);
    }

    #[test]
    fn levenshtein_bounds() {
        assert_eq!(levenshtein_ratio("abc", "abc"), 1.0);
        assert!(levenshtein_ratio("abc", "xyz") < 1e-9);
    }
}
