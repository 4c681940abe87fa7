// src/similarity/tfidf.rs
//! TF-IDF vectorizer fitted over a reference title population.
//!
//! Conventions: tokens are runs of two or more word characters, raw term
//! counts as TF, smoothed IDF `ln((1 + n) / (1 + df)) + 1`, L2-normalized
//! rows. Terms not seen during fitting are ignored at transform time.

use std::collections::{HashMap, HashSet};

use once_cell::sync::OnceCell;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VectorizeError {
    #[error("empty vocabulary: reference titles contain no tokens")]
    EmptyVocabulary,
}

/// Sparse L2-normalized row, sorted by term index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector(Vec<(usize, f64)>);

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j, mut acc) = (0usize, 0usize, 0.0f64);
        while i < self.0.len() && j < other.0.len() {
            let (ti, wi) = self.0[i];
            let (tj, wj) = other.0[j];
            match ti.cmp(&tj) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += wi * wj;
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and IDF weights from `documents`.
    pub fn fit<I, S>(documents: I) -> Result<Self, VectorizeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        let mut n_docs = 0usize;

        for doc in documents {
            n_docs += 1;
            let lowered = doc.as_ref().to_lowercase();
            let unique: HashSet<&str> = tokenize(&lowered).collect();
            for term in unique {
                let next_idx = vocabulary.len();
                let idx = *vocabulary.entry(term.to_string()).or_insert(next_idx);
                if idx == doc_freq.len() {
                    doc_freq.push(0);
                }
                doc_freq[idx] += 1;
            }
        }

        if vocabulary.is_empty() {
            return Err(VectorizeError::EmptyVocabulary);
        }

        let n = n_docs as f64;
        let idf = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        Ok(Self { vocabulary, idf })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn transform(&self, doc: &str) -> SparseVector {
        let lowered = doc.to_lowercase();
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in tokenize(&lowered) {
            if let Some(&idx) = self.vocabulary.get(term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut row: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return SparseVector::default();
        }
        for (_, w) in row.iter_mut() {
            *w /= norm;
        }
        row.sort_by_key(|(idx, _)| *idx);
        SparseVector(row)
    }

    /// Cosine similarity in `[0.0, 1.0]`; `0.0` when either side has no known tokens.
    pub fn cosine(&self, a: &str, b: &str) -> f64 {
        let va = self.transform(a);
        let vb = self.transform(b);
        if va.is_empty() || vb.is_empty() {
            return 0.0;
        }
        va.dot(&vb).clamp(0.0, 1.0)
    }
}

/// Tokens of two or more word characters.
pub fn tokenize(doc: &str) -> impl Iterator<Item = &str> {
    static RE_TOKEN: OnceCell<Regex> = OnceCell::new();
    let re = RE_TOKEN.get_or_init(|| Regex::new(r"\b\w\w+\b").unwrap());
    re.find_iter(doc).map(|m| m.as_str())
}
