// src/prune.rs
//! Candidate pruning: which corpus entries are worth scoring at all.
//!
//! The corpus date index is sorted newest first, so the entries within
//! `window_days` of the anchor form one contiguous run. We binary-search to
//! the start of the run and stop at the first entry past its end; history
//! outside the window is never touched.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::corpus::{Corpus, Entry};

/// Where the candidate is compared when its own date cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndatedFallback {
    /// Every session record, no persisted history.
    #[default]
    SessionOnly,
    /// Every session record and every persisted record.
    FullScan,
}

/// Which of the two corpora is being pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Session,
    Persisted,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Session => "session",
            Origin::Persisted => "persisted",
        }
    }
}

/// Entries whose date lies within `window_days` of `anchor` (inclusive).
pub struct Window<'a> {
    corpus: &'a Corpus,
    pos: usize,
    anchor: NaiveDate,
    window_days: i64,
}

pub fn window(corpus: &Corpus, anchor: NaiveDate, window_days: u32) -> Window<'_> {
    let order = corpus.date_order();
    // Skip everything dated after the window's upper edge. A window reaching
    // past the calendar's end has no upper edge.
    let pos = match anchor.checked_add_signed(Duration::days(i64::from(window_days))) {
        Some(newest) => {
            order.partition_point(|&i| corpus.entry(i).date().is_some_and(|d| d > newest))
        }
        None => 0,
    };
    Window {
        corpus,
        pos,
        anchor,
        window_days: i64::from(window_days),
    }
}

impl<'a> Iterator for Window<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let &idx = self.corpus.date_order().get(self.pos)?;
        let entry = self.corpus.entry(idx);
        let within = entry
            .date()
            .is_some_and(|d| (d - self.anchor).num_days().abs() <= self.window_days);
        if !within {
            // Sorted index: nothing further down can be closer.
            self.pos = self.corpus.date_order().len();
            return None;
        }
        self.pos += 1;
        Some(entry)
    }
}

/// Comparison set for one candidate against one corpus.
pub enum Eligible<'a> {
    Windowed(Window<'a>),
    All(std::slice::Iter<'a, Entry>),
    Nothing,
}

impl<'a> Iterator for Eligible<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Eligible::Windowed(w) => w.next(),
            Eligible::All(it) => it.next(),
            Eligible::Nothing => None,
        }
    }
}

/// Pick the comparison set for a candidate dated `candidate_date`.
pub fn eligible(
    corpus: &Corpus,
    origin: Origin,
    candidate_date: Option<NaiveDate>,
    window_days: u32,
    fallback: UndatedFallback,
) -> Eligible<'_> {
    match (candidate_date, origin, fallback) {
        (Some(d), _, _) => Eligible::Windowed(window(corpus, d, window_days)),
        (None, Origin::Session, _) | (None, Origin::Persisted, UndatedFallback::FullScan) => {
            Eligible::All(corpus.entries().iter())
        }
        (None, Origin::Persisted, UndatedFallback::SessionOnly) => Eligible::Nothing,
    }
}
