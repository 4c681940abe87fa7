// src/corpus.rs
//! Ordered set of accepted records with the lookups the engine needs.
//!
//! Records are kept in acceptance order (that is the order written back to
//! storage). Alongside, every entry caches its identity key, its
//! similarity-normalized title and its parsed date, and the corpus keeps an
//! index sorted by date descending with undated entries at the end.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::key::NoticeKey;
use crate::normalize::NormalizationPolicy;
use crate::record::NoticeRecord;

/// A record plus its precomputed comparison forms.
#[derive(Debug, Clone)]
pub struct Entry {
    record: NoticeRecord,
    key: NoticeKey,
    title: String,
    date: Option<NaiveDate>,
}

impl Entry {
    pub fn new(record: NoticeRecord, policy: &NormalizationPolicy) -> Self {
        let key = NoticeKey::new(&record.title, &record.published, policy.key_brackets);
        let title = policy.similarity_title(&record.title);
        let date = record.published_date();
        Self {
            record,
            key,
            title,
            date,
        }
    }

    pub fn record(&self) -> &NoticeRecord {
        &self.record
    }

    pub fn into_record(self) -> NoticeRecord {
        self.record
    }

    pub fn key(&self) -> &NoticeKey {
        &self.key
    }

    /// Similarity-normalized title.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

#[derive(Debug, Clone)]
pub struct Corpus {
    policy: NormalizationPolicy,
    entries: Vec<Entry>,
    keys: HashMap<NoticeKey, usize>,
    by_date: Vec<usize>,
}

impl Corpus {
    pub fn new(policy: NormalizationPolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
            keys: HashMap::new(),
            by_date: Vec::new(),
        }
    }

    /// Build from already-accepted records. The records are trusted as-is:
    /// nothing is dropped, even if two of them share a key.
    pub fn from_records<I>(records: I, policy: NormalizationPolicy) -> Self
    where
        I: IntoIterator<Item = NoticeRecord>,
    {
        let entries: Vec<Entry> = records
            .into_iter()
            .map(|r| Entry::new(r, &policy))
            .collect();

        let mut keys = HashMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            keys.entry(e.key.clone()).or_insert(i);
        }

        let mut by_date: Vec<usize> = (0..entries.len()).collect();
        by_date.sort_by(|&a, &b| date_desc(entries[a].date, entries[b].date));

        Self {
            policy,
            entries,
            keys,
            by_date,
        }
    }

    pub fn policy(&self) -> &NormalizationPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry; returns its position in acceptance order.
    pub fn push(&mut self, entry: Entry) -> usize {
        let idx = self.entries.len();
        let pos = match entry.date {
            Some(d) => self
                .by_date
                .partition_point(|&i| self.entries[i].date.is_some_and(|x| x >= d)),
            None => self.by_date.len(),
        };
        self.keys.entry(entry.key.clone()).or_insert(idx);
        self.entries.push(entry);
        self.by_date.insert(pos, idx);
        idx
    }

    pub fn find_key(&self, key: &NoticeKey) -> Option<&Entry> {
        self.keys.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains_key(&self, key: &NoticeKey) -> bool {
        self.keys.contains_key(key)
    }

    /// Entries in acceptance order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entry positions sorted by date descending, undated last.
    pub fn date_order(&self) -> &[usize] {
        &self.by_date
    }

    pub fn entry(&self, idx: usize) -> &Entry {
        &self.entries[idx]
    }

    pub fn undated_count(&self) -> usize {
        self.entries.iter().filter(|e| e.date.is_none()).count()
    }

    pub fn records(&self) -> impl Iterator<Item = &NoticeRecord> {
        self.entries.iter().map(Entry::record)
    }

    pub fn into_records(self) -> Vec<NoticeRecord> {
        self.entries.into_iter().map(Entry::into_record).collect()
    }
}

/// Newest first, undated last; equal dates keep their relative order under a stable sort.
pub(crate) fn date_desc(a: Option<NaiveDate>, b: Option<NaiveDate>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}
