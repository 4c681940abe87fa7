// src/lib.rs
// Public library surface for the CLI and integration tests.

pub mod config;
pub mod corpus;
pub mod engine;
pub mod key;
pub mod merger;
pub mod normalize;
pub mod pipeline;
pub mod prune;
pub mod record;
pub mod similarity;
pub mod storage;

// Offline calibration workflow
pub mod calibrate;
pub mod pairs;

// ---- Re-exports for stable public API ----
pub use crate::config::{DedupConfig, Provenance, ThresholdProfile};
pub use crate::corpus::{Corpus, Entry};
pub use crate::engine::{Decision, DecisionEngine, EngineSettings, MatchKind, Verdict};
pub use crate::key::NoticeKey;
pub use crate::merger::{CorpusMerger, MergeStats};
pub use crate::normalize::{normalize_title, BracketPolicy, NormalizationPolicy};
pub use crate::pipeline::{dedup_records, run_once, RunSummary};
pub use crate::prune::{Origin, UndatedFallback};
pub use crate::record::NoticeRecord;
pub use crate::storage::{CorpusStore, CsvCorpusStore, LoadedCorpus, MemoryStore, StorageError};
