// src/calibrate.rs
//! # Threshold Calibrator
//! Offline sweep over a labeled sample of title pairs.
//!
//! Every `(cos, seq)` grid point classifies each pair with the engine's own
//! rule ([`ThresholdProfile::accepts`]) and reports precision and recall.
//! The ranked table informs the deployed profile; it never writes it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use chrono::NaiveDate;

use crate::config::{Provenance, ThresholdError, ThresholdProfile};

/// Default sweeps and floor used by the operator tool.
pub const DEFAULT_COS_RANGE: ThresholdRange = ThresholdRange {
    start: 0.80,
    end: 0.95,
    step: 0.01,
};
pub const DEFAULT_SEQ_RANGE: ThresholdRange = ThresholdRange {
    start: 0.80,
    end: 0.90,
    step: 0.01,
};
pub const DEFAULT_PRECISION_FLOOR: f64 = 0.95;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("unknown label {0:?} (expected duplicate/duplication or not_duplicate/unrelated)")]
    UnknownLabel(String),
    #[error("invalid threshold range {0:?}: {1}")]
    InvalidRange(String, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Duplicate,
    NotDuplicate,
}

impl FromStr for Label {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duplicate" | "duplication" => Ok(Label::Duplicate),
            "not_duplicate" | "unrelated" => Ok(Label::NotDuplicate),
            _ => Err(CalibrationError::UnknownLabel(s.to_string())),
        }
    }
}

/// A labeled pair reduced to what the sweep needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPair {
    pub seq: f64,
    pub cos: f64,
    pub label: Label,
}

impl ScoredPair {
    pub fn new(seq: f64, cos: f64, label: Label) -> Self {
        Self { seq, cos, label }
    }
}

/// Inclusive `start..=end` in `step` increments. Parses from `start:end:step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl ThresholdRange {
    pub fn new(start: f64, end: f64, step: f64) -> Result<Self, CalibrationError> {
        let text = format!("{start}:{end}:{step}");
        if !(0.0..=1.0).contains(&start) || !(0.0..=1.0).contains(&end) {
            return Err(CalibrationError::InvalidRange(text, "bounds must be within [0, 1]"));
        }
        if start > end {
            return Err(CalibrationError::InvalidRange(text, "start is above end"));
        }
        if step.is_nan() || step <= 0.0 {
            return Err(CalibrationError::InvalidRange(text, "step must be positive"));
        }
        Ok(Self { start, end, step })
    }

    /// Grid values, rounded to 4 decimals so `0.80 + 3*0.01` prints as `0.83`.
    pub fn values(&self) -> Vec<f64> {
        let n = ((self.end - self.start) / self.step + 1e-6).floor() as usize;
        (0..=n)
            .map(|i| round4(self.start + i as f64 * self.step))
            .filter(|v| *v <= self.end + 1e-9)
            .collect()
    }
}

impl FromStr for ThresholdRange {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [a, b, c] = parts.as_slice() else {
            return Err(CalibrationError::InvalidRange(s.to_string(), "expected start:end:step"));
        };
        let num = |x: &str| {
            x.parse::<f64>()
                .map_err(|_| CalibrationError::InvalidRange(s.to_string(), "not a number"))
        };
        ThresholdRange::new(num(a)?, num(b)?, num(c)?)
    }
}

impl fmt::Display for ThresholdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.end, self.step)
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// One grid point of the sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationRow {
    pub cos_threshold: f64,
    pub seq_threshold: f64,
    pub precision: f64,
    pub recall: f64,
    pub true_positives: usize,
    pub predicted: usize,
    pub actual: usize,
}

impl CalibrationRow {
    /// Turn a chosen row into a deployable profile that records where it came from.
    pub fn to_profile(
        &self,
        sample: &str,
        sample_bytes: &[u8],
        sample_size: usize,
        calibrated_on: NaiveDate,
    ) -> Result<ThresholdProfile, ThresholdError> {
        let profile = ThresholdProfile::new(self.cos_threshold, self.seq_threshold)?;
        Ok(profile.with_provenance(Provenance {
            source: "calibration".into(),
            sample: Some(sample.to_string()),
            sample_sha256: Some(sample_digest(sample_bytes)),
            sample_size: Some(sample_size),
            precision: Some(self.precision),
            recall: Some(self.recall),
            calibrated_on: Some(calibrated_on),
        }))
    }
}

/// Lowercase hex SHA-256 of the labeled sample file.
pub fn sample_digest(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Classify every pair at one operating point.
pub fn evaluate_at(pairs: &[ScoredPair], profile: &ThresholdProfile) -> CalibrationRow {
    let mut tp = 0usize;
    let mut predicted = 0usize;
    let mut actual = 0usize;
    for p in pairs {
        let is_dup = p.label == Label::Duplicate;
        let said_dup = profile.accepts(p.seq, p.cos);
        actual += usize::from(is_dup);
        predicted += usize::from(said_dup);
        tp += usize::from(is_dup && said_dup);
    }
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    CalibrationRow {
        cos_threshold: profile.cos(),
        seq_threshold: profile.seq(),
        precision: ratio(tp, predicted),
        recall: ratio(tp, actual),
        true_positives: tp,
        predicted,
        actual,
    }
}

/// Full grid, cos-major.
pub fn sweep(pairs: &[ScoredPair], cos_range: &ThresholdRange, seq_range: &ThresholdRange) -> Vec<CalibrationRow> {
    let seqs = seq_range.values();
    let mut rows = Vec::with_capacity(seqs.len() * 16);
    for cos in cos_range.values() {
        for &seq in &seqs {
            // ranges are validated to [0, 1] on construction
            let Ok(profile) = ThresholdProfile::new(cos, seq) else {
                continue;
            };
            rows.push(evaluate_at(pairs, &profile));
        }
    }
    rows
}

/// Keep rows at or above `floor` precision, best precision then best recall first.
pub fn rank(rows: Vec<CalibrationRow>, floor: f64) -> Vec<CalibrationRow> {
    let mut kept: Vec<CalibrationRow> = rows.into_iter().filter(|r| r.precision >= floor).collect();
    kept.sort_by(|a, b| {
        b.precision
            .total_cmp(&a.precision)
            .then(b.recall.total_cmp(&a.recall))
    });
    kept
}

/// `calibrate(labeledPairs, cosRange, seqRange, precisionFloor) -> rankedThresholdTable`
pub fn calibrate(
    pairs: &[ScoredPair],
    cos_range: &ThresholdRange,
    seq_range: &ThresholdRange,
    precision_floor: f64,
) -> Vec<CalibrationRow> {
    rank(sweep(pairs, cos_range, seq_range), precision_floor)
}
