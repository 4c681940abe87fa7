// src/config.rs
//! Dedup configuration: TOML on disk, validated on load.
//!
//! Lookup order for [`load_config_default`]:
//! 1) `$NOTICE_DEDUP_CONFIG` (must exist when set)
//! 2) `config/dedup.toml`
//! 3) built-in defaults

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::normalize::NormalizationPolicy;
use crate::prune::UndatedFallback;

pub const ENV_CONFIG_PATH: &str = "NOTICE_DEDUP_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/dedup.toml";

pub const DEFAULT_WINDOW_DAYS: u32 = 3;
pub const DEFAULT_COS_THRESHOLD: f64 = 0.80;
pub const DEFAULT_SEQ_THRESHOLD: f64 = 0.90;
pub const DEFAULT_CHECKPOINT_EVERY: usize = 50;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("{name} threshold {value} is outside [0, 1]")]
    OutOfRange { name: &'static str, value: f64 },
}

/// Where a deployed threshold pair came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// `"calibration"` or `"manual"`.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibrated_on: Option<NaiveDate>,
}

/// The `(cos, seq)` operating point. Both values are in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct ThresholdProfile {
    cos: f64,
    seq: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provenance: Option<Provenance>,
}

#[derive(Deserialize)]
struct RawThresholds {
    #[serde(default = "default_cos")]
    cos: f64,
    #[serde(default = "default_seq")]
    seq: f64,
    #[serde(default)]
    provenance: Option<Provenance>,
}

fn default_cos() -> f64 {
    DEFAULT_COS_THRESHOLD
}
fn default_seq() -> f64 {
    DEFAULT_SEQ_THRESHOLD
}
fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}
fn default_checkpoint_every() -> usize {
    DEFAULT_CHECKPOINT_EVERY
}

impl TryFrom<RawThresholds> for ThresholdProfile {
    type Error = ThresholdError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        let mut p = ThresholdProfile::new(raw.cos, raw.seq)?;
        p.provenance = raw.provenance;
        Ok(p)
    }
}

impl ThresholdProfile {
    pub fn new(cos: f64, seq: f64) -> Result<Self, ThresholdError> {
        check_unit("cos", cos)?;
        check_unit("seq", seq)?;
        Ok(Self {
            cos,
            seq,
            provenance: None,
        })
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn cos(&self) -> f64 {
        self.cos
    }

    pub fn seq(&self) -> f64 {
        self.seq
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    /// The duplicate rule shared by the engine and the calibrator.
    pub fn accepts(&self, seq: f64, cos: f64) -> bool {
        cos >= self.cos && seq >= self.seq
    }

    /// Render as a `[thresholds]` block ready to paste into `dedup.toml`.
    pub fn to_toml_block(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Block<'a> {
            thresholds: &'a ThresholdProfile,
        }
        toml::to_string(&Block { thresholds: self }).context("serializing threshold profile")
    }
}

impl Default for ThresholdProfile {
    fn default() -> Self {
        Self {
            cos: DEFAULT_COS_THRESHOLD,
            seq: DEFAULT_SEQ_THRESHOLD,
            provenance: None,
        }
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ThresholdError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ThresholdError::OutOfRange { name, value })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Max publish-date gap (days, inclusive) for similarity comparison.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default)]
    pub undated_fallback: UndatedFallback,
    /// Write the session every N accepted records; 0 disables checkpoints.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
    #[serde(default)]
    pub normalization: NormalizationPolicy,
    #[serde(default)]
    pub thresholds: ThresholdProfile,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            undated_fallback: UndatedFallback::default(),
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            normalization: NormalizationPolicy::default(),
            thresholds: ThresholdProfile::default(),
        }
    }
}

impl DedupConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing dedup config")
    }
}

/// Load config from an explicit TOML file.
pub fn load_config_from(path: &Path) -> Result<DedupConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading dedup config from {}", path.display()))?;
    DedupConfig::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
}

/// Load config using env var + fallbacks (see module docs).
pub fn load_config_default() -> Result<DedupConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_p.exists() {
        return load_config_from(&default_p);
    }
    Ok(DedupConfig::default())
}
