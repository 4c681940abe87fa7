//! notice-dedup operator CLI.
//! Runs the dedup merge against a stored corpus and drives the offline
//! calibration workflow (candidates → sample → score → calibrate).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notice_dedup::calibrate::{
    calibrate, CalibrationRow, ThresholdRange, DEFAULT_COS_RANGE, DEFAULT_PRECISION_FLOOR,
    DEFAULT_SEQ_RANGE,
};
use notice_dedup::config::{load_config_default, load_config_from, DedupConfig, ThresholdProfile};
use notice_dedup::pairs::{
    extract_candidates, labeled_pairs, sample_ambiguous, score_sheet, CandidatePair, LabeledRow,
    DEFAULT_MIN_SEQ, DEFAULT_SAMPLE_SEED, DEFAULT_SAMPLE_SIZE,
};
use notice_dedup::storage::csv_store::{
    decode_rows, read_bom_csv, read_corpus_file, write_bom_csv, write_corpus_file,
};
use notice_dedup::{dedup_records, run_once, CsvCorpusStore};

#[derive(Parser)]
#[command(
    name = "notice-dedup",
    version,
    about = "Near-duplicate detection and corpus merging for scraped notices",
    long_about = None
)]
struct Cli {
    /// Config file (default: config/dedup.toml, then built-in defaults)
    #[arg(long, global = true, env = "NOTICE_DEDUP_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

/// Per-invocation overrides of the loaded config.
#[derive(clap::Args, Default)]
struct Overrides {
    /// Date window in days
    #[arg(long)]
    window: Option<u32>,
    /// Cosine threshold
    #[arg(long)]
    cos: Option<f64>,
    /// Sequence-ratio threshold
    #[arg(long)]
    seq: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Merge a candidate batch into the stored corpus
    Run {
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long)]
        candidates: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Deduplicate one corpus file against itself
    Dedup {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Extract near-duplicate candidate pairs for labeling
    Candidates {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_MIN_SEQ)]
        min_seq: f64,
        /// Date window in days (default: config)
        #[arg(long)]
        window: Option<u32>,
    },
    /// Draw a reproducible sample of ambiguous pairs
    Sample {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        size: usize,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SEED)]
        seed: u64,
    },
    /// Add seq/jac/cos/lev scores to sampled pairs
    Score {
        #[arg(long)]
        input: PathBuf,
        /// Corpus whose titles the vectorizer is fitted on
        #[arg(long)]
        reference: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Sweep thresholds over a labeled score sheet
    Calibrate {
        #[arg(long)]
        input: PathBuf,
        /// Cosine sweep as start:end:step
        #[arg(long, default_value_t = DEFAULT_COS_RANGE)]
        cos: ThresholdRange,
        /// Sequence sweep as start:end:step
        #[arg(long, default_value_t = DEFAULT_SEQ_RANGE)]
        seq: ThresholdRange,
        /// Minimum precision to report
        #[arg(long, default_value_t = DEFAULT_PRECISION_FLOOR)]
        floor: f64,
        /// Print the ranked table as JSON
        #[arg(long)]
        json: bool,
        /// Print the top row as a `[thresholds]` block for dedup.toml
        #[arg(long)]
        emit_profile: bool,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notice_dedup=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
    }
}

fn load_config(path: Option<&Path>) -> Result<DedupConfig> {
    match path {
        Some(p) => load_config_from(p),
        None => load_config_default(),
    }
}

fn apply(mut cfg: DedupConfig, o: &Overrides) -> Result<DedupConfig> {
    if let Some(w) = o.window {
        cfg.window_days = w;
    }
    if o.cos.is_some() || o.seq.is_some() {
        let cos = o.cos.unwrap_or(cfg.thresholds.cos());
        let seq = o.seq.unwrap_or(cfg.thresholds.seq());
        // hand-picked values carry no calibration provenance
        cfg.thresholds = ThresholdProfile::new(cos, seq)?;
    }
    Ok(cfg)
}

fn print_table(rows: &[CalibrationRow]) {
    println!(
        "{:>6} {:>6} {:>9} {:>7} {:>4} {:>5} {:>6}",
        "cos", "seq", "precision", "recall", "tp", "pred", "actual"
    );
    for r in rows {
        println!(
            "{:>6.2} {:>6.2} {:>9.4} {:>7.4} {:>4} {:>5} {:>6}",
            r.cos_threshold, r.seq_threshold, r.precision, r.recall, r.true_positives, r.predicted, r.actual
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; no-op otherwise.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    let cfg = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            corpus,
            candidates,
            overrides,
        } => {
            let cfg = apply(cfg, &overrides)?;
            let batch = read_corpus_file(&candidates)?;
            let store = CsvCorpusStore::new(corpus);
            let summary = run_once(&store, batch, &cfg)
                .await
                .with_context(|| format!("dedup run against {}", store.path().display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Dedup {
            input,
            output,
            overrides,
        } => {
            let cfg = apply(cfg, &overrides)?;
            let records = read_corpus_file(&input)?;
            let before = records.len();
            let (unique, stats) = dedup_records(records, &cfg);
            write_corpus_file(&output, &unique)?;
            info!(
                before,
                after = unique.len(),
                by_key = stats.duplicates_by_key,
                by_similarity = stats.duplicates_by_similarity,
                "wrote deduplicated corpus to {}",
                output.display()
            );
        }

        Command::Candidates {
            input,
            output,
            min_seq,
            window,
        } => {
            let records = read_corpus_file(&input)?;
            let pairs = extract_candidates(
                records,
                cfg.normalization,
                window.unwrap_or(cfg.window_days),
                min_seq,
            );
            write_bom_csv(&output, &pairs)?;
            info!(pairs = pairs.len(), "wrote candidate pairs to {}", output.display());
        }

        Command::Sample {
            input,
            output,
            size,
            seed,
        } => {
            let pairs: Vec<CandidatePair> = read_bom_csv(&input)?;
            let total = pairs.len();
            let sample = sample_ambiguous(pairs, size, seed);
            write_bom_csv(&output, &sample)?;
            info!(total, sampled = sample.len(), seed, "wrote sample to {}", output.display());
        }

        Command::Score {
            input,
            reference,
            output,
        } => {
            let pairs: Vec<CandidatePair> = read_bom_csv(&input)?;
            let corpus = read_corpus_file(&reference)?;
            let rows = score_sheet(
                &pairs,
                corpus.iter().map(|r| r.title.as_str()),
                cfg.normalization,
            );
            write_bom_csv(&output, &rows)?;
            info!(rows = rows.len(), "wrote score sheet to {}; fill in the label column", output.display());
        }

        Command::Calibrate {
            input,
            cos,
            seq,
            floor,
            json,
            emit_profile,
        } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("reading labeled sample {}", input.display()))?;
            let rows: Vec<LabeledRow> = decode_rows(&bytes, &input)?;
            let pairs = labeled_pairs(rows)
                .map_err(|(line, e)| anyhow::anyhow!("{}: data row {line}: {e}", input.display()))?;

            let ranked = calibrate(&pairs, &cos, &seq, floor);
            if json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else {
                print_table(&ranked);
            }

            if emit_profile {
                let Some(best) = ranked.first() else {
                    bail!("no threshold pair reaches precision {floor}; nothing to emit");
                };
                let today = chrono::Local::now().date_naive();
                let profile = best.to_profile(&input.display().to_string(), &bytes, pairs.len(), today)?;
                println!("\n{}", profile.to_toml_block()?);
            }
        }
    }

    Ok(())
}
