//! Reviewer Benchmark CLI
//!
//! Evaluates AI design-review output against curated ground truth.
//!
//! ## Quick Start
//!
//! ```bash
//! # Judge-based scoring: recall over expected findings + precision over
//! # produced findings
//! ./reviewer-benchmark score \
//!     --output ./runs/review_completion.txt \
//!     --dataset ./datasets/requirements-v2 \
//!     --report ./results/eval_report.json
//!
//! # Deterministic calibration (no judge calls)
//! ./reviewer-benchmark calibrate \
//!     --output ./runs/review_completion.txt \
//!     --dataset ./datasets/requirements-v2
//!
//! # Gate a run against a stored baseline
//! ./reviewer-benchmark compare \
//!     --baseline ./baselines/v3_baseline.json \
//!     --current ./results/eval_report.json
//! ```
//!
//! ## Configuration
//!
//! Judge model, protocol, and thresholds are configured in `eval.toml`;
//! CLI flags override the protocol per run.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use reviewer_benchmark::baseline::{self, RegressionStatus, Thresholds};
use reviewer_benchmark::config::{EvalConfig, JudgeProtocol};
use reviewer_benchmark::findings::{extract_findings, EvalSample, Finding, Severity};
use reviewer_benchmark::judge::{AnthropicBackend, JudgeBackend, JudgeClient};
use reviewer_benchmark::scoring::{
    calibrate, wrap_run_log, EvalReport, ForwardScorer, ReverseScorer,
};
use reviewer_benchmark::scoring::calibration::{
    DEFAULT_PRECISION_THRESHOLD, DEFAULT_RECALL_THRESHOLD,
};

/// Judge protocol for CLI
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProtocolArg {
    /// Verdict-first single-turn judging
    Direct,
    /// Chain-of-thought judging with a final Verdict line
    Reasoning,
}

impl From<ProtocolArg> for JudgeProtocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Direct => JudgeProtocol::Direct,
            ProtocolArg::Reasoning => JudgeProtocol::Reasoning,
        }
    }
}

/// Severity filter for CLI
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum SeverityArg {
    #[default]
    Critical,
    Important,
    Minor,
    /// Score across all severities
    All,
}

impl SeverityArg {
    fn into_filter(self) -> Option<Severity> {
        match self {
            Self::Critical => Some(Severity::Critical),
            Self::Important => Some(Severity::Important),
            Self::Minor => Some(Severity::Minor),
            Self::All => None,
        }
    }
}

#[derive(Parser)]
#[command(name = "reviewer-benchmark")]
#[command(about = "Evaluate AI design-review findings against curated ground truth")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge-based scoring of one reviewer run against a dataset
    ///
    /// Scores recall (per expected finding: was it found?) and precision
    /// (per produced finding: is it genuine?), then writes a run log
    /// suitable for baseline comparison.
    Score {
        /// Path to the raw reviewer completion text
        #[arg(short, long)]
        output: PathBuf,

        /// Path to the dataset directory
        #[arg(short, long)]
        dataset: PathBuf,

        /// Output file for the run log (JSON)
        #[arg(short, long, default_value = "results/eval_report.json")]
        report: PathBuf,

        /// Judge protocol (overrides eval.toml)
        #[arg(short, long, value_enum)]
        protocol: Option<ProtocolArg>,

        /// Path to eval config file (TOML)
        #[arg(short, long, default_value = "eval.toml")]
        config: PathBuf,

        /// Restrict ground truth to one reviewer agent
        #[arg(long)]
        reviewer: Option<String>,
    },

    /// Deterministic matcher-based calibration (no judge calls)
    Calibrate {
        /// Path to the raw reviewer completion text
        #[arg(short, long)]
        output: PathBuf,

        /// Path to the dataset directory
        #[arg(short, long)]
        dataset: PathBuf,

        /// Severity filter applied to the reviewer output
        #[arg(short, long, value_enum, default_value = "critical")]
        severity: SeverityArg,

        /// Minimum recall for a passing run
        #[arg(long, default_value_t = DEFAULT_RECALL_THRESHOLD)]
        recall_threshold: f64,

        /// Minimum precision for a passing run
        #[arg(long, default_value_t = DEFAULT_PRECISION_THRESHOLD)]
        precision_threshold: f64,

        /// Restrict ground truth to one reviewer agent
        #[arg(long)]
        reviewer: Option<String>,
    },

    /// Compare a current run to a stored baseline
    ///
    /// Exits with status 1 when the comparison FAILs.
    Compare {
        /// Baseline snapshot (run log or reductions JSON)
        #[arg(short, long)]
        baseline: PathBuf,

        /// Current snapshot (run log or reductions JSON)
        #[arg(short, long)]
        current: PathBuf,

        /// Worst metric drop beyond this fails the run (overrides eval.toml)
        #[arg(long)]
        fail_threshold: Option<f64>,

        /// Worst metric drop beyond this (but within fail) warns
        /// (overrides eval.toml)
        #[arg(long)]
        warn_threshold: Option<f64>,

        /// Path to eval config file (TOML)
        #[arg(long, default_value = "eval.toml")]
        config: PathBuf,
    },

    /// Validate a dataset directory and print its ground-truth stats
    ValidateDataset {
        /// Path to the dataset directory
        #[arg(short, long)]
        dataset: PathBuf,

        /// Restrict ground truth to one reviewer agent
        #[arg(long)]
        reviewer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            output,
            dataset,
            report,
            protocol,
            config,
            reviewer,
        } => {
            run_score(
                &output,
                &dataset,
                &report,
                protocol.map(Into::into),
                &config,
                reviewer.as_deref(),
            )
            .await?;
        }

        Commands::Calibrate {
            output,
            dataset,
            severity,
            recall_threshold,
            precision_threshold,
            reviewer,
        } => {
            run_calibrate(
                &output,
                &dataset,
                severity.into_filter(),
                recall_threshold,
                precision_threshold,
                reviewer.as_deref(),
            )?;
        }

        Commands::Compare {
            baseline,
            current,
            fail_threshold,
            warn_threshold,
            config,
        } => {
            let defaults = EvalConfig::load_or_default(&config)?.thresholds;
            let thresholds = Thresholds::new(
                fail_threshold.unwrap_or(defaults.fail),
                warn_threshold.unwrap_or(defaults.warn),
            )?;
            let status = run_compare(&baseline, &current, &thresholds)?;
            if status == RegressionStatus::Fail {
                std::process::exit(1);
            }
        }

        Commands::ValidateDataset { dataset, reviewer } => {
            validate_dataset(&dataset, reviewer.as_deref())?;
        }
    }

    Ok(())
}

/// Run judge-based forward and reverse scoring for one reviewer run
async fn run_score(
    output_path: &PathBuf,
    dataset_path: &PathBuf,
    report_path: &PathBuf,
    protocol_override: Option<JudgeProtocol>,
    config_path: &PathBuf,
    reviewer: Option<&str>,
) -> Result<()> {
    let config = EvalConfig::load_or_default(config_path)?;
    let protocol = protocol_override.unwrap_or(config.protocol);

    let completion = std::fs::read_to_string(output_path)
        .with_context(|| format!("Failed to read reviewer output: {:?}", output_path))?;
    let sample = EvalSample::load(dataset_path, reviewer)?;
    let produced: Vec<Finding> = extract_findings(&completion, None).collect();

    eprintln!(
        "Scoring {} produced findings against {} expected ({} protocol, judge: {})",
        produced.len(),
        sample.expected.len(),
        protocol.name(),
        config.judge.model
    );

    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    let backend: Arc<dyn JudgeBackend> = Arc::new(AnthropicBackend::with_key(
        &config.judge.model,
        api_key,
        &config.judge.api_url,
    )?);

    let forward = ForwardScorer::new(
        JudgeClient::new(backend.clone(), protocol)
            .with_reviewer_output_cap(config.reviewer_output_cap),
    );
    let reverse = ReverseScorer::new(JudgeClient::new(backend, protocol));

    let recall_report = forward.score_recall(&sample.expected, &completion).await?;
    let precision_report = reverse.score_precision(&produced, &sample.document).await?;

    let report = EvalReport::from_scores(&recall_report, &precision_report);

    println!("\n=== Scoring results ===");
    println!(
        "  Recall:    {:.2}  ({}/{} expected findings detected)",
        report.recall, report.detected, report.expected
    );
    println!(
        "  Precision: {:.2}  ({}/{} produced findings genuine)",
        report.precision, precision_report.genuine, precision_report.total
    );
    println!("  F1:        {:.2}", report.f1);
    if !report.missed_titles.is_empty() {
        println!("\n  Missed findings:");
        for title in &report.missed_titles {
            println!("    - {title}");
        }
    }

    if !sample.must_find.is_empty() {
        let must_find_report = forward
            .score_must_find(&sample.must_find, &completion)
            .await?;
        println!(
            "\n  Must-find recall: {:.2}  ({}/{})",
            must_find_report.recall, must_find_report.detected, must_find_report.expected
        );
        for missed in &must_find_report.missed_titles {
            println!("    MISSED must-find: {missed}");
        }
    }

    let run_log = wrap_run_log(
        &report,
        serde_json::json!({
            "model": config.judge.model,
            "protocol": protocol.name(),
            "dataset": dataset_path.display().to_string(),
        }),
    );

    if let Some(parent) = report_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create report directory: {:?}", parent))?;
        }
    }
    std::fs::write(report_path, serde_json::to_string_pretty(&run_log)?)
        .with_context(|| format!("Failed to write report: {:?}", report_path))?;
    println!("\nReport written to {:?}", report_path);

    Ok(())
}

/// Run deterministic matcher-based calibration
fn run_calibrate(
    output_path: &PathBuf,
    dataset_path: &PathBuf,
    severity_filter: Option<Severity>,
    recall_threshold: f64,
    precision_threshold: f64,
    reviewer: Option<&str>,
) -> Result<()> {
    let completion = std::fs::read_to_string(output_path)
        .with_context(|| format!("Failed to read reviewer output: {:?}", output_path))?;
    let sample = EvalSample::load(dataset_path, reviewer)?;
    let produced: Vec<Finding> = extract_findings(&completion, severity_filter).collect();

    let report = calibrate(
        &produced,
        &sample.expected,
        recall_threshold,
        precision_threshold,
    );

    println!("\n=== Calibration ===");
    println!(
        "  Detected {}/{} findings.  Recall: {:.2}  Precision: {:.2}  F1: {:.2}",
        report.detected.len(),
        sample.expected.len(),
        report.recall,
        report.precision,
        report.f1
    );
    if !report.missed.is_empty() {
        println!("  Missed: {}", report.missed.join(", "));
    }
    if !report.false_positives.is_empty() {
        println!("  False positives: {}", report.false_positives.join(", "));
    }
    println!("  Status: {}", if report.passes { "PASS" } else { "FAIL" });

    Ok(())
}

/// Compare current metrics to a baseline and print the verdict
fn run_compare(
    baseline_path: &PathBuf,
    current_path: &PathBuf,
    thresholds: &Thresholds,
) -> Result<RegressionStatus> {
    let baseline = baseline::load_snapshot(baseline_path)?;
    let current = baseline::load_snapshot(current_path)?;

    let (status, delta) = baseline::compare(&baseline, &current, thresholds);

    println!("\nComparing to baseline: {:?}", baseline_path);
    println!(
        "\n  Baseline:  recall={:.2}  precision={:.2}  f1={:.2}",
        baseline.recall, baseline.precision, baseline.f1
    );
    println!(
        "  Current:   recall={:.2}  precision={:.2}  f1={:.2}",
        current.recall, current.precision, current.f1
    );
    println!(
        "\n  Delta: recall={:+.2}  precision={:+.2}  f1={:+.2}",
        delta.recall, delta.precision, delta.f1
    );
    println!("  Status: {status}");

    Ok(status)
}

/// Load a dataset and print its ground-truth stats
fn validate_dataset(dataset_path: &PathBuf, reviewer: Option<&str>) -> Result<()> {
    let sample = EvalSample::load(dataset_path, reviewer)?;
    let dist = sample.severity_distribution;

    println!("\n=== Dataset {:?} ===", dataset_path);
    println!("  Validated real flaws: {}", sample.expected.len());
    println!(
        "  Severity distribution: {} Critical, {} Important, {} Minor",
        dist.critical, dist.important, dist.minor
    );
    println!("  Must-find records: {}", sample.must_find.len());
    println!("  Document length: {} chars", sample.document.len());

    Ok(())
}
