//! Anomaly Grid command-line interface.
//!
//! Trains context-grid models on JSON sequence files and scores new
//! sequences against them:
//! - `fit` / `score` / `predict` / `metrics` over a persisted model
//! - `eval` for cross-validated ROC AUC on labelled data
//! - `generate` and `stats` for synthetic corpora and corpus summaries

use ag_cli::config::{load_config, LoadedConfig};
use ag_cli::exit_codes::ExitCode;
use ag_cli::io::{load_model, read_labeled, read_sequences, save_model, write_json, LabeledCorpus};
use ag_cli::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use ag_common::{Error, Result, StructuredError};
use ag_core::{
    validate_max_order, AnomalyDetector, DetectorConfig, PositionScore, ScoreTransform,
    SequenceScore,
};
use ag_eval::{
    calculate_sequence_stats, cross_val_score_with_config, generate_sequences, memory_usage,
    validate_sequences, PerformanceTimer, SequenceStats,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Anomaly Grid - variable-order context model for sequence anomaly detection
#[derive(Parser)]
#[command(name = "anomaly-grid")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to detector.toml (default: $ANOMALY_GRID_CONFIG, then the XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a detector on a sequence file and save the model
    Fit(FitArgs),

    /// Print raw and normalized scores for each sequence
    Score(ScoreArgs),

    /// Print 0/1 anomaly labels for each sequence
    Predict(PredictArgs),

    /// Print summary statistics of a saved model
    Metrics(MetricsArgs),

    /// Cross-validate on a labelled file and print per-fold ROC AUC
    Eval(EvalArgs),

    /// Generate a seeded synthetic labelled corpus
    Generate(GenerateArgs),

    /// Validate a sequence file and print corpus statistics
    Stats(StatsArgs),
}

/// Detector overrides shared by training commands
#[derive(Args, Debug, Default)]
struct DetectorArgs {
    /// Maximum context order (must be positive)
    #[arg(long, allow_negative_numbers = true)]
    max_order: Option<i64>,

    /// Worker threads for training and scoring
    #[arg(long)]
    workers: Option<usize>,

    /// Score normalization (excess, absolute)
    #[arg(long)]
    transform: Option<ScoreTransform>,
}

#[derive(Args, Debug)]
struct FitArgs {
    /// Training sequences (JSON array of string arrays, `-` for stdin)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Where to write the model
    #[arg(long, short = 'm')]
    model: PathBuf,

    #[command(flatten)]
    detector: DetectorArgs,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Saved model
    #[arg(long, short = 'm')]
    model: PathBuf,

    /// Sequences to score
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Include per-position detail
    #[arg(long)]
    explain: bool,

    /// Worker threads
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Saved model
    #[arg(long, short = 'm')]
    model: PathBuf,

    /// Sequences to label
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Decision threshold in [0, 1] (default from config, else 0.5)
    #[arg(long, short = 't', allow_negative_numbers = true)]
    threshold: Option<f64>,

    /// Worker threads
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Args, Debug)]
struct MetricsArgs {
    /// Saved model
    #[arg(long, short = 'm')]
    model: PathBuf,
}

#[derive(Args, Debug)]
struct EvalArgs {
    /// Labelled file: {"sequences": [...], "labels": [...]}
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Number of folds (default from config, else 5)
    #[arg(long)]
    folds: Option<usize>,

    /// Shuffle seed (default from config, else 42)
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    detector: DetectorArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Number of sequences
    #[arg(long, short = 'n')]
    count: usize,

    /// Symbols per sequence
    #[arg(long, short = 'l')]
    length: usize,

    /// Comma-separated alphabet
    #[arg(long, short = 'a', value_delimiter = ',', required = true)]
    alphabet: Vec<String>,

    /// Fraction of anomalous sequences
    #[arg(long, default_value_t = 0.1)]
    anomaly_rate: f64,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Sequences to summarize
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Reject sequences shorter than this
    #[arg(long, default_value_t = 1)]
    min_length: usize,
}

#[derive(Serialize)]
struct ScoreRecord {
    index: usize,
    #[serde(flatten)]
    score: SequenceScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    positions: Option<Vec<PositionScore>>,
}

#[derive(Serialize)]
struct PredictOutput {
    threshold: f64,
    labels: Vec<u8>,
    anomalies: usize,
}

#[derive(Serialize)]
struct EvalOutput {
    folds: usize,
    seed: u64,
    fold_auc: Vec<f64>,
    mean_auc: f64,
    elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    rss_bytes: Option<u64>,
}

#[derive(Serialize)]
struct StatsOutput {
    #[serde(flatten)]
    stats: SequenceStats,
    min_length_checked: usize,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let verbosity_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    let log_config = LogConfig::from_env(
        cli.global.log_level.or(verbosity_level),
        cli.global.log_format,
    );
    init_logging(&log_config);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run(&cli)));
    let exit_code = match outcome {
        Ok(Ok(())) => ExitCode::Clean,
        Ok(Err(err)) => {
            report_error(&err);
            ExitCode::from(&err)
        }
        Err(_) => ExitCode::InternalError,
    };
    std::process::exit(exit_code.as_i32());
}

fn report_error(err: &Error) {
    tracing::error!(code = err.code(), category = %err.category(), "{}", err);
    eprintln!("{}", StructuredError::from(err).to_json());
}

fn run(cli: &Cli) -> Result<()> {
    let loaded = load_config(cli.global.config.as_deref())?;
    match &cli.command {
        Commands::Fit(args) => run_fit(&loaded, args),
        Commands::Score(args) => run_score(&loaded, args),
        Commands::Predict(args) => run_predict(&loaded, args),
        Commands::Metrics(args) => run_metrics(&loaded, args),
        Commands::Eval(args) => run_eval(&loaded, args),
        Commands::Generate(args) => run_generate(args),
        Commands::Stats(args) => run_stats(args),
    }
}

/// File configuration with command-line overrides applied.
fn detector_config(base: &DetectorConfig, args: &DetectorArgs) -> Result<DetectorConfig> {
    let mut config = base.clone();
    if let Some(order) = args.max_order {
        config = config.with_max_order(validate_max_order(order)?)?;
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(transform) = args.transform {
        config = config.with_score_transform(transform);
    }
    Ok(config)
}

fn load_detector(
    loaded: &LoadedConfig,
    model: &std::path::Path,
    workers: Option<usize>,
) -> Result<AnomalyDetector<String>> {
    let snapshot = load_model(model)?;
    let mut config = loaded.config.detector.clone();
    if let Some(workers) = workers {
        config = config.with_workers(workers);
    }
    AnomalyDetector::from_snapshot(&snapshot, config)
}

fn run_fit(loaded: &LoadedConfig, args: &FitArgs) -> Result<()> {
    let sequences = read_sequences(&args.input)?;
    let config = detector_config(&loaded.config.detector, &args.detector)?;
    let mut detector = AnomalyDetector::with_config(config)?;
    detector.fit(&sequences)?;
    save_model(&args.model, &detector.snapshot()?)?;
    info!(model = %args.model.display(), "model written");
    write_json(&detector.get_performance_metrics()?.to_map())
}

fn run_score(loaded: &LoadedConfig, args: &ScoreArgs) -> Result<()> {
    let detector = load_detector(loaded, &args.model, args.workers)?;
    let sequences = read_sequences(&args.input)?;
    let scores = detector.score_sequences(&sequences)?;

    let records = scores
        .into_iter()
        .enumerate()
        .map(|(index, score)| {
            let positions = if args.explain {
                Some(detector.explain(&sequences[index])?)
            } else {
                None
            };
            Ok(ScoreRecord {
                index,
                score,
                positions,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    write_json(&records)
}

fn run_predict(loaded: &LoadedConfig, args: &PredictArgs) -> Result<()> {
    let detector = load_detector(loaded, &args.model, args.workers)?;
    let sequences = read_sequences(&args.input)?;
    let threshold = args
        .threshold
        .unwrap_or(detector.config().default_threshold);
    let labels = detector.predict(&sequences, threshold)?;
    let anomalies = labels.iter().filter(|&&l| l == 1).count();
    info!(sequences = labels.len(), anomalies, threshold, "prediction complete");
    write_json(&PredictOutput {
        threshold,
        labels,
        anomalies,
    })
}

fn run_metrics(loaded: &LoadedConfig, args: &MetricsArgs) -> Result<()> {
    let detector = load_detector(loaded, &args.model, None)?;
    write_json(&detector.get_performance_metrics()?.to_map())
}

fn run_eval(loaded: &LoadedConfig, args: &EvalArgs) -> Result<()> {
    let corpus = read_labeled(&args.input)?;
    let config = detector_config(&loaded.config.detector, &args.detector)?;
    let folds = args.folds.unwrap_or(loaded.config.eval.folds);
    let seed = args.seed.unwrap_or(loaded.config.eval.seed);

    let timer = PerformanceTimer::start("cross_validation");
    let fold_auc =
        cross_val_score_with_config(&corpus.sequences, &corpus.labels, config, folds, seed)?;
    let report = timer.stop();
    let mean_auc = fold_auc.iter().sum::<f64>() / fold_auc.len() as f64;
    info!(folds, mean_auc, elapsed_ms = report.elapsed_ms, "cross-validation complete");

    write_json(&EvalOutput {
        folds,
        seed,
        fold_auc,
        mean_auc,
        elapsed_ms: report.elapsed_ms,
        rss_bytes: memory_usage(),
    })
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let (sequences, labels) = generate_sequences(
        args.count,
        args.length,
        &args.alphabet,
        args.anomaly_rate,
        args.seed,
    )?;
    write_json(&LabeledCorpus { sequences, labels })
}

fn run_stats(args: &StatsArgs) -> Result<()> {
    let sequences = read_sequences(&args.input)?;
    validate_sequences(&sequences, args.min_length)?;
    let stats = calculate_sequence_stats(&sequences)?;
    write_json(&StatsOutput {
        stats,
        min_length_checked: args.min_length,
    })
}
