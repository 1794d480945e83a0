use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::error::Error;
use std::path::PathBuf;
use toaeval::features::builtin_registry;
use toaeval::pipeline::{CancelFlag, ColmapCli, Dataset, EvaluationConfig, EvaluationPlan};
use toaeval::ranking::Analyzer;
use toaeval::store::{AnalysisStore, Store};

#[derive(Parser)]
#[command(name = "toaeval")]
#[command(about = "Trade-off aware evaluation of feature algorithms for structure-from-motion")]
struct Cli {
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Emit JSON-formatted tracing spans instead of plain log lines.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, match and reconstruct every (sequence, detector, descriptor).
    Evaluate {
        /// JSON evaluation config
        config: PathBuf,
    },
    /// Rank the reconstructed models and write the analysis database.
    Analyze {
        /// Feature cache written by `evaluate`
        #[arg(long)]
        store: PathBuf,
        /// Directory with one model directory per combination
        #[arg(long)]
        point_clouds: PathBuf,
        /// Analysis database to (re)create
        #[arg(short, long)]
        output: PathBuf,
        /// Evaluation config; its combinations are ranked even when they
        /// produced no model.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the built-in feature algorithms.
    Algorithms,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Command::Evaluate { config } => evaluate(config),
        Command::Analyze {
            store,
            point_clouds,
            output,
            config,
        } => analyze(store, point_clouds, output, config),
        Command::Algorithms => {
            list_algorithms();
            Ok(())
        }
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) -> Result<(), Box<dyn Error>> {
    toaeval::core::init_with_level(cli.log_level.into())?;
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) -> Result<(), Box<dyn Error>> {
    tracing_log::LogTracer::builder()
        .with_max_level(cli.log_level.into())
        .init()?;
    toaeval::core::init_tracing(cli.json_log);
    Ok(())
}

fn evaluate(config_path: PathBuf) -> Result<(), Box<dyn Error>> {
    let config = EvaluationConfig::load_json(&config_path)?;

    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, stopping after the current stage");
        flag.cancel();
    })?;

    let store = Store::open(&config.store_path)?;
    let mut dataset = Dataset::from_config(&config);
    dataset.load()?;

    let summary = dataset.evaluate(
        &store,
        &builtin_registry(),
        &ColmapCli::new(config.engine.clone()),
        &EvaluationPlan::from_config(&config),
        &cancel,
    )?;
    store.close()?;

    for failed in &summary.failed {
        println!(
            "failed  {} {}: {}",
            failed.sequence, failed.combination, failed.message
        );
    }
    for done in &summary.completed {
        println!(
            "done    {} {}: {} points, {} observations, {:.4}px",
            done.sequence,
            done.combination,
            done.stats.points,
            done.stats.observations,
            done.stats.mean_reprojection_error
        );
    }
    println!(
        "{} completed, {} skipped, {} failed",
        summary.completed.len(),
        summary.skipped,
        summary.failed.len()
    );
    Ok(())
}

fn analyze(
    store: PathBuf,
    point_clouds: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut analyzer = Analyzer::new(point_clouds);
    if let Some(path) = config {
        analyzer = analyzer.with_expected(EvaluationConfig::load_json(path)?.combinations());
    }

    let store = Store::open(store)?;
    let mut analysis = AnalysisStore::create(&output)?;
    let summary = analyzer.analyze(&store, &mut analysis)?;
    println!(
        "{} sequences, {} comparisons -> {}",
        summary.sequences,
        summary.comparisons,
        output.display()
    );

    for row in analysis.ranking_by_feature_detector()? {
        println!("{:<24} {:.3}", row.combination.to_string(), row.score);
    }
    Ok(())
}

fn list_algorithms() {
    let registry = builtin_registry();
    for name in registry.names() {
        let Ok(algorithm) = registry.create(name) else {
            continue;
        };
        let mut roles = Vec::new();
        if algorithm.can_detect() {
            roles.push("detector");
        }
        if algorithm.can_describe() {
            roles.push("descriptor");
        }
        match registry.fallback_for(name) {
            Some(detector) if !algorithm.can_detect() => {
                println!("{name:<8} {} (None -> {detector})", roles.join(", "))
            }
            _ => println!("{name:<8} {}", roles.join(", ")),
        }
    }
}
