//! Memoized feature pipeline and evaluation driver.
//!
//! - [`Experiment`] runs one (sequence, detector, descriptor) combination:
//!   features per image and matches per image pair, each fetched from the
//!   [`Store`](toaeval_store::Store) or computed and cached.
//! - [`export_colmap`] writes the result as a COLMAP database.
//! - [`ReconstructionEngine`] is the seam to the external SfM engine;
//!   [`ColmapCli`] drives the `colmap` executable.
//! - [`Dataset::evaluate`] iterates all combinations, skipping those that
//!   already have a model and continuing past failures.
//!
//! ```no_run
//! use toaeval_pipeline::{CancelFlag, ColmapCli, Dataset, EvaluationConfig, EvaluationPlan};
//! use toaeval_store::Store;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EvaluationConfig::load_json("evaluation.json")?;
//! let store = Store::open(&config.store_path)?;
//! let mut dataset = Dataset::from_config(&config);
//! dataset.load()?;
//! let summary = dataset.evaluate(
//!     &store,
//!     &toaeval_features::builtin_registry(),
//!     &ColmapCli::new(config.engine.clone()),
//!     &EvaluationPlan::from_config(&config),
//!     &CancelFlag::new(),
//! )?;
//! println!("{} combinations completed", summary.completed.len());
//! store.close()?;
//! # Ok(())
//! # }
//! ```

mod cancel;
mod config;
mod dataset;
mod engine;
mod experiment;
mod export;
mod report;
mod view;

pub use cancel::CancelFlag;
pub use config::{ConfigError, EvaluationConfig};
pub use dataset::{
    CombinationError, CombinationOutcome, CompletedCombination, Dataset, DriverError,
    EvaluationPlan, EvaluationSummary, FailedCombination,
};
pub use engine::{ColmapCli, ColmapConfig, EngineError, ReconstructionEngine};
pub use experiment::{
    Experiment, ExperimentError, Limits, MatchStats, PairMatches, ViewStats,
};
pub use export::{export_colmap, pair_id, ExportError, ExportSummary, MAX_IMAGE_ID, PINHOLE_MODEL};
pub use report::{parse_analysis_report, report_fields, MapperSummary, ReportError};
pub use view::{list_images, View};
