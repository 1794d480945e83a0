//! Trade-off aware evaluation of feature detectors and descriptors for
//! structure-from-motion.
//!
//! This facade re-exports the `toaeval-*` crates:
//!
//! - `toaeval::core`: records, collaborator traits, algorithm registry.
//! - `toaeval::features`: built-in detectors (FAST, ChESS), descriptors
//!   (BRIEF, PATCH) and the brute-force matcher.
//! - `toaeval::store`: the SQLite feature/match cache and the analysis
//!   database with its ranking views.
//! - `toaeval::pipeline`: the memoized per-combination pipeline, COLMAP export
//!   and the evaluation driver.
//! - `toaeval::ranking`: the pairwise truncated-mean tournament.
//!
//! ## Quickstart
//!
//! ```no_run
//! use toaeval::pipeline::{CancelFlag, ColmapCli, Dataset, EvaluationConfig, EvaluationPlan};
//! use toaeval::ranking::Analyzer;
//! use toaeval::store::{AnalysisStore, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EvaluationConfig::load_json("evaluation.json")?;
//! let store = Store::open(&config.store_path)?;
//! let mut dataset = Dataset::from_config(&config);
//! dataset.load()?;
//! dataset.evaluate(
//!     &store,
//!     &toaeval::features::builtin_registry(),
//!     &ColmapCli::new(config.engine.clone()),
//!     &EvaluationPlan::from_config(&config),
//!     &CancelFlag::new(),
//! )?;
//!
//! let mut analysis = AnalysisStore::create("analysis.sqlite")?;
//! Analyzer::new(&config.point_clouds_path)
//!     .with_expected(config.combinations())
//!     .analyze(&store, &mut analysis)?;
//! for best in analysis.best_detector_by_feature()? {
//!     println!("{}: {} ({:.2})", best.group, best.best, best.score);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The `toaeval` binary (feature `cli`) wraps the same flow in `evaluate`
//! and `analyze` subcommands.

pub use toaeval_core as core;
pub use toaeval_features as features;
pub use toaeval_pipeline as pipeline;
pub use toaeval_ranking as ranking;
pub use toaeval_store as store;

pub use toaeval_core::{
    AlgorithmRegistry, CameraIntrinsics, Combination, PairwiseComparison, ReconstructionStats,
    NO_DETECTOR,
};
pub use toaeval_pipeline::{CancelFlag, Dataset, EvaluationConfig, EvaluationPlan};
pub use toaeval_ranking::Analyzer;
pub use toaeval_store::{AnalysisStore, Store};
