//! Evaluation driver.
//!
//! [`Dataset::evaluate`] walks every (sequence, detector, descriptor)
//! combination, runs the feature pipeline and the engine stages for each one
//! that has no model yet, and records the outcome. A failing combination is
//! logged and skipped; only user cancellation stops the run.

use crate::cancel::CancelFlag;
use crate::config::EvaluationConfig;
use crate::engine::{EngineError, ReconstructionEngine};
use crate::experiment::{Experiment, ExperimentError, Limits};
use crate::export::ExportError;
use crate::report::{parse_analysis_report, MapperSummary, ReportError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use toaeval_core::{
    AlgorithmRegistry, CameraIntrinsics, Combination, ReconstructionStats, ResolveError,
};
use toaeval_store::{Store, StoreError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Reasons a single combination did not complete.
#[derive(thiserror::Error, Debug)]
pub enum CombinationError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Experiment(#[from] ExperimentError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cancelled")]
    Cancelled,
}

/// Errors that stop the whole evaluation.
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("evaluation cancelled by user")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where artifacts go and what is evaluated.
#[derive(Clone, Debug)]
pub struct EvaluationPlan {
    pub databases_path: PathBuf,
    pub point_clouds_path: PathBuf,
    pub combinations: Vec<Combination>,
    pub limits: Limits,
}

impl EvaluationPlan {
    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            databases_path: config.databases_path.clone(),
            point_clouds_path: config.point_clouds_path.clone(),
            combinations: config.combinations(),
            limits: config.limits(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CombinationOutcome {
    /// A model already existed.
    Skipped,
    Completed(ReconstructionStats),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletedCombination {
    pub sequence: String,
    pub combination: Combination,
    pub stats: ReconstructionStats,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FailedCombination {
    pub sequence: String,
    pub combination: Combination,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationSummary {
    pub completed: Vec<CompletedCombination>,
    pub skipped: usize,
    pub failed: Vec<FailedCombination>,
}

/// A dataset root with one directory per sequence.
#[derive(Clone, Debug)]
pub struct Dataset {
    root: PathBuf,
    camera: CameraIntrinsics,
    image_format: String,
    sequences: BTreeMap<String, PathBuf>,
}

impl Dataset {
    pub fn new(root: impl Into<PathBuf>, camera: CameraIntrinsics, image_format: &str) -> Self {
        Self {
            root: root.into(),
            camera,
            image_format: image_format.to_string(),
            sequences: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self::new(
            config.dataset_root.clone(),
            config.camera(),
            &config.image_format,
        )
    }

    /// Discover the sequence directories under the root. Returns how many
    /// were found.
    pub fn load(&mut self) -> std::io::Result<usize> {
        self.sequences.clear();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name() {
                self.sequences
                    .insert(name.to_string_lossy().into_owned(), path.clone());
            }
        }
        log::info!(
            "found {} sequences under {}",
            self.sequences.len(),
            self.root.display()
        );
        Ok(self.sequences.len())
    }

    /// Sequence names and directories in sorted order.
    pub fn sequences(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.sequences
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    /// Evaluate every combination of `plan` on every sequence.
    ///
    /// The store is committed after each combination, whatever its outcome.
    /// When `cancel` is set an unfinished combination is abandoned without a
    /// commit and [`DriverError::Cancelled`] is returned. A combination that
    /// already completed when the flag was seen is committed first.
    pub fn evaluate(
        &self,
        store: &Store,
        registry: &AlgorithmRegistry,
        engine: &dyn ReconstructionEngine,
        plan: &EvaluationPlan,
        cancel: &CancelFlag,
    ) -> Result<EvaluationSummary, DriverError> {
        let run = Run {
            dataset: self,
            store,
            registry,
            engine,
            plan,
            cancel,
        };

        let mut summary = EvaluationSummary::default();
        for (sequence, folder) in self.sequences() {
            log::info!("==== {sequence} ====");
            for combination in &plan.combinations {
                if cancel.is_cancelled() {
                    return Err(DriverError::Cancelled);
                }
                log::info!("---- {combination} ----");
                toaeval_core::set_log_context(Some(format!("{sequence}/{combination}")));
                let result = run.combination(sequence, folder, combination);
                toaeval_core::set_log_context(None);
                if cancel.is_cancelled() {
                    // Its model directory exists, so a resumed run would skip it.
                    if let Ok(CombinationOutcome::Completed(_)) = result {
                        store.commit()?;
                        log::warn!("cancelled after {sequence} {combination} completed");
                    } else {
                        log::warn!("cancelled during {sequence} {combination}");
                    }
                    return Err(DriverError::Cancelled);
                }

                match result {
                    Ok(CombinationOutcome::Skipped) => {
                        log::info!("model exists, skipping");
                        summary.skipped += 1;
                    }
                    Ok(CombinationOutcome::Completed(stats)) => {
                        summary.completed.push(CompletedCombination {
                            sequence: sequence.to_string(),
                            combination: combination.clone(),
                            stats,
                        });
                    }
                    Err(err) => {
                        log::warn!("{sequence} {combination} failed: {err}");
                        summary.failed.push(FailedCombination {
                            sequence: sequence.to_string(),
                            combination: combination.clone(),
                            message: err.to_string(),
                        });
                    }
                }
                store.commit()?;
            }
        }

        log::info!(
            "evaluation done: {} completed, {} skipped, {} failed",
            summary.completed.len(),
            summary.skipped,
            summary.failed.len()
        );
        Ok(summary)
    }
}

struct Run<'a> {
    dataset: &'a Dataset,
    store: &'a Store,
    registry: &'a AlgorithmRegistry,
    engine: &'a dyn ReconstructionEngine,
    plan: &'a EvaluationPlan,
    cancel: &'a CancelFlag,
}

impl Run<'_> {
    fn check_cancelled(&self) -> Result<(), CombinationError> {
        if self.cancel.is_cancelled() {
            return Err(CombinationError::Cancelled);
        }
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(sequence = %sequence, combination = %combination))
    )]
    fn combination(
        &self,
        sequence: &str,
        folder: &Path,
        combination: &Combination,
    ) -> Result<CombinationOutcome, CombinationError> {
        let name = combination.artifact_name(sequence);
        let cloud_dir = self.plan.point_clouds_path.join(&name);
        let model_dir = cloud_dir.join("0");
        if model_dir.exists() {
            return Ok(CombinationOutcome::Skipped);
        }
        std::fs::create_dir_all(&cloud_dir)?;

        let image_dir = folder.join("images");
        let resolved = self.registry.resolve(combination)?;
        if resolved.effective_detector() != combination.detector {
            log::info!(
                "{} detects with {}",
                combination.descriptor,
                resolved.effective_detector()
            );
        }
        let mut experiment = Experiment::new(
            self.store,
            sequence,
            &image_dir,
            &self.dataset.image_format,
            resolved,
            self.plan.limits,
        )?
        .with_cancel_flag(self.cancel.clone());

        let start = Instant::now();
        let views = experiment.create_views(self.store)?;
        log::info!(
            "Processed {} views ({} computed, {} keypoints) in {:.3} seconds",
            views.views,
            views.computed,
            views.keypoints,
            start.elapsed().as_secs_f64()
        );

        let start = Instant::now();
        let pairs = experiment.create_matches(self.store)?;
        log::info!(
            "Processed {} pairs ({} computed, {} matches) in {:.3} seconds",
            pairs.pairs,
            pairs.computed,
            pairs.matches,
            start.elapsed().as_secs_f64()
        );

        let database = self.plan.databases_path.join(format!("{name}.sqlite"));
        experiment.export(&database, &self.dataset.camera)?;

        self.check_cancelled()?;
        self.engine.import_features(&database, &image_dir)?;
        self.check_cancelled()?;
        self.engine.match_features(&database)?;
        self.check_cancelled()?;
        let mapper_log = self.engine.reconstruct(&database, &image_dir, &cloud_dir)?;
        self.check_cancelled()?;
        let report = self.engine.analyze_model(&model_dir)?;
        let stats = parse_analysis_report(&report)?;
        self.store.put_reconstruction(sequence, combination, &stats)?;

        if let Err(err) = self
            .engine
            .convert_model(&model_dir, &cloud_dir.join("0.ply"))
        {
            log::warn!("PLY conversion failed: {err}");
        }
        for line in MapperSummary::from_log(&mapper_log).lines() {
            log::info!("{line}");
        }

        Ok(CombinationOutcome::Completed(stats))
    }
}
