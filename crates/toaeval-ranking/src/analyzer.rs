use crate::model::{ColmapBinaryReader, ModelReader};
use crate::tournament::{run_tournament, ErrorDistribution};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use toaeval_core::Combination;
use toaeval_store::{AnalysisStore, Store, StoreError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Error distributions of one sequence, keyed by combination.
pub type SequenceDistributions = BTreeMap<Combination, ErrorDistribution>;

#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub sequences: usize,
    /// Distributions that entered a tournament, sentinels included.
    pub distributions: usize,
    pub sentinels: usize,
    pub comparisons: usize,
}

/// Builds the tournament from the models under a point-cloud root.
///
/// Every directory named `<sequence>_<detector>_<descriptor>` is one
/// candidate; its model is read from the `0` subdirectory.
pub struct Analyzer {
    point_clouds_path: PathBuf,
    expected: Vec<Combination>,
    reader: Box<dyn ModelReader>,
}

impl Analyzer {
    pub fn new(point_clouds_path: impl Into<PathBuf>) -> Self {
        Self {
            point_clouds_path: point_clouds_path.into(),
            expected: Vec::new(),
            reader: Box::new(ColmapBinaryReader),
        }
    }

    /// Combinations every discovered sequence is expected to have. Those
    /// without a directory still enter the tournament, as sentinels.
    pub fn with_expected(mut self, combinations: Vec<Combination>) -> Self {
        self.expected = combinations;
        self
    }

    pub fn with_reader(mut self, reader: impl ModelReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn point_clouds_path(&self) -> &Path {
        &self.point_clouds_path
    }

    /// Load the error distribution of every candidate, per sequence.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn collect(&self) -> Result<BTreeMap<String, SequenceDistributions>, AnalyzeError> {
        let scan_err = |source: std::io::Error| AnalyzeError::Scan {
            path: self.point_clouds_path.clone(),
            source,
        };
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.point_clouds_path).map_err(scan_err)? {
            let path = entry.map_err(scan_err)?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut sequences: BTreeMap<String, SequenceDistributions> = BTreeMap::new();
        for dir in dirs {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Some((sequence, combination)) = Combination::parse_artifact_name(&name) else {
                log::warn!("ignoring {}: not a combination directory", dir.display());
                continue;
            };
            let distribution = self.load(&dir.join("0"));
            log::debug!(
                "{sequence} {combination}: {} points",
                if distribution.is_sentinel() {
                    0
                } else {
                    distribution.len()
                }
            );
            sequences
                .entry(sequence)
                .or_default()
                .insert(combination, distribution);
        }

        for distributions in sequences.values_mut() {
            for combination in &self.expected {
                distributions
                    .entry(combination.clone())
                    .or_insert_with(ErrorDistribution::sentinel);
            }
        }
        Ok(sequences)
    }

    fn load(&self, model: &Path) -> ErrorDistribution {
        if !model.is_dir() {
            return ErrorDistribution::sentinel();
        }
        match self.reader.point_errors(model) {
            Ok(errors) => ErrorDistribution::from_errors(errors),
            Err(err) => {
                log::warn!("unreadable model {}: {err}", model.display());
                ErrorDistribution::sentinel()
            }
        }
    }

    /// Run the tournament and fill `analysis` with its rows plus the
    /// reconstruction and correspondence statistics of `store`.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn analyze(
        &self,
        store: &Store,
        analysis: &mut AnalysisStore,
    ) -> Result<AnalysisSummary, AnalyzeError> {
        let sequences = self.collect()?;

        let mut summary = AnalysisSummary {
            sequences: sequences.len(),
            ..AnalysisSummary::default()
        };
        for (sequence, distributions) in &sequences {
            summary.distributions += distributions.len();
            summary.sentinels += distributions.values().filter(|d| d.is_sentinel()).count();
            let rows = run_tournament(sequence, distributions);
            summary.comparisons += rows.len();
            analysis.insert_comparisons(&rows)?;
        }

        analysis.insert_reconstructions(&store.reconstructions()?)?;
        analysis.insert_correspondence(&store.correspondence_stats()?)?;

        log::info!(
            "ranked {} sequences: {} distributions ({} without model), {} comparisons",
            summary.sequences,
            summary.distributions,
            summary.sentinels,
            summary.comparisons
        );
        Ok(summary)
    }
}
