//! Per-combination feature pipeline.
//!
//! An [`Experiment`] covers one (sequence, detector, descriptor)
//! combination. [`Experiment::create_views`] fetches or computes the features
//! of every image, [`Experiment::create_matches`] fetches or computes the
//! matches of every image pair, and [`Experiment::export`] writes both to an
//! engine database. Every computed result is written to the [`Store`] before
//! the next one is started, so an interrupted run resumes where it stopped.

use crate::cancel::CancelFlag;
use crate::export::{export_colmap, ExportError, ExportSummary};
use crate::view::{list_images, View};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use toaeval_core::{
    AlgorithmError, CameraIntrinsics, CorrespondenceRecord, DescriptorMatcher, ResolvedCombination,
};
use toaeval_features::BruteForceMatcher;
use toaeval_store::{
    FeatureEntry, FeatureKey, FeatureTypeId, MatchEntry, SequenceId, Store, StoreError,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum ExperimentError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to list images in {path}: {source}")]
    ListImages {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cancelled")]
    Cancelled,
}

/// Caps applied to freshly computed features and matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_features: usize,
    pub max_matches: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_features: 2000,
            max_matches: 500,
        }
    }
}

/// Outcome of [`Experiment::create_views`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewStats {
    pub views: usize,
    pub keypoints: usize,
    /// Views whose features had to be computed.
    pub computed: usize,
}

/// Outcome of [`Experiment::create_matches`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub pairs: usize,
    pub matches: usize,
    /// Pairs whose matches had to be computed.
    pub computed: usize,
}

/// Match blocks keyed by `(later view index, earlier view index)`.
pub type PairMatches = BTreeMap<(usize, usize), Vec<CorrespondenceRecord>>;

pub struct Experiment {
    sequence: String,
    sequence_id: SequenceId,
    detector_id: FeatureTypeId,
    descriptor_id: FeatureTypeId,
    image_dir: PathBuf,
    image_format: String,
    combination: ResolvedCombination,
    matcher: Box<dyn DescriptorMatcher>,
    limits: Limits,
    cancel: Option<CancelFlag>,
    views: Vec<View>,
    matches: PairMatches,
}

impl Experiment {
    /// Prepare the pipeline for `combination` on the images in `image_dir`.
    ///
    /// The store keys use the combination as requested, so a placeholder
    /// detector keeps its own cache entries even when a fallback detector
    /// does the work.
    pub fn new(
        store: &Store,
        sequence: &str,
        image_dir: impl Into<PathBuf>,
        image_format: &str,
        combination: ResolvedCombination,
        limits: Limits,
    ) -> Result<Self, ExperimentError> {
        let sequence_id = store.sequence_id(sequence)?;
        let detector_id = store.feature_type_id(&combination.requested.detector)?;
        let descriptor_id = store.feature_type_id(&combination.requested.descriptor)?;
        let matcher = Box::new(BruteForceMatcher::new(combination.norm()));
        Ok(Self {
            sequence: sequence.to_string(),
            sequence_id,
            detector_id,
            descriptor_id,
            image_dir: image_dir.into(),
            image_format: image_format.to_string(),
            combination,
            matcher,
            limits,
            cancel: None,
            views: Vec::new(),
            matches: PairMatches::new(),
        })
    }

    /// Replace the default cross-checked brute-force matcher.
    pub fn with_matcher(mut self, matcher: Box<dyn DescriptorMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Abort between views and pairs once `cancel` is set.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn combination(&self) -> &ResolvedCombination {
        &self.combination
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn matches(&self) -> &PairMatches {
        &self.matches
    }

    fn check_cancelled(&self) -> Result<(), ExperimentError> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => Err(ExperimentError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Load every image of the sequence into a [`View`] with its features.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, store), fields(sequence = %self.sequence))
    )]
    pub fn create_views(&mut self, store: &Store) -> Result<ViewStats, ExperimentError> {
        self.views.clear();
        let files = list_images(&self.image_dir, &self.image_format).map_err(|source| {
            ExperimentError::ListImages {
                path: self.image_dir.clone(),
                source,
            }
        })?;

        let mut stats = ViewStats::default();
        for (index, path) in files.into_iter().enumerate() {
            self.check_cancelled()?;
            let view = self.load_view(store, index, path, &mut stats)?;
            stats.keypoints += view.features.len();
            self.views.push(view);
        }
        stats.views = self.views.len();
        Ok(stats)
    }

    fn load_view(
        &self,
        store: &Store,
        index: usize,
        path: PathBuf,
        stats: &mut ViewStats,
    ) -> Result<View, ExperimentError> {
        let image_err = |source| ExperimentError::Image {
            path: path.clone(),
            source,
        };
        let (width, height) = image::image_dimensions(&path).map_err(image_err)?;
        let image_id = store.image_id(&path.to_string_lossy(), self.sequence_id)?;
        let key = FeatureKey {
            image: image_id,
            detector: self.detector_id,
            descriptor: self.descriptor_id,
        };

        let (feature_id, features) = match store.get_feature(&key)? {
            Some(hit) => hit,
            None => {
                let gray = image::open(&path).map_err(image_err)?.to_luma8();
                let start = Instant::now();
                let extracted = self.combination.extract(&gray)?;
                let elapsed = start.elapsed();
                let features = extracted.strongest(self.limits.max_features);
                let feature_id = store.put_feature(
                    &key,
                    FeatureEntry {
                        count: extracted.len(),
                        size: features.descriptors.nbytes(),
                        elapsed,
                        features: &features,
                    },
                )?;
                stats.computed += 1;
                log::debug!(
                    "view {index}: {} keypoints ({} kept) in {:.3}s",
                    extracted.len(),
                    features.len(),
                    elapsed.as_secs_f64()
                );
                (feature_id, features)
            }
        };

        Ok(View {
            index,
            image_id,
            path,
            width,
            height,
            feature_id,
            features,
        })
    }

    /// Fetch or compute matches for every pair of views.
    ///
    /// For `i < j` the pair is keyed `(j, i)`: view `j` is the query and
    /// view `i` the train side.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, store), fields(sequence = %self.sequence))
    )]
    pub fn create_matches(&mut self, store: &Store) -> Result<MatchStats, ExperimentError> {
        self.matches.clear();
        let mut stats = MatchStats::default();
        let n = self.views.len();
        for i in 0..n.saturating_sub(1) {
            for j in i + 1..n {
                self.check_cancelled()?;
                let (later, earlier) = (&self.views[j], &self.views[i]);
                let matches = match store.get_match(later.feature_id, earlier.feature_id)? {
                    Some((_, hit)) => hit,
                    None => {
                        let start = Instant::now();
                        let mut found = self.matcher.match_descriptors(
                            &later.features.descriptors,
                            &earlier.features.descriptors,
                        )?;
                        let elapsed = start.elapsed();
                        found.sort_by(|a, b| a.distance.total_cmp(&b.distance));
                        let count = found.len();
                        found.truncate(self.limits.max_matches);
                        store.put_match(
                            later.feature_id,
                            earlier.feature_id,
                            MatchEntry {
                                count,
                                elapsed,
                                matches: &found,
                            },
                        )?;
                        stats.computed += 1;
                        log::debug!("pair ({j}, {i}): {count} matches ({} kept)", found.len());
                        found
                    }
                };
                stats.matches += matches.len();
                self.matches.insert((j, i), matches);
            }
        }
        stats.pairs = self.matches.len();
        Ok(stats)
    }

    /// Write the views and matches to a fresh COLMAP database at `path`.
    pub fn export(
        &self,
        path: &Path,
        camera: &CameraIntrinsics,
    ) -> Result<ExportSummary, ExportError> {
        export_colmap(path, camera, &self.views, &self.matches)
    }
}
