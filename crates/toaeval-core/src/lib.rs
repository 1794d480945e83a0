//! Core types for trade-off aware evaluation of feature algorithms in
//! structure-from-motion.
//!
//! This crate is intentionally small. It holds the fixed-field records that
//! flow through the feature cache (keypoints, descriptor matrices,
//! correspondences), the camera intrinsics shared by a dataset, the
//! collaborator traits implemented by concrete detectors/descriptors/matchers,
//! and the [`AlgorithmRegistry`] that resolves a requested
//! (detector, descriptor) pair into something that can actually run.
//!
//! It does *not* depend on any concrete algorithm, database or engine.

mod algorithm;
mod camera;
mod combination;
mod descriptors;
mod features;
mod keypoint;
mod logger;
mod registry;

pub use algorithm::{AlgorithmError, AlgorithmResult, DescriptorMatcher, FeatureAlgorithm};
pub use camera::CameraIntrinsics;
pub use combination::{Combination, PairwiseComparison, ReconstructionStats};
pub use descriptors::{Descriptors, Norm};
pub use features::FeatureSet;
pub use keypoint::{CorrespondenceRecord, KeypointRecord};
pub use registry::{AlgorithmRegistry, Extraction, ResolveError, ResolvedCombination, NO_DETECTOR};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, set_log_context};

/// Grayscale image type consumed by every [`FeatureAlgorithm`].
pub use image::GrayImage;
