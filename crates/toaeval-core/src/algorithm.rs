//! Collaborator traits for feature extraction and descriptor matching.

use crate::{CorrespondenceRecord, Descriptors, FeatureSet, GrayImage, KeypointRecord, Norm};

/// Errors raised by feature algorithms and matchers.
#[derive(thiserror::Error, Debug)]
pub enum AlgorithmError {
    #[error("{algorithm} does not implement {operation}")]
    NotImplemented {
        algorithm: String,
        operation: &'static str,
    },
    #[error("{algorithm} failed: {message}")]
    Failed { algorithm: String, message: String },
    #[error("descriptor rows ({descriptors}) do not match keypoint count ({keypoints})")]
    RowMismatch { keypoints: usize, descriptors: usize },
    #[error("cannot match {query:?} descriptors against {train:?} descriptors")]
    IncompatibleDescriptors { query: Norm, train: Norm },
}

pub type AlgorithmResult<T> = Result<T, AlgorithmError>;

/// A keypoint detector, a descriptor extractor, or both.
///
/// Implementations advertise which roles they can play through
/// [`FeatureAlgorithm::can_detect`] and [`FeatureAlgorithm::can_describe`];
/// the registry uses those flags to resolve a combination up front instead of
/// probing for failures at extraction time.
pub trait FeatureAlgorithm {
    /// Registry name, e.g. `"FAST"`.
    fn name(&self) -> &str;

    fn can_detect(&self) -> bool;

    fn can_describe(&self) -> bool;

    /// Norm the descriptors of this algorithm are meant to be matched with.
    fn default_norm(&self) -> Norm {
        Norm::L2
    }

    fn detect(&self, _image: &GrayImage) -> AlgorithmResult<Vec<KeypointRecord>> {
        Err(AlgorithmError::NotImplemented {
            algorithm: self.name().to_string(),
            operation: "detect",
        })
    }

    /// Describe `keypoints`. The returned set may drop keypoints the
    /// descriptor cannot handle (e.g. too close to the border).
    fn compute(
        &self,
        _image: &GrayImage,
        _keypoints: Vec<KeypointRecord>,
    ) -> AlgorithmResult<FeatureSet> {
        Err(AlgorithmError::NotImplemented {
            algorithm: self.name().to_string(),
            operation: "compute",
        })
    }

    fn detect_and_compute(&self, image: &GrayImage) -> AlgorithmResult<FeatureSet> {
        let keypoints = self.detect(image)?;
        self.compute(image, keypoints)
    }
}

/// Descriptor matcher producing one correspondence per matched query row.
pub trait DescriptorMatcher {
    fn match_descriptors(
        &self,
        query: &Descriptors,
        train: &Descriptors,
    ) -> AlgorithmResult<Vec<CorrespondenceRecord>>;
}
