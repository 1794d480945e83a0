//! Name-based algorithm registry and combination resolution.
//!
//! A combination is requested by name, e.g. `("FAST", "BRIEF")` or
//! `("None", "ORB")`. [`AlgorithmRegistry::resolve`] turns that request into a
//! [`ResolvedCombination`] once, before any image is processed:
//!
//! - an explicit detector name runs `detect` on the detector and `compute` on
//!   the descriptor ([`Extraction::Separate`]);
//! - the [`NO_DETECTOR`] placeholder lets a descriptor that can also detect run
//!   `detect_and_compute` ([`Extraction::Combined`]);
//! - a descriptor-only algorithm requested with the placeholder gets the first
//!   detector listed for it in the ordered fallback table.

use crate::{AlgorithmResult, Combination, FeatureAlgorithm, FeatureSet, GrayImage, Norm};
use std::collections::BTreeMap;

/// Detector name meaning "let the descriptor algorithm detect its own keypoints".
pub const NO_DETECTOR: &str = "None";

type Factory = Box<dyn Fn() -> Box<dyn FeatureAlgorithm> + Send + Sync>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid feature type <{0}>")]
    UnknownAlgorithm(String),
    #[error("<{0}> cannot detect keypoints")]
    NotADetector(String),
    #[error("<{0}> cannot compute descriptors")]
    NotADescriptor(String),
    #[error("<{0}> cannot detect keypoints and has no fallback detector")]
    NoFallbackDetector(String),
}

/// How the features of a resolved combination are produced.
pub enum Extraction {
    Separate {
        detector: Box<dyn FeatureAlgorithm>,
        descriptor: Box<dyn FeatureAlgorithm>,
    },
    Combined(Box<dyn FeatureAlgorithm>),
}

/// A requested combination together with the algorithms that implement it.
pub struct ResolvedCombination {
    /// The combination as requested; store keys and artifact names use it.
    pub requested: Combination,
    pub extraction: Extraction,
}

impl ResolvedCombination {
    /// Name of the algorithm that actually detects keypoints.
    pub fn effective_detector(&self) -> &str {
        match &self.extraction {
            Extraction::Separate { detector, .. } => detector.name(),
            Extraction::Combined(algorithm) => algorithm.name(),
        }
    }

    fn descriptor(&self) -> &dyn FeatureAlgorithm {
        match &self.extraction {
            Extraction::Separate { descriptor, .. } => descriptor.as_ref(),
            Extraction::Combined(algorithm) => algorithm.as_ref(),
        }
    }

    /// Norm used to match the descriptors of this combination.
    pub fn norm(&self) -> Norm {
        self.descriptor().default_norm()
    }

    /// Detect and describe keypoints on `image`.
    pub fn extract(&self, image: &GrayImage) -> AlgorithmResult<FeatureSet> {
        match &self.extraction {
            Extraction::Separate {
                detector,
                descriptor,
            } => {
                let keypoints = detector.detect(image)?;
                descriptor.compute(image, keypoints)
            }
            Extraction::Combined(algorithm) => algorithm.detect_and_compute(image),
        }
    }
}

/// Factories for every known algorithm plus the ordered fallback table.
#[derive(Default)]
pub struct AlgorithmRegistry {
    factories: BTreeMap<String, Factory>,
    fallbacks: Vec<(String, String)>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn FeatureAlgorithm> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Append a `(descriptor -> detector)` fallback entry. Earlier entries win.
    pub fn add_fallback(
        &mut self,
        descriptor: impl Into<String>,
        detector: impl Into<String>,
    ) -> &mut Self {
        self.fallbacks.push((descriptor.into(), detector.into()));
        self
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn fallback_for(&self, descriptor: &str) -> Option<&str> {
        self.fallbacks
            .iter()
            .find(|(d, _)| d == descriptor)
            .map(|(_, detector)| detector.as_str())
    }

    /// Instantiate the algorithm registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn FeatureAlgorithm>, ResolveError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ResolveError::UnknownAlgorithm(name.to_string()))
    }

    /// Resolve a requested `(detector, descriptor)` pair.
    pub fn resolve(&self, requested: &Combination) -> Result<ResolvedCombination, ResolveError> {
        let descriptor = self.create(&requested.descriptor)?;
        if !descriptor.can_describe() {
            return Err(ResolveError::NotADescriptor(requested.descriptor.clone()));
        }

        let extraction = if requested.uses_placeholder_detector() {
            if descriptor.can_detect() {
                Extraction::Combined(descriptor)
            } else {
                let fallback = self
                    .fallback_for(&requested.descriptor)
                    .ok_or_else(|| ResolveError::NoFallbackDetector(requested.descriptor.clone()))?;
                Extraction::Separate {
                    detector: self.create_detector(fallback)?,
                    descriptor,
                }
            }
        } else {
            Extraction::Separate {
                detector: self.create_detector(&requested.detector)?,
                descriptor,
            }
        };

        Ok(ResolvedCombination {
            requested: requested.clone(),
            extraction,
        })
    }

    fn create_detector(&self, name: &str) -> Result<Box<dyn FeatureAlgorithm>, ResolveError> {
        let detector = self.create(name)?;
        if !detector.can_detect() {
            return Err(ResolveError::NotADetector(name.to_string()));
        }
        Ok(detector)
    }
}
