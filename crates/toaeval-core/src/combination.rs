use crate::NO_DETECTOR;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A (detector, descriptor) pair under evaluation, identified by name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Combination {
    pub detector: String,
    pub descriptor: String,
}

impl Combination {
    pub fn new(detector: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            detector: detector.into(),
            descriptor: descriptor.into(),
        }
    }

    /// `true` when the detector slot is the "let the descriptor detect" placeholder.
    pub fn uses_placeholder_detector(&self) -> bool {
        self.detector == NO_DETECTOR
    }

    /// Artifact name for this combination within `sequence`:
    /// `<sequence>_<detector>_<descriptor>`.
    pub fn artifact_name(&self, sequence: &str) -> String {
        format!("{sequence}_{}_{}", self.detector, self.descriptor)
    }

    /// Inverse of [`Combination::artifact_name`].
    ///
    /// Detector and descriptor names never contain `_`, so the split is taken
    /// from the right and the sequence name may contain underscores.
    pub fn parse_artifact_name(name: &str) -> Option<(String, Combination)> {
        let mut parts = name.rsplitn(3, '_');
        let descriptor = parts.next()?;
        let detector = parts.next()?;
        let sequence = parts.next()?;
        if sequence.is_empty() || detector.is_empty() || descriptor.is_empty() {
            return None;
        }
        Some((sequence.to_string(), Combination::new(detector, descriptor)))
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.detector, self.descriptor)
    }
}

/// Summary statistics of one reconstructed model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionStats {
    pub points: u64,
    pub observations: u64,
    /// Mean reprojection error in pixels.
    pub mean_reprojection_error: f64,
}

/// One directed tournament game between two combinations of a sequence.
///
/// `points*` are the truncated lengths (always equal), `error*` the means of
/// the truncated, ascending error sequences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    pub sequence: String,
    pub first: Combination,
    pub second: Combination,
    pub points1: usize,
    pub points2: usize,
    pub error1: f64,
    pub error2: f64,
}

impl PairwiseComparison {
    /// `true` when the first combination strictly beats the second.
    #[inline]
    pub fn first_wins(&self) -> bool {
        self.error1 < self.error2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_name_round_trips_with_underscored_sequence() {
        let combo = Combination::new("FAST", "BRIEF");
        let name = combo.artifact_name("kitti_00");
        assert_eq!(name, "kitti_00_FAST_BRIEF");
        let (sequence, parsed) = Combination::parse_artifact_name(&name).expect("parse");
        assert_eq!(sequence, "kitti_00");
        assert_eq!(parsed, combo);
    }

    #[test]
    fn malformed_artifact_names_are_rejected() {
        assert!(Combination::parse_artifact_name("FAST_BRIEF").is_none());
        assert!(Combination::parse_artifact_name("_FAST_BRIEF").is_none());
        assert!(Combination::parse_artifact_name("seq").is_none());
    }

    #[test]
    fn placeholder_detector_is_recognised() {
        assert!(Combination::new(NO_DETECTOR, "ORB").uses_placeholder_detector());
        assert!(!Combination::new("FAST", "ORB").uses_placeholder_detector());
    }
}
