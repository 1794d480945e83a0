//! Rows read back from the stores.

use serde::{Deserialize, Serialize};
use toaeval_core::{Combination, ReconstructionStats};

/// Reconstruction outcome of one combination, identified by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionRecord {
    pub sequence: String,
    pub combination: Combination,
    pub stats: ReconstructionStats,
}

/// Cache statistics of one combination summed over all images and pairs of a
/// sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceStats {
    pub sequence: String,
    pub combination: Combination,
    pub feature_count: u64,
    /// Raw descriptor bytes.
    pub descriptor_size: u64,
    /// Stored (compressed) payload bytes.
    pub descriptor_compressed_size: u64,
    /// Seconds.
    pub extraction_time: f64,
    pub matches_count: u64,
    /// Seconds.
    pub matching_time: f64,
}

/// Tournament score of one combination within one sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceScore {
    pub sequence: String,
    pub combination: Combination,
    pub score: u64,
}

/// Average score of a group (a detector or a descriptor name).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupScore {
    pub name: String,
    pub score: f64,
}

/// Average score of one combination across sequences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinationScore {
    pub combination: Combination,
    pub score: f64,
}

/// Best partner within a group, e.g. the best detector for a descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestOf {
    pub group: String,
    pub best: String,
    pub score: f64,
}

/// Best combination of one sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestCombination {
    pub sequence: String,
    pub combination: Combination,
    pub score: u64,
}
