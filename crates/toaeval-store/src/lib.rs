//! Persistent storage for `toaeval`.
//!
//! Two SQLite databases are involved in an evaluation:
//!
//! - [`Store`] is the long-lived cache. It memoizes per-image features and
//!   per-image-pair matches under stable keys, and records one
//!   reconstruction outcome per evaluated combination. Records are
//!   append-only: a second write for an existing key is an error.
//! - [`AnalysisStore`] is recreated on every analysis run. It holds the
//!   pairwise tournament rows, copies of the reconstruction and
//!   correspondence statistics, and the ranking views built on top of them.
//!
//! Payloads are serialized with `serde_json` and zlib-compressed (see
//! [`codec`]).

pub mod codec;

mod analysis;
mod error;
mod records;
mod schema;
mod store;

pub use analysis::AnalysisStore;
pub use codec::CodecError;
pub use error::{StoreError, StoreResult};
pub use records::{
    BestCombination, BestOf, CombinationScore, CorrespondenceStats, GroupScore,
    ReconstructionRecord, SequenceScore,
};
pub use store::{
    FeatureEntry, FeatureId, FeatureKey, FeatureTypeId, ImageId, MatchEntry, MatchId, SequenceId,
    Store,
};
