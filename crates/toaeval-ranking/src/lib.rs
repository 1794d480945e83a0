//! Post-hoc ranking of evaluated combinations.
//!
//! For every sequence the [`Analyzer`] loads the per-point reprojection
//! errors of each combination's model, then plays a round-robin tournament:
//! every ordered pair of distinct combinations is compared on the mean of
//! their `n` smallest errors, where `n` is the shorter of the two point
//! counts. A combination without a usable model gets the sentinel
//! distribution `[+inf]` and loses every game.
//!
//! The rows land in an [`AnalysisStore`](toaeval_store::AnalysisStore),
//! whose views turn them into dominance scores (wins per sequence, averaged
//! per detector, descriptor, or both).
//!
//! ```no_run
//! use toaeval_ranking::Analyzer;
//! use toaeval_store::{AnalysisStore, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open("cache.sqlite")?;
//! let mut analysis = AnalysisStore::create("analysis.sqlite")?;
//! let summary = Analyzer::new("point_clouds").analyze(&store, &mut analysis)?;
//! println!("{} comparisons", summary.comparisons);
//! for row in analysis.ranking_by_feature_detector()? {
//!     println!("{} {:.2}", row.combination, row.score);
//! }
//! # Ok(())
//! # }
//! ```

mod analyzer;
mod model;
mod tournament;

pub use analyzer::{AnalysisSummary, AnalyzeError, Analyzer, SequenceDistributions};
pub use model::{ColmapBinaryReader, ModelError, ModelReader, POINTS3D_FILE};
pub use tournament::{compare, run_tournament, ErrorDistribution};
