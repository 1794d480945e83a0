//! Built-in feature algorithms for `toaeval`.
//!
//! The evaluation core only sees the [`FeatureAlgorithm`] and
//! [`DescriptorMatcher`] traits from `toaeval-core`. This crate provides a
//! small, dependency-light set of implementations so a dataset can be
//! evaluated without bindings to an external vision library:
//!
//! | name    | role       | norm    |
//! |---------|------------|---------|
//! | `FAST`  | detector   |         |
//! | `CHESS` | detector   |         |
//! | `BRIEF` | descriptor | Hamming |
//! | `PATCH` | descriptor | L2      |
//!
//! Descriptor-only algorithms requested with the `None` detector fall back to
//! `FAST`.
//!
//! [`FeatureAlgorithm`]: toaeval_core::FeatureAlgorithm
//! [`DescriptorMatcher`]: toaeval_core::DescriptorMatcher

mod brief;
mod chess;
mod fast;
mod matcher;
mod patch;

pub use brief::BriefDescriptor;
pub use chess::ChessDetector;
pub use fast::FastDetector;
pub use matcher::BruteForceMatcher;
pub use patch::PatchDescriptor;

use toaeval_core::AlgorithmRegistry;

/// Registry holding every built-in algorithm and the default fallback table.
pub fn builtin_registry() -> AlgorithmRegistry {
    let mut registry = AlgorithmRegistry::new();
    registry
        .register("FAST", || Box::new(FastDetector::default()))
        .register("CHESS", || Box::new(ChessDetector::default()))
        .register("BRIEF", || Box::new(BriefDescriptor::default()))
        .register("PATCH", || Box::new(PatchDescriptor::default()))
        .add_fallback("BRIEF", "FAST")
        .add_fallback("PATCH", "FAST");
    registry
}
