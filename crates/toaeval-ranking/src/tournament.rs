use std::collections::BTreeMap;
use toaeval_core::{Combination, PairwiseComparison};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Ascending per-point reprojection errors of one model.
///
/// Never empty: a missing or empty model is represented by the sentinel
/// `[+inf]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorDistribution(Vec<f64>);

impl ErrorDistribution {
    /// Sort `errors` ascending. An empty input yields the sentinel.
    pub fn from_errors(mut errors: Vec<f64>) -> Self {
        if errors.is_empty() {
            return Self::sentinel();
        }
        errors.sort_by(f64::total_cmp);
        Self(errors)
    }

    pub fn sentinel() -> Self {
        Self(vec![f64::INFINITY])
    }

    pub fn is_sentinel(&self) -> bool {
        self.0.len() == 1 && self.0[0] == f64::INFINITY
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Mean of the `n` smallest errors; `n` is clamped to `1..=len`.
    pub fn truncated_mean(&self, n: usize) -> f64 {
        let n = n.clamp(1, self.0.len());
        self.0[..n].iter().sum::<f64>() / n as f64
    }
}

/// Compare two distributions of the same sequence on their common length.
pub fn compare(
    sequence: &str,
    first: (&Combination, &ErrorDistribution),
    second: (&Combination, &ErrorDistribution),
) -> PairwiseComparison {
    let n = first.1.len().min(second.1.len());
    PairwiseComparison {
        sequence: sequence.to_string(),
        first: first.0.clone(),
        second: second.0.clone(),
        points1: n,
        points2: n,
        error1: first.1.truncated_mean(n),
        error2: second.1.truncated_mean(n),
    }
}

/// Every ordered pair of distinct combinations: `K * (K - 1)` rows, in
/// combination order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(entries), fields(combinations = entries.len()))
)]
pub fn run_tournament(
    sequence: &str,
    entries: &BTreeMap<Combination, ErrorDistribution>,
) -> Vec<PairwiseComparison> {
    let mut rows = Vec::with_capacity(entries.len() * entries.len().saturating_sub(1));
    for (a, dist_a) in entries {
        for (b, dist_b) in entries {
            if a != b {
                rows.push(compare(sequence, (a, dist_a), (b, dist_b)));
            }
        }
    }
    rows
}
