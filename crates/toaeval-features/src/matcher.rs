use toaeval_core::{
    AlgorithmError, AlgorithmResult, CorrespondenceRecord, DescriptorMatcher, Descriptors, Norm,
};

/// Exhaustive nearest-neighbour matcher.
///
/// With `cross_check` enabled a pair `(q, t)` is only kept when `t` is the
/// nearest train row of `q` and `q` is the nearest query row of `t`.
#[derive(Clone, Copy, Debug)]
pub struct BruteForceMatcher {
    pub norm: Norm,
    pub cross_check: bool,
}

impl BruteForceMatcher {
    pub fn new(norm: Norm) -> Self {
        Self {
            norm,
            cross_check: true,
        }
    }

    pub fn with_cross_check(mut self, cross_check: bool) -> Self {
        self.cross_check = cross_check;
        self
    }
}

#[inline]
fn hamming(a: &[u8], b: &[u8]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x ^ y).count_ones())
        .sum::<u32>() as f32
}

#[inline]
fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Row-by-row distance matrix, `query.rows() x train.rows()`.
fn distances(
    norm: Norm,
    query: &Descriptors,
    train: &Descriptors,
) -> AlgorithmResult<Vec<Vec<f32>>> {
    let incompatible = || AlgorithmError::IncompatibleDescriptors {
        query: query.norm(),
        train: train.norm(),
    };
    if query.norm() != norm || train.norm() != norm || query.width() != train.width() {
        return Err(incompatible());
    }

    let rows = (0..query.rows())
        .map(|q| {
            (0..train.rows())
                .map(|t| match norm {
                    Norm::Hamming => match (query.binary_row(q), train.binary_row(t)) {
                        (Some(a), Some(b)) => hamming(a, b),
                        _ => f32::INFINITY,
                    },
                    Norm::L2 => match (query.float_row(q), train.float_row(t)) {
                        (Some(a), Some(b)) => euclidean(a, b),
                        _ => f32::INFINITY,
                    },
                })
                .collect()
        })
        .collect();
    Ok(rows)
}

/// Index of the first minimum of `values`.
fn argmin(values: impl Iterator<Item = f32>) -> Option<(usize, f32)> {
    values
        .enumerate()
        .fold(None, |best, (i, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((i, d)),
        })
}

impl DescriptorMatcher for BruteForceMatcher {
    fn match_descriptors(
        &self,
        query: &Descriptors,
        train: &Descriptors,
    ) -> AlgorithmResult<Vec<CorrespondenceRecord>> {
        if query.is_empty() || train.is_empty() {
            return Ok(Vec::new());
        }
        let dist = distances(self.norm, query, train)?;

        let mut matches = Vec::new();
        for (q, row) in dist.iter().enumerate() {
            let Some((t, d)) = argmin(row.iter().copied()) else {
                continue;
            };
            if self.cross_check {
                let back = argmin(dist.iter().map(|r| r[t]));
                if back.map(|(bq, _)| bq) != Some(q) {
                    continue;
                }
            }
            matches.push(CorrespondenceRecord::new(q as u32, t as u32, d));
        }
        Ok(matches)
    }
}
