use crate::{AlgorithmError, Descriptors, KeypointRecord};
use serde::{Deserialize, Serialize};

/// Keypoints of one image together with their descriptor rows.
///
/// Row `i` of `descriptors` describes `keypoints[i]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub keypoints: Vec<KeypointRecord>,
    pub descriptors: Descriptors,
}

impl FeatureSet {
    /// Pair keypoints with descriptors, checking that the row counts agree.
    pub fn new(
        keypoints: Vec<KeypointRecord>,
        descriptors: Descriptors,
    ) -> Result<Self, AlgorithmError> {
        if keypoints.len() != descriptors.rows() {
            return Err(AlgorithmError::RowMismatch {
                keypoints: keypoints.len(),
                descriptors: descriptors.rows(),
            });
        }
        Ok(Self {
            keypoints,
            descriptors,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Keep the `max_features` keypoints with the highest response, strongest
    /// first, together with their descriptor rows.
    ///
    /// Ties keep detection order.
    pub fn strongest(&self, max_features: usize) -> FeatureSet {
        let mut order: Vec<usize> = (0..self.keypoints.len()).collect();
        order.sort_by(|&a, &b| {
            self.keypoints[b]
                .response
                .total_cmp(&self.keypoints[a].response)
        });
        order.truncate(max_features);

        FeatureSet {
            keypoints: order.iter().map(|&i| self.keypoints[i]).collect(),
            descriptors: self.descriptors.select(&order),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(responses: &[f32]) -> FeatureSet {
        let keypoints = responses
            .iter()
            .enumerate()
            .map(|(i, &r)| KeypointRecord::new(i as f32, 0.0).with_response(r))
            .collect();
        let descriptors = Descriptors::Binary {
            width: 1,
            data: (0..responses.len() as u8).collect(),
        };
        FeatureSet::new(keypoints, descriptors).expect("consistent rows")
    }

    #[test]
    fn strongest_ranks_by_descending_response() {
        let s = set(&[0.1, 0.9, 0.5, 0.7]).strongest(3);
        let xs: Vec<f32> = s.keypoints.iter().map(|k| k.x).collect();
        assert_eq!(xs, vec![1.0, 3.0, 2.0]);
        assert_eq!(s.descriptors.binary_row(0), Some(&[1u8][..]));
        assert_eq!(s.descriptors.binary_row(2), Some(&[2u8][..]));
    }

    #[test]
    fn strongest_keeps_everything_under_the_cap() {
        let s = set(&[0.3, 0.2]).strongest(2000);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let err = FeatureSet::new(vec![KeypointRecord::new(0.0, 0.0)], Descriptors::empty_binary(8))
            .unwrap_err();
        assert!(matches!(
            err,
            AlgorithmError::RowMismatch {
                keypoints: 1,
                descriptors: 0
            }
        ));
    }
}
