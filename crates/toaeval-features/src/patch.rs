use toaeval_core::{
    AlgorithmResult, Descriptors, FeatureAlgorithm, FeatureSet, GrayImage, KeypointRecord, Norm,
};

const WINDOW: i32 = 16;
const CELL: i32 = 2;
const GRID: usize = (WINDOW / CELL) as usize;

/// Float descriptor built from a normalised, down-sampled intensity patch.
///
/// A `16x16` window around the keypoint is averaged into `8x8` cells, then
/// shifted to zero mean and scaled to unit length, which makes the descriptor
/// invariant to affine brightness changes.
#[derive(Clone, Debug, Default)]
pub struct PatchDescriptor;

impl PatchDescriptor {
    pub const WIDTH: usize = GRID * GRID;

    fn describe_one(image: &GrayImage, x0: i32, y0: i32) -> [f32; GRID * GRID] {
        let mut cells = [0f32; GRID * GRID];
        for (i, cell) in cells.iter_mut().enumerate() {
            let cx = x0 + (i % GRID) as i32 * CELL;
            let cy = y0 + (i / GRID) as i32 * CELL;
            let mut sum = 0u32;
            for dy in 0..CELL {
                for dx in 0..CELL {
                    sum += image.get_pixel((cx + dx) as u32, (cy + dy) as u32)[0] as u32;
                }
            }
            *cell = sum as f32 / (CELL * CELL) as f32;
        }

        let mean = cells.iter().sum::<f32>() / cells.len() as f32;
        cells.iter_mut().for_each(|v| *v -= mean);
        let norm = cells.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            cells.iter_mut().for_each(|v| *v /= norm);
        }
        cells
    }
}

impl FeatureAlgorithm for PatchDescriptor {
    fn name(&self) -> &str {
        "PATCH"
    }

    fn can_detect(&self) -> bool {
        false
    }

    fn can_describe(&self) -> bool {
        true
    }

    fn default_norm(&self) -> Norm {
        Norm::L2
    }

    fn compute(
        &self,
        image: &GrayImage,
        keypoints: Vec<KeypointRecord>,
    ) -> AlgorithmResult<FeatureSet> {
        let (width, height) = (image.width() as i32, image.height() as i32);
        let half = WINDOW / 2;

        let mut kept = Vec::with_capacity(keypoints.len());
        let mut descriptors = Descriptors::empty_float(Self::WIDTH);
        for kp in keypoints {
            let x0 = kp.x.round() as i32 - half;
            let y0 = kp.y.round() as i32 - half;
            if x0 < 0 || y0 < 0 || x0 + WINDOW > width || y0 + WINDOW > height {
                continue;
            }
            descriptors.push_float(&Self::describe_one(image, x0, y0));
            kept.push(kp);
        }

        FeatureSet::new(kept, descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    #[test]
    fn descriptor_has_unit_norm_and_zero_mean() {
        let img = GrayImage::from_fn(40, 40, |x, y| Luma([(x * 5 + y * 3) as u8]));
        let set = PatchDescriptor
            .compute(&img, vec![KeypointRecord::new(20.0, 20.0)])
            .expect("compute");
        let row = set.descriptors.float_row(0).expect("row");
        assert_eq!(row.len(), PatchDescriptor::WIDTH);
        assert_relative_eq!(row.iter().map(|v| v * v).sum::<f32>(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(row.iter().sum::<f32>(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn brightness_shift_does_not_change_descriptor() {
        let a = GrayImage::from_fn(40, 40, |x, y| Luma([(x * 3 + y * 2) as u8]));
        let b = GrayImage::from_fn(40, 40, |x, y| Luma([(x * 3 + y * 2 + 40) as u8]));
        let kp = vec![KeypointRecord::new(20.0, 20.0)];
        let da = PatchDescriptor.compute(&a, kp.clone()).expect("compute");
        let db = PatchDescriptor.compute(&b, kp).expect("compute");
        for (u, v) in da
            .descriptors
            .float_row(0)
            .unwrap()
            .iter()
            .zip(db.descriptors.float_row(0).unwrap())
        {
            assert_relative_eq!(u, v, epsilon = 1e-5);
        }
    }

    #[test]
    fn flat_patch_is_all_zero() {
        let img = GrayImage::from_pixel(32, 32, Luma([90]));
        let set = PatchDescriptor
            .compute(&img, vec![KeypointRecord::new(16.0, 16.0), KeypointRecord::new(1.0, 1.0)])
            .expect("compute");
        assert_eq!(set.len(), 1);
        assert!(set.descriptors.float_row(0).unwrap().iter().all(|&v| v == 0.0));
    }
}
