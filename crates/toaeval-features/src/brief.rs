//! BRIEF binary descriptor with a fixed sampling pattern.

use image::imageops;
use toaeval_core::{
    AlgorithmResult, Descriptors, FeatureAlgorithm, FeatureSet, GrayImage, KeypointRecord, Norm,
};

const PATCH_SIZE: i32 = 31;
const HALF_PATCH: i32 = PATCH_SIZE / 2;
const SMOOTHING_SIGMA: f32 = 2.0;

/// Binary intensity-comparison descriptor.
///
/// The sampling pattern is generated from a fixed seed, so descriptors are
/// reproducible across runs and processes.
#[derive(Clone, Debug)]
pub struct BriefDescriptor {
    bytes: usize,
    pattern: Vec<[(i32, i32); 2]>,
}

impl Default for BriefDescriptor {
    fn default() -> Self {
        Self::new(32)
    }
}

impl BriefDescriptor {
    pub fn new(bytes: usize) -> Self {
        let mut rng = XorShift64(0x9E37_79B9_7F4A_7C15);
        let pattern = (0..bytes * 8)
            .map(|_| [rng.offset(), rng.offset()])
            .collect();
        Self { bytes, pattern }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    fn describe_one(&self, smoothed: &GrayImage, x: i32, y: i32, out: &mut [u8]) {
        out.fill(0);
        for (i, [(ax, ay), (bx, by)]) in self.pattern.iter().enumerate() {
            let a = smoothed.get_pixel((x + ax) as u32, (y + ay) as u32)[0];
            let b = smoothed.get_pixel((x + bx) as u32, (y + by) as u32)[0];
            if a < b {
                out[i / 8] |= 1 << (i % 8);
            }
        }
    }
}

impl FeatureAlgorithm for BriefDescriptor {
    fn name(&self) -> &str {
        "BRIEF"
    }

    fn can_detect(&self) -> bool {
        false
    }

    fn can_describe(&self) -> bool {
        true
    }

    fn default_norm(&self) -> Norm {
        Norm::Hamming
    }

    fn compute(
        &self,
        image: &GrayImage,
        keypoints: Vec<KeypointRecord>,
    ) -> AlgorithmResult<FeatureSet> {
        let smoothed = imageops::blur(image, SMOOTHING_SIGMA);
        let (width, height) = (image.width() as i32, image.height() as i32);

        let mut kept = Vec::with_capacity(keypoints.len());
        let mut descriptors = Descriptors::empty_binary(self.bytes);
        let mut row = vec![0u8; self.bytes];
        for kp in keypoints {
            let x = kp.x.round() as i32;
            let y = kp.y.round() as i32;
            if x < HALF_PATCH || y < HALF_PATCH || x >= width - HALF_PATCH || y >= height - HALF_PATCH
            {
                continue;
            }
            self.describe_one(&smoothed, x, y, &mut row);
            descriptors.push_binary(&row);
            kept.push(kp);
        }

        FeatureSet::new(kept, descriptors)
    }
}

/// Small deterministic generator for the sampling pattern.
struct XorShift64(u64);

impl XorShift64 {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform offset in `[-HALF_PATCH, HALF_PATCH]`.
    fn offset(&mut self) -> (i32, i32) {
        let span = PATCH_SIZE as u64;
        let dx = (self.next() % span) as i32 - HALF_PATCH;
        let dy = (self.next() % span) as i32 - HALF_PATCH;
        (dx, dy)
    }
}
