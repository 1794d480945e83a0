//! FAST-9 segment-test corner detector.

use toaeval_core::{AlgorithmResult, FeatureAlgorithm, GrayImage, KeypointRecord};

/// Bresenham circle of radius 3, clockwise from 12 o'clock.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

const ARC_LENGTH: usize = 9;
const RADIUS: u32 = 3;
/// Diameter reported as keypoint scale.
const KEYPOINT_SIZE: f32 = 7.0;

#[derive(Clone, Debug)]
pub struct FastDetector {
    pub threshold: u8,
    /// Keep only 3x3 local maxima of the corner score.
    pub non_max_suppression: bool,
}

impl Default for FastDetector {
    fn default() -> Self {
        Self {
            threshold: 20,
            non_max_suppression: true,
        }
    }
}

impl FastDetector {
    /// Corner score at `(x, y)`, or `0` when the segment test fails.
    ///
    /// The score is the summed absolute contrast above threshold of the
    /// circle pixels on the winning side.
    fn score(&self, image: &GrayImage, x: u32, y: u32) -> u32 {
        let center = image.get_pixel(x, y)[0] as i32;
        let t = self.threshold as i32;

        let mut classes = [0i8; 16];
        let mut bright_sum = 0u32;
        let mut dark_sum = 0u32;
        for (i, &(dx, dy)) in CIRCLE.iter().enumerate() {
            let v = image.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0] as i32;
            if v > center + t {
                classes[i] = 1;
                bright_sum += (v - center - t) as u32;
            } else if v < center - t {
                classes[i] = -1;
                dark_sum += (center - t - v) as u32;
            }
        }

        let bright = has_arc(&classes, 1);
        let dark = has_arc(&classes, -1);
        match (bright, dark) {
            (true, true) => bright_sum.max(dark_sum),
            (true, false) => bright_sum,
            (false, true) => dark_sum,
            (false, false) => 0,
        }
    }
}

/// `true` when `classes` holds a contiguous (wrapping) run of `class` of at
/// least [`ARC_LENGTH`] entries.
fn has_arc(classes: &[i8; 16], class: i8) -> bool {
    let mut run = 0usize;
    for i in 0..(16 + ARC_LENGTH - 1) {
        if classes[i % 16] == class {
            run += 1;
            if run >= ARC_LENGTH {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

impl FeatureAlgorithm for FastDetector {
    fn name(&self) -> &str {
        "FAST"
    }

    fn can_detect(&self) -> bool {
        true
    }

    fn can_describe(&self) -> bool {
        false
    }

    fn detect(&self, image: &GrayImage) -> AlgorithmResult<Vec<KeypointRecord>> {
        let (width, height) = image.dimensions();
        if width <= 2 * RADIUS || height <= 2 * RADIUS {
            return Ok(Vec::new());
        }

        let stride = width as usize;
        let mut scores = vec![0u32; stride * height as usize];
        for y in RADIUS..height - RADIUS {
            for x in RADIUS..width - RADIUS {
                scores[y as usize * stride + x as usize] = self.score(image, x, y);
            }
        }

        let mut keypoints = Vec::new();
        for y in RADIUS..height - RADIUS {
            for x in RADIUS..width - RADIUS {
                let s = scores[y as usize * stride + x as usize];
                if s == 0 {
                    continue;
                }
                if self.non_max_suppression && !is_local_max(&scores, stride, x as usize, y as usize) {
                    continue;
                }
                keypoints.push(
                    KeypointRecord::new(x as f32, y as f32)
                        .with_scale(KEYPOINT_SIZE)
                        .with_response(s as f32),
                );
            }
        }

        log::debug!("FAST: {} keypoints on {width}x{height}", keypoints.len());
        Ok(keypoints)
    }
}

/// Strict maximum over the 3x3 neighbourhood; ties resolve to the first in
/// raster order.
fn is_local_max(scores: &[u32], stride: usize, x: usize, y: usize) -> bool {
    let s = scores[y * stride + x];
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            if nx == x && ny == y {
                continue;
            }
            let n = scores[ny * stride + nx];
            let earlier = (ny, nx) < (y, x);
            if n > s || (n == s && earlier) {
                return false;
            }
        }
    }
    true
}
