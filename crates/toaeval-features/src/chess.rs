use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor};
use toaeval_core::{AlgorithmResult, FeatureAlgorithm, GrayImage, KeypointRecord};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Support diameter of the ChESS ring, reported as keypoint scale.
const KEYPOINT_SIZE: f32 = 10.0;

/// ChESS saddle-point detector backed by `chess-corners`.
pub struct ChessDetector {
    config: ChessConfig,
}

impl Default for ChessDetector {
    fn default() -> Self {
        let mut config = ChessConfig::single_scale();
        config.params.threshold_rel = 0.2;
        config.params.nms_radius = 2;
        Self { config }
    }
}

impl ChessDetector {
    pub fn with_config(config: ChessConfig) -> Self {
        Self { config }
    }
}

fn keypoint_from_corner(c: &CornerDescriptor) -> KeypointRecord {
    KeypointRecord::new(c.x as f32, c.y as f32)
        .with_scale(KEYPOINT_SIZE)
        .with_angle((c.orientation as f32).to_degrees())
        .with_response(c.response as f32)
}

impl FeatureAlgorithm for ChessDetector {
    fn name(&self) -> &str {
        "CHESS"
    }

    fn can_detect(&self) -> bool {
        true
    }

    fn can_describe(&self) -> bool {
        false
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(width = image.width(), height = image.height()))
    )]
    fn detect(&self, image: &GrayImage) -> AlgorithmResult<Vec<KeypointRecord>> {
        let corners = find_chess_corners_image(image, &self.config);
        Ok(corners.iter().map(keypoint_from_corner).collect())
    }
}
