use serde::{Deserialize, Serialize};

/// A detected keypoint in pixel coordinates.
///
/// Field semantics follow the usual detector conventions: `scale` is the
/// diameter of the meaningful neighbourhood, `angle` is the dominant
/// orientation in degrees (`-1.0` when not computed), and `response` is the
/// detector strength used to rank keypoints.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeypointRecord {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub angle: f32,
    pub class_id: i32,
    pub octave: i32,
    pub response: f32,
}

impl KeypointRecord {
    /// Keypoint at `(x, y)` with unit scale, no orientation and zero response.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            scale: 1.0,
            angle: -1.0,
            class_id: -1,
            octave: 0,
            response: 0.0,
        }
    }

    pub fn with_response(mut self, response: f32) -> Self {
        self.response = response;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }
}

/// A single descriptor correspondence between a query and a train set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceRecord {
    /// Row in the query descriptor matrix.
    pub query_index: u32,
    /// Row in the train descriptor matrix.
    pub train_index: u32,
    /// Descriptor distance under the matcher's norm.
    pub distance: f32,
}

impl CorrespondenceRecord {
    pub fn new(query_index: u32, train_index: u32, distance: f32) -> Self {
        Self {
            query_index,
            train_index,
            distance,
        }
    }
}
