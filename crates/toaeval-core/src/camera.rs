use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics shared by every image of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// Axis skew `K[0][1]`. Carried for completeness; the exported camera
    /// model has no skew term.
    #[serde(default)]
    pub skew: f64,
}

impl CameraIntrinsics {
    /// Read the intrinsics from an upper-triangular calibration matrix `K`.
    pub fn from_matrix(k: &Matrix3<f64>) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            skew: k[(0, 1)],
        }
    }

    /// Same as [`CameraIntrinsics::from_matrix`] for a row-major `[[f64; 3]; 3]`.
    pub fn from_rows(rows: &[[f64; 3]; 3]) -> Self {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::from_matrix(&Matrix3::from_row_slice(&flat))
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Parameters of the PINHOLE camera model: `[fx, fy, cx, cy]`.
    pub fn pinhole_params(&self) -> [f64; 4] {
        [self.fx, self.fy, self.cx, self.cy]
    }
}
