//! JSON configuration of an evaluation run.

use crate::engine::ColmapConfig;
use crate::experiment::Limits;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use toaeval_core::{CameraIntrinsics, Combination};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_image_format() -> String {
    "jpg".to_string()
}

fn default_max_features() -> usize {
    2000
}

fn default_max_matches() -> usize {
    500
}

/// Everything `toaeval evaluate` needs.
///
/// The dataset root holds one directory per sequence, each with an `images/`
/// subdirectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub dataset_root: PathBuf,
    #[serde(default = "default_image_format")]
    pub image_format: String,
    /// Row-major 3x3 calibration matrix shared by every image.
    pub intrinsics: [[f64; 3]; 3],
    pub store_path: PathBuf,
    pub databases_path: PathBuf,
    pub point_clouds_path: PathBuf,
    pub detectors: Vec<String>,
    pub descriptors: Vec<String>,
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
    #[serde(default)]
    pub engine: ColmapConfig,
}

impl EvaluationConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn camera(&self) -> CameraIntrinsics {
        CameraIntrinsics::from_rows(&self.intrinsics)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_features: self.max_features,
            max_matches: self.max_matches,
        }
    }

    /// Detector x descriptor combinations in configuration order.
    pub fn combinations(&self) -> Vec<Combination> {
        self.detectors
            .iter()
            .flat_map(|d| {
                self.descriptors
                    .iter()
                    .map(move |f| Combination::new(d.as_str(), f.as_str()))
            })
            .collect()
    }
}
