//! External reconstruction engine.

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("failed to start `{program} {stage}`: {source}")]
    Spawn {
        program: String,
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("`{stage}` exited with {status}: {stderr}")]
    Failed {
        stage: &'static str,
        status: String,
        stderr: String,
    },
}

/// The stages of an external SfM engine, in the order they are run.
///
/// `reconstruct` and `analyze_model` return the textual output of the stage
/// (standard output followed by standard error).
pub trait ReconstructionEngine {
    /// Register images and their features in `database`.
    fn import_features(&self, database: &Path, images: &Path) -> Result<(), EngineError>;

    /// Import the raw matches of `database` and verify them.
    fn match_features(&self, database: &Path) -> Result<(), EngineError>;

    /// Incremental mapping; models are written under `output` (`output/0`, ...).
    fn reconstruct(
        &self,
        database: &Path,
        images: &Path,
        output: &Path,
    ) -> Result<String, EngineError>;

    /// Summary statistics report of the model in `model`.
    fn analyze_model(&self, model: &Path) -> Result<String, EngineError>;

    /// Convert the model in `model` to a PLY point cloud at `output`.
    fn convert_model(&self, model: &Path, output: &Path) -> Result<(), EngineError>;
}

/// Settings of the COLMAP command-line engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColmapConfig {
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    #[serde(default)]
    pub use_gpu: bool,
}

fn default_executable() -> PathBuf {
    PathBuf::from("colmap")
}

impl Default for ColmapConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            use_gpu: false,
        }
    }
}

/// [`ReconstructionEngine`] backed by the `colmap` executable.
#[derive(Clone, Debug, Default)]
pub struct ColmapCli {
    config: ColmapConfig,
}

impl ColmapCli {
    pub fn new(config: ColmapConfig) -> Self {
        Self { config }
    }

    fn gpu_flag(&self) -> &'static str {
        if self.config.use_gpu {
            "1"
        } else {
            "0"
        }
    }

    fn run(&self, stage: &'static str, args: &[&OsStr]) -> Result<String, EngineError> {
        log::debug!("running {} {stage}", self.config.executable.display());
        let output = Command::new(&self.config.executable)
            .arg(stage)
            .args(args)
            .output()
            .map_err(|source| EngineError::Spawn {
                program: self.config.executable.display().to_string(),
                stage,
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(EngineError::Failed {
                stage,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(format!("{stdout}{stderr}"))
    }
}

impl ReconstructionEngine for ColmapCli {
    fn import_features(&self, database: &Path, images: &Path) -> Result<(), EngineError> {
        self.run(
            "feature_extractor",
            &[
                OsStr::new("--database_path"),
                database.as_os_str(),
                OsStr::new("--image_path"),
                images.as_os_str(),
                OsStr::new("--SiftExtraction.use_gpu"),
                OsStr::new(self.gpu_flag()),
            ],
        )
        .map(drop)
    }

    fn match_features(&self, database: &Path) -> Result<(), EngineError> {
        self.run(
            "exhaustive_matcher",
            &[
                OsStr::new("--database_path"),
                database.as_os_str(),
                OsStr::new("--SiftMatching.use_gpu"),
                OsStr::new(self.gpu_flag()),
            ],
        )
        .map(drop)
    }

    fn reconstruct(
        &self,
        database: &Path,
        images: &Path,
        output: &Path,
    ) -> Result<String, EngineError> {
        self.run(
            "mapper",
            &[
                OsStr::new("--database_path"),
                database.as_os_str(),
                OsStr::new("--image_path"),
                images.as_os_str(),
                OsStr::new("--output_path"),
                output.as_os_str(),
            ],
        )
    }

    fn analyze_model(&self, model: &Path) -> Result<String, EngineError> {
        self.run("model_analyzer", &[OsStr::new("--path"), model.as_os_str()])
    }

    fn convert_model(&self, model: &Path, output: &Path) -> Result<(), EngineError> {
        self.run(
            "model_converter",
            &[
                OsStr::new("--input_path"),
                model.as_os_str(),
                OsStr::new("--output_path"),
                output.as_os_str(),
                OsStr::new("--output_type"),
                OsStr::new("PLY"),
            ],
        )
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let engine = ColmapCli::new(ColmapConfig {
            executable: PathBuf::from("/nonexistent/colmap-binary"),
            use_gpu: false,
        });
        let err = engine.match_features(Path::new("db.sqlite")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Spawn {
                stage: "exhaustive_matcher",
                ..
            }
        ));
    }
}
