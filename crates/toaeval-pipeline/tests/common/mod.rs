#![allow(dead_code)]

use image::{GrayImage, Luma};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use toaeval_core::{
    AlgorithmRegistry, AlgorithmResult, Descriptors, FeatureAlgorithm, FeatureSet, KeypointRecord,
};
use toaeval_pipeline::{CancelFlag, EngineError, ReconstructionEngine};

pub const REPORT: &str =
    "Cameras: 1\nImages: 3\nRegistered images: 3\nPoints: 1200\nObservations: 3400\nMean reprojection error: 0.85px\n";

/// Detector returning five keypoints with increasing response.
pub struct SpyDetector {
    pub calls: Arc<AtomicUsize>,
}

impl FeatureAlgorithm for SpyDetector {
    fn name(&self) -> &str {
        "FAST"
    }
    fn can_detect(&self) -> bool {
        true
    }
    fn can_describe(&self) -> bool {
        false
    }
    fn detect(&self, _image: &GrayImage) -> AlgorithmResult<Vec<KeypointRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..5)
            .map(|i| KeypointRecord::new(10.0 + 8.0 * i as f32, 20.0).with_response(i as f32))
            .collect())
    }
}

/// Float descriptor that encodes the keypoint itself.
pub struct SpyDescriptor;

impl FeatureAlgorithm for SpyDescriptor {
    fn name(&self) -> &str {
        "SIFT"
    }
    fn can_detect(&self) -> bool {
        false
    }
    fn can_describe(&self) -> bool {
        true
    }
    fn compute(
        &self,
        _image: &GrayImage,
        keypoints: Vec<KeypointRecord>,
    ) -> AlgorithmResult<FeatureSet> {
        let data = keypoints
            .iter()
            .flat_map(|k| [k.x, k.y, k.response, 1.0])
            .collect();
        FeatureSet::new(keypoints, Descriptors::Float { width: 4, data })
    }
}

/// Registry with `FAST` (spied) and `SIFT`, plus `SIFT -> FAST` fallback.
pub fn spy_registry() -> (AlgorithmRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut registry = AlgorithmRegistry::new();
    registry
        .register("FAST", move || {
            Box::new(SpyDetector {
                calls: counter.clone(),
            })
        })
        .register("SIFT", || Box::new(SpyDescriptor))
        .add_fallback("SIFT", "FAST");
    (registry, calls)
}

/// `<root>/<sequence>/images/00N.png` for `count` images.
pub fn write_sequence(root: &Path, sequence: &str, count: usize) -> PathBuf {
    let images = root.join(sequence).join("images");
    std::fs::create_dir_all(&images).expect("mkdir");
    for i in 0..count {
        let img = GrayImage::from_fn(64, 48, |x, y| Luma([((x * 3 + y * 5 + i as u32 * 7) % 256) as u8]));
        img.save(images.join(format!("{i:03}.png"))).expect("save png");
    }
    images
}

/// Engine stand-in that records stage calls and fakes a model directory.
#[derive(Default)]
pub struct FakeEngine {
    pub calls: RefCell<Vec<&'static str>>,
    pub fail_mapper: bool,
    /// Set this flag while the mapper runs.
    pub cancel_during_mapper: Option<CancelFlag>,
    /// Set this flag while the model converter runs.
    pub cancel_during_convert: Option<CancelFlag>,
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl ReconstructionEngine for FakeEngine {
    fn import_features(&self, database: &Path, _images: &Path) -> Result<(), EngineError> {
        assert!(database.exists(), "database exported before import");
        self.calls.borrow_mut().push("import_features");
        Ok(())
    }

    fn match_features(&self, _database: &Path) -> Result<(), EngineError> {
        self.calls.borrow_mut().push("match_features");
        Ok(())
    }

    fn reconstruct(
        &self,
        _database: &Path,
        _images: &Path,
        output: &Path,
    ) -> Result<String, EngineError> {
        self.calls.borrow_mut().push("reconstruct");
        if let Some(flag) = &self.cancel_during_mapper {
            flag.cancel();
        }
        if self.fail_mapper {
            return Err(EngineError::Failed {
                stage: "mapper",
                status: "exit status: 1".into(),
                stderr: "no good initial image pair found".into(),
            });
        }
        std::fs::create_dir_all(output.join("0")).expect("model dir");
        Ok("Initializing with image pair #1 and #3\nPoints: 1200\nElapsed time: 0.010 [minutes]\n".into())
    }

    fn analyze_model(&self, model: &Path) -> Result<String, EngineError> {
        assert!(model.ends_with("0"));
        self.calls.borrow_mut().push("analyze_model");
        Ok(REPORT.into())
    }

    fn convert_model(&self, _model: &Path, _output: &Path) -> Result<(), EngineError> {
        self.calls.borrow_mut().push("convert_model");
        if let Some(flag) = &self.cancel_during_convert {
            flag.cancel();
        }
        Err(EngineError::Failed {
            stage: "model_converter",
            status: "exit status: 1".into(),
            stderr: "PLY writer unavailable".into(),
        })
    }
}
