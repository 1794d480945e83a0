use std::path::{Path, PathBuf};
use toaeval_core::FeatureSet;
use toaeval_store::{FeatureId, ImageId};

/// One image of a sequence together with its (cached or computed) features.
#[derive(Clone, Debug)]
pub struct View {
    /// Position in the sorted image list of the sequence.
    pub index: usize,
    pub image_id: ImageId,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub feature_id: FeatureId,
    pub features: FeatureSet,
}

impl View {
    /// File name used for the image in the engine database.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Absolute paths of the files in `dir` whose extension is exactly
/// `extension`, in sorted order.
pub fn list_images(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path.canonicalize()?);
        }
    }
    files.sort();
    Ok(files)
}
