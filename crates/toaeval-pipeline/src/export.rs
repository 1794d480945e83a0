//! COLMAP database writer.
//!
//! Produces the SQLite file the COLMAP command-line tools read: one PINHOLE
//! camera, one image row per view with its keypoints, zero-filled 128-byte
//! descriptors, and one raw match block per view pair.

use crate::experiment::PairMatches;
use crate::view::View;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use toaeval_core::{CameraIntrinsics, CorrespondenceRecord};

/// Largest image id COLMAP accepts; also the pair-id multiplier.
pub const MAX_IMAGE_ID: i64 = 2_147_483_647;

/// COLMAP camera model id of `PINHOLE`.
pub const PINHOLE_MODEL: i64 = 1;

const DESCRIPTOR_WIDTH: usize = 128;

const COLMAP_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cameras (
    camera_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    model INTEGER NOT NULL,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    params BLOB,
    prior_focal_length INTEGER NOT NULL);
CREATE TABLE IF NOT EXISTS images (
    image_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    camera_id INTEGER NOT NULL,
    prior_qw REAL,
    prior_qx REAL,
    prior_qy REAL,
    prior_qz REAL,
    prior_tx REAL,
    prior_ty REAL,
    prior_tz REAL,
    CONSTRAINT image_id_check CHECK(image_id >= 0 and image_id < 2147483647),
    FOREIGN KEY(camera_id) REFERENCES cameras(camera_id));
CREATE TABLE IF NOT EXISTS keypoints (
    image_id INTEGER PRIMARY KEY NOT NULL,
    rows INTEGER NOT NULL,
    cols INTEGER NOT NULL,
    data BLOB,
    FOREIGN KEY(image_id) REFERENCES images(image_id) ON DELETE CASCADE);
CREATE TABLE IF NOT EXISTS descriptors (
    image_id INTEGER PRIMARY KEY NOT NULL,
    rows INTEGER NOT NULL,
    cols INTEGER NOT NULL,
    data BLOB,
    FOREIGN KEY(image_id) REFERENCES images(image_id) ON DELETE CASCADE);
CREATE TABLE IF NOT EXISTS matches (
    pair_id INTEGER PRIMARY KEY NOT NULL,
    rows INTEGER NOT NULL,
    cols INTEGER NOT NULL,
    data BLOB);
CREATE TABLE IF NOT EXISTS two_view_geometries (
    pair_id INTEGER PRIMARY KEY NOT NULL,
    rows INTEGER NOT NULL,
    cols INTEGER NOT NULL,
    data BLOB,
    config INTEGER NOT NULL,
    F BLOB,
    E BLOB,
    H BLOB,
    qvec BLOB,
    tvec BLOB);
CREATE UNIQUE INDEX IF NOT EXISTS index_name ON images(name);
";

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("nothing to export to {0}: no views")]
    NoViews(PathBuf),
    #[error("match block ({0}, {1}) refers to a missing view")]
    UnknownView(usize, usize),
}

/// Row counts written by [`export_colmap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub cameras: usize,
    pub images: usize,
    pub match_blocks: usize,
}

/// COLMAP pair id of two image ids, independent of their order.
///
/// Returns the id and whether the pair had to be swapped.
pub fn pair_id(image_id1: i64, image_id2: i64) -> (i64, bool) {
    if image_id1 > image_id2 {
        (image_id2 * MAX_IMAGE_ID + image_id1, true)
    } else {
        (image_id1 * MAX_IMAGE_ID + image_id2, false)
    }
}

fn f64_blob(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn keypoint_blob(view: &View) -> Vec<u8> {
    view.features
        .keypoints
        .iter()
        .flat_map(|k| [k.x, k.y, k.scale, k.angle])
        .flat_map(f32::to_le_bytes)
        .collect()
}

/// Index pairs as `u32` rows, swapped to `(train, query)` when `swapped`.
fn match_blob(matches: &[CorrespondenceRecord], swapped: bool) -> Vec<u8> {
    matches
        .iter()
        .flat_map(|m| {
            if swapped {
                [m.train_index, m.query_index]
            } else {
                [m.query_index, m.train_index]
            }
        })
        .flat_map(u32::to_le_bytes)
        .collect()
}

/// Write a fresh COLMAP database at `path`, replacing any existing file.
///
/// The camera size is taken from the first view. Match blocks are keyed by
/// `(query view, train view)`.
pub fn export_colmap(
    path: &Path,
    camera: &CameraIntrinsics,
    views: &[View],
    matches: &PairMatches,
) -> Result<ExportSummary, ExportError> {
    let first = views
        .first()
        .ok_or_else(|| ExportError::NoViews(path.to_path_buf()))?;
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(path)?;
    conn.execute_batch(COLMAP_SCHEMA)?;
    let tx = conn.transaction()?;
    let mut summary = ExportSummary::default();

    tx.execute(
        "INSERT INTO cameras(model, width, height, params, prior_focal_length)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            PINHOLE_MODEL,
            first.width,
            first.height,
            f64_blob(&camera.pinhole_params()),
            0
        ],
    )?;
    let camera_id = tx.last_insert_rowid();
    summary.cameras = 1;

    let mut image_ids = Vec::with_capacity(views.len());
    for view in views {
        tx.execute(
            "INSERT INTO images(name, camera_id) VALUES (?1, ?2)",
            params![view.file_name(), camera_id],
        )?;
        let image_id = tx.last_insert_rowid();
        let rows = view.features.len() as i64;
        tx.execute(
            "INSERT INTO keypoints(image_id, rows, cols, data) VALUES (?1, ?2, ?3, ?4)",
            params![image_id, rows, 4, keypoint_blob(view)],
        )?;
        tx.execute(
            "INSERT INTO descriptors(image_id, rows, cols, data) VALUES (?1, ?2, ?3, ?4)",
            params![
                image_id,
                rows,
                DESCRIPTOR_WIDTH as i64,
                vec![0u8; view.features.len() * DESCRIPTOR_WIDTH]
            ],
        )?;
        image_ids.push(image_id);
    }
    summary.images = image_ids.len();

    for (&(query, train), block) in matches {
        let (Some(&id1), Some(&id2)) = (image_ids.get(query), image_ids.get(train)) else {
            return Err(ExportError::UnknownView(query, train));
        };
        let (pair, swapped) = pair_id(id1, id2);
        tx.execute(
            "INSERT INTO matches(pair_id, rows, cols, data) VALUES (?1, ?2, ?3, ?4)",
            params![pair, block.len() as i64, 2, match_blob(block, swapped)],
        )?;
        summary.match_blocks += 1;
    }

    tx.commit()?;
    log::debug!(
        "exported {} images and {} match blocks to {}",
        summary.images,
        summary.match_blocks,
        path.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_id_is_order_independent() {
        assert_eq!(pair_id(1, 2), (MAX_IMAGE_ID + 2, false));
        assert_eq!(pair_id(2, 1), (MAX_IMAGE_ID + 2, true));
    }

    #[test]
    fn swapped_blocks_swap_columns() {
        let block = vec![CorrespondenceRecord::new(5, 7, 0.0)];
        let straight = match_blob(&block, false);
        let swapped = match_blob(&block, true);
        assert_eq!(&straight[..4], &5u32.to_le_bytes());
        assert_eq!(&swapped[..4], &7u32.to_le_bytes());
        assert_eq!(&swapped[4..], &5u32.to_le_bytes());
    }
}
