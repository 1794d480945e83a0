use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

/// File holding the 3D points of a binary COLMAP model.
pub const POINTS3D_FILE: &str = "points3D.bin";

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} ends in the middle of point {point}")]
    Truncated { path: PathBuf, point: u64 },
}

/// Source of per-point reprojection errors for a reconstructed model.
pub trait ModelReader {
    /// Reprojection error (pixels) of every 3D point in the model stored in
    /// directory `model`, in file order.
    fn point_errors(&self, model: &Path) -> Result<Vec<f64>, ModelError>;
}

/// Reads `points3D.bin` of a COLMAP sparse model.
///
/// Layout (little endian): `u64` point count, then per point `u64` id,
/// `3 x f64` position, `3 x u8` color, `f64` error, `u64` track length and
/// `track length x (i32 image id, i32 point2D index)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColmapBinaryReader;

impl ModelReader for ColmapBinaryReader {
    fn point_errors(&self, model: &Path) -> Result<Vec<f64>, ModelError> {
        let path = model.join(POINTS3D_FILE);
        let file = File::open(&path).map_err(|source| ModelError::Io {
            path: path.clone(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let count = read_u64(&mut reader).map_err(|err| eof_as_truncated(err, &path, 0))?;
        let mut errors = Vec::with_capacity(count.min(1 << 24) as usize);
        for point in 0..count {
            let error =
                read_point(&mut reader).map_err(|err| eof_as_truncated(err, &path, point))?;
            errors.push(error);
        }
        Ok(errors)
    }
}

fn read_point<R: Read>(reader: &mut R) -> std::io::Result<f64> {
    // id, xyz, rgb
    skip(reader, 8 + 3 * 8 + 3)?;
    let error = f64::from_le_bytes(read_array(reader)?);
    let track_len = read_u64(reader)?;
    skip(reader, track_len.saturating_mul(8))?;
    Ok(error)
}

fn read_u64<R: Read>(reader: &mut R) -> std::io::Result<u64> {
    Ok(u64::from_le_bytes(read_array(reader)?))
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> std::io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn skip<R: Read>(reader: &mut R, bytes: u64) -> std::io::Result<()> {
    let copied = std::io::copy(&mut reader.by_ref().take(bytes), &mut std::io::sink())?;
    if copied < bytes {
        return Err(ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

fn eof_as_truncated(err: std::io::Error, path: &Path, point: u64) -> ModelError {
    if err.kind() == ErrorKind::UnexpectedEof {
        ModelError::Truncated {
            path: path.to_path_buf(),
            point,
        }
    } else {
        ModelError::Io {
            path: path.to_path_buf(),
            source: err,
        }
    }
}
