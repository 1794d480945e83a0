//! Row-major descriptor matrices.

use serde::{Deserialize, Serialize};

/// Distance used to compare two descriptor rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Norm {
    /// Bit count of the XOR of two binary rows.
    Hamming,
    /// Euclidean distance between two float rows.
    L2,
}

/// Descriptor vectors of one image, one row per keypoint.
///
/// `width` is the number of elements per row (bytes for binary descriptors,
/// floats for float descriptors).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Descriptors {
    Binary { width: usize, data: Vec<u8> },
    Float { width: usize, data: Vec<f32> },
}

impl Descriptors {
    pub fn empty_binary(width: usize) -> Self {
        Descriptors::Binary {
            width,
            data: Vec::new(),
        }
    }

    pub fn empty_float(width: usize) -> Self {
        Descriptors::Float {
            width,
            data: Vec::new(),
        }
    }

    /// Elements per row.
    #[inline]
    pub fn width(&self) -> usize {
        match self {
            Descriptors::Binary { width, .. } | Descriptors::Float { width, .. } => *width,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        let width = self.width();
        if width == 0 {
            return 0;
        }
        match self {
            Descriptors::Binary { data, .. } => data.len() / width,
            Descriptors::Float { data, .. } => data.len() / width,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Raw in-memory size of the descriptor data in bytes.
    pub fn nbytes(&self) -> usize {
        match self {
            Descriptors::Binary { data, .. } => data.len(),
            Descriptors::Float { data, .. } => data.len() * std::mem::size_of::<f32>(),
        }
    }

    /// Default matching norm for this descriptor family.
    pub fn norm(&self) -> Norm {
        match self {
            Descriptors::Binary { .. } => Norm::Hamming,
            Descriptors::Float { .. } => Norm::L2,
        }
    }

    pub fn binary_row(&self, row: usize) -> Option<&[u8]> {
        match self {
            Descriptors::Binary { width, data } => data.get(row * width..(row + 1) * width),
            Descriptors::Float { .. } => None,
        }
    }

    pub fn float_row(&self, row: usize) -> Option<&[f32]> {
        match self {
            Descriptors::Float { width, data } => data.get(row * width..(row + 1) * width),
            Descriptors::Binary { .. } => None,
        }
    }

    /// New matrix holding `rows` in the given order. Out-of-range rows are skipped.
    pub fn select(&self, rows: &[usize]) -> Descriptors {
        match self {
            Descriptors::Binary { width, data } => Descriptors::Binary {
                width: *width,
                data: gather(data, *width, rows),
            },
            Descriptors::Float { width, data } => Descriptors::Float {
                width: *width,
                data: gather(data, *width, rows),
            },
        }
    }

    /// Append one row. Returns `false` (and leaves the matrix untouched) when
    /// the row has the wrong length or element type.
    pub fn push_binary(&mut self, row: &[u8]) -> bool {
        match self {
            Descriptors::Binary { width, data } if row.len() == *width => {
                data.extend_from_slice(row);
                true
            }
            _ => false,
        }
    }

    pub fn push_float(&mut self, row: &[f32]) -> bool {
        match self {
            Descriptors::Float { width, data } if row.len() == *width => {
                data.extend_from_slice(row);
                true
            }
            _ => false,
        }
    }
}

fn gather<T: Copy>(data: &[T], width: usize, rows: &[usize]) -> Vec<T> {
    let mut out = Vec::with_capacity(rows.len() * width);
    for &row in rows {
        if let Some(slice) = data.get(row * width..(row + 1) * width) {
            out.extend_from_slice(slice);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_and_nbytes_follow_element_type() {
        let bin = Descriptors::Binary {
            width: 4,
            data: vec![0; 12],
        };
        assert_eq!(bin.rows(), 3);
        assert_eq!(bin.nbytes(), 12);
        assert_eq!(bin.norm(), Norm::Hamming);

        let float = Descriptors::Float {
            width: 2,
            data: vec![0.0; 6],
        };
        assert_eq!(float.rows(), 3);
        assert_eq!(float.nbytes(), 24);
        assert_eq!(float.norm(), Norm::L2);
    }

    #[test]
    fn select_reorders_rows() {
        let d = Descriptors::Binary {
            width: 2,
            data: vec![1, 1, 2, 2, 3, 3],
        };
        let picked = d.select(&[2, 0]);
        assert_eq!(picked.binary_row(0), Some(&[3u8, 3][..]));
        assert_eq!(picked.binary_row(1), Some(&[1u8, 1][..]));
        assert_eq!(picked.rows(), 2);
    }

    #[test]
    fn zero_width_matrix_has_no_rows() {
        assert_eq!(Descriptors::empty_float(0).rows(), 0);
    }

    #[test]
    fn push_rejects_wrong_width() {
        let mut d = Descriptors::empty_binary(3);
        assert!(!d.push_binary(&[1, 2]));
        assert!(d.push_binary(&[1, 2, 3]));
        assert!(!d.push_float(&[1.0, 2.0, 3.0]));
        assert_eq!(d.rows(), 1);
    }
}
