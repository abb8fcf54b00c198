//! Data
//!
//! Dense feature matrices and the row-aligned `(X, Y, Z)` dataset consumed by
//! the trainer.
use crate::errors::EIError;
use crate::sampler::{SampleMethod, Sampler, SequentialSampler, ShuffleSampler};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Contiguous row major matrix data container.
///
/// Rows are samples, columns are features. Unlike a borrowed view, the matrix
/// owns its buffer so that effort transforms can hand back new feature batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    /// The raw data stored in a single vector, row after row.
    pub data: Vec<f64>,
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl Matrix {
    /// Create a new Matrix from row major data.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self, EIError> {
        if data.len() != rows * cols {
            return Err(EIError::ShapeMismatch("matrix buffer".to_string(), rows * cols, data.len()));
        }
        Ok(Matrix { data, rows, cols })
    }

    /// A matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Build a matrix from a list of rows. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, EIError> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for r in rows {
            if r.len() != cols {
                return Err(EIError::ShapeMismatch("row length".to_string(), cols, r.len()));
            }
            data.extend_from_slice(r);
        }
        Ok(Matrix {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Get a single item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Copy the selected rows, in the given order, into a new matrix.
    pub fn select_rows(&self, index: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(index.len() * self.cols);
        for &i in index {
            data.extend_from_slice(self.row(i));
        }
        Matrix {
            data,
            rows: index.len(),
            cols: self.cols,
        }
    }

    /// Keep the rows where `mask` is true.
    pub fn mask_rows(&self, mask: &[bool]) -> Matrix {
        self.select_rows(&mask_to_index(mask))
    }

    /// Per column `(min, max)` over all rows.
    pub fn column_ranges(&self) -> Vec<(f64, f64)> {
        let mut ranges = vec![(f64::INFINITY, f64::NEG_INFINITY); self.cols];
        for i in 0..self.rows {
            for (r, v) in ranges.iter_mut().zip(self.row(i)) {
                r.0 = r.0.min(*v);
                r.1 = r.1.max(*v);
            }
        }
        ranges
    }
}

/// Positions where the mask is set.
pub fn mask_to_index(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, m)| if *m { Some(i) } else { None })
        .collect()
}

/// Select entries of a vector by index.
pub fn select(values: &[f64], index: &[usize]) -> Vec<f64> {
    index.iter().map(|&i| values[i]).collect()
}

#[derive(Serialize, Deserialize)]
struct DatasetParts {
    x: Matrix,
    y: Vec<f64>,
    z: Vec<f64>,
}

/// Row aligned features `x`, binary labels `y` and group attribute `z`.
///
/// The fields are only set through [`FairnessDataset::new`], which checks the
/// alignment and records the observed range of every feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DatasetParts", into = "DatasetParts")]
pub struct FairnessDataset {
    x: Matrix,
    y: Vec<f64>,
    z: Vec<f64>,
    feature_ranges: Vec<(f64, f64)>,
}

impl TryFrom<DatasetParts> for FairnessDataset {
    type Error = EIError;

    fn try_from(parts: DatasetParts) -> Result<Self, Self::Error> {
        FairnessDataset::new(parts.x, parts.y, parts.z)
    }
}

impl From<FairnessDataset> for DatasetParts {
    fn from(dataset: FairnessDataset) -> Self {
        DatasetParts {
            x: dataset.x,
            y: dataset.y,
            z: dataset.z,
        }
    }
}

/// One mini-batch, copied out of a `FairnessDataset`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub x: Matrix,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl FairnessDataset {
    pub fn new(x: Matrix, y: Vec<f64>, z: Vec<f64>) -> Result<Self, EIError> {
        if y.len() != x.rows {
            return Err(EIError::ShapeMismatch("labels".to_string(), x.rows, y.len()));
        }
        if z.len() != x.rows {
            return Err(EIError::ShapeMismatch("group attribute".to_string(), x.rows, z.len()));
        }
        let feature_ranges = x.column_ranges();
        Ok(FairnessDataset {
            x,
            y,
            z,
            feature_ranges,
        })
    }

    pub fn x(&self) -> &Matrix {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Per feature `(min, max)` over all rows, computed once in `new`.
    pub fn feature_ranges(&self) -> &[(f64, f64)] {
        &self.feature_ranges
    }

    pub fn len(&self) -> usize {
        self.x.rows
    }

    pub fn is_empty(&self) -> bool {
        self.x.rows == 0
    }

    pub fn n_features(&self) -> usize {
        self.x.cols
    }

    /// Copy the rows in `index` into a batch.
    pub fn subset(&self, index: &[usize]) -> Batch {
        Batch {
            x: self.x.select_rows(index),
            y: select(&self.y, index),
            z: select(&self.z, index),
        }
    }

    /// Copy the rows where `mask` is true.
    pub fn mask(&self, mask: &[bool]) -> Batch {
        let index = mask_to_index(mask);
        Batch {
            x: self.x.mask_rows(mask),
            y: select(&self.y, &index),
            z: select(&self.z, &index),
        }
    }

    /// The whole dataset as a single batch.
    pub fn full_batch(&self) -> Batch {
        Batch {
            x: self.x.clone(),
            y: self.y.clone(),
            z: self.z.clone(),
        }
    }

    /// Split the rows into batches of at most `batch_size` rows.
    /// The last batch holds the remainder.
    pub fn batches(&self, batch_size: usize, method: SampleMethod, rng: &mut StdRng) -> Vec<Batch> {
        let index: Vec<usize> = (0..self.len()).collect();
        let groups = match method {
            SampleMethod::Sequential => SequentialSampler::new(batch_size).sample(rng, &index),
            SampleMethod::Shuffle => ShuffleSampler::new(batch_size).sample(rng, &index),
        };
        groups
            .iter()
            .map(|idx| self.subset(idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn dataset() -> FairnessDataset {
        let x = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        FairnessDataset::new(x, vec![0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0]).unwrap()
    }

    #[test]
    fn test_matrix_rows() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2).unwrap();
        assert_eq!(m.get(1, 1), 4.0);
        assert_eq!(m.row(2), &[5.0, 6.0]);
        let s = m.select_rows(&[2, 0]);
        assert_eq!(s.data, vec![5.0, 6.0, 1.0, 2.0]);
        let masked = m.mask_rows(&[false, true, false]);
        assert_eq!(masked.rows, 1);
        assert_eq!(masked.row(0), &[3.0, 4.0]);
        assert_eq!(m.column_ranges(), vec![(1.0, 5.0), (2.0, 6.0)]);
    }

    #[test]
    fn test_matrix_shape_errors() {
        assert!(Matrix::new(vec![1.0, 2.0, 3.0], 2, 2).is_err());
        assert!(Matrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_dataset_alignment() {
        let x = Matrix::zeros(3, 2);
        assert!(FairnessDataset::new(x.clone(), vec![0.0; 2], vec![0.0; 3]).is_err());
        assert!(FairnessDataset::new(x, vec![0.0; 3], vec![0.0; 4]).is_err());
    }

    #[test]
    fn test_feature_ranges_recorded() {
        let ds = dataset();
        assert_eq!(ds.feature_ranges(), &[(1.0, 5.0), (2.0, 6.0)]);
        assert_eq!(ds.x().rows, 3);
        assert_eq!(ds.y(), &[0.0, 1.0, 1.0]);
        assert_eq!(ds.z(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_deserialize_checks_alignment() {
        let ds = dataset();
        let json = serde_json::to_string(&ds).unwrap();
        let loaded: FairnessDataset = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.y(), ds.y());
        assert_eq!(loaded.feature_ranges(), ds.feature_ranges());

        let mut value = serde_json::to_value(&ds).unwrap();
        value["z"] = serde_json::json!([0.0, 1.0]);
        assert!(serde_json::from_value::<FairnessDataset>(value).is_err());
    }

    #[test]
    fn test_mask_keeps_rows_aligned() {
        let ds = dataset();
        let b = ds.mask(&[true, false, true]);
        assert_eq!(b.x.data, vec![1.0, 2.0, 5.0, 6.0]);
        assert_eq!(b.y, vec![0.0, 1.0]);
        assert_eq!(b.z, vec![0.0, 1.0]);
    }

    #[test]
    fn test_batches_deterministic() {
        let ds = dataset();
        let mut rng1 = StdRng::seed_from_u64(0);
        let mut rng2 = StdRng::seed_from_u64(0);
        let b1 = ds.batches(2, SampleMethod::Shuffle, &mut rng1);
        let b2 = ds.batches(2, SampleMethod::Shuffle, &mut rng2);
        assert_eq!(b1.len(), 2);
        assert_eq!(b1[0].x.rows, 2);
        assert_eq!(b1[1].x.rows, 1);
        for (a, b) in b1.iter().zip(b2.iter()) {
            assert_eq!(a.x, b.x);
            assert_eq!(a.y, b.y);
            assert_eq!(a.z, b.z);
        }

        let ordered = ds.batches(2, SampleMethod::Sequential, &mut rng1);
        assert_eq!(ordered[0].y, vec![0.0, 1.0]);
        assert_eq!(ordered[1].y, vec![1.0]);
    }
}
