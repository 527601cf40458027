//! Vector type: a dense or sparse point in n-dimensional space

use crate::error::{Result, TntError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sparse vector stored as strictly ascending `(index, value)` pairs.
///
/// Explicit zeros are never stored, so the nonzero pattern is exactly
/// `indices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSparseVector")]
pub struct SparseVector {
    dimension: usize,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Build a sparse vector from parallel index/value lists.
    ///
    /// Pairs may arrive in any order. Zero values are dropped; duplicated or
    /// out-of-range indices are rejected.
    pub fn new(dimension: usize, indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(TntError::argument(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }

        let mut pairs: Vec<(u32, f32)> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(i, _)| i);

        let mut out_indices = Vec::with_capacity(pairs.len());
        let mut out_values = Vec::with_capacity(pairs.len());
        for (i, v) in pairs {
            if i as usize >= dimension {
                return Err(TntError::argument(format!(
                    "sparse index {} out of range for dimension {}",
                    i, dimension
                )));
            }
            if out_indices.last() == Some(&i) {
                return Err(TntError::argument(format!("duplicate sparse index {}", i)));
            }
            if v != 0.0 {
                out_indices.push(i);
                out_values.push(v);
            }
        }

        Ok(Self {
            dimension,
            indices: out_indices,
            values: out_values,
        })
    }

    /// Build from a dense slice, keeping only nonzero components.
    pub fn from_dense(data: &[f32]) -> Self {
        let (indices, values) = data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(i, &v)| (i as u32, v))
            .unzip();
        Self {
            dimension: data.len(),
            indices,
            values,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of stored (nonzero) components.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Iterate over `(index, value)` pairs in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices
            .iter()
            .zip(self.values.iter())
            .map(|(&i, &v)| (i as usize, v))
    }

    pub fn to_dense(&self) -> Vec<f32> {
        let mut data = vec![0.0; self.dimension];
        for (i, v) in self.iter() {
            data[i] = v;
        }
        data
    }
}

/// Wire form of [`SparseVector`]; decoding goes through [`SparseVector::new`].
#[derive(Deserialize)]
struct RawSparseVector {
    dimension: usize,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl TryFrom<RawSparseVector> for SparseVector {
    type Error = TntError;

    fn try_from(raw: RawSparseVector) -> Result<Self> {
        SparseVector::new(raw.dimension, raw.indices, raw.values)
    }
}

/// A vector in n-dimensional space, stored densely or sparsely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Vector {
    Dense(Vec<f32>),
    Sparse(SparseVector),
}

impl Vector {
    /// Create a dense vector from a Vec<f32>
    pub fn dense(data: Vec<f32>) -> Self {
        Vector::Dense(data)
    }

    /// Create a sparse vector from parallel index/value lists
    pub fn sparse(dimension: usize, indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        Ok(Vector::Sparse(SparseVector::new(dimension, indices, values)?))
    }

    /// Get the dimension of the vector
    pub fn dimension(&self) -> usize {
        match self {
            Vector::Dense(data) => data.len(),
            Vector::Sparse(s) => s.dimension(),
        }
    }

    /// Number of nonzero components
    pub fn nnz(&self) -> usize {
        match self {
            Vector::Dense(data) => data.iter().filter(|&&x| x != 0.0).count(),
            Vector::Sparse(s) => s.nnz(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Vector::Sparse(_))
    }

    /// Whether every stored component is finite
    pub fn is_finite(&self) -> bool {
        match self {
            Vector::Dense(data) => data.iter().all(|x| x.is_finite()),
            Vector::Sparse(s) => s.values().iter().all(|x| x.is_finite()),
        }
    }

    fn values(&self) -> &[f32] {
        match self {
            Vector::Dense(data) => data.as_slice(),
            Vector::Sparse(s) => s.values(),
        }
    }

    /// L2 norm accumulated in f64; finite for any finite f32 components.
    fn norm_f64(&self) -> f64 {
        self.values()
            .iter()
            .map(|&x| f64::from(x) * f64::from(x))
            .sum::<f64>()
            .sqrt()
    }

    /// Compute the L2 norm (magnitude) of the vector
    pub fn norm(&self) -> f32 {
        self.norm_f64() as f32
    }

    /// Normalize the vector to unit length
    pub fn normalize(&mut self) -> Result<()> {
        let norm = self.norm_f64();
        if norm == 0.0 || !norm.is_finite() {
            return Err(TntError::degenerate(format!(
                "cannot normalize vector with magnitude {}",
                norm
            )));
        }
        let values = match self {
            Vector::Dense(data) => data.as_mut_slice(),
            Vector::Sparse(s) => s.values.as_mut_slice(),
        };
        for x in values {
            *x = (f64::from(*x) / norm) as f32;
        }
        Ok(())
    }

    /// Create a normalized copy of the vector
    pub fn normalized(&self) -> Result<Vector> {
        let mut v = self.clone();
        v.normalize()?;
        Ok(v)
    }

    /// Convert to dense storage
    pub fn to_dense(&self) -> Vector {
        match self {
            Vector::Dense(_) => self.clone(),
            Vector::Sparse(s) => Vector::Dense(s.to_dense()),
        }
    }

    /// Convert to sparse storage
    pub fn to_sparse(&self) -> Vector {
        match self {
            Vector::Dense(data) => Vector::Sparse(SparseVector::from_dense(data)),
            Vector::Sparse(_) => self.clone(),
        }
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Vector::Dense(data)
    }
}

impl FromStr for Vector {
    type Err = TntError;

    /// Parse a dense vector from a comma-separated string
    fn from_str(s: &str) -> Result<Self> {
        let data: Result<Vec<f32>> = s
            .split(',')
            .map(|x| {
                x.trim()
                    .parse::<f32>()
                    .map_err(|_| TntError::argument(format!("invalid float: {:?}", x.trim())))
            })
            .collect();
        Ok(Vector::Dense(data?))
    }
}
