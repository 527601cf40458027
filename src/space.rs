//! Vector space: dimensionality, storage representation and cosine similarity.
//!
//! Every vector that enters an index is unit-norm, so cosine similarity is the
//! plain inner product. All inner products accumulate in ascending dimension
//! order so dense and sparse forms of the same vector score identically.

use crate::error::{Result, TntError};
use crate::vector::{SparseVector, Vector};
use serde::{Deserialize, Serialize};

/// Allowed deviation of an entry vector's norm from 1 before it is rescaled.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-4;

/// Corpora with a nonzero fraction below this are stored sparsely.
pub const SPARSE_DENSITY_THRESHOLD: f64 = 0.25;

/// Storage representation shared by every vector of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    Dense,
    Sparse,
}

impl Representation {
    /// Pick a representation from corpus density (nonzeros over `N * dim`).
    pub fn choose(vectors: &[Vector], dimension: usize) -> Representation {
        let cells = vectors.len() as f64 * dimension as f64;
        if cells == 0.0 {
            return Representation::Dense;
        }
        let nnz: usize = vectors.iter().map(Vector::nnz).sum();
        if (nnz as f64) / cells < SPARSE_DENSITY_THRESHOLD {
            Representation::Sparse
        } else {
            Representation::Dense
        }
    }
}

impl std::fmt::Display for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Representation::Dense => write!(f, "dense"),
            Representation::Sparse => write!(f, "sparse"),
        }
    }
}

/// A fixed-dimensionality space of unit vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorSpace {
    dimension: usize,
    representation: Representation,
}

impl VectorSpace {
    pub fn new(dimension: usize, representation: Representation) -> Self {
        Self {
            dimension,
            representation,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    /// Cosine similarity of two unit vectors.
    ///
    /// Both vectors must have this space's dimension and unit norm; pass
    /// untrusted input through [`VectorSpace::prepare`] first. Components past
    /// the shorter vector's dimension contribute nothing.
    pub fn similarity(&self, a: &Vector, b: &Vector) -> f32 {
        inner_product(a, b)
    }

    /// Check that `v` lives in this space.
    pub fn check_dimension(&self, v: &Vector) -> Result<()> {
        if v.dimension() != self.dimension {
            return Err(TntError::DimensionMismatch {
                expected: self.dimension,
                actual: v.dimension(),
            });
        }
        Ok(())
    }

    /// Scale `v` to unit norm.
    pub fn normalize(&self, v: &Vector) -> Result<Vector> {
        self.check_dimension(v)?;
        v.normalized()
    }

    /// Admit `v` into the space: dimension check, finiteness, unit norm and
    /// conversion to the space's representation.
    pub fn prepare(&self, v: &Vector) -> Result<Vector> {
        self.check_dimension(v)?;
        if !v.is_finite() {
            return Err(TntError::degenerate("vector has non-finite components"));
        }

        let norm = v.norm();
        let mut out = match self.representation {
            Representation::Dense => v.to_dense(),
            Representation::Sparse => v.to_sparse(),
        };
        if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            out.normalize()?;
        }
        Ok(out)
    }
}

/// Inner product over any pair of representations.
pub fn inner_product(a: &Vector, b: &Vector) -> f32 {
    match (a, b) {
        (Vector::Dense(x), Vector::Dense(y)) => dense_dot(x, y),
        (Vector::Sparse(x), Vector::Sparse(y)) => sparse_dot(x, y),
        (Vector::Dense(d), Vector::Sparse(s)) | (Vector::Sparse(s), Vector::Dense(d)) => {
            mixed_dot(d, s)
        }
    }
}

fn dense_dot(x: &[f32], y: &[f32]) -> f32 {
    x.iter().zip(y.iter()).map(|(a, b)| a * b).sum()
}

/// Merge-join over the two ascending index lists; only shared dimensions
/// contribute.
fn sparse_dot(x: &SparseVector, y: &SparseVector) -> f32 {
    let (xi, xv) = (x.indices(), x.values());
    let (yi, yv) = (y.indices(), y.values());
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0f32;

    while i < xi.len() && j < yi.len() {
        match xi[i].cmp(&yi[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += xv[i] * yv[j];
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

fn mixed_dot(dense: &[f32], sparse: &SparseVector) -> f32 {
    let mut sum = 0.0f32;
    for (i, v) in sparse.iter() {
        match dense.get(i) {
            Some(d) => sum += d * v,
            None => break,
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dense_space(dim: usize) -> VectorSpace {
        VectorSpace::new(dim, Representation::Dense)
    }

    #[test]
    fn test_self_similarity() {
        let space = dense_space(3);
        let v = Vector::dense(vec![1.0, 2.0, 2.0]).normalized().unwrap();
        assert_relative_eq!(space.similarity(&v, &v), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        let space = dense_space(2);
        let a = Vector::dense(vec![1.0, 0.0]);
        let b = Vector::dense(vec![0.0, 1.0]);
        let c = Vector::dense(vec![-1.0, 0.0]);
        assert_relative_eq!(space.similarity(&a, &b), 0.0, epsilon = 1e-6);
        assert_relative_eq!(space.similarity(&a, &c), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dense_and_sparse_agree_bitwise() {
        let a = Vector::dense(vec![0.1, 0.0, 0.3, 0.0, -0.7, 0.2])
            .normalized()
            .unwrap();
        let b = Vector::dense(vec![0.0, 0.5, 0.25, 0.0, 0.6, -0.1])
            .normalized()
            .unwrap();
        let (sa, sb) = (a.to_sparse(), b.to_sparse());

        let dd = inner_product(&a, &b);
        assert_eq!(dd, inner_product(&sa, &sb));
        assert_eq!(dd, inner_product(&a, &sb));
        assert_eq!(dd, inner_product(&sa, &b));
    }

    #[test]
    fn test_sparse_dot_uses_intersection() {
        let a = Vector::sparse(1000, vec![1, 10, 500], vec![1.0, 2.0, 3.0]).unwrap();
        let b = Vector::sparse(1000, vec![10, 499, 500], vec![4.0, 5.0, 6.0]).unwrap();
        assert_relative_eq!(inner_product(&a, &b), 26.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mismatched_lengths_do_not_panic() {
        let space = dense_space(2);
        let short = Vector::dense(vec![1.0, 0.0]);
        let long = Vector::sparse(8, vec![0, 7], vec![0.6, 0.8]).unwrap();
        assert_relative_eq!(space.similarity(&short, &long), 0.6, epsilon = 1e-6);
        assert_relative_eq!(space.similarity(&long, &short), 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_prepare_normalizes_and_converts() {
        let space = VectorSpace::new(4, Representation::Sparse);
        let v = space.prepare(&Vector::dense(vec![0.0, 3.0, 0.0, 4.0])).unwrap();
        assert!(v.is_sparse());
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_prepare_keeps_unit_vectors_untouched() {
        let space = dense_space(2);
        let v = Vector::dense(vec![0.6, 0.8]);
        assert_eq!(space.prepare(&v).unwrap(), v);
    }

    #[test]
    fn test_prepare_rejects_bad_vectors() {
        let space = dense_space(2);
        assert!(matches!(
            space.prepare(&Vector::dense(vec![1.0, 0.0, 0.0])),
            Err(TntError::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(matches!(
            space.prepare(&Vector::dense(vec![0.0, 0.0])),
            Err(TntError::DegenerateVector { .. })
        ));
        assert!(matches!(
            space.prepare(&Vector::dense(vec![f32::NAN, 1.0])),
            Err(TntError::DegenerateVector { .. })
        ));
    }

    #[test]
    fn test_choose_representation() {
        let sparse_corpus: Vec<Vector> = (0..10)
            .map(|i| Vector::sparse(100, vec![i], vec![1.0]).unwrap())
            .collect();
        assert_eq!(
            Representation::choose(&sparse_corpus, 100),
            Representation::Sparse
        );

        let dense_corpus = vec![Vector::dense(vec![0.5, 0.5, 0.5, 0.5])];
        assert_eq!(
            Representation::choose(&dense_corpus, 4),
            Representation::Dense
        );
    }
}
