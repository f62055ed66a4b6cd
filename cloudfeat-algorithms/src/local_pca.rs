//! Local PCA over spatial neighborhoods
//!
//! For each point, the eigendecomposition of its neighborhood's covariance
//! matrix. Eigenvalues describe the neighborhood's shape (linear, planar,
//! volumetric); eigenvectors give its principal directions. This is the
//! geometric primitive every feature function builds on.

use crate::neighborhood::NeighborhoodSet;
use cloudfeat_core::{Matrix3f, Point3f, Vector3f};
use rayon::prelude::*;

/// Per-point eigenvalues (descending) and eigenvectors of the local
/// covariance at one scale
///
/// Eigenvalues are non-negative; the covariance is positive semi-definite
/// and tiny negative numeric noise is clamped at zero. Column `c` of a
/// point's eigenvector matrix pairs with eigenvalue `c`.
#[derive(Debug, Clone)]
pub struct LocalGeometry {
    eigenvalues: Vec<Vector3f>,
    eigenvectors: Vec<Matrix3f>,
}

impl LocalGeometry {
    /// Run local PCA for every point of a neighborhood set
    ///
    /// Independent per point and embarrassingly parallel; rows come back
    /// indexed by point identity, not completion order. A neighborhood of
    /// size 1 (or 0) yields zero eigenvalues rather than an error.
    pub fn estimate(set: &NeighborhoodSet) -> Self {
        let cloud = set.cloud();
        let rows: Vec<(Vector3f, Matrix3f)> = (0..set.len())
            .into_par_iter()
            .map(|i| {
                let neighbors: Vec<Point3f> =
                    set.neighbors(i).iter().map(|&j| cloud[j]).collect();
                local_pca(&neighbors)
            })
            .collect();

        let mut eigenvalues = Vec::with_capacity(rows.len());
        let mut eigenvectors = Vec::with_capacity(rows.len());
        for (values, vectors) in rows {
            eigenvalues.push(values);
            eigenvectors.push(vectors);
        }
        Self {
            eigenvalues,
            eigenvectors,
        }
    }

    /// Number of points covered
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    /// Eigenvalues of point `i`, largest first
    pub fn eigenvalues(&self, i: usize) -> &Vector3f {
        &self.eigenvalues[i]
    }

    /// Eigenvector matrix of point `i`, columns matching eigenvalue order
    pub fn eigenvectors(&self, i: usize) -> &Matrix3f {
        &self.eigenvectors[i]
    }

    /// All eigenvalue rows
    pub fn eigenvalue_rows(&self) -> &[Vector3f] {
        &self.eigenvalues
    }

    /// All eigenvector matrices
    pub fn eigenvector_rows(&self) -> &[Matrix3f] {
        &self.eigenvectors
    }
}

/// Eigendecomposition of one neighborhood's covariance
///
/// Covariance is (1/m) sum of outer products of centroid offsets.
/// Returns eigenvalues sorted descending (clamped at 0) and the matching
/// eigenvector columns. An empty slice yields zeros and the identity basis.
pub fn local_pca(points: &[Point3f]) -> (Vector3f, Matrix3f) {
    if points.is_empty() {
        return (Vector3f::zeros(), Matrix3f::identity());
    }

    let m = points.len() as f32;
    let centroid = points.iter().fold(Vector3f::zeros(), |acc, p| acc + p.coords) / m;

    let mut covariance = Matrix3f::zeros();
    for point in points {
        let delta = point.coords - centroid;
        covariance += delta * delta.transpose();
    }
    covariance /= m;

    let eigen = covariance.symmetric_eigen();
    let mut pairs: Vec<(f32, Vector3f)> = eigen
        .eigenvalues
        .iter()
        .zip(eigen.eigenvectors.column_iter())
        .map(|(&value, vector)| (value.max(0.0), vector.clone_owned()))
        .collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let values = Vector3f::new(pairs[0].0, pairs[1].0, pairs[2].0);
    let vectors = Matrix3f::from_columns(&[pairs[0].1, pairs[1].1, pairs[2].1]);
    (values, vectors)
}
