//! Per-point feature functions and the feature assembler
//!
//! A [`FeatureFunction`] maps one scale's neighborhoods and local geometry to
//! a fixed number of scalars per point. The assembler evaluates an ordered
//! list of functions and concatenates their outputs column-wise; the
//! multi-scale pipeline then concatenates one such block per scale.
//!
//! Every function must be total over degenerate neighborhoods: a single
//! point of support or zero eigenvalues yields a sentinel value (0 for the
//! undefined ratios below), never a panic or an error.

use crate::local_pca::LocalGeometry;
use crate::neighborhood::NeighborhoodSet;
use cloudfeat_core::{Error, Result, Vector3f};
use ndarray::{concatenate, Array2, Axis};

/// A per-point feature over one scale's neighborhoods and local geometry
pub trait FeatureFunction: Send + Sync {
    /// Scalars produced per point
    fn width(&self) -> usize {
        1
    }

    /// Evaluate over every point, returning a (point count x width) matrix
    fn evaluate(&self, set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32>;
}

/// Evaluate feature functions against one scale and concatenate column-wise
///
/// Output shapes are checked against the point count and each function's
/// declared width before any concatenation happens.
pub fn compute_features(
    set: &NeighborhoodSet,
    geometry: &LocalGeometry,
    functions: &[Box<dyn FeatureFunction>],
) -> Result<Array2<f32>> {
    let n = set.len();
    if geometry.len() != n {
        return Err(Error::Config(format!(
            "local geometry covers {} points but the neighborhood set has {}",
            geometry.len(),
            n
        )));
    }
    if functions.is_empty() {
        return Err(Error::Config("no feature functions configured".to_string()));
    }

    let mut blocks = Vec::with_capacity(functions.len());
    for function in functions {
        let block = function.evaluate(set, geometry);
        if block.nrows() != n || block.ncols() != function.width() {
            return Err(Error::Config(format!(
                "feature output is {}x{}, expected {}x{}",
                block.nrows(),
                block.ncols(),
                n,
                function.width()
            )));
        }
        blocks.push(block);
    }

    let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(1), &views)
        .map_err(|e| Error::Config(format!("feature concatenation failed: {}", e)))
}

/// Total number of columns a function list contributes per scale
pub fn total_width(functions: &[Box<dyn FeatureFunction>]) -> usize {
    functions.iter().map(|f| f.width()).sum()
}

fn safe_ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn column(values: Vec<f32>) -> Array2<f32> {
    let n = values.len();
    Array2::from_shape_vec((n, 1), values).expect("n x 1 shape matches length")
}

fn eigen_column(geometry: &LocalGeometry, f: impl Fn(&Vector3f) -> f32) -> Array2<f32> {
    column(geometry.eigenvalue_rows().iter().map(f).collect())
}

/// (l1 - l2) / l1: 1 on a perfect line, 0 when undefined
pub struct Linearity;

impl FeatureFunction for Linearity {
    fn evaluate(&self, _set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32> {
        eigen_column(geometry, |l| safe_ratio(l[0] - l[1], l[0]))
    }
}

/// (l2 - l3) / l1: high on flat surfaces
pub struct Planarity;

impl FeatureFunction for Planarity {
    fn evaluate(&self, _set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32> {
        eigen_column(geometry, |l| safe_ratio(l[1] - l[2], l[0]))
    }
}

/// l3 / l1: high in volumetric neighborhoods
pub struct Sphericity;

impl FeatureFunction for Sphericity {
    fn evaluate(&self, _set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32> {
        eigen_column(geometry, |l| safe_ratio(l[2], l[0]))
    }
}

/// (l1 - l3) / l1
pub struct Anisotropy;

impl FeatureFunction for Anisotropy {
    fn evaluate(&self, _set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32> {
        eigen_column(geometry, |l| safe_ratio(l[0] - l[2], l[0]))
    }
}

/// l3 / (l1 + l2 + l3), the change of curvature
pub struct SurfaceVariation;

impl FeatureFunction for SurfaceVariation {
    fn evaluate(&self, _set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32> {
        eigen_column(geometry, |l| safe_ratio(l[2], l[0] + l[1] + l[2]))
    }
}

/// Cube root of the eigenvalue product
pub struct Omnivariance;

impl FeatureFunction for Omnivariance {
    fn evaluate(&self, _set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32> {
        eigen_column(geometry, |l| (l[0] * l[1] * l[2]).cbrt())
    }
}

/// Shannon entropy of the normalized eigenvalues
pub struct Eigenentropy;

impl FeatureFunction for Eigenentropy {
    fn evaluate(&self, _set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32> {
        eigen_column(geometry, |l| {
            let sum = l[0] + l[1] + l[2];
            if sum <= 0.0 {
                return 0.0;
            }
            -l.iter()
                .map(|&v| v / sum)
                .filter(|&p| p > 0.0)
                .map(|p| p * p.ln())
                .sum::<f32>()
        })
    }
}

/// l1 + l2 + l3
pub struct EigenvalueSum;

impl FeatureFunction for EigenvalueSum {
    fn evaluate(&self, _set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32> {
        eigen_column(geometry, |l| l[0] + l[1] + l[2])
    }
}

/// 1 - |nz| where n is the least-variance direction
///
/// 0 on horizontal surfaces, 1 on vertical ones. Degenerate neighborhoods
/// fall back to the identity basis, whose third column is the z axis, so
/// they read as horizontal.
pub struct Verticality;

impl FeatureFunction for Verticality {
    fn evaluate(&self, _set: &NeighborhoodSet, geometry: &LocalGeometry) -> Array2<f32> {
        column(
            (0..geometry.len())
                .map(|i| 1.0 - geometry.eigenvectors(i).column(2)[2].abs())
                .collect(),
        )
    }
}

/// Neighbor count at this scale, as a float
pub struct Cardinality;

impl FeatureFunction for Cardinality {
    fn evaluate(&self, set: &NeighborhoodSet, _geometry: &LocalGeometry) -> Array2<f32> {
        column((0..set.len()).map(|i| set.neighbor_count(i) as f32).collect())
    }
}

/// Vertical extent and spread of the neighborhood: [z range, z std]
pub struct HeightStats;

impl FeatureFunction for HeightStats {
    fn width(&self) -> usize {
        2
    }

    fn evaluate(&self, set: &NeighborhoodSet, _geometry: &LocalGeometry) -> Array2<f32> {
        let cloud = set.cloud();
        let mut out = Array2::zeros((set.len(), 2));
        for i in 0..set.len() {
            let zs: Vec<f32> = set.neighbors(i).iter().map(|&j| cloud[j].z).collect();
            if zs.is_empty() {
                continue;
            }
            let min = zs.iter().cloned().fold(f32::INFINITY, f32::min);
            let max = zs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let mean = zs.iter().sum::<f32>() / zs.len() as f32;
            let var = zs.iter().map(|z| (z - mean).powi(2)).sum::<f32>() / zs.len() as f32;
            out[[i, 0]] = max - min;
            out[[i, 1]] = var.sqrt();
        }
        out
    }
}

/// The descriptor set the classification pipeline uses by default
pub fn default_feature_set() -> Vec<Box<dyn FeatureFunction>> {
    vec![
        Box::new(Linearity),
        Box::new(Planarity),
        Box::new(Sphericity),
        Box::new(Anisotropy),
        Box::new(SurfaceVariation),
        Box::new(Omnivariance),
        Box::new(Eigenentropy),
        Box::new(EigenvalueSum),
        Box::new(Verticality),
        Box::new(Cardinality),
        Box::new(HeightStats),
    ]
}
