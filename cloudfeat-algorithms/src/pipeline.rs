//! Multi-scale orchestration
//!
//! Builds the scale ladder for a cloud: one exact k-NN query at the most
//! inclusive scale, one restricted neighborhood set plus local PCA per
//! configured scale, features concatenated across scales, and proximity
//! graph extraction at a requested scale.

use crate::features::{compute_features, total_width, FeatureFunction};
use crate::graph::ProximityGraph;
use crate::local_pca::LocalGeometry;
use crate::neighborhood::{NeighborhoodSet, Restriction};
use cloudfeat_core::{Error, Point3f, PointCloud, Result};
use ndarray::{concatenate, Array2, Axis};
use std::sync::Arc;

/// One rung of the scale ladder: a neighbor cap and a radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleParams {
    pub k: usize,
    pub radius: f32,
}

impl ScaleParams {
    pub fn new(k: usize, radius: f32) -> Self {
        Self { k, radius }
    }
}

/// Neighborhood sets and local geometry for every configured scale
///
/// The first scale must be the most inclusive in k: the base query is issued
/// once at `scales[0].k` and every scale is a restriction of it, never a new
/// query.
pub struct NeighborhoodLadder {
    scales: Vec<ScaleParams>,
    base: NeighborhoodSet,
    sets: Vec<NeighborhoodSet>,
    geometry: Vec<LocalGeometry>,
}

impl NeighborhoodLadder {
    /// Query once at the coarsest scale, restrict per scale, run local PCA
    ///
    /// Configuration is validated before any computation: the ladder must be
    /// non-empty and no scale may request more neighbors than the base
    /// query retrieves.
    pub fn build(cloud: Arc<PointCloud<Point3f>>, scales: &[ScaleParams]) -> Result<Self> {
        if scales.is_empty() {
            return Err(Error::Config("empty scale ladder".to_string()));
        }
        let base_k = scales[0].k;
        for (i, scale) in scales.iter().enumerate() {
            if scale.k == 0 {
                return Err(Error::Config(format!("scale {} requests k=0", i)));
            }
            if scale.k > base_k {
                return Err(Error::Config(format!(
                    "scale {} requests k={} but the base query only retrieves {}",
                    i, scale.k, base_k
                )));
            }
        }

        let base = NeighborhoodSet::from_knn(cloud, base_k)?;
        let sets: Vec<NeighborhoodSet> = scales
            .iter()
            .map(|scale| base.restrict(&Restriction::new(scale.k, scale.radius)))
            .collect::<Result<_>>()?;
        let geometry = sets.iter().map(LocalGeometry::estimate).collect();

        Ok(Self {
            scales: scales.to_vec(),
            base,
            sets,
            geometry,
        })
    }

    /// Configured scales, ladder order
    pub fn scales(&self) -> &[ScaleParams] {
        &self.scales
    }

    /// Number of points covered
    pub fn point_count(&self) -> usize {
        self.base.len()
    }

    /// Neighborhood set of one scale
    pub fn set(&self, scale: usize) -> &NeighborhoodSet {
        &self.sets[scale]
    }

    /// Local geometry of one scale
    pub fn geometry(&self, scale: usize) -> &LocalGeometry {
        &self.geometry[scale]
    }

    /// Evaluate feature functions at every scale and concatenate
    ///
    /// Column order is deterministic: scale blocks in ladder order, feature
    /// functions in list order within each block.
    pub fn features(&self, functions: &[Box<dyn FeatureFunction>]) -> Result<Array2<f32>> {
        let blocks: Vec<Array2<f32>> = self
            .sets
            .iter()
            .zip(&self.geometry)
            .map(|(set, geometry)| compute_features(set, geometry, functions))
            .collect::<Result<_>>()?;
        let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
        concatenate(Axis(1), &views)
            .map_err(|e| Error::Config(format!("scale concatenation failed: {}", e)))
    }

    /// Columns `features` will produce for a function list
    pub fn feature_width(&self, functions: &[Box<dyn FeatureFunction>]) -> usize {
        self.scales.len() * total_width(functions)
    }

    /// Extract the proximity graph at a requested scale
    ///
    /// Starts from the last ladder set whose parameters dominate the request
    /// (base set when none does) and restricts it down; by monotone
    /// composition the result equals restricting the base query directly.
    pub fn graph(&self, k: usize, radius: f32) -> Result<ProximityGraph> {
        if k == 0 {
            return Err(Error::Config("graph scale requests k=0".to_string()));
        }
        if k > self.scales[0].k {
            return Err(Error::Config(format!(
                "graph scale requests k={} but the base query only retrieves {}",
                k, self.scales[0].k
            )));
        }

        let mut source = &self.base;
        for (scale, set) in self.scales.iter().zip(&self.sets) {
            if scale.k >= k && scale.radius >= radius {
                source = set;
            }
        }
        let restricted = source.restrict(&Restriction::new(k, radius))?;
        Ok(ProximityGraph::build(&restricted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::default_feature_set;

    fn grid_cloud() -> Arc<PointCloud<Point3f>> {
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                points.push(Point3f::new(i as f32 * 0.1, j as f32 * 0.1, 0.0));
            }
        }
        Arc::new(PointCloud::from_points(points))
    }

    #[test]
    fn test_empty_ladder_rejected() {
        let result = NeighborhoodLadder::build(grid_cloud(), &[]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_scale_exceeding_base_rejected() {
        let scales = [ScaleParams::new(5, 1.0), ScaleParams::new(10, 0.5)];
        let result = NeighborhoodLadder::build(grid_cloud(), &scales);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_ladder_restricts_downward() {
        let scales = [
            ScaleParams::new(12, 1.0),
            ScaleParams::new(6, 0.5),
            ScaleParams::new(3, 0.25),
        ];
        let ladder = NeighborhoodLadder::build(grid_cloud(), &scales).unwrap();
        assert_eq!(ladder.point_count(), 25);
        for scale in 0..scales.len() {
            let set = ladder.set(scale);
            for i in 0..set.len() {
                assert!(set.neighbor_count(i) <= scales[scale].k);
                for &d in set.distances(i) {
                    assert!(d < scales[scale].radius);
                }
            }
            assert_eq!(ladder.geometry(scale).len(), 25);
        }
    }

    #[test]
    fn test_feature_columns_scale_times_width() {
        let scales = [ScaleParams::new(8, 1.0), ScaleParams::new(4, 0.3)];
        let ladder = NeighborhoodLadder::build(grid_cloud(), &scales).unwrap();
        let functions = default_feature_set();
        let matrix = ladder.features(&functions).unwrap();
        assert_eq!(matrix.nrows(), 25);
        assert_eq!(matrix.ncols(), ladder.feature_width(&functions));
        assert_eq!(matrix.ncols(), scales.len() * total_width(&functions));
    }

    #[test]
    fn test_graph_request_beyond_base_rejected() {
        let scales = [ScaleParams::new(6, 1.0)];
        let ladder = NeighborhoodLadder::build(grid_cloud(), &scales).unwrap();
        assert!(ladder.graph(10, 0.5).is_err());
        assert!(ladder.graph(0, 0.5).is_err());
    }

    #[test]
    fn test_graph_matches_direct_base_restriction() {
        let scales = [ScaleParams::new(10, 1.0), ScaleParams::new(6, 0.4)];
        let ladder = NeighborhoodLadder::build(grid_cloud(), &scales).unwrap();
        let from_ladder = ladder.graph(4, 0.2).unwrap();

        let base = NeighborhoodSet::from_knn(grid_cloud(), 10).unwrap();
        let direct = ProximityGraph::build(&base.restrict(&Restriction::new(4, 0.2)).unwrap());
        assert_eq!(from_ladder, direct);
    }
}
