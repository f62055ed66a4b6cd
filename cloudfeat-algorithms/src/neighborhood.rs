//! Multi-scale spatial neighborhoods
//!
//! A [`NeighborhoodSet`] owns, for every point of a shared cloud, the ordered
//! list of its nearest neighbors and their distances at one scale. Sets are
//! built once from an exact k-NN query at the most inclusive scale and then
//! narrowed with [`NeighborhoodSet::restrict`], which filters the already
//! retrieved candidates without touching the spatial index again.
//!
//! Neighbor rows are stored in a flat arena with an offset table, so a
//! million-point set costs three allocations rather than a million.

use crate::nearest_neighbor::KnnIndex;
use cloudfeat_core::{Error, NearestNeighborSearch, Point3f, PointCloud, Result};
use rayon::prelude::*;
use std::sync::Arc;

/// Parameters narrowing a neighborhood set to a smaller scale
///
/// The default is a no-op: unlimited count cap, unlimited radius, no
/// guaranteed minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Restriction {
    /// Neighbors at rank >= k are dropped regardless of distance
    pub k: usize,
    /// Neighbors at distance >= radius are dropped
    pub radius: f32,
    /// Neighbors at rank < min_k are kept regardless of distance
    pub min_k: usize,
}

impl Default for Restriction {
    fn default() -> Self {
        Self {
            k: usize::MAX,
            radius: f32::INFINITY,
            min_k: 0,
        }
    }
}

impl Restriction {
    /// Restriction capping both neighbor count and radius
    pub fn new(k: usize, radius: f32) -> Self {
        Self { k, radius, min_k: 0 }
    }

    /// Guarantee at least `min_k` neighbors per point, distance regardless
    pub fn with_min_k(mut self, min_k: usize) -> Self {
        self.min_k = min_k;
        self
    }
}

/// Per-point neighbor indices and distances at one spatial scale
///
/// Invariants: each point's distance list is ascending; indices and
/// distances are parallel; the backing cloud is shared read-only and never
/// copied. Several sets over the same cloud coexist, one per scale.
#[derive(Debug, Clone)]
pub struct NeighborhoodSet {
    cloud: Arc<PointCloud<Point3f>>,
    indices: Vec<usize>,
    distances: Vec<f32>,
    offsets: Vec<usize>,
}

impl NeighborhoodSet {
    /// Build from one exact k-nearest-neighbor query over the whole cloud
    ///
    /// Every point is queried for its `k` nearest neighbors including
    /// itself; the point appears in its own row at rank 0 with distance 0.
    /// Restriction can only narrow this set, so `k` must be the most
    /// inclusive scale that will ever be needed.
    pub fn from_knn(cloud: Arc<PointCloud<Point3f>>, k: usize) -> Result<Self> {
        let n = cloud.len();
        if k == 0 {
            return Err(Error::Config("base query k must be at least 1".to_string()));
        }
        if k > n {
            return Err(Error::Config(format!(
                "base query k={} exceeds point count {}",
                k, n
            )));
        }

        let index = KnnIndex::new(&cloud.points)?;
        let rows: Vec<Vec<(usize, f32)>> = cloud
            .points
            .par_iter()
            .map(|point| index.find_k_nearest(point, k))
            .collect();

        let mut indices = Vec::with_capacity(n * k);
        let mut distances = Vec::with_capacity(n * k);
        let mut offsets = Vec::with_capacity(n + 1);
        offsets.push(0);
        for row in rows {
            for (idx, dist) in row {
                indices.push(idx);
                distances.push(dist);
            }
            offsets.push(indices.len());
        }

        Ok(Self {
            cloud,
            indices,
            distances,
            offsets,
        })
    }

    /// Build from explicit per-point neighbor rows
    ///
    /// Rows are validated at this boundary: one row per point, parallel
    /// index/distance lengths, indices in range, distances ascending.
    pub fn from_parts(
        cloud: Arc<PointCloud<Point3f>>,
        neighbor_rows: Vec<Vec<usize>>,
        distance_rows: Vec<Vec<f32>>,
    ) -> Result<Self> {
        let n = cloud.len();
        if neighbor_rows.len() != n || distance_rows.len() != n {
            return Err(Error::InvalidData(format!(
                "expected {} neighbor and distance rows, got {} and {}",
                n,
                neighbor_rows.len(),
                distance_rows.len()
            )));
        }

        let mut indices = Vec::new();
        let mut distances = Vec::new();
        let mut offsets = Vec::with_capacity(n + 1);
        offsets.push(0);
        for (i, (idx_row, dist_row)) in neighbor_rows.iter().zip(&distance_rows).enumerate() {
            if idx_row.len() != dist_row.len() {
                return Err(Error::InvalidData(format!(
                    "point {}: {} neighbor indices but {} distances",
                    i,
                    idx_row.len(),
                    dist_row.len()
                )));
            }
            if idx_row.iter().any(|&j| j >= n) {
                return Err(Error::InvalidData(format!(
                    "point {}: neighbor index out of range",
                    i
                )));
            }
            if dist_row.windows(2).any(|w| w[0] > w[1]) {
                return Err(Error::InvalidData(format!(
                    "point {}: distances not ascending",
                    i
                )));
            }
            indices.extend_from_slice(idx_row);
            distances.extend_from_slice(dist_row);
            offsets.push(indices.len());
        }

        Ok(Self {
            cloud,
            indices,
            distances,
            offsets,
        })
    }

    /// The shared cloud this set indexes into
    pub fn cloud(&self) -> &Arc<PointCloud<Point3f>> {
        &self.cloud
    }

    /// Number of points (rows)
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Neighbor indices of point `i`, nearest first
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.indices[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Distances parallel to `neighbors(i)`
    pub fn distances(&self, i: usize) -> &[f32] {
        &self.distances[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Neighbor count of point `i`
    pub fn neighbor_count(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }

    /// Total neighbor entries across all points
    pub fn total_neighbors(&self) -> usize {
        self.indices.len()
    }

    /// Narrow to a smaller scale, producing a new set
    ///
    /// Per point: neighbors within `radius` stay, ranks >= `k` are cut
    /// regardless of distance, ranks < `min_k` stay regardless of distance.
    /// A pure post-filter over the already-sorted rows; the spatial index is
    /// never consulted. Restricting to (k1, r1) and then (k2 <= k1, r2 <= r1)
    /// equals restricting directly to (k2, r2).
    pub fn restrict(&self, restriction: &Restriction) -> Result<Self> {
        let (indices, distances, offsets) = self.filtered(restriction)?;
        Ok(Self {
            cloud: Arc::clone(&self.cloud),
            indices,
            distances,
            offsets,
        })
    }

    /// Narrow to a smaller scale in place
    ///
    /// Same semantics as [`restrict`](Self::restrict); replaces this set's
    /// rows instead of allocating a sibling.
    pub fn restrict_in_place(&mut self, restriction: &Restriction) -> Result<()> {
        let (indices, distances, offsets) = self.filtered(restriction)?;
        self.indices = indices;
        self.distances = distances;
        self.offsets = offsets;
        Ok(())
    }

    fn filtered(&self, r: &Restriction) -> Result<(Vec<usize>, Vec<f32>, Vec<usize>)> {
        if r.min_k > r.k {
            return Err(Error::Config(format!(
                "min_k {} exceeds neighbor cap k {}",
                r.min_k, r.k
            )));
        }
        // Raised here, before any row is produced: restriction cannot invent
        // neighbors the base query never retrieved.
        if r.min_k > 0 {
            if let Some(i) = (0..self.len()).find(|&i| self.neighbor_count(i) < r.min_k) {
                return Err(Error::Config(format!(
                    "min_k {} exceeds the {} stored neighbors of point {}",
                    r.min_k,
                    self.neighbor_count(i),
                    i
                )));
            }
        }

        let mut indices = Vec::with_capacity(self.indices.len());
        let mut distances = Vec::with_capacity(self.distances.len());
        let mut offsets = Vec::with_capacity(self.offsets.len());
        offsets.push(0);
        for i in 0..self.len() {
            let row_idx = self.neighbors(i);
            let row_dist = self.distances(i);
            for (rank, (&j, &d)) in row_idx.iter().zip(row_dist).enumerate() {
                let keep = rank < r.min_k || (rank < r.k && d < r.radius);
                if keep {
                    indices.push(j);
                    distances.push(d);
                }
            }
            offsets.push(indices.len());
        }
        Ok((indices, distances, offsets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn cloud_from(points: Vec<Point3f>) -> Arc<PointCloud<Point3f>> {
        Arc::new(PointCloud::from_points(points))
    }

    fn grid_cloud() -> Arc<PointCloud<Point3f>> {
        let mut points = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                points.push(Point3f::new(i as f32, j as f32, 0.0));
            }
        }
        cloud_from(points)
    }

    fn random_cloud(n: usize, seed: u64) -> Arc<PointCloud<Point3f>> {
        let mut rng = StdRng::seed_from_u64(seed);
        cloud_from(
            (0..n)
                .map(|_| {
                    Point3f::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    )
                })
                .collect(),
        )
    }

    fn assert_same(a: &NeighborhoodSet, b: &NeighborhoodSet) {
        assert_eq!(a.len(), b.len());
        for i in 0..a.len() {
            assert_eq!(a.neighbors(i), b.neighbors(i), "point {}", i);
            assert_eq!(a.distances(i), b.distances(i), "point {}", i);
        }
    }

    #[test]
    fn test_from_knn_self_at_rank_zero() {
        let set = NeighborhoodSet::from_knn(grid_cloud(), 4).unwrap();
        for i in 0..set.len() {
            assert_eq!(set.neighbor_count(i), 4);
            assert_eq!(set.neighbors(i)[0], i);
            assert_eq!(set.distances(i)[0], 0.0);
        }
    }

    #[test]
    fn test_from_knn_rejects_bad_k() {
        assert!(NeighborhoodSet::from_knn(grid_cloud(), 0).is_err());
        assert!(NeighborhoodSet::from_knn(grid_cloud(), 17).is_err());
    }

    #[test]
    fn test_distances_ascending() {
        let set = NeighborhoodSet::from_knn(random_cloud(60, 3), 12).unwrap();
        for i in 0..set.len() {
            let d = set.distances(i);
            assert!(d.windows(2).all(|w| w[0] <= w[1]), "point {}", i);
        }
        let restricted = set.restrict(&Restriction::new(5, 0.6)).unwrap();
        for i in 0..restricted.len() {
            let d = restricted.distances(i);
            assert!(d.windows(2).all(|w| w[0] <= w[1]), "point {}", i);
        }
    }

    #[test]
    fn test_restrict_caps_rank() {
        let set = NeighborhoodSet::from_knn(grid_cloud(), 6).unwrap();
        let restricted = set.restrict(&Restriction::new(3, f32::INFINITY)).unwrap();
        for i in 0..restricted.len() {
            assert_eq!(restricted.neighbor_count(i), 3);
        }
    }

    #[test]
    fn test_restrict_radius_drops_far_neighbors() {
        let cloud = cloud_from(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
        ]);
        let set = NeighborhoodSet::from_knn(cloud, 2).unwrap();
        let restricted = set
            .restrict(&Restriction::new(2, 0.5))
            .unwrap();
        // the cross-neighbor at distance 1 is gone, self at distance 0 stays
        for i in 0..2 {
            assert_eq!(restricted.neighbors(i), &[i]);
        }
    }

    #[test]
    fn test_min_k_overrides_radius() {
        let cloud = cloud_from(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
        ]);
        let set = NeighborhoodSet::from_knn(cloud, 3).unwrap();
        let restricted = set
            .restrict(&Restriction::new(3, 0.5).with_min_k(2))
            .unwrap();
        for i in 0..3 {
            assert_eq!(restricted.neighbor_count(i), 2, "point {}", i);
        }
    }

    #[test]
    fn test_min_k_beyond_support_is_config_error() {
        let set = NeighborhoodSet::from_knn(grid_cloud(), 3).unwrap();
        let result = set.restrict(&Restriction::default().with_min_k(5));
        assert!(matches!(result, Err(Error::Config(_))));
        let result = set.restrict(&Restriction::new(2, 1.0).with_min_k(3));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_restriction_is_noop() {
        let set = NeighborhoodSet::from_knn(random_cloud(40, 11), 8).unwrap();
        let restricted = set.restrict(&Restriction::default()).unwrap();
        assert_same(&set, &restricted);
    }

    #[test]
    fn test_restrict_monotone_composition() {
        let set = NeighborhoodSet::from_knn(random_cloud(80, 42), 20).unwrap();
        let two_step = set
            .restrict(&Restriction::new(12, 0.8))
            .unwrap()
            .restrict(&Restriction::new(6, 0.4))
            .unwrap();
        let direct = set.restrict(&Restriction::new(6, 0.4)).unwrap();
        assert_same(&two_step, &direct);
    }

    #[test]
    fn test_restrict_in_place_matches_copy() {
        let set = NeighborhoodSet::from_knn(random_cloud(50, 9), 10).unwrap();
        let r = Restriction::new(4, 0.7).with_min_k(1);
        let copy = set.restrict(&r).unwrap();
        let mut mutated = set;
        mutated.restrict_in_place(&r).unwrap();
        assert_same(&copy, &mutated);
    }

    #[test]
    fn test_from_parts_validation() {
        let cloud = cloud_from(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
        ]);
        // row count mismatch
        assert!(NeighborhoodSet::from_parts(
            Arc::clone(&cloud),
            vec![vec![0]],
            vec![vec![0.0]]
        )
        .is_err());
        // ragged row
        assert!(NeighborhoodSet::from_parts(
            Arc::clone(&cloud),
            vec![vec![0, 1], vec![1]],
            vec![vec![0.0], vec![0.0]]
        )
        .is_err());
        // index out of range
        assert!(NeighborhoodSet::from_parts(
            Arc::clone(&cloud),
            vec![vec![0, 5], vec![1]],
            vec![vec![0.0, 1.0], vec![0.0]]
        )
        .is_err());
        // descending distances
        assert!(NeighborhoodSet::from_parts(
            Arc::clone(&cloud),
            vec![vec![0, 1], vec![1]],
            vec![vec![1.0, 0.0], vec![0.0]]
        )
        .is_err());
        // well-formed
        assert!(NeighborhoodSet::from_parts(
            cloud,
            vec![vec![0, 1], vec![1, 0]],
            vec![vec![0.0, 1.0], vec![0.0, 1.0]]
        )
        .is_ok());
    }
}
