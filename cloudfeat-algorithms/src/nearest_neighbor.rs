//! Nearest neighbor search implementations

use cloudfeat_core::{NearestNeighborSearch, Point3f, Result};
use kiddo::{KdTree, SquaredEuclidean};

/// K-d tree index over a point cloud
///
/// Queries return true Euclidean distances, sorted ascending. A query point
/// that is itself indexed comes back as its own neighbor at distance 0.
pub struct KnnIndex {
    tree: KdTree<f32, 3>,
}

impl KnnIndex {
    /// Build the index over all points
    pub fn new(points: &[Point3f]) -> Result<Self> {
        let mut tree: KdTree<f32, 3> = KdTree::with_capacity(points.len());
        for (i, point) in points.iter().enumerate() {
            tree.add(&[point.x, point.y, point.z], i as u64);
        }
        Ok(Self { tree })
    }
}

impl NearestNeighborSearch for KnnIndex {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        self.tree
            .nearest_n::<SquaredEuclidean>(&[query.x, query.y, query.z], k)
            .into_iter()
            .map(|nn| (nn.item as usize, nn.distance.sqrt()))
            .collect()
    }

    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        self.tree
            .within::<SquaredEuclidean>(&[query.x, query.y, query.z], radius * radius)
            .into_iter()
            .map(|nn| (nn.item as usize, nn.distance.sqrt()))
            .collect()
    }
}

/// Exhaustive nearest neighbor search
///
/// O(n) per query; kept for small inputs and as the oracle the k-d tree is
/// checked against in tests.
pub struct BruteForceSearch<'a> {
    points: &'a [Point3f],
}

impl<'a> BruteForceSearch<'a> {
    pub fn new(points: &'a [Point3f]) -> Self {
        Self { points }
    }

    fn scan(&self, query: &Point3f) -> Vec<(usize, f32)> {
        let mut distances: Vec<(usize, f32)> = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).magnitude()))
            .collect();
        distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        distances
    }
}

impl NearestNeighborSearch for BruteForceSearch<'_> {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        let mut distances = self.scan(query);
        distances.truncate(k);
        distances
    }

    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        let mut distances = self.scan(query);
        distances.retain(|&(_, d)| d <= radius);
        distances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<Point3f> {
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(5.0, 5.0, 5.0),
        ]
    }

    #[test]
    fn test_knn_self_first() {
        let points = sample_points();
        let index = KnnIndex::new(&points).unwrap();
        let neighbors = index.find_k_nearest(&points[0], 3);
        assert_eq!(neighbors.len(), 3);
        assert_eq!(neighbors[0].0, 0);
        assert_eq!(neighbors[0].1, 0.0);
        // sorted ascending
        assert!(neighbors[0].1 <= neighbors[1].1);
        assert!(neighbors[1].1 <= neighbors[2].1);
    }

    #[test]
    fn test_knn_matches_brute_force() {
        let points = sample_points();
        let index = KnnIndex::new(&points).unwrap();
        let brute = BruteForceSearch::new(&points);
        for query in &points {
            let a = index.find_k_nearest(query, 4);
            let b = brute.find_k_nearest(query, 4);
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(b.iter()) {
                assert!((x.1 - y.1).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_radius_neighbors() {
        let points = sample_points();
        let index = KnnIndex::new(&points).unwrap();
        let neighbors = index.find_radius_neighbors(&points[0], 1.1);
        // self plus the two unit-distance neighbors
        assert_eq!(neighbors.len(), 3);
        for (_, d) in &neighbors {
            assert!(*d <= 1.1);
        }
    }
}
