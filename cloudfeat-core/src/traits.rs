//! Core traits for cloudfeat

use crate::point::Point3f;

/// Trait for nearest neighbor search functionality
///
/// This is the spatial index boundary: neighborhood sets consume its query
/// results as a black box. Results are sorted ascending by distance; a query
/// point contained in the indexed set appears as its own neighbor at
/// distance 0.
pub trait NearestNeighborSearch {
    /// Find the k nearest neighbors to a query point
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)>;

    /// Find all neighbors within a given radius
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)>;
}
