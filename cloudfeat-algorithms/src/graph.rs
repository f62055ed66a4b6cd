//! Proximity graph extraction
//!
//! Converts one restricted neighborhood set into the undirected, weighted
//! edge list a graph-regularized classifier consumes: every point connected
//! to its valid neighbors, self-loops dropped, (u,v)/(v,u) collapsed, one
//! Euclidean distance per surviving edge.

use crate::neighborhood::NeighborhoodSet;

/// Deduplicated undirected edges over point indices with Euclidean weights
///
/// Edges are stored low index first and sorted lexicographically, so the
/// same neighborhood set always produces identical arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityGraph {
    edges: Vec<[usize; 2]>,
    distances: Vec<f32>,
}

impl ProximityGraph {
    /// Build the graph from a neighborhood set
    ///
    /// Orientation is canonicalized to (min, max) before the sort, so a pair
    /// retrieved in both directions collapses to one edge. Distances are
    /// recomputed from the cloud coordinates rather than reused from the
    /// neighborhood's cached values; after deduplication the surviving row's
    /// stored orientation is arbitrary.
    pub fn build(set: &NeighborhoodSet) -> Self {
        let mut edges: Vec<[usize; 2]> = Vec::with_capacity(set.total_neighbors());
        for i in 0..set.len() {
            for &j in set.neighbors(i) {
                if i != j {
                    edges.push([i.min(j), i.max(j)]);
                }
            }
        }
        edges.sort_unstable();
        edges.dedup();

        let cloud = set.cloud();
        let distances = edges
            .iter()
            .map(|&[u, v]| (cloud[u] - cloud[v]).magnitude())
            .collect();

        Self { edges, distances }
    }

    /// Number of undirected edges
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edge index pairs, low index first
    pub fn edges(&self) -> &[[usize; 2]] {
        &self.edges
    }

    /// Euclidean distances parallel to `edges`
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Iterate (u, v, distance) triples
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.edges
            .iter()
            .zip(&self.distances)
            .map(|(&[u, v], &d)| (u, v, d))
    }
}
