//! Labeled point cloud boundary object
//!
//! Pairs a cloud with optional per-point class labels. Label 0 means
//! "unclassified" and is ignored by training and scoring; valid classes are
//! 1..=C.

use crate::error::{Error, Result};
use crate::point::Point3f;
use crate::point_cloud::PointCloud;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A point cloud with optional per-point class labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledCloud {
    cloud: PointCloud<Point3f>,
    labels: Option<Vec<u32>>,
}

impl LabeledCloud {
    /// Create a labeled cloud, validating the label array length
    pub fn new(cloud: PointCloud<Point3f>, labels: Option<Vec<u32>>) -> Result<Self> {
        if let Some(ref labels) = labels {
            if labels.len() != cloud.len() {
                return Err(Error::InvalidData(format!(
                    "label count {} does not match point count {}",
                    labels.len(),
                    cloud.len()
                )));
            }
        }
        Ok(Self { cloud, labels })
    }

    /// Create an unlabeled cloud
    pub fn unlabeled(cloud: PointCloud<Point3f>) -> Self {
        Self { cloud, labels: None }
    }

    pub fn cloud(&self) -> &PointCloud<Point3f> {
        &self.cloud
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    /// Per-point labels, if present
    pub fn labels(&self) -> Option<&[u32]> {
        self.labels.as_deref()
    }

    /// Indices of points carrying a valid class (label > 0)
    ///
    /// Empty when the cloud is unlabeled.
    pub fn labeled_indices(&self) -> Vec<usize> {
        match &self.labels {
            Some(labels) => labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l > 0)
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Zero-based class targets for the labeled subset, in `labeled_indices`
    /// order (label 1 becomes target 0)
    pub fn training_targets(&self) -> Vec<u32> {
        match &self.labels {
            Some(labels) => labels.iter().filter(|&&l| l > 0).map(|&l| l - 1).collect(),
            None => Vec::new(),
        }
    }

    /// Count of points per class label, unclassified included under key 0
    pub fn class_histogram(&self) -> BTreeMap<u32, usize> {
        let mut histogram = BTreeMap::new();
        if let Some(ref labels) = self.labels {
            for &label in labels {
                *histogram.entry(label).or_insert(0) += 1;
            }
        }
        histogram
    }

    /// Consume the pair, returning the cloud and labels
    pub fn into_parts(self) -> (PointCloud<Point3f>, Option<Vec<u32>>) {
        (self.cloud, self.labels)
    }
}
