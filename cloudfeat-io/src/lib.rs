//! I/O for cloudfeat
//!
//! Reads and writes labeled point clouds (PLY) and the text files exchanged
//! with the downstream GRM solver.

pub mod grm;
pub mod ply;

pub use grm::{read_labels_file, write_labels_file, write_problem_file};
pub use ply::{read_labeled_ply, write_labeled_ply};

use cloudfeat_core::{LabeledCloud, Point3f, PointCloud, Result};
use std::path::Path;

/// Auto-detect format and read a point cloud
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("ply") => ply::read_point_cloud(path),
        _ => Err(cloudfeat_core::Error::UnsupportedFormat(format!(
            "unsupported point cloud format: {:?}",
            path.extension()
        ))),
    }
}

/// Auto-detect format and read a point cloud with labels
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<LabeledCloud> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("ply") => ply::read_labeled_ply(path),
        _ => Err(cloudfeat_core::Error::UnsupportedFormat(format!(
            "unsupported dataset format: {:?}",
            path.extension()
        ))),
    }
}
