//! Core data structures and traits for cloudfeat
//!
//! This crate provides the fundamental types shared by the feature and I/O
//! crates: the point cloud container, labeled-dataset boundary object, the
//! nearest-neighbor search trait, and the common error type.

pub mod dataset;
pub mod error;
pub mod point;
pub mod point_cloud;
pub mod traits;

pub use dataset::*;
pub use error::*;
pub use point::*;
pub use point_cloud::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Point3, Vector3};

/// Common result type for cloudfeat operations
pub type Result<T> = std::result::Result<T, Error>;
