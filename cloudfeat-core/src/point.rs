//! Point and matrix type aliases

use nalgebra::{Matrix3, Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3x3 matrix with floating point entries
pub type Matrix3f = Matrix3<f32>;
