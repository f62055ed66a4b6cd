//! PLY format support
//!
//! Reads and writes point clouds with an optional per-point integer `class`
//! property (0 = unclassified), the labeling convention of the training
//! data this pipeline consumes.

use cloudfeat_core::{Error, LabeledCloud, Point3f, PointCloud, Result};
use ply_rs::{
    parser::Parser,
    ply::{Addable, DefaultElement, ElementDef, Ply, Property, PropertyDef, PropertyType, ScalarType},
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Read a point cloud, picking up the `class` property when present
pub fn read_labeled_ply<P: AsRef<Path>>(path: P) -> Result<LabeledCloud> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(&mut reader)?;

    let mut points = Vec::new();
    let mut labels = Vec::new();
    let mut has_labels = false;

    if let Some(vertices) = ply.payload.get("vertex") {
        has_labels = vertices
            .first()
            .map(|v| v.get("class").is_some())
            .unwrap_or(false);
        for vertex in vertices {
            let x = extract_coordinate(vertex, "x")?;
            let y = extract_coordinate(vertex, "y")?;
            let z = extract_coordinate(vertex, "z")?;
            points.push(Point3f::new(x, y, z));
            if has_labels {
                labels.push(extract_label(vertex)?);
            }
        }
    }

    let cloud = PointCloud::from_points(points);
    LabeledCloud::new(cloud, has_labels.then_some(labels))
}

/// Read a point cloud, discarding any label property
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>> {
    let (cloud, _) = read_labeled_ply(path)?.into_parts();
    Ok(cloud)
}

/// Write an ASCII PLY, adding a `class` property when labels are present
pub fn write_labeled_ply<P: AsRef<Path>>(path: P, labeled: &LabeledCloud) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mut ply = Ply::<DefaultElement>::new();

    let mut vertex_element = ElementDef::new("vertex".to_string());
    vertex_element.count = labeled.len();
    for name in ["x", "y", "z"] {
        vertex_element.properties.add(PropertyDef::new(
            name.to_string(),
            PropertyType::Scalar(ScalarType::Float),
        ));
    }
    if labeled.labels().is_some() {
        vertex_element.properties.add(PropertyDef::new(
            "class".to_string(),
            PropertyType::Scalar(ScalarType::UInt),
        ));
    }
    ply.header.elements.add(vertex_element);

    let labels = labeled.labels();
    let mut vertices = Vec::with_capacity(labeled.len());
    for (i, point) in labeled.cloud().iter().enumerate() {
        let mut vertex = DefaultElement::new();
        vertex.insert("x".to_string(), Property::Float(point.x));
        vertex.insert("y".to_string(), Property::Float(point.y));
        vertex.insert("z".to_string(), Property::Float(point.z));
        if let Some(labels) = labels {
            vertex.insert("class".to_string(), Property::UInt(labels[i]));
        }
        vertices.push(vertex);
    }
    ply.payload.insert("vertex".to_string(), vertices);

    let writer_instance = Writer::new();
    writer_instance.write_ply(&mut writer, &mut ply)?;

    Ok(())
}

fn extract_coordinate(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        _ => Err(Error::InvalidData(format!(
            "vertex property '{}' missing or not a float",
            name
        ))),
    }
}

fn extract_label(element: &DefaultElement) -> Result<u32> {
    match element.get("class") {
        Some(Property::Char(val)) => Ok(*val as u32),
        Some(Property::UChar(val)) => Ok(*val as u32),
        Some(Property::Short(val)) => Ok(*val as u32),
        Some(Property::UShort(val)) => Ok(*val as u32),
        Some(Property::Int(val)) => Ok(*val as u32),
        Some(Property::UInt(val)) => Ok(*val),
        _ => Err(Error::InvalidData(
            "vertex property 'class' missing or not an integer".to_string(),
        )),
    }
}
