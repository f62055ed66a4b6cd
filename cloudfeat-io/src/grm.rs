//! Graph Regularized Model export
//!
//! The GRM solver reads a plain-text problem file: a `<num_points>
//! <num_edges>` header, one line of per-class scores per point, then one
//! `<u> <v> <distance>` line per undirected edge. A companion file carries
//! one integer label per line in original point order; the solver writes its
//! predictions back in the same shape.

use cloudfeat_core::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Write a GRM problem: header, score rows, edge rows
///
/// `scores` must hold one row per point; `edges` and `distances` must be
/// parallel. Both are checked before anything is written.
pub fn write_problem<W: Write>(
    writer: &mut W,
    scores: &[Vec<f32>],
    edges: &[[usize; 2]],
    distances: &[f32],
) -> Result<()> {
    if edges.len() != distances.len() {
        return Err(Error::InvalidData(format!(
            "{} edges but {} distances",
            edges.len(),
            distances.len()
        )));
    }

    writeln!(writer, "{} {}", scores.len(), edges.len())?;
    for row in scores {
        let line: Vec<String> = row.iter().map(|s| s.to_string()).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    for ([u, v], d) in edges.iter().zip(distances) {
        writeln!(writer, "{} {} {}", u, v, d)?;
    }
    Ok(())
}

/// Write a GRM problem file at `path`
pub fn write_problem_file<P: AsRef<Path>>(
    path: P,
    scores: &[Vec<f32>],
    edges: &[[usize; 2]],
    distances: &[f32],
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_problem(&mut writer, scores, edges, distances)
}

/// Write one label per line, original point order
pub fn write_labels<W: Write>(writer: &mut W, labels: &[u32]) -> Result<()> {
    for label in labels {
        writeln!(writer, "{}", label)?;
    }
    Ok(())
}

/// Write a label file at `path`
pub fn write_labels_file<P: AsRef<Path>>(path: P, labels: &[u32]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_labels(&mut writer, labels)
}

/// Read a label file: one integer per line, blank lines ignored
pub fn read_labels<R: BufRead>(reader: R) -> Result<Vec<u32>> {
    let mut labels = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let label = trimmed.parse::<u32>().map_err(|_| {
            Error::InvalidData(format!("line {}: '{}' is not a label", number + 1, trimmed))
        })?;
        labels.push(label);
    }
    Ok(labels)
}

/// Read a label file at `path`
pub fn read_labels_file<P: AsRef<Path>>(path: P) -> Result<Vec<u32>> {
    read_labels(BufReader::new(File::open(path)?))
}
