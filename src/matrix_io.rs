//! Plain text numeric tables.
//!
//! Tables hold one row per line, with values separated by whitespace or
//! commas. Empty lines and `#` comments are ignored.

use crate::error::{FixelError, Result};
use nalgebra::DMatrix;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Read a numeric table from a file.
pub fn load_matrix<P: AsRef<Path>>(path: P) -> Result<DMatrix<f64>> {
    parse_matrix(BufReader::new(File::open(path)?))
}

/// Read a numeric table from a buffered source.
pub fn parse_matrix<R: BufRead>(source: R) -> Result<DMatrix<f64>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (lineno, line) in source.lines().enumerate() {
        let line = line?;
        let content = match line.find('#') {
            Some(i) => &line[..i],
            None => &line[..],
        };
        let row = content
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<f64>().map_err(|_| {
                    FixelError::MalformedMatrix(format!("invalid value `{}` on line {}", t, lineno + 1))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if row.is_empty() {
            continue;
        }
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(FixelError::MalformedMatrix(format!(
                    "line {} has {} values, expected {}",
                    lineno + 1,
                    row.len(),
                    first.len()
                )));
            }
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(FixelError::MalformedMatrix("table is empty".to_string()));
    }
    let ncols = rows[0].len();
    Ok(DMatrix::from_fn(rows.len(), ncols, |r, c| rows[r][c]))
}

/// Write a vector to a file, one value per line.
pub fn save_vector<P: AsRef<Path>>(path: P, values: &[f32]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for v in values {
        writeln!(out, "{}", v)?;
    }
    out.flush()?;
    Ok(())
}
