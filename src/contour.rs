/// Contour annotation files
///
/// A contour file delineates one anatomical boundary on one image: plain
/// text, one vertex per line, two whitespace-separated floats ("x y"),
/// no header. Vertex order defines edge connectivity for rasterization.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from the left edge).
    pub x: f64,
    /// Vertical position (pixels from the top edge).
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Parse a contour file into its polygon vertices, in file order.
///
/// Contour files are hand-drawn annotations and a known-imperfect input:
/// lines that do not parse as two floats are skipped with a warning
/// rather than failing the file. Blank lines are ignored. An empty or
/// fully malformed file yields an empty polygon.
pub fn parse_contour_file(path: &Path) -> Result<Vec<Point>, Error> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut points = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let parsed = match (fields.next(), fields.next()) {
            (Some(xs), Some(ys)) => xs.parse::<f64>().ok().zip(ys.parse::<f64>().ok()),
            _ => None,
        };

        match parsed {
            Some((x, y)) => points.push(Point::new(x, y)),
            None => warn!(
                "{}:{}: skipping malformed vertex line {:?}",
                path.display(),
                lineno + 1,
                trimmed
            ),
        }
    }

    Ok(points)
}
