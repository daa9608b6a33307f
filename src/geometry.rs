// src/geometry.rs

use anyhow::{bail, Result};

const EDGE_EPS: f64 = 1e-9;

/// Region of interest in frame-pixel coordinates.
///
/// Only the vertex count is validated. Zero-area or self-intersecting
/// polygons are accepted and evaluated by the even-odd rule as-is.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<(f64, f64)>,
}

impl Polygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> Result<Self> {
        if vertices.len() < 3 {
            bail!("polygon needs at least 3 vertices, got {}", vertices.len());
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Even-odd ray cast, boundary inclusive: a point exactly on an
    /// edge or vertex counts as inside.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;

        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];

            if on_segment(xj, yj, xi, yi, x, y) {
                return true;
            }

            if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}

/// Corner-sampling box/polygon test: true if any of the four box
/// corners lies inside the polygon.
///
/// This is a permissive touches-test, not full containment, and it can
/// miss overlaps where no corner falls inside (a box strictly larger
/// than the polygon, straddling it). Downstream consumers rely on the
/// any-corner behavior, so it stays exactly as-is.
pub fn is_box_inside_polygon(polygon: &Polygon, bbox: [i32; 4]) -> bool {
    let [xmin, ymin, xmax, ymax] = bbox;
    let corners = [(xmin, ymin), (xmin, ymax), (xmax, ymin), (xmax, ymax)];

    corners
        .iter()
        .any(|&(x, y)| polygon.contains_point(x as f64, y as f64))
}

fn on_segment(ax: f64, ay: f64, bx: f64, by: f64, px: f64, py: f64) -> bool {
    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    if cross.abs() > EDGE_EPS {
        return false;
    }

    px >= ax.min(bx) - EDGE_EPS
        && px <= ax.max(bx) + EDGE_EPS
        && py >= ay.min(by) - EDGE_EPS
        && py <= ay.max(by) + EDGE_EPS
}
