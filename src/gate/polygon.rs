//! Polygon gates over a channel pair.

use crate::error::{GatingError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;

/// Tolerance for the point-on-boundary test, in display coordinate units.
const BOUNDARY_EPS: f64 = 1e-9;

/// A gate defined by a closed polygon in a 2-D channel plane.
///
/// An event passes when its (x, y) point lies inside the polygon; the
/// boundary counts as inside. Vertices are taken in order and the polygon is
/// closed implicitly (last vertex connects back to the first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonGate {
    /// Display name of the gated population.
    pub name: String,
    /// Channel plotted on the x axis.
    pub x_channel: String,
    /// Channel plotted on the y axis.
    pub y_channel: String,
    /// Ordered vertices, in display coordinates.
    pub vertices: Vec<(f64, f64)>,
}

impl PolygonGate {
    /// Create a polygon gate.
    ///
    /// Fails at configuration time when fewer than 3 vertices are given; a
    /// degenerate polygon would silently gate nothing.
    pub fn new(
        name: &str,
        x_channel: &str,
        y_channel: &str,
        vertices: Vec<(f64, f64)>,
    ) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(GatingError::InvalidGeometry {
                gate: name.to_string(),
                n_vertices: vertices.len(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            x_channel: x_channel.to_string(),
            y_channel: y_channel.to_string(),
            vertices,
        })
    }

    /// Octagonal approximation of an ellipse.
    ///
    /// Vertices are placed every 45° on the ellipse centred at `(cx, cy)`
    /// with vertical radius `r`; horizontal extents are divided by the
    /// compression factor `f`, so each vertex satisfies
    /// `((vx - cx) * f)^2 + (vy - cy)^2 = r^2`.
    pub fn ellipse(
        name: &str,
        x_channel: &str,
        y_channel: &str,
        cx: f64,
        cy: f64,
        r: f64,
        f: f64,
    ) -> Result<Self> {
        if r <= 0.0 || f <= 0.0 {
            return Err(GatingError::InvalidParameter(format!(
                "ellipse gate '{}' needs positive radius and compression, got r={}, f={}",
                name, r, f
            )));
        }
        let s = FRAC_1_SQRT_2;
        let vertices = vec![
            (cx + r / f, cy),
            (cx + r * s / f, cy + r * s),
            (cx, cy + r),
            (cx - r * s / f, cy + r * s),
            (cx - r / f, cy),
            (cx - r * s / f, cy - r * s),
            (cx, cy - r),
            (cx + r * s / f, cy - r * s),
        ];
        Self::new(name, x_channel, y_channel, vertices)
    }

    /// Point-in-polygon test, boundary inclusive.
    ///
    /// Even-odd rule via ray casting; a point on an edge or vertex is
    /// classified as inside before the ray cast runs.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.vertices.len();
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            if on_segment(a, b, (x, y)) {
                return true;
            }
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];
            if (yi > y) != (yj > y) {
                let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
                if x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// True when `p` lies on the segment from `a` to `b`, within tolerance.
fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (p.0 - a.0, p.1 - a.1);
    let cross = ab.0 * ap.1 - ab.1 * ap.0;
    let len2 = ab.0 * ab.0 + ab.1 * ab.1;
    if cross * cross > BOUNDARY_EPS * BOUNDARY_EPS * len2.max(1.0) {
        return false;
    }
    let dot = ap.0 * ab.0 + ap.1 * ab.1;
    (-BOUNDARY_EPS..=len2 + BOUNDARY_EPS).contains(&dot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> PolygonGate {
        PolygonGate::new(
            "square",
            "FSC-A",
            "FSC-H",
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_interior_and_exterior() {
        let gate = unit_square();
        assert!(gate.contains(0.5, 0.5));
        assert!(!gate.contains(1.5, 0.5));
        assert!(!gate.contains(0.5, -0.1));
    }

    #[test]
    fn test_boundary_inclusive() {
        let gate = unit_square();
        // Vertex-coincident point.
        assert!(gate.contains(0.0, 0.0));
        assert!(gate.contains(1.0, 1.0));
        // Mid-edge points.
        assert!(gate.contains(0.5, 0.0));
        assert!(gate.contains(1.0, 0.5));
    }

    #[test]
    fn test_too_few_vertices_rejected() {
        let result = PolygonGate::new("bad", "FSC-A", "FSC-H", vec![(0.0, 0.0), (1.0, 1.0)]);
        assert!(matches!(
            result,
            Err(GatingError::InvalidGeometry { n_vertices: 2, .. })
        ));
    }

    #[test]
    fn test_concave_polygon() {
        // L-shaped polygon: the notch above (1, 1) is outside.
        let gate = PolygonGate::new(
            "ell",
            "FSC-A",
            "FSC-H",
            vec![
                (0.0, 0.0),
                (2.0, 0.0),
                (2.0, 1.0),
                (1.0, 1.0),
                (1.0, 2.0),
                (0.0, 2.0),
            ],
        )
        .unwrap();
        assert!(gate.contains(0.5, 1.5));
        assert!(gate.contains(1.5, 0.5));
        assert!(!gate.contains(1.5, 1.5));
    }

    #[test]
    fn test_ellipse_vertex_radius_property() {
        let (cx, cy, r, f) = (9200.0, 8050.0, 780.0, 1.3);
        let gate = PolygonGate::ellipse("granularity", "FSC-A", "SSC-A", cx, cy, r, f).unwrap();
        assert_eq!(gate.vertices.len(), 8);
        for &(vx, vy) in &gate.vertices {
            let lhs = ((vx - cx) * f).powi(2) + (vy - cy).powi(2);
            assert!(
                (lhs - r * r).abs() < 1e-6 * r * r,
                "vertex ({}, {}) off the ellipse: {}",
                vx,
                vy,
                lhs
            );
        }
    }

    #[test]
    fn test_ellipse_contains_centre() {
        let gate =
            PolygonGate::ellipse("granularity", "FSC-A", "SSC-A", 9200.0, 8050.0, 780.0, 1.3)
                .unwrap();
        assert!(gate.contains(9200.0, 8050.0));
        // Just beyond the horizontal extent.
        assert!(!gate.contains(9200.0 + 780.0 / 1.3 + 1.0, 8050.0));
    }

    #[test]
    fn test_ellipse_invalid_parameters() {
        assert!(PolygonGate::ellipse("g", "x", "y", 0.0, 0.0, -1.0, 1.3).is_err());
        assert!(PolygonGate::ellipse("g", "x", "y", 0.0, 0.0, 100.0, 0.0).is_err());
    }
}
