/// Axis-aligned bounding boxes in the raster's native CRS units.
/// Used both for the query AOI and for tile footprints.
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// Validated constructor: all edges finite and min < max on both axes.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, EngineError> {
        let edges = [min_x, min_y, max_x, max_y];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::MalformedInput(format!(
                "AOI edges must be finite, got {edges:?}"
            )));
        }
        if min_x >= max_x || min_y >= max_y {
            return Err(EngineError::MalformedInput(format!(
                "AOI must have min < max on both axes, got {edges:?}"
            )));
        }
        Ok(Self { min_x, min_y, max_x, max_y })
    }

    /// Build from a `[minx, miny, maxx, maxy]` slice as supplied by callers.
    pub fn from_slice(edges: &[f64]) -> Result<Self, EngineError> {
        match *edges {
            [min_x, min_y, max_x, max_y] => Self::new(min_x, min_y, max_x, max_y),
            _ => Err(EngineError::MalformedInput(format!(
                "AOI needs exactly 4 values, got {}",
                edges.len()
            ))),
        }
    }

    /// Grow the box by `margin` on every side.
    pub fn buffered(&self, margin: f64) -> Result<Self, EngineError> {
        Self::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Interiors overlap. Boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Point-in-box test, inclusive of edges.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_and_non_finite() {
        assert!(BBox::new(1.0, 0.0, 0.0, 1.0).is_err());
        assert!(BBox::new(0.0, 0.0, f64::NAN, 1.0).is_err());
        assert!(BBox::from_slice(&[0.0, 0.0, 1.0]).is_err());
        assert!(BBox::from_slice(&[0.0, 0.0, 1.0, 1.0]).is_ok());
    }

    #[test]
    fn edge_touching_boxes_do_not_intersect() {
        let a = BBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = BBox::new(1.0, 0.0, 2.0, 1.0).unwrap();
        let c = BBox::new(0.5, 0.5, 1.5, 1.5).unwrap();
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(c.intersects(&b));
    }

    #[test]
    fn buffered_grows_each_side() {
        let a = BBox::new(72.8, 18.9, 73.0, 19.1).unwrap().buffered(0.1).unwrap();
        assert!((a.min_x - 72.7).abs() < 1e-9);
        assert!((a.max_y - 19.2).abs() < 1e-9);
    }
}
