use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::aoi::BBox;

/// A 2D grid of land-cover class codes, row-major.
/// Row 0 is the northern edge (raster storage order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassArray {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// Sentinel for pixels outside the AOI or without a measurement.
    pub nodata: Option<u8>,
    /// Footprint of the grid in the raster's native CRS.
    pub bounds: BBox,
}

impl ClassArray {
    /// Create a new ClassArray filled with the given code.
    pub fn new(width: usize, height: usize, fill: u8, nodata: Option<u8>, bounds: BBox) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            nodata,
            bounds,
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: u8) {
        self.data[row * self.width + col] = val;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.data[row * self.width..(row + 1) * self.width]
    }

    /// Distinct codes present, nodata included.
    pub fn distinct_values(&self) -> BTreeSet<u8> {
        self.data.iter().copied().collect()
    }

    /// Number of pixels not equal to nodata.
    pub fn valid_count(&self) -> usize {
        match self.nodata {
            Some(nd) => self.data.iter().filter(|&&v| v != nd).count(),
            None => self.data.len(),
        }
    }
}
