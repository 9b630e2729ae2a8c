//! Clip a categorical raster to an AOI and optionally downsample it.
//!
//! The pixel window is the AOI bounds rounded outward to whole pixels and
//! intersected with the raster extent. Inside the window, pixels whose centre
//! falls outside the AOI are set to the mask value so they drop out of the
//! statistics downstream.

use std::io::{Read, Seek};

use crate::aoi::BBox;
use crate::class_array::ClassArray;
use crate::error::ClipError;
use crate::raster::{CategoricalRaster, Window};

/// Mask value used when a tile declares no nodata of its own.
pub const MASK_FILL: u8 = 255;

/// Crop `raster` to `aoi`, then resample by `scale_factor` (1.0 = native).
pub fn clip<R: Read + Seek>(
    raster: &mut CategoricalRaster<R>,
    aoi: &BBox,
    scale_factor: f64,
) -> Result<ClassArray, ClipError> {
    if !scale_factor.is_finite() || scale_factor <= 0.0 {
        return Err(ClipError::InvalidScale(scale_factor));
    }
    if !aoi.intersects(&raster.bounds()) {
        return Err(ClipError::NoOverlap);
    }

    let t = raster.transform();
    let (w, h) = (raster.width() as f64, raster.height() as f64);
    let col0 = t.col_at(aoi.min_x).floor().clamp(0.0, w) as usize;
    let col1 = t.col_at(aoi.max_x).ceil().clamp(0.0, w) as usize;
    let row0 = t.row_at(aoi.max_y).floor().clamp(0.0, h) as usize;
    let row1 = t.row_at(aoi.min_y).ceil().clamp(0.0, h) as usize;
    if col1 <= col0 || row1 <= row0 {
        return Err(ClipError::NoOverlap);
    }

    let win = Window {
        col_off: col0,
        row_off: row0,
        width: col1 - col0,
        height: row1 - row0,
    };
    let mut data = raster.read_window(win)?;

    let fill = raster.nodata().unwrap_or(MASK_FILL);
    for r in 0..win.height {
        let y = t.center_y(row0 + r);
        for c in 0..win.width {
            if !aoi.contains(t.center_x(col0 + c), y) {
                data[r * win.width + c] = fill;
            }
        }
    }

    let cropped = ClassArray {
        data,
        width: win.width,
        height: win.height,
        nodata: Some(fill),
        bounds: t.footprint(col0, row0, col1, row1),
    };

    if scale_factor == 1.0 {
        Ok(cropped)
    } else {
        Ok(resample_nearest(&cropped, scale_factor))
    }
}

/// Nearest-neighbour resample to `(floor(h*s), floor(w*s))`.
/// Every output value is copied from a source pixel, so no new codes appear.
pub fn resample_nearest(src: &ClassArray, scale_factor: f64) -> ClassArray {
    let out_w = (src.width as f64 * scale_factor).floor() as usize;
    let out_h = (src.height as f64 * scale_factor).floor() as usize;
    if out_w == 0 || out_h == 0 {
        return ClassArray {
            data: Vec::new(),
            width: out_w,
            height: out_h,
            nodata: src.nodata,
            bounds: src.bounds,
        };
    }

    let col_ratio = src.width as f64 / out_w as f64;
    let row_ratio = src.height as f64 / out_h as f64;
    let src_cols: Vec<usize> = (0..out_w)
        .map(|c| (((c as f64 + 0.5) * col_ratio) as usize).min(src.width - 1))
        .collect();

    let mut data = Vec::with_capacity(out_w * out_h);
    for r in 0..out_h {
        let sr = (((r as f64 + 0.5) * row_ratio) as usize).min(src.height - 1);
        let row = src.row(sr);
        data.extend(src_cols.iter().map(|&sc| row[sc]));
    }

    ClassArray {
        data,
        width: out_w,
        height: out_h,
        nodata: src.nodata,
        bounds: src.bounds,
    }
}
