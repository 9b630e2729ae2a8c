//! Single-band categorical GeoTIFF access.
//!
//! Tiles are 8-bit, north-up GeoTIFFs. Georeferencing comes from
//! ModelPixelScale + ModelTiepoint, or a non-rotated ModelTransformation.
//! Nodata comes from the GDAL_NODATA ASCII tag.
//!
//! Reads are windowed: only the strips/tiles intersecting the requested
//! pixel window are decoded, so memory is bounded by the AOI extent rather
//! than the full tile.

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{ChunkType, Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::aoi::BBox;
use crate::class_array::ClassArray;
use crate::error::RasterError;

/// Strip height used when encoding class grids.
pub const EXPORT_ROWS_PER_STRIP: u32 = 16;

/// Affine pixel → CRS mapping without rotation.
/// `pixel_height` is positive; y decreases with increasing row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Fractional column of a CRS x coordinate.
    #[inline]
    pub fn col_at(&self, x: f64) -> f64 {
        (x - self.origin_x) / self.pixel_width
    }

    /// Fractional row of a CRS y coordinate.
    #[inline]
    pub fn row_at(&self, y: f64) -> f64 {
        (self.origin_y - y) / self.pixel_height
    }

    #[inline]
    pub fn center_x(&self, col: usize) -> f64 {
        self.origin_x + (col as f64 + 0.5) * self.pixel_width
    }

    #[inline]
    pub fn center_y(&self, row: usize) -> f64 {
        self.origin_y - (row as f64 + 0.5) * self.pixel_height
    }

    /// CRS footprint of the pixel rectangle `[col0, col1) × [row0, row1)`.
    pub fn footprint(&self, col0: usize, row0: usize, col1: usize, row1: usize) -> BBox {
        BBox {
            min_x: self.origin_x + col0 as f64 * self.pixel_width,
            max_x: self.origin_x + col1 as f64 * self.pixel_width,
            max_y: self.origin_y - row0 as f64 * self.pixel_height,
            min_y: self.origin_y - row1 as f64 * self.pixel_height,
        }
    }
}

/// Pixel-space rectangle within a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

/// An open categorical raster. Dropping it releases the underlying reader.
pub struct CategoricalRaster<R: Read + Seek> {
    decoder: Decoder<R>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    nodata: Option<u8>,
}

impl CategoricalRaster<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> CategoricalRaster<R> {
    pub fn from_reader(reader: R) -> Result<Self, RasterError> {
        let mut decoder = Decoder::new(reader)?;
        let (width, height) = decoder.dimensions()?;
        if width == 0 || height == 0 {
            return Err(RasterError::Unsupported("zero-sized raster".into()));
        }
        match decoder.colortype()? {
            ColorType::Gray(8) => {}
            other => {
                return Err(RasterError::Unsupported(format!(
                    "expected single-band 8-bit raster, got {other:?}"
                )))
            }
        }
        let transform = read_transform(&mut decoder)?;
        let nodata = read_nodata(&mut decoder)?;
        Ok(Self {
            decoder,
            width: width as usize,
            height: height as usize,
            transform,
            nodata,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> GeoTransform {
        self.transform
    }

    pub fn nodata(&self) -> Option<u8> {
        self.nodata
    }

    /// CRS footprint of the whole raster.
    pub fn bounds(&self) -> BBox {
        self.transform.footprint(0, 0, self.width, self.height)
    }

    /// Decode the pixels of `win`, row-major. The window must lie within the raster.
    pub fn read_window(&mut self, win: Window) -> Result<Vec<u8>, RasterError> {
        if win.col_off + win.width > self.width || win.row_off + win.height > self.height {
            return Err(RasterError::Unsupported(format!(
                "window {win:?} exceeds raster {}x{}",
                self.width, self.height
            )));
        }
        let mut out = vec![0u8; win.width * win.height];
        if out.is_empty() {
            return Ok(out);
        }

        let chunk_type = self.decoder.get_chunk_type();
        let (cw, ch) = self.decoder.chunk_dimensions();
        let (cw, ch) = match chunk_type {
            ChunkType::Strip => (self.width, ch as usize),
            ChunkType::Tile => (cw as usize, ch as usize),
        };
        if cw == 0 || ch == 0 {
            return Err(RasterError::Unsupported("zero-sized chunks".into()));
        }
        let chunks_across = self.width.div_ceil(cw);

        let first_row = win.row_off / ch;
        let last_row = (win.row_off + win.height - 1) / ch;
        let first_col = win.col_off / cw;
        let last_col = (win.col_off + win.width - 1) / cw;

        for cr in first_row..=last_row {
            for cc in first_col..=last_col {
                let index = cr * chunks_across + cc;
                let x0 = cc * cw;
                let y0 = cr * ch;
                let dw = cw.min(self.width - x0);
                let dh = ch.min(self.height - y0);

                let buf = match self.decoder.read_chunk(index as u32)? {
                    DecodingResult::U8(v) => v,
                    _ => return Err(RasterError::Unsupported("non-u8 chunk data".into())),
                };
                if buf.len() < dw * dh {
                    return Err(RasterError::Unsupported(format!(
                        "chunk {index} holds {} bytes, expected {}",
                        buf.len(),
                        dw * dh
                    )));
                }

                let c_start = x0.max(win.col_off);
                let c_end = (x0 + dw).min(win.col_off + win.width);
                let r_start = y0.max(win.row_off);
                let r_end = (y0 + dh).min(win.row_off + win.height);
                let run = c_end - c_start;
                for r in r_start..r_end {
                    let src = (r - y0) * dw + (c_start - x0);
                    let dst = (r - win.row_off) * win.width + (c_start - win.col_off);
                    out[dst..dst + run].copy_from_slice(&buf[src..src + run]);
                }
            }
        }
        Ok(out)
    }
}

fn read_f64_tag<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<Vec<f64>>, RasterError> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform, RasterError> {
    let scale = read_f64_tag(decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = read_f64_tag(decoder, Tag::ModelTiepointTag)?;

    let transform = match (scale, tiepoint) {
        (Some(s), Some(t)) if s.len() >= 2 && t.len() >= 6 => GeoTransform {
            // Tiepoint maps raster (I, J) to model (X, Y).
            origin_x: t[3] - t[0] * s[0],
            origin_y: t[4] + t[1] * s[1],
            pixel_width: s[0],
            pixel_height: s[1],
        },
        _ => {
            let Some(m) = read_f64_tag(decoder, Tag::ModelTransformationTag)? else {
                return Err(RasterError::Georeference(
                    "no ModelPixelScale/ModelTiepoint or ModelTransformation tags".into(),
                ));
            };
            if m.len() < 8 {
                return Err(RasterError::Georeference(format!(
                    "ModelTransformation has {} values",
                    m.len()
                )));
            }
            if m[1] != 0.0 || m[4] != 0.0 {
                return Err(RasterError::Georeference("rotated rasters are not supported".into()));
            }
            GeoTransform {
                origin_x: m[3],
                origin_y: m[7],
                pixel_width: m[0],
                pixel_height: -m[5],
            }
        }
    };

    let ok = |v: f64| v.is_finite() && v > 0.0;
    if !ok(transform.pixel_width) || !ok(transform.pixel_height) {
        return Err(RasterError::Georeference(format!(
            "pixel size must be positive (north-up), got {}x{}",
            transform.pixel_width, transform.pixel_height
        )));
    }
    if !transform.origin_x.is_finite() || !transform.origin_y.is_finite() {
        return Err(RasterError::Georeference("non-finite origin".into()));
    }
    Ok(transform)
}

/// GDAL_NODATA is an ASCII number. Values that cannot occur in an 8-bit
/// band are treated as "no nodata".
fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<u8>, RasterError> {
    let Some(tiff::decoder::ifd::Value::Ascii(text)) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    Ok(parse_nodata(&text))
}

fn parse_nodata(text: &str) -> Option<u8> {
    let v: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    if v.fract() == 0.0 && (0.0..=255.0).contains(&v) {
        Some(v as u8)
    } else {
        None
    }
}

/// Encode a class grid as a georeferenced single-band GeoTIFF.
pub fn write_geotiff<W: Write + Seek>(writer: W, grid: &ClassArray) -> Result<(), RasterError> {
    if grid.width == 0 || grid.height == 0 {
        return Err(RasterError::Unsupported("cannot encode an empty grid".into()));
    }
    let pixel_width = grid.bounds.width() / grid.width as f64;
    let pixel_height = grid.bounds.height() / grid.height as f64;

    let mut encoder = TiffEncoder::new(writer)?;
    let mut image = encoder.new_image::<colortype::Gray8>(grid.width as u32, grid.height as u32)?;
    image.rows_per_strip(EXPORT_ROWS_PER_STRIP)?;
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[pixel_width, pixel_height, 0.0][..])?;
    image.encoder().write_tag(
        Tag::ModelTiepointTag,
        &[0.0, 0.0, 0.0, grid.bounds.min_x, grid.bounds.max_y, 0.0][..],
    )?;
    if let Some(nd) = grid.nodata {
        image.encoder().write_tag(Tag::GdalNodata, nd.to_string().as_str())?;
    }
    image.write_data(&grid.data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// 20×40 grid whose value encodes (row + col) % 9, georeferenced at
    /// origin (100, 50) with 0.5-unit pixels.
    fn fixture() -> ClassArray {
        let (w, h) = (20usize, 40usize);
        let bounds = BBox { min_x: 100.0, max_x: 110.0, min_y: 30.0, max_y: 50.0 };
        let mut grid = ClassArray::new(w, h, 0, Some(255), bounds);
        for r in 0..h {
            for c in 0..w {
                grid.set(r, c, ((r + c) % 9) as u8);
            }
        }
        grid
    }

    fn encode(grid: &ClassArray) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        write_geotiff(&mut buf, grid).unwrap();
        buf.into_inner()
    }

    fn ifd_entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }

    /// Uncompressed little-endian GeoTIFF of 40×37 pixels in 16×16 tiles,
    /// so the right column and bottom row of tiles are partial. Origin is
    /// (0, 37) with 1-unit pixels; GDAL_NODATA is 255.
    fn tiled_fixture(value: fn(usize, usize) -> u8) -> Vec<u8> {
        const W: usize = 40;
        const H: usize = 37;
        const T: usize = 16;
        const SHORT: u16 = 3;
        const LONG: u16 = 4;
        const DOUBLE: u16 = 12;
        let (across, down) = (W.div_ceil(T), H.div_ceil(T));
        let tiles = across * down;
        let entries: u16 = 14;

        let offsets_at = 8 + 2 + entries as usize * 12 + 4;
        let counts_at = offsets_at + 4 * tiles;
        let scale_at = counts_at + 4 * tiles;
        let tiepoint_at = scale_at + 3 * 8;
        let data_at = tiepoint_at + 6 * 8;

        let mut out = b"II*\0".to_vec();
        out.extend_from_slice(&8u32.to_le_bytes());
        out.extend_from_slice(&entries.to_le_bytes());
        ifd_entry(&mut out, 256, SHORT, 1, W as u32);
        ifd_entry(&mut out, 257, SHORT, 1, H as u32);
        ifd_entry(&mut out, 258, SHORT, 1, 8);
        ifd_entry(&mut out, 259, SHORT, 1, 1);
        ifd_entry(&mut out, 262, SHORT, 1, 1);
        ifd_entry(&mut out, 277, SHORT, 1, 1);
        ifd_entry(&mut out, 284, SHORT, 1, 1);
        ifd_entry(&mut out, 322, SHORT, 1, T as u32);
        ifd_entry(&mut out, 323, SHORT, 1, T as u32);
        ifd_entry(&mut out, 324, LONG, tiles as u32, offsets_at as u32);
        ifd_entry(&mut out, 325, LONG, tiles as u32, counts_at as u32);
        ifd_entry(&mut out, 33550, DOUBLE, 3, scale_at as u32);
        ifd_entry(&mut out, 33922, DOUBLE, 6, tiepoint_at as u32);
        ifd_entry(&mut out, 42113, 2, 4, u32::from_le_bytes(*b"255\0"));
        out.extend_from_slice(&0u32.to_le_bytes());

        for i in 0..tiles {
            out.extend_from_slice(&((data_at + i * T * T) as u32).to_le_bytes());
        }
        for _ in 0..tiles {
            out.extend_from_slice(&((T * T) as u32).to_le_bytes());
        }
        for v in [1.0f64, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, H as f64, 0.0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(out.len(), data_at);

        // Edge tiles are stored full-size with zero padding.
        for i in 0..tiles {
            let (ty, tx) = (i / across, i % across);
            for r in 0..T {
                for c in 0..T {
                    let (row, col) = (ty * T + r, tx * T + c);
                    out.push(if row < H && col < W { value(row, col) } else { 0 });
                }
            }
        }
        out
    }

    fn tiled_value(r: usize, c: usize) -> u8 {
        ((r * 3 + c) % 9) as u8
    }

    #[test]
    fn window_across_partial_edge_tiles_matches_source() {
        let bytes = tiled_fixture(tiled_value);
        let mut raster = CategoricalRaster::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!((raster.width(), raster.height()), (40, 37));
        assert_eq!(raster.nodata(), Some(255));
        assert_eq!(raster.bounds(), BBox { min_x: 0.0, min_y: 0.0, max_x: 40.0, max_y: 37.0 });

        let win = Window { col_off: 5, row_off: 3, width: 35, height: 34 };
        let data = raster.read_window(win).unwrap();
        for r in 0..win.height {
            for c in 0..win.width {
                assert_eq!(data[r * win.width + c], tiled_value(r + 3, c + 5), "at ({r}, {c})");
            }
        }
    }

    #[test]
    fn clip_inside_bottom_right_tile() {
        let bytes = tiled_fixture(tiled_value);
        let mut raster = CategoricalRaster::from_reader(Cursor::new(bytes)).unwrap();
        let aoi = BBox { min_x: 30.0, min_y: 0.0, max_x: 40.0, max_y: 5.0 };

        let out = crate::clip::clip(&mut raster, &aoi, 1.0).unwrap();
        assert_eq!((out.width, out.height), (10, 5));
        for r in 0..5 {
            for c in 0..10 {
                assert_eq!(out.get(r, c), tiled_value(r + 32, c + 30));
            }
        }
    }

    #[test]
    fn reads_georeferencing_and_nodata() {
        let bytes = encode(&fixture());
        let raster = CategoricalRaster::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!((raster.width(), raster.height()), (20, 40));
        assert_eq!(raster.nodata(), Some(255));
        let t = raster.transform();
        assert!((t.origin_x - 100.0).abs() < 1e-12);
        assert!((t.origin_y - 50.0).abs() < 1e-12);
        assert!((t.pixel_width - 0.5).abs() < 1e-12);
        assert_eq!(raster.bounds(), fixture().bounds);
    }

    #[test]
    fn window_spanning_several_strips_matches_source() {
        let grid = fixture();
        let mut raster = CategoricalRaster::from_reader(Cursor::new(encode(&grid))).unwrap();
        // Rows 10..35 cross strip boundaries at 16 and 32.
        let win = Window { col_off: 3, row_off: 10, width: 7, height: 25 };
        let data = raster.read_window(win).unwrap();
        for r in 0..win.height {
            for c in 0..win.width {
                assert_eq!(data[r * win.width + c], grid.get(r + 10, c + 3));
            }
        }
    }

    #[test]
    fn window_outside_raster_is_rejected() {
        let mut raster = CategoricalRaster::from_reader(Cursor::new(encode(&fixture()))).unwrap();
        let win = Window { col_off: 15, row_off: 0, width: 10, height: 1 };
        assert!(raster.read_window(win).is_err());
    }

    #[test]
    fn garbage_bytes_fail_to_open() {
        let res = CategoricalRaster::from_reader(Cursor::new(b"not a tiff".to_vec()));
        assert!(matches!(res, Err(RasterError::Tiff(_))));
    }

    #[test]
    fn nodata_parsing() {
        assert_eq!(parse_nodata("0"), Some(0));
        assert_eq!(parse_nodata("255\0"), Some(255));
        assert_eq!(parse_nodata("-9999"), None);
        assert_eq!(parse_nodata("nan"), None);
    }
}
