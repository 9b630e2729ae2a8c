/// Error types for the land-cover engine.
use std::path::PathBuf;

use thiserror::Error;

/// Failures opening or decoding a cached GeoTIFF tile.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF decoding error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Tile has no usable ModelPixelScale/ModelTiepoint or ModelTransformation.
    #[error("missing or unusable georeferencing: {0}")]
    Georeference(String),

    #[error("unsupported raster layout: {0}")]
    Unsupported(String),
}

/// Failures from clipping a raster to an AOI.
#[derive(Error, Debug)]
pub enum ClipError {
    /// The AOI does not intersect the raster footprint at all.
    #[error("AOI does not overlap raster footprint")]
    NoOverlap,

    #[error("invalid scale factor {0}")]
    InvalidScale(f64),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Failures fetching a tile from the remote store.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned status {0}")]
    Status(u16),

    #[error("failed writing tile: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller-facing error taxonomy for AOI queries.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid AOI geometry or region code; aborts the whole query.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Tile could not be obtained locally or remotely.
    #[error("tile unavailable for {region} {year}")]
    TileUnavailable { region: String, year: u16 },

    /// AOI does not intersect the tile for this year.
    #[error("AOI does not overlap the {region} {year} tile")]
    NoOverlap { region: String, year: u16 },

    /// Cached tile is corrupt or unreadable.
    #[error("failed reading {} for {region} {year}: {source}", .path.display())]
    Raster {
        region: String,
        year: u16,
        path: PathBuf,
        #[source]
        source: RasterError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn is_no_overlap(&self) -> bool {
        matches!(self, EngineError::NoOverlap { .. })
    }
}

/// Type alias for Results using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;
