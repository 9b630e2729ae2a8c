//! Per-year land-cover composition for an area of interest, computed from a
//! multi-year stack of categorical raster tiles (one per region per year).

pub mod aoi;
pub mod cache;
pub mod class_array;
pub mod classes;
pub mod clip;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod raster;
pub mod region;
pub mod series;
pub mod stats;

pub use aoi::BBox;
pub use cache::{HttpTileSource, MirrorTileSource, TileCache, TileSource};
pub use class_array::ClassArray;
pub use classes::{LandCover, CLASS_TABLE};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use fallback::{FallbackRule, Substitution};
pub use region::{Region, TileKey};
pub use series::{SeriesResult, TimeSeries, YearRow};
pub use stats::{aggregate, ClassStats};
