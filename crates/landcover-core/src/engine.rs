//! AOI analysis across the configured year range.
//!
//! Each year is processed sequentially: resolve the tile, open it, clip under
//! the fallback policy, classify. A raster handle never outlives its year.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};

use crate::aoi::BBox;
use crate::cache::{HttpTileSource, TileCache, TileSource};
use crate::class_array::ClassArray;
use crate::clip::clip;
use crate::config::EngineConfig;
use crate::error::{ClipError, EngineError, Result};
use crate::fallback::{clip_with_fallback, FallbackPolicy, Substitution, YearOutcome};
use crate::raster::CategoricalRaster;
use crate::region::{Region, TileKey};
use crate::series::{SeriesResult, YearRow};
use crate::stats::aggregate;

pub struct Engine<S: TileSource = HttpTileSource> {
    config: EngineConfig,
    cache: TileCache<S>,
    policy: FallbackPolicy,
}

impl Engine<HttpTileSource> {
    /// Engine downloading over HTTP with the configured timeout.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let source = HttpTileSource::new(Duration::from_secs(config.timeout_secs))
            .map_err(|e| EngineError::Config(format!("cannot build HTTP client: {e}")))?;
        Self::with_source(config, source)
    }
}

impl<S: TileSource> Engine<S> {
    pub fn with_source(config: EngineConfig, source: S) -> Result<Self> {
        config.validate()?;
        let cache = TileCache::new(config.cache_dir.clone(), config.base_url.clone(), source);
        let policy = FallbackPolicy::from_rules(&config.fallback_rules);
        Ok(Self { config, cache, policy })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &TileCache<S> {
        &self.cache
    }

    /// Local path of the tile for `(region, year)`, downloading if needed.
    pub fn resolve(&self, region: &Region, year: u16) -> Option<PathBuf> {
        self.cache.resolve(&TileKey::new(region.clone(), year))
    }

    /// Validate raw caller input, then run `build_series`.
    pub fn analyze(&self, region_code: &str, bbox: &[f64]) -> Result<SeriesResult> {
        let region = Region::new(region_code)?;
        let aoi = BBox::from_slice(bbox)?;
        self.build_series(&region, &aoi)
    }

    /// Per-year class composition of `aoi` over the configured year range.
    ///
    /// Years without a tile are skipped. A no-overlap year outside the
    /// fallback rules fails the query if any other year has data; when the AOI
    /// misses every tile the result is simply empty.
    pub fn build_series(&self, region: &Region, aoi: &BBox) -> Result<SeriesResult> {
        let mut result = SeriesResult::default();
        let mut deferred: Option<EngineError> = None;

        for year in self.config.years() {
            let key = TileKey::new(region.clone(), year);
            let Some(path) = self.cache.resolve(&key) else {
                info!("No tile for {key}; skipping year.");
                continue;
            };

            let outcome = clip_with_fallback(
                &self.policy,
                &key,
                &path,
                |k, p| self.clip_tile(k, p, aoi),
                |k| self.cache.resolve(k),
            );
            match outcome {
                Ok(YearOutcome::Normal(array)) => record(&mut result, year, array, None),
                Ok(YearOutcome::Substituted(array, sub)) => {
                    record(&mut result, year, array, Some(sub.substitute_year));
                    result.substitutions.push(sub);
                }
                Ok(YearOutcome::Unavailable) => {
                    warn!("No usable data for {key}; skipping year.");
                }
                Err(e) if e.is_no_overlap() => {
                    warn!("{e}");
                    deferred.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(e) = deferred {
            if !result.is_empty() {
                return Err(e);
            }
            info!("AOI lies outside every {region} tile; returning an empty series.");
        }
        Ok(result)
    }

    /// One year's class grid under the fallback policy.
    pub fn year_array(
        &self,
        region: &Region,
        year: u16,
        aoi: &BBox,
    ) -> Result<(ClassArray, Option<Substitution>)> {
        let key = TileKey::new(region.clone(), year);
        let unavailable = || EngineError::TileUnavailable {
            region: region.to_string(),
            year,
        };
        let path = self.cache.resolve(&key).ok_or_else(unavailable)?;
        match clip_with_fallback(
            &self.policy,
            &key,
            &path,
            |k, p| self.clip_tile(k, p, aoi),
            |k| self.cache.resolve(k),
        )? {
            YearOutcome::Normal(array) => Ok((array, None)),
            YearOutcome::Substituted(array, sub) => Ok((array, Some(sub))),
            YearOutcome::Unavailable => Err(unavailable()),
        }
    }

    /// Open, clip and close one tile.
    fn clip_tile(&self, key: &TileKey, path: &Path, aoi: &BBox) -> Result<ClassArray> {
        let raster_error = |source| EngineError::Raster {
            region: key.region.to_string(),
            year: key.year,
            path: path.to_path_buf(),
            source,
        };
        let mut raster = CategoricalRaster::open(path).map_err(raster_error)?;
        clip(&mut raster, aoi, self.config.scale_factor).map_err(|e| match e {
            ClipError::NoOverlap => EngineError::NoOverlap {
                region: key.region.to_string(),
                year: key.year,
            },
            ClipError::Raster(source) => raster_error(source),
            ClipError::InvalidScale(s) => EngineError::Config(format!("invalid scale factor {s}")),
        })
    }
}

fn record(result: &mut SeriesResult, year: u16, array: ClassArray, substituted_from: Option<u16>) {
    let stats = aggregate(&array.data, array.nodata);
    info!(
        "{year}: {} valid pixels, {} classes",
        stats.valid_pixels,
        stats.percentages.len()
    );
    result.series.insert(YearRow {
        year,
        stats,
        substituted_from,
    });
    result.arrays.insert(year, array);
}
