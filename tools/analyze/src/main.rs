/// AOI analysis tool: computes the yearly land-cover composition of a
/// bounding box within one region's tile stack and writes it as JSON.
///
/// Output records mirror a year-indexed table: one object per year with a
/// "Year" key and one key per land-cover label present.
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;

use landcover_core::raster::write_geotiff;
use landcover_core::{
    BBox, ClassArray, Engine, EngineConfig, MirrorTileSource, Region, SeriesResult, Substitution,
    TileSource,
};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "analyze", about = "Yearly land-cover composition for a bounding box")]
struct Args {
    /// Region code of the tile stack (e.g. mh)
    #[arg(short, long)]
    region: String,

    /// Bounding box in the tiles' native CRS: MINX MINY MAXX MAXY
    #[arg(long, required = true, num_args = 4, value_names = ["MINX", "MINY", "MAXX", "MAXY"], allow_negative_numbers = true)]
    bbox: Vec<f64>,

    /// Grow the bounding box by this margin on every side
    #[arg(long, default_value = "0")]
    buffer: f64,

    /// Engine config JSON (defaults apply to missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the tile cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Override the remote tile store root
    #[arg(long)]
    base_url: Option<String>,

    /// Read tiles from a local mirror directory instead of HTTP
    #[arg(long, conflicts_with = "base_url")]
    mirror: Option<PathBuf>,

    /// Override the downsampling factor
    #[arg(long)]
    scale: Option<f64>,

    /// Output JSON file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include the per-year class grids in the JSON output
    #[arg(long)]
    arrays: bool,

    /// Also write each year's class grid as a GeoTIFF into this directory
    #[arg(long)]
    tif_dir: Option<PathBuf>,
}

// ── Output schema ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Report<'a> {
    region: &'a Region,
    bbox: BBox,
    columns: Vec<&'static str>,
    trends: Vec<Value>,
    substitutions: &'a [Substitution],
    #[serde(skip_serializing_if = "Option::is_none")]
    arrays: Option<&'a std::collections::BTreeMap<u16, ClassArray>>,
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    if let Some(dir) = &args.mirror {
        config.base_url = dir.to_string_lossy().into_owned();
    }
    if let Some(scale) = args.scale {
        config.scale_factor = scale;
    }
    config.validate()?;
    Ok(config)
}

fn run<S: TileSource>(engine: Engine<S>, region: &Region, aoi: &BBox, args: &Args) -> Result<()> {
    let result = engine.build_series(region, aoi)?;
    if result.is_empty() {
        bail!("No data found for region {region} within {aoi:?}");
    }

    print_table(&result);

    if let Some(dir) = &args.tif_dir {
        fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
        for (year, grid) in &result.arrays {
            if grid.is_empty() {
                eprintln!("  [warn] {year}: empty grid after downsampling, not exported");
                continue;
            }
            let path = dir.join(format!("{region}_{year}.tif"));
            let file = File::create(&path).with_context(|| format!("Cannot create {}", path.display()))?;
            write_geotiff(BufWriter::new(file), grid)
                .with_context(|| format!("Write failed: {}", path.display()))?;
        }
    }

    let report = Report {
        region,
        bbox: *aoi,
        columns: result.series.columns().iter().map(|c| c.label()).collect(),
        trends: result.series.to_records(),
        substitutions: &result.substitutions,
        arrays: args.arrays.then_some(&result.arrays),
    };
    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Write failed: {}", path.display()))?;
            eprintln!("[analyze] wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_table(result: &SeriesResult) {
    let columns = result.series.columns();
    let mut header = String::from("Year");
    for c in &columns {
        header.push_str(&format!(" | {:>18}", c.label()));
    }
    eprintln!("{header}");
    for row in result.series.rows() {
        let mut line = row.year.to_string();
        for c in &columns {
            match row.stats.percentages.get(c) {
                Some(p) => line.push_str(&format!(" | {p:>18.2}")),
                None => line.push_str(&format!(" | {:>18}", "-")),
            }
        }
        if let Some(from) = row.substituted_from {
            line.push_str(&format!("  (from {from})"));
        }
        eprintln!("{line}");
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let region = Region::new(&args.region)?;
    let aoi = BBox::from_slice(&args.bbox)?.buffered(args.buffer)?;
    let config = load_config(&args)?;

    if args.mirror.is_some() {
        run(Engine::with_source(config, MirrorTileSource)?, &region, &aoi, &args)
    } else {
        run(Engine::from_config(config)?, &region, &aoi, &args)
    }
}
