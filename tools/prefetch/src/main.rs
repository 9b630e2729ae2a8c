/// Cache warming tool: downloads every tile of a region's stack for the
/// configured year range into the local tile cache.
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use landcover_core::{Engine, EngineConfig, Region};

#[derive(Parser, Debug)]
#[command(name = "prefetch", about = "Download a region's yearly tiles into the local cache")]
struct Args {
    /// Region codes to fetch (e.g. mh ka)
    #[arg(required = true)]
    regions: Vec<String>,

    /// Engine config JSON (defaults apply to missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the tile cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Fail when any year is unavailable
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = args.cache_dir {
        config.cache_dir = dir;
    }
    let years: Vec<u16> = config.years().collect();
    let engine = Engine::from_config(config)?;

    let mut missing = 0usize;
    for code in &args.regions {
        let region = Region::new(code)?;
        eprintln!("[prefetch] Region: {region}");
        for &year in &years {
            match engine.resolve(&region, year) {
                Some(path) => eprintln!("  {year}: {}", path.display()),
                None => {
                    eprintln!("  {year}: unavailable");
                    missing += 1;
                }
            }
        }
    }

    eprintln!("[prefetch] Done. {missing} tile(s) unavailable.");
    if args.strict && missing > 0 {
        bail!("{missing} tile(s) unavailable");
    }
    Ok(())
}
