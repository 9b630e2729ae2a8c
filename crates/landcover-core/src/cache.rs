//! Local tile cache backed by a remote object store.
//!
//! Layout: `<root>/dw_<region>_rasters/dw_<region>_<year>.tif`, mirrored at
//! `<base_url>/dw_<region>_rasters/dw_<region>_<year>.tif` remotely.
//!
//! A cached file is trusted as-is and never re-downloaded. Downloads stream
//! into a per-process `.part` file that is renamed into place on success, so
//! readers never observe a partial tile. Concurrent first access to one key
//! within a process is serialized by a per-key mutex.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::FetchError;
use crate::region::TileKey;

/// Transport that streams a remote object into a sink.
pub trait TileSource {
    /// Write the object at `url` into `sink`; returns the byte count.
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, FetchError>;
}

/// Blocking HTTP(S) transport. Any non-2xx status is an error.
pub struct HttpTileSource {
    client: reqwest::blocking::Client,
}

impl HttpTileSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.copy_to(sink)?)
    }
}

/// Serves tiles from a local directory laid out like the remote store.
/// The cache's base URL is the mirror root path.
pub struct MirrorTileSource;

impl TileSource for MirrorTileSource {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, FetchError> {
        let mut file = File::open(url)?;
        Ok(io::copy(&mut file, sink)?)
    }
}

pub struct TileCache<S: TileSource> {
    root: PathBuf,
    base_url: String,
    source: S,
    // Never pruned; bounded by regions × years.
    locks: Mutex<HashMap<TileKey, Arc<Mutex<()>>>>,
}

impl<S: TileSource> TileCache<S> {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>, source: S) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
            source,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn local_path(&self, key: &TileKey) -> PathBuf {
        self.root.join(key.folder()).join(key.filename())
    }

    pub fn remote_url(&self, key: &TileKey) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            key.folder(),
            key.filename()
        )
    }

    /// Local path of the tile for `key`, downloading it on first access.
    /// Returns `None` when the tile cannot be obtained; the cause is logged.
    pub fn resolve(&self, key: &TileKey) -> Option<PathBuf> {
        let path = self.local_path(key);
        if path.exists() {
            debug!("cache hit {}", path.display());
            return Some(path);
        }

        let lock = self.key_lock(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished the download while we waited.
        if path.exists() {
            return Some(path);
        }

        info!("Downloading raster for {key}...");
        match self.download(key, &path) {
            Ok(bytes) => {
                info!("Finished downloading raster for {key} ({bytes} bytes).");
                Some(path)
            }
            Err(e) => {
                warn!("Failed to download raster for {key}: {e}");
                None
            }
        }
    }

    fn key_lock(&self, key: &TileKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    fn download(&self, key: &TileKey, path: &Path) -> Result<u64, FetchError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let part = path.with_file_name(format!("{}.{}.part", key.filename(), std::process::id()));
        match self.write_part(key, &part) {
            Ok(bytes) => {
                fs::rename(&part, path)?;
                Ok(bytes)
            }
            Err(e) => {
                let _ = fs::remove_file(&part);
                Err(e)
            }
        }
    }

    fn write_part(&self, key: &TileKey, part: &Path) -> Result<u64, FetchError> {
        let mut out = BufWriter::new(File::create(part)?);
        let bytes = self.source.fetch(&self.remote_url(key), &mut out)?;
        out.flush()?;
        Ok(bytes)
    }
}
