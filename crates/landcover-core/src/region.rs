/// Region codes and the per-(region, year) tile key.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Longest accepted region code.
const MAX_CODE_LEN: usize = 8;

/// Short lowercase code naming an administrative unit with its own raster
/// stack (e.g. "mh"). Always non-empty ASCII alphanumeric, so it is safe to
/// embed in cache paths and URLs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(String);

impl Region {
    pub fn new(code: &str) -> Result<Self, EngineError> {
        let code = code.trim();
        if code.is_empty() || code.len() > MAX_CODE_LEN {
            return Err(EngineError::MalformedInput(format!(
                "region code must be 1-{MAX_CODE_LEN} characters, got {code:?}"
            )));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(EngineError::MalformedInput(format!(
                "region code must be alphanumeric, got {code:?}"
            )));
        }
        Ok(Self(code.to_ascii_lowercase()))
    }

    /// Code known to be valid at compile time.
    pub(crate) fn known(code: &'static str) -> Self {
        Self(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Region {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::new(s)
    }
}

impl TryFrom<String> for Region {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Region::new(&s)
    }
}

impl From<Region> for String {
    fn from(r: Region) -> Self {
        r.0
    }
}

/// Address of one tile: at most one raster exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub region: Region,
    pub year: u16,
}

impl TileKey {
    pub fn new(region: Region, year: u16) -> Self {
        Self { region, year }
    }

    /// Per-region cache/remote folder, e.g. `dw_mh_rasters`.
    pub fn folder(&self) -> String {
        format!("dw_{}_rasters", self.region)
    }

    /// Tile filename, e.g. `dw_mh_2024.tif`.
    pub fn filename(&self) -> String {
        format!("dw_{}_{}.tif", self.region, self.year)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.region.as_str().to_ascii_uppercase(), self.year)
    }
}
