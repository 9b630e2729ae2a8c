//! Substitute-year policy for tiles with known partial coverage.
//!
//! A rule `(region, year) -> substitute_year` applies only when the primary
//! tile exists but does not overlap the AOI. The substitute is tried once;
//! substitutions never cascade.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::class_array::ClassArray;
use crate::error::Result;
use crate::region::{Region, TileKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub region: Region,
    pub year: u16,
    pub substitute_year: u16,
}

/// Lookup table built from configured rules.
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    rules: HashMap<(Region, u16), u16>,
}

impl FallbackPolicy {
    pub fn from_rules(rules: &[FallbackRule]) -> Self {
        let rules = rules
            .iter()
            .map(|r| ((r.region.clone(), r.year), r.substitute_year))
            .collect();
        Self { rules }
    }

    pub fn substitute_for(&self, region: &Region, year: u16) -> Option<u16> {
        self.rules.get(&(region.clone(), year)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Record of one year served from another year's tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pub region: Region,
    pub year: u16,
    pub substitute_year: u16,
}

/// Result of clipping one year under the policy.
#[derive(Debug)]
pub enum YearOutcome {
    Normal(ClassArray),
    Substituted(ClassArray, Substitution),
    /// The substitute tile was absent or failed too; the year has no data.
    Unavailable,
}

/// Clip the primary tile for `key`, falling back per `policy` on no-overlap.
///
/// `clip_tile` opens and clips one tile; `resolve` obtains the substitute
/// tile's path. Errors other than a rule-covered no-overlap are returned
/// unchanged.
pub fn clip_with_fallback<C, F>(
    policy: &FallbackPolicy,
    key: &TileKey,
    primary: &Path,
    mut clip_tile: C,
    resolve: F,
) -> Result<YearOutcome>
where
    C: FnMut(&TileKey, &Path) -> Result<ClassArray>,
    F: Fn(&TileKey) -> Option<PathBuf>,
{
    let err = match clip_tile(key, primary) {
        Ok(array) => return Ok(YearOutcome::Normal(array)),
        Err(e) => e,
    };
    if !err.is_no_overlap() {
        return Err(err);
    }
    let Some(substitute_year) = policy.substitute_for(&key.region, key.year) else {
        return Err(err);
    };

    warn!("{key} raster has limited extent. Using {substitute_year} data instead.");
    let sub_key = TileKey::new(key.region.clone(), substitute_year);
    let Some(sub_path) = resolve(&sub_key) else {
        warn!("Substitute tile {sub_key} is unavailable; no data for {key}.");
        return Ok(YearOutcome::Unavailable);
    };

    match clip_tile(&sub_key, &sub_path) {
        Ok(array) => Ok(YearOutcome::Substituted(
            array,
            Substitution {
                region: key.region.clone(),
                year: key.year,
                substitute_year,
            },
        )),
        Err(e) => {
            warn!("Substitute tile {sub_key} failed ({e}); no data for {key}.");
            Ok(YearOutcome::Unavailable)
        }
    }
}
