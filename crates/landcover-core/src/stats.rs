/// Per-class percentage statistics over a class-code grid.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classes::LandCover;

/// Class composition of one grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    /// Percentage of valid pixels per recognized class, rounded to 2 decimals.
    /// Classes with no pixels are absent.
    pub percentages: BTreeMap<LandCover, f64>,
    /// Pixels not equal to nodata; the percentage denominator.
    pub valid_pixels: usize,
    /// Valid pixels whose code is outside the class table. They count toward
    /// `valid_pixels` but have no percentage entry.
    pub unrecognized_pixels: usize,
}

impl ClassStats {
    pub fn total_percentage(&self) -> f64 {
        self.percentages.values().sum()
    }
}

#[inline]
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Count codes in `data`, skipping `nodata`, and convert recognized classes
/// to percentages of all remaining pixels.
pub fn aggregate(data: &[u8], nodata: Option<u8>) -> ClassStats {
    let mut counts = [0usize; 256];
    for &v in data {
        counts[v as usize] += 1;
    }
    if let Some(nd) = nodata {
        counts[nd as usize] = 0;
    }

    let valid_pixels: usize = counts.iter().sum();
    let mut percentages = BTreeMap::new();
    let mut unrecognized_pixels = 0usize;

    if valid_pixels > 0 {
        for (code, &n) in counts.iter().enumerate() {
            if n == 0 {
                continue;
            }
            match LandCover::from_code(code as u8) {
                Some(class) => {
                    percentages.insert(class, round2(n as f64 / valid_pixels as f64 * 100.0));
                }
                None => unrecognized_pixels += n,
            }
        }
    }

    ClassStats {
        percentages,
        valid_pixels,
        unrecognized_pixels,
    }
}
