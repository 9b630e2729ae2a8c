/// Engine configuration, loadable from JSON. Every field has a default.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::fallback::FallbackRule;
use crate::region::Region;

/// Root of the published Dynamic World yearly rasters.
pub const DEFAULT_BASE_URL: &str =
    "https://huggingface.co/datasets/Project%2067/IndiaYearlyDynamicWorld/resolve/main";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Local tile cache root.
    pub cache_dir: PathBuf,
    /// Remote tile store root (or a mirror directory).
    pub base_url: String,
    pub first_year: u16,
    pub last_year: u16,
    /// Nearest-neighbour downsampling factor applied after clipping.
    pub scale_factor: f64,
    /// Per-download timeout.
    pub timeout_secs: u64,
    pub fallback_rules: Vec<FallbackRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("tile-cache"),
            base_url: DEFAULT_BASE_URL.to_string(),
            first_year: 2016,
            last_year: 2025,
            scale_factor: 0.2,
            timeout_secs: 30,
            // The published mh 2025 tile covers only part of the state.
            fallback_rules: vec![FallbackRule {
                region: Region::known("mh"),
                year: 2025,
                substitute_year: 2024,
            }],
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| EngineError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.first_year > self.last_year {
            return Err(EngineError::Config(format!(
                "first_year {} is after last_year {}",
                self.first_year, self.last_year
            )));
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(EngineError::Config(format!(
                "scale_factor must be positive, got {}",
                self.scale_factor
            )));
        }
        let mut seen = HashSet::new();
        for rule in &self.fallback_rules {
            if rule.substitute_year == rule.year {
                return Err(EngineError::Config(format!(
                    "fallback rule for {} {} substitutes itself",
                    rule.region, rule.year
                )));
            }
            if !seen.insert((rule.region.clone(), rule.year)) {
                return Err(EngineError::Config(format!(
                    "duplicate fallback rule for {} {}",
                    rule.region, rule.year
                )));
            }
        }
        Ok(())
    }

    /// Years queried, ascending.
    pub fn years(&self) -> impl Iterator<Item = u16> {
        self.first_year..=self.last_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_ten_years_with_mh_rule() {
        let c = EngineConfig::default();
        assert_eq!(c.years().count(), 10);
        assert_eq!(c.fallback_rules.len(), 1);
        assert_eq!(c.fallback_rules[0].substitute_year, 2024);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: EngineConfig =
            serde_json::from_str(r#"{ "scale_factor": 1.0, "fallback_rules": [] }"#).unwrap();
        assert_eq!(c.scale_factor, 1.0);
        assert!(c.fallback_rules.is_empty());
        assert_eq!(c.first_year, 2016);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut c = EngineConfig { first_year: 2020, last_year: 2019, ..Default::default() };
        assert!(c.validate().is_err());
        c.last_year = 2025;
        c.scale_factor = -1.0;
        assert!(c.validate().is_err());
        c.scale_factor = 0.5;
        c.fallback_rules.push(c.fallback_rules[0].clone());
        assert!(matches!(c.validate(), Err(EngineError::Config(_))));
    }
}
