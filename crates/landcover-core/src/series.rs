//! Year-indexed land-cover composition table and the assembled query result.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::class_array::ClassArray;
use crate::classes::{LandCover, CLASS_TABLE};
use crate::fallback::Substitution;
use crate::stats::ClassStats;

/// One row of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearRow {
    pub year: u16,
    pub stats: ClassStats,
    /// Set when the row's data came from another year's tile.
    pub substituted_from: Option<u16>,
}

/// Rows kept sorted by year, at most one per year.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    rows: Vec<YearRow>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the row for `row.year`.
    pub fn insert(&mut self, row: YearRow) {
        match self.rows.binary_search_by_key(&row.year, |r| r.year) {
            Ok(i) => self.rows[i] = row,
            Err(i) => self.rows.insert(i, row),
        }
    }

    pub fn rows(&self) -> &[YearRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn years(&self) -> Vec<u16> {
        self.rows.iter().map(|r| r.year).collect()
    }

    pub fn get(&self, year: u16) -> Option<&YearRow> {
        self.rows
            .binary_search_by_key(&year, |r| r.year)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Percentage for one cell, if that class occurred that year.
    pub fn value(&self, year: u16, class: LandCover) -> Option<f64> {
        self.get(year)?.stats.percentages.get(&class).copied()
    }

    /// Classes present in any year, in class-code order.
    pub fn columns(&self) -> Vec<LandCover> {
        CLASS_TABLE
            .iter()
            .copied()
            .filter(|c| self.rows.iter().any(|r| r.stats.percentages.contains_key(c)))
            .collect()
    }

    /// One JSON object per year: `"Year"` plus one key per class label present.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                obj.insert("Year".into(), Value::from(row.year));
                for (class, pct) in &row.stats.percentages {
                    obj.insert(class.label().into(), Value::from(*pct));
                }
                Value::Object(obj)
            })
            .collect()
    }
}

/// Everything a `build_series` query produces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesResult {
    pub series: TimeSeries,
    /// Class grid per processed year, substituted years included.
    pub arrays: BTreeMap<u16, ClassArray>,
    pub substitutions: Vec<Substitution>,
}

impl SeriesResult {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(year: u16, classes: &[(LandCover, f64)]) -> YearRow {
        YearRow {
            year,
            stats: ClassStats {
                percentages: classes.iter().copied().collect(),
                valid_pixels: 100,
                unrecognized_pixels: 0,
            },
            substituted_from: None,
        }
    }

    #[test]
    fn rows_stay_sorted_and_unique() {
        let mut ts = TimeSeries::new();
        ts.insert(row(2020, &[(LandCover::Crops, 100.0)]));
        ts.insert(row(2016, &[(LandCover::Water, 100.0)]));
        ts.insert(row(2020, &[(LandCover::Trees, 100.0)]));
        assert_eq!(ts.years(), vec![2016, 2020]);
        assert_eq!(ts.value(2020, LandCover::Trees), Some(100.0));
        assert_eq!(ts.value(2020, LandCover::Crops), None);
    }

    #[test]
    fn columns_are_union_in_code_order() {
        let mut ts = TimeSeries::new();
        ts.insert(row(2017, &[(LandCover::BuiltUp, 40.0), (LandCover::Water, 60.0)]));
        ts.insert(row(2018, &[(LandCover::Trees, 100.0)]));
        assert_eq!(ts.columns(), vec![LandCover::Water, LandCover::Trees, LandCover::BuiltUp]);
    }

    #[test]
    fn records_use_labels_and_year_key() {
        let mut ts = TimeSeries::new();
        ts.insert(row(2019, &[(LandCover::ShrubAndScrub, 12.5)]));
        let records = ts.to_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Year"], 2019);
        assert_eq!(records[0]["Shrub & Scrub"], 12.5);
    }
}
