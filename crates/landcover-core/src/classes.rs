//! Dynamic World land-cover class code table.
//! Codes 0-8 map to fixed semantic labels; the table is a compile-time
//! constant and has no mutation path.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One semantic land-cover category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LandCover {
    Water,
    Trees,
    Grass,
    FloodedVegetation,
    Crops,
    ShrubAndScrub,
    BuiltUp,
    BareGround,
    SnowAndIce,
}

/// All classes in code order (index == raster code).
pub const CLASS_TABLE: [LandCover; 9] = [
    LandCover::Water,
    LandCover::Trees,
    LandCover::Grass,
    LandCover::FloodedVegetation,
    LandCover::Crops,
    LandCover::ShrubAndScrub,
    LandCover::BuiltUp,
    LandCover::BareGround,
    LandCover::SnowAndIce,
];

impl LandCover {
    /// Look up the class for a raster code. Codes outside 0-8 are unrecognized.
    #[inline]
    pub fn from_code(code: u8) -> Option<Self> {
        CLASS_TABLE.get(code as usize).copied()
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable label, also used as the Time Series column name.
    pub fn label(self) -> &'static str {
        match self {
            LandCover::Water => "Water",
            LandCover::Trees => "Trees",
            LandCover::Grass => "Grass",
            LandCover::FloodedVegetation => "Flooded Vegetation",
            LandCover::Crops => "Crops",
            LandCover::ShrubAndScrub => "Shrub & Scrub",
            LandCover::BuiltUp => "Built-up",
            LandCover::BareGround => "Bare Ground",
            LandCover::SnowAndIce => "Snow & Ice",
        }
    }

    /// Display colour for classified-map rendering (hex RGB).
    pub fn color(self) -> &'static str {
        match self {
            LandCover::Water => "#419bdf",
            LandCover::Trees => "#397d49",
            LandCover::Grass => "#88b053",
            LandCover::FloodedVegetation => "#7a87c6",
            LandCover::Crops => "#e49635",
            LandCover::ShrubAndScrub => "#dfc35a",
            LandCover::BuiltUp => "#c4281b",
            LandCover::BareGround => "#a59b8f",
            LandCover::SnowAndIce => "#b39fe1",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        CLASS_TABLE.iter().copied().find(|c| c.label() == label)
    }
}

impl fmt::Display for LandCover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_in_table_order() {
        for (i, class) in CLASS_TABLE.iter().enumerate() {
            assert_eq!(class.code() as usize, i);
            assert_eq!(LandCover::from_code(i as u8), Some(*class));
        }
    }

    #[test]
    fn unknown_codes_are_unrecognized() {
        assert_eq!(LandCover::from_code(9), None);
        assert_eq!(LandCover::from_code(255), None);
    }

    #[test]
    fn labels_round_trip() {
        assert_eq!(LandCover::from_code(5).map(LandCover::label), Some("Shrub & Scrub"));
        assert_eq!(LandCover::from_label("Built-up"), Some(LandCover::BuiltUp));
        assert_eq!(LandCover::from_label("Tundra"), None);
    }
}
