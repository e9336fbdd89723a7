use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Countries the feed can be queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "GB")]
    UnitedKingdom,
}

impl Country {
    pub const ALL: [Country; 1] = [Country::UnitedKingdom];

    pub fn code(&self) -> &'static str {
        match self {
            Country::UnitedKingdom => "GB",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn is_valid_code(code: &str) -> bool {
        Self::from_code(code).is_some()
    }

    pub fn regions(&self) -> Vec<Region> {
        Region::ALL
            .into_iter()
            .filter(|r| r.country() == *self)
            .collect()
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Country {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
            .ok_or_else(|| ValidationError::new("country", format!("'{}' is not valid", s)))
    }
}

/// Regions within a country, as reported on a listing's venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "GBEA")]
    EastAnglia,
    #[serde(rename = "GBLO")]
    London,
    #[serde(rename = "GBMI")]
    Midlands,
    #[serde(rename = "GBNO")]
    North,
    #[serde(rename = "GBNE")]
    NorthEast,
    #[serde(rename = "GBNI")]
    NorthernIreland,
    #[serde(rename = "GBNW")]
    NorthWest,
    #[serde(rename = "GBSC")]
    Scotland,
    #[serde(rename = "GBSO")]
    South,
    #[serde(rename = "GBSE")]
    SouthEast,
    #[serde(rename = "GBSW")]
    SouthWest,
    #[serde(rename = "GBWA")]
    Wales,
}

impl Region {
    pub const ALL: [Region; 12] = [
        Region::EastAnglia,
        Region::London,
        Region::Midlands,
        Region::North,
        Region::NorthEast,
        Region::NorthernIreland,
        Region::NorthWest,
        Region::Scotland,
        Region::South,
        Region::SouthEast,
        Region::SouthWest,
        Region::Wales,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Region::EastAnglia => "GBEA",
            Region::London => "GBLO",
            Region::Midlands => "GBMI",
            Region::North => "GBNO",
            Region::NorthEast => "GBNE",
            Region::NorthernIreland => "GBNI",
            Region::NorthWest => "GBNW",
            Region::Scotland => "GBSC",
            Region::South => "GBSO",
            Region::SouthEast => "GBSE",
            Region::SouthWest => "GBSW",
            Region::Wales => "GBWA",
        }
    }

    pub fn country(&self) -> Country {
        Country::UnitedKingdom
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }

    pub fn is_valid_code(code: &str) -> bool {
        Self::from_code(code).is_some()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
            .ok_or_else(|| ValidationError::new("region", format!("'{}' is not valid", s)))
    }
}
