use crate::location::{Country, Region};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "eventName", default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(rename = "showStartingTime", default)]
    pub time: Option<NaiveTime>,
    #[serde(rename = "onSaleTime", default)]
    pub on_sale: Option<DateTime<Utc>>,
    #[serde(rename = "created", default)]
    pub announced: Option<DateTime<Utc>>,
    #[serde(default)]
    pub venue: Venue,
    #[serde(rename = "participants", default)]
    pub lineup: Vec<Lineup>,
}

impl Event {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_venue(mut self, venue: Venue) -> Self {
        self.venue = venue;
        self
    }

    pub fn with_lineup(mut self, lineup: Vec<Lineup>) -> Self {
        self.lineup = lineup;
        self
    }

    /// Region of the venue the event is held at, if the feed reported one.
    pub fn region(&self) -> Option<Region> {
        self.venue.location.region
    }

    /// Artists in billing order.
    pub fn headliners(&self) -> Vec<&Artist> {
        let mut lineup: Vec<&Lineup> = self.lineup.iter().collect();
        lineup.sort_by_key(|l| l.billing);
        lineup.into_iter().map(|l| &l.artist).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    #[serde(rename = "participant")]
    pub artist: Artist,
    #[serde(default)]
    pub billing: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "linkName", default)]
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub postcode: String,
}

impl Venue {
    pub fn in_region(name: impl Into<String>, region: Region) -> Self {
        Self {
            name: name.into(),
            location: Location {
                country: Some(region.country()),
                region: Some(region),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "shortName", default)]
    pub name: String,
    #[serde(rename = "name", default)]
    pub full_name: String,
    #[serde(rename = "countryCode", default)]
    pub country: Option<Country>,
    #[serde(rename = "regionCode", default)]
    pub region: Option<Region>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    #[serde(rename = "tourId", default)]
    pub id: String,
    #[serde(rename = "tourName", default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "minDate", default)]
    pub first_event: Option<NaiveDate>,
    #[serde(rename = "maxDate", default)]
    pub last_event: Option<NaiveDate>,
    // Codes outside the closed country table appear here, so they stay strings
    #[serde(rename = "countryCodes", default)]
    pub countries: Vec<String>,
}
