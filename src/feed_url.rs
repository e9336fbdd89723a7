use crate::error::{FeedError, ValidationError};
use crate::location::{Country, Region};
use chrono::{DateTime, Utc};
use url::Url;

pub const TWICKETS_URL: &str = "https://www.twickets.live";

/// Page size the feed is known to serve reliably.
pub const DEFAULT_PAGE_SIZE: usize = 10;

const COUNTRY_QUERY_KEY: &str = "countryCode";
const REGION_QUERY_KEY: &str = "regionCode";

/// URL of a listing given its id and the number of tickets in it.
///
/// Format is `https://www.twickets.live/app/block/<id>,<num_tickets>`
pub fn listing_url(listing_id: &str, num_tickets: u32) -> String {
    format!("{}/app/block/{},{}", TWICKETS_URL, listing_id, num_tickets)
}

#[derive(Debug, Clone)]
pub struct FeedUrlInput {
    pub api_key: String,
    pub country: Country,
    /// Empty means every region of the country.
    pub regions: Vec<Region>,
    pub num_listings: usize,
    /// Exclusive upper bound on listing creation time. `None` means now.
    pub before_time: Option<DateTime<Utc>>,
}

impl FeedUrlInput {
    pub fn new(api_key: impl Into<String>, country: Country) -> Self {
        Self {
            api_key: api_key.into(),
            country,
            regions: Vec::new(),
            num_listings: DEFAULT_PAGE_SIZE,
            before_time: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::new("api_key", "must be set"));
        }
        if self.num_listings == 0 {
            return Err(ValidationError::new("num_listings", "must be greater than 0"));
        }
        if let Some(region) = self.regions.iter().find(|r| r.country() != self.country) {
            return Err(ValidationError::new(
                "regions",
                format!("'{}' is not in country '{}'", region, self.country),
            ));
        }
        Ok(())
    }
}

/// Builds the url of a page of the listings feed.
///
/// Format is
/// `https://www.twickets.live/services/catalogue?api_key=<key>&count=10&maxTime=<millis>&q=countryCode=GB`
pub fn feed_url(input: &FeedUrlInput) -> Result<String, FeedError> {
    feed_url_with_base(TWICKETS_URL, input)
}

pub(crate) fn feed_url_with_base(base_url: &str, input: &FeedUrlInput) -> Result<String, FeedError> {
    input.validate()?;

    let mut url = Url::parse(base_url)?.join("services/catalogue")?;

    let count = input.num_listings.to_string();
    let max_time = input.before_time.map(|t| t.timestamp_millis().to_string());
    let location = location_query(input.country, &input.regions);

    // Keys sorted to keep urls stable between calls
    let mut params: Vec<(&str, &str)> = vec![
        ("api_key", input.api_key.as_str()),
        ("count", count.as_str()),
    ];
    if let Some(max_time) = &max_time {
        params.push(("maxTime", max_time.as_str()));
    }
    params.push(("q", location.as_str()));

    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
        .replace("%3D", "=")
        .replace("%2C", ",");
    url.set_query(Some(&encoded));

    Ok(url.to_string())
}

/// Country and regions as the single composite `q` value the feed expects.
fn location_query(country: Country, regions: &[Region]) -> String {
    let mut parts = vec![format!("{}={}", COUNTRY_QUERY_KEY, country.code())];
    parts.extend(
        regions
            .iter()
            .map(|r| format!("{}={}", REGION_QUERY_KEY, r.code())),
    );
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builds_feed_url() {
        let before = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut input = FeedUrlInput::new("key", Country::UnitedKingdom);
        input.before_time = Some(before);

        assert_eq!(
            feed_url(&input).unwrap(),
            "https://www.twickets.live/services/catalogue?api_key=key&count=10&maxTime=1700000000000&q=countryCode=GB"
        );
    }

    #[test]
    fn joins_regions_into_location_query() {
        let mut input = FeedUrlInput::new("key", Country::UnitedKingdom);
        input.regions = vec![Region::London, Region::NorthWest];
        input.num_listings = 25;

        assert_eq!(
            feed_url(&input).unwrap(),
            "https://www.twickets.live/services/catalogue?api_key=key&count=25&q=countryCode=GB,regionCode=GBLO,regionCode=GBNW"
        );
    }

    #[test]
    fn rejects_missing_api_key() {
        let input = FeedUrlInput::new("", Country::UnitedKingdom);
        match feed_url(&input) {
            Err(FeedError::Validation(err)) => assert_eq!(err.field, "api_key"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn builds_listing_url() {
        assert_eq!(
            listing_url("123456", 2),
            "https://www.twickets.live/app/block/123456,2"
        );
    }
}
