use crate::error::{PageError, ValidationError};
use crate::event::{Event, Tour};
use crate::feed_url::listing_url;
use crate::filter::{matches_any_filter, validate_filters, Filter};
use crate::predicate::ListingPredicate;
use crate::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A listing of ticket(s) on Twickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketListing {
    #[serde(rename = "blockId")]
    pub id: String,
    #[serde(rename = "created", with = "unix_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "expires", with = "unix_millis::option", default)]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(rename = "ticketQuantity", default = "one_ticket")]
    pub num_tickets: u32,

    /// Total price of all tickets, excluding fee.
    #[serde(rename = "totalSellingPrice", default)]
    pub total_price_excl_fee: Price,
    /// Total fee for all tickets.
    #[serde(rename = "totalTwicketsFee", default)]
    pub twickets_fee: Price,
    /// Original total price of all tickets, including any fee.
    #[serde(rename = "faceValuePrice", default)]
    pub original_total_price: Price,

    #[serde(rename = "sellerWillConsiderOffers", default)]
    pub seller_will_consider_offers: bool,

    /// Seated, standing, box etc.
    #[serde(rename = "priceTier", default)]
    pub ticket_type: String,
    #[serde(rename = "seatAssigned", default)]
    pub seat_assigned: bool,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub row: String,

    #[serde(default)]
    pub event: Event,
    #[serde(default)]
    pub tour: Tour,
}

fn one_ticket() -> u32 {
    1
}

impl TicketListing {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, event: Event) -> Self {
        Self {
            id: id.into(),
            created_at,
            expires_at: None,
            num_tickets: 1,
            total_price_excl_fee: Price::default(),
            twickets_fee: Price::default(),
            original_total_price: Price::default(),
            seller_will_consider_offers: false,
            ticket_type: String::new(),
            seat_assigned: false,
            section: String::new(),
            row: String::new(),
            event,
            tour: Tour::default(),
        }
    }

    pub fn with_tickets(mut self, num_tickets: u32) -> Self {
        self.num_tickets = num_tickets;
        self
    }

    pub fn with_prices(mut self, total_excl_fee: Price, fee: Price, original_total: Price) -> Self {
        self.total_price_excl_fee = total_excl_fee;
        self.twickets_fee = fee;
        self.original_total_price = original_total;
        self
    }

    pub fn url(&self) -> String {
        listing_url(&self.id, self.num_tickets)
    }

    fn ticket_divisor(&self) -> u32 {
        self.num_tickets.max(1)
    }

    pub fn ticket_price_excl_fee(&self) -> Price {
        self.total_price_excl_fee.divide(self.ticket_divisor())
    }

    pub fn twickets_fee_per_ticket(&self) -> Price {
        self.twickets_fee.divide(self.ticket_divisor())
    }

    pub fn total_price_incl_fee(&self) -> Price {
        self.total_price_excl_fee.add(self.twickets_fee)
    }

    /// Rounded once, on the total including fee. Summing per ticket prices
    /// can drift from the total by up to `num_tickets - 1` minor units.
    pub fn ticket_price_incl_fee(&self) -> Price {
        self.total_price_incl_fee().divide(self.ticket_divisor())
    }

    pub fn original_ticket_price(&self) -> Price {
        self.original_total_price.divide(self.ticket_divisor())
    }

    /// Discount (including fee) on the original price, between 0 and 1.
    ///
    /// A listing sold at face value comes out below 0 once the fee is added.
    /// Listings without a face value report 0.
    pub fn discount(&self) -> f64 {
        let original = self.original_total_price.number();
        if original == 0.0 {
            return 0.0;
        }
        1.0 - self.total_price_incl_fee().number() / original
    }

    /// Discount as a percentage e.g. `12.50%`, or `none` when the price went up.
    pub fn discount_string(&self) -> String {
        let discount = self.discount();
        if discount < 0.0 {
            return "none".to_string();
        }
        format!("{:.2}%", discount * 100.0)
    }

    /// Whether the listing matches any of the filters. Filters are validated first.
    pub fn matches_any_filter(&self, filters: &[Filter]) -> Result<bool, ValidationError> {
        validate_filters(filters)?;
        Ok(matches_any_filter(self, filters))
    }
}

pub fn get_by_id<'a>(listings: &'a [TicketListing], id: &str) -> Option<&'a TicketListing> {
    listings.iter().find(|l| l.id == id)
}

/// Keeps listings matching any of the filters, preserving order.
///
/// An empty filter set keeps everything.
pub fn filter_listings(
    listings: Vec<TicketListing>,
    filters: &[Filter],
) -> Result<Vec<TicketListing>, ValidationError> {
    if filters.is_empty() {
        return Ok(listings);
    }
    validate_filters(filters)?;

    Ok(listings
        .into_iter()
        .filter(|l| matches_any_filter(l, filters))
        .collect())
}

pub fn filter_listings_by(
    listings: Vec<TicketListing>,
    predicate: &ListingPredicate,
) -> Vec<TicketListing> {
    listings.into_iter().filter(|l| predicate.matches(l)).collect()
}

#[derive(Deserialize)]
struct FeedResponse {
    #[serde(rename = "responseData", default)]
    response_data: Vec<FeedEntry>,
}

#[derive(Deserialize)]
struct FeedEntry {
    #[serde(rename = "catalogBlockSummary")]
    listing: Option<TicketListing>,
}

/// Decodes a feed page body. Delisted entries come back as `null` and are skipped.
pub fn decode_feed(body: &[u8]) -> Result<Vec<TicketListing>, PageError> {
    let response: FeedResponse = serde_json::from_slice(body)?;
    Ok(response
        .response_data
        .into_iter()
        .filter_map(|entry| entry.listing)
        .collect())
}

/// Epoch milliseconds, sent by the feed as either a string or a number.
mod unix_millis {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Text(String),
        Number(i64),
    }

    fn to_datetime<E: de::Error>(millis: Millis) -> Result<DateTime<Utc>, E> {
        let millis = match millis {
            Millis::Number(n) => n,
            Millis::Text(s) => s.trim().parse::<i64>().map_err(E::custom)?,
        };
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| E::custom(format!("timestamp {} out of range", millis)))
    }

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.timestamp_millis().to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        to_datetime(Millis::deserialize(deserializer)?)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            time: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<Millis>::deserialize(deserializer)?
                .map(to_datetime)
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::Currency;
    use chrono::TimeZone;

    fn gbp(amount: i64) -> Price {
        Price::new(Currency::Gbp, amount)
    }

    fn listing(total: i64, fee: i64, original: i64, tickets: u32) -> TicketListing {
        TicketListing::new("1", Utc::now(), Event::new("e", "Coldplay"))
            .with_tickets(tickets)
            .with_prices(gbp(total), gbp(fee), gbp(original))
    }

    #[test]
    fn per_ticket_prices() {
        let listing = listing(9000, 900, 10000, 2);

        assert_eq!(listing.ticket_price_excl_fee(), gbp(4500));
        assert_eq!(listing.twickets_fee_per_ticket(), gbp(450));
        assert_eq!(listing.total_price_incl_fee(), gbp(9900));
        assert_eq!(listing.ticket_price_incl_fee(), gbp(4950));
        assert_eq!(listing.original_ticket_price(), gbp(5000));
    }

    #[test]
    fn per_ticket_price_rounds() {
        let listing = listing(130, 0, 130, 3);
        assert_eq!(listing.ticket_price_incl_fee(), gbp(43));
    }

    #[test]
    fn discount_and_display() {
        let listing = listing(7000, 500, 10000, 2);
        assert!((listing.discount() - 0.25).abs() < 1e-9);
        assert_eq!(listing.discount_string(), "25.00%");
    }

    #[test]
    fn fee_above_face_value_is_no_discount() {
        let listing = listing(10000, 1000, 10000, 2);
        assert!(listing.discount() < 0.0);
        assert_eq!(listing.discount_string(), "none");
    }

    #[test]
    fn missing_face_value_has_no_discount() {
        let listing = listing(10000, 1000, 0, 1);
        assert_eq!(listing.discount(), 0.0);
    }

    #[test]
    fn url_uses_id_and_ticket_count() {
        let listing = listing(1, 1, 1, 3);
        assert_eq!(listing.url(), "https://www.twickets.live/app/block/1,3");
    }

    #[test]
    fn decodes_feed_and_skips_delisted() {
        let body = br#"{
            "responseData": [
                {"catalogBlockSummary": {
                    "blockId": "111",
                    "created": "1700000000000",
                    "expires": 1700003600000,
                    "ticketQuantity": 2,
                    "totalSellingPrice": {"currencyCode": "GBP", "amountInCents": 9000},
                    "totalTwicketsFee": {"currencyCode": "GBP", "amountInCents": 900},
                    "faceValuePrice": {"currencyCode": "GBP", "amountInCents": 10000},
                    "event": {"id": "e1", "eventName": "Coldplay"}
                }},
                {"catalogBlockSummary": null},
                {"catalogBlockSummary": {"blockId": "222", "created": "1699999940000"}}
            ]
        }"#;

        let listings = decode_feed(body).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, "111");
        assert_eq!(
            listings[0].created_at,
            Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
        );
        assert_eq!(
            listings[0].expires_at,
            Utc.timestamp_millis_opt(1_700_003_600_000).single()
        );
        assert_eq!(listings[0].event.name, "Coldplay");
        assert_eq!(listings[1].num_tickets, 1);
        assert!(get_by_id(&listings, "222").is_some());
        assert!(get_by_id(&listings, "333").is_none());
    }

    #[test]
    fn malformed_feed_is_a_decode_error() {
        let result = decode_feed(br#"{"responseData": [{"catalogBlockSummary": {"blockId": "1", "created": "soon"}}]}"#);
        assert!(matches!(result, Err(PageError::Decode(_))));
    }
}
