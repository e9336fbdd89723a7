use crate::error::ValidationError;
use crate::event_matcher::resolve_similarity;
use crate::listing::TicketListing;
use crate::location::Region;
use crate::predicate::{self, ListingPredicate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A filter on ticket listings.
///
/// A listing must satisfy every set field to match, making this an AND filter.
/// A set of filters is combined with OR, see [`crate::listing::filter_listings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Name of the event to match. Required.
    pub event: String,

    /// Minimum similarity between the listing's event name and `event`, between 0 and 1.
    /// Unset or <= 0 uses the default of 0.9, which lets
    /// "Taylor Swift" match "Taylor Swift: The Eras Tour".
    pub event_similarity: Option<f64>,

    /// Regions to match. Empty matches any region.
    pub regions: Vec<Region>,

    /// Exact number of tickets in the listing. Unset or 0 matches any number.
    pub num_tickets: Option<u32>,

    /// Minimum discount (fee included), between 0 and 1.
    /// Unset or <= 0 matches any discount, including none.
    pub min_discount: Option<f64>,

    pub created_before: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
}

impl Filter {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Default::default()
        }
    }

    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.event_similarity = Some(similarity);
        self
    }

    pub fn with_regions(mut self, regions: Vec<Region>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_num_tickets(mut self, num_tickets: u32) -> Self {
        self.num_tickets = Some(num_tickets);
        self
    }

    pub fn with_min_discount(mut self, min_discount: f64) -> Self {
        self.min_discount = Some(min_discount);
        self
    }

    pub fn created_between(
        mut self,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_after = after;
        self.created_before = before;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event.trim().is_empty() {
            return Err(ValidationError::new("event", "event name must be set"));
        }
        if let Some(similarity) = self.event_similarity {
            if similarity.is_nan() || similarity > 1.0 {
                return Err(ValidationError::new("event_similarity", "similarity cannot be > 1"));
            }
        }
        if let Some(discount) = self.min_discount {
            if discount.is_nan() || discount > 1.0 {
                return Err(ValidationError::new("min_discount", "discount cannot be > 1"));
            }
        }
        if let (Some(after), Some(before)) = (self.created_after, self.created_before) {
            if after >= before {
                return Err(ValidationError::new(
                    "created_after",
                    "created after must be before created before",
                ));
            }
        }
        Ok(())
    }

    /// Whether the listing satisfies every criterion. Assumes the filter is valid.
    pub fn matches(&self, listing: &TicketListing) -> bool {
        let similarity = resolve_similarity(self.event_similarity);

        predicate::matches_event_name(listing, &self.event, similarity)
            && predicate::matches_regions(listing, &self.regions)
            && self
                .num_tickets
                .filter(|n| *n > 0)
                .map_or(true, |n| predicate::matches_num_tickets(listing, n))
            && predicate::resolve_min_discount(self.min_discount)
                .map_or(true, |d| predicate::matches_discount(listing, d))
            && self
                .created_before
                .map_or(true, |t| predicate::matches_created_before(listing, t))
            && self
                .created_after
                .map_or(true, |t| predicate::matches_created_after(listing, t))
    }

    /// The filter as a composable predicate.
    pub fn to_predicate(&self) -> Result<ListingPredicate, ValidationError> {
        self.validate()?;
        Ok(ListingPredicate::all([
            predicate::event_name(&self.event, self.event_similarity.unwrap_or(0.0)),
            predicate::event_region(&self.regions),
            predicate::num_tickets(self.num_tickets.unwrap_or(0)),
            predicate::min_discount(self.min_discount.unwrap_or(0.0)),
            predicate::created_before(self.created_before),
            predicate::created_after(self.created_after),
        ]))
    }
}

/// A predicate matching listings that satisfy any of the filters.
pub fn any_filter_predicate(filters: &[Filter]) -> Result<ListingPredicate, ValidationError> {
    if filters.is_empty() {
        return Ok(ListingPredicate::always());
    }
    let predicates = filters
        .iter()
        .map(Filter::to_predicate)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ListingPredicate::any(predicates))
}

pub(crate) fn validate_filters(filters: &[Filter]) -> Result<(), ValidationError> {
    filters.iter().try_for_each(Filter::validate)
}

/// Filters are assumed to have been validated.
pub(crate) fn matches_any_filter(listing: &TicketListing, filters: &[Filter]) -> bool {
    filters.is_empty() || filters.iter().any(|f| f.matches(listing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, Venue};
    use crate::listing::filter_listings;
    use crate::price::{Currency, Price};
    use chrono::Duration;

    fn named(name: &str) -> TicketListing {
        TicketListing::new(name, Utc::now(), Event::new("e", name))
    }

    fn in_region(id: &str, region: Region, tickets: u32) -> TicketListing {
        TicketListing::new(
            id,
            Utc::now(),
            Event::new("e", "Coldplay").with_venue(Venue::in_region("Venue", region)),
        )
        .with_tickets(tickets)
    }

    fn names(listings: &[TicketListing]) -> Vec<&str> {
        listings.iter().map(|l| l.event.name.as_str()).collect()
    }

    #[test]
    fn filters_by_event_name() {
        let listings = vec![
            named("Stranger Things: The First Shadow"),
            named("Back To The Future: The Musical"),
            named("Harry Potter & The Cursed Child Parts 1 & 2"),
            named("The The"),
        ];

        let cases = [
            ("Stranger Things", vec!["Stranger Things: The First Shadow"]),
            ("Back To The Future", vec!["Back To The Future: The Musical"]),
            (
                "Harry Potter and the Cursed Child",
                vec!["Harry Potter & The Cursed Child Parts 1 & 2"],
            ),
            ("The Who", vec![]),
        ];

        for (event, expected) in cases {
            let filtered = filter_listings(listings.clone(), &[Filter::new(event)]).unwrap();
            assert_eq!(names(&filtered), expected, "filter {:?}", event);
        }
    }

    #[test]
    fn criteria_are_combined_with_and() {
        let filter = Filter::new("Coldplay")
            .with_regions(vec![Region::London])
            .with_num_tickets(2);

        assert!(filter.matches(&in_region("1", Region::London, 2)));
        assert!(!filter.matches(&in_region("2", Region::Wales, 2)));
        assert!(!filter.matches(&in_region("3", Region::London, 3)));
    }

    #[test]
    fn filters_are_combined_with_or() {
        let london_pairs = Filter::new("Coldplay")
            .with_regions(vec![Region::London])
            .with_num_tickets(2);
        let welsh = Filter::new("Coldplay").with_regions(vec![Region::Wales]);

        let listings = vec![
            in_region("london-pair", Region::London, 2),
            in_region("welsh-four", Region::Wales, 4),
            in_region("scottish-pair", Region::Scotland, 2),
        ];

        let only_london = filter_listings(listings.clone(), &[london_pairs.clone()]).unwrap();
        assert_eq!(only_london.len(), 1);

        let both = filter_listings(listings, &[london_pairs, welsh]).unwrap();
        let ids: Vec<&str> = both.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["london-pair", "welsh-four"]);
    }

    #[test]
    fn empty_filter_set_matches_everything() {
        let listings = vec![named("Coldplay"), named("Green Day")];
        assert_eq!(filter_listings(listings.clone(), &[]).unwrap(), listings);
        assert!(listings[0].matches_any_filter(&[]).unwrap());
    }

    #[test]
    fn discount_and_time_bounds() {
        let gbp = |amount| Price::new(Currency::Gbp, amount);
        let now = Utc::now();
        let mut listing = named("Coldplay").with_prices(gbp(6000), gbp(1000), gbp(10000));
        listing.created_at = now;

        assert!(Filter::new("Coldplay").with_min_discount(0.3).matches(&listing));
        assert!(!Filter::new("Coldplay").with_min_discount(0.31).matches(&listing));

        let window = Filter::new("Coldplay")
            .created_between(Some(now - Duration::minutes(1)), Some(now + Duration::minutes(1)));
        assert!(window.matches(&listing));

        let earlier = Filter::new("Coldplay").created_between(None, Some(now));
        assert!(!earlier.matches(&listing));
    }

    #[test]
    fn validation_names_the_field() {
        let invalid = [
            (Filter::new(""), "event"),
            (Filter::new("Coldplay").with_similarity(1.5), "event_similarity"),
            (Filter::new("Coldplay").with_min_discount(2.0), "min_discount"),
            (
                Filter::new("Coldplay").created_between(Some(Utc::now()), Some(Utc::now() - Duration::hours(1))),
                "created_after",
            ),
        ];

        for (filter, field) in invalid {
            let err = filter.validate().unwrap_err();
            assert_eq!(err.field, field);
        }

        assert!(Filter::new("Coldplay").with_similarity(-1.0).validate().is_ok());

        let listings = vec![named("Coldplay")];
        assert!(filter_listings(listings.clone(), &[Filter::new("")]).is_err());
        assert!(listings[0].matches_any_filter(&[Filter::new("Coldplay"), Filter::new("")]).is_err());
    }

    #[test]
    fn predicate_view_agrees_with_filter() {
        let filters = [
            Filter::new("Coldplay").with_regions(vec![Region::London]).with_num_tickets(2),
            Filter::new("Coldplay").with_regions(vec![Region::Wales]),
        ];
        let predicate = any_filter_predicate(&filters).unwrap();

        let listings = [
            in_region("1", Region::London, 2),
            in_region("2", Region::London, 3),
            in_region("3", Region::Wales, 1),
            in_region("4", Region::Scotland, 2),
        ];
        for listing in &listings {
            assert_eq!(predicate.matches(listing), matches_any_filter(listing, &filters));
        }
        assert!(any_filter_predicate(&[]).unwrap().matches(&listings[0]));
    }

    #[test]
    fn deserializes_from_config() {
        let filter: Filter = serde_json::from_str(
            r#"{"event": "Coldplay", "regions": ["GBLO"], "num_tickets": 2, "min_discount": 0.1}"#,
        )
        .unwrap();
        assert_eq!(filter.regions, vec![Region::London]);
        assert_eq!(filter.num_tickets, Some(2));
        assert!(filter.event_similarity.is_none());

        assert!(serde_json::from_str::<Filter>(r#"{"event": "Coldplay", "regions": ["GBXX"]}"#).is_err());
    }
}
