//! Freely composable listing predicates.
//!
//! Each criterion is optional: an unset criterion matches every listing. The
//! `matches_*` functions hold the matching rules and are shared with [`crate::filter::Filter`].

use crate::event_matcher::{event_name_similarity, resolve_similarity};
use crate::listing::TicketListing;
use crate::location::Region;
use chrono::{DateTime, Utc};
use std::fmt;
use std::ops::Not;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct ListingPredicate(Arc<dyn Fn(&TicketListing) -> bool + Send + Sync>);

impl ListingPredicate {
    pub fn new(predicate: impl Fn(&TicketListing) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    pub fn always() -> Self {
        Self::new(|_| true)
    }

    pub fn matches(&self, listing: &TicketListing) -> bool {
        (self.0)(listing)
    }

    pub fn and(self, other: ListingPredicate) -> Self {
        Self::new(move |listing| self.matches(listing) && other.matches(listing))
    }

    pub fn or(self, other: ListingPredicate) -> Self {
        Self::new(move |listing| self.matches(listing) || other.matches(listing))
    }

    /// Matches when every predicate matches. No predicates matches everything.
    pub fn all(predicates: impl IntoIterator<Item = ListingPredicate>) -> Self {
        let predicates: Vec<ListingPredicate> = predicates.into_iter().collect();
        Self::new(move |listing| predicates.iter().all(|p| p.matches(listing)))
    }

    /// Matches when any predicate matches. No predicates matches nothing.
    pub fn any(predicates: impl IntoIterator<Item = ListingPredicate>) -> Self {
        let predicates: Vec<ListingPredicate> = predicates.into_iter().collect();
        Self::new(move |listing| predicates.iter().any(|p| p.matches(listing)))
    }
}

impl Not for ListingPredicate {
    type Output = ListingPredicate;

    fn not(self) -> Self::Output {
        Self::new(move |listing| !self.matches(listing))
    }
}

impl fmt::Debug for ListingPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ListingPredicate")
    }
}

/// Matches listings whose event name is similar to `event_name`.
///
/// An empty name matches any event. A similarity <= 0 uses the default
/// of 0.9, and anything above 1 is treated as 1 (exact match only).
pub fn event_name(event_name: &str, min_similarity: f64) -> ListingPredicate {
    if event_name.is_empty() {
        return ListingPredicate::always();
    }
    let min_similarity = resolve_similarity(Some(min_similarity));
    let event_name = event_name.to_string();
    ListingPredicate::new(move |listing| matches_event_name(listing, &event_name, min_similarity))
}

/// Matches listings with an event in any of the regions. No regions matches any region.
pub fn event_region(regions: &[Region]) -> ListingPredicate {
    if regions.is_empty() {
        return ListingPredicate::always();
    }
    let regions = regions.to_vec();
    ListingPredicate::new(move |listing| matches_regions(listing, &regions))
}

/// Like [`event_region`] but from region codes. Unrecognised codes are ignored.
pub fn event_region_codes<S: AsRef<str>>(codes: &[S]) -> ListingPredicate {
    let regions: Vec<Region> = codes
        .iter()
        .filter_map(|code| {
            let region = Region::from_code(code.as_ref());
            if region.is_none() {
                warn!("Ignoring unrecognised region code '{}'", code.as_ref());
            }
            region
        })
        .collect();
    event_region(&regions)
}

/// Matches listings with exactly this many tickets. 0 matches any number.
pub fn num_tickets(num_tickets: u32) -> ListingPredicate {
    if num_tickets == 0 {
        return ListingPredicate::always();
    }
    ListingPredicate::new(move |listing| matches_num_tickets(listing, num_tickets))
}

/// Matches listings discounted by at least `min_discount` (0 to 1, fee included).
///
/// <= 0 matches any discount, including none. Above 1 is treated as 1.
pub fn min_discount(min_discount: f64) -> ListingPredicate {
    match resolve_min_discount(Some(min_discount)) {
        Some(d) => ListingPredicate::new(move |listing| matches_discount(listing, d)),
        None => ListingPredicate::always(),
    }
}

/// Matches listings created strictly before the time. `None` matches any creation time.
pub fn created_before(created_before: Option<DateTime<Utc>>) -> ListingPredicate {
    match created_before {
        Some(t) => ListingPredicate::new(move |listing| matches_created_before(listing, t)),
        None => ListingPredicate::always(),
    }
}

/// Matches listings created strictly after the time. `None` matches any creation time.
pub fn created_after(created_after: Option<DateTime<Utc>>) -> ListingPredicate {
    match created_after {
        Some(t) => ListingPredicate::new(move |listing| matches_created_after(listing, t)),
        None => ListingPredicate::always(),
    }
}

pub(crate) fn resolve_min_discount(min_discount: Option<f64>) -> Option<f64> {
    match min_discount {
        Some(d) if d > 1.0 => Some(1.0),
        Some(d) if d > 0.0 => Some(d),
        _ => None,
    }
}

pub(crate) fn matches_event_name(listing: &TicketListing, event_name: &str, min_similarity: f64) -> bool {
    event_name_similarity(event_name, &listing.event.name) >= min_similarity
}

pub(crate) fn matches_regions(listing: &TicketListing, regions: &[Region]) -> bool {
    if regions.is_empty() {
        return true;
    }
    listing
        .event
        .region()
        .map_or(false, |region| regions.contains(&region))
}

pub(crate) fn matches_num_tickets(listing: &TicketListing, num_tickets: u32) -> bool {
    listing.num_tickets == num_tickets
}

pub(crate) fn matches_discount(listing: &TicketListing, min_discount: f64) -> bool {
    listing.discount() >= min_discount
}

pub(crate) fn matches_created_before(listing: &TicketListing, created_before: DateTime<Utc>) -> bool {
    listing.created_at < created_before
}

pub(crate) fn matches_created_after(listing: &TicketListing, created_after: DateTime<Utc>) -> bool {
    listing.created_at > created_after
}
