//! Walks the listings feed backwards in time.
//!
//! The feed has no cursor token, only a fixed page size and a `maxTime` bound, so each
//! page is requested before the creation time of the oldest listing on the previous one.

use crate::error::{FeedError, FeedResult, PageError};
use crate::listing::TicketListing;
use crate::location::{Country, Region};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Parameters of a single page request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub country: Country,
    pub regions: Vec<Region>,
    pub page_size: usize,
    pub before: DateTime<Utc>,
}

/// Source of feed pages.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    fn feed_url(&self, query: &PageQuery) -> FeedResult<String>;

    /// Listings on the page, newest first.
    async fn fetch_page(&self, feed_url: &str) -> Result<Vec<TicketListing>, PageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingLimit {
    Max(usize),
    /// Only valid with a `created_after` bound, otherwise pagination never ends.
    Unbounded,
}

impl Default for ListingLimit {
    fn default() -> Self {
        ListingLimit::Max(10)
    }
}

impl ListingLimit {
    fn is_reached(&self, collected: usize) -> bool {
        match self {
            ListingLimit::Max(max) => collected >= *max,
            ListingLimit::Unbounded => false,
        }
    }
}

/// A validated fetch with every default resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub country: Country,
    pub regions: Vec<Region>,
    pub limit: ListingLimit,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: DateTime<Utc>,
    pub page_size: usize,
}

impl FetchPlan {
    fn within_window(&self, cursor: DateTime<Utc>) -> bool {
        self.created_after.map_or(true, |after| cursor > after)
    }
}

/// Fetches pages until the limit is met or the cursor passes `created_after`.
///
/// Listings are returned newest first, truncated to the limit and strictly after
/// `created_after`. Listings already collected (by id) are skipped, which absorbs an
/// upstream that treats `maxTime` inclusively. A page with nothing new is an error, as
/// is an empty page: the feed gives no end-of-feed signal to tell them from a glitch.
pub async fn paginate<F: FeedFetcher + ?Sized>(
    fetcher: &F,
    plan: &FetchPlan,
    cancel: &CancellationToken,
) -> FeedResult<Vec<TicketListing>> {
    let capacity = match plan.limit {
        ListingLimit::Max(max) => max.min(1000),
        ListingLimit::Unbounded => plan.page_size,
    };
    let mut collected: Vec<TicketListing> = Vec::with_capacity(capacity);
    let mut seen: HashSet<String> = HashSet::with_capacity(capacity);
    let mut cursor = plan.created_before;
    let mut pages = 0;

    while !plan.limit.is_reached(collected.len()) && plan.within_window(cursor) {
        if cancel.is_cancelled() {
            return Err(FeedError::Cancelled);
        }

        let feed_url = fetcher.feed_url(&PageQuery {
            country: plan.country,
            regions: plan.regions.clone(),
            page_size: plan.page_size,
            before: cursor,
        })?;

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FeedError::Cancelled),
            page = fetcher.fetch_page(&feed_url) => {
                page.map_err(|source| FeedError::Page { cursor, source })?
            }
        };
        pages += 1;

        let Some(oldest) = page.last() else {
            return Err(FeedError::Exhausted { cursor });
        };
        let next_cursor = oldest.created_at;

        let previous_len = collected.len();
        for listing in page {
            if seen.insert(listing.id.clone()) {
                collected.push(listing);
            }
        }
        let added = collected.len() - previous_len;
        if added == 0 {
            return Err(FeedError::Stalled { cursor });
        }

        debug!(
            "Fetched page {} before {}: {} new listings, next cursor {}",
            pages, cursor, added, next_cursor
        );
        cursor = next_cursor;
    }

    if let ListingLimit::Max(max) = plan.limit {
        collected.truncate(max);
    }
    if let Some(after) = plan.created_after {
        // The last page usually reaches past the window
        collected.retain(|listing| listing.created_at > after);
    }

    info!("Fetched {} listings over {} pages", collected.len(), pages);
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use chrono::Duration;
    use std::sync::Mutex;

    /// In-memory feed of listings spaced a minute apart, newest first.
    struct MockFeed {
        listings: Vec<TicketListing>,
        inclusive: bool,
        fail: bool,
        requests: Mutex<Vec<DateTime<Utc>>>,
    }

    impl MockFeed {
        fn new(base: DateTime<Utc>, count: usize) -> Self {
            let listings = (0..count)
                .map(|i| {
                    TicketListing::new(
                        format!("listing-{}", i),
                        base - Duration::minutes(i as i64 + 1),
                        Event::new("e", format!("Event {}", i)),
                    )
                })
                .collect();
            Self::from_listings(listings)
        }

        fn from_listings(listings: Vec<TicketListing>) -> Self {
            Self {
                listings,
                inclusive: false,
                fail: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FeedFetcher for MockFeed {
        fn feed_url(&self, query: &PageQuery) -> FeedResult<String> {
            Ok(format!(
                "{}|{}",
                query.before.timestamp_millis(),
                query.page_size
            ))
        }

        async fn fetch_page(&self, feed_url: &str) -> Result<Vec<TicketListing>, PageError> {
            let (max_time, page_size) = feed_url.split_once('|').unwrap();
            let max_time = DateTime::from_timestamp_millis(max_time.parse().unwrap()).unwrap();
            let page_size: usize = page_size.parse().unwrap();
            self.requests.lock().unwrap().push(max_time);

            if self.fail {
                return Err(PageError::Decode(serde_json::from_str::<u8>("x").unwrap_err()));
            }

            Ok(self
                .listings
                .iter()
                .filter(|l| {
                    if self.inclusive {
                        l.created_at <= max_time
                    } else {
                        l.created_at < max_time
                    }
                })
                .take(page_size)
                .cloned()
                .collect())
        }
    }

    fn plan(base: DateTime<Utc>, limit: ListingLimit) -> FetchPlan {
        FetchPlan {
            country: Country::UnitedKingdom,
            regions: Vec::new(),
            limit,
            created_after: None,
            created_before: base,
            page_size: 10,
        }
    }

    /// Millisecond precision, like the feed's `maxTime`.
    fn base_time() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap()
    }

    fn ids(listings: &[TicketListing]) -> Vec<String> {
        listings.iter().map(|l| l.id.clone()).collect()
    }

    #[tokio::test]
    async fn fetches_exact_count_over_pages() {
        let base = base_time();
        let feed = MockFeed::new(base, 100);

        let listings = paginate(&feed, &plan(base, ListingLimit::Max(23)), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(listings.len(), 23);
        assert_eq!(ids(&listings), ids(&feed.listings[..23]));
        assert_eq!(feed.request_count(), 3);

        let requests = feed.requests.lock().unwrap().clone();
        assert_eq!(requests[1], feed.listings[9].created_at);
        assert_eq!(requests[2], feed.listings[19].created_at);
    }

    #[tokio::test]
    async fn stops_at_created_after() {
        let base = base_time();
        let feed = MockFeed::new(base, 100);
        let mut plan = plan(base, ListingLimit::Max(250));
        plan.created_after = Some(base - Duration::minutes(14));

        let listings = paginate(&feed, &plan, &CancellationToken::new()).await.unwrap();

        // Created 1 to 13 minutes before base, the one at exactly 14 is excluded
        assert_eq!(listings.len(), 13);
        assert!(listings.iter().all(|l| l.created_at > base - Duration::minutes(14)));
        assert_eq!(feed.request_count(), 2);
    }

    #[tokio::test]
    async fn unbounded_fetch_uses_time_window() {
        let base = base_time();
        let feed = MockFeed::new(base, 100);
        let mut plan = plan(base, ListingLimit::Unbounded);
        plan.created_after = Some(base - Duration::minutes(35));

        let listings = paginate(&feed, &plan, &CancellationToken::new()).await.unwrap();
        assert_eq!(listings.len(), 34);
        assert_eq!(feed.request_count(), 4);
    }

    #[tokio::test]
    async fn inclusive_upstream_does_not_duplicate() {
        let base = base_time();
        let mut feed = MockFeed::new(base, 100);
        feed.inclusive = true;

        let listings = paginate(&feed, &plan(base, ListingLimit::Max(23)), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ids(&listings), ids(&feed.listings[..23]));
        assert_eq!(feed.request_count(), 3);
    }

    #[tokio::test]
    async fn empty_page_is_exhaustion() {
        let base = base_time();
        let feed = MockFeed::new(base, 15);

        let result = paginate(&feed, &plan(base, ListingLimit::Max(20)), &CancellationToken::new()).await;
        match result {
            Err(FeedError::Exhausted { cursor }) => assert_eq!(cursor, feed.listings[14].created_at),
            other => panic!("expected exhausted feed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn page_of_only_seen_listings_is_stalled() {
        let base = base_time();
        let created = base - Duration::minutes(1);
        let mut feed = MockFeed::from_listings(
            ["a", "b", "c"]
                .iter()
                .map(|id| TicketListing::new(*id, created, Event::new("e", "Same Second")))
                .collect(),
        );
        feed.inclusive = true;
        let mut plan = plan(base, ListingLimit::Max(3));
        plan.page_size = 2;

        let result = paginate(&feed, &plan, &CancellationToken::new()).await;
        assert!(matches!(result, Err(FeedError::Stalled { .. })));
    }

    #[tokio::test]
    async fn failed_page_carries_cursor() {
        let base = base_time();
        let mut feed = MockFeed::new(base, 10);
        feed.fail = true;

        let result = paginate(&feed, &plan(base, ListingLimit::Max(5)), &CancellationToken::new()).await;
        match result {
            Err(FeedError::Page { cursor, source: PageError::Decode(_) }) => assert_eq!(cursor, base),
            other => panic!("expected page error, got {:?}", other),
        }
        assert_eq!(feed.request_count(), 1);
    }

    #[tokio::test]
    async fn cancelled_before_first_page() {
        let base = base_time();
        let feed = MockFeed::new(base, 10);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = paginate(&feed, &plan(base, ListingLimit::Max(5)), &cancel).await;
        assert!(matches!(result, Err(FeedError::Cancelled)));
        assert_eq!(feed.request_count(), 0);
    }

    #[tokio::test]
    async fn zero_limit_fetches_nothing() {
        let base = base_time();
        let feed = MockFeed::new(base, 10);

        let listings = paginate(&feed, &plan(base, ListingLimit::Max(0)), &CancellationToken::new())
            .await
            .unwrap();
        assert!(listings.is_empty());
        assert_eq!(feed.request_count(), 0);
    }
}
