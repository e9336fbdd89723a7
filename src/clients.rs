use crate::error::{FeedError, FeedResult, PageError, ValidationError};
use crate::feed_url::{feed_url_with_base, FeedUrlInput, DEFAULT_PAGE_SIZE, TWICKETS_URL};
use crate::listing::{decode_feed, TicketListing};
use crate::location::{Country, Region};
use crate::paginator::{paginate, FeedFetcher, FetchPlan, ListingLimit, PageQuery};
use crate::proxy::Proxy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Parameters for fetching ticket listings.
///
/// Listings are fetched either up to a maximum number or back to a point in time.
/// When both are set, whichever is met first stops the fetch.
#[derive(Debug, Clone)]
pub struct FetchListingsInput {
    pub country: Country,

    /// Regions to fetch listings from. Empty means any region.
    pub regions: Vec<Region>,

    /// Defaults to 10. When fetching a time period set this to a generous bound
    /// (e.g. 250) rather than `Unbounded`, to avoid being rate limited.
    pub limit: ListingLimit,

    /// Listings must be created after this time. Required for `ListingLimit::Unbounded`.
    pub created_after: Option<DateTime<Utc>>,

    /// Listings must be created before this time. Defaults to now.
    pub created_before: Option<DateTime<Utc>>,

    /// Listings requested per page. Defaults to 10, the only size the feed
    /// reliably serves, so this can usually be left alone.
    pub num_per_request: Option<usize>,
}

impl FetchListingsInput {
    pub fn new(country: Country) -> Self {
        Self {
            country,
            regions: Vec::new(),
            limit: ListingLimit::default(),
            created_after: None,
            created_before: None,
            num_per_request: None,
        }
    }

    pub fn with_regions(mut self, regions: Vec<Region>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_limit(mut self, limit: ListingLimit) -> Self {
        self.limit = limit;
        self
    }

    pub fn created_after(mut self, created_after: DateTime<Utc>) -> Self {
        self.created_after = Some(created_after);
        self
    }

    pub fn created_before(mut self, created_before: DateTime<Utc>) -> Self {
        self.created_before = Some(created_before);
        self
    }

    pub fn with_num_per_request(mut self, num_per_request: usize) -> Self {
        self.num_per_request = Some(num_per_request);
        self
    }

    /// Applies defaults and validates, producing the plan the paginator runs.
    pub fn resolve(self) -> Result<FetchPlan, ValidationError> {
        self.resolve_at(Utc::now())
    }

    fn resolve_at(self, now: DateTime<Utc>) -> Result<FetchPlan, ValidationError> {
        let created_before = self.created_before.unwrap_or(now);
        let page_size = self
            .num_per_request
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        if let Some(region) = self.regions.iter().find(|r| r.country() != self.country) {
            return Err(ValidationError::new(
                "regions",
                format!("'{}' is not in country '{}'", region, self.country),
            ));
        }
        if let Some(created_after) = self.created_after {
            if created_before < created_after {
                return Err(ValidationError::new(
                    "created_before",
                    "created before must not be earlier than created after",
                ));
            }
        }
        if self.limit == ListingLimit::Unbounded && self.created_after.is_none() {
            return Err(ValidationError::new(
                "created_after",
                "must be set when the number of listings is unbounded",
            ));
        }

        Ok(FetchPlan {
            country: self.country,
            regions: self.regions,
            limit: self.limit,
            created_after: self.created_after,
            created_before,
            page_size,
        })
    }
}

// Twickets API client
#[derive(Clone)]
pub struct TwicketsClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl TwicketsClient {
    pub fn new(api_key: impl Into<String>) -> FeedResult<Self> {
        Self::build(api_key.into(), None)
    }

    /// Client routing every request through a SOCKS5 proxy.
    pub fn with_proxy(api_key: impl Into<String>, proxy: &Proxy) -> FeedResult<Self> {
        Self::build(api_key.into(), Some(proxy))
    }

    fn build(api_key: String, proxy: Option<&Proxy>) -> FeedResult<Self> {
        if api_key.is_empty() {
            return Err(ValidationError::new("api_key", "must be set").into());
        }

        // Connection pooling and timeouts
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .min_tls_version(reqwest::tls::Version::TLS_1_2);

        if let Some(proxy) = proxy {
            let proxy_url = proxy.url()?;
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str()).map_err(FeedError::Client)?);
            info!("Routing feed requests through proxy {}", proxy);
        }

        let http_client = builder.build().map_err(FeedError::Client)?;

        Ok(Self {
            http_client,
            api_key,
            base_url: TWICKETS_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Fetch ticket listings, newest first.
    pub async fn fetch_listings(
        &self,
        input: FetchListingsInput,
        cancel: &CancellationToken,
    ) -> FeedResult<Vec<TicketListing>> {
        let plan = input.resolve()?;
        paginate(self, &plan, cancel).await
    }

    /// Fetch a single page of listings from a feed url.
    pub async fn fetch_listings_by_feed_url(
        &self,
        feed_url: &str,
    ) -> Result<Vec<TicketListing>, PageError> {
        let response = self
            .http_client
            .get(feed_url)
            .send()
            .await
            .map_err(PageError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let hint = if status == StatusCode::FORBIDDEN {
                ": possibly due to tls misconfiguration"
            } else {
                ""
            };
            return Err(PageError::Status { status, hint });
        }

        let body = response.bytes().await.map_err(PageError::Body)?;
        let listings = decode_feed(&body)?;
        debug!("Decoded {} listings from feed page", listings.len());
        Ok(listings)
    }
}

#[async_trait]
impl FeedFetcher for TwicketsClient {
    fn feed_url(&self, query: &PageQuery) -> FeedResult<String> {
        feed_url_with_base(
            &self.base_url,
            &FeedUrlInput {
                api_key: self.api_key.clone(),
                country: query.country,
                regions: query.regions.clone(),
                num_listings: query.page_size,
                before_time: Some(query.before),
            },
        )
    }

    async fn fetch_page(&self, feed_url: &str) -> Result<Vec<TicketListing>, PageError> {
        self.fetch_listings_by_feed_url(feed_url).await
    }
}
