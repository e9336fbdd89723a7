// Core modules
pub mod error;
pub mod location;
pub mod price;
pub mod event;
pub mod listing;
pub mod event_matcher;
pub mod predicate;
pub mod filter;
pub mod feed_url;
pub mod paginator;
pub mod clients;
pub mod proxy;
pub mod config;

// Re-exports
pub use error::{FeedError, FeedResult, PageError, ValidationError};
pub use location::{Country, Region};
pub use price::{Currency, Price};
pub use event::{Event, Tour, Venue};
pub use listing::{filter_listings, filter_listings_by, get_by_id, TicketListing};
pub use event_matcher::{event_name_similarity, normalize_event_name, EventMatcher};
pub use predicate::ListingPredicate;
pub use filter::Filter;
pub use feed_url::{feed_url, FeedUrlInput};
pub use paginator::{FeedFetcher, ListingLimit};
pub use clients::{FetchListingsInput, TwicketsClient};
pub use proxy::Proxy;
pub use config::MonitorConfig;
