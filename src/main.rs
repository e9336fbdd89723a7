use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use twickets_feed::{
    filter_listings, FeedError, FetchListingsInput, ListingLimit, MonitorConfig, TwicketsClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Twickets monitor");

    let config = MonitorConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let client = match config.proxy_list()?.first() {
        Some(proxy) => TwicketsClient::with_proxy(config.api_key.clone(), proxy)?,
        None => TwicketsClient::new(config.api_key.clone())?,
    };

    if config.filters.is_empty() {
        warn!("No filters configured - every new listing will be reported");
    } else {
        info!("Watching for {} filters", config.filters.len());
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        shutdown.cancel();
    });

    let poll_interval = config.poll_interval();
    info!("Polling feed every {}s", poll_interval.as_secs());

    let mut last_poll = Utc::now()
        - chrono::Duration::from_std(poll_interval).context("poll interval out of range")?;
    let mut interval = config.poll_timer();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let now = Utc::now();
                let input = FetchListingsInput::new(config.country)
                    .with_regions(config.regions.clone())
                    .with_limit(ListingLimit::Max(config.max_listings))
                    .created_after(last_poll)
                    .created_before(now);

                let listings = match client.fetch_listings(input, &cancel).await {
                    Ok(listings) => listings,
                    Err(FeedError::Cancelled) => break,
                    Err(e) => {
                        // Window is kept, the next poll covers it again
                        error!("Error fetching listings: {}", e);
                        continue;
                    }
                };
                last_poll = now;

                if listings.len() >= config.max_listings {
                    warn!(
                        "Fetched the maximum of {} listings, older new listings may have been missed",
                        config.max_listings
                    );
                }

                let matches = filter_listings(listings, &config.filters)?;
                if matches.is_empty() {
                    info!("No new matching listings");
                }
                for listing in matches {
                    info!(
                        "Matching listing: {} x{} - {} per ticket (discount {}) {}",
                        listing.event.name,
                        listing.num_tickets,
                        listing.ticket_price_incl_fee(),
                        listing.discount_string(),
                        listing.url()
                    );
                }
            }
        }
    }

    info!("Twickets monitor stopped");
    Ok(())
}
