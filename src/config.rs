//! Monitor configuration.
//!
//! Read from an optional `twickets.toml` in the working directory, overridden by
//! `TWICKETS_*` environment variables (a `.env` file is loaded first). List values
//! such as `TWICKETS_REGIONS=GBLO,GBSE` are comma separated. Filters can only be
//! given in the file.
//!
//! Environment values are kept as strings; numbers are converted per field so that
//! numeric looking keys and passwords arrive untouched.

use crate::error::ValidationError;
use crate::filter::{validate_filters, Filter};
use crate::location::{Country, Region};
use crate::proxy::{parse_proxy_list, Proxy};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

const CONFIG_FILE: &str = "twickets";
const ENV_PREFIX: &str = "TWICKETS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub api_key: String,
    pub country: Country,
    #[serde(deserialize_with = "comma_separated")]
    pub regions: Vec<Region>,
    pub poll_interval_secs: u64,

    /// Upper bound on listings fetched per poll.
    pub max_listings: usize,

    pub filters: Vec<Filter>,

    /// `socks5://host:port` urls. The first one is used.
    #[serde(deserialize_with = "comma_separated")]
    pub proxies: Vec<String>,
    pub proxy_user: String,
    pub proxy_password: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            country: Country::UnitedKingdom,
            regions: Vec::new(),
            poll_interval_secs: 60,
            max_listings: 250,
            filters: Vec::new(),
            proxies: Vec::new(),
            proxy_user: String::new(),
            proxy_password: String::new(),
        }
    }
}

impl MonitorConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(environment()),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.trim().is_empty() {
            return Err(ValidationError::new("api_key", "TWICKETS_API_KEY must be set"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ValidationError::new("poll_interval_secs", "must be positive"));
        }
        if self.max_listings == 0 {
            return Err(ValidationError::new("max_listings", "must be positive"));
        }
        if let Some(region) = self.regions.iter().find(|r| r.country() != self.country) {
            return Err(ValidationError::new(
                "regions",
                format!("'{}' is not in country '{}'", region, self.country),
            ));
        }
        validate_filters(&self.filters)?;
        self.proxy_list().map(|_| ())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Poll timer. A tick missed during a slow fetch is delayed, not replayed.
    pub fn poll_timer(&self) -> Interval {
        let mut interval = tokio::time::interval(self.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    pub fn proxy_list(&self) -> Result<Vec<Proxy>, ValidationError> {
        parse_proxy_list(&self.proxies, &self.proxy_user, &self.proxy_password)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
}

/// A list given either as an array or as a single comma separated string.
fn comma_separated<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Items {
        List(Vec<String>),
        Text(String),
    }

    let items = match Items::deserialize(deserializer)? {
        Items::List(items) => items,
        Items::Text(text) => text.split(',').map(str::to_string).collect(),
    };
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.parse().map_err(de::Error::custom))
        .collect()
}
