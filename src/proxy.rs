use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

const PROXY_SCHEME: &str = "socks5";

/// A SOCKS5 proxy to route feed requests through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl Proxy {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let host = host.into();
        if host.is_empty() {
            return Err(ValidationError::new("proxy host", "host is required"));
        }
        if port == 0 {
            return Err(ValidationError::new("proxy port", "port must be positive"));
        }
        Ok(Self {
            host,
            port,
            user: user.into(),
            password: password.into(),
        })
    }

    /// Proxy url, with credentials only when both user and password are set.
    pub fn url(&self) -> Result<Url, ValidationError> {
        if self.host.is_empty() || self.port == 0 {
            return Err(ValidationError::new("proxy", "host and port must be set"));
        }

        let mut url = Url::parse(&format!("{}://{}:{}", PROXY_SCHEME, self.host, self.port))
            .map_err(|e| ValidationError::new("proxy", e.to_string()))?;

        if !self.user.trim().is_empty() && !self.password.trim().is_empty() {
            url.set_username(&self.user)
                .and_then(|_| url.set_password(Some(&self.password)))
                .map_err(|_| ValidationError::new("proxy", "credentials cannot be set"))?;
        }
        Ok(url)
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print credentials
        write!(f, "{}://{}:{}", PROXY_SCHEME, self.host, self.port)
    }
}

/// Parses `socks5://host:port` urls into proxies sharing one set of credentials.
pub fn parse_proxy_list<S: AsRef<str>>(
    proxy_urls: &[S],
    user: &str,
    password: &str,
) -> Result<Vec<Proxy>, ValidationError> {
    proxy_urls
        .iter()
        .map(|raw| {
            let raw = raw.as_ref();
            let url = Url::parse(raw).map_err(|e| {
                ValidationError::new("proxy", format!("failed to parse '{}': {}", raw, e))
            })?;
            if url.scheme() != PROXY_SCHEME {
                return Err(ValidationError::new(
                    "proxy",
                    format!("unsupported scheme for '{}': {}", raw, url.scheme()),
                ));
            }
            let host = url
                .host_str()
                .ok_or_else(|| ValidationError::new("proxy", format!("missing host in '{}'", raw)))?;
            let port = url
                .port()
                .ok_or_else(|| ValidationError::new("proxy", format!("missing port in '{}'", raw)))?;
            Proxy::new(host, port, user, password)
        })
        .collect()
}
