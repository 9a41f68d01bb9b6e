use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::history::DEFAULT_MAX_HISTORY_ENTRIES;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_IP_API_URL: &str = "http://ip-api.com/json";
pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org?format=json";
pub const DEFAULT_IPQS_API_URL: &str = "https://ipqualityscore.com/api/json/ip";

/// Settings for the lookups and the reconciler.
///
/// The defaults work for local development: geolocation goes to the public
/// ip-api endpoint, there is no offline dataset and no fraud-scoring key, so
/// VPN detection reports "not detected" until `IPQS_API_KEY` is set.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Timeout applied to every outbound HTTP lookup. No retries are made.
    pub lookup_timeout: Duration,
    /// Base URL of the primary geolocation provider; the IP is appended as a path segment.
    pub ip_api_url: String,
    /// "What is my IP" endpoint used to resolve local requests.
    pub public_ip_url: String,
    /// Base URL of the fraud-scoring API.
    pub ipqs_api_url: String,
    pub ipqs_api_key: Option<String>,
    /// MaxMind City database used when the primary provider fails.
    pub geoip_city_db: Option<PathBuf>,
    /// Capacity of both the session detection history and the user location history.
    pub max_history_entries: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            ip_api_url: DEFAULT_IP_API_URL.to_string(),
            public_ip_url: DEFAULT_PUBLIC_IP_URL.to_string(),
            ipqs_api_url: DEFAULT_IPQS_API_URL.to_string(),
            ipqs_api_key: None,
            geoip_city_db: None,
            max_history_entries: DEFAULT_MAX_HISTORY_ENTRIES,
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables, falling back to
    /// [`Default`] for anything unset.
    ///
    /// | Env Var                   | Default                                |
    /// |---------------------------|----------------------------------------|
    /// | `GEO_LOOKUP_TIMEOUT_SECS` | `5`                                    |
    /// | `IP_API_URL`              | `http://ip-api.com/json`               |
    /// | `PUBLIC_IP_URL`           | `https://api.ipify.org?format=json`    |
    /// | `IPQS_API_URL`            | `https://ipqualityscore.com/api/json/ip` |
    /// | `IPQS_API_KEY`            | unset (VPN detection disabled)         |
    /// | `GEOIP_CITY_DB`           | unset (no offline fallback)            |
    /// | `MAX_HISTORY_ENTRIES`     | `50`                                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("GEO_LOOKUP_TIMEOUT_SECS") {
            let secs: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "GEO_LOOKUP_TIMEOUT_SECS",
                value: value.clone(),
            })?;
            config.lookup_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = lookup("IP_API_URL") {
            config.ip_api_url = value;
        }
        if let Some(value) = lookup("PUBLIC_IP_URL") {
            config.public_ip_url = value;
        }
        if let Some(value) = lookup("IPQS_API_URL") {
            config.ipqs_api_url = value;
        }
        config.ipqs_api_key = lookup("IPQS_API_KEY").filter(|key| !key.trim().is_empty());
        config.geoip_city_db = lookup("GEOIP_CITY_DB")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        if let Some(value) = lookup("MAX_HISTORY_ENTRIES") {
            let max: usize = value
                .trim()
                .parse()
                .ok()
                .filter(|max| *max > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "MAX_HISTORY_ENTRIES",
                    value: value.clone(),
                })?;
            config.max_history_entries = max;
        }

        Ok(config)
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_ipqs_api_key(mut self, key: impl Into<String>) -> Self {
        self.ipqs_api_key = Some(key.into());
        self
    }

    pub fn with_geoip_city_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.geoip_city_db = Some(path.into());
        self
    }

    /// Values below one are raised to one.
    pub fn with_max_history_entries(mut self, max: usize) -> Self {
        self.max_history_entries = max.max(1);
        self
    }

    /// Builds the shared HTTP client used by every provider.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.lookup_timeout)
            .build()
    }
}
