//! IP geolocation with a chained provider fallback.
//!
//! [`GeoLocator`] asks the primary provider first, then the optional offline
//! dataset, and finally settles for [`Location::unknown`]. Local addresses are
//! first translated to the host's public IP so development logins still
//! resolve to a real place.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ReconcilerConfig;
use crate::error::LookupError;
use crate::maxmind::MaxMindProvider;
use crate::model::{DegradeReason, Location, Lookup, UNKNOWN};
use crate::net::is_local_address;

/// Resolves an IP address to a [`Location`]. Never fails.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn locate(&self, ip: &str) -> Lookup<Location>;
}

/// A single geolocation source that may fail.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    async fn lookup(&self, ip: &str) -> Result<Location, LookupError>;
}

/// Discovers the public IP of the machine running the service.
#[async_trait]
pub trait PublicIpResolver: Send + Sync {
    async fn public_ip(&self) -> Result<String, LookupError>;
}

/// Geolocation service used by the reconciler.
#[derive(Clone)]
pub struct GeoLocator {
    primary: Arc<dyn GeoProvider>,
    fallback: Option<Arc<dyn GeoProvider>>,
    public_ip: Option<Arc<dyn PublicIpResolver>>,
}

impl GeoLocator {
    /// Creates a locator with only a primary provider.
    ///
    /// Local addresses resolve to [`Location::local_development`] until a
    /// [`PublicIpResolver`] is added.
    pub fn new(primary: Arc<dyn GeoProvider>) -> Self {
        Self {
            primary,
            fallback: None,
            public_ip: None,
        }
    }

    /// Adds a provider consulted when the primary one fails.
    ///
    /// # Parameters
    ///
    /// * `fallback` - Usually a [`MaxMindProvider`] reading a local dataset.
    ///
    /// # Returns
    ///
    /// The locator, now answering with the fallback's location whenever the
    /// primary provider errors. Only when both fail is the result
    /// [`Lookup::Degraded`].
    pub fn with_fallback(mut self, fallback: Arc<dyn GeoProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Resolver used to look up the host's public IP for local requests.
    pub fn with_public_ip_resolver(mut self, resolver: Arc<dyn PublicIpResolver>) -> Self {
        self.public_ip = Some(resolver);
        self
    }

    /// Wires ip-api as primary, the MaxMind dataset as fallback when
    /// configured, and ipify for local addresses.
    ///
    /// A configured dataset that cannot be opened is logged and skipped.
    pub fn from_config(config: &ReconcilerConfig, client: reqwest::Client) -> Self {
        let mut locator = Self::new(Arc::new(IpApiProvider::new(
            client.clone(),
            config.ip_api_url.clone(),
        )))
        .with_public_ip_resolver(Arc::new(IpifyResolver::new(
            client,
            config.public_ip_url.clone(),
        )));

        if let Some(path) = &config.geoip_city_db {
            match MaxMindProvider::open(path) {
                Ok(provider) => locator = locator.with_fallback(Arc::new(provider)),
                Err(e) => warn!(path = %path.display(), error = %e, "GeoIP city database unavailable"),
            }
        }

        locator
    }

    async fn lookup_chain(&self, ip: &str) -> Lookup<Location> {
        let mut failure = match self.primary.lookup(ip).await {
            Ok(location) => return Lookup::Confirmed(location),
            Err(e) => {
                warn!(ip, provider = self.primary.name(), error = %e, "primary geolocation failed");
                e.to_string()
            }
        };

        if let Some(fallback) = &self.fallback {
            match fallback.lookup(ip).await {
                Ok(location) => return Lookup::Confirmed(location),
                Err(e) => {
                    warn!(ip, provider = fallback.name(), error = %e, "fallback geolocation failed");
                    failure = e.to_string();
                }
            }
        }

        Lookup::Degraded(Location::unknown(ip), DegradeReason::Unavailable(failure))
    }
}

#[async_trait]
impl GeoLookup for GeoLocator {
    async fn locate(&self, ip: &str) -> Lookup<Location> {
        if !is_local_address(ip) {
            return self.lookup_chain(ip).await;
        }

        if let Some(resolver) = &self.public_ip {
            match resolver.public_ip().await {
                // Only one hop: a resolver answering with another local address
                // is not followed.
                Ok(public) if !is_local_address(&public) => {
                    debug!(ip, public = %public, "resolved public IP for local request");
                    return self.lookup_chain(&public).await;
                }
                Ok(public) => debug!(ip, public = %public, "public IP resolver returned a local address"),
                Err(e) => debug!(ip, error = %e, "public IP resolution failed"),
            }
        }

        Lookup::Degraded(
            Location::local_development(ip),
            DegradeReason::LocalDevelopment,
        )
    }
}

/// Primary provider backed by the ip-api JSON endpoint.
pub struct IpApiProvider {
    client: reqwest::Client,
    api_url: String,
}

impl IpApiProvider {
    /// * `api_url` - Base URL, e.g. `http://ip-api.com/json`. The IP is
    ///   appended as a path segment.
    pub fn new(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    isp: Option<String>,
    timezone: Option<String>,
}

impl IpApiResponse {
    fn into_location(self, ip: &str) -> Result<Location, LookupError> {
        if self.status.as_deref() == Some("fail") {
            return Err(LookupError::Rejected(
                self.message.unwrap_or_else(|| "lookup failed".to_string()),
            ));
        }

        Ok(Location {
            ip: ip.to_string(),
            country: non_empty(self.country)
                .or_else(|| non_empty(self.country_code))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            city: non_empty(self.city).unwrap_or_else(|| UNKNOWN.to_string()),
            latitude: self.lat,
            longitude: self.lon,
            isp: non_empty(self.isp).unwrap_or_else(|| UNKNOWN.to_string()),
            timezone: non_empty(self.timezone),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl GeoProvider for IpApiProvider {
    fn name(&self) -> &'static str {
        "ip-api"
    }

    async fn lookup(&self, ip: &str) -> Result<Location, LookupError> {
        let response = self
            .client
            .get(format!("{}/{}", self.api_url.trim_end_matches('/'), ip))
            .send()
            .await?;

        let body: IpApiResponse = ensure_success(response).await?.json().await?;
        body.into_location(ip)
    }
}

/// Resolves the host's public IP through an ipify-style endpoint returning
/// `{"ip": "..."}`.
pub struct IpifyResolver {
    client: reqwest::Client,
    url: String,
}

impl IpifyResolver {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[derive(Debug, Deserialize)]
struct IpifyResponse {
    ip: String,
}

#[async_trait]
impl PublicIpResolver for IpifyResolver {
    async fn public_ip(&self) -> Result<String, LookupError> {
        let response = self.client.get(&self.url).send().await?;
        let body: IpifyResponse = ensure_success(response).await?.json().await?;
        Ok(body.ip.trim().to_string())
    }
}

/// Turns a non-2xx response into [`LookupError::Status`].
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, LookupError> {
    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::Status {
            status: status.as_u16(),
        });
    }
    Ok(response)
}
