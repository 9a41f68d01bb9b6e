//! VPN, proxy and Tor detection through a fraud-scoring API.
//!
//! Detection is best effort. Local addresses and a missing API key skip the
//! remote call entirely, and any API failure is reported as "no VPN".

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::ReconcilerConfig;
use crate::error::LookupError;
use crate::geo::ensure_success;
use crate::model::{DegradeReason, Lookup, VpnSignal};
use crate::net::is_local_address;

/// Known VPN services, matched against the reverse hostname of an address.
/// Order matters: the first match wins.
const VPN_PROVIDERS: &[(&str, &str)] = &[
    ("expressvpn", "ExpressVPN"),
    ("nordvpn", "NordVPN"),
    ("protonvpn", "ProtonVPN"),
    ("surfshark", "Surfshark"),
    ("windscribe", "Windscribe"),
    ("cyberghost", "CyberGhost"),
    ("purevpn", "PureVPN"),
    ("hotspotshield", "HotspotShield"),
];

/// Names the VPN service behind `host`, if it is a known one.
///
/// Matching is case-insensitive and ignores separators, so
/// `express-vpn-server-1.net` and `ExpressVPN.com` both resolve to
/// `ExpressVPN`.
pub fn identify_vpn_provider(host: &str) -> Option<&'static str> {
    let compact: String = host
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    VPN_PROVIDERS
        .iter()
        .find(|(pattern, _)| compact.contains(pattern))
        .map(|(_, name)| *name)
}

/// Resolves an IP address to a [`VpnSignal`]. Never fails.
#[async_trait]
pub trait FraudSignal: Send + Sync {
    async fn assess(&self, ip: &str) -> Lookup<VpnSignal>;
}

/// Raw access to a fraud-scoring provider.
#[async_trait]
pub trait FraudApi: Send + Sync {
    async fn query(&self, ip: &str) -> Result<FraudReport, LookupError>;
}

/// Provider answer for one IP address.
///
/// Flags only count when the provider sent a JSON `true`; strings, numbers and
/// nulls are all read as `false`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FraudReport {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "strict_bool")]
    pub is_vpn: bool,
    #[serde(default, deserialize_with = "strict_bool")]
    pub is_proxy: bool,
    #[serde(default, deserialize_with = "strict_bool")]
    pub is_tor: bool,
    #[serde(default, deserialize_with = "strict_bool")]
    pub is_crawler: bool,
    #[serde(default)]
    pub fraud_score: f64,
    #[serde(default)]
    pub host: Option<String>,
}

fn strict_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(matches!(value, serde_json::Value::Bool(true)))
}

impl FraudReport {
    pub fn into_signal(self) -> VpnSignal {
        VpnSignal {
            is_vpn: self.is_vpn,
            is_proxy: self.is_proxy,
            is_tor: self.is_tor,
            provider: self
                .host
                .as_deref()
                .and_then(identify_vpn_provider)
                .map(str::to_string),
            fraud_score: VpnSignal::clamp_score(self.fraud_score),
            confidence: VpnSignal::confidence_for(
                self.is_vpn,
                self.is_proxy,
                self.is_crawler,
                self.fraud_score,
            ),
        }
    }
}

/// IPQualityScore IP reputation endpoint, queried with `strictness=1`.
pub struct IpQualityScoreApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl IpQualityScoreApi {
    pub fn new(client: reqwest::Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl FraudApi for IpQualityScoreApi {
    async fn query(&self, ip: &str) -> Result<FraudReport, LookupError> {
        let response = self
            .client
            .get(format!(
                "{}/{}/{}?strictness=1",
                self.api_url.trim_end_matches('/'),
                self.api_key,
                ip
            ))
            .send()
            .await?;

        let report: FraudReport = ensure_success(response).await?.json().await?;
        if report.success == Some(false) {
            return Err(LookupError::Rejected(
                report
                    .message
                    .unwrap_or_else(|| "request unsuccessful".to_string()),
            ));
        }
        Ok(report)
    }
}

/// Fraud signal service used by the reconciler.
#[derive(Clone)]
pub struct FraudScreener {
    api: Option<Arc<dyn FraudApi>>,
}

impl FraudScreener {
    pub fn new(api: Arc<dyn FraudApi>) -> Self {
        Self { api: Some(api) }
    }

    /// A screener with no provider; every address is reported as not a VPN.
    pub fn disabled() -> Self {
        Self { api: None }
    }

    /// Uses IPQualityScore when an API key is configured, otherwise
    /// [`FraudScreener::disabled`].
    pub fn from_config(config: &ReconcilerConfig, client: reqwest::Client) -> Self {
        match &config.ipqs_api_key {
            Some(key) => Self::new(Arc::new(IpQualityScoreApi::new(
                client,
                config.ipqs_api_url.clone(),
                key.clone(),
            ))),
            None => Self::disabled(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }
}

#[async_trait]
impl FraudSignal for FraudScreener {
    async fn assess(&self, ip: &str) -> Lookup<VpnSignal> {
        if is_local_address(ip) {
            return Lookup::Confirmed(VpnSignal::clean());
        }

        let Some(api) = &self.api else {
            debug!(ip, "fraud scoring not configured");
            return Lookup::Degraded(VpnSignal::clean(), DegradeReason::NotConfigured);
        };

        match api.query(ip).await {
            Ok(report) => Lookup::Confirmed(report.into_signal()),
            Err(e) => {
                warn!(ip, error = %e, "fraud scoring failed, assuming no VPN");
                Lookup::Degraded(VpnSignal::clean(), DegradeReason::Unavailable(e.to_string()))
            }
        }
    }
}
