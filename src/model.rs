//! Domain types shared by the lookups, the store and the reconciler.
//!
//! Nothing in here talks to the network or the database. The storage layer maps
//! these types onto the entities in [`crate::entity`].

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::history::History;

/// Placeholder used for every textual location field that could not be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Geolocation of a single IP address.
///
/// Always fully populated: unresolved text fields hold [`UNKNOWN`] and
/// unresolved coordinates or time zone hold `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub ip: String,
    pub country: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub isp: String,
    pub timezone: Option<String>,
}

impl Location {
    /// A location with every field unresolved.
    pub fn unknown(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            latitude: None,
            longitude: None,
            isp: UNKNOWN.to_string(),
            timezone: None,
        }
    }

    /// Fixed location reported for local requests when the public IP of the
    /// host cannot be determined. Not the result of a real lookup.
    pub fn local_development(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            country: "US".to_string(),
            city: "San Francisco".to_string(),
            latitude: Some(37.7749),
            longitude: Some(-122.4194),
            isp: "Local Development".to_string(),
            timezone: Some("America/Los_Angeles".to_string()),
        }
    }
}

/// VPN, proxy and fraud indicators for an IP address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnSignal {
    pub is_vpn: bool,
    pub is_proxy: bool,
    pub is_tor: bool,
    pub provider: Option<String>,
    /// Provider-reported risk score, 0 to 100.
    pub fraud_score: u8,
    /// Weighted heuristic, 0 to 100. Not a probability.
    pub confidence: u8,
}

impl VpnSignal {
    /// The "nothing detected" signal used whenever scoring is skipped or fails.
    pub fn clean() -> Self {
        Self::default()
    }

    /// +40 for a VPN, +30 for a proxy, +20 for a crawler and +10 when the raw
    /// fraud score exceeds 75, capped at 100.
    pub fn confidence_for(is_vpn: bool, is_proxy: bool, is_crawler: bool, fraud_score: f64) -> u8 {
        let mut confidence: u8 = 0;
        if is_vpn {
            confidence += 40;
        }
        if is_proxy {
            confidence += 30;
        }
        if is_crawler {
            confidence += 20;
        }
        if fraud_score > 75.0 {
            confidence += 10;
        }
        confidence.min(100)
    }

    /// Clamps a provider score into `0..=100`. NaN becomes 0.
    pub fn clamp_score(fraud_score: f64) -> u8 {
        if fraud_score.is_nan() {
            return 0;
        }
        fraud_score.clamp(0.0, 100.0).round() as u8
    }
}

/// Why a lookup fell back to a default value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DegradeReason {
    /// The service is not configured (for example no API key).
    NotConfigured,
    /// A local address whose public IP could not be resolved.
    LocalDevelopment,
    /// Every provider failed; carries the last failure.
    Unavailable(String),
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::NotConfigured => f.write_str("service not configured"),
            DegradeReason::LocalDevelopment => f.write_str("local development placeholder"),
            DegradeReason::Unavailable(cause) => write!(f, "lookup unavailable: {cause}"),
        }
    }
}

/// Result of a lookup that never fails.
///
/// Both variants carry a usable value. `Degraded` marks values that are
/// defaults standing in for a failed or skipped lookup, so callers can tell a
/// confirmed "Unknown" apart from a lookup that did not happen.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup<T> {
    Confirmed(T),
    Degraded(T, DegradeReason),
}

impl<T> Lookup<T> {
    /// Borrows the carried value, whether confirmed or a fallback.
    ///
    /// # Examples
    ///
    /// ```
    /// use session_locator::{DegradeReason, Location, Lookup};
    ///
    /// let lookup = Lookup::Degraded(Location::unknown("8.8.8.8"), DegradeReason::NotConfigured);
    /// assert_eq!(lookup.value().country, "Unknown");
    /// assert!(lookup.is_degraded());
    /// ```
    pub fn value(&self) -> &T {
        match self {
            Lookup::Confirmed(value) | Lookup::Degraded(value, _) => value,
        }
    }

    /// Consumes the lookup and drops the degrade reason, if any.
    pub fn into_value(self) -> T {
        match self {
            Lookup::Confirmed(value) | Lookup::Degraded(value, _) => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Lookup::Degraded(..))
    }

    pub fn degrade_reason(&self) -> Option<&DegradeReason> {
        match self {
            Lookup::Confirmed(_) => None,
            Lookup::Degraded(_, reason) => Some(reason),
        }
    }
}

/// Where the resolved location of a session belongs.
///
/// A session location is either behind a VPN or a confirmed direct
/// connection, never both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LocationClassification {
    Vpn {
        location: Location,
        provider: Option<String>,
        detected_at: OffsetDateTime,
    },
    Direct {
        location: Location,
        confirmed_at: OffsetDateTime,
    },
}

impl LocationClassification {
    pub fn classify(location: Location, signal: &VpnSignal, now: OffsetDateTime) -> Self {
        if signal.is_vpn {
            LocationClassification::Vpn {
                location,
                provider: signal.provider.clone(),
                detected_at: now,
            }
        } else {
            LocationClassification::Direct {
                location,
                confirmed_at: now,
            }
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            LocationClassification::Vpn { location, .. }
            | LocationClassification::Direct { location, .. } => location,
        }
    }

    pub fn is_vpn(&self) -> bool {
        matches!(self, LocationClassification::Vpn { .. })
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            LocationClassification::Vpn { provider, .. } => provider.as_deref(),
            LocationClassification::Direct { .. } => None,
        }
    }

    pub fn vpn_location(&self) -> Option<&Location> {
        match self {
            LocationClassification::Vpn { location, .. } => Some(location),
            LocationClassification::Direct { .. } => None,
        }
    }

    pub fn real_location(&self) -> Option<&Location> {
        match self {
            LocationClassification::Direct { location, .. } => Some(location),
            LocationClassification::Vpn { .. } => None,
        }
    }

    pub fn vpn_detected_at(&self) -> Option<OffsetDateTime> {
        match self {
            LocationClassification::Vpn { detected_at, .. } => Some(*detected_at),
            LocationClassification::Direct { .. } => None,
        }
    }

    pub fn real_ip_confirmed_at(&self) -> Option<OffsetDateTime> {
        match self {
            LocationClassification::Direct { confirmed_at, .. } => Some(*confirmed_at),
            LocationClassification::Vpn { .. } => None,
        }
    }
}

/// What triggered a detection record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Login,
    VpnChangeDetection,
}

/// One VPN verdict recorded on a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub timestamp: OffsetDateTime,
    pub ip: String,
    pub is_vpn: bool,
    pub provider: Option<String>,
    pub method: DetectionMethod,
    pub fraud_score: u8,
}

/// Opaque identifier of a tracked login session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A login session together with its location and VPN state.
///
/// Created at login, updated on every reconciliation and closed at logout.
/// Sessions are never deleted.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedSession {
    pub id: SessionId,
    pub user_id: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub login_time: OffsetDateTime,
    pub logout_time: Option<OffsetDateTime>,
    pub is_active: bool,
    /// Last resolved location regardless of classification. Kept for readers
    /// that predate the VPN split.
    pub location: Location,
    pub classification: LocationClassification,
    pub vpn_detection_score: u8,
    pub vpn_detection_history: History<DetectionRecord>,
    /// Incremented on every persisted update.
    pub version: i32,
}

impl TrackedSession {
    /// Opens a new active session seeded with a single `login` detection record.
    pub fn start(
        user_id: impl Into<String>,
        ip: impl Into<String>,
        user_agent: Option<String>,
        location: Location,
        signal: &VpnSignal,
        now: OffsetDateTime,
        max_history_entries: usize,
    ) -> Self {
        let ip = ip.into();
        let mut vpn_detection_history = History::new();
        vpn_detection_history.push(
            detection_record(&ip, signal, DetectionMethod::Login, now),
            max_history_entries,
        );

        Self {
            id: SessionId::generate(),
            user_id: user_id.into(),
            ip_address: ip,
            user_agent,
            login_time: now,
            logout_time: None,
            is_active: true,
            location: location.clone(),
            classification: LocationClassification::classify(location, signal, now),
            vpn_detection_score: signal.fraud_score,
            vpn_detection_history,
            version: 0,
        }
    }

    /// Replaces the location and VPN state with a fresh verdict.
    ///
    /// The previous classification is dropped entirely, so switching from a
    /// direct connection to a VPN clears the real location and vice versa.
    pub fn apply_verdict(
        &mut self,
        ip: impl Into<String>,
        location: Location,
        signal: &VpnSignal,
        now: OffsetDateTime,
        max_history_entries: usize,
    ) {
        self.ip_address = ip.into();
        self.location = location.clone();
        self.classification = LocationClassification::classify(location, signal, now);
        self.vpn_detection_score = signal.fraud_score;
        self.vpn_detection_history.push(
            detection_record(
                &self.ip_address,
                signal,
                DetectionMethod::VpnChangeDetection,
                now,
            ),
            max_history_entries,
        );
    }

    pub fn is_vpn_detected(&self) -> bool {
        self.classification.is_vpn()
    }

    pub fn vpn_provider(&self) -> Option<&str> {
        self.classification.provider()
    }
}

fn detection_record(
    ip: &str,
    signal: &VpnSignal,
    method: DetectionMethod,
    now: OffsetDateTime,
) -> DetectionRecord {
    DetectionRecord {
        timestamp: now,
        ip: ip.to_string(),
        is_vpn: signal.is_vpn,
        provider: signal.provider.clone(),
        method,
        fraud_score: signal.fraud_score,
    }
}

/// Last location seen while the user was behind a VPN.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpnLocation {
    pub location: Location,
    pub provider: Option<String>,
    pub detected_at: OffsetDateTime,
}

/// Last location confirmed on a direct connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActualLocation {
    pub location: Location,
    pub confirmed_at: OffsetDateTime,
}

/// The user's most recent location verdict.
#[derive(Clone, Debug, PartialEq)]
pub enum LastKnownLocation {
    Vpn(VpnLocation),
    Actual(ActualLocation),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Vpn,
    Actual,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationHistoryEntry {
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub location: Location,
    pub ip: String,
    pub isp: String,
    pub timestamp: OffsetDateTime,
    pub provider: Option<String>,
}

/// Location fields denormalized onto a user for fast access.
#[derive(Clone, Debug, PartialEq)]
pub struct UserLocation {
    pub user_id: String,
    pub last_ip_address: Option<String>,
    pub last_isp: Option<String>,
    pub last_known: Option<LastKnownLocation>,
    pub location_history: History<LocationHistoryEntry>,
    /// Incremented on every persisted update; `0` until first stored.
    pub version: i32,
}

impl UserLocation {
    /// A user that has never been located.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            last_ip_address: None,
            last_isp: None,
            last_known: None,
            location_history: History::new(),
            version: 0,
        }
    }

    pub fn is_vpn_currently_detected(&self) -> bool {
        matches!(self.last_known, Some(LastKnownLocation::Vpn(_)))
    }

    pub fn last_vpn_location(&self) -> Option<&VpnLocation> {
        match &self.last_known {
            Some(LastKnownLocation::Vpn(vpn)) => Some(vpn),
            _ => None,
        }
    }

    pub fn last_actual_location(&self) -> Option<&ActualLocation> {
        match &self.last_known {
            Some(LastKnownLocation::Actual(actual)) => Some(actual),
            _ => None,
        }
    }

    /// Mirrors a new verdict onto the user and appends it to the bounded
    /// location history.
    pub fn record(
        &mut self,
        ip: &str,
        location: &Location,
        signal: &VpnSignal,
        now: OffsetDateTime,
        max_history_entries: usize,
    ) {
        self.last_ip_address = Some(ip.to_string());
        self.last_isp = Some(location.isp.clone());

        let kind = if signal.is_vpn {
            self.last_known = Some(LastKnownLocation::Vpn(VpnLocation {
                location: location.clone(),
                provider: signal.provider.clone(),
                detected_at: now,
            }));
            LocationKind::Vpn
        } else {
            self.last_known = Some(LastKnownLocation::Actual(ActualLocation {
                location: location.clone(),
                confirmed_at: now,
            }));
            LocationKind::Actual
        };

        self.location_history.push(
            LocationHistoryEntry {
                kind,
                location: location.clone(),
                ip: ip.to_string(),
                isp: location.isp.clone(),
                timestamp: now,
                provider: signal.provider.clone(),
            },
            max_history_entries,
        );
    }
}
