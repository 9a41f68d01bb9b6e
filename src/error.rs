use crate::store;

/// Failure of a single outbound lookup.
///
/// Lookup errors never reach callers of the reconciler; they are absorbed into
/// [`crate::model::Lookup::Degraded`] values.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The HTTP request failed (network, DNS, TLS, timeout, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider returned {status}")]
    Status { status: u16 },

    /// The provider answered 2xx but reported a failed lookup.
    #[error("provider rejected lookup: {0}")]
    Rejected(String),

    /// The offline dataset is missing or has no record for the address.
    #[error("offline dataset lookup failed: {0}")]
    Dataset(#[from] maxminddb::MaxMindDBError),

    #[error("invalid IP address: {0}")]
    InvalidAddress(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Why a reconciliation did not complete.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The user has no active session to reconcile against.
    #[error("no active session")]
    NoActiveSession,

    #[error(transparent)]
    Store(#[from] store::Error),
}
