//! Persistence contract for tracked sessions and user location fields.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::model::{SessionId, TrackedSession, UserLocation};

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The database reported an error.
    #[error("backend error: {0}")]
    Backend(String),

    /// A nested value could not be serialized for storage.
    #[error("encode error: {0}")]
    Encode(String),

    /// A stored value could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The session row changed since it was loaded.
    #[error("session {0} was modified concurrently")]
    Conflict(SessionId),

    /// The user's location row changed since it was loaded.
    #[error("location of user {0} was modified concurrently")]
    UserConflict(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Backend used by the [`Reconciler`](crate::Reconciler).
///
/// Implementations must write the session row and the user fields of a single
/// reconciliation atomically.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Inserts a new session and writes the user's location fields.
    ///
    /// The user row is written only if it still carries `user.version` (a
    /// version of `0` expects no row yet). Nothing is written on failure.
    ///
    /// # Error Mapping
    ///
    /// * Database errors → [`Error::Backend`]
    /// * Serialization errors → [`Error::Encode`]
    /// * Stale user version → [`Error::UserConflict`]
    async fn create_session(&self, session: &TrackedSession, user: &UserLocation) -> Result<()>;

    /// Writes a reconciled session and the user's location fields.
    ///
    /// The write only succeeds if the stored rows still carry
    /// `session.version` and `user.version`; the returned session holds the
    /// incremented version.
    ///
    /// # Returns
    ///
    /// * `Ok(TrackedSession)` - The session as stored.
    /// * `Err(Error::Conflict)` - Another writer updated or closed the session first.
    /// * `Err(Error::UserConflict)` - Another writer updated the user first.
    async fn save_reconciliation(
        &self,
        session: &TrackedSession,
        user: &UserLocation,
    ) -> Result<TrackedSession>;

    /// Loads a session by id, active or not.
    async fn load_session(&self, id: &SessionId) -> Result<Option<TrackedSession>>;

    /// Loads the user's active session with the most recent login time.
    async fn load_active_session(&self, user_id: &str) -> Result<Option<TrackedSession>>;

    /// All active sessions of a user, newest first.
    async fn active_sessions(&self, user_id: &str) -> Result<Vec<TrackedSession>>;

    /// Loads a user's location fields. Users never seen before yield an empty
    /// [`UserLocation`].
    async fn load_user(&self, user_id: &str) -> Result<UserLocation>;

    /// Marks a session inactive and stamps its logout time.
    ///
    /// Returns `false` when the session does not exist or was already closed.
    async fn close_session(&self, id: &SessionId, at: OffsetDateTime) -> Result<bool>;
}
